//! Data Transfer Objects - request/response types for the API.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::response::PaginatedResponse;

// ---------------------------------------------------------------------------
// Auth
// ---------------------------------------------------------------------------

/// Request to register a new user.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegisterUserRequest {
    pub name: String,
    pub email: String,
    pub password: String,
}

/// Request to login.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// Response containing a user's public information.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserResponse {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub created_at: DateTime<Utc>,
}

/// Response containing authentication tokens.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthResponse {
    pub access_token: String,
    pub token_type: String,
    pub expires_in: u64,
    pub user: UserResponse,
}

/// Name shown next to posts and comments.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthorResponse {
    pub id: Uuid,
    pub name: String,
}

// ---------------------------------------------------------------------------
// Posts
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreatePostRequest {
    pub title: String,
    #[serde(default)]
    pub excerpt: Option<String>,
    #[serde(default)]
    pub body: Option<String>,
    #[serde(default)]
    pub is_published: bool,
    #[serde(default)]
    pub is_featured: bool,
    #[serde(default)]
    pub tags: Vec<String>,
}

/// Partial update; absent fields are left as they are.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdatePostRequest {
    pub title: Option<String>,
    pub excerpt: Option<String>,
    pub body: Option<String>,
    pub is_published: Option<bool>,
    pub is_featured: Option<bool>,
    /// Replaces the tag set when present.
    pub tags: Option<Vec<String>>,
}

/// A post as shown in listings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PostResponse {
    pub id: Uuid,
    pub title: String,
    pub slug: String,
    pub excerpt: Option<String>,
    pub is_published: bool,
    pub is_featured: bool,
    pub published_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub author: Option<AuthorResponse>,
    pub tags: Vec<String>,
}

/// A post on its own page.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PostDetailResponse {
    #[serde(flatten)]
    pub post: PostResponse,
    pub body: String,
    pub body_html: String,
    pub excerpt_html: String,
    pub comments_count: u64,
}

/// Home page: the featured post next to the published listing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PostIndexResponse {
    pub featured: Option<PostResponse>,
    pub posts: PaginatedResponse<PostResponse>,
}

// ---------------------------------------------------------------------------
// Comments
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommentRequest {
    pub content: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReplyRequest {
    pub content: String,
    /// Post the client believes the parent belongs to. Rejected when it
    /// disagrees with the parent.
    #[serde(default)]
    pub blog_post_id: Option<Uuid>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommentResponse {
    pub id: Uuid,
    pub blog_post_id: Uuid,
    pub content: String,
    pub is_approved: bool,
    pub is_reply: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub user: Option<AuthorResponse>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent: Option<Box<CommentResponse>>,
    pub replies: Vec<CommentResponse>,
    pub replies_count: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeletedResponse {
    pub deleted: u64,
}

// ---------------------------------------------------------------------------
// Tags
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TagCountResponse {
    pub name: String,
    pub slug: String,
    pub posts_count: u64,
}
