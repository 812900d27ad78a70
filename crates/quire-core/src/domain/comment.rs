use chrono::{DateTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::Author;
use crate::error::DomainError;

pub const COMMENT_MIN_CHARS: usize = 3;
pub const COMMENT_MAX_CHARS: usize = 2000;
/// How long an author may edit their comment after creating it.
pub const COMMENT_EDIT_WINDOW_MINUTES: i64 = 15;

/// Comment entity. A comment with a `parent_id` is a reply.
///
/// Replies always carry their parent's `blog_post_id`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Comment {
    pub id: Uuid,
    pub blog_post_id: Uuid,
    pub user_id: Uuid,
    pub parent_id: Option<Uuid>,
    pub content: String,
    pub is_approved: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Comment {
    /// A new top-level comment. Approved on creation.
    pub fn top_level(
        blog_post_id: Uuid,
        user_id: Uuid,
        content: String,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::now_v7(),
            blog_post_id,
            user_id,
            parent_id: None,
            content,
            is_approved: true,
            created_at: now,
            updated_at: now,
        }
    }

    /// A reply to `parent`, on the parent's post. Approved on creation.
    pub fn reply_to(parent: &Comment, user_id: Uuid, content: String, now: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::now_v7(),
            blog_post_id: parent.blog_post_id,
            user_id,
            parent_id: Some(parent.id),
            content,
            is_approved: true,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn is_reply(&self) -> bool {
        self.parent_id.is_some()
    }

    pub fn is_authored_by(&self, user_id: Uuid) -> bool {
        self.user_id == user_id
    }

    /// True while `now` is at most fifteen minutes after creation.
    pub fn within_edit_window(&self, now: DateTime<Utc>) -> bool {
        now.signed_duration_since(self.created_at)
            <= TimeDelta::minutes(COMMENT_EDIT_WINDOW_MINUTES)
    }

    /// Approved comments are public; unapproved ones only to their author.
    pub fn is_visible_to(&self, viewer: Option<Uuid>) -> bool {
        self.is_approved || viewer.is_some_and(|id| self.is_authored_by(id))
    }
}

/// Trim and bounds-check comment text. Returns the text to store.
pub fn validate_comment_content(raw: &str) -> Result<String, DomainError> {
    let content = raw.trim();
    let len = content.chars().count();
    if len < COMMENT_MIN_CHARS {
        return Err(DomainError::Validation(format!(
            "comment must be at least {COMMENT_MIN_CHARS} characters"
        )));
    }
    if len > COMMENT_MAX_CHARS {
        return Err(DomainError::Validation(format!(
            "comment may not exceed {COMMENT_MAX_CHARS} characters"
        )));
    }
    Ok(content.to_string())
}

/// A comment with its author and, depending on the read, its replies and
/// parent attached.
#[derive(Debug, Clone)]
pub struct CommentView {
    pub comment: Comment,
    pub author: Option<Author>,
    pub parent: Option<Box<CommentView>>,
    pub replies: Vec<CommentView>,
}

impl CommentView {
    pub fn new(comment: Comment, author: Option<Author>) -> Self {
        Self {
            comment,
            author,
            parent: None,
            replies: Vec::new(),
        }
    }
}
