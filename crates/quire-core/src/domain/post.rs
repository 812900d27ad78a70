use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::Author;
use crate::error::DomainError;

/// Maximum title length, in characters.
pub const TITLE_MAX_CHARS: usize = 255;

/// Post entity - a markdown-backed blog post.
///
/// `slug` and `published_at` are owned by the post lifecycle; callers never
/// set them directly.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Post {
    pub id: Uuid,
    pub user_id: Uuid,
    pub title: String,
    pub slug: String,
    pub excerpt: Option<String>,
    pub body: String,
    pub is_published: bool,
    pub is_featured: bool,
    pub published_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub deleted_at: Option<DateTime<Utc>>,
}

impl Post {
    /// Build an unsaved post from author input. The slug is left empty until
    /// the lifecycle assigns one.
    pub fn new(user_id: Uuid, input: &NewPost, now: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::now_v7(),
            user_id,
            title: input.title.trim().to_string(),
            slug: String::new(),
            excerpt: input.excerpt.clone(),
            body: input.body.clone().unwrap_or_default(),
            is_published: input.is_published,
            is_featured: input.is_featured,
            published_at: None,
            created_at: now,
            updated_at: now,
            deleted_at: None,
        }
    }

    pub fn is_trashed(&self) -> bool {
        self.deleted_at.is_some()
    }

    /// Published and not soft-deleted.
    pub fn is_public(&self) -> bool {
        self.is_published && !self.is_trashed()
    }

    pub fn is_owned_by(&self, user_id: Uuid) -> bool {
        self.user_id == user_id
    }

    /// Copy author-editable fields from `changes` onto the post.
    pub fn apply(&mut self, changes: &PostChanges) {
        if let Some(title) = &changes.title {
            self.title = title.trim().to_string();
        }
        if let Some(excerpt) = &changes.excerpt {
            self.excerpt = Some(excerpt.clone());
        }
        if let Some(body) = &changes.body {
            self.body = body.clone();
        }
        if let Some(published) = changes.is_published {
            self.is_published = published;
        }
        if let Some(featured) = changes.is_featured {
            self.is_featured = featured;
        }
    }
}

/// Author input for a new post.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NewPost {
    pub title: String,
    pub excerpt: Option<String>,
    pub body: Option<String>,
    pub is_published: bool,
    pub is_featured: bool,
    pub tags: Vec<String>,
}

impl NewPost {
    pub fn validate(&self) -> Result<(), DomainError> {
        validate_title(&self.title)?;
        let has_body = self.body.as_deref().is_some_and(|b| !b.trim().is_empty());
        let has_excerpt = self.excerpt.as_deref().is_some_and(|e| !e.trim().is_empty());
        if !has_body && !has_excerpt {
            return Err(DomainError::Validation(
                "a post needs a body or an excerpt".to_string(),
            ));
        }
        Ok(())
    }
}

/// Partial update of a post. `None` leaves the field untouched.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PostChanges {
    pub title: Option<String>,
    pub excerpt: Option<String>,
    pub body: Option<String>,
    pub is_published: Option<bool>,
    pub is_featured: Option<bool>,
    /// Replaces the tag set when present.
    pub tags: Option<Vec<String>>,
}

impl PostChanges {
    pub fn validate(&self) -> Result<(), DomainError> {
        if let Some(title) = &self.title {
            validate_title(title)?;
        }
        Ok(())
    }
}

fn validate_title(title: &str) -> Result<(), DomainError> {
    let title = title.trim();
    if title.is_empty() {
        return Err(DomainError::Validation("title is required".to_string()));
    }
    if title.chars().count() > TITLE_MAX_CHARS {
        return Err(DomainError::Validation(format!(
            "title must be at most {TITLE_MAX_CHARS} characters"
        )));
    }
    Ok(())
}

/// Which lifecycle-relevant fields differ between the stored and the
/// incoming version of a post.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ChangedFields {
    pub title: bool,
    pub is_published: bool,
    pub is_featured: bool,
}

impl ChangedFields {
    pub fn between(before: &Post, after: &Post) -> Self {
        Self {
            title: before.title != after.title,
            is_published: before.is_published != after.is_published,
            is_featured: before.is_featured != after.is_featured,
        }
    }
}

/// Owner-side listing filter.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PostFilter {
    #[default]
    All,
    Published,
    Draft,
}

impl FromStr for PostFilter {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "" | "all" => Ok(Self::All),
            "published" => Ok(Self::Published),
            "draft" => Ok(Self::Draft),
            other => Err(DomainError::Validation(format!("unknown post filter '{other}'"))),
        }
    }
}

/// A post with what readers see next to it in listings.
#[derive(Debug, Clone)]
pub struct PostSummary {
    pub post: Post,
    pub author: Option<Author>,
    pub tags: Vec<String>,
}

/// A single post as rendered on its own page.
#[derive(Debug, Clone)]
pub struct PostDetail {
    pub summary: PostSummary,
    pub rendered_body: String,
    pub rendered_excerpt: String,
    /// Approved comments, replies included.
    pub comments_count: u64,
}
