use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::slugify;

/// Tag entity. Tags are unique by slug.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tag {
    pub id: Uuid,
    pub name: String,
    pub slug: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Tag {
    /// Create a tag whose slug is derived from its name.
    pub fn new(name: &str) -> Self {
        let now = Utc::now();
        let name = name.trim().to_string();
        Self {
            id: Uuid::now_v7(),
            slug: slugify(&name),
            name,
            created_at: now,
            updated_at: now,
        }
    }
}

/// A tag with the number of published posts carrying it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TagCount {
    pub tag: Tag,
    pub posts_count: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tag_slug_from_name() {
        let tag = Tag::new("  Web Development ");
        assert_eq!(tag.name, "Web Development");
        assert_eq!(tag.slug, "web-development");
    }
}
