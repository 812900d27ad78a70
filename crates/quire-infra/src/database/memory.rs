//! In-memory store implementing every repository port.
//!
//! Backs the server when no database is configured and drives the service
//! tests. One lock guards all tables, so multi-row writes such as
//! `save_post` with a featured effect are atomic.

use std::cmp::Reverse;
use std::collections::{BTreeSet, HashMap, HashSet};

use async_trait::async_trait;
use tokio::sync::RwLock;
use uuid::Uuid;

use quire_core::domain::{
    Comment, Page, PageRequest, Post, PostFilter, Tag, TagCount, User,
};
use quire_core::error::RepoError;
use quire_core::ports::{
    BaseRepository, CommentRepository, FeaturedEffect, PostRepository, TagRepository,
    UserRepository,
};

#[derive(Default)]
struct Tables {
    users: HashMap<Uuid, User>,
    posts: HashMap<Uuid, Post>,
    comments: HashMap<Uuid, Comment>,
    tags: HashMap<Uuid, Tag>,
    /// (post_id, tag_id)
    post_tags: BTreeSet<(Uuid, Uuid)>,
}

impl Tables {
    fn published_desc(&self) -> Vec<&Post> {
        let mut posts: Vec<&Post> = self.posts.values().filter(|p| p.is_public()).collect();
        posts.sort_by_key(|p| Reverse((p.published_at, p.id)));
        posts
    }

    fn apply_effect(&mut self, saved_id: Uuid, effect: FeaturedEffect) {
        match effect {
            FeaturedEffect::None => {}
            FeaturedEffect::ClearOthers => {
                for post in self.posts.values_mut() {
                    if post.id != saved_id {
                        post.is_featured = false;
                    }
                }
            }
            FeaturedEffect::PromoteLatest => {
                let latest = self
                    .published_desc()
                    .into_iter()
                    .find(|p| p.id != saved_id)
                    .map(|p| p.id);
                if let Some(post) = latest.and_then(|id| self.posts.get_mut(&id)) {
                    post.is_featured = true;
                    tracing::debug!(post_id = %post.id, "Promoted latest post to featured");
                }
            }
        }
    }

    fn descendants(&self, root: Uuid) -> Vec<Uuid> {
        let mut found = vec![root];
        let mut cursor = 0;
        while cursor < found.len() {
            let parent = found[cursor];
            found.extend(
                self.comments
                    .values()
                    .filter(|c| c.parent_id == Some(parent))
                    .map(|c| c.id),
            );
            cursor += 1;
        }
        found
    }
}

/// Process-local implementation of the repository ports. Data is lost on
/// restart.
#[derive(Default)]
pub struct InMemoryStore {
    tables: RwLock<Tables>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

// ---------------------------------------------------------------------------
// Users
// ---------------------------------------------------------------------------

#[async_trait]
impl BaseRepository<User, Uuid> for InMemoryStore {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, RepoError> {
        Ok(self.tables.read().await.users.get(&id).cloned())
    }

    async fn save(&self, user: User) -> Result<User, RepoError> {
        let mut tables = self.tables.write().await;
        let email_taken = tables
            .users
            .values()
            .any(|u| u.id != user.id && u.email == user.email);
        if email_taken {
            return Err(RepoError::Constraint("email already registered".to_string()));
        }
        tables.users.insert(user.id, user.clone());
        Ok(user)
    }

    async fn delete(&self, id: Uuid) -> Result<(), RepoError> {
        self.tables
            .write()
            .await
            .users
            .remove(&id)
            .map(|_| ())
            .ok_or(RepoError::NotFound)
    }
}

#[async_trait]
impl UserRepository for InMemoryStore {
    async fn find_by_email(&self, email: &str) -> Result<Option<User>, RepoError> {
        let tables = self.tables.read().await;
        Ok(tables
            .users
            .values()
            .find(|u| u.email == email)
            .cloned())
    }

    async fn find_many(&self, ids: &[Uuid]) -> Result<Vec<User>, RepoError> {
        let tables = self.tables.read().await;
        Ok(ids
            .iter()
            .filter_map(|id| tables.users.get(id))
            .cloned()
            .collect())
    }
}

// ---------------------------------------------------------------------------
// Posts
// ---------------------------------------------------------------------------

#[async_trait]
impl BaseRepository<Post, Uuid> for InMemoryStore {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<Post>, RepoError> {
        Ok(self.tables.read().await.posts.get(&id).cloned())
    }

    async fn save(&self, post: Post) -> Result<Post, RepoError> {
        self.save_post(post, FeaturedEffect::None).await
    }

    async fn delete(&self, id: Uuid) -> Result<(), RepoError> {
        let mut tables = self.tables.write().await;
        if tables.posts.remove(&id).is_none() {
            return Err(RepoError::NotFound);
        }
        tables.comments.retain(|_, c| c.blog_post_id != id);
        tables.post_tags.retain(|(post_id, _)| *post_id != id);
        Ok(())
    }
}

#[async_trait]
impl PostRepository for InMemoryStore {
    async fn find_by_slug(&self, slug: &str) -> Result<Option<Post>, RepoError> {
        let tables = self.tables.read().await;
        Ok(tables
            .posts
            .values()
            .find(|p| p.slug == slug && !p.is_trashed())
            .cloned())
    }

    async fn slug_exists(&self, slug: &str, except: Option<Uuid>) -> Result<bool, RepoError> {
        let tables = self.tables.read().await;
        Ok(tables
            .posts
            .values()
            .any(|p| p.slug == slug && Some(p.id) != except))
    }

    async fn save_post(&self, post: Post, effect: FeaturedEffect) -> Result<Post, RepoError> {
        let mut tables = self.tables.write().await;
        let slug_taken = tables
            .posts
            .values()
            .any(|p| p.id != post.id && p.slug == post.slug);
        if slug_taken {
            return Err(RepoError::Constraint(format!("slug '{}' is taken", post.slug)));
        }

        tables.posts.insert(post.id, post.clone());
        tables.apply_effect(post.id, effect);
        Ok(post)
    }

    async fn find_featured(&self) -> Result<Option<Post>, RepoError> {
        let tables = self.tables.read().await;
        Ok(tables
            .published_desc()
            .into_iter()
            .find(|p| p.is_featured)
            .cloned())
    }

    async fn list_published(&self, page: PageRequest) -> Result<Page<Post>, RepoError> {
        let tables = self.tables.read().await;
        let posts = tables.published_desc().into_iter().cloned().collect();
        Ok(Page::from_ordered(posts, page))
    }

    async fn recent_published(
        &self,
        limit: u64,
        except: Option<Uuid>,
    ) -> Result<Vec<Post>, RepoError> {
        let tables = self.tables.read().await;
        Ok(tables
            .published_desc()
            .into_iter()
            .filter(|p| Some(p.id) != except)
            .take(limit as usize)
            .cloned()
            .collect())
    }

    async fn list_by_owner(
        &self,
        owner: Uuid,
        filter: PostFilter,
        page: PageRequest,
    ) -> Result<Page<Post>, RepoError> {
        let tables = self.tables.read().await;
        let mut posts: Vec<Post> = tables
            .posts
            .values()
            .filter(|p| p.is_owned_by(owner) && !p.is_trashed())
            .filter(|p| match filter {
                PostFilter::All => true,
                PostFilter::Published => p.is_published,
                PostFilter::Draft => !p.is_published,
            })
            .cloned()
            .collect();
        posts.sort_by_key(|p| Reverse(p.id));
        Ok(Page::from_ordered(posts, page))
    }

    async fn list_published_by_tag(
        &self,
        tag_slug: &str,
        page: PageRequest,
    ) -> Result<Page<Post>, RepoError> {
        let tables = self.tables.read().await;
        let Some(tag) = tables.tags.values().find(|t| t.slug == tag_slug) else {
            return Ok(Page::new(Vec::new(), page, 0));
        };

        let tagged: HashSet<Uuid> = tables
            .post_tags
            .iter()
            .filter(|(_, tag_id)| *tag_id == tag.id)
            .map(|(post_id, _)| *post_id)
            .collect();
        let posts = tables
            .published_desc()
            .into_iter()
            .filter(|p| tagged.contains(&p.id))
            .cloned()
            .collect();
        Ok(Page::from_ordered(posts, page))
    }
}

// ---------------------------------------------------------------------------
// Comments
// ---------------------------------------------------------------------------

#[async_trait]
impl BaseRepository<Comment, Uuid> for InMemoryStore {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<Comment>, RepoError> {
        Ok(self.tables.read().await.comments.get(&id).cloned())
    }

    async fn save(&self, comment: Comment) -> Result<Comment, RepoError> {
        let mut tables = self.tables.write().await;
        if !tables.posts.contains_key(&comment.blog_post_id) {
            return Err(RepoError::Constraint(format!(
                "post {} does not exist",
                comment.blog_post_id
            )));
        }
        tables.comments.insert(comment.id, comment.clone());
        Ok(comment)
    }

    async fn delete(&self, id: Uuid) -> Result<(), RepoError> {
        self.tables
            .write()
            .await
            .comments
            .remove(&id)
            .map(|_| ())
            .ok_or(RepoError::NotFound)
    }
}

#[async_trait]
impl CommentRepository for InMemoryStore {
    async fn list_top_level_approved(
        &self,
        post_id: Uuid,
        page: PageRequest,
    ) -> Result<Page<Comment>, RepoError> {
        let tables = self.tables.read().await;
        let mut comments: Vec<Comment> = tables
            .comments
            .values()
            .filter(|c| c.blog_post_id == post_id && c.parent_id.is_none() && c.is_approved)
            .cloned()
            .collect();
        comments.sort_by_key(|c| Reverse((c.created_at, c.id)));
        Ok(Page::from_ordered(comments, page))
    }

    async fn replies_of(&self, parent_ids: &[Uuid]) -> Result<Vec<Comment>, RepoError> {
        let parents: HashSet<&Uuid> = parent_ids.iter().collect();
        let tables = self.tables.read().await;
        let mut replies: Vec<Comment> = tables
            .comments
            .values()
            .filter(|c| c.parent_id.as_ref().is_some_and(|p| parents.contains(p)))
            .cloned()
            .collect();
        replies.sort_by_key(|c| (c.created_at, c.id));
        Ok(replies)
    }

    async fn count_approved(&self, post_id: Uuid) -> Result<u64, RepoError> {
        let tables = self.tables.read().await;
        Ok(tables
            .comments
            .values()
            .filter(|c| c.blog_post_id == post_id && c.is_approved)
            .count() as u64)
    }

    async fn delete_thread(&self, id: Uuid) -> Result<u64, RepoError> {
        let mut tables = self.tables.write().await;
        if !tables.comments.contains_key(&id) {
            return Err(RepoError::NotFound);
        }
        let thread = tables.descendants(id);
        for comment_id in &thread {
            tables.comments.remove(comment_id);
        }
        Ok(thread.len() as u64)
    }
}

// ---------------------------------------------------------------------------
// Tags
// ---------------------------------------------------------------------------

#[async_trait]
impl BaseRepository<Tag, Uuid> for InMemoryStore {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<Tag>, RepoError> {
        Ok(self.tables.read().await.tags.get(&id).cloned())
    }

    async fn save(&self, tag: Tag) -> Result<Tag, RepoError> {
        let mut tables = self.tables.write().await;
        let slug_taken = tables
            .tags
            .values()
            .any(|t| t.id != tag.id && t.slug == tag.slug);
        if slug_taken {
            return Err(RepoError::Constraint(format!("tag '{}' exists", tag.slug)));
        }
        tables.tags.insert(tag.id, tag.clone());
        Ok(tag)
    }

    async fn delete(&self, id: Uuid) -> Result<(), RepoError> {
        let mut tables = self.tables.write().await;
        if tables.tags.remove(&id).is_none() {
            return Err(RepoError::NotFound);
        }
        tables.post_tags.retain(|(_, tag_id)| *tag_id != id);
        Ok(())
    }
}

#[async_trait]
impl TagRepository for InMemoryStore {
    async fn find_or_create(&self, tag: Tag) -> Result<Tag, RepoError> {
        let mut tables = self.tables.write().await;
        if let Some(existing) = tables.tags.values().find(|t| t.slug == tag.slug) {
            return Ok(existing.clone());
        }
        tables.tags.insert(tag.id, tag.clone());
        Ok(tag)
    }

    async fn sync_post_tags(&self, post_id: Uuid, tag_ids: &[Uuid]) -> Result<(), RepoError> {
        let mut tables = self.tables.write().await;
        tables.post_tags.retain(|(p, _)| *p != post_id);
        for tag_id in tag_ids {
            tables.post_tags.insert((post_id, *tag_id));
        }
        Ok(())
    }

    async fn tags_for_posts(&self, post_ids: &[Uuid]) -> Result<Vec<(Uuid, Tag)>, RepoError> {
        let wanted: HashSet<&Uuid> = post_ids.iter().collect();
        let tables = self.tables.read().await;
        let mut pairs: Vec<(Uuid, Tag)> = tables
            .post_tags
            .iter()
            .filter(|(post_id, _)| wanted.contains(post_id))
            .filter_map(|(post_id, tag_id)| tables.tags.get(tag_id).map(|t| (*post_id, t.clone())))
            .collect();
        pairs.sort_by(|a, b| (a.0, &a.1.name).cmp(&(b.0, &b.1.name)));
        Ok(pairs)
    }

    async fn popular(&self, limit: u64) -> Result<Vec<TagCount>, RepoError> {
        let tables = self.tables.read().await;
        let mut counts: HashMap<Uuid, u64> = HashMap::new();
        for (post_id, tag_id) in &tables.post_tags {
            if tables.posts.get(post_id).is_some_and(|p| p.is_public()) {
                *counts.entry(*tag_id).or_default() += 1;
            }
        }

        let mut popular: Vec<TagCount> = counts
            .into_iter()
            .filter_map(|(tag_id, posts_count)| {
                tables.tags.get(&tag_id).map(|tag| TagCount {
                    tag: tag.clone(),
                    posts_count,
                })
            })
            .collect();
        popular.sort_by(|a, b| {
            b.posts_count
                .cmp(&a.posts_count)
                .then_with(|| a.tag.name.cmp(&b.tag.name))
        });
        popular.truncate(limit as usize);
        Ok(popular)
    }
}
