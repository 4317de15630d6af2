use std::sync::Arc;

use uuid::Uuid;

use crate::domain::{
    ActivePosts, AuthoredPost, InputMode, POSTS_PER_PAGE, Page, PageRequest, Post, PostInput,
};
use crate::error::DomainError;
use crate::ports::{Clock, PostRepository};

/// Post operations with the visibility and ownership gates applied.
///
/// Every check runs in the same order: input validation, then loading the
/// post, then visibility or ownership, and only then the write.
#[derive(Clone)]
pub struct PostService {
    posts: Arc<dyn PostRepository>,
    clock: Arc<dyn Clock>,
}

impl PostService {
    pub fn new(posts: Arc<dyn PostRepository>, clock: Arc<dyn Clock>) -> Self {
        Self { posts, clock }
    }

    /// One page of active posts with their authors, newest first.
    pub async fn list(&self, page: u64) -> Result<Page<AuthoredPost>, DomainError> {
        let filter = ActivePosts::at(self.clock.now());
        let request = PageRequest::new(page, POSTS_PER_PAGE);

        Ok(self.posts.find_active(filter, request).await?)
    }

    /// Create a post owned by `owner_id`.
    pub async fn create(&self, owner_id: Uuid, input: PostInput) -> Result<Post, DomainError> {
        let validated = input.validate(InputMode::Create)?;
        let post = Post::new(owner_id, validated, self.clock.now());

        let saved = self.posts.save(post).await?;
        tracing::info!(post_id = %saved.id, owner_id = %owner_id, "Post created");
        Ok(saved)
    }

    /// Fetch a post for public display.
    ///
    /// Drafts and scheduled posts are reported exactly like missing ones.
    pub async fn show(&self, id: Uuid) -> Result<Post, DomainError> {
        let now = self.clock.now();

        match self.posts.find_by_id(id).await? {
            Some(post) if post.is_active(now) => Ok(post),
            _ => Err(not_found(id)),
        }
    }

    /// Fetch a post by id regardless of its state.
    pub async fn find(&self, id: Uuid) -> Result<Post, DomainError> {
        self.posts.find_by_id(id).await?.ok_or_else(|| not_found(id))
    }

    /// Replace a post's fields on behalf of `actor_id`.
    pub async fn update(
        &self,
        actor_id: Uuid,
        id: Uuid,
        input: PostInput,
    ) -> Result<Post, DomainError> {
        let validated = input.validate(InputMode::Update)?;
        let mut post = self.find_modifiable(actor_id, id).await?;

        post.apply(validated, self.clock.now());

        let saved = self.posts.save(post).await?;
        tracing::info!(post_id = %id, "Post updated");
        Ok(saved)
    }

    /// Permanently remove a post on behalf of `actor_id`.
    pub async fn delete(&self, actor_id: Uuid, id: Uuid) -> Result<(), DomainError> {
        self.find_modifiable(actor_id, id).await?;

        self.posts.delete(id).await.map_err(|e| match e {
            crate::error::RepoError::NotFound => not_found(id),
            other => other.into(),
        })?;

        tracing::info!(post_id = %id, "Post deleted");
        Ok(())
    }

    async fn find_modifiable(&self, actor_id: Uuid, id: Uuid) -> Result<Post, DomainError> {
        let post = self.find(id).await?;

        if !post.can_modify(actor_id) {
            tracing::warn!(post_id = %id, actor_id = %actor_id, "Rejected change by non-owner");
            return Err(DomainError::Forbidden);
        }

        Ok(post)
    }
}

fn not_found(id: Uuid) -> DomainError {
    DomainError::NotFound {
        entity_type: "Post",
        id,
    }
}
