use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::domain::{ActivePosts, AuthoredPost, Page, PageRequest, Post, User};
use crate::error::RepoError;

/// Generic repository trait defining standard CRUD operations.
#[async_trait]
pub trait BaseRepository<T, ID>: Send + Sync {
    /// Find an entity by its unique ID.
    async fn find_by_id(&self, id: ID) -> Result<Option<T>, RepoError>;

    /// Save an entity (create or update).
    async fn save(&self, entity: T) -> Result<T, RepoError>;

    /// Delete an entity by its ID.
    async fn delete(&self, id: ID) -> Result<(), RepoError>;
}

/// User repository with domain-specific methods.
#[async_trait]
pub trait UserRepository: BaseRepository<User, Uuid> {
    /// Find a user by their email address.
    async fn find_by_email(&self, email: &str) -> Result<Option<User>, RepoError>;
}

/// Post repository.
#[async_trait]
pub trait PostRepository: BaseRepository<Post, Uuid> {
    /// Posts matching `filter` with their authors loaded, newest first
    /// (`created_at`, then `id`, descending).
    async fn find_active(
        &self,
        filter: ActivePosts,
        page: PageRequest,
    ) -> Result<Page<AuthoredPost>, RepoError>;

    /// Set `updated_at = now` on every post that became publishable and was
    /// never modified since creation, in one batch. Returns rows affected.
    async fn touch_published(&self, now: DateTime<Utc>) -> Result<u64, RepoError>;
}
