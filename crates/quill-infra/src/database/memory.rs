//! In-memory repositories - used when no database is configured and in tests.
//!
//! Note: Data is lost on process restart.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;
use uuid::Uuid;

use quill_core::domain::{ActivePosts, AuthoredPost, Page, PageRequest, Post, User};
use quill_core::error::RepoError;
use quill_core::ports::{BaseRepository, PostRepository, UserRepository};
use quill_core::publication::is_pending_publication;

/// In-memory post store keyed by post id.
///
/// Listings resolve authors from `users`, standing in for the join the
/// SeaORM repository performs.
#[derive(Default)]
pub struct InMemoryPostRepository {
    store: RwLock<HashMap<Uuid, Post>>,
    users: Arc<InMemoryUserRepository>,
}

impl InMemoryPostRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// A post store whose listings load authors from `users`.
    pub fn with_users(users: Arc<InMemoryUserRepository>) -> Self {
        Self {
            store: RwLock::default(),
            users,
        }
    }
}

#[async_trait]
impl BaseRepository<Post, Uuid> for InMemoryPostRepository {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<Post>, RepoError> {
        Ok(self.store.read().await.get(&id).cloned())
    }

    async fn save(&self, post: Post) -> Result<Post, RepoError> {
        self.store.write().await.insert(post.id, post.clone());
        Ok(post)
    }

    async fn delete(&self, id: Uuid) -> Result<(), RepoError> {
        match self.store.write().await.remove(&id) {
            Some(_) => Ok(()),
            None => Err(RepoError::NotFound),
        }
    }
}

#[async_trait]
impl PostRepository for InMemoryPostRepository {
    async fn find_active(
        &self,
        filter: ActivePosts,
        page: PageRequest,
    ) -> Result<Page<AuthoredPost>, RepoError> {
        let store = self.store.read().await;

        let mut active: Vec<&Post> = store.values().filter(|p| filter.matches(p)).collect();
        active.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));

        let total = active.len() as u64;
        let skip = usize::try_from(page.offset()).unwrap_or(usize::MAX);
        let take = usize::try_from(page.per_page).unwrap_or(usize::MAX);
        let posts: Vec<Post> = active.into_iter().skip(skip).take(take).cloned().collect();
        drop(store);

        let users = self.users.store.read().await;
        let items = posts
            .into_iter()
            .map(|post| AuthoredPost {
                author: users.get(&post.user_id).cloned(),
                post,
            })
            .collect();

        Ok(Page::new(items, page, total))
    }

    async fn touch_published(&self, now: DateTime<Utc>) -> Result<u64, RepoError> {
        let mut store = self.store.write().await;
        let mut touched = 0;

        for post in store.values_mut() {
            if is_pending_publication(post, now) {
                post.updated_at = Some(now);
                touched += 1;
            }
        }

        Ok(touched)
    }
}

/// In-memory user store keyed by user id.
#[derive(Default)]
pub struct InMemoryUserRepository {
    store: RwLock<HashMap<Uuid, User>>,
}

impl InMemoryUserRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl BaseRepository<User, Uuid> for InMemoryUserRepository {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, RepoError> {
        Ok(self.store.read().await.get(&id).cloned())
    }

    async fn save(&self, user: User) -> Result<User, RepoError> {
        let mut store = self.store.write().await;

        // Mirrors the unique index on users.email.
        if store
            .values()
            .any(|u| u.id != user.id && u.email == user.email)
        {
            return Err(RepoError::Constraint("Entity already exists".to_string()));
        }

        store.insert(user.id, user.clone());
        Ok(user)
    }

    async fn delete(&self, id: Uuid) -> Result<(), RepoError> {
        match self.store.write().await.remove(&id) {
            Some(_) => Ok(()),
            None => Err(RepoError::NotFound),
        }
    }
}

#[async_trait]
impl UserRepository for InMemoryUserRepository {
    async fn find_by_email(&self, email: &str) -> Result<Option<User>, RepoError> {
        let email = email.trim().to_lowercase();
        Ok(self
            .store
            .read()
            .await
            .values()
            .find(|u| u.email == email)
            .cloned())
    }
}
