use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::input::ValidatedPost;
use super::user::User;

/// Number of posts returned per listing page.
pub const POSTS_PER_PAGE: u64 = 20;

/// Post entity - a blog post owned by the user who created it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Post {
    pub id: Uuid,
    /// Owner of the post. Never changes after creation.
    pub user_id: Uuid,
    pub title: String,
    pub content: String,
    pub is_draft: bool,
    pub published_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

/// Publication state of a post, derived from its fields and the current time.
///
/// A post moves from `Scheduled` to `Active` on its own as the clock passes
/// `published_at`; no write is involved.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PostState {
    Draft,
    Scheduled,
    Active,
}

impl Post {
    /// Create a new post owned by `user_id`, stamped at `now`.
    pub fn new(user_id: Uuid, input: ValidatedPost, now: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            user_id,
            title: input.title,
            content: input.content,
            is_draft: input.is_draft.unwrap_or(false),
            published_at: input.published_at.unwrap_or(None),
            created_at: now,
            updated_at: Some(now),
        }
    }

    /// Classify the post at `now`.
    ///
    /// A non-draft post without a publish time has nothing to reach, so it
    /// stays a draft.
    pub fn state(&self, now: DateTime<Utc>) -> PostState {
        match (self.is_draft, self.published_at) {
            (true, _) | (false, None) => PostState::Draft,
            (false, Some(at)) if at <= now => PostState::Active,
            (false, Some(_)) => PostState::Scheduled,
        }
    }

    /// Whether the post is publicly visible at `now`. The boundary is inclusive.
    pub fn is_active(&self, now: DateTime<Utc>) -> bool {
        self.state(now) == PostState::Active
    }

    /// Whether `actor_id` may update or delete this post.
    pub fn can_modify(&self, actor_id: Uuid) -> bool {
        self.user_id == actor_id
    }

    /// Apply validated changes from the owner, touching `updated_at`.
    ///
    /// `published_at` is only replaced when the input carried the field.
    pub fn apply(&mut self, input: ValidatedPost, now: DateTime<Utc>) {
        self.title = input.title;
        self.content = input.content;
        if let Some(is_draft) = input.is_draft {
            self.is_draft = is_draft;
        }
        if let Some(published_at) = input.published_at {
            self.published_at = published_at;
        }
        self.updated_at = Some(now);
    }
}

/// A listed post together with its author.
///
/// `author` is `None` only when the owning account no longer resolves.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthoredPost {
    pub post: Post,
    pub author: Option<User>,
}

/// The visibility predicate as a collection filter, used by listings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ActivePosts {
    pub now: DateTime<Utc>,
}

impl ActivePosts {
    pub fn at(now: DateTime<Utc>) -> Self {
        Self { now }
    }

    pub fn matches(&self, post: &Post) -> bool {
        post.is_active(self.now)
    }
}
