//! Publication of scheduled posts.
//!
//! A post's visibility flips from scheduled to active on its own once
//! `published_at` passes. The periodic publication run only touches
//! `updated_at` so downstream consumers can observe the publish event.
//!
//! "Not yet processed" is approximated by `updated_at` being unset or equal
//! to `created_at`. An edit stamped at the exact creation instant is
//! indistinguishable from an unprocessed post.

use chrono::{DateTime, Utc};

use crate::domain::Post;
use crate::error::RepoError;
use crate::ports::{Clock, PostRepository};

/// Whether a publication run at `now` selects `post`.
pub fn is_pending_publication(post: &Post, now: DateTime<Utc>) -> bool {
    !post.is_draft
        && post.published_at.is_some_and(|at| at <= now)
        && post
            .updated_at
            .is_none_or(|updated_at| updated_at == post.created_at)
}

/// Run one publication pass: read the clock once and touch every pending
/// post in a single batch.
///
/// On failure nothing is retried here; the next scheduled run picks the
/// same posts up again.
pub async fn publish_scheduled_posts(
    posts: &dyn PostRepository,
    clock: &dyn Clock,
) -> Result<u64, RepoError> {
    let now = clock.now();
    let touched = posts.touch_published(now).await?;

    if touched > 0 {
        tracing::info!(count = touched, at = %now, "Published scheduled posts");
    } else {
        tracing::debug!(at = %now, "No scheduled posts to publish");
    }

    Ok(touched)
}
