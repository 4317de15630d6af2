//! Periodic publication of scheduled posts.

use std::sync::Arc;

use quill_core::ports::{Clock, PostRepository};
use quill_core::publication::publish_scheduled_posts;

/// At second zero of every minute.
pub const EVERY_MINUTE: &str = "0 * * * * *";

/// One tick of the publication job.
///
/// A failed run is logged and dropped; the following tick is the retry.
pub(super) async fn run_publication(posts: Arc<dyn PostRepository>, clock: Arc<dyn Clock>) {
    if let Err(e) = publish_scheduled_posts(posts.as_ref(), clock.as_ref()).await {
        tracing::warn!(error = %e, "Publication run failed; next run will retry");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use quill_core::domain::Post;
    use quill_core::ports::BaseRepository;
    use quill_infra::{InMemoryPostRepository, ManualClock};
    use uuid::Uuid;

    #[tokio::test]
    async fn test_tick_touches_published_post() {
        let created = Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap();
        let clock = Arc::new(ManualClock::new(created));
        let posts = Arc::new(InMemoryPostRepository::new());

        let post = Post {
            id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            title: "T".to_string(),
            content: "C".to_string(),
            is_draft: false,
            published_at: Some(created),
            created_at: created,
            updated_at: Some(created),
        };
        posts.save(post.clone()).await.unwrap();

        clock.advance(chrono::Duration::minutes(1));
        run_publication(posts.clone(), clock.clone()).await;

        let stored = posts.find_by_id(post.id).await.unwrap().unwrap();
        assert_eq!(stored.updated_at, Some(clock.now()));
    }
}
