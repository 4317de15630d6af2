use std::collections::BTreeMap;

use chrono::{Duration, TimeZone, Utc};
use sea_orm::{DatabaseBackend, DbErr, MockDatabase, MockExecResult, RuntimeErr, Value};

use quill_core::domain::{ActivePosts, PageRequest, Post};
use quill_core::error::RepoError;
use quill_core::ports::{BaseRepository, PostRepository};

use crate::database::entity::post;
use crate::database::postgres_repo::PostgresPostRepository;

fn model(id: uuid::Uuid, is_draft: bool) -> post::Model {
    let created = Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap();
    post::Model {
        id,
        user_id: uuid::Uuid::new_v4(),
        title: "Test Post".to_owned(),
        content: "Content".to_owned(),
        is_draft,
        published_at: Some(created.into()),
        created_at: created.into(),
        updated_at: Some(created.into()),
    }
}

#[tokio::test]
async fn test_find_post_by_id() {
    let post_id = uuid::Uuid::new_v4();

    let db = MockDatabase::new(DatabaseBackend::Postgres)
        .append_query_results(vec![vec![model(post_id, false)]])
        .into_connection();

    let repo = PostgresPostRepository::new(db);

    let result: Option<Post> = repo.find_by_id(post_id).await.unwrap();

    let post = result.unwrap();
    assert_eq!(post.title, "Test Post");
    assert_eq!(post.id, post_id);
    assert!(!post.is_draft);
    assert_eq!(post.updated_at, Some(post.created_at));
}

#[tokio::test]
async fn test_save_updates_existing_row() {
    let post_id = uuid::Uuid::new_v4();
    let mut stored = model(post_id, true);
    stored.title = "Renamed".to_owned();

    let db = MockDatabase::new(DatabaseBackend::Postgres)
        .append_query_results(vec![vec![stored.clone()]])
        .into_connection();

    let repo = PostgresPostRepository::new(db);
    let saved: Post = repo.save(Post::from(stored)).await.unwrap();

    assert_eq!(saved.title, "Renamed");
    assert!(saved.is_draft);
}

#[tokio::test]
async fn test_delete_missing_row_is_not_found() {
    let db = MockDatabase::new(DatabaseBackend::Postgres)
        .append_exec_results(vec![MockExecResult {
            last_insert_id: 0,
            rows_affected: 0,
        }])
        .into_connection();

    let repo = PostgresPostRepository::new(db);
    let result = BaseRepository::<Post, uuid::Uuid>::delete(&repo, uuid::Uuid::new_v4()).await;

    assert!(matches!(result, Err(RepoError::NotFound)));
}

#[tokio::test]
async fn test_touch_published_is_a_single_filtered_update() {
    let now = Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap() + Duration::minutes(1);

    let db = MockDatabase::new(DatabaseBackend::Postgres)
        .append_exec_results(vec![MockExecResult {
            last_insert_id: 0,
            rows_affected: 3,
        }])
        .into_connection();

    let repo = PostgresPostRepository::new(db);
    let touched = repo.touch_published(now).await.unwrap();
    assert_eq!(touched, 3);

    // One statement, no read-before-write.
    let log = repo.db.into_transaction_log();
    assert_eq!(log.len(), 1);

    let statements = log[0].statements();
    assert_eq!(statements.len(), 1);
    let sql = &statements[0].sql;
    assert!(sql.starts_with(r#"UPDATE "posts" SET "updated_at" = $1"#), "{sql}");
    assert!(sql.contains(r#""posts"."is_draft" = $2"#), "{sql}");
    assert!(sql.contains(r#""posts"."published_at" IS NOT NULL"#), "{sql}");
    assert!(sql.contains(r#""posts"."published_at" <= $3"#), "{sql}");
    assert!(
        sql.contains(r#"("posts"."updated_at" IS NULL OR "created_at" = "updated_at")"#),
        "{sql}"
    );

    let values = &statements[0].values.as_ref().unwrap().0;
    assert_eq!(
        values,
        &vec![Value::from(now), Value::from(false), Value::from(now)]
    );
}

#[tokio::test]
async fn test_find_active_past_the_end_skips_page_query() {
    let count_row = BTreeMap::from([("num_items", Value::from(1i64))]);

    let db = MockDatabase::new(DatabaseBackend::Postgres)
        .append_query_results(vec![vec![count_row]])
        .into_connection();

    let repo = PostgresPostRepository::new(db);
    let now = Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap();
    let page = repo
        .find_active(ActivePosts::at(now), PageRequest::new(u64::MAX, 20))
        .await
        .unwrap();

    assert!(page.items.is_empty());
    assert_eq!(page.total, 1);

    // Only the count ran.
    assert_eq!(repo.db.into_transaction_log().len(), 1);
}

#[tokio::test]
async fn test_connection_failures_are_reported_as_such() {
    let db = MockDatabase::new(DatabaseBackend::Postgres)
        .append_query_errors(vec![DbErr::Conn(RuntimeErr::Internal(
            "connection refused".to_owned(),
        ))])
        .into_connection();

    let repo = PostgresPostRepository::new(db);
    let result: Result<Option<Post>, RepoError> = repo.find_by_id(uuid::Uuid::new_v4()).await;

    assert!(matches!(result, Err(RepoError::Connection(_))));
}
