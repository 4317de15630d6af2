//! PostgreSQL repository implementations.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sea_orm::sea_query::Expr;
use sea_orm::{ColumnTrait, Condition, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder};

use quill_core::domain::{ActivePosts, AuthoredPost, Page, PageRequest, User};
use quill_core::error::RepoError;
use quill_core::ports::{PostRepository, UserRepository};

use super::entity::post::{self, Entity as PostEntity};
use super::entity::user::{self, Entity as UserEntity};
use super::postgres_base::{PostgresBaseRepository, db_error};

/// PostgreSQL user repository.
pub type PostgresUserRepository = PostgresBaseRepository<UserEntity>;

/// PostgreSQL post repository.
pub type PostgresPostRepository = PostgresBaseRepository<PostEntity>;

/// Mask the local part of an email so it can be logged.
fn mask_email(email: &str) -> String {
    match email.split_once('@') {
        Some((local, domain)) if local.chars().count() > 1 => {
            let first: String = local.chars().take(1).collect();
            format!("{first}***@{domain}")
        }
        Some((_, domain)) => format!("***@{domain}"),
        None => "***".to_string(),
    }
}

#[async_trait]
impl UserRepository for PostgresUserRepository {
    async fn find_by_email(&self, email: &str) -> Result<Option<User>, RepoError> {
        tracing::debug!(user_email = %mask_email(email), "Finding user by email");

        let result = UserEntity::find()
            .filter(user::Column::Email.eq(email.trim().to_lowercase()))
            .one(&self.db)
            .await
            .map_err(db_error)?;

        Ok(result.map(Into::into))
    }
}

/// Rows that are not drafts and whose publish time is at or before `now`.
fn published_by(now: DateTime<Utc>) -> Condition {
    Condition::all()
        .add(post::Column::IsDraft.eq(false))
        .add(post::Column::PublishedAt.is_not_null())
        .add(post::Column::PublishedAt.lte(now))
}

#[async_trait]
impl PostRepository for PostgresPostRepository {
    async fn find_active(
        &self,
        filter: ActivePosts,
        page: PageRequest,
    ) -> Result<Page<AuthoredPost>, RepoError> {
        let paginator = PostEntity::find()
            .find_also_related(UserEntity)
            .filter(published_by(filter.now))
            .order_by_desc(post::Column::CreatedAt)
            .order_by_desc(post::Column::Id)
            .paginate(&self.db, page.per_page);

        let total = paginator.num_items().await.map_err(db_error)?;

        // Pages past the end are answered without a second query; this also
        // keeps the paginator's offset arithmetic in range.
        if page.offset() >= total {
            return Ok(Page::new(Vec::new(), page, total));
        }

        let rows = paginator
            .fetch_page(page.page - 1)
            .await
            .map_err(db_error)?;

        let items = rows
            .into_iter()
            .map(|(post, author)| AuthoredPost {
                post: post.into(),
                author: author.map(Into::into),
            })
            .collect();

        Ok(Page::new(items, page, total))
    }

    async fn touch_published(&self, now: DateTime<Utc>) -> Result<u64, RepoError> {
        let never_modified = Condition::any()
            .add(post::Column::UpdatedAt.is_null())
            .add(Expr::col(post::Column::CreatedAt).equals(post::Column::UpdatedAt));

        let result = PostEntity::update_many()
            .col_expr(post::Column::UpdatedAt, Expr::value(now))
            .filter(published_by(now))
            .filter(never_modified)
            .exec(&self.db)
            .await
            .map_err(db_error)?;

        Ok(result.rows_affected)
    }
}
