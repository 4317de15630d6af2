//! Application state - shared across all handlers.

use std::sync::Arc;

use quill_core::ports::{Clock, PostRepository, UserRepository};
use quill_core::services::PostService;
use quill_infra::database::{DatabaseConfig, InMemoryPostRepository, InMemoryUserRepository};

#[cfg(feature = "postgres")]
use quill_infra::database::{DatabaseConnections, PostgresPostRepository, PostgresUserRepository};

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub posts: PostService,
    pub post_repo: Arc<dyn PostRepository>,
    pub users: Arc<dyn UserRepository>,
    pub clock: Arc<dyn Clock>,
}

impl AppState {
    /// Assemble state from repositories and a clock.
    pub fn from_parts(
        post_repo: Arc<dyn PostRepository>,
        users: Arc<dyn UserRepository>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            posts: PostService::new(post_repo.clone(), clock.clone()),
            post_repo,
            users,
            clock,
        }
    }

    /// State backed by in-memory repositories.
    pub fn in_memory(clock: Arc<dyn Clock>) -> Self {
        let users = Arc::new(InMemoryUserRepository::new());
        Self::from_parts(
            Arc::new(InMemoryPostRepository::with_users(users.clone())),
            users,
            clock,
        )
    }

    /// Build the application state with appropriate implementations.
    ///
    /// Falls back to in-memory repositories when no database is configured
    /// or the connection fails.
    pub async fn new(db_config: Option<&DatabaseConfig>, clock: Arc<dyn Clock>) -> Self {
        #[cfg(feature = "postgres")]
        {
            if let Some(config) = db_config {
                match DatabaseConnections::init(config).await {
                    Ok(connections) => {
                        tracing::info!("Application state initialized (postgres)");
                        return Self::from_parts(
                            Arc::new(PostgresPostRepository::new(connections.main.clone())),
                            Arc::new(PostgresUserRepository::new(connections.main)),
                            clock,
                        );
                    }
                    Err(e) => {
                        tracing::error!(
                            "Failed to connect to database: {}. Using in-memory fallback.",
                            e
                        );
                    }
                }
            } else {
                tracing::warn!("DATABASE_URL not set. Running without database (in-memory mode).");
            }
        }

        #[cfg(not(feature = "postgres"))]
        {
            let _ = db_config;
            tracing::info!("Running without postgres feature - using in-memory repositories");
        }

        tracing::info!("Application state initialized (in-memory)");
        Self::in_memory(clock)
    }
}
