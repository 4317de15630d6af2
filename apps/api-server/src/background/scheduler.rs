//! Cron scheduler driving the publication run.

use std::sync::Arc;

use tokio_cron_scheduler::{Job, JobScheduler, JobSchedulerError};
use uuid::Uuid;

use quill_core::ports::{Clock, PostRepository};

use super::publish::{EVERY_MINUTE, run_publication};
use crate::config::env_flag;

/// Scheduler configuration, read from `SCHEDULER_ENABLED`.
#[derive(Debug, Clone)]
pub struct SchedulerConfig {
    pub enabled: bool,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self { enabled: true }
    }
}

impl SchedulerConfig {
    pub fn from_env() -> Self {
        Self {
            enabled: env_flag("SCHEDULER_ENABLED", true),
        }
    }
}

/// Owns the job scheduler. When disabled, nothing is registered or started.
pub struct Scheduler {
    inner: JobScheduler,
    enabled: bool,
    publication_job: Option<Uuid>,
}

impl Scheduler {
    pub async fn new(config: SchedulerConfig) -> Result<Self, JobSchedulerError> {
        Ok(Self {
            inner: JobScheduler::new().await?,
            enabled: config.enabled,
            publication_job: None,
        })
    }

    /// Register the once-a-minute publication run against `posts`.
    ///
    /// Returns the job id, or `None` when the scheduler is disabled.
    pub async fn register_publication(
        &mut self,
        posts: Arc<dyn PostRepository>,
        clock: Arc<dyn Clock>,
    ) -> Result<Option<Uuid>, JobSchedulerError> {
        if !self.enabled {
            tracing::info!("Scheduler disabled; publication job not registered");
            return Ok(None);
        }

        let job = Job::new_async(EVERY_MINUTE, move |_id, _lock| {
            Box::pin(run_publication(posts.clone(), clock.clone()))
        })?;

        let id = self.inner.add(job).await?;
        tracing::info!(schedule = EVERY_MINUTE, job_id = %id, "Publication job registered");
        self.publication_job = Some(id);
        Ok(Some(id))
    }

    /// Start running registered jobs. A no-op when nothing is registered.
    pub async fn start(&self) -> Result<(), JobSchedulerError> {
        if self.publication_job.is_none() {
            return Ok(());
        }

        self.inner.start().await?;
        tracing::info!("Scheduler started");
        Ok(())
    }

    pub async fn shutdown(&mut self) -> Result<(), JobSchedulerError> {
        if self.publication_job.take().is_none() {
            return Ok(());
        }

        self.inner.shutdown().await?;
        tracing::info!("Scheduler stopped");
        Ok(())
    }
}
