//! # Quill API Server
//!
//! The main entry point for the Actix-web HTTP server.

use std::sync::Arc;

use actix_web::{App, HttpServer, web};
use tracing_actix_web::TracingLogger;

#[cfg(feature = "scheduler")]
mod background;
mod config;
mod handlers;
mod middleware;
mod observability;
mod state;
mod telemetry;

use config::AppConfig;
use middleware::rate_limit::RateLimitMiddleware;
use observability::RequestIdMiddleware;
use quill_core::ports::{Clock, PasswordService, RateLimiter, TokenService};
use quill_infra::{Argon2PasswordService, InMemoryRateLimiter, JwtTokenService, SystemClock};
use state::AppState;

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    // Load .env file if present
    dotenvy::dotenv().ok();

    let config = AppConfig::from_env();
    telemetry::init_telemetry(&config.telemetry);
    config.check_secrets();

    tracing::info!(
        "Starting Quill API Server on {}:{}",
        config.host,
        config.port
    );

    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let state = AppState::new(config.database.as_ref(), clock.clone()).await;

    let token_service: Arc<dyn TokenService> = Arc::new(JwtTokenService::new(config.jwt.clone()));
    let password_service: Arc<dyn PasswordService> = Arc::new(Argon2PasswordService::default());
    let rate_limiter: Arc<dyn RateLimiter> = Arc::new(
        InMemoryRateLimiter::new(config.rate_limit.clone())
            .map_err(|e| std::io::Error::other(e.to_string()))?,
    );

    #[cfg(feature = "scheduler")]
    let mut scheduler = start_scheduler(&config, &state).await;

    let server_state = state.clone();
    HttpServer::new(move || {
        App::new()
            .wrap(RateLimitMiddleware::new(rate_limiter.clone()))
            .wrap(TracingLogger::default())
            .wrap(RequestIdMiddleware)
            .app_data(middleware::error::json_config())
            .app_data(web::Data::new(server_state.clone()))
            .app_data(web::Data::new(token_service.clone()))
            .app_data(web::Data::new(password_service.clone()))
            .configure(handlers::configure_routes)
    })
    .bind((config.host.as_str(), config.port))?
    .run()
    .await?;

    #[cfg(feature = "scheduler")]
    if let Some(scheduler) = scheduler.as_mut() {
        if let Err(e) = scheduler.shutdown().await {
            tracing::warn!(error = %e, "Scheduler did not shut down cleanly");
        }
    }

    tracing::info!("Server stopped");
    Ok(())
}

/// Start the publication scheduler. Failures are logged; the server runs without it.
#[cfg(feature = "scheduler")]
async fn start_scheduler(config: &AppConfig, state: &AppState) -> Option<background::Scheduler> {
    let mut scheduler = match background::Scheduler::new(config.scheduler.clone()).await {
        Ok(scheduler) => scheduler,
        Err(e) => {
            tracing::error!(error = %e, "Failed to create scheduler");
            return None;
        }
    };

    match scheduler
        .register_publication(state.post_repo.clone(), state.clock.clone())
        .await
    {
        Ok(Some(_)) => {}
        Ok(None) => return None,
        Err(e) => {
            tracing::error!(error = %e, "Failed to register publication job");
            return None;
        }
    }

    if let Err(e) = scheduler.start().await {
        tracing::error!(error = %e, "Failed to start scheduler");
        return None;
    }

    Some(scheduler)
}
