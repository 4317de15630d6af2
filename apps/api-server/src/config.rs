//! Application configuration loaded from environment variables.

use std::env;
use std::str::FromStr;
use std::time::Duration;

use quill_infra::auth::JwtConfig;
use quill_infra::database::DatabaseConfig;
use quill_infra::rate_limit::RateLimitConfig;

#[cfg(feature = "scheduler")]
use crate::background::SchedulerConfig;
use crate::telemetry::TelemetryConfig;

/// Application configuration.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    pub database: Option<DatabaseConfig>,
    pub jwt: JwtConfig,
    pub rate_limit: RateLimitConfig,
    #[cfg(feature = "scheduler")]
    pub scheduler: SchedulerConfig,
    pub telemetry: TelemetryConfig,
}

/// Read and parse an environment variable, falling back to `default`.
pub(crate) fn env_or<T: FromStr>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(default)
}

/// Read a boolean flag; anything other than `false`/`0` counts as enabled.
pub(crate) fn env_flag(key: &str, default: bool) -> bool {
    env::var(key)
        .map(|v| v != "false" && v != "0")
        .unwrap_or(default)
}

impl AppConfig {
    /// Load configuration from environment variables.
    pub fn from_env() -> Self {
        let database = env::var("DATABASE_URL").ok().map(|url| DatabaseConfig {
            url,
            max_connections: env_or("DB_MAX_CONNECTIONS", 100),
            min_connections: env_or("DB_MIN_CONNECTIONS", 10),
            connect_timeout: Duration::from_secs(env_or("DB_CONNECT_TIMEOUT_SECS", 10)),
        });

        let jwt_defaults = JwtConfig::default();
        let jwt = JwtConfig {
            secret: env::var("JWT_SECRET").unwrap_or(jwt_defaults.secret),
            expiration_hours: env_or("JWT_EXPIRATION_HOURS", jwt_defaults.expiration_hours),
            issuer: env::var("JWT_ISSUER").unwrap_or(jwt_defaults.issuer),
        };

        let rate_defaults = RateLimitConfig::default();
        let rate_limit = RateLimitConfig {
            max_requests: env_or("RATE_LIMIT_MAX_REQUESTS", rate_defaults.max_requests),
            window: Duration::from_secs(env_or(
                "RATE_LIMIT_WINDOW_SECS",
                rate_defaults.window.as_secs(),
            )),
        };

        Self {
            host: env::var("HOST").unwrap_or_else(|_| "127.0.0.1".to_string()),
            port: env_or("PORT", 8080),
            database,
            jwt,
            rate_limit,
            #[cfg(feature = "scheduler")]
            scheduler: SchedulerConfig::from_env(),
            telemetry: TelemetryConfig::from_env(),
        }
    }

    /// Warn when the placeholder JWT secret is in use; louder in production.
    pub fn check_secrets(&self) {
        if self.jwt.secret != quill_infra::auth::DEFAULT_JWT_SECRET {
            return;
        }

        let is_production = env::var("RUST_ENV")
            .map(|v| v == "production" || v == "prod")
            .unwrap_or(false);

        if is_production {
            tracing::error!(
                "SECURITY: Using default JWT secret in production! Set JWT_SECRET environment variable."
            );
        } else {
            tracing::warn!("Using default JWT secret. Set JWT_SECRET for production use.");
        }
    }
}
