//! Ports - trait definitions for external dependencies.
//! These are the "interfaces" that infrastructure must implement.

mod auth;
mod clock;
mod rate_limit;
mod repository;

pub use auth::{AuthError, PasswordService, TokenClaims, TokenService};
pub use clock::Clock;
pub use rate_limit::{RateLimitError, RateLimitResult, RateLimiter};
pub use repository::{BaseRepository, PostRepository, UserRepository};
