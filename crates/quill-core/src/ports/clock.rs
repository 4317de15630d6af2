//! Clock port - the single source of "now" for visibility and scheduling.

use chrono::{DateTime, Utc};

/// Provides the current time.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}
