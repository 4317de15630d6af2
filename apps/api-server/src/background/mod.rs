//! Background jobs.

mod publish;
mod scheduler;

pub use scheduler::{Scheduler, SchedulerConfig};
