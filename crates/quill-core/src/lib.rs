//! # Quill Core
//!
//! The domain layer of the Quill publishing backend: posts, their
//! visibility rules, and the ports infrastructure must implement.
//! This crate contains pure business logic with zero infrastructure dependencies.

pub mod domain;
pub mod error;
pub mod ports;
pub mod publication;
pub mod services;

pub use error::{DomainError, RepoError};
