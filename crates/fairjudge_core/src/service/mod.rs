//! Core use-case services.
//!
//! # Responsibility
//! - Wrap engine runs in storage transactions for callers such as the CLI.
//! - Keep callers decoupled from repository construction.

pub mod judging_service;

pub use judging_service::{JudgingService, ServiceError, ServiceResult};
