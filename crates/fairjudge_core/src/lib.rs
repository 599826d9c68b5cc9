//! Core domain logic for fairjudge.
//! This crate is the single source of truth for judging assignment invariants.

pub mod award;
pub mod config;
pub mod db;
pub mod engine;
pub mod logging;
pub mod model;
pub mod repo;
pub mod service;

pub use config::{ConfigError, JudgingConfig};
pub use db::{open_db, open_db_in_memory, DbError, DbResult};
pub use engine::{
    BalanceDirection, EngineError, EngineResult, Orchestrator, RebalanceReport, RebalanceTrigger,
};
pub use logging::{default_log_level, init_logging, logging_status, LoggingError};
pub use model::assignment::{Assignment, AssignmentId};
pub use model::fair::{
    Category, CategoryId, Division, DivisionId, Judge, JudgeId, ModelValidationError, Placement,
    Project, ProjectId, Rubric, RubricId,
};
pub use repo::assignment_repo::{
    AssignmentStore, SqliteAssignmentStore, StoreError, StoreResult,
};
pub use repo::fair_repo::{
    FairDirectory, FairRepository, NewJudge, NewProject, RepoError, RepoResult,
    SqliteFairRepository,
};
pub use service::{JudgingService, ServiceError, ServiceResult};

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
