//! Assignment engine.
//!
//! # Responsibility
//! - Keep judge/project assignments eligible, covered and balanced for one
//!   rubric.
//! - Expose one entry point per triggering event through `Orchestrator`.
//!
//! # Invariants
//! - Scored assignments are never removed or moved.
//! - Every created assignment pairs an active judge with a project of a
//!   matching category and division.

pub mod eligibility;
pub mod ledger;
pub mod orchestrator;
pub mod remover;
pub mod report;
pub mod run;
pub mod stats;

mod assigner;
mod balancer;

pub use balancer::choose_direction;
pub use eligibility::{eligible, EligibilityIndex};
pub use orchestrator::{EngineError, EngineResult, Orchestrator};
pub use report::{
    AssignmentMove, BalanceDirection, CoverageGap, GapSubject, OperationFailure, RebalanceReport,
    RebalanceTrigger, ReportSummary, StoreOperation,
};
pub use run::RunPhase;
