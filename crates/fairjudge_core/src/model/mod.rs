//! Domain model for fair entities and judging assignments.
//!
//! # Responsibility
//! - Define canonical records read by the assignment engine.
//! - Keep eligibility attributes (category, division, active flag) explicit.
//!
//! # Invariants
//! - Projects and judges are identified by integer ids assigned in insertion
//!   order; ordering by id is ordering by insertion.
//! - At most one assignment exists per `(judge, project, rubric)`.

pub mod assignment;
pub mod fair;
