//! Repository layer abstractions and persistence implementations.
//!
//! # Responsibility
//! - Define the data access contracts the assignment engine consumes.
//! - Isolate SQLite query details from engine and service orchestration.
//!
//! # Invariants
//! - Repository APIs return semantic errors (`NotFound`, `DuplicateAssignment`,
//!   `ProtectedAssignment`) in addition to DB transport errors.

pub mod assignment_repo;
pub mod fair_repo;
