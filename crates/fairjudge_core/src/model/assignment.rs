//! Judging assignment record.
//!
//! # Invariants
//! - `id` is stable for the lifetime of the pairing; a balancer move deletes
//!   the old record and creates a new one with a fresh id.
//! - `has_response` is derived from recorded responses, never stored.

use crate::model::fair::{JudgeId, ProjectId, RubricId};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Stable identifier of one assignment row.
pub type AssignmentId = Uuid;

/// One judge paired with one project under a rubric.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Assignment {
    pub id: AssignmentId,
    pub judge: JudgeId,
    pub project: ProjectId,
    pub rubric: RubricId,
    /// Scored assignments are frozen: never moved or deleted by the engine.
    pub has_response: bool,
}

impl Assignment {
    /// Creates a fresh, unscored assignment with a generated id.
    pub fn new(judge: JudgeId, project: ProjectId, rubric: RubricId) -> Self {
        Self {
            id: Uuid::new_v4(),
            judge,
            project,
            rubric,
            has_response: false,
        }
    }

    /// Returns whether the engine may move or delete this assignment.
    pub fn is_movable(&self) -> bool {
        !self.has_response
    }
}
