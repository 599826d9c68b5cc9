//! Judging configuration passed into every orchestrator run.
//!
//! # Responsibility
//! - Carry the minimum-coverage knobs and the rubric assignments are made
//!   under.
//! - Validate values before any assignment work starts.
//!
//! # Invariants
//! - Configuration is an explicit value; core never reads process-wide state.

use crate::model::fair::RubricId;
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Rubric seeded by the initial schema migration.
pub const DEFAULT_RUBRIC_ID: RubricId = 1;
pub const DEFAULT_MINIMUM_JUDGES_PER_PROJECT: u32 = 2;
pub const DEFAULT_MINIMUM_PROJECTS_PER_JUDGE: u32 = 1;

/// Global scalars that drive the assignment engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct JudgingConfig {
    /// Rubric new assignments are created under; counts are per rubric.
    pub rubric: RubricId,
    pub minimum_judges_per_project: u32,
    pub minimum_projects_per_judge: u32,
}

impl Default for JudgingConfig {
    fn default() -> Self {
        Self {
            rubric: DEFAULT_RUBRIC_ID,
            minimum_judges_per_project: DEFAULT_MINIMUM_JUDGES_PER_PROJECT,
            minimum_projects_per_judge: DEFAULT_MINIMUM_PROJECTS_PER_JUDGE,
        }
    }
}

impl JudgingConfig {
    /// Builds a config for `rubric` with the given minimums.
    pub fn new(
        rubric: RubricId,
        minimum_judges_per_project: u32,
        minimum_projects_per_judge: u32,
    ) -> Self {
        Self {
            rubric,
            minimum_judges_per_project,
            minimum_projects_per_judge,
        }
    }

    /// Rejects values the engine cannot act on.
    ///
    /// # Errors
    /// - `NonPositiveRubric` when `rubric <= 0`.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.rubric <= 0 {
            return Err(ConfigError::NonPositiveRubric(self.rubric));
        }
        Ok(())
    }

    /// Total assignments needed for every project to reach its minimum.
    pub fn project_ceiling(&self, project_count: usize) -> u64 {
        project_count as u64 * u64::from(self.minimum_judges_per_project)
    }

    /// Total assignments needed for every judge to reach its minimum.
    pub fn judge_ceiling(&self, judge_count: usize) -> u64 {
        judge_count as u64 * u64::from(self.minimum_projects_per_judge)
    }
}

/// Configuration validation errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    NonPositiveRubric(RubricId),
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NonPositiveRubric(value) => {
                write!(f, "rubric id must be positive, got {value}")
            }
        }
    }
}

impl Error for ConfigError {}
