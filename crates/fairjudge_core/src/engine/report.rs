//! Rebalance run report and its building blocks.

use crate::model::assignment::Assignment;
use crate::model::fair::{JudgeId, ProjectId};
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};

/// Event that started an orchestrator run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "id", rename_all = "snake_case")]
pub enum RebalanceTrigger {
    Full,
    ChangedProject(ProjectId),
    ChangedJudge(JudgeId),
    DeactivatedJudge(JudgeId),
}

impl Display for RebalanceTrigger {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Full => write!(f, "full"),
            Self::ChangedProject(id) => write!(f, "changed_project:{id}"),
            Self::ChangedJudge(id) => write!(f, "changed_judge:{id}"),
            Self::DeactivatedJudge(id) => write!(f, "deactivated_judge:{id}"),
        }
    }
}

/// Side of the relation the balancer trimmed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BalanceDirection {
    /// Heavy judges hand projects to lighter judges.
    Judges,
    /// Heavy projects hand judges to lighter projects.
    Projects,
}

impl Display for BalanceDirection {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Judges => write!(f, "judges"),
            Self::Projects => write!(f, "projects"),
        }
    }
}

/// One unscored assignment re-homed by the balancer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssignmentMove {
    pub from: Assignment,
    pub to: Assignment,
}

/// Subject of a coverage gap.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "id", rename_all = "snake_case")]
pub enum GapSubject {
    Project(ProjectId),
    Judge(JudgeId),
}

/// Subject left below its minimum because no eligible counterpart remained.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CoverageGap {
    pub subject: GapSubject,
    pub target: u32,
    pub assigned: usize,
}

/// Store write that failed during a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StoreOperation {
    Create,
    Delete,
    Inspect,
}

impl Display for StoreOperation {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Create => write!(f, "create"),
            Self::Delete => write!(f, "delete"),
            Self::Inspect => write!(f, "inspect"),
        }
    }
}

/// Per-operation failure; reported and skipped, never fatal to a run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OperationFailure {
    pub operation: StoreOperation,
    pub judge: JudgeId,
    pub project: ProjectId,
    pub message: String,
}

/// Result of one orchestrator run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RebalanceReport {
    pub trigger: RebalanceTrigger,
    pub direction: Option<BalanceDirection>,
    pub created: Vec<Assignment>,
    pub removed: Vec<Assignment>,
    pub moved: Vec<AssignmentMove>,
    pub gaps: Vec<CoverageGap>,
    pub failures: Vec<OperationFailure>,
}

/// Counter view of a report, used for logging and CLI output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportSummary {
    pub created: usize,
    pub removed: usize,
    pub moved: usize,
    pub gaps: usize,
    pub failures: usize,
}

impl RebalanceReport {
    pub fn new(trigger: RebalanceTrigger) -> Self {
        Self {
            trigger,
            direction: None,
            created: Vec::new(),
            removed: Vec::new(),
            moved: Vec::new(),
            gaps: Vec::new(),
            failures: Vec::new(),
        }
    }

    /// Returns whether the run left the assignment store untouched.
    pub fn is_noop(&self) -> bool {
        self.created.is_empty() && self.removed.is_empty() && self.moved.is_empty()
    }

    pub fn summary(&self) -> ReportSummary {
        ReportSummary {
            created: self.created.len(),
            removed: self.removed.len(),
            moved: self.moved.len(),
            gaps: self.gaps.len(),
            failures: self.failures.len(),
        }
    }
}

impl Display for ReportSummary {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "created={} removed={} moved={} gaps={} failures={}",
            self.created, self.removed, self.moved, self.gaps, self.failures
        )
    }
}
