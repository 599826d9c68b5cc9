//! Per-run working state shared by the remover, assigner and balancer.
//!
//! # Responsibility
//! - Track the orchestrator phase and reject out-of-order transitions.
//! - Funnel every store write through one place that keeps the ledger and
//!   the report in step with the store.
//!
//! # Invariants
//! - The ledger changes only after the store confirms a write.
//! - Per-operation failures are recorded and never abort the run.

use crate::config::JudgingConfig;
use crate::engine::eligibility::EligibilityIndex;
use crate::engine::ledger::LoadLedger;
use crate::engine::report::{OperationFailure, RebalanceReport, StoreOperation};
use crate::model::assignment::Assignment;
use crate::model::fair::{JudgeId, ProjectId};
use crate::repo::assignment_repo::{AssignmentStore, StoreError};
use log::{debug, error, warn};
use std::fmt::{Display, Formatter};

/// Orchestrator state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunPhase {
    Idle,
    CleaningInvalid,
    FillingGaps,
    Balancing,
}

impl RunPhase {
    /// Returns the only phase allowed after `self`.
    pub fn next(self) -> Self {
        match self {
            Self::Idle => Self::CleaningInvalid,
            Self::CleaningInvalid => Self::FillingGaps,
            Self::FillingGaps => Self::Balancing,
            Self::Balancing => Self::Idle,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::CleaningInvalid => "cleaning_invalid",
            Self::FillingGaps => "filling_gaps",
            Self::Balancing => "balancing",
        }
    }
}

impl Display for RunPhase {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of one guarded create.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum CreateOutcome {
    Created(Assignment),
    /// The store already held the pair; counts as satisfied.
    AlreadyPaired,
    Failed,
}

/// Outcome of one guarded delete.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum DeleteOutcome {
    Deleted,
    /// Scored since the snapshot was taken; left in place.
    Protected,
    /// Already absent from the store.
    Gone,
    Failed,
}

pub(crate) struct RunContext<'a, S: AssignmentStore> {
    pub(crate) store: &'a S,
    pub(crate) config: JudgingConfig,
    pub(crate) index: EligibilityIndex,
    pub(crate) ledger: LoadLedger,
    pub(crate) report: RebalanceReport,
    phase: RunPhase,
}

impl<'a, S: AssignmentStore> RunContext<'a, S> {
    pub(crate) fn new(
        store: &'a S,
        config: JudgingConfig,
        index: EligibilityIndex,
        ledger: LoadLedger,
        report: RebalanceReport,
    ) -> Self {
        Self {
            store,
            config,
            index,
            ledger,
            report,
            phase: RunPhase::Idle,
        }
    }

    pub(crate) fn phase(&self) -> RunPhase {
        self.phase
    }

    /// Advances the state machine to `next`.
    pub(crate) fn enter(&mut self, next: RunPhase) {
        let expected = self.phase.next();
        debug_assert_eq!(next, expected, "illegal orchestrator transition");
        if next != expected {
            warn!(
                "event=rebalance_phase module=engine status=error from={} to={} expected={}",
                self.phase, next, expected
            );
        }
        debug!(
            "event=rebalance_phase module=engine status=ok trigger={} from={} to={}",
            self.report.trigger, self.phase, next
        );
        self.phase = next;
    }

    pub(crate) fn into_report(self) -> RebalanceReport {
        self.report
    }

    /// Creates `(judge, project)` under the configured rubric.
    pub(crate) fn try_create(&mut self, judge: JudgeId, project: ProjectId) -> CreateOutcome {
        match self.store.create(judge, project, self.config.rubric) {
            Ok(assignment) => {
                self.ledger.record_created(assignment.clone());
                CreateOutcome::Created(assignment)
            }
            Err(StoreError::DuplicateAssignment { .. }) => {
                warn!(
                    "event=assignment_create module=engine status=skip reason=duplicate judge={judge} project={project}"
                );
                CreateOutcome::AlreadyPaired
            }
            Err(err) => {
                self.record_failure(StoreOperation::Create, judge, project, &err);
                CreateOutcome::Failed
            }
        }
    }

    /// Deletes `assignment` unless it has been scored.
    pub(crate) fn try_delete(&mut self, assignment: &Assignment) -> DeleteOutcome {
        match self.store.has_response(assignment.id) {
            Ok(true) => {
                debug!(
                    "event=assignment_delete module=engine status=skip reason=protected assignment={}",
                    assignment.id
                );
                return DeleteOutcome::Protected;
            }
            Ok(false) => {}
            Err(err) => {
                self.record_failure(
                    StoreOperation::Inspect,
                    assignment.judge,
                    assignment.project,
                    &err,
                );
                return DeleteOutcome::Failed;
            }
        }

        match self.store.delete(assignment.id) {
            Ok(()) => {
                self.ledger.record_deleted(assignment.id);
                DeleteOutcome::Deleted
            }
            Err(StoreError::ProtectedAssignment(_)) => DeleteOutcome::Protected,
            Err(StoreError::NotFound(_)) => {
                self.ledger.record_deleted(assignment.id);
                DeleteOutcome::Gone
            }
            Err(err) => {
                self.record_failure(
                    StoreOperation::Delete,
                    assignment.judge,
                    assignment.project,
                    &err,
                );
                DeleteOutcome::Failed
            }
        }
    }

    fn record_failure(
        &mut self,
        operation: StoreOperation,
        judge: JudgeId,
        project: ProjectId,
        err: &StoreError,
    ) {
        error!(
            "event=assignment_{operation} module=engine status=error judge={judge} project={project} error={err}"
        );
        self.report.failures.push(OperationFailure {
            operation,
            judge,
            project,
            message: err.to_string(),
        });
    }
}

#[cfg(test)]
mod tests {
    use super::RunPhase;

    #[test]
    fn phases_cycle_back_to_idle() {
        let mut phase = RunPhase::Idle;
        let mut visited = Vec::new();
        for _ in 0..4 {
            phase = phase.next();
            visited.push(phase.as_str());
        }
        assert_eq!(
            visited,
            vec!["cleaning_invalid", "filling_gaps", "balancing", "idle"]
        );
    }
}
