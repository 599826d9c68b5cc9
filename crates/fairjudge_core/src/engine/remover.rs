//! Invalid-assignment remover.
//!
//! # Invariants
//! - Only unscored assignments whose pair is no longer eligible are deleted.
//! - Scored assignments stay even when ineligible; answered evaluations are
//!   kept over a stale pairing.
//! - Both ends of every deleted assignment are reported as freed so the
//!   assigner can re-queue them.

use crate::engine::run::{DeleteOutcome, RunContext};
use crate::model::assignment::Assignment;
use crate::model::fair::{JudgeId, ProjectId};
use crate::repo::assignment_repo::AssignmentStore;
use log::{debug, info};
use std::collections::BTreeSet;

/// Assignments examined by one cleaning pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CleanupScope {
    All,
    Project(ProjectId),
    Judge(JudgeId),
}

/// Judges and projects that lost an assignment during cleaning.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Freed {
    pub judges: BTreeSet<JudgeId>,
    pub projects: BTreeSet<ProjectId>,
}

impl<S: AssignmentStore> RunContext<'_, S> {
    pub(crate) fn remove_invalid(&mut self, scope: CleanupScope) -> Freed {
        let in_scope: Vec<Assignment> = match scope {
            CleanupScope::All => self.ledger.all().cloned().collect(),
            CleanupScope::Project(project) => self.ledger.for_project(project).cloned().collect(),
            CleanupScope::Judge(judge) => self.ledger.for_judge(judge).cloned().collect(),
        };

        let mut freed = Freed::default();
        for assignment in in_scope {
            if self
                .index
                .is_eligible_pair(assignment.judge, assignment.project)
            {
                continue;
            }
            if assignment.has_response {
                debug!(
                    "event=invalid_assignment module=engine status=skip reason=scored assignment={} judge={} project={}",
                    assignment.id, assignment.judge, assignment.project
                );
                continue;
            }

            if self.try_delete(&assignment) == DeleteOutcome::Deleted {
                info!(
                    "event=invalid_assignment module=engine status=ok assignment={} judge={} project={}",
                    assignment.id, assignment.judge, assignment.project
                );
                freed.judges.insert(assignment.judge);
                freed.projects.insert(assignment.project);
                self.report.removed.push(assignment);
            }
        }
        freed
    }
}
