//! New-entry assigner: tops under-served projects and judges up to their
//! configured minimum.
//!
//! # Invariants
//! - Subjects are served in ascending order of current load, then id.
//! - Candidates are tried in ascending order of their own load, then id, so
//!   new work lands on the least busy eligible counterpart.
//! - An already-paired counterpart is skipped, never duplicated.
//! - Running twice over unchanged inputs creates nothing the second time.

use crate::engine::report::{CoverageGap, GapSubject};
use crate::engine::run::{CreateOutcome, RunContext};
use crate::model::fair::{JudgeId, ProjectId};
use crate::repo::assignment_repo::AssignmentStore;
use log::info;
use std::collections::BTreeSet;

impl<S: AssignmentStore> RunContext<'_, S> {
    /// Assigns judges to every project in `subjects` below the per-project
    /// minimum.
    pub(crate) fn fill_projects(&mut self, subjects: &BTreeSet<ProjectId>) {
        let target = self.config.minimum_judges_per_project;
        let mut queue: Vec<(usize, ProjectId)> = subjects
            .iter()
            .filter(|id| self.index.project(**id).is_some())
            .map(|id| (self.ledger.count_for_project(*id), *id))
            .filter(|(count, _)| *count < target as usize)
            .collect();
        queue.sort_unstable();

        for (_, project_id) in queue {
            let Some(project) = self.index.project(project_id).cloned() else {
                continue;
            };
            let mut candidates: Vec<(usize, JudgeId)> = self
                .index
                .eligible_judges_for(&project)
                .filter(|judge| !self.ledger.exists(judge.id, project_id))
                .map(|judge| (self.ledger.count_for_judge(judge.id), judge.id))
                .collect();
            candidates.sort_unstable();

            let mut assigned = self.ledger.count_for_project(project_id);
            for (_, judge_id) in candidates {
                if assigned >= target as usize {
                    break;
                }
                match self.try_create(judge_id, project_id) {
                    CreateOutcome::Created(assignment) => {
                        self.report.created.push(assignment);
                        assigned += 1;
                    }
                    CreateOutcome::AlreadyPaired => assigned += 1,
                    CreateOutcome::Failed => {}
                }
            }

            if assigned < target as usize {
                self.record_gap(GapSubject::Project(project_id), target, assigned);
            }
        }
    }

    /// Assigns projects to every active judge in `subjects` below the
    /// per-judge minimum.
    pub(crate) fn fill_judges(&mut self, subjects: &BTreeSet<JudgeId>) {
        let target = self.config.minimum_projects_per_judge;
        let mut queue: Vec<(usize, JudgeId)> = subjects
            .iter()
            .filter(|id| self.index.judge(**id).is_some_and(|judge| judge.active))
            .map(|id| (self.ledger.count_for_judge(*id), *id))
            .filter(|(count, _)| *count < target as usize)
            .collect();
        queue.sort_unstable();

        for (_, judge_id) in queue {
            let Some(judge) = self.index.judge(judge_id).cloned() else {
                continue;
            };
            let mut candidates: Vec<(usize, ProjectId)> = self
                .index
                .eligible_projects_for(&judge)
                .filter(|project| !self.ledger.exists(judge_id, project.id))
                .map(|project| (self.ledger.count_for_project(project.id), project.id))
                .collect();
            candidates.sort_unstable();

            let mut assigned = self.ledger.count_for_judge(judge_id);
            for (_, project_id) in candidates {
                if assigned >= target as usize {
                    break;
                }
                match self.try_create(judge_id, project_id) {
                    CreateOutcome::Created(assignment) => {
                        self.report.created.push(assignment);
                        assigned += 1;
                    }
                    CreateOutcome::AlreadyPaired => assigned += 1,
                    CreateOutcome::Failed => {}
                }
            }

            if assigned < target as usize {
                self.record_gap(GapSubject::Judge(judge_id), target, assigned);
            }
        }
    }

    fn record_gap(&mut self, subject: GapSubject, target: u32, assigned: usize) {
        info!(
            "event=coverage_gap module=engine status=skip reason=no_eligible_counterpart subject={subject:?} target={target} assigned={assigned}"
        );
        self.report.gaps.push(CoverageGap {
            subject,
            target,
            assigned,
        });
    }
}
