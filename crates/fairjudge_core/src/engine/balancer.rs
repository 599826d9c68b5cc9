//! Load balancer: flattens assignment skew on one side of the relation.
//!
//! # Responsibility
//! - Pick the side to trim from the two coverage ceilings.
//! - Re-home unscored assignments from subjects above the load bound to
//!   eligible subjects below it.
//!
//! # Invariants
//! - Scored assignments are never moved.
//! - A receiver starts below the bound, ends at least one assignment lighter
//!   than the donor, and never gains a pair it already holds.
//! - Every move lowers the sum of squared loads, so repeating passes until
//!   one moves nothing always terminates.

use crate::config::JudgingConfig;
use crate::engine::report::{AssignmentMove, BalanceDirection};
use crate::engine::run::{CreateOutcome, DeleteOutcome, RunContext};
use crate::engine::stats::{compare_quotients, lower_bound, quotient};
use crate::model::assignment::Assignment;
use crate::model::fair::{JudgeId, Placement, ProjectId};
use crate::repo::assignment_repo::AssignmentStore;
use log::{debug, info, warn};
use std::cmp::Reverse;
use std::collections::BTreeMap;

/// Chooses the side to balance.
///
/// When the judges' minimum coverage (`judge_count × minimum_projects_per_judge`)
/// exceeds what projects need (`project_count × minimum_judges_per_project`),
/// excess lands on projects and the project side is trimmed; otherwise judges
/// carry the excess.
pub fn choose_direction(
    config: &JudgingConfig,
    project_count: usize,
    active_judge_count: usize,
) -> BalanceDirection {
    let project_max = config.project_ceiling(project_count);
    let judge_max = config.judge_ceiling(active_judge_count);
    if judge_max > project_max {
        BalanceDirection::Projects
    } else {
        BalanceDirection::Judges
    }
}

type Quotients = BTreeMap<Placement, Option<f64>>;

impl<S: AssignmentStore> RunContext<'_, S> {
    pub(crate) fn balance(&mut self) -> BalanceDirection {
        let direction = choose_direction(
            &self.config,
            self.index.project_count(),
            self.index.active_judge_count(),
        );
        self.report.direction = Some(direction);

        let quotients: Quotients = self
            .index
            .placement_population()
            .into_iter()
            .map(|(placement, (projects, judges))| (placement, quotient(projects, judges)))
            .collect();

        let mut passes = 0usize;
        let mut total_moved = 0usize;
        loop {
            let moved = match direction {
                BalanceDirection::Judges => self.balance_judges_pass(&quotients),
                BalanceDirection::Projects => self.balance_projects_pass(),
            };
            passes += 1;
            total_moved += moved;
            if moved == 0 {
                break;
            }
        }

        info!(
            "event=balance module=engine status=ok direction={direction} passes={passes} moved={total_moved}"
        );
        direction
    }

    fn balance_judges_pass(&mut self, quotients: &Quotients) -> usize {
        let judges: Vec<JudgeId> = self.index.active_judges().map(|judge| judge.id).collect();
        let loads: Vec<usize> = judges
            .iter()
            .map(|id| self.ledger.count_for_judge(*id))
            .collect();
        if loads.is_empty() {
            return 0;
        }
        let bound = lower_bound(&loads, self.config.minimum_projects_per_judge);
        let settled = bound.floor() as usize;

        let mut heavy: Vec<(Reverse<usize>, JudgeId)> = judges
            .iter()
            .zip(&loads)
            .filter(|(_, load)| **load as f64 > bound)
            .map(|(id, load)| (Reverse(*load), *id))
            .collect();
        heavy.sort_unstable();

        let mut moved = 0;
        for (_, heavy_id) in heavy {
            let excess = self.ledger.count_for_judge(heavy_id).saturating_sub(settled);
            let mut movable: Vec<Assignment> = self
                .ledger
                .for_judge(heavy_id)
                .filter(|assignment| assignment.is_movable())
                .cloned()
                .collect();
            movable.sort_by(|left, right| {
                compare_quotients(
                    self.project_quotient(quotients, left.project),
                    self.project_quotient(quotients, right.project),
                )
                .then(left.project.cmp(&right.project))
            });

            let mut moved_here = 0;
            for assignment in movable {
                if moved_here >= excess {
                    break;
                }
                let Some(receiver) =
                    self.lightest_receiving_judge(heavy_id, assignment.project, bound)
                else {
                    continue;
                };
                if self.move_assignment(&assignment, receiver, assignment.project) {
                    moved_here += 1;
                }
            }

            if moved_here < excess {
                debug!(
                    "event=balance module=engine status=skip reason=no_receiver judge={heavy_id} bound={bound:.3} remaining={}",
                    excess - moved_here
                );
            }
            moved += moved_here;
        }
        moved
    }

    fn balance_projects_pass(&mut self) -> usize {
        let projects: Vec<ProjectId> = self.index.projects().map(|project| project.id).collect();
        let loads: Vec<usize> = projects
            .iter()
            .map(|id| self.ledger.count_for_project(*id))
            .collect();
        if loads.is_empty() {
            return 0;
        }
        let bound = lower_bound(&loads, self.config.minimum_judges_per_project);
        let settled = bound.floor() as usize;

        let mut heavy: Vec<(Reverse<usize>, ProjectId)> = projects
            .iter()
            .zip(&loads)
            .filter(|(_, load)| **load as f64 > bound)
            .map(|(id, load)| (Reverse(*load), *id))
            .collect();
        heavy.sort_unstable();

        // Judges with the most eligible projects are the easiest to re-home.
        let breadth: BTreeMap<JudgeId, usize> = self
            .index
            .active_judges()
            .map(|judge| (judge.id, self.index.eligible_projects_for(judge).count()))
            .collect();

        let mut moved = 0;
        for (_, heavy_id) in heavy {
            let excess = self
                .ledger
                .count_for_project(heavy_id)
                .saturating_sub(settled);
            let mut movable: Vec<Assignment> = self
                .ledger
                .for_project(heavy_id)
                .filter(|assignment| assignment.is_movable())
                .cloned()
                .collect();
            movable.sort_by_key(|assignment| {
                (
                    Reverse(breadth.get(&assignment.judge).copied().unwrap_or(0)),
                    assignment.judge,
                )
            });

            let mut moved_here = 0;
            for assignment in movable {
                if moved_here >= excess {
                    break;
                }
                let Some(receiver) =
                    self.lightest_receiving_project(assignment.judge, heavy_id, bound)
                else {
                    continue;
                };
                if self.move_assignment(&assignment, assignment.judge, receiver) {
                    moved_here += 1;
                }
            }

            if moved_here < excess {
                debug!(
                    "event=balance module=engine status=skip reason=no_receiver project={heavy_id} bound={bound:.3} remaining={}",
                    excess - moved_here
                );
            }
            moved += moved_here;
        }
        moved
    }

    fn project_quotient(&self, quotients: &Quotients, project: ProjectId) -> Option<f64> {
        self.index
            .project(project)
            .and_then(|project| quotients.get(&project.placement()).copied().flatten())
    }

    fn lightest_receiving_judge(
        &self,
        donor: JudgeId,
        project: ProjectId,
        bound: f64,
    ) -> Option<JudgeId> {
        let target = self.index.project(project)?;
        let donor_load = self.ledger.count_for_judge(donor);
        self.index
            .eligible_judges_for(target)
            .filter(|judge| judge.id != donor && !self.ledger.exists(judge.id, project))
            .map(|judge| (self.ledger.count_for_judge(judge.id), judge.id))
            .filter(|(load, _)| accepts_move(*load, donor_load, bound))
            .min()
            .map(|(_, id)| id)
    }

    fn lightest_receiving_project(
        &self,
        judge: JudgeId,
        donor: ProjectId,
        bound: f64,
    ) -> Option<ProjectId> {
        let source = self.index.judge(judge)?;
        let donor_load = self.ledger.count_for_project(donor);
        self.index
            .eligible_projects_for(source)
            .filter(|project| project.id != donor && !self.ledger.exists(judge, project.id))
            .map(|project| (self.ledger.count_for_project(project.id), project.id))
            .filter(|(load, _)| accepts_move(*load, donor_load, bound))
            .min()
            .map(|(_, id)| id)
    }

    /// Replaces `original` with `(judge, project)`.
    ///
    /// The replacement is created first so a project never drops below its
    /// coverage mid-move; it is withdrawn again if the original cannot go.
    fn move_assignment(&mut self, original: &Assignment, judge: JudgeId, project: ProjectId) -> bool {
        let replacement = match self.try_create(judge, project) {
            CreateOutcome::Created(assignment) => assignment,
            CreateOutcome::AlreadyPaired | CreateOutcome::Failed => return false,
        };

        match self.try_delete(original) {
            DeleteOutcome::Deleted => {
                debug!(
                    "event=assignment_move module=engine status=ok from_judge={} from_project={} to_judge={judge} to_project={project}",
                    original.judge, original.project
                );
                self.report.moved.push(AssignmentMove {
                    from: original.clone(),
                    to: replacement,
                });
                true
            }
            DeleteOutcome::Gone => {
                self.report.created.push(replacement);
                true
            }
            DeleteOutcome::Protected | DeleteOutcome::Failed => {
                self.ledger.mark_frozen(original.id);
                if self.try_delete(&replacement) != DeleteOutcome::Deleted {
                    warn!(
                        "event=assignment_move module=engine status=error reason=rollback_failed judge={judge} project={project}"
                    );
                    self.report.created.push(replacement);
                }
                false
            }
        }
    }
}

/// A receiver must sit below `bound` and stay strictly lighter than the
/// donor after taking one assignment.
fn accepts_move(receiver_load: usize, donor_load: usize, bound: f64) -> bool {
    (receiver_load as f64) < bound && receiver_load + 1 < donor_load
}

#[cfg(test)]
mod tests {
    use super::{accepts_move, choose_direction};
    use crate::config::JudgingConfig;
    use crate::engine::report::BalanceDirection;

    #[test]
    fn judge_side_is_default_when_ceilings_tie() {
        let config = JudgingConfig::new(1, 1, 1);
        assert_eq!(choose_direction(&config, 4, 4), BalanceDirection::Judges);
    }

    #[test]
    fn project_side_when_judge_minimums_dominate() {
        let config = JudgingConfig::new(1, 1, 3);
        // projects need 2, judges demand 6
        assert_eq!(choose_direction(&config, 2, 2), BalanceDirection::Projects);
    }

    #[test]
    fn judge_side_when_project_minimums_dominate() {
        let config = JudgingConfig::new(1, 3, 1);
        assert_eq!(choose_direction(&config, 10, 4), BalanceDirection::Judges);
    }

    #[test]
    fn receiver_below_fractional_bound_is_accepted() {
        // bound 5/3: a judge at 1 may take work from a judge at 3
        assert!(accepts_move(1, 3, 5.0 / 3.0));
        assert!(accepts_move(0, 4, 5.0 / 3.0));
    }

    #[test]
    fn receiver_is_rejected_at_bound_or_when_move_would_not_narrow_gap() {
        assert!(!accepts_move(2, 4, 2.0));
        // 1 -> 2 against a donor at 2 only swaps the loads
        assert!(!accepts_move(1, 2, 1.5));
    }
}
