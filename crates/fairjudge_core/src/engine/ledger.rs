//! In-run mirror of the assignment relation for one rubric.
//!
//! # Invariants
//! - Loaded once from the store at the start of a run.
//! - Mutated only after the store confirms a create or delete, so counts
//!   always equal what the store would report inside the same transaction.

use crate::model::assignment::{Assignment, AssignmentId};
use crate::model::fair::{JudgeId, ProjectId};
use std::collections::btree_map::Entry;
use std::collections::{BTreeMap, BTreeSet};

#[derive(Debug, Clone, Default)]
pub struct LoadLedger {
    by_pair: BTreeMap<(JudgeId, ProjectId), Assignment>,
    pair_of: BTreeMap<AssignmentId, (JudgeId, ProjectId)>,
    by_project: BTreeSet<(ProjectId, JudgeId)>,
    judge_counts: BTreeMap<JudgeId, usize>,
    project_counts: BTreeMap<ProjectId, usize>,
}

impl LoadLedger {
    pub fn from_assignments(assignments: Vec<Assignment>) -> Self {
        let mut ledger = Self::default();
        for assignment in assignments {
            ledger.record_created(assignment);
        }
        ledger
    }

    pub fn count_for_judge(&self, judge: JudgeId) -> usize {
        self.judge_counts.get(&judge).copied().unwrap_or(0)
    }

    pub fn count_for_project(&self, project: ProjectId) -> usize {
        self.project_counts.get(&project).copied().unwrap_or(0)
    }

    pub fn exists(&self, judge: JudgeId, project: ProjectId) -> bool {
        self.by_pair.contains_key(&(judge, project))
    }

    pub fn len(&self) -> usize {
        self.by_pair.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_pair.is_empty()
    }

    /// All assignments ordered by `(judge, project)`.
    pub fn all(&self) -> impl Iterator<Item = &Assignment> {
        self.by_pair.values()
    }

    /// Assignments of one judge ordered by project id.
    pub fn for_judge(&self, judge: JudgeId) -> impl Iterator<Item = &Assignment> {
        self.by_pair
            .range((judge, ProjectId::MIN)..=(judge, ProjectId::MAX))
            .map(|(_, assignment)| assignment)
    }

    /// Assignments of one project ordered by judge id.
    pub fn for_project(&self, project: ProjectId) -> impl Iterator<Item = &Assignment> {
        self.by_project
            .range((project, JudgeId::MIN)..=(project, JudgeId::MAX))
            .filter_map(move |(project, judge)| self.by_pair.get(&(*judge, *project)))
    }

    pub fn record_created(&mut self, assignment: Assignment) {
        let key = (assignment.judge, assignment.project);
        if let Entry::Vacant(slot) = self.by_pair.entry(key) {
            self.pair_of.insert(assignment.id, key);
            self.by_project.insert((key.1, key.0));
            slot.insert(assignment);
            *self.judge_counts.entry(key.0).or_default() += 1;
            *self.project_counts.entry(key.1).or_default() += 1;
        }
    }

    /// Excludes an assignment from further moves in this run.
    pub fn mark_frozen(&mut self, id: AssignmentId) {
        let Some(key) = self.pair_of.get(&id) else {
            return;
        };
        if let Some(assignment) = self.by_pair.get_mut(key) {
            assignment.has_response = true;
        }
    }

    pub fn record_deleted(&mut self, id: AssignmentId) -> Option<Assignment> {
        let key = self.pair_of.remove(&id)?;
        self.by_project.remove(&(key.1, key.0));
        let removed = self.by_pair.remove(&key)?;
        decrement(&mut self.judge_counts, key.0);
        decrement(&mut self.project_counts, key.1);
        Some(removed)
    }
}

fn decrement(counts: &mut BTreeMap<i64, usize>, key: i64) {
    if let Some(count) = counts.get_mut(&key) {
        *count = count.saturating_sub(1);
        if *count == 0 {
            counts.remove(&key);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::LoadLedger;
    use crate::model::assignment::Assignment;

    #[test]
    fn tracks_counts_through_create_and_delete() {
        let first = Assignment::new(1, 10, 1);
        let second = Assignment::new(1, 11, 1);
        let third = Assignment::new(2, 10, 1);
        let mut ledger = LoadLedger::from_assignments(vec![first.clone(), second, third]);

        assert_eq!(ledger.count_for_judge(1), 2);
        assert_eq!(ledger.count_for_project(10), 2);
        assert_eq!(ledger.for_judge(1).count(), 2);
        assert_eq!(ledger.for_project(10).count(), 2);

        let removed = ledger.record_deleted(first.id).expect("assignment tracked");
        assert_eq!(removed.project, 10);
        assert_eq!(ledger.count_for_judge(1), 1);
        assert_eq!(ledger.count_for_project(10), 1);
        assert!(!ledger.exists(1, 10));
        assert!(ledger.record_deleted(first.id).is_none());
    }

    #[test]
    fn duplicate_pair_is_not_double_counted() {
        let mut ledger = LoadLedger::default();
        ledger.record_created(Assignment::new(1, 10, 1));
        ledger.record_created(Assignment::new(1, 10, 1));
        assert_eq!(ledger.len(), 1);
        assert_eq!(ledger.count_for_judge(1), 1);
    }

    #[test]
    fn project_view_is_ordered_by_judge_and_follows_deletes() {
        let late = Assignment::new(9, 10, 1);
        let early = Assignment::new(2, 10, 1);
        let other = Assignment::new(5, 11, 1);
        let mut ledger =
            LoadLedger::from_assignments(vec![late, other, early.clone()]);

        let judges: Vec<i64> = ledger.for_project(10).map(|assignment| assignment.judge).collect();
        assert_eq!(judges, vec![2, 9]);

        ledger.record_deleted(early.id);
        let remaining: Vec<i64> =
            ledger.for_project(10).map(|assignment| assignment.judge).collect();
        assert_eq!(remaining, vec![9]);
        assert_eq!(ledger.for_project(11).count(), 1);
    }

    #[test]
    fn frozen_assignment_is_no_longer_movable() {
        let pinned = Assignment::new(1, 10, 1);
        let free = Assignment::new(1, 11, 1);
        let mut ledger = LoadLedger::from_assignments(vec![pinned.clone(), free]);

        ledger.mark_frozen(pinned.id);
        let movable: Vec<i64> = ledger
            .for_judge(1)
            .filter(|assignment| assignment.is_movable())
            .map(|assignment| assignment.project)
            .collect();
        assert_eq!(movable, vec![11]);
        assert_eq!(ledger.count_for_judge(1), 2);
    }
}
