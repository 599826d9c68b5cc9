//! Eligibility predicate and per-run snapshot index.
//!
//! # Invariants
//! - `eligible` is pure and reads only the attributes passed in.
//! - An `EligibilityIndex` lives for exactly one orchestrator run; it is
//!   rebuilt from the directory on every run so edits are never missed.

use crate::model::fair::{Judge, JudgeId, Placement, Project, ProjectId};
use std::collections::BTreeMap;

/// Returns whether `judge` may evaluate `project`.
pub fn eligible(judge: &Judge, project: &Project) -> bool {
    judge.active
        && judge.categories.contains(&project.category)
        && judge.divisions.contains(&project.division)
}

/// Snapshot of projects and judges loaded at the start of one run.
#[derive(Debug, Clone, Default)]
pub struct EligibilityIndex {
    projects: BTreeMap<ProjectId, Project>,
    judges: BTreeMap<JudgeId, Judge>,
}

impl EligibilityIndex {
    pub fn new(projects: Vec<Project>, judges: Vec<Judge>) -> Self {
        Self {
            projects: projects
                .into_iter()
                .map(|project| (project.id, project))
                .collect(),
            judges: judges.into_iter().map(|judge| (judge.id, judge)).collect(),
        }
    }

    pub fn project(&self, id: ProjectId) -> Option<&Project> {
        self.projects.get(&id)
    }

    pub fn judge(&self, id: JudgeId) -> Option<&Judge> {
        self.judges.get(&id)
    }

    /// Projects in id order.
    pub fn projects(&self) -> impl Iterator<Item = &Project> {
        self.projects.values()
    }

    /// Active judges in id order.
    pub fn active_judges(&self) -> impl Iterator<Item = &Judge> {
        self.judges.values().filter(|judge| judge.active)
    }

    pub fn project_count(&self) -> usize {
        self.projects.len()
    }

    pub fn active_judge_count(&self) -> usize {
        self.active_judges().count()
    }

    /// Evaluates eligibility by id; unknown ids are never eligible.
    pub fn is_eligible_pair(&self, judge: JudgeId, project: ProjectId) -> bool {
        match (self.judges.get(&judge), self.projects.get(&project)) {
            (Some(judge), Some(project)) => eligible(judge, project),
            _ => false,
        }
    }

    pub fn eligible_judges_for<'a>(
        &'a self,
        project: &'a Project,
    ) -> impl Iterator<Item = &'a Judge> + 'a {
        self.active_judges()
            .filter(move |judge| eligible(judge, project))
    }

    pub fn eligible_projects_for<'a>(
        &'a self,
        judge: &'a Judge,
    ) -> impl Iterator<Item = &'a Project> + 'a {
        self.projects
            .values()
            .filter(move |project| eligible(judge, project))
    }

    /// Project count and eligible-judge count for every placement in use.
    ///
    /// Placements covered by judges but holding no projects are omitted.
    pub fn placement_population(&self) -> BTreeMap<Placement, (usize, usize)> {
        let mut population: BTreeMap<Placement, (usize, usize)> = BTreeMap::new();
        for project in self.projects.values() {
            population.entry(project.placement()).or_default().0 += 1;
        }
        for judge in self.active_judges() {
            for placement in judge.placements() {
                if let Some(entry) = population.get_mut(&placement) {
                    entry.1 += 1;
                }
            }
        }
        population
    }
}
