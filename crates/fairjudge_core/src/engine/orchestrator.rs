//! Orchestrator: sequences cleaning, gap filling and balancing for one
//! triggering event.
//!
//! # Responsibility
//! - Load a fresh snapshot of projects, judges and assignments.
//! - Drive `Idle → CleaningInvalid → FillingGaps → Balancing → Idle`.
//! - Return a `RebalanceReport` describing every store change.
//!
//! # Invariants
//! - Only snapshot loading can fail a run; store writes are reported and
//!   skipped.
//! - Re-running over unchanged inputs leaves the store untouched.
//! - The orchestrator never subscribes to entity events; callers invoke it.

use crate::config::{ConfigError, JudgingConfig};
use crate::engine::eligibility::EligibilityIndex;
use crate::engine::ledger::LoadLedger;
use crate::engine::remover::CleanupScope;
use crate::engine::report::{RebalanceReport, RebalanceTrigger};
use crate::engine::run::{RunContext, RunPhase};
use crate::model::fair::{JudgeId, ProjectId};
use crate::repo::assignment_repo::{AssignmentStore, StoreError};
use crate::repo::fair_repo::{FairDirectory, RepoError};
use log::{info, warn};
use std::collections::BTreeSet;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::time::Instant;

pub type EngineResult<T> = Result<T, EngineError>;

/// Errors that prevent an orchestrator run from starting.
#[derive(Debug)]
pub enum EngineError {
    InvalidConfig(ConfigError),
    /// Entity snapshot could not be loaded.
    Repo(RepoError),
    /// Assignment snapshot could not be loaded.
    Store(StoreError),
    ProjectNotFound(ProjectId),
    JudgeNotFound(JudgeId),
}

impl Display for EngineError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidConfig(err) => write!(f, "invalid judging config: {err}"),
            Self::Repo(err) => write!(f, "{err}"),
            Self::Store(err) => write!(f, "{err}"),
            Self::ProjectNotFound(id) => write!(f, "project not found: {id}"),
            Self::JudgeNotFound(id) => write!(f, "judge not found: {id}"),
        }
    }
}

impl Error for EngineError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::InvalidConfig(err) => Some(err),
            Self::Repo(err) => Some(err),
            Self::Store(err) => Some(err),
            Self::ProjectNotFound(_) | Self::JudgeNotFound(_) => None,
        }
    }
}

impl From<ConfigError> for EngineError {
    fn from(value: ConfigError) -> Self {
        Self::InvalidConfig(value)
    }
}

impl From<RepoError> for EngineError {
    fn from(value: RepoError) -> Self {
        Self::Repo(value)
    }
}

impl From<StoreError> for EngineError {
    fn from(value: StoreError) -> Self {
        Self::Store(value)
    }
}

/// Assignment engine entry points over a directory and a store.
pub struct Orchestrator<'a, D: FairDirectory, S: AssignmentStore> {
    directory: &'a D,
    store: &'a S,
    config: JudgingConfig,
}

impl<'a, D: FairDirectory, S: AssignmentStore> Orchestrator<'a, D, S> {
    /// Creates an orchestrator after validating `config`.
    pub fn new(directory: &'a D, store: &'a S, config: JudgingConfig) -> EngineResult<Self> {
        config.validate()?;
        Ok(Self {
            directory,
            store,
            config,
        })
    }

    pub fn config(&self) -> &JudgingConfig {
        &self.config
    }

    /// Cleans, fills and balances every assignment of the rubric.
    pub fn run_full_rebalance(&self) -> EngineResult<RebalanceReport> {
        self.run(RebalanceTrigger::Full)
    }

    /// Reacts to a new project or an edited category/division.
    pub fn run_for_changed_project(&self, project_id: ProjectId) -> EngineResult<RebalanceReport> {
        self.run(RebalanceTrigger::ChangedProject(project_id))
    }

    /// Reacts to a new judge or edited judge eligibility.
    pub fn run_for_changed_judge(&self, judge_id: JudgeId) -> EngineResult<RebalanceReport> {
        self.run(RebalanceTrigger::ChangedJudge(judge_id))
    }

    /// Reacts to a judge being deactivated.
    pub fn run_for_deactivated_judge(&self, judge_id: JudgeId) -> EngineResult<RebalanceReport> {
        self.run(RebalanceTrigger::DeactivatedJudge(judge_id))
    }

    /// Runs the full state machine for `trigger`.
    pub fn run(&self, trigger: RebalanceTrigger) -> EngineResult<RebalanceReport> {
        let started_at = Instant::now();
        info!("event=rebalance_run module=engine status=start trigger={trigger}");

        let mut run = match self.prepare(trigger) {
            Ok(run) => run,
            Err(err) => {
                warn!(
                    "event=rebalance_run module=engine status=error trigger={trigger} duration_ms={} error={err}",
                    started_at.elapsed().as_millis()
                );
                return Err(err);
            }
        };

        run.enter(RunPhase::CleaningInvalid);
        let scope = match trigger {
            RebalanceTrigger::Full => CleanupScope::All,
            RebalanceTrigger::ChangedProject(id) => CleanupScope::Project(id),
            RebalanceTrigger::ChangedJudge(id) | RebalanceTrigger::DeactivatedJudge(id) => {
                CleanupScope::Judge(id)
            }
        };
        let freed = run.remove_invalid(scope);

        run.enter(RunPhase::FillingGaps);
        let mut projects = freed.projects;
        let mut judges = freed.judges;
        match trigger {
            RebalanceTrigger::Full => {
                projects.extend(run.index.projects().map(|project| project.id));
                judges.extend(run.index.active_judges().map(|judge| judge.id));
            }
            RebalanceTrigger::ChangedProject(id) => {
                projects.insert(id);
            }
            RebalanceTrigger::ChangedJudge(id) => {
                projects.extend(eligible_project_ids(&run.index, id));
                judges.insert(id);
            }
            RebalanceTrigger::DeactivatedJudge(_) => {}
        }
        run.fill_projects(&projects);
        run.fill_judges(&judges);

        run.enter(RunPhase::Balancing);
        run.balance();

        run.enter(RunPhase::Idle);
        debug_assert_eq!(run.phase(), RunPhase::Idle);
        let report = run.into_report();

        info!(
            "event=rebalance_run module=engine status=ok trigger={trigger} {} duration_ms={}",
            report.summary(),
            started_at.elapsed().as_millis()
        );
        Ok(report)
    }

    fn prepare(&self, trigger: RebalanceTrigger) -> EngineResult<RunContext<'a, S>> {
        let index = EligibilityIndex::new(
            self.directory.list_projects()?,
            self.directory.list_judges()?,
        );

        match trigger {
            RebalanceTrigger::Full => {}
            RebalanceTrigger::ChangedProject(id) => {
                if index.project(id).is_none() {
                    return Err(EngineError::ProjectNotFound(id));
                }
            }
            RebalanceTrigger::ChangedJudge(id) => {
                if index.judge(id).is_none() {
                    return Err(EngineError::JudgeNotFound(id));
                }
            }
            RebalanceTrigger::DeactivatedJudge(id) => match index.judge(id) {
                None => return Err(EngineError::JudgeNotFound(id)),
                Some(judge) if judge.active => {
                    warn!(
                        "event=rebalance_run module=engine status=skip reason=judge_still_active judge={id}"
                    );
                }
                Some(_) => {}
            },
        }

        let ledger = LoadLedger::from_assignments(self.store.list_for_rubric(self.config.rubric)?);
        Ok(RunContext::new(
            self.store,
            self.config,
            index,
            ledger,
            RebalanceReport::new(trigger),
        ))
    }
}

fn eligible_project_ids(index: &EligibilityIndex, judge_id: JudgeId) -> BTreeSet<ProjectId> {
    index
        .judge(judge_id)
        .map(|judge| {
            index
                .eligible_projects_for(judge)
                .map(|project| project.id)
                .collect()
        })
        .unwrap_or_default()
}
