//! Transactional judging use-cases over a SQLite fair database.
//!
//! # Responsibility
//! - Run each orchestrator entry point inside one `BEGIN IMMEDIATE`
//!   transaction.
//! - Combine entity edits with the rebalance they trigger.
//!
//! # Invariants
//! - At most one rebalance run writes at a time; competing runs wait on the
//!   connection busy timeout.
//! - A run that fails before completing leaves the database unchanged.

use crate::config::JudgingConfig;
use crate::db::DbError;
use crate::engine::orchestrator::{EngineError, Orchestrator};
use crate::engine::report::{RebalanceReport, RebalanceTrigger};
use crate::model::fair::{JudgeId, ProjectId};
use crate::repo::assignment_repo::{SqliteAssignmentStore, StoreError};
use crate::repo::fair_repo::{FairRepository, RepoError, SqliteFairRepository};
use log::error;
use rusqlite::{Connection, Transaction, TransactionBehavior};
use std::error::Error;
use std::fmt::{Display, Formatter};

pub type ServiceResult<T> = Result<T, ServiceError>;

#[derive(Debug)]
pub enum ServiceError {
    /// Transaction could not begin or commit.
    Db(DbError),
    Engine(EngineError),
}

impl ServiceError {
    /// Returns whether the run gave up waiting for another writer.
    pub fn is_busy(&self) -> bool {
        matches!(self, Self::Db(err) if err.is_busy())
    }
}

impl Display for ServiceError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Db(err) => write!(f, "{err}"),
            Self::Engine(err) => write!(f, "{err}"),
        }
    }
}

impl Error for ServiceError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Db(err) => Some(err),
            Self::Engine(err) => Some(err),
        }
    }
}

impl From<DbError> for ServiceError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for ServiceError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

impl From<EngineError> for ServiceError {
    fn from(value: EngineError) -> Self {
        Self::Engine(value)
    }
}

impl From<RepoError> for ServiceError {
    fn from(value: RepoError) -> Self {
        Self::Engine(EngineError::Repo(value))
    }
}

impl From<StoreError> for ServiceError {
    fn from(value: StoreError) -> Self {
        Self::Engine(EngineError::Store(value))
    }
}

/// Judging use-case service bound to one migrated connection.
pub struct JudgingService<'conn> {
    conn: &'conn Connection,
    config: JudgingConfig,
}

impl<'conn> JudgingService<'conn> {
    pub fn new(conn: &'conn Connection, config: JudgingConfig) -> Self {
        Self { conn, config }
    }

    pub fn config(&self) -> &JudgingConfig {
        &self.config
    }

    pub fn run_full_rebalance(&self) -> ServiceResult<RebalanceReport> {
        self.run(RebalanceTrigger::Full)
    }

    pub fn run_for_changed_project(&self, project_id: ProjectId) -> ServiceResult<RebalanceReport> {
        self.run(RebalanceTrigger::ChangedProject(project_id))
    }

    pub fn run_for_changed_judge(&self, judge_id: JudgeId) -> ServiceResult<RebalanceReport> {
        self.run(RebalanceTrigger::ChangedJudge(judge_id))
    }

    pub fn run_for_deactivated_judge(&self, judge_id: JudgeId) -> ServiceResult<RebalanceReport> {
        self.run(RebalanceTrigger::DeactivatedJudge(judge_id))
    }

    /// Deactivates a judge and rebalances in the same transaction.
    pub fn deactivate_judge(&self, judge_id: JudgeId) -> ServiceResult<RebalanceReport> {
        self.in_transaction(RebalanceTrigger::DeactivatedJudge(judge_id), |repo| {
            repo.set_judge_active(judge_id, false)
        })
    }

    pub fn run(&self, trigger: RebalanceTrigger) -> ServiceResult<RebalanceReport> {
        self.in_transaction(trigger, |_| Ok(()))
    }

    fn in_transaction(
        &self,
        trigger: RebalanceTrigger,
        before_run: impl FnOnce(&SqliteFairRepository<'_>) -> Result<(), RepoError>,
    ) -> ServiceResult<RebalanceReport> {
        let tx = Transaction::new_unchecked(self.conn, TransactionBehavior::Immediate)?;
        let result = run_in(&tx, self.config, trigger, before_run);
        match result {
            Ok(report) => {
                tx.commit()?;
                Ok(report)
            }
            Err(err) => {
                // Dropping `tx` rolls back.
                error!(
                    "event=judging_service module=service status=error trigger={trigger} error={err}"
                );
                Err(err)
            }
        }
    }
}

fn run_in(
    tx: &Transaction<'_>,
    config: JudgingConfig,
    trigger: RebalanceTrigger,
    before_run: impl FnOnce(&SqliteFairRepository<'_>) -> Result<(), RepoError>,
) -> ServiceResult<RebalanceReport> {
    let repo = SqliteFairRepository::try_new(tx)?;
    let store = SqliteAssignmentStore::try_new(tx)?;
    before_run(&repo)?;
    let orchestrator = Orchestrator::new(&repo, &store, config)?;
    Ok(orchestrator.run(trigger)?)
}
