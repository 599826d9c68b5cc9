//! Assignment store contracts and SQLite implementation.
//!
//! # Responsibility
//! - Record `(judge, project, rubric)` pairings and their scoring state.
//! - Refuse duplicate pairings and deletion of scored assignments.
//!
//! # Invariants
//! - At most one row per `(judge_id, project_id, rubric_id)` (UNIQUE index).
//! - `has_response` is derived from `responses` rows on every read.
//! - A scored assignment is never deleted; the store checks first and the
//!   `ON DELETE RESTRICT` foreign key backs the check up.

use crate::db::migrations::{current_user_version, latest_version};
use crate::db::DbError;
use crate::model::assignment::{Assignment, AssignmentId};
use crate::model::fair::{JudgeId, ProjectId, RubricId};
use rusqlite::ffi;
use rusqlite::{params, Connection, Row};
use std::error::Error;
use std::fmt::{Display, Formatter};
use uuid::Uuid;

const ASSIGNMENT_SELECT_SQL: &str = "SELECT
    a.uuid,
    a.judge_id,
    a.project_id,
    a.rubric_id,
    EXISTS(
        SELECT 1 FROM responses r WHERE r.assignment_uuid = a.uuid
    ) AS has_response
FROM assignments a";

const ASSIGNMENT_ORDER_SQL: &str = " ORDER BY a.judge_id ASC, a.project_id ASC, a.uuid ASC";

pub type StoreResult<T> = Result<T, StoreError>;

/// Errors from assignment store operations.
#[derive(Debug)]
pub enum StoreError {
    /// A pairing already exists for the triple.
    DuplicateAssignment {
        judge: JudgeId,
        project: ProjectId,
        rubric: RubricId,
    },
    /// Target assignment has recorded responses and cannot be removed.
    ProtectedAssignment(AssignmentId),
    NotFound(AssignmentId),
    /// Connection schema is not at the expected migrated version.
    UninitializedConnection {
        expected_version: u32,
        actual_version: u32,
    },
    Db(DbError),
    InvalidData(String),
}

impl Display for StoreError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::DuplicateAssignment {
                judge,
                project,
                rubric,
            } => write!(
                f,
                "assignment already exists for judge {judge}, project {project}, rubric {rubric}"
            ),
            Self::ProtectedAssignment(id) => {
                write!(f, "assignment {id} has responses and cannot be removed")
            }
            Self::NotFound(id) => write!(f, "assignment not found: {id}"),
            Self::UninitializedConnection {
                expected_version,
                actual_version,
            } => write!(
                f,
                "assignment store requires schema version {expected_version}, got {actual_version}"
            ),
            Self::Db(err) => write!(f, "{err}"),
            Self::InvalidData(message) => write!(f, "invalid persisted assignment: {message}"),
        }
    }
}

impl Error for StoreError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Db(err) => Some(err),
            _ => None,
        }
    }
}

impl From<DbError> for StoreError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for StoreError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

/// Persistence contract for the assignment relation.
///
/// All counts and listings are scoped to one rubric.
pub trait AssignmentStore {
    fn count_for_project(&self, project: ProjectId, rubric: RubricId) -> StoreResult<usize>;
    fn count_for_judge(&self, judge: JudgeId, rubric: RubricId) -> StoreResult<usize>;
    fn exists(&self, judge: JudgeId, project: ProjectId, rubric: RubricId) -> StoreResult<bool>;
    /// Creates one unscored assignment.
    ///
    /// Fails with `DuplicateAssignment` when the triple is already paired.
    fn create(
        &self,
        judge: JudgeId,
        project: ProjectId,
        rubric: RubricId,
    ) -> StoreResult<Assignment>;
    /// Deletes one assignment.
    ///
    /// Fails with `ProtectedAssignment` when it has responses.
    fn delete(&self, id: AssignmentId) -> StoreResult<()>;
    fn has_response(&self, id: AssignmentId) -> StoreResult<bool>;
    fn get(&self, id: AssignmentId) -> StoreResult<Option<Assignment>>;
    fn list_for_rubric(&self, rubric: RubricId) -> StoreResult<Vec<Assignment>>;
    fn list_for_project(&self, project: ProjectId, rubric: RubricId)
        -> StoreResult<Vec<Assignment>>;
    fn list_for_judge(&self, judge: JudgeId, rubric: RubricId) -> StoreResult<Vec<Assignment>>;
}

/// SQLite-backed assignment store.
pub struct SqliteAssignmentStore<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteAssignmentStore<'conn> {
    /// Creates store from a migrated connection.
    pub fn try_new(conn: &'conn Connection) -> StoreResult<Self> {
        let expected_version = latest_version();
        let actual_version = current_user_version(conn)?;
        if actual_version != expected_version {
            return Err(StoreError::UninitializedConnection {
                expected_version,
                actual_version,
            });
        }
        Ok(Self { conn })
    }

    /// Records one rubric answer against an assignment, marking it scored.
    ///
    /// Re-recording the same `question_key` replaces the previous answer.
    pub fn record_response(
        &self,
        id: AssignmentId,
        question_key: &str,
        answer: &str,
    ) -> StoreResult<()> {
        if self.get(id)?.is_none() {
            return Err(StoreError::NotFound(id));
        }
        self.conn.execute(
            "INSERT INTO responses (assignment_uuid, question_key, answer)
             VALUES (?1, ?2, ?3)
             ON CONFLICT (assignment_uuid, question_key)
             DO UPDATE SET
                answer = excluded.answer,
                recorded_at = (strftime('%s', 'now') * 1000);",
            params![id.to_string(), question_key, answer],
        )?;
        Ok(())
    }

    fn query_assignments(
        &self,
        filter: &str,
        bind: &[&dyn rusqlite::ToSql],
    ) -> StoreResult<Vec<Assignment>> {
        let mut stmt = self.conn.prepare(&format!(
            "{ASSIGNMENT_SELECT_SQL} {filter}{ASSIGNMENT_ORDER_SQL};"
        ))?;
        let mut rows = stmt.query(bind)?;
        let mut assignments = Vec::new();
        while let Some(row) = rows.next()? {
            assignments.push(parse_assignment_row(row)?);
        }
        Ok(assignments)
    }
}

impl AssignmentStore for SqliteAssignmentStore<'_> {
    fn count_for_project(&self, project: ProjectId, rubric: RubricId) -> StoreResult<usize> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM assignments WHERE project_id = ?1 AND rubric_id = ?2;",
            params![project, rubric],
            |row| row.get(0),
        )?;
        Ok(count as usize)
    }

    fn count_for_judge(&self, judge: JudgeId, rubric: RubricId) -> StoreResult<usize> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM assignments WHERE judge_id = ?1 AND rubric_id = ?2;",
            params![judge, rubric],
            |row| row.get(0),
        )?;
        Ok(count as usize)
    }

    fn exists(&self, judge: JudgeId, project: ProjectId, rubric: RubricId) -> StoreResult<bool> {
        let exists: i64 = self.conn.query_row(
            "SELECT EXISTS(
                SELECT 1
                FROM assignments
                WHERE judge_id = ?1 AND project_id = ?2 AND rubric_id = ?3
            );",
            params![judge, project, rubric],
            |row| row.get(0),
        )?;
        Ok(exists == 1)
    }

    fn create(
        &self,
        judge: JudgeId,
        project: ProjectId,
        rubric: RubricId,
    ) -> StoreResult<Assignment> {
        let duplicate = StoreError::DuplicateAssignment {
            judge,
            project,
            rubric,
        };
        if self.exists(judge, project, rubric)? {
            return Err(duplicate);
        }

        let assignment = Assignment::new(judge, project, rubric);
        let inserted = self.conn.execute(
            "INSERT INTO assignments (uuid, judge_id, project_id, rubric_id)
             VALUES (?1, ?2, ?3, ?4);",
            params![assignment.id.to_string(), judge, project, rubric],
        );
        match inserted {
            Ok(_) => Ok(assignment),
            Err(err) if is_constraint(&err, ffi::SQLITE_CONSTRAINT_UNIQUE) => Err(duplicate),
            Err(err) => Err(err.into()),
        }
    }

    fn delete(&self, id: AssignmentId) -> StoreResult<()> {
        if self.has_response(id)? {
            return Err(StoreError::ProtectedAssignment(id));
        }

        let deleted = self
            .conn
            .execute("DELETE FROM assignments WHERE uuid = ?1;", [id.to_string()]);
        match deleted {
            Ok(0) => Err(StoreError::NotFound(id)),
            Ok(_) => Ok(()),
            Err(err) if is_constraint(&err, ffi::SQLITE_CONSTRAINT_FOREIGNKEY) => {
                Err(StoreError::ProtectedAssignment(id))
            }
            Err(err) => Err(err.into()),
        }
    }

    fn has_response(&self, id: AssignmentId) -> StoreResult<bool> {
        let exists: i64 = self.conn.query_row(
            "SELECT EXISTS(SELECT 1 FROM responses WHERE assignment_uuid = ?1);",
            [id.to_string()],
            |row| row.get(0),
        )?;
        Ok(exists == 1)
    }

    fn get(&self, id: AssignmentId) -> StoreResult<Option<Assignment>> {
        let id_text = id.to_string();
        Ok(self
            .query_assignments("WHERE a.uuid = ?1", &[&id_text])?
            .into_iter()
            .next())
    }

    fn list_for_rubric(&self, rubric: RubricId) -> StoreResult<Vec<Assignment>> {
        self.query_assignments("WHERE a.rubric_id = ?1", &[&rubric])
    }

    fn list_for_project(
        &self,
        project: ProjectId,
        rubric: RubricId,
    ) -> StoreResult<Vec<Assignment>> {
        self.query_assignments(
            "WHERE a.project_id = ?1 AND a.rubric_id = ?2",
            &[&project, &rubric],
        )
    }

    fn list_for_judge(&self, judge: JudgeId, rubric: RubricId) -> StoreResult<Vec<Assignment>> {
        self.query_assignments(
            "WHERE a.judge_id = ?1 AND a.rubric_id = ?2",
            &[&judge, &rubric],
        )
    }
}

fn parse_assignment_row(row: &Row<'_>) -> StoreResult<Assignment> {
    let uuid_text: String = row.get("uuid")?;
    let id = Uuid::parse_str(&uuid_text).map_err(|_| {
        StoreError::InvalidData(format!(
            "invalid uuid value `{uuid_text}` in assignments.uuid"
        ))
    })?;

    let has_response = match row.get::<_, i64>("has_response")? {
        0 => false,
        1 => true,
        other => {
            return Err(StoreError::InvalidData(format!(
                "invalid has_response value `{other}` for assignment {id}"
            )));
        }
    };

    Ok(Assignment {
        id,
        judge: row.get("judge_id")?,
        project: row.get("project_id")?,
        rubric: row.get("rubric_id")?,
        has_response,
    })
}

fn is_constraint(err: &rusqlite::Error, extended_code: i32) -> bool {
    matches!(
        err,
        rusqlite::Error::SqliteFailure(failure, _) if failure.extended_code == extended_code
    )
}
