//! Fair entity repository contracts and SQLite implementation.
//!
//! # Responsibility
//! - Persist categories, divisions, rubrics, projects and judges.
//! - Expose the read-only `FairDirectory` view the assignment engine consumes.
//!
//! # Invariants
//! - Write paths call `validate()` before SQL mutations.
//! - Listing is deterministic: `id ASC`.
//! - A judge's category/division sets are replaced as a whole on update.

use crate::db::migrations::{current_user_version, latest_version};
use crate::db::DbError;
use crate::model::fair::{
    Category, CategoryId, Division, DivisionId, Judge, JudgeId, ModelValidationError, Project,
    ProjectId, Rubric,
};
use rusqlite::{params, Connection, Row};
use std::collections::{BTreeMap, BTreeSet};
use std::error::Error;
use std::fmt::{Display, Formatter};

const PROJECT_SELECT_SQL: &str = "SELECT
    id,
    title,
    category_id,
    subcategory,
    division_id
FROM projects";

pub type RepoResult<T> = Result<T, RepoError>;

/// Repository error for fair entity persistence.
#[derive(Debug)]
pub enum RepoError {
    Validation(ModelValidationError),
    Db(DbError),
    NotFound { entity: &'static str, id: i64 },
    /// Connection schema is not at the expected migrated version.
    UninitializedConnection {
        expected_version: u32,
        actual_version: u32,
    },
    InvalidData(String),
}

impl Display for RepoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Validation(err) => write!(f, "{err}"),
            Self::Db(err) => write!(f, "{err}"),
            Self::NotFound { entity, id } => write!(f, "{entity} not found: {id}"),
            Self::UninitializedConnection {
                expected_version,
                actual_version,
            } => write!(
                f,
                "fair repository requires schema version {expected_version}, got {actual_version}"
            ),
            Self::InvalidData(message) => write!(f, "invalid persisted fair data: {message}"),
        }
    }
}

impl Error for RepoError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Validation(err) => Some(err),
            Self::Db(err) => Some(err),
            _ => None,
        }
    }
}

impl From<ModelValidationError> for RepoError {
    fn from(value: ModelValidationError) -> Self {
        Self::Validation(value)
    }
}

impl From<DbError> for RepoError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for RepoError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

/// Input for project registration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewProject {
    pub title: String,
    pub category: CategoryId,
    pub subcategory: Option<String>,
    pub division: DivisionId,
}

/// Input for judge signup. New judges start active.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewJudge {
    pub name: String,
    pub categories: BTreeSet<CategoryId>,
    pub divisions: BTreeSet<DivisionId>,
}

/// Read-only entity view consumed by the assignment engine.
pub trait FairDirectory {
    fn list_projects(&self) -> RepoResult<Vec<Project>>;
    fn list_judges(&self) -> RepoResult<Vec<Judge>>;
    fn get_project(&self, id: ProjectId) -> RepoResult<Option<Project>>;
    fn get_judge(&self, id: JudgeId) -> RepoResult<Option<Judge>>;
}

/// Full entity repository used by fair staff tooling.
pub trait FairRepository: FairDirectory {
    fn create_category(&self, name: &str) -> RepoResult<Category>;
    fn create_division(&self, name: &str) -> RepoResult<Division>;
    fn create_rubric(&self, name: &str) -> RepoResult<Rubric>;
    fn list_categories(&self) -> RepoResult<Vec<Category>>;
    fn list_divisions(&self) -> RepoResult<Vec<Division>>;
    fn create_project(&self, project: &NewProject) -> RepoResult<Project>;
    /// Updates title, category, subcategory and division of one project.
    fn update_project(&self, project: &Project) -> RepoResult<()>;
    fn create_judge(&self, judge: &NewJudge) -> RepoResult<Judge>;
    /// Updates name, active flag and eligibility sets of one judge.
    fn update_judge(&self, judge: &Judge) -> RepoResult<()>;
    fn set_judge_active(&self, id: JudgeId, active: bool) -> RepoResult<()>;
}

/// SQLite-backed fair repository.
pub struct SqliteFairRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteFairRepository<'conn> {
    /// Creates repository from a migrated connection.
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        let expected_version = latest_version();
        let actual_version = current_user_version(conn)?;
        if actual_version != expected_version {
            return Err(RepoError::UninitializedConnection {
                expected_version,
                actual_version,
            });
        }
        Ok(Self { conn })
    }

    fn insert_named(&self, table: &'static str, kind: &'static str, name: &str) -> RepoResult<i64> {
        let normalized = name.trim();
        if normalized.is_empty() {
            return Err(ModelValidationError::BlankName(kind).into());
        }
        self.conn.execute(
            &format!("INSERT INTO {table} (name) VALUES (?1);"),
            [normalized],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    fn list_named(&self, table: &'static str) -> RepoResult<Vec<(i64, String)>> {
        let mut stmt = self
            .conn
            .prepare(&format!("SELECT id, name FROM {table} ORDER BY id ASC;"))?;
        let rows = stmt.query_map([], |row| Ok((row.get(0)?, row.get(1)?)))?;
        let mut result = Vec::new();
        for row in rows {
            result.push(row?);
        }
        Ok(result)
    }

    fn replace_judge_sets(&self, judge: &Judge) -> RepoResult<()> {
        self.conn
            .execute("DELETE FROM judge_categories WHERE judge_id = ?1;", [judge.id])?;
        self.conn
            .execute("DELETE FROM judge_divisions WHERE judge_id = ?1;", [judge.id])?;
        for category in &judge.categories {
            self.conn.execute(
                "INSERT INTO judge_categories (judge_id, category_id) VALUES (?1, ?2);",
                params![judge.id, category],
            )?;
        }
        for division in &judge.divisions {
            self.conn.execute(
                "INSERT INTO judge_divisions (judge_id, division_id) VALUES (?1, ?2);",
                params![judge.id, division],
            )?;
        }
        Ok(())
    }

    fn load_judge_sets(
        &self,
        table: &'static str,
        column: &'static str,
    ) -> RepoResult<BTreeMap<JudgeId, BTreeSet<i64>>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT judge_id, {column} FROM {table} ORDER BY judge_id ASC, {column} ASC;"
        ))?;
        let mut rows = stmt.query([])?;
        let mut sets: BTreeMap<JudgeId, BTreeSet<i64>> = BTreeMap::new();
        while let Some(row) = rows.next()? {
            let judge_id: JudgeId = row.get(0)?;
            let value: i64 = row.get(1)?;
            sets.entry(judge_id).or_default().insert(value);
        }
        Ok(sets)
    }

    fn query_judges(&self, id: Option<JudgeId>) -> RepoResult<Vec<Judge>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, name, is_active
             FROM judges
             WHERE (?1 IS NULL OR id = ?1)
             ORDER BY id ASC;",
        )?;
        let mut rows = stmt.query([id])?;
        let mut categories = self.load_judge_sets("judge_categories", "category_id")?;
        let mut divisions = self.load_judge_sets("judge_divisions", "division_id")?;
        let mut judges = Vec::new();
        while let Some(row) = rows.next()? {
            let judge_id: JudgeId = row.get("id")?;
            judges.push(Judge {
                id: judge_id,
                name: row.get("name")?,
                active: parse_active_flag(row.get("is_active")?)?,
                categories: categories.remove(&judge_id).unwrap_or_default(),
                divisions: divisions.remove(&judge_id).unwrap_or_default(),
            });
        }
        Ok(judges)
    }
}

impl FairDirectory for SqliteFairRepository<'_> {
    fn list_projects(&self) -> RepoResult<Vec<Project>> {
        let mut stmt = self
            .conn
            .prepare(&format!("{PROJECT_SELECT_SQL} ORDER BY id ASC;"))?;
        let mut rows = stmt.query([])?;
        let mut projects = Vec::new();
        while let Some(row) = rows.next()? {
            projects.push(parse_project_row(row)?);
        }
        Ok(projects)
    }

    fn list_judges(&self) -> RepoResult<Vec<Judge>> {
        self.query_judges(None)
    }

    fn get_project(&self, id: ProjectId) -> RepoResult<Option<Project>> {
        let mut stmt = self
            .conn
            .prepare(&format!("{PROJECT_SELECT_SQL} WHERE id = ?1;"))?;
        let mut rows = stmt.query([id])?;
        if let Some(row) = rows.next()? {
            return Ok(Some(parse_project_row(row)?));
        }
        Ok(None)
    }

    fn get_judge(&self, id: JudgeId) -> RepoResult<Option<Judge>> {
        Ok(self.query_judges(Some(id))?.into_iter().next())
    }
}

impl FairRepository for SqliteFairRepository<'_> {
    fn create_category(&self, name: &str) -> RepoResult<Category> {
        let id = self.insert_named("categories", "category", name)?;
        Ok(Category {
            id,
            name: name.trim().to_string(),
        })
    }

    fn create_division(&self, name: &str) -> RepoResult<Division> {
        let id = self.insert_named("divisions", "division", name)?;
        Ok(Division {
            id,
            name: name.trim().to_string(),
        })
    }

    fn create_rubric(&self, name: &str) -> RepoResult<Rubric> {
        let id = self.insert_named("rubrics", "rubric", name)?;
        Ok(Rubric {
            id,
            name: name.trim().to_string(),
        })
    }

    fn list_categories(&self) -> RepoResult<Vec<Category>> {
        Ok(self
            .list_named("categories")?
            .into_iter()
            .map(|(id, name)| Category { id, name })
            .collect())
    }

    fn list_divisions(&self) -> RepoResult<Vec<Division>> {
        Ok(self
            .list_named("divisions")?
            .into_iter()
            .map(|(id, name)| Division { id, name })
            .collect())
    }

    fn create_project(&self, project: &NewProject) -> RepoResult<Project> {
        let mut created = Project {
            id: 0,
            title: project.title.trim().to_string(),
            category: project.category,
            subcategory: project.subcategory.clone(),
            division: project.division,
        };
        created.validate()?;

        self.conn.execute(
            "INSERT INTO projects (title, category_id, subcategory, division_id)
             VALUES (?1, ?2, ?3, ?4);",
            params![
                created.title.as_str(),
                created.category,
                created.subcategory.as_deref(),
                created.division,
            ],
        )?;
        created.id = self.conn.last_insert_rowid();
        Ok(created)
    }

    fn update_project(&self, project: &Project) -> RepoResult<()> {
        project.validate()?;

        let changed = self.conn.execute(
            "UPDATE projects
             SET
                title = ?1,
                category_id = ?2,
                subcategory = ?3,
                division_id = ?4,
                updated_at = (strftime('%s', 'now') * 1000)
             WHERE id = ?5;",
            params![
                project.title.as_str(),
                project.category,
                project.subcategory.as_deref(),
                project.division,
                project.id,
            ],
        )?;

        if changed == 0 {
            return Err(RepoError::NotFound {
                entity: "project",
                id: project.id,
            });
        }
        Ok(())
    }

    fn create_judge(&self, judge: &NewJudge) -> RepoResult<Judge> {
        let mut created = Judge {
            id: 0,
            name: judge.name.trim().to_string(),
            active: true,
            categories: judge.categories.clone(),
            divisions: judge.divisions.clone(),
        };
        created.validate()?;

        self.conn.execute(
            "INSERT INTO judges (name, is_active) VALUES (?1, 1);",
            [created.name.as_str()],
        )?;
        created.id = self.conn.last_insert_rowid();
        self.replace_judge_sets(&created)?;
        Ok(created)
    }

    fn update_judge(&self, judge: &Judge) -> RepoResult<()> {
        judge.validate()?;

        let changed = self.conn.execute(
            "UPDATE judges
             SET
                name = ?1,
                is_active = ?2,
                updated_at = (strftime('%s', 'now') * 1000)
             WHERE id = ?3;",
            params![judge.name.as_str(), bool_to_int(judge.active), judge.id],
        )?;
        if changed == 0 {
            return Err(RepoError::NotFound {
                entity: "judge",
                id: judge.id,
            });
        }
        self.replace_judge_sets(judge)
    }

    fn set_judge_active(&self, id: JudgeId, active: bool) -> RepoResult<()> {
        let changed = self.conn.execute(
            "UPDATE judges
             SET
                is_active = ?1,
                updated_at = (strftime('%s', 'now') * 1000)
             WHERE id = ?2;",
            params![bool_to_int(active), id],
        )?;
        if changed == 0 {
            return Err(RepoError::NotFound { entity: "judge", id });
        }
        Ok(())
    }
}

fn parse_project_row(row: &Row<'_>) -> RepoResult<Project> {
    let project = Project {
        id: row.get("id")?,
        title: row.get("title")?,
        category: row.get("category_id")?,
        subcategory: row.get("subcategory")?,
        division: row.get("division_id")?,
    };
    project.validate().map_err(|err| {
        RepoError::InvalidData(format!("project {} failed validation: {err}", project.id))
    })?;
    Ok(project)
}

fn parse_active_flag(value: i64) -> RepoResult<bool> {
    match value {
        0 => Ok(false),
        1 => Ok(true),
        other => Err(RepoError::InvalidData(format!(
            "invalid is_active value `{other}` in judges.is_active"
        ))),
    }
}

fn bool_to_int(value: bool) -> i64 {
    if value {
        1
    } else {
        0
    }
}
