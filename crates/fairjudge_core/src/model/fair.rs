//! Fair entity records: categories, divisions, projects, judges, rubrics.
//!
//! # Invariants
//! - A project belongs to exactly one category and one division.
//! - A judge may cover any number of categories and divisions; an empty set
//!   means the judge is eligible for nothing.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::error::Error;
use std::fmt::{Display, Formatter};

pub type CategoryId = i64;
pub type DivisionId = i64;
pub type ProjectId = i64;
pub type JudgeId = i64;
pub type RubricId = i64;

/// Judging category (e.g. "Physics").
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Category {
    pub id: CategoryId,
    pub name: String,
}

/// Grade band a project competes in (e.g. "Senior").
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Division {
    pub id: DivisionId,
    pub name: String,
}

/// Scoring rubric that assignments are recorded under.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rubric {
    pub id: RubricId,
    pub name: String,
}

/// Placement of a project inside the fair; the only attributes the
/// assignment engine reads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Placement {
    pub category: CategoryId,
    pub division: DivisionId,
}

/// Science-fair project.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Project {
    pub id: ProjectId,
    pub title: String,
    pub category: CategoryId,
    /// Free-form refinement of `category`; never used for eligibility.
    pub subcategory: Option<String>,
    pub division: DivisionId,
}

impl Project {
    pub fn placement(&self) -> Placement {
        Placement {
            category: self.category,
            division: self.division,
        }
    }

    /// Validates user-editable fields before persistence.
    pub fn validate(&self) -> Result<(), ModelValidationError> {
        if self.title.trim().is_empty() {
            return Err(ModelValidationError::BlankProjectTitle);
        }
        if matches!(self.subcategory.as_deref(), Some(value) if value.trim().is_empty()) {
            return Err(ModelValidationError::BlankSubcategory);
        }
        Ok(())
    }
}

/// Registered judge and the placements they can evaluate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Judge {
    pub id: JudgeId,
    pub name: String,
    pub active: bool,
    pub categories: BTreeSet<CategoryId>,
    pub divisions: BTreeSet<DivisionId>,
}

impl Judge {
    /// Returns every placement this judge covers.
    pub fn placements(&self) -> impl Iterator<Item = Placement> + '_ {
        self.categories.iter().flat_map(move |category| {
            self.divisions.iter().map(move |division| Placement {
                category: *category,
                division: *division,
            })
        })
    }

    /// Validates user-editable fields before persistence.
    pub fn validate(&self) -> Result<(), ModelValidationError> {
        if self.name.trim().is_empty() {
            return Err(ModelValidationError::BlankJudgeName);
        }
        Ok(())
    }
}

/// Field-level validation failures for fair entities.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ModelValidationError {
    BlankProjectTitle,
    BlankSubcategory,
    BlankJudgeName,
    BlankName(&'static str),
}

impl Display for ModelValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::BlankProjectTitle => write!(f, "project title must not be blank"),
            Self::BlankSubcategory => write!(f, "subcategory must be omitted rather than blank"),
            Self::BlankJudgeName => write!(f, "judge name must not be blank"),
            Self::BlankName(kind) => write!(f, "{kind} name must not be blank"),
        }
    }
}

impl Error for ModelValidationError {}
