//! Award eligibility rules.
//!
//! # Responsibility
//! - Parse operator and attribute tags through static lookup tables.
//! - Evaluate one rule against one candidate without side effects.
//!
//! # Invariants
//! - A rule is validated when built: `matches` carries a compiled pattern and
//!   numeric comparisons carry a numeric operand.
//! - A missing attribute value only satisfies the negated operators.

use crate::award::matcher::AwardCandidate;
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::BTreeMap;
use std::error::Error;
use std::fmt::{Display, Formatter};

static OPERATORS: Lazy<BTreeMap<&'static str, RuleOperator>> = Lazy::new(|| {
    RuleOperator::ALL
        .iter()
        .map(|operator| (operator.tag(), *operator))
        .collect()
});
static ATTRIBUTES: Lazy<BTreeMap<&'static str, RuleAttribute>> = Lazy::new(|| {
    RuleAttribute::ALL
        .iter()
        .map(|attribute| (attribute.tag(), *attribute))
        .collect()
});
static LIST_SEPARATOR_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\s*[,;]\s*").expect("valid list separator regex"));

/// Errors raised while building award rules.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AwardRuleError {
    UnknownOperator(String),
    UnknownAttribute(String),
    /// `less_than`/`greater_than` operand is not a number.
    NonNumericOperand {
        operator: RuleOperator,
        operand: String,
    },
    InvalidPattern {
        pattern: String,
        message: String,
    },
}

impl Display for AwardRuleError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::UnknownOperator(tag) => write!(f, "unknown rule operator `{tag}`"),
            Self::UnknownAttribute(tag) => write!(f, "unknown rule attribute `{tag}`"),
            Self::NonNumericOperand { operator, operand } => {
                write!(f, "operator `{operator}` needs a numeric operand, got `{operand}`")
            }
            Self::InvalidPattern { pattern, message } => {
                write!(f, "invalid rule pattern `{pattern}`: {message}")
            }
        }
    }
}

impl Error for AwardRuleError {}

/// Comparison applied by an award rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum RuleOperator {
    Is,
    IsNot,
    In,
    NotIn,
    LessThan,
    GreaterThan,
    Matches,
}

impl RuleOperator {
    pub const ALL: [RuleOperator; 7] = [
        Self::Is,
        Self::IsNot,
        Self::In,
        Self::NotIn,
        Self::LessThan,
        Self::GreaterThan,
        Self::Matches,
    ];

    pub fn tag(self) -> &'static str {
        match self {
            Self::Is => "is",
            Self::IsNot => "is_not",
            Self::In => "in",
            Self::NotIn => "not_in",
            Self::LessThan => "less_than",
            Self::GreaterThan => "greater_than",
            Self::Matches => "matches",
        }
    }

    /// Looks up an operator by its stored tag.
    ///
    /// # Errors
    /// - `UnknownOperator` when `tag` is not registered.
    pub fn from_tag(tag: &str) -> Result<Self, AwardRuleError> {
        OPERATORS
            .get(tag.trim())
            .copied()
            .ok_or_else(|| AwardRuleError::UnknownOperator(tag.to_string()))
    }

    fn is_negated(self) -> bool {
        matches!(self, Self::IsNot | Self::NotIn)
    }
}

impl Display for RuleOperator {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.tag())
    }
}

/// Candidate attribute a rule inspects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum RuleAttribute {
    Category,
    Subcategory,
    Division,
    Rank,
}

impl RuleAttribute {
    pub const ALL: [RuleAttribute; 4] = [
        Self::Category,
        Self::Subcategory,
        Self::Division,
        Self::Rank,
    ];

    pub fn tag(self) -> &'static str {
        match self {
            Self::Category => "category",
            Self::Subcategory => "subcategory",
            Self::Division => "division",
            Self::Rank => "rank",
        }
    }

    pub fn from_tag(tag: &str) -> Result<Self, AwardRuleError> {
        ATTRIBUTES
            .get(tag.trim())
            .copied()
            .ok_or_else(|| AwardRuleError::UnknownAttribute(tag.to_string()))
    }

    fn value_of(self, candidate: &AwardCandidate) -> Option<String> {
        match self {
            Self::Category => Some(candidate.category.to_string()),
            Self::Subcategory => candidate.subcategory.clone(),
            Self::Division => Some(candidate.division.to_string()),
            Self::Rank => candidate.rank.map(|rank| rank.to_string()),
        }
    }
}

impl Display for RuleAttribute {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.tag())
    }
}

/// One validated `attribute operator operand` condition.
#[derive(Debug, Clone)]
pub struct AwardRule {
    attribute: RuleAttribute,
    operator: RuleOperator,
    operand: String,
    compiled: Option<Regex>,
    threshold: Option<f64>,
}

impl AwardRule {
    /// Builds a rule, compiling patterns and numeric operands up front.
    ///
    /// # Errors
    /// - `InvalidPattern` when a `matches` operand is not a valid regex.
    /// - `NonNumericOperand` for a non-numeric `less_than`/`greater_than`.
    pub fn new(
        attribute: RuleAttribute,
        operator: RuleOperator,
        operand: impl Into<String>,
    ) -> Result<Self, AwardRuleError> {
        let operand = operand.into();
        let mut compiled = None;
        let mut threshold = None;
        match operator {
            RuleOperator::Matches => {
                let regex = Regex::new(&operand).map_err(|err| AwardRuleError::InvalidPattern {
                    pattern: operand.clone(),
                    message: err.to_string(),
                })?;
                compiled = Some(regex);
            }
            RuleOperator::LessThan | RuleOperator::GreaterThan => {
                let value = operand.trim().parse::<f64>().map_err(|_| {
                    AwardRuleError::NonNumericOperand {
                        operator,
                        operand: operand.clone(),
                    }
                })?;
                threshold = Some(value);
            }
            _ => {}
        }

        Ok(Self {
            attribute,
            operator,
            operand,
            compiled,
            threshold,
        })
    }

    /// Builds a rule from stored tags.
    pub fn parse(attribute: &str, operator: &str, operand: &str) -> Result<Self, AwardRuleError> {
        Self::new(
            RuleAttribute::from_tag(attribute)?,
            RuleOperator::from_tag(operator)?,
            operand,
        )
    }

    pub fn attribute(&self) -> RuleAttribute {
        self.attribute
    }

    pub fn operator(&self) -> RuleOperator {
        self.operator
    }

    pub fn operand(&self) -> &str {
        &self.operand
    }

    pub fn evaluate(&self, candidate: &AwardCandidate) -> bool {
        let Some(value) = self.attribute.value_of(candidate) else {
            return self.operator.is_negated();
        };
        let value = value.trim();

        match self.operator {
            RuleOperator::Is => value == self.operand.trim(),
            RuleOperator::IsNot => value != self.operand.trim(),
            RuleOperator::In => self.operand_list().any(|item| item == value),
            RuleOperator::NotIn => !self.operand_list().any(|item| item == value),
            RuleOperator::LessThan => self.compare(value, |left, right| left < right),
            RuleOperator::GreaterThan => self.compare(value, |left, right| left > right),
            RuleOperator::Matches => self
                .compiled
                .as_ref()
                .is_some_and(|regex| regex.is_match(value)),
        }
    }

    fn operand_list(&self) -> impl Iterator<Item = &str> {
        LIST_SEPARATOR_RE
            .split(self.operand.trim())
            .filter(|item| !item.is_empty())
    }

    fn compare(&self, value: &str, op: impl Fn(f64, f64) -> bool) -> bool {
        match (value.parse::<f64>(), self.threshold) {
            (Ok(left), Some(right)) => op(left, right),
            _ => false,
        }
    }
}

impl Display for AwardRule {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {} `{}`", self.attribute, self.operator, self.operand)
    }
}
