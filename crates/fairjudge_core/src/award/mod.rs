//! Award rule evaluation.
//!
//! # Responsibility
//! - Decide which projects receive which awards from declarative rules.
//! - Keep awards of one exclusion group mutually exclusive per project.

pub mod matcher;
pub mod rule;

pub use matcher::{assign_awards, Award, AwardCandidate, AwardGrant, AwardId};
pub use rule::{AwardRule, AwardRuleError, RuleAttribute, RuleOperator};
