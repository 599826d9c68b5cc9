//! Award assignment with exclusion groups.
//!
//! # Invariants
//! - Awards are granted in the order given; candidates are visited by rank
//!   ascending (unranked last), ties by project id.
//! - A candidate holds at most one award per exclusion group.
//! - An award never exceeds `max_recipients`.

use crate::award::rule::AwardRule;
use crate::model::fair::{CategoryId, DivisionId, Project, ProjectId};
use log::debug;
use std::collections::{BTreeMap, BTreeSet};

pub type AwardId = i64;

/// Project attributes visible to award rules.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AwardCandidate {
    pub project: ProjectId,
    pub category: CategoryId,
    pub subcategory: Option<String>,
    pub division: DivisionId,
    /// Final placing, `1` is best.
    pub rank: Option<u32>,
}

impl AwardCandidate {
    pub fn from_project(project: &Project, rank: Option<u32>) -> Self {
        Self {
            project: project.id,
            category: project.category,
            subcategory: project.subcategory.clone(),
            division: project.division,
            rank,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Award {
    pub id: AwardId,
    pub name: String,
    /// All rules must hold.
    pub rules: Vec<AwardRule>,
    pub exclusion_group: Option<String>,
    /// `None` means unlimited.
    pub max_recipients: Option<usize>,
}

impl Award {
    pub fn accepts(&self, candidate: &AwardCandidate) -> bool {
        self.rules.iter().all(|rule| rule.evaluate(candidate))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AwardGrant {
    pub award: AwardId,
    pub project: ProjectId,
}

/// Grants `awards` to `candidates`.
pub fn assign_awards(awards: &[Award], candidates: &[AwardCandidate]) -> Vec<AwardGrant> {
    let mut ordered: Vec<&AwardCandidate> = candidates.iter().collect();
    ordered.sort_by_key(|candidate| (candidate.rank.is_none(), candidate.rank, candidate.project));

    let mut held_groups: BTreeMap<ProjectId, BTreeSet<&str>> = BTreeMap::new();
    let mut grants = Vec::new();

    for award in awards {
        let limit = award.max_recipients.unwrap_or(usize::MAX);
        let mut granted = 0usize;
        for candidate in &ordered {
            if granted >= limit {
                break;
            }
            if let Some(group) = award.exclusion_group.as_deref() {
                if held_groups
                    .get(&candidate.project)
                    .is_some_and(|groups| groups.contains(group))
                {
                    continue;
                }
            }
            if !award.accepts(candidate) {
                continue;
            }

            if let Some(group) = award.exclusion_group.as_deref() {
                held_groups
                    .entry(candidate.project)
                    .or_default()
                    .insert(group);
            }
            grants.push(AwardGrant {
                award: award.id,
                project: candidate.project,
            });
            granted += 1;
        }
        debug!(
            "event=award_assign module=award status=ok award={} granted={granted}",
            award.id
        );
    }
    grants
}

#[cfg(test)]
mod tests {
    use super::{assign_awards, Award, AwardCandidate, AwardGrant};
    use crate::award::rule::AwardRule;

    fn candidate(project: i64, division: i64, rank: Option<u32>) -> AwardCandidate {
        AwardCandidate {
            project,
            category: 1,
            subcategory: None,
            division,
            rank,
        }
    }

    fn award(id: i64, rules: Vec<AwardRule>, group: Option<&str>, max: Option<usize>) -> Award {
        Award {
            id,
            name: format!("award-{id}"),
            rules,
            exclusion_group: group.map(str::to_string),
            max_recipients: max,
        }
    }

    #[test]
    fn grants_by_rank_within_capacity() {
        let candidates = vec![
            candidate(10, 1, Some(3)),
            candidate(11, 1, None),
            candidate(12, 1, Some(1)),
        ];
        let awards = vec![award(1, Vec::new(), None, Some(2))];

        let grants = assign_awards(&awards, &candidates);
        assert_eq!(
            grants,
            vec![
                AwardGrant { award: 1, project: 12 },
                AwardGrant { award: 1, project: 10 },
            ]
        );
    }

    #[test]
    fn exclusion_group_blocks_second_award() {
        let candidates = vec![candidate(10, 1, Some(1)), candidate(11, 1, Some(2))];
        let awards = vec![
            award(1, Vec::new(), Some("place"), Some(1)),
            award(2, Vec::new(), Some("place"), Some(1)),
            award(3, Vec::new(), None, None),
        ];

        let grants = assign_awards(&awards, &candidates);
        assert_eq!(
            grants,
            vec![
                AwardGrant { award: 1, project: 10 },
                AwardGrant { award: 2, project: 11 },
                AwardGrant { award: 3, project: 10 },
                AwardGrant { award: 3, project: 11 },
            ]
        );
    }

    #[test]
    fn rules_filter_candidates() {
        let candidates = vec![candidate(10, 1, Some(1)), candidate(11, 2, Some(2))];
        let rules = vec![AwardRule::parse("division", "is", "2").expect("valid rule")];
        let awards = vec![award(1, rules, None, None)];

        let grants = assign_awards(&awards, &candidates);
        assert_eq!(grants, vec![AwardGrant { award: 1, project: 11 }]);
    }
}
