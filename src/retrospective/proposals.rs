//! Improvement proposals derived from an aggregate

use std::fmt;

use serde::Serialize;

use super::analysis::Aggregate;
use crate::domain::Role;

/// Reasons must repeat at least this often to count as a pattern
pub const PATTERN_MIN_OCCURRENCES: usize = 2;

/// At most this many pattern proposals per run
pub const MAX_PATTERN_PROPOSALS: usize = 3;

/// Success rate (percent) below which a metric proposal is raised
pub const SUCCESS_RATE_THRESHOLD: f64 = 80.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ProposalCategory {
    Pattern,
    Metric,
}

impl fmt::Display for ProposalCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProposalCategory::Pattern => write!(f, "pattern"),
            ProposalCategory::Metric => write!(f, "metric"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Evidence {
    Occurrences(usize),
    SuccessRate(f64),
}

impl fmt::Display for Evidence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Evidence::Occurrences(n) => write!(f, "{} occurrences", n),
            Evidence::SuccessRate(pct) => write!(f, "{:.1}% merged", pct),
        }
    }
}

/// A suggested process change
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ImprovementProposal {
    pub category: ProposalCategory,
    pub problem: String,
    pub evidence: Evidence,
    pub suggestion: String,
    /// Roles whose outcomes produced the pattern; empty for metric proposals
    pub roles: Vec<Role>,
    /// Checklist text for the affected profiles (patterns only)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub checklist_item: Option<String>,
}

struct ReasonTally {
    reason: String,
    count: usize,
    roles: Vec<Role>,
}

/// Propose improvements; the same aggregate always yields the same list
pub fn propose_improvements(aggregate: &Aggregate) -> Vec<ImprovementProposal> {
    let mut proposals = Vec::new();

    // First-seen order, so a stable sort breaks frequency ties by it
    let mut tallies: Vec<ReasonTally> = Vec::new();
    for rejection in &aggregate.rejections {
        match tallies.iter_mut().find(|t| t.reason == rejection.reason) {
            Some(tally) => {
                tally.count += 1;
                if !tally.roles.contains(&rejection.role) {
                    tally.roles.push(rejection.role);
                }
            }
            None => tallies.push(ReasonTally {
                reason: rejection.reason.clone(),
                count: 1,
                roles: vec![rejection.role],
            }),
        }
    }
    tallies.sort_by(|a, b| b.count.cmp(&a.count));

    for tally in tallies
        .into_iter()
        .filter(|t| t.count >= PATTERN_MIN_OCCURRENCES)
        .take(MAX_PATTERN_PROPOSALS)
    {
        let mut roles = tally.roles;
        roles.sort();
        proposals.push(ImprovementProposal {
            category: ProposalCategory::Pattern,
            problem: format!("Repeated rejection: {}", tally.reason),
            evidence: Evidence::Occurrences(tally.count),
            suggestion: format!("Add a checklist item to prevent: {}", tally.reason),
            roles,
            checklist_item: Some(tally.reason),
        });
    }

    if let Some(rate) = aggregate.success_rate()
        && rate < SUCCESS_RATE_THRESHOLD
    {
        proposals.push(ImprovementProposal {
            category: ProposalCategory::Metric,
            problem: format!("Low success rate: {:.1}%", rate),
            evidence: Evidence::SuccessRate(rate),
            suggestion: "Review rejection patterns and update role profiles".to_string(),
            roles: Vec::new(),
            checklist_item: None,
        });
    }

    proposals
}
