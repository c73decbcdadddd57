//! Outcome aggregation

use std::collections::BTreeMap;

use crate::domain::{OutcomeRecord, OutcomeResult, Role};

/// One rejection that carried a reason
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rejection {
    pub reason: String,
    pub role: Role,
}

/// Frequency tables and rejection reasons over a set of outcomes
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Aggregate {
    pub total: usize,
    pub by_result: BTreeMap<String, usize>,
    pub by_role: BTreeMap<Role, usize>,
    /// Rejections with a non-empty reason, in log order
    pub rejections: Vec<Rejection>,
}

impl Aggregate {
    /// Number of outcomes with the given result
    pub fn count(&self, result: &OutcomeResult) -> usize {
        self.by_result.get(result.as_str()).copied().unwrap_or(0)
    }

    /// Merged outcomes as a percentage of all outcomes, if any exist
    pub fn success_rate(&self) -> Option<f64> {
        if self.total == 0 {
            return None;
        }
        Some(self.count(&OutcomeResult::Merged) as f64 / self.total as f64 * 100.0)
    }
}

/// Aggregate outcomes into frequency tables
pub fn analyze<'a>(outcomes: impl IntoIterator<Item = &'a OutcomeRecord>) -> Aggregate {
    let mut aggregate = Aggregate::default();

    for outcome in outcomes {
        aggregate.total += 1;
        *aggregate.by_result.entry(outcome.result.as_str().to_string()).or_default() += 1;
        *aggregate.by_role.entry(outcome.role).or_default() += 1;

        if outcome.result == OutcomeResult::Rejected
            && let Some(reason) = outcome.reason.as_deref()
            && !reason.trim().is_empty()
        {
            aggregate.rejections.push(Rejection {
                reason: reason.to_string(),
                role: outcome.role,
            });
        }
    }

    aggregate
}
