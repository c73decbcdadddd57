//! Markdown improvement report

use std::collections::BTreeMap;
use std::fmt::Display;

use chrono::NaiveDate;

use super::analysis::Aggregate;
use super::proposals::ImprovementProposal;

/// Recent tracker activity included in the report
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TrackerActivity {
    pub closed_issues: usize,
    pub merged_reviews: usize,
}

fn table<K: Display>(counts: &BTreeMap<K, usize>) -> String {
    if counts.is_empty() {
        return "none".to_string();
    }
    counts
        .iter()
        .map(|(key, n)| format!("{}: {}", key, n))
        .collect::<Vec<_>>()
        .join(", ")
}

/// Render the report; output depends only on the arguments
pub fn build_report(
    aggregate: &Aggregate,
    proposals: &[ImprovementProposal],
    activity: TrackerActivity,
    date: NaiveDate,
) -> String {
    let mut out = String::new();

    out.push_str(&format!("# Improvement Proposals - {}\n\n", date.format("%Y-%m-%d")));
    out.push_str("## Analysis Period\n");
    out.push_str(&format!("Last {} tasks\n\n", aggregate.total));

    out.push_str("## Metrics Summary\n");
    out.push_str(&format!("- Total tasks analyzed: {}\n", aggregate.total));
    out.push_str(&format!("- Results: {}\n", table(&aggregate.by_result)));
    out.push_str(&format!("- Roles used: {}\n", table(&aggregate.by_role)));
    if let Some(rate) = aggregate.success_rate() {
        out.push_str(&format!("- Success rate: {:.1}%\n", rate));
    }
    out.push('\n');

    out.push_str("## Tracker Activity\n");
    out.push_str(&format!("- Closed issues: {}\n", activity.closed_issues));
    out.push_str(&format!("- Merged review requests: {}\n\n", activity.merged_reviews));

    out.push_str("## Patterns Identified\n\n");
    if proposals.is_empty() {
        out.push_str("No significant patterns identified.\n");
    } else {
        for (i, proposal) in proposals.iter().enumerate() {
            out.push_str(&format!("### {}. {}\n", i + 1, proposal.problem));
            out.push_str(&format!("**Type:** {}\n", proposal.category));
            out.push_str(&format!("**Evidence:** {}\n", proposal.evidence));
            if !proposal.roles.is_empty() {
                let roles: Vec<&str> = proposal.roles.iter().map(|r| r.as_str()).collect();
                out.push_str(&format!("**Roles:** {}\n", roles.join(", ")));
            }
            out.push_str(&format!("**Suggestion:** {}\n\n", proposal.suggestion));
        }
    }

    out.push_str("\n## Recommendations\n\n");
    if proposals.is_empty() {
        out.push_str("- Continue current practices\n");
        out.push_str("- Monitor for new patterns\n");
    } else {
        out.push_str("- Review identified patterns\n");
        out.push_str("- Update relevant role profiles\n");
        out.push_str("- Track whether the changes help\n");
    }

    out
}
