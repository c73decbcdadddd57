//! Retrospective - mines the outcome log for process improvements
//!
//! - analysis: frequency tables over outcomes
//! - proposals: deterministic improvement proposals
//! - report: Markdown rendering
//! - engine: the run driver that persists the report and run history

mod analysis;
mod engine;
mod proposals;
mod report;

pub use analysis::{Aggregate, Rejection, analyze};
pub use engine::{AppliedChange, DEFAULT_RECENT_LIMIT, RetrospectiveEngine, RetrospectiveSummary};
pub use proposals::{
    Evidence, ImprovementProposal, MAX_PATTERN_PROPOSALS, PATTERN_MIN_OCCURRENCES, ProposalCategory,
    SUCCESS_RATE_THRESHOLD, propose_improvements,
};
pub use report::{TrackerActivity, build_report};
