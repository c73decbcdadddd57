//! Retrospective run driver
//!
//! Reads the outcome log and recent tracker activity, writes the improvement
//! report and records the run. The report is built completely in memory and
//! replaced atomically, so a failed run leaves the previous report intact.

use std::path::PathBuf;
use std::sync::Arc;

use chrono::Utc;
use log::{info, warn};

use super::analysis::analyze;
use super::proposals::{ImprovementProposal, ProposalCategory, propose_improvements};
use super::report::{TrackerActivity, build_report};
use crate::domain::{ItemFilter, ItemKind, ItemState, LogRecord, RetrospectiveRunRecord, Role, sort_by_timestamp};
use crate::error::{FactoryError, Result};
use crate::profile::BehaviorRegistry;
use crate::storage::{MemoryDir, write_atomic};
use crate::tracker::Tracker;

/// Default number of closed issues and merged review requests fetched
pub const DEFAULT_RECENT_LIMIT: usize = 20;

/// A checklist item written into a role profile by `apply`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppliedChange {
    pub role: Role,
    pub item: String,
}

/// What one retrospective run did
#[derive(Debug, Clone)]
pub struct RetrospectiveSummary {
    pub tasks_analyzed: usize,
    /// Malformed outcome lines that were skipped
    pub skipped_lines: usize,
    pub activity: TrackerActivity,
    pub proposals: Vec<ImprovementProposal>,
    pub report_path: PathBuf,
    pub applied: Vec<AppliedChange>,
}

pub struct RetrospectiveEngine {
    tracker: Arc<dyn Tracker>,
    registry: BehaviorRegistry,
    memory: MemoryDir,
    recent_limit: usize,
}

impl RetrospectiveEngine {
    pub fn new(tracker: Arc<dyn Tracker>, registry: BehaviorRegistry, memory: MemoryDir) -> Self {
        Self {
            tracker,
            registry,
            memory,
            recent_limit: DEFAULT_RECENT_LIMIT,
        }
    }

    pub fn with_recent_limit(mut self, limit: usize) -> Self {
        self.recent_limit = limit;
        self
    }

    /// Run one retrospective
    ///
    /// With `apply`, each pattern's checklist item is added to the profiles of
    /// the roles that produced it. Roles without a profile are skipped.
    pub async fn run(&self, apply: bool) -> Result<RetrospectiveSummary> {
        let mut records = self.memory.outcome_log().read_all()?;
        let mut collected: Vec<LogRecord> = records.by_ref().collect();
        let skipped_lines = records.skipped();
        sort_by_timestamp(&mut collected);
        let outcomes: Vec<_> = collected.into_iter().filter_map(LogRecord::into_outcome).collect();

        let activity = self.recent_activity().await?;
        info!(
            "Retrospective over {} outcomes ({} skipped), {} closed issues, {} merged reviews",
            outcomes.len(),
            skipped_lines,
            activity.closed_issues,
            activity.merged_reviews
        );

        let aggregate = analyze(&outcomes);
        let proposals = propose_improvements(&aggregate);
        let report = build_report(&aggregate, &proposals, activity, Utc::now().date_naive());

        let report_path = self.memory.report_path();
        write_atomic(&report_path, &report)?;

        self.memory.run_history().append(&RetrospectiveRunRecord {
            timestamp: Utc::now(),
            tasks_analyzed: aggregate.total,
            improvements_proposed: proposals.len(),
        })?;

        let applied = if apply { self.apply(&proposals)? } else { Vec::new() };

        Ok(RetrospectiveSummary {
            tasks_analyzed: aggregate.total,
            skipped_lines,
            activity,
            proposals,
            report_path,
            applied,
        })
    }

    async fn recent_activity(&self) -> Result<TrackerActivity> {
        let closed = ItemFilter::in_state(ItemKind::Issue, ItemState::Closed).with_limit(self.recent_limit);
        let merged = ItemFilter::in_state(ItemKind::ReviewRequest, ItemState::Merged).with_limit(self.recent_limit);

        let (closed, merged) =
            futures::try_join!(self.tracker.list_items(&closed), self.tracker.list_items(&merged))?;

        Ok(TrackerActivity {
            closed_issues: closed.len(),
            merged_reviews: merged.len(),
        })
    }

    fn apply(&self, proposals: &[ImprovementProposal]) -> Result<Vec<AppliedChange>> {
        let mut applied = Vec::new();

        for proposal in proposals.iter().filter(|p| p.category == ProposalCategory::Pattern) {
            let Some(item) = proposal.checklist_item.as_deref() else {
                continue;
            };
            for role in &proposal.roles {
                match self.registry.append_checklist_item(*role, item) {
                    Ok(true) => applied.push(AppliedChange {
                        role: *role,
                        item: item.to_string(),
                    }),
                    Ok(false) => {}
                    Err(FactoryError::UnknownRole(role)) => {
                        warn!("No profile for {}, checklist item not applied: {}", role, item);
                    }
                    Err(e) => return Err(e),
                }
            }
        }

        Ok(applied)
    }
}
