//! Status snapshot over the tracker and the local logs

use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Utc};

use crate::domain::{ItemFilter, ItemKind, ItemState, LogRecord, WorkItem, labels};
use crate::error::Result;
use crate::retrospective::{Aggregate, analyze};
use crate::storage::MemoryDir;
use crate::tracker::Tracker;

/// Default number of recently merged review requests shown
pub const DEFAULT_RECENT_MERGES: usize = 5;

/// More in-progress items than this is unhealthy
pub const MAX_IN_PROGRESS: usize = 3;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Concern {
    Blocked(usize),
    TooManyInProgress(usize),
}

impl fmt::Display for Concern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Concern::Blocked(n) => write!(f, "{} blocked issue(s)", n),
            Concern::TooManyInProgress(n) => write!(f, "Too many in-progress ({})", n),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Health {
    Healthy,
    Unhealthy(Vec<Concern>),
}

impl Health {
    pub fn assess(blocked: usize, in_progress: usize) -> Self {
        let mut concerns = Vec::new();
        if blocked > 0 {
            concerns.push(Concern::Blocked(blocked));
        }
        if in_progress > MAX_IN_PROGRESS {
            concerns.push(Concern::TooManyInProgress(in_progress));
        }
        if concerns.is_empty() {
            Health::Healthy
        } else {
            Health::Unhealthy(concerns)
        }
    }

    pub fn is_healthy(&self) -> bool {
        matches!(self, Health::Healthy)
    }
}

/// Suggested next action
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NextStep {
    AllCaughtUp,
    WorkOn(u64),
    ReviewOpenRequests,
}

impl fmt::Display for NextStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NextStep::AllCaughtUp => write!(f, "All caught up"),
            NextStep::WorkOn(id) => write!(f, "Work on issue #{}", id),
            NextStep::ReviewOpenRequests => write!(f, "Review open review requests"),
        }
    }
}

/// Point-in-time view of the factory
#[derive(Debug, Clone)]
pub struct StatusView {
    pub generated_at: DateTime<Utc>,
    pub ready: Vec<WorkItem>,
    pub in_progress: Vec<WorkItem>,
    pub blocked: Vec<WorkItem>,
    pub open_reviews: Vec<WorkItem>,
    pub recent_merges: Vec<WorkItem>,
    pub dispatch_count: usize,
    pub outcomes: Aggregate,
    pub health: Health,
}

impl StatusView {
    /// Ready issues plus open review requests
    pub fn actionable(&self) -> usize {
        self.ready.len() + self.open_reviews.len()
    }

    pub fn next_step(&self) -> NextStep {
        match self.ready.first() {
            Some(item) => NextStep::WorkOn(item.id),
            None if self.open_reviews.is_empty() => NextStep::AllCaughtUp,
            None => NextStep::ReviewOpenRequests,
        }
    }
}

pub struct StatusAggregator {
    tracker: Arc<dyn Tracker>,
    memory: MemoryDir,
    recent_merges: usize,
}

impl StatusAggregator {
    pub fn new(tracker: Arc<dyn Tracker>, memory: MemoryDir) -> Self {
        Self {
            tracker,
            memory,
            recent_merges: DEFAULT_RECENT_MERGES,
        }
    }

    pub fn with_recent_merges(mut self, limit: usize) -> Self {
        self.recent_merges = limit;
        self
    }

    /// Gather the current view; tracker queries run concurrently
    pub async fn snapshot(&self) -> Result<StatusView> {
        let ready = ItemFilter::labeled(ItemKind::Issue, labels::READY);
        let in_progress = ItemFilter::labeled(ItemKind::Issue, labels::IN_PROGRESS);
        let blocked = ItemFilter::labeled(ItemKind::Issue, labels::BLOCKED);
        let open_reviews = ItemFilter::open(ItemKind::ReviewRequest);
        let merged = ItemFilter::in_state(ItemKind::ReviewRequest, ItemState::Merged).with_limit(self.recent_merges);

        let (ready, in_progress, blocked, open_reviews, recent_merges) = futures::try_join!(
            self.tracker.list_items(&ready),
            self.tracker.list_items(&in_progress),
            self.tracker.list_items(&blocked),
            self.tracker.list_items(&open_reviews),
            self.tracker.list_items(&merged)
        )?;

        let dispatch_count = self
            .memory
            .dispatch_log()
            .read_all()?
            .filter(|record| record.as_dispatch().is_some())
            .count();
        let outcomes: Vec<_> = self
            .memory
            .outcome_log()
            .read_all()?
            .filter_map(LogRecord::into_outcome)
            .collect();

        let health = Health::assess(blocked.len(), in_progress.len());
        log::debug!("Status snapshot: {} ready, {} in progress, {:?}", ready.len(), in_progress.len(), health);

        Ok(StatusView {
            generated_at: Utc::now(),
            ready,
            in_progress,
            blocked,
            open_reviews,
            recent_merges,
            dispatch_count,
            outcomes: analyze(&outcomes),
            health,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{DispatchRecord, OutcomeRecord, ReviewMetrics, Role};
    use crate::tracker::InMemoryTracker;
    use tempfile::TempDir;

    fn issue(id: u64, label: &str) -> WorkItem {
        WorkItem::issue(id, format!("issue {}", id), "").with_label(label)
    }

    #[test]
    fn test_health_rules() {
        assert_eq!(Health::assess(0, 3), Health::Healthy);
        assert_eq!(Health::assess(1, 0), Health::Unhealthy(vec![Concern::Blocked(1)]));
        assert_eq!(
            Health::assess(2, 4),
            Health::Unhealthy(vec![Concern::Blocked(2), Concern::TooManyInProgress(4)])
        );
    }

    #[tokio::test]
    async fn test_snapshot() {
        let temp = TempDir::new().unwrap();
        let memory = MemoryDir::new(temp.path());
        memory
            .dispatch_log()
            .append(&LogRecord::Dispatch(DispatchRecord {
                timestamp: Utc::now(),
                item: 1,
                role: Role::Coder,
                prompt_file: memory.assignment_path(1, Role::Coder),
                prompt_sha256: None,
            }))
            .unwrap();
        memory
            .outcome_log()
            .append(&OutcomeRecord::new("merged", Role::Coder).into())
            .unwrap();

        let tracker = Arc::new(InMemoryTracker::with_items([
            issue(1, labels::READY),
            issue(2, labels::READY),
            issue(3, labels::IN_PROGRESS),
            issue(4, labels::BLOCKED),
            WorkItem::review_request(5, "pr", "", ReviewMetrics::default()),
            WorkItem::review_request(6, "old", "", ReviewMetrics::default()).with_state(ItemState::Merged),
        ]));

        let view = StatusAggregator::new(tracker, memory).snapshot().await.unwrap();
        assert_eq!(view.ready.len(), 2);
        assert_eq!(view.in_progress.len(), 1);
        assert_eq!(view.blocked.len(), 1);
        assert_eq!(view.open_reviews.len(), 1);
        assert_eq!(view.recent_merges.len(), 1);
        assert_eq!(view.dispatch_count, 1);
        assert_eq!(view.outcomes.total, 1);
        assert_eq!(view.health, Health::Unhealthy(vec![Concern::Blocked(1)]));
        assert_eq!(view.actionable(), 3);
        assert_eq!(view.next_step(), NextStep::WorkOn(1));
    }

    #[tokio::test]
    async fn test_empty_snapshot_is_caught_up() {
        let temp = TempDir::new().unwrap();
        let view = StatusAggregator::new(Arc::new(InMemoryTracker::new()), MemoryDir::new(temp.path()))
            .snapshot()
            .await
            .unwrap();
        assert!(view.health.is_healthy());
        assert_eq!(view.actionable(), 0);
        assert_eq!(view.next_step(), NextStep::AllCaughtUp);
    }

    #[tokio::test]
    async fn test_next_step_reviews_when_no_ready_issues() {
        let temp = TempDir::new().unwrap();
        let tracker = Arc::new(InMemoryTracker::with_items([WorkItem::review_request(
            9,
            "pr",
            "",
            ReviewMetrics::default(),
        )]));
        let view = StatusAggregator::new(tracker, MemoryDir::new(temp.path()))
            .snapshot()
            .await
            .unwrap();
        assert_eq!(view.next_step(), NextStep::ReviewOpenRequests);
    }

    #[tokio::test]
    async fn test_snapshot_propagates_tracker_failure() {
        let temp = TempDir::new().unwrap();
        let tracker = Arc::new(InMemoryTracker::new());
        tracker.set_unavailable(true);
        let result = StatusAggregator::new(tracker, MemoryDir::new(temp.path())).snapshot().await;
        assert!(result.is_err());
    }
}
