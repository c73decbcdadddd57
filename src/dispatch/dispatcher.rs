//! Dispatcher - drives one item from ready to claimed and records the dispatch

use std::sync::Arc;

use sha2::{Digest, Sha256};

use crate::clock::MonotonicClock;
use crate::domain::{DispatchRecord, ItemKind, LogRecord, Role, WorkItem, labels};
use crate::error::{FactoryError, Result};
use crate::profile::{BehaviorRegistry, compose_issue_assignment, compose_review_assignment};
use crate::storage::{MemoryDir, OutcomeLog, write_atomic};
use crate::tracker::Tracker;

/// Comment posted when an issue is claimed
pub const DEFAULT_CLAIM_COMMENT: &str = "🤖 Claimed by factory worker. Starting work...";

/// Knobs for how dispatches claim and describe work
#[derive(Debug, Clone)]
pub struct DispatchOptions {
    /// Repository named in issue assignments
    pub repo: Option<String>,
    /// Fail with `AlreadyClaimed` instead of skipping the claim
    pub strict_claim: bool,
    pub claim_comment: String,
}

impl Default for DispatchOptions {
    fn default() -> Self {
        Self {
            repo: None,
            strict_claim: false,
            claim_comment: DEFAULT_CLAIM_COMMENT.to_string(),
        }
    }
}

/// Claims items, writes assignments and logs dispatches
pub struct Dispatcher {
    tracker: Arc<dyn Tracker>,
    registry: BehaviorRegistry,
    memory: MemoryDir,
    log: OutcomeLog,
    clock: MonotonicClock,
    options: DispatchOptions,
}

impl Dispatcher {
    pub fn new(tracker: Arc<dyn Tracker>, registry: BehaviorRegistry, memory: MemoryDir) -> Self {
        let log = memory.dispatch_log();
        Self {
            tracker,
            registry,
            memory,
            log,
            clock: MonotonicClock::new(),
            options: DispatchOptions::default(),
        }
    }

    pub fn with_options(mut self, options: DispatchOptions) -> Self {
        self.options = options;
        self
    }

    /// Dispatch an item to a role
    ///
    /// The item is fetched as a review request when `review_flow` is set or the
    /// role is `reviewer`; otherwise it is fetched as an issue and claimed.
    /// Nothing is appended to the dispatch log unless every step succeeds.
    pub async fn dispatch(&self, item_id: u64, role: &str, review_flow: bool) -> Result<DispatchRecord> {
        let (role, profile) = self.registry.resolve_name(role)?;

        let review_flow = review_flow || role == Role::Reviewer;
        let kind = if review_flow {
            ItemKind::ReviewRequest
        } else {
            ItemKind::Issue
        };

        let item = self.tracker.get_item(item_id, kind).await?;
        tracing::debug!(item = item_id, kind = %kind, title = %item.title, "Fetched item");

        let assignment = if review_flow {
            compose_review_assignment(&item, role, &profile)
        } else {
            self.claim(&item).await?;
            compose_issue_assignment(&item, role, &profile, self.options.repo.as_deref())
        };

        let prompt_file = self.memory.assignment_path(item_id, role);
        write_atomic(&prompt_file, &assignment)?;

        let record = DispatchRecord {
            timestamp: self.clock.now(),
            item: item_id,
            role,
            prompt_file,
            prompt_sha256: Some(digest(&assignment)),
        };
        self.log.append(&LogRecord::Dispatch(record.clone()))?;

        tracing::info!(item = item_id, role = %role, review = review_flow, "Dispatched");
        Ok(record)
    }

    /// Move an issue to in-progress unless it already is
    async fn claim(&self, item: &WorkItem) -> Result<()> {
        if item.has_label(labels::IN_PROGRESS) {
            if self.options.strict_claim {
                tracing::warn!(item = item.id, "Refusing to re-claim in-progress item");
                return Err(FactoryError::AlreadyClaimed(item.id));
            }
            tracing::info!(item = item.id, "Item already in progress, skipping claim");
            return Ok(());
        }

        self.tracker
            .set_labels(item.id, item.kind, &[labels::IN_PROGRESS], &[labels::READY])
            .await?;
        self.tracker
            .post_comment(item.id, item.kind, &self.options.claim_comment)
            .await?;
        tracing::info!(item = item.id, "Claimed");
        Ok(())
    }
}

fn digest(text: &str) -> String {
    hex::encode(Sha256::digest(text.as_bytes()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ReviewMetrics;
    use crate::tracker::{InMemoryTracker, TrackerCall};
    use std::fs;
    use tempfile::TempDir;

    struct Fixture {
        _temp: TempDir,
        tracker: Arc<InMemoryTracker>,
        memory: MemoryDir,
        dispatcher: Dispatcher,
    }

    fn fixture(roles: &[Role], items: Vec<WorkItem>) -> Fixture {
        let temp = TempDir::new().unwrap();
        let profiles = temp.path().join("profiles");
        fs::create_dir_all(&profiles).unwrap();
        for role in roles {
            fs::write(profiles.join(format!("hat-{}.md", role)), format!("{} instructions", role)).unwrap();
        }

        let tracker = Arc::new(InMemoryTracker::with_items(items));
        let memory = MemoryDir::new(temp.path().join("memory"));
        let dispatcher = Dispatcher::new(tracker.clone(), BehaviorRegistry::new(&profiles), memory.clone());
        Fixture {
            _temp: temp,
            tracker,
            memory,
            dispatcher,
        }
    }

    fn logged(memory: &MemoryDir) -> Vec<LogRecord> {
        memory.dispatch_log().read_all().unwrap().collect()
    }

    #[tokio::test]
    async fn test_dispatch_claims_ready_issue() {
        let f = fixture(&[Role::Coder], vec![WorkItem::issue(42, "Add login", "body").with_label(labels::READY)]);

        let record = f.dispatcher.dispatch(42, "coder", false).await.unwrap();
        assert_eq!(record.item, 42);
        assert_eq!(record.role, Role::Coder);

        let item = f.tracker.item(42, ItemKind::Issue).unwrap();
        assert!(item.has_label(labels::IN_PROGRESS));
        assert!(!item.has_label(labels::READY));
        assert_eq!(f.tracker.comments(42), vec![DEFAULT_CLAIM_COMMENT]);
        assert_eq!(logged(&f.memory), vec![LogRecord::Dispatch(record)]);
    }

    #[tokio::test]
    async fn test_dispatch_writes_assignment_with_digest() {
        let f = fixture(&[Role::Coder], vec![WorkItem::issue(3, "t", "b")]);

        let record = f.dispatcher.dispatch(3, "coder", false).await.unwrap();
        assert_eq!(record.prompt_file, f.memory.assignment_path(3, Role::Coder));

        let text = fs::read_to_string(&record.prompt_file).unwrap();
        assert!(text.contains("coder instructions"));
        assert_eq!(record.prompt_sha256.as_deref(), Some(digest(&text).as_str()));
    }

    #[tokio::test]
    async fn test_invalid_role_touches_nothing() {
        let f = fixture(&[Role::Coder], vec![WorkItem::issue(1, "t", "b")]);

        let err = f.dispatcher.dispatch(1, "wizard", false).await.unwrap_err();
        assert!(matches!(err, FactoryError::InvalidRole(_)));
        assert!(f.tracker.calls().is_empty());
        assert!(logged(&f.memory).is_empty());
    }

    #[tokio::test]
    async fn test_missing_profile_is_unknown_role() {
        let f = fixture(&[Role::Coder], vec![WorkItem::issue(7, "t", "b").with_label(labels::READY)]);

        let err = f.dispatcher.dispatch(7, "qa", false).await.unwrap_err();
        assert!(matches!(err, FactoryError::UnknownRole(Role::Qa)));
        assert!(f.tracker.calls().is_empty());
        assert!(logged(&f.memory).is_empty());
    }

    #[tokio::test]
    async fn test_missing_item() {
        let f = fixture(&[Role::Coder], vec![]);

        let err = f.dispatcher.dispatch(404, "coder", false).await.unwrap_err();
        assert!(matches!(err, FactoryError::ItemNotFound(404)));
        assert!(logged(&f.memory).is_empty());
    }

    #[tokio::test]
    async fn test_backend_unavailable() {
        let f = fixture(&[Role::Coder], vec![WorkItem::issue(1, "t", "b")]);
        f.tracker.set_unavailable(true);

        let err = f.dispatcher.dispatch(1, "coder", false).await.unwrap_err();
        assert!(matches!(err, FactoryError::BackendUnavailable(_)));
        assert!(logged(&f.memory).is_empty());
    }

    #[tokio::test]
    async fn test_reviewer_uses_review_flow_without_claim() {
        let metrics = ReviewMetrics {
            additions: 5,
            deletions: 1,
            files: vec!["src/lib.rs".to_string()],
        };
        let f = fixture(
            &[Role::Reviewer],
            vec![WorkItem::review_request(15, "Fix parser", "desc", metrics)],
        );

        let record = f.dispatcher.dispatch(15, "reviewer", false).await.unwrap();
        assert!(f.tracker.calls().is_empty());

        let text = fs::read_to_string(&record.prompt_file).unwrap();
        assert!(text.contains("Review PR #15: Fix parser"));
        assert!(text.contains("+5 -1"));
    }

    #[tokio::test]
    async fn test_review_flag_fetches_review_request() {
        let f = fixture(
            &[Role::Security],
            vec![WorkItem::review_request(8, "Bump deps", "", ReviewMetrics::default())],
        );

        let record = f.dispatcher.dispatch(8, "security", true).await.unwrap();
        assert_eq!(record.role, Role::Security);
        assert!(f.tracker.calls().is_empty());
    }

    #[tokio::test]
    async fn test_redispatch_in_progress_skips_claim() {
        let f = fixture(&[Role::Coder], vec![WorkItem::issue(5, "t", "b").with_label(labels::READY)]);

        f.dispatcher.dispatch(5, "coder", false).await.unwrap();
        f.dispatcher.dispatch(5, "coder", false).await.unwrap();

        assert_eq!(f.tracker.comments(5).len(), 1);
        let label_calls = f
            .tracker
            .calls()
            .into_iter()
            .filter(|c| matches!(c, TrackerCall::SetLabels { .. }))
            .count();
        assert_eq!(label_calls, 1);
        assert_eq!(logged(&f.memory).len(), 2);
    }

    #[tokio::test]
    async fn test_strict_claim_rejects_in_progress() {
        let mut f = fixture(&[Role::Coder], vec![WorkItem::issue(5, "t", "b").with_label(labels::IN_PROGRESS)]);
        f.dispatcher = f.dispatcher.with_options(DispatchOptions {
            strict_claim: true,
            ..DispatchOptions::default()
        });

        let err = f.dispatcher.dispatch(5, "coder", false).await.unwrap_err();
        assert!(matches!(err, FactoryError::AlreadyClaimed(5)));
        assert!(f.tracker.calls().is_empty());
        assert!(logged(&f.memory).is_empty());
        assert!(!f.memory.assignment_path(5, Role::Coder).exists());
    }

    #[tokio::test]
    async fn test_timestamps_non_decreasing() {
        let f = fixture(&[Role::Coder], vec![WorkItem::issue(1, "t", "b"), WorkItem::issue(2, "t", "b")]);

        let first = f.dispatcher.dispatch(1, "coder", false).await.unwrap();
        let second = f.dispatcher.dispatch(2, "coder", false).await.unwrap();
        assert!(second.timestamp >= first.timestamp);
    }
}
