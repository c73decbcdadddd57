//! Retrospective integration tests
//!
//! Runs the full retrospective against seeded outcome logs and checks the
//! report, the run history and profile updates.

use std::fs;
use std::sync::Arc;

use factory::domain::{ItemState, OutcomeRecord, Role, WorkItem};
use factory::profile::BehaviorRegistry;
use factory::retrospective::{Evidence, ProposalCategory, RetrospectiveEngine};
use factory::storage::MemoryDir;
use factory::tracker::InMemoryTracker;
use factory::FactoryError;
use tempfile::TempDir;

struct Setup {
    temp: TempDir,
    tracker: Arc<InMemoryTracker>,
}

impl Setup {
    fn new() -> Self {
        let temp = TempDir::new().unwrap();
        fs::create_dir_all(temp.path().join("references")).unwrap();
        Self {
            temp,
            tracker: Arc::new(InMemoryTracker::new()),
        }
    }

    fn memory(&self) -> MemoryDir {
        MemoryDir::new(self.temp.path().join("memory"))
    }

    fn registry(&self) -> BehaviorRegistry {
        BehaviorRegistry::new(self.temp.path().join("references"))
    }

    fn profile(&self, role: Role) -> std::path::PathBuf {
        self.registry().profile_path(role)
    }

    fn engine(&self) -> RetrospectiveEngine {
        RetrospectiveEngine::new(self.tracker.clone(), self.registry(), self.memory())
    }

    fn record(&self, outcome: OutcomeRecord) {
        self.memory().outcome_log().append(&outcome.into()).unwrap();
    }
}

#[tokio::test]
async fn test_repeated_rejection_and_low_success_rate() {
    let setup = Setup::new();
    setup.record(OutcomeRecord::rejected(Role::Coder, "missing tests"));
    setup.record(OutcomeRecord::rejected(Role::Coder, "missing tests"));
    setup.record(OutcomeRecord::new("merged", Role::Coder));

    let summary = setup.engine().run(false).await.unwrap();
    assert_eq!(summary.tasks_analyzed, 3);
    assert_eq!(summary.proposals.len(), 2);

    let pattern = &summary.proposals[0];
    assert_eq!(pattern.category, ProposalCategory::Pattern);
    assert_eq!(pattern.problem, "Repeated rejection: missing tests");
    assert_eq!(pattern.evidence, Evidence::Occurrences(2));

    let metric = &summary.proposals[1];
    assert_eq!(metric.category, ProposalCategory::Metric);
    assert_eq!(metric.problem, "Low success rate: 33.3%");

    let report = fs::read_to_string(setup.memory().report_path()).unwrap();
    assert!(report.contains("### 1. Repeated rejection: missing tests"));
    assert!(report.contains("### 2. Low success rate: 33.3%"));
}

#[tokio::test]
async fn test_empty_history() {
    let setup = Setup::new();

    let summary = setup.engine().run(false).await.unwrap();
    assert_eq!(summary.tasks_analyzed, 0);
    assert!(summary.proposals.is_empty());

    let report = fs::read_to_string(&summary.report_path).unwrap();
    assert!(report.contains("- Total tasks analyzed: 0"));
    assert!(report.contains("No significant patterns identified."));
}

#[tokio::test]
async fn test_each_run_is_recorded() {
    let setup = Setup::new();
    setup.record(OutcomeRecord::new("merged", Role::Docs));

    setup.engine().run(false).await.unwrap();
    setup.engine().run(false).await.unwrap();

    let runs: Vec<_> = setup.memory().run_history().read_all().unwrap().collect();
    assert_eq!(runs.len(), 2);
    assert!(runs.iter().all(|r| r.tasks_analyzed == 1 && r.improvements_proposed == 0));
    assert!(runs[1].timestamp >= runs[0].timestamp);
}

#[tokio::test]
async fn test_tracker_activity_in_report() {
    let setup = Setup::new();
    setup.tracker.insert(WorkItem::issue(1, "done", "").with_state(ItemState::Closed));
    setup.tracker.insert(WorkItem::issue(2, "done too", "").with_state(ItemState::Closed));
    setup
        .tracker
        .insert(WorkItem::review_request(3, "pr", "", Default::default()).with_state(ItemState::Merged));

    let summary = setup.engine().with_recent_limit(1).run(false).await.unwrap();
    assert_eq!(summary.activity.closed_issues, 1);
    assert_eq!(summary.activity.merged_reviews, 1);

    let report = fs::read_to_string(&summary.report_path).unwrap();
    assert!(report.contains("- Closed issues: 1"));
    assert!(report.contains("- Merged review requests: 1"));
}

#[tokio::test]
async fn test_apply_adds_checklist_item_once() {
    let setup = Setup::new();
    fs::write(setup.profile(Role::Coder), "# Coder\n\nShip it.\n").unwrap();
    setup.record(OutcomeRecord::rejected(Role::Coder, "missing tests"));
    setup.record(OutcomeRecord::rejected(Role::Coder, "missing tests"));

    let first = setup.engine().run(true).await.unwrap();
    assert_eq!(first.applied.len(), 1);
    assert_eq!(first.applied[0].role, Role::Coder);
    let after_first = fs::read_to_string(setup.profile(Role::Coder)).unwrap();
    assert!(after_first.contains("## Retrospective Checklist\n\n- [ ] missing tests\n"));

    let second = setup.engine().run(true).await.unwrap();
    assert!(second.applied.is_empty());
    assert_eq!(fs::read_to_string(setup.profile(Role::Coder)).unwrap(), after_first);
}

#[tokio::test]
async fn test_apply_multiline_reason_once() {
    let setup = Setup::new();
    fs::write(setup.profile(Role::Qa), "# QA\n").unwrap();
    setup.record(OutcomeRecord::rejected(Role::Qa, "no tests\nfor login"));
    setup.record(OutcomeRecord::rejected(Role::Qa, "no tests\nfor login"));

    let first = setup.engine().run(true).await.unwrap();
    assert_eq!(first.applied.len(), 1);
    let after_first = fs::read_to_string(setup.profile(Role::Qa)).unwrap();
    assert!(after_first.contains("- [ ] no tests for login\n"));

    let second = setup.engine().run(true).await.unwrap();
    assert!(second.applied.is_empty());
    assert_eq!(fs::read_to_string(setup.profile(Role::Qa)).unwrap(), after_first);
}

#[tokio::test]
async fn test_apply_skips_roles_without_profile() {
    let setup = Setup::new();
    setup.record(OutcomeRecord::rejected(Role::Security, "leaked secret"));
    setup.record(OutcomeRecord::rejected(Role::Security, "leaked secret"));

    let summary = setup.engine().run(true).await.unwrap();
    assert!(summary.applied.is_empty());
    assert!(!setup.profile(Role::Security).exists());
}

#[tokio::test]
async fn test_without_apply_profiles_untouched() {
    let setup = Setup::new();
    fs::write(setup.profile(Role::Qa), "# QA\n").unwrap();
    setup.record(OutcomeRecord::rejected(Role::Qa, "flaky"));
    setup.record(OutcomeRecord::rejected(Role::Qa, "flaky"));

    setup.engine().run(false).await.unwrap();
    assert_eq!(fs::read_to_string(setup.profile(Role::Qa)).unwrap(), "# QA\n");
}

#[tokio::test]
async fn test_failed_run_keeps_previous_report() {
    let setup = Setup::new();
    setup.record(OutcomeRecord::new("merged", Role::Coder));
    setup.engine().run(false).await.unwrap();
    let previous = fs::read_to_string(setup.memory().report_path()).unwrap();

    setup.record(OutcomeRecord::rejected(Role::Coder, "broke the build"));
    setup.tracker.set_unavailable(true);
    let err = setup.engine().run(false).await.unwrap_err();
    assert!(matches!(err, FactoryError::BackendUnavailable(_)));

    assert_eq!(fs::read_to_string(setup.memory().report_path()).unwrap(), previous);
    let runs: Vec<_> = setup.memory().run_history().read_all().unwrap().collect();
    assert_eq!(runs.len(), 1);
}
