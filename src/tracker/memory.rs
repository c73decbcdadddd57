//! In-process tracker backend.
//!
//! Holds a seeded set of items, applies label mutations to them and records
//! every mutating call so callers can check exactly what was sent.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;

use super::{Tracker, TrackerError};
use crate::domain::{ItemFilter, ItemKind, WorkItem};

/// A mutating call received by the tracker
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TrackerCall {
    SetLabels {
        id: u64,
        kind: ItemKind,
        add: Vec<String>,
        remove: Vec<String>,
    },
    Comment {
        id: u64,
        kind: ItemKind,
        text: String,
    },
}

/// Tracker that keeps its items in memory
#[derive(Debug, Default)]
pub struct InMemoryTracker {
    items: Mutex<BTreeMap<(ItemKind, u64), WorkItem>>,
    calls: Mutex<Vec<TrackerCall>>,
    unavailable: AtomicBool,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|e| e.into_inner())
}

impl InMemoryTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a tracker seeded with items
    pub fn with_items(items: impl IntoIterator<Item = WorkItem>) -> Self {
        let tracker = Self::new();
        for item in items {
            tracker.insert(item);
        }
        tracker
    }

    /// Insert or replace an item
    pub fn insert(&self, item: WorkItem) {
        lock(&self.items).insert((item.kind, item.id), item);
    }

    /// Current state of an item
    pub fn item(&self, id: u64, kind: ItemKind) -> Option<WorkItem> {
        lock(&self.items).get(&(kind, id)).cloned()
    }

    /// Every mutating call received, in order
    pub fn calls(&self) -> Vec<TrackerCall> {
        lock(&self.calls).clone()
    }

    /// Comments posted on an item, in order
    pub fn comments(&self, id: u64) -> Vec<String> {
        lock(&self.calls)
            .iter()
            .filter_map(|call| match call {
                TrackerCall::Comment { id: cid, text, .. } if *cid == id => Some(text.clone()),
                _ => None,
            })
            .collect()
    }

    /// Make every subsequent call fail with `BackendUnavailable`
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    fn check_available(&self) -> Result<(), TrackerError> {
        if self.unavailable.load(Ordering::SeqCst) {
            Err(TrackerError::BackendUnavailable("in-memory tracker offline".to_string()))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl Tracker for InMemoryTracker {
    async fn list_items(&self, filter: &ItemFilter) -> Result<Vec<WorkItem>, TrackerError> {
        self.check_available()?;
        let items = lock(&self.items);
        let matching = items.values().filter(|item| filter.matches(item)).cloned();
        Ok(match filter.limit {
            Some(limit) => matching.take(limit).collect(),
            None => matching.collect(),
        })
    }

    async fn get_item(&self, id: u64, kind: ItemKind) -> Result<WorkItem, TrackerError> {
        self.check_available()?;
        self.item(id, kind).ok_or(TrackerError::NotFound { id, kind })
    }

    async fn set_labels(&self, id: u64, kind: ItemKind, add: &[&str], remove: &[&str]) -> Result<(), TrackerError> {
        self.check_available()?;
        {
            let mut items = lock(&self.items);
            let item = items.get_mut(&(kind, id)).ok_or(TrackerError::NotFound { id, kind })?;
            for label in remove {
                item.labels.remove(*label);
            }
            for label in add {
                item.labels.insert(label.to_string());
            }
        }
        lock(&self.calls).push(TrackerCall::SetLabels {
            id,
            kind,
            add: add.iter().map(|s| s.to_string()).collect(),
            remove: remove.iter().map(|s| s.to_string()).collect(),
        });
        Ok(())
    }

    async fn post_comment(&self, id: u64, kind: ItemKind, text: &str) -> Result<(), TrackerError> {
        self.check_available()?;
        if self.item(id, kind).is_none() {
            return Err(TrackerError::NotFound { id, kind });
        }
        lock(&self.calls).push(TrackerCall::Comment {
            id,
            kind,
            text: text.to_string(),
        });
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{ItemState, ReviewMetrics, labels};

    fn seeded() -> InMemoryTracker {
        InMemoryTracker::with_items([
            WorkItem::issue(1, "first", "").with_label(labels::READY),
            WorkItem::issue(2, "second", "").with_label(labels::BLOCKED),
            WorkItem::issue(3, "third", "").with_label(labels::READY),
            WorkItem::review_request(1, "pr", "", ReviewMetrics::default()).with_state(ItemState::Merged),
        ])
    }

    #[tokio::test]
    async fn test_list_by_label() {
        let tracker = seeded();
        let ready = tracker
            .list_items(&ItemFilter::labeled(ItemKind::Issue, labels::READY))
            .await
            .unwrap();
        assert_eq!(ready.iter().map(|i| i.id).collect::<Vec<_>>(), vec![1, 3]);
    }

    #[tokio::test]
    async fn test_list_respects_limit() {
        let tracker = seeded();
        let items = tracker
            .list_items(&ItemFilter::open(ItemKind::Issue).with_limit(2))
            .await
            .unwrap();
        assert_eq!(items.len(), 2);
    }

    #[tokio::test]
    async fn test_kinds_are_separate() {
        let tracker = seeded();
        let issue = tracker.get_item(1, ItemKind::Issue).await.unwrap();
        let review = tracker.get_item(1, ItemKind::ReviewRequest).await.unwrap();
        assert_eq!(issue.title, "first");
        assert_eq!(review.title, "pr");
    }

    #[tokio::test]
    async fn test_get_missing_item() {
        let tracker = seeded();
        let err = tracker.get_item(99, ItemKind::Issue).await.unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn test_set_labels_mutates_and_records() {
        let tracker = seeded();
        tracker
            .set_labels(1, ItemKind::Issue, &[labels::IN_PROGRESS], &[labels::READY])
            .await
            .unwrap();

        let item = tracker.item(1, ItemKind::Issue).unwrap();
        assert!(item.has_label(labels::IN_PROGRESS));
        assert!(!item.has_label(labels::READY));
        assert_eq!(tracker.calls().len(), 1);
    }

    #[tokio::test]
    async fn test_comments_are_recorded() {
        let tracker = seeded();
        tracker.post_comment(3, ItemKind::Issue, "hi").await.unwrap();
        assert_eq!(tracker.comments(3), vec!["hi"]);
        assert!(tracker.comments(1).is_empty());
    }

    #[tokio::test]
    async fn test_unavailable() {
        let tracker = seeded();
        tracker.set_unavailable(true);
        let err = tracker.get_item(1, ItemKind::Issue).await.unwrap_err();
        assert!(matches!(err, TrackerError::BackendUnavailable(_)));
        assert!(tracker.calls().is_empty());
    }
}
