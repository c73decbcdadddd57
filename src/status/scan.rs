//! Scan for work waiting to be picked up

use crate::domain::{ItemFilter, ItemKind, WorkItem, labels};
use crate::error::Result;
use crate::tracker::Tracker;

#[derive(Debug, Clone, Default)]
pub struct ScanResult {
    /// Open issues labeled `ready`
    pub ready: Vec<WorkItem>,
    /// Open review requests labeled `review`
    pub reviews: Vec<WorkItem>,
}

impl ScanResult {
    pub fn actionable(&self) -> usize {
        self.ready.len() + self.reviews.len()
    }
}

pub async fn scan(tracker: &dyn Tracker) -> Result<ScanResult> {
    let ready = ItemFilter::labeled(ItemKind::Issue, labels::READY);
    let reviews = ItemFilter::labeled(ItemKind::ReviewRequest, labels::REVIEW);
    let (ready, reviews) = futures::try_join!(tracker.list_items(&ready), tracker.list_items(&reviews))?;
    Ok(ScanResult { ready, reviews })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{ItemState, ReviewMetrics};
    use crate::tracker::InMemoryTracker;

    #[tokio::test]
    async fn test_scan() {
        let tracker = InMemoryTracker::with_items([
            WorkItem::issue(1, "a", "").with_label(labels::READY),
            WorkItem::issue(2, "b", "").with_label(labels::READY).with_state(ItemState::Closed),
            WorkItem::issue(3, "c", "").with_label(labels::BLOCKED),
            WorkItem::review_request(4, "d", "", ReviewMetrics::default()).with_label(labels::REVIEW),
            WorkItem::review_request(5, "e", "", ReviewMetrics::default()),
        ]);

        let result = scan(&tracker).await.unwrap();
        assert_eq!(result.ready.iter().map(|i| i.id).collect::<Vec<_>>(), vec![1]);
        assert_eq!(result.reviews.iter().map(|i| i.id).collect::<Vec<_>>(), vec![4]);
        assert_eq!(result.actionable(), 2);
    }

    #[tokio::test]
    async fn test_scan_nothing_actionable() {
        let result = scan(&InMemoryTracker::new()).await.unwrap();
        assert_eq!(result.actionable(), 0);
    }
}
