//! Work item snapshots fetched from the tracker.

use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Label constants used as state tags on tracker items
pub mod labels {
    pub const READY: &str = "ready";
    pub const IN_PROGRESS: &str = "in-progress";
    pub const BLOCKED: &str = "blocked";
    pub const REVIEW: &str = "review";
}

/// Shape of a tracked item
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ItemKind {
    Issue,
    ReviewRequest,
}

impl fmt::Display for ItemKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ItemKind::Issue => f.write_str("issue"),
            ItemKind::ReviewRequest => f.write_str("review-request"),
        }
    }
}

/// Lifecycle state reported by the tracker
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ItemState {
    Open,
    Closed,
    Merged,
}

impl ItemState {
    pub fn as_str(&self) -> &'static str {
        match self {
            ItemState::Open => "open",
            ItemState::Closed => "closed",
            ItemState::Merged => "merged",
        }
    }

    /// Parse a tracker state string ("OPEN", "closed", ...)
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_ascii_lowercase().as_str() {
            "open" => Some(ItemState::Open),
            "closed" => Some(ItemState::Closed),
            "merged" => Some(ItemState::Merged),
            _ => None,
        }
    }
}

/// Size metrics carried by review requests
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReviewMetrics {
    /// Lines added
    pub additions: u64,
    /// Lines removed
    pub deletions: u64,
    /// Changed file paths
    pub files: Vec<String>,
}

/// Read-only snapshot of an issue or review request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkItem {
    pub id: u64,
    pub kind: ItemKind,
    pub title: String,
    pub body: String,
    pub labels: BTreeSet<String>,
    pub state: ItemState,
    pub url: Option<String>,
    /// Present for review requests only
    pub review: Option<ReviewMetrics>,
}

impl WorkItem {
    /// Create an open issue
    pub fn issue(id: u64, title: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            id,
            kind: ItemKind::Issue,
            title: title.into(),
            body: body.into(),
            labels: BTreeSet::new(),
            state: ItemState::Open,
            url: None,
            review: None,
        }
    }

    /// Create an open review request
    pub fn review_request(id: u64, title: impl Into<String>, body: impl Into<String>, metrics: ReviewMetrics) -> Self {
        Self {
            id,
            kind: ItemKind::ReviewRequest,
            title: title.into(),
            body: body.into(),
            labels: BTreeSet::new(),
            state: ItemState::Open,
            url: None,
            review: Some(metrics),
        }
    }

    /// Builder: add a label
    pub fn with_label(mut self, label: &str) -> Self {
        self.labels.insert(label.to_string());
        self
    }

    /// Builder: set the state
    pub fn with_state(mut self, state: ItemState) -> Self {
        self.state = state;
        self
    }

    /// Builder: set the URL
    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = Some(url.into());
        self
    }

    pub fn has_label(&self, label: &str) -> bool {
        self.labels.contains(label)
    }
}

/// Query for listing items
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ItemFilter {
    pub kind: ItemKind,
    /// Every label listed must be present
    pub labels: Vec<String>,
    /// None matches any state
    pub state: Option<ItemState>,
    pub limit: Option<usize>,
}

impl ItemFilter {
    /// Open items of the given kind
    pub fn open(kind: ItemKind) -> Self {
        Self {
            kind,
            labels: Vec::new(),
            state: Some(ItemState::Open),
            limit: None,
        }
    }

    /// Open items of the given kind carrying a label
    pub fn labeled(kind: ItemKind, label: &str) -> Self {
        Self::open(kind).with_label(label)
    }

    /// Items of the given kind in the given state
    pub fn in_state(kind: ItemKind, state: ItemState) -> Self {
        Self {
            state: Some(state),
            ..Self::open(kind)
        }
    }

    pub fn with_label(mut self, label: &str) -> Self {
        self.labels.push(label.to_string());
        self
    }

    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Whether an item satisfies this filter (limit is not considered)
    pub fn matches(&self, item: &WorkItem) -> bool {
        item.kind == self.kind
            && self.state.is_none_or(|state| item.state == state)
            && self.labels.iter().all(|label| item.has_label(label))
    }
}
