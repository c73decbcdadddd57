//! Tracker gateway - the narrow interface to the external issue/PR backend
//!
//! This module provides:
//! - Tracker trait for backend abstraction
//! - GhCliTracker, backed by the GitHub CLI
//! - InMemoryTracker, a seeded in-process backend that records mutations
//!
//! Implementations hold no cache: every call reflects backend state at call
//! time, and nothing here retries.

pub mod gh;
pub mod memory;

use async_trait::async_trait;

use crate::domain::{ItemFilter, ItemKind, WorkItem};

pub use gh::{DEFAULT_LIST_LIMIT, GhCliConfig, GhCliTracker};
pub use memory::{InMemoryTracker, TrackerCall};

/// Stateless request/response access to the tracker
#[async_trait]
pub trait Tracker: Send + Sync {
    /// List items matching the filter
    async fn list_items(&self, filter: &ItemFilter) -> Result<Vec<WorkItem>, TrackerError>;

    /// Fetch a single item in the requested shape
    async fn get_item(&self, id: u64, kind: ItemKind) -> Result<WorkItem, TrackerError>;

    /// Add and remove labels in one mutation.
    ///
    /// Failures after a successful lookup are reported as BackendUnavailable.
    async fn set_labels(&self, id: u64, kind: ItemKind, add: &[&str], remove: &[&str]) -> Result<(), TrackerError>;

    /// Post a comment on an item
    async fn post_comment(&self, id: u64, kind: ItemKind, text: &str) -> Result<(), TrackerError>;
}

/// Errors reported by a tracker backend
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TrackerError {
    #[error("{kind} #{id} not found")]
    NotFound { id: u64, kind: ItemKind },

    #[error("Tracker unavailable: {0}")]
    BackendUnavailable(String),
}

impl TrackerError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, TrackerError::NotFound { .. })
    }
}
