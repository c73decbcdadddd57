//! Error types for the factory
//!
//! Centralized error handling using thiserror.

use thiserror::Error;

use crate::domain::Role;
use crate::tracker::TrackerError;

/// All error types that can occur in the factory core
#[derive(Debug, Error)]
pub enum FactoryError {
    /// Role name is not one of the fixed roles
    #[error("Invalid role: {0}")]
    InvalidRole(String),

    /// Role is valid but its behavior profile cannot be located
    #[error("Unknown role: no behavior profile for '{0}'")]
    UnknownRole(Role),

    /// Tracker has no item with this id
    #[error("Item not found: #{0}")]
    ItemNotFound(u64),

    /// Item is already labeled in-progress (strict claiming only)
    #[error("Item already claimed: #{0}")]
    AlreadyClaimed(u64),

    /// Tracker transport failure or timeout
    #[error("Backend unavailable: {0}")]
    BackendUnavailable(String),

    /// Storage/persistence error
    #[error("Storage error: {0}")]
    Storage(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl From<TrackerError> for FactoryError {
    fn from(err: TrackerError) -> Self {
        match err {
            TrackerError::NotFound { id, .. } => FactoryError::ItemNotFound(id),
            TrackerError::BackendUnavailable(msg) => FactoryError::BackendUnavailable(msg),
        }
    }
}

/// Result type alias for factory operations
pub type Result<T> = std::result::Result<T, FactoryError>;
