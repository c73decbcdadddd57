//! Domain types for the factory
//!
//! This module contains the core domain types:
//! - Role: the fixed set of worker roles
//! - WorkItem: tracker snapshots of issues and review requests
//! - DispatchRecord / OutcomeRecord / RetrospectiveRunRecord: log records

pub mod item;
pub mod record;
pub mod role;

pub use item::{ItemFilter, ItemKind, ItemState, ReviewMetrics, WorkItem, labels};
pub use record::{
    DispatchRecord, LogRecord, OutcomeRecord, OutcomeResult, RetrospectiveRunRecord, sort_by_timestamp,
};
pub use role::Role;
