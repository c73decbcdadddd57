//! Factory - role-based dispatch of tracked work items
//!
//! Claims issues and review requests from a tracker, hands each one to a
//! worker role with an assignment document, records every dispatch and
//! outcome in append-only logs, and mines those logs for process
//! improvements.

pub mod clock;
pub mod dispatch;
pub mod domain;
pub mod error;
pub mod profile;
pub mod retrospective;
pub mod status;
pub mod storage;
pub mod tracker;

pub use dispatch::{DispatchOptions, Dispatcher};
pub use error::{FactoryError, Result};
pub use tracker::{InMemoryTracker, Tracker, TrackerError};
