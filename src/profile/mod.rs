//! Behavior profiles and assignment documents
//!
//! This module provides functionality for resolving role profiles from disk
//! and composing the assignment a worker receives for one dispatch.

mod assignment;
mod registry;

pub use assignment::{compose_issue_assignment, compose_review_assignment};
pub use registry::{BehaviorRegistry, CHECKLIST_HEADING};
