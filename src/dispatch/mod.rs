//! Dispatch lifecycle
//!
//! Moves a tracked item from `ready` to `in-progress`, hands the worker an
//! assignment document and records the dispatch in the append-only log.

mod dispatcher;

pub use dispatcher::{DEFAULT_CLAIM_COMMENT, DispatchOptions, Dispatcher};
