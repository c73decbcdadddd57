//! Storage layer - append-only JSONL logs and durable artifacts.
//!
//! Everything is rooted in an injected [`MemoryDir`]:
//! - `dispatches.jsonl`: one [`DispatchRecord`](crate::domain::DispatchRecord) per dispatch
//! - `outcomes.jsonl`: externally reported [`OutcomeRecord`](crate::domain::OutcomeRecord)s
//! - `retrospective-log.jsonl`: one entry per retrospective run
//! - `dispatch-<item>-<role>.md` and `improvements.md`: generated documents

mod jsonl;
mod memory_dir;

pub use jsonl::{JsonlLog, Records};
pub use memory_dir::{MemoryDir, OutcomeLog, RunHistoryLog, write_atomic};
