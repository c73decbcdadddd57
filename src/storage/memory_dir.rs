//! The memory directory: where logs and generated artifacts live.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;

use super::jsonl::JsonlLog;
use crate::domain::{LogRecord, RetrospectiveRunRecord, Role};
use crate::error::{FactoryError, Result};

const DISPATCH_LOG: &str = "dispatches.jsonl";
const OUTCOME_LOG: &str = "outcomes.jsonl";
const RUN_HISTORY_LOG: &str = "retrospective-log.jsonl";
const REPORT_FILE: &str = "improvements.md";

/// Log of dispatch and outcome records
pub type OutcomeLog = JsonlLog<LogRecord>;

/// Log of retrospective runs
pub type RunHistoryLog = JsonlLog<RetrospectiveRunRecord>;

/// Storage handle passed to every component that persists something
#[derive(Debug, Clone)]
pub struct MemoryDir {
    root: PathBuf,
}

impl MemoryDir {
    pub fn new(root: impl AsRef<Path>) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
        }
    }

    /// Dispatch records, one per successful dispatch
    pub fn dispatch_log(&self) -> OutcomeLog {
        JsonlLog::new(self.root.join(DISPATCH_LOG))
    }

    /// Outcome records reported after work concludes
    pub fn outcome_log(&self) -> OutcomeLog {
        JsonlLog::new(self.root.join(OUTCOME_LOG))
    }

    pub fn run_history(&self) -> RunHistoryLog {
        JsonlLog::new(self.root.join(RUN_HISTORY_LOG))
    }

    /// Assignment document location, addressed by item and role
    pub fn assignment_path(&self, item: u64, role: Role) -> PathBuf {
        self.root.join(format!("dispatch-{}-{}.md", item, role))
    }

    pub fn report_path(&self) -> PathBuf {
        self.root.join(REPORT_FILE)
    }
}

/// Replace `path` with `contents` so readers see either the old file or the
/// complete new one, never a partial write.
pub fn write_atomic(path: &Path, contents: &str) -> Result<()> {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    fs::create_dir_all(dir)?;

    let mut tmp = NamedTempFile::new_in(dir)?;
    tmp.write_all(contents.as_bytes())?;
    tmp.as_file().sync_all()?;
    tmp.persist(path).map_err(|e| FactoryError::Io(e.error))?;
    Ok(())
}
