//! Records written to the append-only logs.
//!
//! Every record is self-describing: its kind is decided by which fields a line
//! carries, not by a tag or an index.

use std::fmt;
use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use super::role::Role;

/// One dispatch of an item to a role
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DispatchRecord {
    pub timestamp: DateTime<Utc>,
    #[serde(alias = "issue", deserialize_with = "item_id")]
    pub item: u64,
    #[serde(alias = "hat")]
    pub role: Role,
    /// Where the assignment document was written
    pub prompt_file: PathBuf,
    /// Hex SHA-256 of the assignment document
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prompt_sha256: Option<String>,
}

/// Terminal result of an item's lifecycle
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum OutcomeResult {
    Merged,
    Rejected,
    Abandoned,
    Other(String),
}

impl OutcomeResult {
    pub fn as_str(&self) -> &str {
        match self {
            OutcomeResult::Merged => "merged",
            OutcomeResult::Rejected => "rejected",
            OutcomeResult::Abandoned => "abandoned",
            OutcomeResult::Other(s) => s,
        }
    }
}

impl From<String> for OutcomeResult {
    fn from(s: String) -> Self {
        match s.as_str() {
            "merged" => OutcomeResult::Merged,
            "rejected" => OutcomeResult::Rejected,
            "abandoned" => OutcomeResult::Abandoned,
            _ => OutcomeResult::Other(s),
        }
    }
}

impl From<&str> for OutcomeResult {
    fn from(s: &str) -> Self {
        OutcomeResult::from(s.to_string())
    }
}

impl From<OutcomeResult> for String {
    fn from(result: OutcomeResult) -> Self {
        result.as_str().to_string()
    }
}

impl fmt::Display for OutcomeResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Reported result of a finished piece of work
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutcomeRecord {
    pub result: OutcomeResult,
    #[serde(alias = "hat")]
    pub role: Role,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    #[serde(
        default,
        alias = "issue",
        skip_serializing_if = "Option::is_none",
        deserialize_with = "optional_item_id"
    )]
    pub item: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Value>,
}

impl OutcomeRecord {
    pub fn new(result: impl Into<OutcomeResult>, role: Role) -> Self {
        Self {
            result: result.into(),
            role,
            reason: None,
            item: None,
            timestamp: None,
            metadata: None,
        }
    }

    /// Rejected outcome with a reason
    pub fn rejected(role: Role, reason: impl Into<String>) -> Self {
        Self::new(OutcomeResult::Rejected, role).with_reason(reason)
    }

    pub fn with_reason(mut self, reason: impl Into<String>) -> Self {
        self.reason = Some(reason.into());
        self
    }

    pub fn with_item(mut self, item: u64) -> Self {
        self.item = Some(item);
        self
    }

    pub fn with_timestamp(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = Some(timestamp);
        self
    }

    pub fn with_metadata(mut self, metadata: Value) -> Self {
        self.metadata = Some(metadata);
        self
    }
}

/// Audit entry for one retrospective run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetrospectiveRunRecord {
    pub timestamp: DateTime<Utc>,
    pub tasks_analyzed: usize,
    pub improvements_proposed: usize,
}

/// Any record found in a log line
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum LogRecord {
    Dispatch(DispatchRecord),
    Outcome(OutcomeRecord),
    RetrospectiveRun(RetrospectiveRunRecord),
}

impl LogRecord {
    pub fn timestamp(&self) -> Option<DateTime<Utc>> {
        match self {
            LogRecord::Dispatch(r) => Some(r.timestamp),
            LogRecord::Outcome(r) => r.timestamp,
            LogRecord::RetrospectiveRun(r) => Some(r.timestamp),
        }
    }

    pub fn as_dispatch(&self) -> Option<&DispatchRecord> {
        match self {
            LogRecord::Dispatch(r) => Some(r),
            _ => None,
        }
    }

    pub fn into_outcome(self) -> Option<OutcomeRecord> {
        match self {
            LogRecord::Outcome(r) => Some(r),
            _ => None,
        }
    }
}

impl From<DispatchRecord> for LogRecord {
    fn from(record: DispatchRecord) -> Self {
        LogRecord::Dispatch(record)
    }
}

impl From<OutcomeRecord> for LogRecord {
    fn from(record: OutcomeRecord) -> Self {
        LogRecord::Outcome(record)
    }
}

/// Stable sort by timestamp; undated records keep their relative order first.
///
/// Concurrent appenders do not guarantee that file position reflects time.
pub fn sort_by_timestamp(records: &mut [LogRecord]) {
    records.sort_by_key(LogRecord::timestamp);
}

#[derive(Deserialize)]
#[serde(untagged)]
enum NumberOrString {
    Number(u64),
    String(String),
}

impl NumberOrString {
    fn into_id<E: serde::de::Error>(self) -> Result<u64, E> {
        match self {
            NumberOrString::Number(n) => Ok(n),
            NumberOrString::String(s) => s
                .trim()
                .trim_start_matches('#')
                .parse()
                .map_err(|_| E::custom(format!("invalid item id: {}", s))),
        }
    }
}

// Older logs wrote the item number as a string.
fn item_id<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u64, D::Error> {
    NumberOrString::deserialize(deserializer)?.into_id()
}

fn optional_item_id<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<u64>, D::Error> {
    Option::<NumberOrString>::deserialize(deserializer)?
        .map(NumberOrString::into_id)
        .transpose()
}
