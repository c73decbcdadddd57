//! GitHub CLI (`gh`) tracker backend.
//!
//! Every operation is one `gh` invocation with JSON output, run through
//! `tokio::process` under a timeout. The child is killed if the call is
//! dropped or times out.

use std::collections::BTreeSet;
use std::process::{Output, Stdio};
use std::time::Duration;

use async_trait::async_trait;
use log::debug;
use serde::Deserialize;
use tokio::process::Command;

use super::{Tracker, TrackerError};
use crate::domain::{ItemFilter, ItemKind, ItemState, ReviewMetrics, WorkItem};

const ISSUE_FIELDS: &str = "number,title,body,labels,state,url";
const REVIEW_FIELDS: &str = "number,title,body,labels,state,url,additions,deletions,files";

/// gh lists only 30 items unless told otherwise
pub const DEFAULT_LIST_LIMIT: usize = 500;

/// Configuration for the gh backend
#[derive(Debug, Clone)]
pub struct GhCliConfig {
    /// Executable to run (default: "gh")
    pub binary: String,
    /// OWNER/REPO to scope every call to; None uses gh's current repository
    pub repo: Option<String>,
    /// Per-call timeout
    pub timeout: Duration,
    /// `--limit` for list calls whose filter sets none
    pub list_limit: usize,
}

impl Default for GhCliConfig {
    fn default() -> Self {
        Self {
            binary: "gh".to_string(),
            repo: None,
            timeout: Duration::from_secs(30),
            list_limit: DEFAULT_LIST_LIMIT,
        }
    }
}

/// Tracker backed by the GitHub CLI
#[derive(Debug, Clone)]
pub struct GhCliTracker {
    config: GhCliConfig,
}

impl GhCliTracker {
    pub fn new(config: GhCliConfig) -> Self {
        Self { config }
    }

    async fn run(&self, args: &[String]) -> Result<Output, TrackerError> {
        let mut cmd = Command::new(&self.config.binary);
        cmd.args(args);
        if let Some(repo) = &self.config.repo {
            cmd.arg("--repo").arg(repo);
        }
        cmd.env("GH_PROMPT_DISABLED", "1")
            .env("GH_NO_UPDATE_NOTIFIER", "1")
            .env("NO_COLOR", "1")
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        debug!("Running {} {}", self.config.binary, args.join(" "));

        match tokio::time::timeout(self.config.timeout, cmd.output()).await {
            Ok(Ok(output)) => Ok(output),
            Ok(Err(e)) => Err(TrackerError::BackendUnavailable(format!(
                "failed to run {}: {}",
                self.config.binary, e
            ))),
            Err(_) => Err(TrackerError::BackendUnavailable(format!(
                "{} timed out after {}ms",
                self.config.binary,
                self.config.timeout.as_millis()
            ))),
        }
    }

    /// Run and return stdout. Only a lookup (`target` set) can fail with NotFound.
    async fn run_checked(&self, args: &[String], target: Option<(u64, ItemKind)>) -> Result<String, TrackerError> {
        let output = self.run(args).await?;
        if output.status.success() {
            Ok(String::from_utf8_lossy(&output.stdout).into_owned())
        } else {
            let stderr = String::from_utf8_lossy(&output.stderr);
            Err(classify_failure(&stderr, output.status.code(), target))
        }
    }
}

#[async_trait]
impl Tracker for GhCliTracker {
    async fn list_items(&self, filter: &ItemFilter) -> Result<Vec<WorkItem>, TrackerError> {
        let stdout = self.run_checked(&list_args(filter, self.config.list_limit), None).await?;
        parse_items(&stdout, filter.kind)
    }

    async fn get_item(&self, id: u64, kind: ItemKind) -> Result<WorkItem, TrackerError> {
        let stdout = self.run_checked(&view_args(id, kind), Some((id, kind))).await?;
        parse_item(&stdout, kind)
    }

    async fn set_labels(&self, id: u64, kind: ItemKind, add: &[&str], remove: &[&str]) -> Result<(), TrackerError> {
        if add.is_empty() && remove.is_empty() {
            return Ok(());
        }
        self.run_checked(&edit_args(id, kind, add, remove), None)
            .await
            .map(|_| ())
    }

    async fn post_comment(&self, id: u64, kind: ItemKind, text: &str) -> Result<(), TrackerError> {
        self.run_checked(&comment_args(id, kind, text), None)
            .await
            .map(|_| ())
    }
}

fn noun(kind: ItemKind) -> &'static str {
    match kind {
        ItemKind::Issue => "issue",
        ItemKind::ReviewRequest => "pr",
    }
}

fn fields(kind: ItemKind) -> &'static str {
    match kind {
        ItemKind::Issue => ISSUE_FIELDS,
        ItemKind::ReviewRequest => REVIEW_FIELDS,
    }
}

fn strings(parts: &[&str]) -> Vec<String> {
    parts.iter().map(|s| s.to_string()).collect()
}

fn list_args(filter: &ItemFilter, default_limit: usize) -> Vec<String> {
    let mut args = strings(&[noun(filter.kind), "list"]);
    for label in &filter.labels {
        args.push("--label".to_string());
        args.push(label.clone());
    }
    let state = match (filter.kind, filter.state) {
        (_, None) => "all",
        // Issues are never merged; gh only knows open/closed for them.
        (ItemKind::Issue, Some(ItemState::Merged)) => "closed",
        (_, Some(state)) => state.as_str(),
    };
    args.push("--state".to_string());
    args.push(state.to_string());
    args.push("--limit".to_string());
    args.push(filter.limit.unwrap_or(default_limit).to_string());
    args.push("--json".to_string());
    args.push(fields(filter.kind).to_string());
    args
}

fn view_args(id: u64, kind: ItemKind) -> Vec<String> {
    let id = id.to_string();
    strings(&[noun(kind), "view", id.as_str(), "--json", fields(kind)])
}

fn edit_args(id: u64, kind: ItemKind, add: &[&str], remove: &[&str]) -> Vec<String> {
    let id = id.to_string();
    let mut args = strings(&[noun(kind), "edit", id.as_str()]);
    for label in add {
        args.push("--add-label".to_string());
        args.push(label.to_string());
    }
    for label in remove {
        args.push("--remove-label".to_string());
        args.push(label.to_string());
    }
    args
}

fn comment_args(id: u64, kind: ItemKind, text: &str) -> Vec<String> {
    let id = id.to_string();
    strings(&[noun(kind), "comment", id.as_str(), "--body", text])
}

fn classify_failure(stderr: &str, code: Option<i32>, target: Option<(u64, ItemKind)>) -> TrackerError {
    let lowered = stderr.to_ascii_lowercase();
    // gh reports a missing issue or pull request as a GraphQL resolution error.
    // Other "not found" messages (a missing label, an unknown repo) are not about the item.
    if let Some((id, kind)) = target
        && (lowered.contains("could not resolve to an issue")
            || lowered.contains("could not resolve to a pullrequest")
            || lowered.contains("could not resolve to a pull request"))
    {
        return TrackerError::NotFound { id, kind };
    }
    let detail = stderr.trim();
    let detail = if detail.is_empty() { "no error output" } else { detail };
    TrackerError::BackendUnavailable(format!("gh exited with {:?}: {}", code, detail))
}

#[derive(Debug, Deserialize)]
struct GhLabel {
    name: String,
}

#[derive(Debug, Deserialize)]
struct GhFile {
    path: String,
}

#[derive(Debug, Deserialize)]
struct GhItem {
    number: u64,
    title: String,
    #[serde(default)]
    body: Option<String>,
    #[serde(default)]
    labels: Vec<GhLabel>,
    #[serde(default)]
    state: Option<String>,
    #[serde(default)]
    url: Option<String>,
    #[serde(default)]
    additions: Option<u64>,
    #[serde(default)]
    deletions: Option<u64>,
    #[serde(default)]
    files: Option<Vec<GhFile>>,
}

impl GhItem {
    fn into_work_item(self, kind: ItemKind) -> WorkItem {
        let review = match kind {
            ItemKind::Issue => None,
            ItemKind::ReviewRequest => Some(ReviewMetrics {
                additions: self.additions.unwrap_or(0),
                deletions: self.deletions.unwrap_or(0),
                files: self.files.unwrap_or_default().into_iter().map(|f| f.path).collect(),
            }),
        };
        WorkItem {
            id: self.number,
            kind,
            title: self.title,
            body: self.body.unwrap_or_default(),
            labels: self.labels.into_iter().map(|l| l.name).collect::<BTreeSet<_>>(),
            state: self.state.as_deref().and_then(ItemState::parse).unwrap_or(ItemState::Open),
            url: self.url,
            review,
        }
    }
}

fn parse_items(json: &str, kind: ItemKind) -> Result<Vec<WorkItem>, TrackerError> {
    let items: Vec<GhItem> = serde_json::from_str(json)
        .map_err(|e| TrackerError::BackendUnavailable(format!("unexpected gh list output: {}", e)))?;
    Ok(items.into_iter().map(|item| item.into_work_item(kind)).collect())
}

fn parse_item(json: &str, kind: ItemKind) -> Result<WorkItem, TrackerError> {
    let item: GhItem = serde_json::from_str(json)
        .map_err(|e| TrackerError::BackendUnavailable(format!("unexpected gh view output: {}", e)))?;
    Ok(item.into_work_item(kind))
}
