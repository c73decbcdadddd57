use eyre::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use factory::dispatch::{DEFAULT_CLAIM_COMMENT, DispatchOptions};
use factory::retrospective::DEFAULT_RECENT_LIMIT;
use factory::status::DEFAULT_RECENT_MERGES;
use factory::tracker::{DEFAULT_LIST_LIMIT, GhCliConfig};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// env_logger filter used when RUST_LOG is unset, e.g. "debug" or "factory=trace"
    pub log_level: Option<String>,
    pub tracker: TrackerConfig,
    pub storage: StorageConfig,
    pub dispatch: DispatchConfig,
    pub retrospective: RetrospectiveConfig,
    pub status: StatusConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TrackerConfig {
    /// OWNER/REPO passed to gh; None uses the current checkout
    pub repo: Option<String>,
    pub timeout_ms: u64,
    pub gh_binary: String,
    /// Upper bound on items fetched by each list query
    pub list_limit: usize,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            repo: None,
            timeout_ms: 30000,
            gh_binary: "gh".to_string(),
            list_limit: DEFAULT_LIST_LIMIT,
        }
    }
}

impl TrackerConfig {
    pub fn gh_cli(&self) -> GhCliConfig {
        GhCliConfig {
            binary: self.gh_binary.clone(),
            repo: self.repo.clone(),
            timeout: Duration::from_millis(self.timeout_ms),
            list_limit: self.list_limit,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Logs, assignment documents and the improvement report
    pub memory_dir: PathBuf,
    /// Directory holding hat-<role>.md profiles
    pub profiles_dir: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            memory_dir: dirs::data_local_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join("factory")
                .join("memory"),
            profiles_dir: PathBuf::from("references"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DispatchConfig {
    pub strict_claim: bool,
    pub claim_comment: String,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            strict_claim: false,
            claim_comment: DEFAULT_CLAIM_COMMENT.to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrospectiveConfig {
    pub recent_limit: usize,
}

impl Default for RetrospectiveConfig {
    fn default() -> Self {
        Self {
            recent_limit: DEFAULT_RECENT_LIMIT,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StatusConfig {
    pub recent_merges: usize,
}

impl Default for StatusConfig {
    fn default() -> Self {
        Self {
            recent_merges: DEFAULT_RECENT_MERGES,
        }
    }
}

impl Config {
    /// Load configuration with fallback chain
    pub fn load(config_path: Option<&PathBuf>) -> Result<Self> {
        // If explicit config path provided, try to load it
        if let Some(path) = config_path {
            return Self::load_from_file(path).context(format!("Failed to load config from {}", path.display()));
        }

        // Try primary location: ~/.config/<project>/<project>.yml
        let project_name = env!("CARGO_PKG_NAME");
        if let Some(config_dir) = dirs::config_dir() {
            let primary_config = config_dir.join(project_name).join(format!("{}.yml", project_name));
            if primary_config.exists() {
                match Self::load_from_file(&primary_config) {
                    Ok(config) => return Ok(config),
                    Err(e) => {
                        log::warn!("Failed to load config from {}: {}", primary_config.display(), e);
                    }
                }
            }
        }

        // Try fallback location: ./<project>.yml
        let fallback_config = PathBuf::from(format!("{}.yml", project_name));
        if fallback_config.exists() {
            match Self::load_from_file(&fallback_config) {
                Ok(config) => return Ok(config),
                Err(e) => {
                    log::warn!("Failed to load config from {}: {}", fallback_config.display(), e);
                }
            }
        }

        log::info!("No config file found, using defaults");
        Ok(Self::default())
    }

    fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(&path).context("Failed to read config file")?;

        let config: Self = serde_yaml::from_str(&content).context("Failed to parse config file")?;

        log::info!("Loaded config from: {}", path.as_ref().display());
        Ok(config)
    }

    /// Dispatch options, with the tracker repo named in assignments
    pub fn dispatch_options(&self) -> DispatchOptions {
        DispatchOptions {
            repo: self.tracker.repo.clone(),
            strict_claim: self.dispatch.strict_claim,
            claim_comment: self.dispatch.claim_comment.clone(),
        }
    }
}
