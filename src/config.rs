// SPDX-License-Identifier: PMPL-1.0-or-later
//! Configuration for a11yaudit
//!
//! Every field has a default, so an empty or partial file is valid.
//! TOML is used when the file extension is `.toml`, YAML otherwise.

use crate::error::{AuditError, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::debug;

/// Default cap on the HTML handed to the evaluators (1.5 MB)
pub const DEFAULT_MAX_BYTES: usize = 1_500_000;

/// Default wall-clock budget for rule evaluation
pub const DEFAULT_TIME_BUDGET_MS: u64 = 400;

/// Main configuration structure
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditConfig {
    /// Inputs larger than this many bytes are truncated before evaluation
    #[serde(default = "default_max_bytes")]
    pub max_bytes: usize,

    /// Cooperative time budget, checked between rules
    #[serde(default = "default_time_budget_ms")]
    pub time_budget_ms: u64,

    /// Which evaluator to prefer
    #[serde(default)]
    pub engine: EngineChoice,

    /// HTTP settings for URL-only audits
    #[serde(default)]
    pub fetch: FetchConfig,

    /// Where reports are persisted, if anywhere
    #[serde(default)]
    pub store: StoreConfig,
}

impl Default for AuditConfig {
    fn default() -> Self {
        Self {
            max_bytes: DEFAULT_MAX_BYTES,
            time_budget_ms: DEFAULT_TIME_BUDGET_MS,
            engine: EngineChoice::default(),
            fetch: FetchConfig::default(),
            store: StoreConfig::default(),
        }
    }
}

impl AuditConfig {
    pub fn time_budget(&self) -> Duration {
        Duration::from_millis(self.time_budget_ms)
    }
}

/// Evaluator preference
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EngineChoice {
    /// Parsed-document engine when compiled in, pattern engine otherwise
    #[default]
    Auto,
    /// Pattern-match engine only
    Pattern,
}

/// Fetch adapter settings
///
/// Certificate verification is relaxed by default: the audit wants to reach
/// staging hosts with self-signed certificates, and the fetched HTML is only
/// inspected, never executed or trusted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FetchConfig {
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    #[serde(default = "default_max_redirects")]
    pub max_redirects: usize,

    #[serde(default = "default_true")]
    pub accept_invalid_certs: bool,

    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_timeout_secs(),
            max_redirects: default_max_redirects(),
            accept_invalid_certs: true,
            user_agent: default_user_agent(),
        }
    }
}

/// Report persistence settings
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Directory for the JSON report store; `None` disables persistence
    #[serde(default)]
    pub dir: Option<PathBuf>,
}

fn default_max_bytes() -> usize {
    DEFAULT_MAX_BYTES
}

fn default_time_budget_ms() -> u64 {
    DEFAULT_TIME_BUDGET_MS
}

fn default_timeout_secs() -> u64 {
    20
}

fn default_max_redirects() -> usize {
    3
}

fn default_true() -> bool {
    true
}

fn default_user_agent() -> String {
    format!("a11yaudit/{}", env!("CARGO_PKG_VERSION"))
}

pub fn default_config_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("a11yaudit")
        .join("config.toml")
}

/// Load configuration, falling back to defaults when the file is absent
pub fn load_config(path: &Path) -> Result<AuditConfig> {
    if !path.exists() {
        debug!("No config at {}, using defaults", path.display());
        return Ok(AuditConfig::default());
    }

    let content = std::fs::read_to_string(path)?;

    if is_toml(path) {
        toml::from_str(&content)
            .map_err(|e| AuditError::Config(format!("TOML parse error: {}", e)))
    } else {
        serde_yaml::from_str(&content)
            .map_err(|e| AuditError::Config(format!("YAML parse error: {}", e)))
    }
}

pub fn write_default_config(path: &Path) -> Result<()> {
    let config = AuditConfig::default();

    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let content = if is_toml(path) {
        toml::to_string_pretty(&config)
            .map_err(|e| AuditError::Config(format!("TOML serialize error: {}", e)))?
    } else {
        serde_yaml::to_string(&config)
            .map_err(|e| AuditError::Config(format!("YAML serialize error: {}", e)))?
    };

    std::fs::write(path, content)?;
    Ok(())
}

fn is_toml(path: &Path) -> bool {
    path.extension().and_then(|s| s.to_str()) == Some("toml")
}
