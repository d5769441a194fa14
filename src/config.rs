//! Configuration management for freshcheck.
//!
//! Values are layered: built-in defaults, then `~/.freshcheck/config.toml`
//! (or the file passed with `--config`), then environment variables and
//! command-line flags.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::Error;
use crate::freshness::{Aggregation, CommitReference, FreshnessUnit, UnitPreset};
use crate::github::{ClientOptions, DEFAULT_API_BASE};
use crate::report::{ExitStatusPolicy, OutputFormat};

/// Global freshcheck configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub source: SourceConfig,

    #[serde(default)]
    pub policy: PolicyConfig,

    #[serde(default)]
    pub http: HttpConfig,

    #[serde(default)]
    pub output: OutputConfig,
}

/// Which repository and branches to inspect.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceConfig {
    #[serde(default = "default_api_base")]
    pub api_base: String,

    /// Repository owner. Required, no default.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub owner: Option<String>,

    /// Repository name. Required, no default.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub repo: Option<String>,

    #[serde(default)]
    pub branches: Vec<String>,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            api_base: default_api_base(),
            owner: None,
            repo: None,
            branches: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct PolicyConfig {
    #[serde(default)]
    pub unit: UnitPreset,

    /// Overrides `unit` when set.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unit_seconds: Option<u64>,

    #[serde(default)]
    pub aggregation: Aggregation,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HttpConfig {
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    #[serde(default = "default_retries")]
    pub retries: u32,

    #[serde(default = "default_retry_backoff_ms")]
    pub retry_backoff_ms: u64,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_timeout_secs(),
            retries: default_retries(),
            retry_backoff_ms: default_retry_backoff_ms(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputConfig {
    #[serde(default)]
    pub format: OutputFormat,

    #[serde(default)]
    pub exit_status: ExitStatusPolicy,

    /// Append results to `$GITHUB_OUTPUT` when it is set.
    #[serde(default = "default_true")]
    pub github_output: bool,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            format: OutputFormat::default(),
            exit_status: ExitStatusPolicy::default(),
            github_output: true,
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_api_base() -> String {
    DEFAULT_API_BASE.to_string()
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_retries() -> u32 {
    1
}

fn default_retry_backoff_ms() -> u64 {
    1000
}

/// Values taken from the command line or environment. `None` keeps the
/// file value.
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub api_base: Option<String>,
    pub owner: Option<String>,
    pub repo: Option<String>,
    pub branches: Vec<String>,
    pub unit: Option<UnitPreset>,
    pub unit_seconds: Option<u64>,
    pub aggregation: Option<Aggregation>,
    pub timeout_secs: Option<u64>,
    pub retries: Option<u32>,
    pub format: Option<OutputFormat>,
    pub exit_status: Option<ExitStatusPolicy>,
}

impl Config {
    /// Load config from `explicit`, or from ~/.freshcheck/config.toml.
    ///
    /// A missing default file yields defaults; a missing explicit file is an
    /// error.
    pub fn load(explicit: Option<&Path>) -> Result<Self, Error> {
        let path = match explicit {
            Some(path) => {
                if !path.exists() {
                    return Err(Error::ConfigNotFound(path.to_path_buf()));
                }
                path.to_path_buf()
            }
            None => {
                let path = Self::path();
                if !path.exists() {
                    tracing::debug!("No config file at {}, using defaults", path.display());
                    return Ok(Self::default());
                }
                path
            }
        };

        tracing::debug!("Loading config from {}", path.display());
        let content = std::fs::read_to_string(&path)?;
        let config: Config = toml::from_str(&content)?;
        Ok(config)
    }

    /// Path to global freshcheck directory (~/.freshcheck/)
    pub fn global_dir() -> PathBuf {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".freshcheck")
    }

    /// Path to config file
    pub fn path() -> PathBuf {
        Self::global_dir().join("config.toml")
    }

    /// Layer command-line and environment values on top.
    pub fn apply(&mut self, overrides: Overrides) {
        if let Some(api_base) = overrides.api_base {
            self.source.api_base = api_base;
        }
        if let Some(owner) = overrides.owner {
            self.source.owner = Some(owner);
        }
        if let Some(repo) = overrides.repo {
            self.source.repo = Some(repo);
        }
        if !overrides.branches.is_empty() {
            self.source.branches = overrides.branches;
        }
        if let Some(unit) = overrides.unit {
            self.policy.unit = unit;
            // An explicit preset beats a unit_seconds from the file
            self.policy.unit_seconds = None;
        }
        if let Some(seconds) = overrides.unit_seconds {
            self.policy.unit_seconds = Some(seconds);
        }
        if let Some(aggregation) = overrides.aggregation {
            self.policy.aggregation = aggregation;
        }
        if let Some(timeout) = overrides.timeout_secs {
            self.http.timeout_secs = timeout;
        }
        if let Some(retries) = overrides.retries {
            self.http.retries = retries;
        }
        if let Some(format) = overrides.format {
            self.output.format = format;
        }
        if let Some(exit_status) = overrides.exit_status {
            self.output.exit_status = exit_status;
        }
    }

    /// Branch references to check. Fails on missing owner, repo or branches.
    pub fn references(&self) -> Result<Vec<CommitReference>, Error> {
        let owner = non_blank(self.source.owner.as_deref())
            .ok_or(Error::MissingConfig("source.owner"))?;
        let repo =
            non_blank(self.source.repo.as_deref()).ok_or(Error::MissingConfig("source.repo"))?;

        let branches: Vec<&str> = self
            .source
            .branches
            .iter()
            .map(|b| b.trim())
            .filter(|b| !b.is_empty())
            .collect();
        self.policy.aggregation.validate(branches.len())?;

        branches
            .into_iter()
            .map(|branch| CommitReference::new(owner, repo, branch))
            .collect()
    }

    /// Effective unit length.
    pub fn unit(&self) -> Result<FreshnessUnit, Error> {
        match self.policy.unit_seconds {
            Some(seconds) => FreshnessUnit::from_seconds(seconds),
            None => Ok(self.policy.unit.unit()),
        }
    }

    /// HTTP client settings.
    pub fn client_options(&self) -> Result<ClientOptions, Error> {
        if self.http.timeout_secs == 0 {
            return Err(Error::InvalidConfig(
                "http.timeout_secs must be greater than zero".to_string(),
            ));
        }
        let api_base = self.source.api_base.trim();
        if !(api_base.starts_with("http://") || api_base.starts_with("https://")) {
            return Err(Error::InvalidConfig(format!(
                "source.api_base must be an http(s) URL: {}",
                api_base
            )));
        }

        Ok(ClientOptions {
            api_base: api_base.to_string(),
            timeout: Duration::from_secs(self.http.timeout_secs),
            retries: self.http.retries,
            retry_backoff: Duration::from_millis(self.http.retry_backoff_ms),
        })
    }

    /// Render as TOML.
    pub fn to_toml(&self) -> Result<String, Error> {
        toml::to_string_pretty(self).map_err(|e| Error::ConfigParse(e.to_string()))
    }

    /// Save config to `path`, creating parent directories.
    pub fn save(&self, path: &Path) -> Result<(), Error> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let with_header = format!(
            "# freshcheck configuration\n# Edit directly or regenerate with 'freshcheck init --force'\n\n{}",
            self.to_toml()?
        );
        std::fs::write(path, with_header)?;
        Ok(())
    }
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}
