//! Configuration management for devopscli.
//!
//! Configuration is read from a YAML file (see [`Config::locate`] for the
//! search order) and then overlaid with `OPENWEB_*` environment variables.
//! It is loaded once per invocation and passed down explicitly.

use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::debug;

/// Environment variable overriding the config file location.
pub const CONFIG_ENV: &str = "DEVOPSCLI_CONFIG";
/// Environment variable overriding the session store location.
pub const SESSIONS_ENV: &str = "DEVOPSCLI_SESSIONS_FILE";

const HOST_ENV: &str = "OPENWEB_API_HOST";
const API_KEY_ENV: &str = "OPENWEB_API_KEY";
const MODEL_ENV: &str = "OPENWEB_MODEL";

const SESSIONS_FILE_NAME: &str = ".devopscli_sessions.json";

/// Template written by `devopscli init`.
pub const DEFAULT_CONFIG_TEMPLATE: &str = r#"# DevOpsCLI Configuration
openwebui:
  host: "http://localhost:3000"
  api_key: ""
  model: "gemma:2b"
  timeout_secs: 120

tools:
  required:
    - git
    - docker
    - kubectl
    - terraform

debug: false
"#;

/// Main configuration structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// OpenWebUI backend settings.
    #[serde(default)]
    pub openwebui: OpenWebUiConfig,
    /// Enables debug logging.
    #[serde(default)]
    pub debug: bool,
    /// Tool verification settings.
    #[serde(default)]
    pub tools: ToolsConfig,
    /// Overrides the version string reported by `devopscli version`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    /// Conversation store settings.
    #[serde(default)]
    pub sessions: SessionsConfig,
}

/// OpenWebUI connection settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OpenWebUiConfig {
    /// Base URL of the OpenWebUI server (default: http://localhost:3000).
    #[serde(default = "default_host")]
    pub host: String,
    /// API key (prefer OPENWEB_API_KEY env var).
    #[serde(default)]
    pub api_key: Option<String>,
    /// Model name (default: gemma:2b).
    #[serde(default = "default_model")]
    pub model: String,
    /// Request timeout in seconds (default: 120).
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for OpenWebUiConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            api_key: None,
            model: default_model(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

fn default_host() -> String {
    "http://localhost:3000".to_string()
}

fn default_model() -> String {
    "gemma:2b".to_string()
}

fn default_timeout_secs() -> u64 {
    120
}

/// Tools checked by `devopscli verify tools`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ToolsConfig {
    #[serde(default)]
    pub required: Vec<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SessionsConfig {
    /// Path of the conversation store file.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<PathBuf>,
}

/// Fully resolved settings needed to talk to the backend.
#[derive(Debug, Clone)]
pub struct ApiSettings {
    pub host: String,
    pub api_key: String,
    pub model: String,
    pub timeout: Duration,
}

impl Config {
    /// Get the config directory path.
    pub fn config_dir() -> Result<PathBuf> {
        dirs::config_dir()
            .map(|p| p.join("devopscli"))
            .context("Could not determine config directory")
    }

    /// Get the default config file path.
    pub fn config_path() -> Result<PathBuf> {
        Ok(Self::config_dir()?.join("config.yaml"))
    }

    /// Find the config file to read.
    ///
    /// Order: explicit `--config`, `$DEVOPSCLI_CONFIG`, `./config.yaml`, then
    /// the user config directory. Returns `None` when nothing exists.
    pub fn locate(explicit: Option<&Path>) -> Result<Option<PathBuf>> {
        if let Some(path) = explicit {
            return Ok(Some(path.to_path_buf()));
        }
        if let Some(path) = std::env::var_os(CONFIG_ENV) {
            return Ok(Some(PathBuf::from(path)));
        }

        let local = PathBuf::from("config.yaml");
        if local.is_file() {
            return Ok(Some(local));
        }

        let user = Self::config_path()?;
        Ok(user.is_file().then_some(user))
    }

    /// Load configuration, using defaults if no file is found, then apply
    /// environment overrides.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        let mut config = match Self::locate(explicit)? {
            Some(path) => Self::from_file(&path)?,
            None => {
                debug!("Using default config, no config file found.");
                Self::default()
            }
        };
        config.apply_env(|key| std::env::var(key).ok());
        Ok(config)
    }

    /// Parse a config file.
    pub fn from_file(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        let config = Self::from_yaml(&contents)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;
        debug!("Loaded configuration from {}", path.display());
        Ok(config)
    }

    /// Parse YAML config text. An empty document yields the defaults.
    pub fn from_yaml(contents: &str) -> Result<Self> {
        if contents.trim().is_empty() {
            return Ok(Self::default());
        }
        Ok(serde_yaml::from_str(contents)?)
    }

    /// Overlay environment variables on top of file values.
    fn apply_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let lookup = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(host) = lookup(HOST_ENV) {
            self.openwebui.host = host;
        }
        if let Some(key) = lookup(API_KEY_ENV) {
            self.openwebui.api_key = Some(key);
        }
        if let Some(model) = lookup(MODEL_ENV) {
            self.openwebui.model = model;
        }
    }

    /// Resolve host, key and model, failing if the host or key is missing.
    pub fn api_settings(&self) -> Result<ApiSettings> {
        let host = self.openwebui.host.trim();
        let api_key = self
            .openwebui
            .api_key
            .as_deref()
            .map(str::trim)
            .unwrap_or_default();

        if host.is_empty() || api_key.is_empty() {
            return Err(anyhow!(
                "OpenWebUI host and API key must be set in config.yaml or environment \
                 variables {} and {}",
                HOST_ENV,
                API_KEY_ENV
            ));
        }

        Ok(ApiSettings {
            host: host.to_string(),
            api_key: api_key.to_string(),
            model: self.openwebui.model.clone(),
            timeout: Duration::from_secs(self.timeout_secs()),
        })
    }

    /// Request timeout in seconds. Zero falls back to the default.
    fn timeout_secs(&self) -> u64 {
        match self.openwebui.timeout_secs {
            0 => {
                debug!("timeout_secs is 0; using the default");
                default_timeout_secs()
            }
            secs => secs,
        }
    }

    /// Location of the conversation store file.
    pub fn sessions_path(&self) -> PathBuf {
        if let Some(path) = std::env::var_os(SESSIONS_ENV) {
            return PathBuf::from(path);
        }
        if let Some(path) = &self.sessions.path {
            return path.clone();
        }
        dirs::home_dir()
            .unwrap_or_else(std::env::temp_dir)
            .join(SESSIONS_FILE_NAME)
    }

    /// Version string to report: config override, else the crate version.
    pub fn version(&self) -> &str {
        self.version
            .as_deref()
            .filter(|v| !v.is_empty())
            .unwrap_or(env!("CARGO_PKG_VERSION"))
    }
}
