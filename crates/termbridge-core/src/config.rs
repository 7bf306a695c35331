//! Configuration: TOML file, environment toggle, then caller overrides.

use crate::bridge::DEFAULT_TIMEOUT_SECS;
use crate::buffer::DEFAULT_BUFFER_CAPACITY;
use crate::error::{TermError, TermResult};
use crate::host::HostChoice;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::info;

/// Environment variable that gates every input-injection operation.
pub const READONLY_ENV: &str = "MCP_TERMINAL_READONLY";

/// Top-level config file structure.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ConfigFile {
    #[serde(default)]
    pub bridge: BridgeSection,
    #[serde(default)]
    pub sessions: SessionsSection,
    #[serde(default)]
    pub host: HostSection,
    #[serde(default)]
    pub security: SecuritySection,
}

/// `[bridge]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct BridgeSection {
    #[serde(default = "default_program")]
    pub program: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for BridgeSection {
    fn default() -> Self {
        Self {
            program: default_program(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

/// `[sessions]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct SessionsSection {
    #[serde(default = "default_scan_interval")]
    pub scan_interval_secs: f64,
    #[serde(default = "default_buffer_capacity")]
    pub buffer_capacity: usize,
    #[serde(default = "default_lines")]
    pub default_lines: usize,
}

impl Default for SessionsSection {
    fn default() -> Self {
        Self {
            scan_interval_secs: default_scan_interval(),
            buffer_capacity: default_buffer_capacity(),
            default_lines: default_lines(),
        }
    }
}

/// `[host]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct HostSection {
    #[serde(default = "default_app")]
    pub app: String,
    #[serde(default = "default_device_dir")]
    pub device_dir: String,
    #[serde(default = "default_device_prefix")]
    pub device_prefix: String,
}

impl Default for HostSection {
    fn default() -> Self {
        Self {
            app: default_app(),
            device_dir: default_device_dir(),
            device_prefix: default_device_prefix(),
        }
    }
}

/// `[security]` section.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SecuritySection {
    #[serde(default)]
    pub readonly: bool,
}

fn default_program() -> String {
    "osascript".to_string()
}
fn default_timeout_secs() -> u64 {
    DEFAULT_TIMEOUT_SECS
}
fn default_scan_interval() -> f64 {
    2.0
}
fn default_buffer_capacity() -> usize {
    DEFAULT_BUFFER_CAPACITY
}
fn default_lines() -> usize {
    100
}
fn default_app() -> String {
    "auto".to_string()
}
fn default_device_dir() -> String {
    "/dev".to_string()
}
fn default_device_prefix() -> String {
    "ttys".to_string()
}

/// Resolved configuration.
#[derive(Debug, Clone)]
pub struct Config {
    pub program: String,
    pub timeout_secs: u64,
    pub scan_interval: Duration,
    pub buffer_capacity: usize,
    pub default_lines: usize,
    pub host: HostChoice,
    pub device_dir: PathBuf,
    pub device_prefix: String,
    pub readonly: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            program: default_program(),
            timeout_secs: default_timeout_secs(),
            scan_interval: Duration::from_secs_f64(default_scan_interval()),
            buffer_capacity: default_buffer_capacity(),
            default_lines: default_lines(),
            host: HostChoice::Auto,
            device_dir: PathBuf::from(default_device_dir()),
            device_prefix: default_device_prefix(),
            readonly: false,
        }
    }
}

impl Config {
    /// Load from a TOML file (defaults if it does not exist), then apply
    /// the readonly environment toggle.
    pub fn load(path: Option<&Path>) -> TermResult<Self> {
        let file = match path.map(expand_tilde) {
            Some(path) if path.exists() => {
                info!(path = %path.display(), "loading config file");
                let content = std::fs::read_to_string(&path)?;
                toml::from_str::<ConfigFile>(&content)
                    .map_err(|e| TermError::Config(format!("{}: {e}", path.display())))?
            }
            Some(path) => {
                info!(path = %path.display(), "config file not found, using defaults");
                ConfigFile::default()
            }
            None => ConfigFile::default(),
        };

        let mut config = Self::from_file(file)?;
        if let Some(readonly) = readonly_from_env(std::env::var(READONLY_ENV).ok().as_deref()) {
            config.readonly = readonly;
        }
        Ok(config)
    }

    /// Resolve a parsed file into a config.
    pub fn from_file(file: ConfigFile) -> TermResult<Self> {
        let host = file.host.app.parse::<HostChoice>().map_err(TermError::Config)?;
        let scan_interval = Duration::try_from_secs_f64(file.sessions.scan_interval_secs)
            .map_err(|e| TermError::Config(format!("scan_interval_secs: {e}")))?;

        Ok(Self {
            program: file.bridge.program,
            timeout_secs: file.bridge.timeout_secs,
            scan_interval,
            buffer_capacity: file.sessions.buffer_capacity,
            default_lines: file.sessions.default_lines,
            host,
            device_dir: expand_tilde_str(&file.host.device_dir),
            device_prefix: file.host.device_prefix,
            readonly: file.security.readonly,
        })
    }
}

/// Interpret the readonly toggle. `None` when the variable is unset.
pub fn readonly_from_env(value: Option<&str>) -> Option<bool> {
    value.map(|v| matches!(v.to_lowercase().as_str(), "1" | "true" | "yes" | "on"))
}

/// Default config path, `~/.termbridge/config.toml`.
pub fn default_config_path() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_default()
        .join(".termbridge")
        .join("config.toml")
}

fn expand_tilde(path: &Path) -> PathBuf {
    expand_tilde_str(&path.to_string_lossy())
}

fn expand_tilde_str(s: &str) -> PathBuf {
    if let Some(rest) = s.strip_prefix("~/") {
        if let Some(home) = dirs::home_dir() {
            return home.join(rest);
        }
    }
    PathBuf::from(s)
}
