//! TOML-based configuration for the host.
//!
//! Reads `AppConfig` from the platform-appropriate config file:
//! - Windows:  `%APPDATA%\LanHold\config.toml`
//! - Linux:    `~/.config/lanhold/config.toml` (or `$XDG_CONFIG_HOME/lanhold`)
//! - macOS:    `~/Library/Application Support/LanHold/config.toml`
//!
//! ```toml
//! [host]
//! log_level = "info"
//!
//! [network]
//! bind_address = "0.0.0.0"
//! send_timeout_ms = 5000
//! resolve_hostnames = false
//!
//! [holds]
//! receive_tag = "lanhold_receive"
//! transmit_tag = "lanhold_transmit"
//! ```
//!
//! Every section and every field has a serde default, so an empty or partial
//! file is valid.

use std::net::IpAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::infrastructure::holds::lock_manager::HoldTags;
use crate::infrastructure::network::ChannelConfig;

/// Error type for configuration file operations.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The platform config directory could not be determined.
    #[error("could not determine platform config directory")]
    NoPlatformConfigDir,

    /// A file system I/O error occurred.
    #[error("I/O error accessing config at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The TOML content could not be parsed.
    #[error("failed to parse config TOML: {0}")]
    Parse(#[from] toml::de::Error),

    /// A field parsed as TOML but holds an unusable value.
    #[error("invalid value for {field}: {reason}")]
    InvalidValue { field: &'static str, reason: String },
}

// ── Config schema types ───────────────────────────────────────────────────────

/// Top-level host configuration stored on disk.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct AppConfig {
    #[serde(default)]
    pub host: HostConfig,
    #[serde(default)]
    pub network: NetworkConfig,
    #[serde(default)]
    pub holds: HoldsConfig,
}

/// General host behaviour settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct HostConfig {
    /// `tracing` log level: `"error"`, `"warn"`, `"info"`, `"debug"`, `"trace"`.
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

/// Outbound socket settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NetworkConfig {
    /// Local IP to bind.  Selects the socket family; the port is always
    /// ephemeral.
    #[serde(default = "default_bind_address")]
    pub bind_address: String,
    /// Upper bound on a single dispatched send, in milliseconds.
    #[serde(default = "default_send_timeout_ms")]
    pub send_timeout_ms: u64,
    /// Resolve non-literal destinations through the system resolver.
    #[serde(default)]
    pub resolve_hostnames: bool,
}

/// Labels handed to the platform when a hold is requested.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct HoldsConfig {
    #[serde(default = "default_receive_tag")]
    pub receive_tag: String,
    #[serde(default = "default_transmit_tag")]
    pub transmit_tag: String,
}

// ── Default helpers ───────────────────────────────────────────────────────────

fn default_log_level() -> String {
    "info".to_string()
}
fn default_bind_address() -> String {
    "0.0.0.0".to_string()
}
fn default_send_timeout_ms() -> u64 {
    5000
}
fn default_receive_tag() -> String {
    HoldTags::default().receive
}
fn default_transmit_tag() -> String {
    HoldTags::default().transmit
}

impl Default for HostConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
        }
    }
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            bind_address: default_bind_address(),
            send_timeout_ms: default_send_timeout_ms(),
            resolve_hostnames: false,
        }
    }
}

impl Default for HoldsConfig {
    fn default() -> Self {
        Self {
            receive_tag: default_receive_tag(),
            transmit_tag: default_transmit_tag(),
        }
    }
}

// ── Conversions ───────────────────────────────────────────────────────────────

impl NetworkConfig {
    /// Builds the channel settings.
    ///
    /// # Errors
    ///
    /// [`ConfigError::InvalidValue`] if `bind_address` is not an IP literal
    /// or `send_timeout_ms` is zero.
    pub fn channel_config(&self) -> Result<ChannelConfig, ConfigError> {
        let bind_address: IpAddr =
            self.bind_address
                .trim()
                .parse()
                .map_err(|e| ConfigError::InvalidValue {
                    field: "network.bind_address",
                    reason: format!("'{}': {e}", self.bind_address),
                })?;
        if self.send_timeout_ms == 0 {
            return Err(ConfigError::InvalidValue {
                field: "network.send_timeout_ms",
                reason: "must be greater than zero".to_string(),
            });
        }
        Ok(ChannelConfig {
            bind_address,
            send_timeout: Duration::from_millis(self.send_timeout_ms),
            resolve_hostnames: self.resolve_hostnames,
        })
    }
}

impl From<&HoldsConfig> for HoldTags {
    fn from(cfg: &HoldsConfig) -> Self {
        HoldTags {
            receive: cfg.receive_tag.clone(),
            transmit: cfg.transmit_tag.clone(),
        }
    }
}

// ── Config repository ─────────────────────────────────────────────────────────

/// Determines the platform-appropriate directory for the config file.
///
/// # Errors
///
/// Returns [`ConfigError::NoPlatformConfigDir`] when the platform config base
/// directory cannot be determined from the environment.
fn config_dir() -> Result<PathBuf, ConfigError> {
    platform_config_dir().ok_or(ConfigError::NoPlatformConfigDir)
}

/// Resolves the full path to the config file.
///
/// # Errors
///
/// Returns [`ConfigError::NoPlatformConfigDir`] if the base directory cannot be
/// determined.
fn config_file_path() -> Result<PathBuf, ConfigError> {
    Ok(config_dir()?.join("config.toml"))
}

/// Loads `AppConfig` from the platform config file, returning
/// `AppConfig::default()` if the file does not yet exist.
///
/// # Errors
///
/// See [`load_config_from`].
pub fn load_config() -> Result<AppConfig, ConfigError> {
    load_config_from(&config_file_path()?)
}

/// Loads `AppConfig` from `path`, returning `AppConfig::default()` if the file
/// does not exist.
///
/// # Errors
///
/// Returns [`ConfigError::Io`] for file-system errors other than "not found",
/// and [`ConfigError::Parse`] if the TOML is malformed.
pub fn load_config_from(path: &Path) -> Result<AppConfig, ConfigError> {
    match std::fs::read_to_string(path) {
        Ok(content) => Ok(toml::from_str(&content)?),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(AppConfig::default()),
        Err(source) => Err(ConfigError::Io {
            path: path.to_path_buf(),
            source,
        }),
    }
}

/// Resolves the platform config directory, including the `lanhold` leaf.
fn platform_config_dir() -> Option<PathBuf> {
    #[cfg(target_os = "windows")]
    {
        std::env::var_os("APPDATA").map(|p| PathBuf::from(p).join("LanHold"))
    }

    #[cfg(target_os = "linux")]
    {
        let base = std::env::var_os("XDG_CONFIG_HOME")
            .map(PathBuf::from)
            .or_else(|| std::env::var_os("HOME").map(|h| PathBuf::from(h).join(".config")))?;
        Some(base.join("lanhold"))
    }

    #[cfg(target_os = "macos")]
    {
        std::env::var_os("HOME").map(|h| {
            PathBuf::from(h)
                .join("Library")
                .join("Application Support")
                .join("LanHold")
        })
    }

    #[cfg(not(any(target_os = "windows", target_os = "linux", target_os = "macos")))]
    {
        None
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
