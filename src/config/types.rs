//! Core configuration types and loading.

use serde::Deserialize;
use std::path::{Path, PathBuf};
use thiserror::Error;

use super::defaults::*;
use crate::auth::AuthMode;

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),
}

/// Bot configuration.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    /// Server to connect to.
    #[serde(default)]
    pub server: ServerConfig,
    /// Identity, master and command settings.
    #[serde(default)]
    pub bot: BotConfig,
    /// Feature toggles (also switchable at runtime with `set`).
    #[serde(default)]
    pub features: FeaturesConfig,
    /// Persistent store.
    #[serde(default)]
    pub database: DatabaseConfig,
    /// Local control socket.
    #[serde(default)]
    pub control: ControlConfig,
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        Ok(config)
    }
}

/// Server connection configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Server address in `host:port` form.
    #[serde(default = "default_host")]
    pub host: String,
    /// Wrap the connection in TLS.
    #[serde(default = "default_true")]
    pub tls: bool,
    /// Validate the server certificate (only meaningful with `tls`).
    #[serde(default = "default_true")]
    pub verify_cert: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            tls: true,
            verify_cert: true,
        }
    }
}

/// Identity and command configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct BotConfig {
    /// Nickname to register.
    #[serde(default = "default_nick")]
    pub nick: String,
    /// Master identity and privileged sub-prefix, as `name:prefix`.
    #[serde(default = "default_master")]
    pub master: String,
    /// Prefix marking public commands (e.g. `!`).
    #[serde(default = "default_command_prefix")]
    pub command_prefix: String,
    /// Comma separated channels joined after the first MODE line.
    #[serde(default = "default_channels")]
    pub channels: String,
    /// How the master is authenticated.
    #[serde(default)]
    pub auth_mode: AuthMode,
    /// Nick of the network's identity service.
    #[serde(default = "default_identity_service")]
    pub identity_service: String,
    /// Account password; enables SASL PLAIN when set.
    #[serde(default)]
    pub sasl_password: Option<String>,
}

impl Default for BotConfig {
    fn default() -> Self {
        Self {
            nick: default_nick(),
            master: default_master(),
            command_prefix: default_command_prefix(),
            channels: default_channels(),
            auth_mode: AuthMode::default(),
            identity_service: default_identity_service(),
            sasl_password: None,
        }
    }
}

impl BotConfig {
    /// The master's nickname (the part before `:`).
    pub fn master_nick(&self) -> &str {
        self.master
            .split_once(':')
            .map(|(nick, _)| nick)
            .unwrap_or(&self.master)
    }

    /// The privileged sub-prefix (the part after `:`), if configured.
    pub fn master_prefix(&self) -> Option<&str> {
        self.master
            .split_once(':')
            .map(|(_, prefix)| prefix)
            .filter(|prefix| !prefix.is_empty())
    }

    /// Configured channels, empty entries skipped.
    pub fn channel_list(&self) -> impl Iterator<Item = &str> {
        self.channels
            .split(',')
            .map(str::trim)
            .filter(|c| !c.is_empty())
    }
}

/// Feature toggles.
#[derive(Debug, Clone, Deserialize)]
pub struct FeaturesConfig {
    /// Fetch titles for links posted in chat.
    #[serde(default)]
    pub links: bool,
    /// Allow `define` to store new definitions.
    #[serde(default = "default_true")]
    pub define: bool,
    /// Karma shorthand (`nick+`, `nick-`, thanks).
    #[serde(default = "default_true")]
    pub karma: bool,
    /// Remember the last line per nick for `seen`.
    #[serde(default = "default_true")]
    pub history: bool,
    /// Raise log level to debug.
    #[serde(default)]
    pub verbose: bool,
}

impl Default for FeaturesConfig {
    fn default() -> Self {
        Self {
            links: false,
            define: true,
            karma: true,
            history: true,
            verbose: false,
        }
    }
}

/// Storage backend selector.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    /// redb file on disk.
    #[default]
    Redb,
    /// Process memory; nothing survives a restart.
    Memory,
}

/// Database configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    #[serde(default)]
    pub backend: StoreBackend,
    /// Path to the redb file.
    #[serde(default = "default_database_path")]
    pub path: String,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            backend: StoreBackend::default(),
            path: default_database_path(),
        }
    }
}

/// Control socket configuration.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ControlConfig {
    /// Unix socket path; no socket when unset.
    pub socket: Option<PathBuf>,
}
