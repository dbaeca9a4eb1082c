//! Global configuration parsing and validation.

use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::{AppError, Result};

/// Identity metadata presented to the protocol peer at initialization.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub struct ServerConfig {
    /// Server name reported in the initialize response.
    #[serde(default = "default_server_name")]
    pub name: String,
    /// Server version reported in the initialize response.
    #[serde(default = "default_server_version")]
    pub version: String,
    /// Optional usage instructions surfaced to the peer.
    #[serde(default)]
    pub instructions: Option<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            name: default_server_name(),
            version: default_server_version(),
            instructions: None,
        }
    }
}

fn default_server_name() -> String {
    env!("CARGO_PKG_NAME").to_string()
}

fn default_server_version() -> String {
    env!("CARGO_PKG_VERSION").to_string()
}

/// Capability categories declared at protocol-server construction.
///
/// All default to off; an empty declaration is valid.
#[derive(Debug, Clone, Copy, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub struct CapabilitiesConfig {
    /// Advertise the tools capability.
    #[serde(default)]
    pub tools: bool,
    /// Advertise the resources capability.
    #[serde(default)]
    pub resources: bool,
    /// Advertise the prompts capability.
    #[serde(default)]
    pub prompts: bool,
}

/// Application-service settings consumed by the service context.
#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub struct ServicesConfig {
    /// Append-only lifecycle audit log; disabled when absent.
    #[serde(default)]
    pub audit_log: Option<PathBuf>,
}

/// Global configuration parsed from `config.toml`.
#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub struct GlobalConfig {
    /// Identity metadata for the protocol server.
    #[serde(default)]
    pub server: ServerConfig,
    /// Declared capability categories.
    #[serde(default)]
    pub capabilities: CapabilitiesConfig,
    /// Application-service settings.
    #[serde(default)]
    pub services: ServicesConfig,
}

impl GlobalConfig {
    /// Parse a TOML document into a validated configuration.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Config`] on malformed TOML or failed validation.
    pub fn from_toml_str(text: &str) -> Result<Self> {
        let config: Self = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from an optional file path.
    ///
    /// Defaults apply when no path is given.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Config`] if the file cannot be read, parsed, or
    /// validated.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => {
                let text = fs::read_to_string(path).map_err(|err| {
                    AppError::Config(format!("cannot read config {}: {err}", path.display()))
                })?;
                Self::from_toml_str(&text)
            }
            None => Ok(Self::default()),
        }
    }

    fn validate(&self) -> Result<()> {
        if self.server.name.trim().is_empty() {
            return Err(AppError::Config("server.name must not be empty".into()));
        }
        if self.server.version.trim().is_empty() {
            return Err(AppError::Config("server.version must not be empty".into()));
        }
        Ok(())
    }
}
