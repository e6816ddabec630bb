// SPDX-License-Identifier: MIT
//! Save/load options and environment-driven storage configuration

use serde::Deserialize;

use crate::error::{Result, SqdocError};

/// Password-based encryption request
#[derive(Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct EncryptionOptions {
    pub enabled: bool,
    pub password: String,
}

impl EncryptionOptions {
    pub fn with_password(password: impl Into<String>) -> Self {
        Self {
            enabled: true,
            password: password.into(),
        }
    }
}

impl std::fmt::Debug for EncryptionOptions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EncryptionOptions")
            .field("enabled", &self.enabled)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Options for `save_with_options`
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct SaveOptions {
    /// zlib-compress the container before any encryption
    pub compression: bool,
    pub encryption: EncryptionOptions,
}

impl SaveOptions {
    /// Whether the container gets wrapped in a secure envelope
    pub fn wraps(&self) -> bool {
        self.compression || self.encryption.enabled
    }
}

/// Options for `load_with_options`
#[derive(Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct LoadOptions {
    pub password: String,
}

impl LoadOptions {
    pub fn with_password(password: impl Into<String>) -> Self {
        Self {
            password: password.into(),
        }
    }
}

impl std::fmt::Debug for LoadOptions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoadOptions")
            .field("password", &"<redacted>")
            .finish()
    }
}

/// File-system behaviour of `save`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// fsync the temp file before renaming it over the target
    pub durable_writes: bool,
    /// Create missing parent directories of the target
    pub create_parent_dirs: bool,
    /// Extension of the sibling temp file
    pub temp_suffix: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            durable_writes: true,
            create_parent_dirs: true,
            temp_suffix: "tmp".to_string(),
        }
    }
}

impl Config {
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            durable_writes: env_bool("SQDOC_DURABLE_WRITES").unwrap_or(defaults.durable_writes),
            create_parent_dirs: env_bool("SQDOC_CREATE_PARENT_DIRS")
                .unwrap_or(defaults.create_parent_dirs),
            temp_suffix: std::env::var("SQDOC_TEMP_SUFFIX").unwrap_or(defaults.temp_suffix),
        }
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if self.temp_suffix.is_empty() {
            return Err(SqdocError::Config(
                "SQDOC_TEMP_SUFFIX cannot be empty".to_string(),
            ));
        }
        if !self.temp_suffix.chars().all(|c| c.is_ascii_alphanumeric()) {
            return Err(SqdocError::Config(format!(
                "SQDOC_TEMP_SUFFIX must be ASCII alphanumeric, got {:?}",
                self.temp_suffix
            )));
        }
        Ok(())
    }
}

fn env_bool(name: &str) -> Option<bool> {
    let value = std::env::var(name).ok()?;
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
