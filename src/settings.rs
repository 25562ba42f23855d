//! Layered tool settings: built-in defaults → user config file → env vars.
//!
//! The config file lives at `~/.config/keyway/config.toml` (respecting
//! `$XDG_CONFIG_HOME`). All fields are optional so a partial file merges
//! cleanly on top of the defaults. `KEYWAY_*` environment variables are
//! applied last.

use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::keys::KeyAlgorithm;
use crate::paths::{expand_tilde, home_dir};
use crate::KeywayError;

/// Returns the user-level config file path.
pub fn user_config_path() -> PathBuf {
    let config_home = env::var("XDG_CONFIG_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| home_dir().join(".config"));
    config_home.join("keyway/config.toml")
}

// ---------------------------------------------------------------------------
// Settings
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct Settings {
    /// SSH directory override. `None` means `~/.ssh`.
    pub ssh_dir: Option<PathBuf>,
    /// Algorithm pre-selected in the generate-key prompt.
    pub default_algorithm: KeyAlgorithm,
    /// Connect timeout for the non-interactive probe, in seconds.
    pub connect_timeout_secs: u64,
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            ssh_dir: None,
            default_algorithm: KeyAlgorithm::Ed25519,
            connect_timeout_secs: 5,
        }
    }
}

impl Settings {
    /// Load settings with full layered resolution:
    /// built-in defaults → user config file → environment variables.
    pub fn load() -> Result<Self, KeywayError> {
        let mut settings = Settings::default();

        let user_path = user_config_path();
        if user_path.exists() {
            let toml_settings = load_toml_file(&user_path)?;
            merge_toml(&mut settings, toml_settings)?;
        }

        apply_env_vars(&mut settings);
        Ok(settings)
    }
}

// ---------------------------------------------------------------------------
// TOML deserialization
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize, Default)]
struct TomlSettings {
    ssh_dir: Option<String>,
    default_algorithm: Option<String>,
    connect_timeout_secs: Option<u64>,
}

fn load_toml_file(path: &Path) -> Result<TomlSettings, KeywayError> {
    let content = fs::read_to_string(path).map_err(|e| {
        KeywayError::Settings(format!("Cannot read config file {}: {}", path.display(), e))
    })?;
    toml::from_str(&content).map_err(|e| {
        KeywayError::Settings(format!("Malformed config file {}: {}", path.display(), e))
    })
}

fn merge_toml(settings: &mut Settings, toml: TomlSettings) -> Result<(), KeywayError> {
    if let Some(v) = &toml.ssh_dir {
        if !v.is_empty() {
            settings.ssh_dir = Some(expand_tilde(v));
        }
    }
    if let Some(v) = &toml.default_algorithm {
        settings.default_algorithm = KeyAlgorithm::parse(v).ok_or_else(|| {
            KeywayError::Settings(format!(
                "Unknown algorithm '{}': expected ed25519 or rsa",
                v
            ))
        })?;
    }
    if let Some(v) = toml.connect_timeout_secs {
        if v == 0 {
            return Err(KeywayError::Settings(
                "connect_timeout_secs must be at least 1".to_string(),
            ));
        }
        settings.connect_timeout_secs = v;
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Environment variables
// ---------------------------------------------------------------------------

fn apply_env_vars(settings: &mut Settings) {
    if let Ok(v) = env::var("KEYWAY_SSH_DIR") {
        if !v.is_empty() {
            settings.ssh_dir = Some(expand_tilde(&v));
        }
    }
    if let Ok(v) = env::var("KEYWAY_ALGORITHM") {
        if let Some(algo) = KeyAlgorithm::parse(&v) {
            settings.default_algorithm = algo;
        }
    }
    if let Ok(v) = env::var("KEYWAY_CONNECT_TIMEOUT") {
        if let Ok(secs) = v.parse::<u64>() {
            if secs > 0 {
                settings.connect_timeout_secs = secs;
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
