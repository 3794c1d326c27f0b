//! Config file discovery and layered loading.
//!
//! `Config::load()` works as follows:
//! 1. Parse the embedded `defaults.toml` into the base tree
//! 2. Merge the `ELEVATE_*` environment overlay
//! 3. Merge `~/.elevate/config.toml` (user), if present
//! 4. Merge the explicit `--config` file, which must exist
//! 5. Deserialize the merged tree into [`Config`]
//! 6. Validate

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::env::{collect_env_vars, env_overlay};
use crate::error::{ConfigError, ConfigResult};
use crate::merge::deep_merge;
use crate::show::ResolvedConfig;
use crate::types::Config;
use crate::validate;

/// Embedded default configuration.
const DEFAULTS_TOML: &str = include_str!("defaults.toml");

/// Maximum allowed config file size (1 MiB).
const MAX_CONFIG_FILE_SIZE: usize = 1_048_576;

/// Directory under the home directory holding the user config.
const USER_CONFIG_DIR: &str = ".elevate";

/// Load the layered configuration from the process environment.
///
/// `explicit` is a file named on the command line. `home_override`
/// replaces the user's home directory for discovery of
/// `.elevate/config.toml`.
///
/// # Errors
///
/// Returns a [`ConfigError`] if a file is malformed, the explicit file is
/// missing, an environment variable is unusable, or the merged
/// configuration fails validation.
pub fn load(explicit: Option<&Path>, home_override: Option<&Path>) -> ConfigResult<ResolvedConfig> {
    let home = match home_override {
        Some(h) => h.to_path_buf(),
        None => home_directory()?,
    };
    load_with_env(explicit, &home, &collect_env_vars())
}

/// Load with an explicit home directory and environment snapshot.
///
/// # Errors
///
/// See [`load`].
pub fn load_with_env(
    explicit: Option<&Path>,
    home: &Path,
    env: &HashMap<String, String>,
) -> ConfigResult<ResolvedConfig> {
    // 1. Defaults.
    let mut merged = defaults()?;
    let mut loaded_files = Vec::new();

    // 2. Environment.
    let (overlay, env_vars) = env_overlay(env)?;
    if !env_vars.is_empty() {
        deep_merge(&mut merged, &overlay);
        debug!(vars = ?env_vars, "applied environment variable fallbacks");
    }

    // 3. User file.
    let user_path = user_config_path(home);
    if let Some(overlay) = try_load_file(&user_path)? {
        deep_merge(&mut merged, &overlay);
        loaded_files.push(user_path.display().to_string());
        info!(path = %user_path.display(), "loaded user config");
    }

    // 4. Explicit file.
    if let Some(path) = explicit {
        deep_merge(&mut merged, &load_required(path)?);
        loaded_files.push(path.display().to_string());
        info!(path = %path.display(), "loaded config file");
    }

    // 5-6. Deserialize and validate.
    Ok(ResolvedConfig {
        config: finish(merged)?,
        loaded_files,
        env_vars,
    })
}

/// Load a config from a single file on top of the embedded defaults.
///
/// The environment and user file are ignored.
///
/// # Errors
///
/// Returns a [`ConfigError`] if the file cannot be read, parsed, or fails
/// validation.
pub fn load_file(path: &Path) -> ConfigResult<Config> {
    let mut merged = defaults()?;
    deep_merge(&mut merged, &load_required(path)?);
    finish(merged)
}

fn defaults() -> ConfigResult<toml::Value> {
    toml::from_str(DEFAULTS_TOML).map_err(|e| ConfigError::ParseError {
        path: "<embedded defaults>".to_owned(),
        source: e,
    })
}

fn finish(merged: toml::Value) -> ConfigResult<Config> {
    let config: Config = merged
        .try_into()
        .map_err(|e: toml::de::Error| ConfigError::ParseError {
            path: "<merged config>".to_owned(),
            source: e,
        })?;
    validate::validate(&config)?;
    Ok(config)
}

/// Like [`try_load_file`], but a missing file is an error.
fn load_required(path: &Path) -> ConfigResult<toml::Value> {
    try_load_file(path)?.ok_or_else(|| ConfigError::ReadError {
        path: path.display().to_string(),
        source: std::io::Error::from(std::io::ErrorKind::NotFound),
    })
}

/// `<home>/.elevate/config.toml`
#[must_use]
pub fn user_config_path(home: &Path) -> PathBuf {
    home.join(USER_CONFIG_DIR).join("config.toml")
}

/// The user config path under the current user's home directory.
///
/// # Errors
///
/// Returns [`ConfigError::NoHomeDir`] if the home directory is unknown.
pub fn default_user_config_path() -> ConfigResult<PathBuf> {
    Ok(user_config_path(&home_directory()?))
}

/// Try to load a file, returning `None` if it doesn't exist.
///
/// Reads once and checks the size afterwards, so there is no window between
/// a metadata check and the read.
fn try_load_file(path: &Path) -> ConfigResult<Option<toml::Value>> {
    let content = match std::fs::read_to_string(path) {
        Ok(c) => c,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            debug!(path = %path.display(), "config file not found, skipping");
            return Ok(None);
        },
        Err(e) => {
            return Err(ConfigError::ReadError {
                path: path.display().to_string(),
                source: e,
            });
        },
    };

    if content.len() > MAX_CONFIG_FILE_SIZE {
        return Err(ConfigError::ValidationError {
            field: path.display().to_string(),
            message: format!(
                "config file is {} bytes, exceeding the {MAX_CONFIG_FILE_SIZE} byte limit",
                content.len()
            ),
        });
    }

    let value = toml::from_str(&content).map_err(|e| ConfigError::ParseError {
        path: path.display().to_string(),
        source: e,
    })?;
    Ok(Some(value))
}

fn home_directory() -> ConfigResult<PathBuf> {
    directories::BaseDirs::new()
        .map(|d| d.home_dir().to_path_buf())
        .ok_or(ConfigError::NoHomeDir)
}
