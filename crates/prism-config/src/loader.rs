//! Config file discovery and layered loading.
//!
//! Implements the `Config::load()` algorithm:
//! 1. Parse `defaults.toml` → base
//! 2. Merge `<config dir>/prism/config.toml` (user)
//! 3. Merge the file named by the host (`--config`), which must exist
//! 4. Apply `PRISM_*` environment overrides
//! 5. Deserialize merged tree → `Config`
//! 6. Validate

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::error::{ConfigError, ConfigResult};
use crate::types::Config;
use crate::validate;

/// Embedded default configuration.
const DEFAULTS_TOML: &str = include_str!("defaults.toml");

/// Maximum allowed config file size (1 MB).
const MAX_CONFIG_FILE_SIZE: u64 = 1_048_576;

/// Overrides the global log level.
pub const ENV_LOG_LEVEL: &str = "PRISM_LOG_LEVEL";
/// Switches storage to the `dir` backend rooted at the given directory.
pub const ENV_DATA_DIR: &str = "PRISM_DATA_DIR";
/// Switches assets to the `http` source at the given base URL.
pub const ENV_ASSET_URL: &str = "PRISM_ASSET_URL";

/// A validated configuration and the files it was assembled from.
#[derive(Debug, Clone)]
pub struct LoadedConfig {
    /// The final configuration.
    pub config: Config,
    /// Config files merged over the defaults, lowest precedence first.
    pub loaded_files: Vec<String>,
}

/// Load the configuration with the full precedence chain.
///
/// # Errors
///
/// Returns a [`ConfigError`] if a config file is unreadable or malformed,
/// an override variable is empty, or the merged result fails validation.
pub fn load(explicit: Option<&Path>) -> ConfigResult<LoadedConfig> {
    load_layers(user_config_path().as_deref(), explicit, &collect_env_vars())
}

/// Load from an explicit set of layers. `user` may be absent on disk;
/// `explicit` may not.
///
/// # Errors
///
/// See [`load`].
pub fn load_layers(
    user: Option<&Path>,
    explicit: Option<&Path>,
    env_vars: &HashMap<String, String>,
) -> ConfigResult<LoadedConfig> {
    let mut merged: toml::Value =
        toml::from_str(DEFAULTS_TOML).map_err(|e| ConfigError::ParseError {
            path: "<embedded defaults>".to_owned(),
            source: e,
        })?;
    let mut loaded_files = Vec::new();

    if let Some(path) = user
        && let Some(overlay) = try_load_file(path)?
    {
        deep_merge(&mut merged, &overlay);
        loaded_files.push(path.display().to_string());
        info!(path = %path.display(), "loaded user config");
    }

    if let Some(path) = explicit {
        let overlay = read_file(path)?;
        deep_merge(&mut merged, &overlay);
        loaded_files.push(path.display().to_string());
        info!(path = %path.display(), "loaded config file");
    }

    let env_count = apply_env_overrides(&mut merged, env_vars)?;
    if env_count > 0 {
        debug!(count = env_count, "applied environment variable overrides");
    }

    let config: Config =
        merged
            .try_into()
            .map_err(|e: toml::de::Error| ConfigError::ParseError {
                path: "<merged config>".to_owned(),
                source: e,
            })?;

    validate::validate(&config)?;

    Ok(LoadedConfig {
        config,
        loaded_files,
    })
}

/// Load a config from a specific file path (no layering, no defaults file).
///
/// # Errors
///
/// Returns a [`ConfigError`] if the file cannot be read, parsed or validated.
pub fn load_file(path: &Path) -> ConfigResult<Config> {
    let value = read_file(path)?;
    let config: Config = value
        .try_into()
        .map_err(|e: toml::de::Error| ConfigError::ParseError {
            path: path.display().to_string(),
            source: e,
        })?;
    validate::validate(&config)?;
    Ok(config)
}

/// `<config dir>/prism/config.toml`, if the platform has a config dir.
#[must_use]
pub fn user_config_path() -> Option<PathBuf> {
    directories::BaseDirs::new().map(|d| d.config_dir().join("prism").join("config.toml"))
}

/// Recursively deep-merge `overlay` into `base`.
///
/// - Tables merge recursively per-field.
/// - Scalars and arrays from the overlay **replace** the base value.
pub fn deep_merge(base: &mut toml::Value, overlay: &toml::Value) {
    match (base, overlay) {
        (toml::Value::Table(base_table), toml::Value::Table(overlay_table)) => {
            for (key, overlay_val) in overlay_table {
                if let Some(base_val) = base_table.get_mut(key) {
                    deep_merge(base_val, overlay_val);
                } else {
                    base_table.insert(key.clone(), overlay_val.clone());
                }
            }
        },
        (base, overlay) => {
            *base = overlay.clone();
        },
    }
}

fn collect_env_vars() -> HashMap<String, String> {
    std::env::vars()
        .filter(|(k, _)| k.starts_with("PRISM_"))
        .collect()
}

/// Apply `PRISM_*` overrides. Returns how many were applied.
fn apply_env_overrides(
    merged: &mut toml::Value,
    env_vars: &HashMap<String, String>,
) -> ConfigResult<usize> {
    let mut count = 0_usize;
    let mut overlay = toml::Table::new();

    let non_empty = |var: &str| -> ConfigResult<Option<String>> {
        match env_vars.get(var) {
            None => Ok(None),
            Some(v) if v.trim().is_empty() => Err(ConfigError::EnvError {
                var_name: var.to_owned(),
                message: "value is empty".to_owned(),
            }),
            Some(v) => Ok(Some(v.trim().to_owned())),
        }
    };

    if let Some(level) = non_empty(ENV_LOG_LEVEL)? {
        overlay.insert("logging".to_owned(), section([("level", level)]));
        count = count.saturating_add(1);
    }
    if let Some(dir) = non_empty(ENV_DATA_DIR)? {
        overlay.insert(
            "storage".to_owned(),
            section([("backend", "dir".to_owned()), ("path", dir)]),
        );
        count = count.saturating_add(1);
    }
    if let Some(url) = non_empty(ENV_ASSET_URL)? {
        overlay.insert(
            "assets".to_owned(),
            section([("source", "http".to_owned()), ("location", url)]),
        );
        count = count.saturating_add(1);
    }

    deep_merge(merged, &toml::Value::Table(overlay));
    Ok(count)
}

fn section<const N: usize>(fields: [(&str, String); N]) -> toml::Value {
    toml::Value::Table(
        fields
            .into_iter()
            .map(|(k, v)| (k.to_owned(), toml::Value::String(v)))
            .collect(),
    )
}

/// Read and parse a file that must exist.
fn read_file(path: &Path) -> ConfigResult<toml::Value> {
    let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
        path: path.display().to_string(),
        source: e,
    })?;
    parse_checked(path, &content)
}

/// Try to load a file, returning `None` if the file doesn't exist.
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
    parse_checked(path, &content).map(Some)
}

fn parse_checked(path: &Path, content: &str) -> ConfigResult<toml::Value> {
    let len = u64::try_from(content.len()).unwrap_or(u64::MAX);
    if len > MAX_CONFIG_FILE_SIZE {
        return Err(ConfigError::ValidationError {
            field: path.display().to_string(),
            message: format!(
                "config file is {len} bytes, exceeding the {MAX_CONFIG_FILE_SIZE} byte limit"
            ),
        });
    }

    toml::from_str(content).map_err(|e| ConfigError::ParseError {
        path: path.display().to_string(),
        source: e,
    })
}
