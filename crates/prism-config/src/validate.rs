//! Post-merge configuration validation.

use crate::error::{ConfigError, ConfigResult};
use crate::types::{AssetSourceKind, Config, StorageBackend};

/// Upper bound on chained fallback launches.
pub const MAX_FALLBACK_DEPTH: u8 = 8;

/// Validate a fully-merged and deserialized configuration.
///
/// # Errors
///
/// Returns the first validation error found.
pub fn validate(config: &Config) -> ConfigResult<()> {
    validate_storage(config)?;
    validate_vfs(config)?;
    validate_runtime(config)?;
    validate_assets(config)?;
    validate_logging(config)?;
    Ok(())
}

fn invalid(field: &str, message: impl Into<String>) -> ConfigError {
    ConfigError::ValidationError {
        field: field.to_owned(),
        message: message.into(),
    }
}

fn validate_storage(config: &Config) -> ConfigResult<()> {
    if config.storage.backend == StorageBackend::Dir && config.storage.path.is_none() {
        return Err(invalid(
            "storage.path",
            "the dir backend requires a storage path",
        ));
    }
    Ok(())
}

fn validate_vfs(config: &Config) -> ConfigResult<()> {
    if config.vfs.index_flush_interval_secs == 0 {
        return Err(invalid(
            "vfs.index_flush_interval_secs",
            "index flush interval must be at least one second",
        ));
    }
    Ok(())
}

fn validate_runtime(config: &Config) -> ConfigResult<()> {
    let r = &config.runtime;

    if !r.fallback_app.starts_with('/') {
        return Err(invalid(
            "runtime.fallback_app",
            format!("'{}' is not an absolute VFS path", r.fallback_app),
        ));
    }

    if r.max_fallback_depth > MAX_FALLBACK_DEPTH {
        return Err(invalid(
            "runtime.max_fallback_depth",
            format!("max_fallback_depth must be at most {MAX_FALLBACK_DEPTH}"),
        ));
    }

    if !r.app_styles_path.starts_with('/') {
        return Err(invalid(
            "runtime.app_styles_path",
            format!("'{}' is not an absolute VFS path", r.app_styles_path),
        ));
    }

    Ok(())
}

fn validate_assets(config: &Config) -> ConfigResult<()> {
    let a = &config.assets;
    let needs_location = matches!(a.source, AssetSourceKind::Dir | AssetSourceKind::Http);
    if needs_location && a.location.as_deref().is_none_or(str::is_empty) {
        return Err(invalid(
            "assets.location",
            "dir and http asset sources require a location",
        ));
    }
    if a.source == AssetSourceKind::Http
        && let Some(location) = &a.location
        && !(location.starts_with("http://") || location.starts_with("https://"))
    {
        return Err(invalid(
            "assets.location",
            format!("'{location}' is not an http(s) URL"),
        ));
    }
    Ok(())
}

fn validate_logging(config: &Config) -> ConfigResult<()> {
    let valid_levels = ["trace", "debug", "info", "warn", "error"];
    if !valid_levels.contains(&config.logging.level.as_str()) {
        return Err(invalid(
            "logging.level",
            format!(
                "unsupported log level '{}'; expected one of: {}",
                config.logging.level,
                valid_levels.join(", ")
            ),
        ));
    }

    let valid_formats = ["pretty", "compact", "json", "full"];
    if !valid_formats.contains(&config.logging.format.as_str()) {
        return Err(invalid(
            "logging.format",
            format!(
                "unsupported log format '{}'; expected one of: {}",
                config.logging.format,
                valid_formats.join(", ")
            ),
        ));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn field_of(result: ConfigResult<()>) -> String {
        match result {
            Err(ConfigError::ValidationError { field, .. }) => field,
            other => panic!("expected validation error, got {other:?}"),
        }
    }

    #[test]
    fn test_defaults_are_valid() {
        validate(&Config::default()).unwrap();
    }

    #[test]
    fn test_zero_flush_interval_rejected() {
        let mut config = Config::default();
        config.vfs.index_flush_interval_secs = 0;
        assert_eq!(field_of(validate(&config)), "vfs.index_flush_interval_secs");
    }

    #[test]
    fn test_relative_fallback_rejected() {
        let mut config = Config::default();
        config.runtime.fallback_app = "malformedapp.app".to_owned();
        assert_eq!(field_of(validate(&config)), "runtime.fallback_app");
    }

    #[test]
    fn test_fallback_depth_bounded() {
        let mut config = Config::default();
        config.runtime.max_fallback_depth = MAX_FALLBACK_DEPTH;
        validate(&config).unwrap();
        config.runtime.max_fallback_depth = 9;
        assert_eq!(field_of(validate(&config)), "runtime.max_fallback_depth");
    }

    #[test]
    fn test_dir_backend_requires_path() {
        let mut config = Config::default();
        config.storage.backend = StorageBackend::Dir;
        assert_eq!(field_of(validate(&config)), "storage.path");
        config.storage.path = Some("/tmp/prism".into());
        validate(&config).unwrap();
    }

    #[test]
    fn test_asset_source_requires_location() {
        let mut config = Config::default();
        config.assets.source = AssetSourceKind::Http;
        assert_eq!(field_of(validate(&config)), "assets.location");
        config.assets.location = Some("ftp://example.org".to_owned());
        assert_eq!(field_of(validate(&config)), "assets.location");
        config.assets.location = Some("https://example.org/desktop/".to_owned());
        validate(&config).unwrap();
    }

    #[test]
    fn test_unknown_log_level_rejected() {
        let mut config = Config::default();
        config.logging.level = "loud".to_owned();
        assert_eq!(field_of(validate(&config)), "logging.level");
    }
}
