//! Bridge from `prism_config::Config` to the telemetry setup.

use prism_config::Config;
use prism_telemetry::{LogConfig, LogFormat};

/// Logging settings from the unified config.
///
/// An unrecognised format falls back to compact; validation has normally
/// rejected it already.
#[must_use]
pub(crate) fn to_log_config(cfg: &Config) -> LogConfig {
    let format = cfg.logging.format.parse().unwrap_or(LogFormat::Compact);
    let mut log = LogConfig::new(cfg.logging.level.clone()).with_format(format);
    for directive in &cfg.logging.directives {
        log = log.with_directive(directive.clone());
    }
    log
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_config_follows_logging_section() {
        let mut cfg = Config::default();
        cfg.logging.level = "warn".into();
        cfg.logging.format = "json".into();
        cfg.logging.directives = vec!["prism_vfs=debug".into()];

        let log = to_log_config(&cfg);
        assert_eq!(log.level, "warn");
        assert_eq!(log.format, LogFormat::Json);
        assert_eq!(log.directives, vec!["prism_vfs=debug"]);
    }
}
