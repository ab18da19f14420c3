//! Log subscriber setup.
//!
//! Logging is switched on and filtered by configuration only; nothing is
//! read from the process environment.

use tracing_subscriber::EnvFilter;

use crate::config::LoggingConfig;

/// Filter directive to use, with an optional CLI override.
pub fn directive<'a>(config: &'a LoggingConfig, cli_level: Option<&'a str>) -> Option<&'a str> {
    if !config.enabled {
        return None;
    }
    Some(cli_level.unwrap_or(&config.level))
}

/// Install the global subscriber. Returns `false` when logging is off.
pub fn init(config: &LoggingConfig, cli_level: Option<&str>) -> bool {
    let Some(level) = directive(config, cli_level) else {
        return false;
    };
    let filter = EnvFilter::try_new(level).unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init()
        .is_ok()
}
