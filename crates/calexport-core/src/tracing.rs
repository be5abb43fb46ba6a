//! Tracing setup for calexport.
//!
//! ```ignore
//! use calexport_core::tracing::{init_tracing, TracingConfig};
//!
//! init_tracing(TracingConfig::for_debug(false))?;
//! ```

use thiserror::Error;
use tracing::Level;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

/// Errors that can occur during tracing initialization
#[derive(Debug, Error)]
pub enum TracingError {
    #[error("failed to set global tracing subscriber: {0}")]
    SetGlobalSubscriber(#[from] tracing::subscriber::SetGlobalDefaultError),
}

/// Configuration for tracing initialization
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TracingConfig {
    /// The default log level when RUST_LOG is not set
    pub default_level: Level,
    /// Whether to include file/line information in logs
    pub include_location: bool,
    /// Whether to include target (module path) in logs
    pub include_target: bool,
}

impl Default for TracingConfig {
    fn default() -> Self {
        Self {
            default_level: Level::WARN,
            include_location: false,
            include_target: false,
        }
    }
}

impl TracingConfig {
    /// Verbose config used when `debug` is enabled
    #[must_use]
    pub fn cli_debug() -> Self {
        Self {
            default_level: Level::DEBUG,
            include_location: true,
            include_target: true,
        }
    }

    /// Picks [`TracingConfig::cli_debug`] or the default from the `debug` setting
    #[must_use]
    pub fn for_debug(debug: bool) -> Self {
        if debug {
            Self::cli_debug()
        } else {
            Self::default()
        }
    }
}

/// Crates whose events are shown at the default level.
const LOG_TARGETS: &[&str] = &["calexport", "calexport_cli", "calexport_core", "calexport_providers"];

fn default_directives(level: Level) -> String {
    LOG_TARGETS
        .iter()
        .map(|target| format!("{target}={level}"))
        .collect::<Vec<_>>()
        .join(",")
}

fn env_filter(config: &TracingConfig) -> EnvFilter {
    EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directives(config.default_level)))
}

/// Installs the global subscriber: compact lines on stderr, no timestamps.
///
/// `RUST_LOG` takes precedence over `default_level`.
///
/// # Errors
///
/// Returns an error if the global subscriber has already been set.
pub fn init_tracing(config: TracingConfig) -> Result<(), TracingError> {
    let layer = fmt::layer()
        .with_writer(std::io::stderr)
        .compact()
        .without_time()
        .with_file(config.include_location)
        .with_line_number(config.include_location)
        .with_target(config.include_target);

    let subscriber = tracing_subscriber::registry()
        .with(env_filter(&config))
        .with(layer);
    tracing::subscriber::set_global_default(subscriber)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = TracingConfig::default();
        assert_eq!(config.default_level, Level::WARN);
        assert!(!config.include_location);
        assert!(!config.include_target);
    }

    #[test]
    fn test_cli_debug_config() {
        let config = TracingConfig::cli_debug();
        assert_eq!(config.default_level, Level::DEBUG);
        assert!(config.include_location);
        assert!(config.include_target);
    }

    #[test]
    fn test_for_debug() {
        assert_eq!(TracingConfig::for_debug(true), TracingConfig::cli_debug());
        assert_eq!(TracingConfig::for_debug(false), TracingConfig::default());
    }

    #[test]
    fn test_default_directives_cover_all_crates() {
        let directives = default_directives(Level::DEBUG);
        assert_eq!(
            directives,
            "calexport=DEBUG,calexport_cli=DEBUG,calexport_core=DEBUG,calexport_providers=DEBUG"
        );
        assert!(EnvFilter::try_new(&directives).is_ok());
    }
}
