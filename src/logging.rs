//! Structured logging setup using tracing.
//!
//! Logs go to stderr; stdout is reserved for JSON results.

use tracing_subscriber::EnvFilter;

use crate::config::{LogFormat, LoggingConfig};

/// Install the global subscriber.
///
/// `RUST_LOG` wins when set; otherwise the filter is `sii_chile=<level>`.
///
/// # Errors
///
/// A global subscriber is already installed.
pub fn init_logging(config: &LoggingConfig) -> Result<(), String> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("sii_chile={}", config.level.to_lowercase())));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(true);

    let result = match config.format {
        LogFormat::Json => builder.json().with_current_span(true).try_init(),
        LogFormat::Pretty => builder.try_init(),
    };
    result.map_err(|e| format!("failed to initialize logging: {e}"))
}
