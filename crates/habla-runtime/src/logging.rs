//! Structured logging setup with tracing.

use std::str::FromStr;

use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Logging format options.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    /// Human-readable text format.
    #[default]
    Text,
    /// JSON format for log aggregation.
    Json,
}

impl FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "text" | "pretty" => Ok(Self::Text),
            "json" => Ok(Self::Json),
            other => Err(format!("unknown log format: {other}")),
        }
    }
}

/// Initialize the logging subsystem.
///
/// `RUST_LOG` overrides `level` when set. Safe to call more than once; only
/// the first call installs the subscriber.
pub fn init_logging(level: &str, format: LogFormat) {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    match format {
        LogFormat::Text => {
            let subscriber = tracing_subscriber::registry()
                .with(env_filter)
                .with(fmt::layer().with_target(true));
            let _ = tracing::subscriber::set_global_default(subscriber);
        }
        LogFormat::Json => {
            let subscriber = tracing_subscriber::registry()
                .with(env_filter)
                .with(fmt::layer().json().with_target(true).with_current_span(false));
            let _ = tracing::subscriber::set_global_default(subscriber);
        }
    }
}

/// Initialize logging from a [`LoggingConfig`], falling back to the text
/// format when the configured format string is unrecognized.
pub fn init_from_config(config: &habla_core::LoggingConfig) {
    let format = config.format.parse().unwrap_or_default();
    init_logging(&config.level, format);
}
