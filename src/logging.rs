//! Logging initialization and configuration

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing_subscriber::{
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
    EnvFilter, Layer, Registry,
};

/// Logging errors
#[derive(Error, Debug)]
pub enum LoggingError {
    /// A global subscriber is already installed, or the filter is invalid
    #[error("Logging initialization failed: {0}")]
    Init(String),
}

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    /// Log level or filter directive (`RUST_LOG` wins when set)
    pub level: String,

    /// Log format (json, text, compact)
    pub format: LogFormat,

    /// Enable ANSI colors
    pub color: bool,

    /// Include target in log output
    pub include_target: bool,

    /// Include file location in log output
    pub include_location: bool,

    /// Include span events
    pub span_events: bool,
}

/// Log output format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Human-readable text format
    #[default]
    Text,
    /// Compact single-line format
    Compact,
    /// JSON format for machine parsing
    Json,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::Text,
            color: true,
            include_target: true,
            include_location: false,
            span_events: false,
        }
    }
}

impl LogConfig {
    /// Filter built from `RUST_LOG`, falling back to `level`
    pub fn env_filter(&self) -> Result<EnvFilter, LoggingError> {
        match EnvFilter::try_from_default_env() {
            Ok(filter) => Ok(filter),
            Err(_) => EnvFilter::try_new(&self.level)
                .map_err(|e| LoggingError::Init(format!("bad level {:?}: {}", self.level, e))),
        }
    }
}

/// Output layer for the configured format
type OutputLayer = Box<dyn Layer<Registry> + Send + Sync>;

fn output_layer(config: &LogConfig) -> OutputLayer {
    let span_events = if config.span_events {
        FmtSpan::NEW | FmtSpan::CLOSE
    } else {
        FmtSpan::NONE
    };
    let base = fmt::layer()
        .with_target(config.include_target)
        .with_span_events(span_events);

    match config.format {
        LogFormat::Text => base
            .with_ansi(config.color)
            .with_file(config.include_location)
            .with_line_number(config.include_location)
            .boxed(),
        LogFormat::Compact => base.compact().with_ansi(config.color).boxed(),
        LogFormat::Json => base
            .json()
            .with_file(config.include_location)
            .with_line_number(config.include_location)
            .boxed(),
    }
}

/// Install the global `tracing` subscriber
///
/// Fails instead of panicking when a subscriber is already installed.
pub fn init_logging(config: &LogConfig) -> Result<(), LoggingError> {
    let filter = config.env_filter()?;

    tracing_subscriber::registry()
        .with(output_layer(config))
        .with(filter)
        .try_init()
        .map_err(|e| LoggingError::Init(e.to_string()))?;

    tracing::info!(
        target: "hw::logging",
        level = %config.level,
        format = ?config.format,
        "logging initialized"
    );
    Ok(())
}
