//! Process-wide logging setup.

use std::env;

use tracing_subscriber::filter::ParseError;
use tracing_subscriber::EnvFilter;

use crate::config::TelemetryConfig;

#[derive(Debug, thiserror::Error)]
pub enum TelemetryError {
    #[error("log level '{value}' is not a valid tracing filter")]
    InvalidFilter {
        value: String,
        #[source]
        source: ParseError,
    },
    #[error("a tracing subscriber is already installed")]
    AlreadyInstalled,
}

/// Install the subscriber for the whole process. An explicit `RUST_LOG`
/// wins; otherwise the configured level applies service-wide.
pub fn init(config: &TelemetryConfig) -> Result<(), TelemetryError> {
    let filter = match env::var("RUST_LOG") {
        Ok(_) => EnvFilter::from_default_env(),
        Err(_) => filter_from_config(config)?,
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_ansi(false)
        .compact()
        .try_init()
        .map_err(|_| TelemetryError::AlreadyInstalled)
}

fn filter_from_config(config: &TelemetryConfig) -> Result<EnvFilter, TelemetryError> {
    EnvFilter::try_new(&config.log_level).map_err(|source| TelemetryError::InvalidFilter {
        value: config.log_level.clone(),
        source,
    })
}
