use std::fmt;

use tracing_subscriber::filter::ParseError;
use tracing_subscriber::EnvFilter;

use crate::config::TelemetryConfig;

/// Installs the global tracing subscriber from the configured log level.
/// `RUST_LOG` takes precedence when set, so operators can raise verbosity
/// per target without touching the service configuration.
pub fn init(config: &TelemetryConfig) -> Result<(), TelemetryError> {
    let filter = match EnvFilter::try_from_default_env() {
        Ok(from_env) => from_env,
        Err(_) => EnvFilter::try_new(&config.log_level)
            .map_err(|source| TelemetryError::InvalidFilter { source })?,
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .try_init()
        .map_err(|_| TelemetryError::AlreadyInitialized)
}

#[derive(Debug)]
pub enum TelemetryError {
    InvalidFilter { source: ParseError },
    AlreadyInitialized,
}

impl fmt::Display for TelemetryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TelemetryError::InvalidFilter { .. } => {
                write!(f, "configured log level is not a valid tracing filter")
            }
            TelemetryError::AlreadyInitialized => {
                write!(f, "a global tracing subscriber is already installed")
            }
        }
    }
}

impl std::error::Error for TelemetryError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            TelemetryError::InvalidFilter { source } => Some(source),
            TelemetryError::AlreadyInitialized => None,
        }
    }
}
