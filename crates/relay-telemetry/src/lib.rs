//! # Relay Telemetry
//!
//! Structured logging for the wallet relay and its tools.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use relay_telemetry::{init_telemetry, TelemetryConfig};
//!
//! fn main() {
//!     let _guard = init_telemetry(TelemetryConfig::from_env()).expect("logging");
//! }
//! ```
//!
//! ## Environment Variables
//!
//! | Variable | Default | Description |
//! |----------|---------|-------------|
//! | `OTEL_SERVICE_NAME` | `wallet-relay` | Service name on every event |
//! | `WALLET_RELAY_LOG_LEVEL` | `info` | Filter directive, falls back to `RUST_LOG` |
//! | `WALLET_RELAY_JSON_LOGS` | `false` | JSON lines instead of text |
//! | `WALLET_RELAY_CONSOLE_OUTPUT` | `true` | Disable to silence all output |

mod config;
mod logging;

pub use config::TelemetryConfig;

use thiserror::Error;

/// Telemetry initialization errors
#[derive(Error, Debug, PartialEq, Eq)]
pub enum TelemetryError {
    #[error("invalid log filter: {0}")]
    Filter(String),

    #[error("a global tracing subscriber is already installed")]
    AlreadyInitialized,
}

/// Install the global subscriber.
///
/// Returns a guard that must be held for the lifetime of the application.
pub fn init_telemetry(config: TelemetryConfig) -> Result<TelemetryGuard, TelemetryError> {
    logging::init_logging(&config)?;
    Ok(TelemetryGuard {
        service_name: config.service_name,
    })
}

/// Guard that keeps telemetry active.
#[derive(Debug)]
pub struct TelemetryGuard {
    service_name: String,
}

impl TelemetryGuard {
    pub fn service_name(&self) -> &str {
        &self.service_name
    }
}

impl Drop for TelemetryGuard {
    fn drop(&mut self) {
        tracing::debug!(service = %self.service_name, "Shutting down telemetry");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_filter_is_reported() {
        let config = TelemetryConfig {
            log_level: "wallet_relay=loud".to_string(),
            ..TelemetryConfig::default()
        };
        assert!(matches!(
            init_telemetry(config),
            Err(TelemetryError::Filter(_))
        ));
    }

    // The only test that installs the global subscriber
    #[test]
    fn test_double_init_is_an_error() {
        let config = TelemetryConfig {
            console_output: false,
            ..TelemetryConfig::default()
        };
        let guard = init_telemetry(config.clone()).unwrap();
        assert_eq!(guard.service_name(), "wallet-relay");
        assert_eq!(
            init_telemetry(config).unwrap_err(),
            TelemetryError::AlreadyInitialized
        );
    }
}
