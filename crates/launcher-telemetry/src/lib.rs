//! # Launcher Telemetry
//!
//! Structured logging and Prometheus metrics for the token launcher.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use launcher_telemetry::{init_telemetry, TelemetryConfig};
//!
//! fn main() -> anyhow::Result<()> {
//!     init_telemetry(&TelemetryConfig::from_env())?;
//!     // Log lines and metrics are now being collected
//!     Ok(())
//! }
//! ```
//!
//! ## Environment Variables
//!
//! | Variable | Default | Description |
//! |----------|---------|-------------|
//! | `TL_LOG_LEVEL` / `RUST_LOG` | `info` | Log filter |
//! | `TL_JSON_LOGS` | `false` | JSON formatted log lines |
//! | `TL_CONSOLE_OUTPUT` | `true` | Write log lines to stderr |
//! | `TL_SERVICE_NAME` | `token-launcher` | Service name in log lines |

#![warn(clippy::all)]
#![deny(unsafe_code)]

mod config;
mod logging;
pub mod metrics;

pub use config::TelemetryConfig;
pub use logging::init_logging;
pub use metrics::{
    encode_metrics, record_operation, record_router_stats, register_metrics, OperationTimer,
    INDEXER_REQUESTS, ROUTER_CALLS, ROUTER_PENDING, TOKENS_STORED, WALLET_BROADCASTS,
    WORKER_OPERATIONS, WORKER_OPERATION_DURATION,
};

use thiserror::Error;

/// Telemetry initialization errors
#[derive(Debug, Error)]
pub enum TelemetryError {
    #[error("Failed to initialize logging: {0}")]
    LoggingInit(String),

    #[error("Failed to initialize metrics: {0}")]
    MetricsInit(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

/// Initialize logging and register metrics.
pub fn init_telemetry(config: &TelemetryConfig) -> Result<(), TelemetryError> {
    register_metrics()?;
    init_logging(config)?;
    tracing::info!(service = %config.service_name, "Telemetry initialized");
    Ok(())
}
