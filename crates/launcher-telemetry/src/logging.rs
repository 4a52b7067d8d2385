//! Subscriber setup.
//!
//! Log lines go to stderr so command output on stdout stays machine-readable.

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::{TelemetryConfig, TelemetryError};

/// Install the global subscriber. Fails if one is already installed.
pub fn init_logging(config: &TelemetryConfig) -> Result<(), TelemetryError> {
    let env_filter = EnvFilter::try_new(&config.log_level)
        .map_err(|e| TelemetryError::Config(format!("invalid log filter: {}", e)))?;

    let registry = tracing_subscriber::registry().with(env_filter);

    if !config.console_output {
        return registry
            .try_init()
            .map_err(|e| TelemetryError::LoggingInit(e.to_string()));
    }

    if config.json_logs {
        let json_layer = tracing_subscriber::fmt::layer()
            .json()
            .with_writer(std::io::stderr)
            .with_target(true)
            .with_current_span(true);
        registry
            .with(json_layer)
            .try_init()
            .map_err(|e| TelemetryError::LoggingInit(e.to_string()))?;
    } else {
        let fmt_layer = tracing_subscriber::fmt::layer()
            .with_writer(std::io::stderr)
            .with_target(false)
            .with_ansi(config.ansi);
        registry
            .with(fmt_layer)
            .try_init()
            .map_err(|e| TelemetryError::LoggingInit(e.to_string()))?;
    }

    tracing::debug!(
        service = %config.service_name,
        json_logs = config.json_logs,
        "Logging initialized"
    );
    Ok(())
}
