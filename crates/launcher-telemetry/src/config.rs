//! Telemetry configuration from environment variables.

use std::env;

/// Configuration for logging and metrics.
#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    /// Service name attached to log lines
    pub service_name: String,

    /// Log level filter (trace, debug, info, warn, error) or a full
    /// `EnvFilter` directive such as `info,tl_01_call_router=debug`
    pub log_level: String,

    /// Whether to write log lines at all
    pub console_output: bool,

    /// Whether to format log lines as JSON
    pub json_logs: bool,

    /// Whether to colour pretty output
    pub ansi: bool,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            service_name: "token-launcher".to_string(),
            log_level: "info".to_string(),
            console_output: true,
            json_logs: false,
            ansi: true,
        }
    }
}

fn flag(name: &str) -> Option<bool> {
    env::var(name)
        .ok()
        .map(|v| matches!(v.to_lowercase().as_str(), "true" | "1" | "yes"))
}

impl TelemetryConfig {
    /// Create configuration from environment variables.
    ///
    /// # Environment Variables
    ///
    /// - `TL_SERVICE_NAME`: Service name (default: token-launcher)
    /// - `TL_LOG_LEVEL` or `RUST_LOG`: Log filter (default: info)
    /// - `TL_CONSOLE_OUTPUT`: Write logs (default: true)
    /// - `TL_JSON_LOGS`: JSON formatted logs (default: false, true in containers)
    /// - `NO_COLOR`: Disable ANSI colours when set
    pub fn from_env() -> Self {
        let is_container =
            env::var("KUBERNETES_SERVICE_HOST").is_ok() || env::var("DOCKER_CONTAINER").is_ok();

        Self {
            service_name: env::var("TL_SERVICE_NAME")
                .unwrap_or_else(|_| "token-launcher".to_string()),

            log_level: env::var("TL_LOG_LEVEL")
                .or_else(|_| env::var("RUST_LOG"))
                .unwrap_or_else(|_| "info".to_string()),

            console_output: flag("TL_CONSOLE_OUTPUT").unwrap_or(true),

            json_logs: flag("TL_JSON_LOGS").unwrap_or(is_container),

            ansi: env::var("NO_COLOR").is_err(),
        }
    }

    /// Raise the filter to `debug` (used by `--verbose`).
    pub fn verbose(mut self) -> Self {
        self.log_level = "debug".to_string();
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = TelemetryConfig::default();
        assert_eq!(config.service_name, "token-launcher");
        assert_eq!(config.log_level, "info");
        assert!(!config.json_logs);
    }

    #[test]
    fn test_verbose() {
        let config = TelemetryConfig::default().verbose();
        assert_eq!(config.log_level, "debug");
    }
}
