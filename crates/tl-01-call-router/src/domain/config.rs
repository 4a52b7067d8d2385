//! Router configuration with validation.

use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

use crate::{DEFAULT_CALL_TIMEOUT, DEFAULT_CHANNEL_CAPACITY};

/// What the listener does with a response whose id was never issued.
///
/// Late responses (for calls that timed out or were cancelled) and
/// duplicates are always logged and ignored; this policy only covers ids the
/// router never handed out.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnknownResponsePolicy {
    /// Log, count, and keep listening.
    #[default]
    LogAndIgnore,
    /// Stop the listener and reject every pending call.
    Fatal,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RouterConfig {
    /// Capacity of each direction of the in-memory channel.
    pub channel_capacity: usize,
    /// Deadline applied to calls that don't set their own.
    /// `None` waits indefinitely.
    pub call_timeout: Option<Duration>,
    pub unknown_response_policy: UnknownResponsePolicy,
}

impl Default for RouterConfig {
    fn default() -> Self {
        Self {
            channel_capacity: DEFAULT_CHANNEL_CAPACITY,
            call_timeout: Some(DEFAULT_CALL_TIMEOUT),
            unknown_response_policy: UnknownResponsePolicy::default(),
        }
    }
}

impl RouterConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.channel_capacity == 0 {
            return Err(ConfigError::ZeroCapacity);
        }
        if self.call_timeout == Some(Duration::ZERO) {
            return Err(ConfigError::ZeroTimeout);
        }
        Ok(())
    }

    pub fn with_call_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.call_timeout = timeout;
        self
    }

    pub fn with_policy(mut self, policy: UnknownResponsePolicy) -> Self {
        self.unknown_response_policy = policy;
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("channel_capacity cannot be 0")]
    ZeroCapacity,
    #[error("call_timeout cannot be 0 (use None to wait indefinitely)")]
    ZeroTimeout,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_valid() {
        let config = RouterConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.call_timeout, Some(DEFAULT_CALL_TIMEOUT));
        assert_eq!(
            config.unknown_response_policy,
            UnknownResponsePolicy::LogAndIgnore
        );
    }

    #[test]
    fn test_rejects_zero_capacity() {
        let config = RouterConfig {
            channel_capacity: 0,
            ..RouterConfig::default()
        };
        assert_eq!(config.validate(), Err(ConfigError::ZeroCapacity));
    }

    #[test]
    fn test_rejects_zero_timeout_but_allows_none() {
        let config = RouterConfig::default().with_call_timeout(Some(Duration::ZERO));
        assert_eq!(config.validate(), Err(ConfigError::ZeroTimeout));

        let config = RouterConfig::default().with_call_timeout(None);
        assert!(config.validate().is_ok());
    }
}
