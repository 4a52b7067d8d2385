//! # Launcher Configuration
//!
//! Built from environment variables, then overridden by command-line flags.
//!
//! | Variable | Default | Description |
//! |----------|---------|-------------|
//! | `TL_DATA_DIR` | `.token-launcher` | Token list, network selection, simulated ledger |
//! | `TL_NETWORK` | stored selection | `Devnet` or `Mainnet` |
//! | `TL_SIMULATE` | `false` | Use the in-memory network |
//! | `TL_CHANNEL_CAPACITY` | `64` | Router channel capacity |
//! | `TL_CALL_TIMEOUT_SECS` | `300` | Call deadline, `none` to wait forever |
//! | `TL_UNKNOWN_RESPONSES` | `log` | `log` or `fatal` |
//! | `TL_INDEXER_URL` | per network | GraphQL endpoint override |
//! | `TL_INDEXER_TIMEOUT_SECS` | `10` | Indexer request timeout |
//! | `TL_WALLET_FEE` | `0.1` | Fee the wallet pays, in whole coins |

use shared_types::{Network, DEFAULT_WALLET_FEE};
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;
use tl_01_call_router::{ConfigError, RouterConfig, UnknownResponsePolicy};
use tl_04_contract_worker::DEFAULT_INDEXER_TIMEOUT;

/// Default data directory, relative to the working directory.
pub const DEFAULT_DATA_DIR: &str = ".token-launcher";

#[derive(Debug, Error)]
pub enum LauncherConfigError {
    #[error("{var}: invalid value '{value}'")]
    InvalidValue { var: &'static str, value: String },

    #[error("Router configuration: {0}")]
    Router(#[from] ConfigError),

    #[error("Indexer timeout cannot be 0")]
    ZeroIndexerTimeout,

    #[error("Wallet fee must be a non-negative number, got {0}")]
    InvalidFee(f64),
}

#[derive(Debug, Clone)]
pub struct LauncherConfig {
    pub data_dir: PathBuf,
    /// Overrides the stored network selection when set.
    pub network: Option<Network>,
    pub simulate: bool,
    pub router: RouterConfig,
    pub indexer_url: Option<String>,
    pub indexer_timeout: Duration,
    pub wallet_fee: f64,
}

impl Default for LauncherConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from(DEFAULT_DATA_DIR),
            network: None,
            simulate: false,
            router: RouterConfig::default(),
            indexer_url: None,
            indexer_timeout: DEFAULT_INDEXER_TIMEOUT,
            wallet_fee: DEFAULT_WALLET_FEE,
        }
    }
}

fn parse<T: std::str::FromStr>(var: &'static str, value: &str) -> Result<T, LauncherConfigError> {
    value
        .trim()
        .parse()
        .map_err(|_| LauncherConfigError::InvalidValue {
            var,
            value: value.to_string(),
        })
}

fn parse_flag(var: &'static str, value: &str) -> Result<bool, LauncherConfigError> {
    match value.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" => Ok(true),
        "0" | "false" | "no" | "" => Ok(false),
        _ => Err(LauncherConfigError::InvalidValue {
            var,
            value: value.to_string(),
        }),
    }
}

impl LauncherConfig {
    /// Read configuration from the process environment.
    pub fn from_env() -> Result<Self, LauncherConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// Read configuration through `lookup`, which maps a variable name to its value.
    pub fn from_lookup(
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, LauncherConfigError> {
        let mut config = Self::default();

        if let Some(dir) = lookup("TL_DATA_DIR").filter(|d| !d.trim().is_empty()) {
            config.data_dir = PathBuf::from(dir);
        }
        if let Some(network) = lookup("TL_NETWORK") {
            config.network = Some(parse("TL_NETWORK", &network)?);
        }
        if let Some(simulate) = lookup("TL_SIMULATE") {
            config.simulate = parse_flag("TL_SIMULATE", &simulate)?;
        }
        if let Some(capacity) = lookup("TL_CHANNEL_CAPACITY") {
            config.router.channel_capacity = parse("TL_CHANNEL_CAPACITY", &capacity)?;
        }
        if let Some(timeout) = lookup("TL_CALL_TIMEOUT_SECS") {
            config.router.call_timeout = if timeout.trim().eq_ignore_ascii_case("none") {
                None
            } else {
                Some(Duration::from_secs(parse("TL_CALL_TIMEOUT_SECS", &timeout)?))
            };
        }
        if let Some(policy) = lookup("TL_UNKNOWN_RESPONSES") {
            config.router.unknown_response_policy = match policy.trim().to_lowercase().as_str() {
                "log" => UnknownResponsePolicy::LogAndIgnore,
                "fatal" => UnknownResponsePolicy::Fatal,
                _ => {
                    return Err(LauncherConfigError::InvalidValue {
                        var: "TL_UNKNOWN_RESPONSES",
                        value: policy,
                    })
                }
            };
        }
        if let Some(url) = lookup("TL_INDEXER_URL").filter(|u| !u.trim().is_empty()) {
            config.indexer_url = Some(url);
        }
        if let Some(timeout) = lookup("TL_INDEXER_TIMEOUT_SECS") {
            config.indexer_timeout =
                Duration::from_secs(parse("TL_INDEXER_TIMEOUT_SECS", &timeout)?);
        }
        if let Some(fee) = lookup("TL_WALLET_FEE") {
            config.wallet_fee = parse("TL_WALLET_FEE", &fee)?;
        }

        Ok(config)
    }

    pub fn validate(&self) -> Result<(), LauncherConfigError> {
        self.router.validate()?;
        if self.indexer_timeout.is_zero() {
            return Err(LauncherConfigError::ZeroIndexerTimeout);
        }
        if !self.wallet_fee.is_finite() || self.wallet_fee < 0.0 {
            return Err(LauncherConfigError::InvalidFee(self.wallet_fee));
        }
        Ok(())
    }

    /// Path of the simulated ledger inside the data directory.
    pub fn ledger_path(&self) -> PathBuf {
        self.data_dir.join("simulated-ledger.json")
    }
}
