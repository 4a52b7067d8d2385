//! Wallet request and response shapes.

use serde::{Deserialize, Serialize};
use shared_types::{Network, DEFAULT_WALLET_FEE, NANOMINA_PER_MINA};

use crate::domain::errors::WalletError;

/// Longest memo a transaction can carry, in bytes.
pub const MAX_MEMO_BYTES: usize = 32;

/// Largest fee, in whole coins, that fits the smallest-unit counter.
const MAX_FEE: f64 = u64::MAX as f64 / NANOMINA_PER_MINA as f64;

/// Fee and memo the wallet attaches when it pays for a transaction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeePayer {
    /// Fee in whole coins.
    pub fee: f64,
    #[serde(default)]
    pub memo: String,
}

impl Default for FeePayer {
    fn default() -> Self {
        Self {
            fee: DEFAULT_WALLET_FEE,
            memo: String::new(),
        }
    }
}

impl FeePayer {
    /// Fee converted to the smallest currency unit.
    pub fn fee_nanomina(&self) -> Result<u64, WalletError> {
        if !self.fee.is_finite() || self.fee < 0.0 || self.fee > MAX_FEE {
            return Err(WalletError::InvalidFee(self.fee));
        }
        let nanomina = (self.fee * NANOMINA_PER_MINA as f64).round();
        // u64::MAX rounds up to 2^64 as f64
        if nanomina >= u64::MAX as f64 {
            return Err(WalletError::InvalidFee(self.fee));
        }
        Ok(nanomina as u64)
    }

    pub fn validate(&self) -> Result<(), WalletError> {
        self.fee_nanomina()?;
        if self.memo.len() > MAX_MEMO_BYTES {
            return Err(WalletError::MemoTooLong {
                max: MAX_MEMO_BYTES,
                actual: self.memo.len(),
            });
        }
        Ok(())
    }
}

/// Argument of `sendTransaction`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SendTransactionArgs {
    /// Proved transaction, as produced by `getTransactionJSON`.
    pub transaction: String,
    pub fee_payer: FeePayer,
}

impl SendTransactionArgs {
    /// Wrap a transaction with the default fee and an empty memo.
    pub fn new(transaction: impl Into<String>) -> Self {
        Self {
            transaction: transaction.into(),
            fee_payer: FeePayer::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SendTransactionResult {
    pub hash: String,
}

/// Explorer page for a broadcast transaction.
pub fn explorer_link(network: Network, hash: &str) -> String {
    format!("https://minascan.io/{}/tx/{}/txInfo", network.slug(), hash)
}
