//! Transaction descriptions handed to the contract library.
//!
//! A [`TransactionSpec`] lists what the transaction body does, in order. The
//! library turns it into a provable transaction.

use serde::{Deserialize, Serialize};
use shared_types::PublicKey;
use std::fmt;

/// The two contracts the worker compiles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ContractKind {
    FungibleToken,
    FungibleTokenAdmin,
}

impl ContractKind {
    /// Compile order: the token contract first, then its admin contract.
    pub const ALL: [ContractKind; 2] = [ContractKind::FungibleToken, ContractKind::FungibleTokenAdmin];
}

impl fmt::Display for ContractKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ContractKind::FungibleToken => f.write_str("FungibleToken"),
            ContractKind::FungibleTokenAdmin => f.write_str("FungibleTokenAdmin"),
        }
    }
}

/// One step of a transaction body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum Action {
    /// Pay the account creation fee for `count` new accounts.
    FundNewAccounts { payer: PublicKey, count: u32 },
    #[serde(rename_all = "camelCase")]
    DeployAdmin {
        admin_contract: PublicKey,
        admin: PublicKey,
    },
    DeployToken {
        token: PublicKey,
        symbol: String,
        src: String,
    },
    InitializeToken {
        token: PublicKey,
        admin: PublicKey,
        decimals: u8,
        paused: bool,
    },
    Mint {
        token: PublicKey,
        recipient: PublicKey,
        amount: u64,
    },
    Transfer {
        token: PublicKey,
        from: PublicKey,
        to: PublicKey,
        amount: u64,
    },
}

/// Body and fee-payer settings of a transaction to build.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TransactionSpec {
    /// Fee payer. `None` leaves it to the wallet.
    pub sender: Option<PublicKey>,
    pub nonce: Option<u64>,
    /// Fee in nanomina.
    pub fee: Option<u64>,
    pub actions: Vec<Action>,
}

impl TransactionSpec {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn sender(mut self, sender: PublicKey) -> Self {
        self.sender = Some(sender);
        self
    }

    pub fn nonce(mut self, nonce: u64) -> Self {
        self.nonce = Some(nonce);
        self
    }

    pub fn fee(mut self, fee: u64) -> Self {
        self.fee = Some(fee);
        self
    }

    pub fn action(mut self, action: Action) -> Self {
        self.actions.push(action);
        self
    }
}
