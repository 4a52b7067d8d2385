//! The operation registry accepted by the contract worker.

use serde::{Deserialize, Serialize};
use shared_types::{parse_amount, AmountError};
use tl_01_call_router::Operation;

/// Source URL recorded on a token when the deploy request names none.
pub const DEFAULT_TOKEN_SRC: &str =
    "https://github.com/MinaFoundation/mina-fungible-token/blob/main/FungibleToken.ts";

/// Result string of a successful `mintToken`.
pub const MINT_CREATED: &str = "Mint operation created successfully";

/// Every operation the worker accepts, tagged by its wire name.
///
/// Serialises as `{"fn": <name>, "args": <payload>}`; unit variants carry no
/// `args`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "fn", content = "args", rename_all = "camelCase")]
pub enum ContractOperation {
    SetActiveInstance(NetworkArg),
    LoadContract,
    CompileContract,
    #[serde(rename_all = "camelCase", alias = "fetchAccountfunc")]
    FetchAccount {
        public_key58: String,
    },
    #[serde(rename_all = "camelCase")]
    FetchTokenAccount {
        public_key58: String,
    },
    #[serde(rename_all = "camelCase")]
    InitZkappInstance {
        public_key58: String,
    },
    GetBalance {
        address58: String,
    },
    GetDecimals,
    GetCirculating,
    CreateTransferTransaction {
        from58: String,
        to58: String,
        amount: AmountArg,
    },
    ProveTransaction,
    #[serde(rename = "getTransactionJSON")]
    GetTransactionJson,
    GetAdminContract,
    DeriveTokenId,
    #[serde(rename_all = "camelCase")]
    MintToken {
        sender: String,
        recipient_address58: String,
        amount: AmountArg,
        admin_private_key58: String,
        fee_payer_private_key58: String,
    },
    #[serde(rename_all = "camelCase")]
    DeployToken {
        fee_payer_key58: String,
        token_symbol: String,
        token_decimals: u8,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        src: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        network: Option<String>,
    },
}

impl Operation for ContractOperation {
    const NAMES: &'static [&'static str] = &[
        "setActiveInstance",
        "loadContract",
        "compileContract",
        "fetchAccount",
        "fetchAccountfunc",
        "fetchTokenAccount",
        "initZkappInstance",
        "getBalance",
        "getDecimals",
        "getCirculating",
        "createTransferTransaction",
        "proveTransaction",
        "getTransactionJSON",
        "getAdminContract",
        "deriveTokenId",
        "mintToken",
        "deployToken",
    ];

    fn name(&self) -> &'static str {
        match self {
            ContractOperation::SetActiveInstance(_) => "setActiveInstance",
            ContractOperation::LoadContract => "loadContract",
            ContractOperation::CompileContract => "compileContract",
            ContractOperation::FetchAccount { .. } => "fetchAccount",
            ContractOperation::FetchTokenAccount { .. } => "fetchTokenAccount",
            ContractOperation::InitZkappInstance { .. } => "initZkappInstance",
            ContractOperation::GetBalance { .. } => "getBalance",
            ContractOperation::GetDecimals => "getDecimals",
            ContractOperation::GetCirculating => "getCirculating",
            ContractOperation::CreateTransferTransaction { .. } => "createTransferTransaction",
            ContractOperation::ProveTransaction => "proveTransaction",
            ContractOperation::GetTransactionJson => "getTransactionJSON",
            ContractOperation::GetAdminContract => "getAdminContract",
            ContractOperation::DeriveTokenId => "deriveTokenId",
            ContractOperation::MintToken { .. } => "mintToken",
            ContractOperation::DeployToken { .. } => "deployToken",
        }
    }
}

/// `setActiveInstance` accepts either `{"network": "Devnet"}` or a bare name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum NetworkArg {
    Named { network: String },
    Bare(String),
}

impl NetworkArg {
    pub fn named(network: impl Into<String>) -> Self {
        NetworkArg::Named {
            network: network.into(),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            NetworkArg::Named { network } | NetworkArg::Bare(network) => network,
        }
    }
}

/// Token amount as sent by the foreground: a decimal string or a number.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AmountArg {
    Number(u64),
    Text(String),
}

impl AmountArg {
    pub fn value(&self) -> Result<u64, AmountError> {
        match self {
            AmountArg::Number(n) => Ok(*n),
            AmountArg::Text(s) => parse_amount(s),
        }
    }
}

impl From<u64> for AmountArg {
    fn from(amount: u64) -> Self {
        AmountArg::Text(amount.to_string())
    }
}

/// Keys and addresses produced by `deployToken`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeployResult {
    pub contract_address: String,
    pub admin_address: String,
    pub admin_private_key: String,
}
