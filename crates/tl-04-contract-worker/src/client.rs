//! Typed foreground facade over the call router.
//!
//! One method per worker operation. Each builds a [`ContractOperation`],
//! sends it through the [`CallRouter`] and decodes the result.

use serde::de::DeserializeOwned;
use serde_json::Value;
use shared_types::{Network, PrivateKey, PublicKey};
use tl_01_call_router::{CallOptions, CallRouter, RouterError};
use tracing::info;

use crate::domain::{AmountArg, ContractOperation, DeployResult, NetworkArg};

#[derive(Clone)]
pub struct ContractWorkerClient {
    router: CallRouter,
}

impl ContractWorkerClient {
    pub fn new(router: CallRouter) -> Self {
        Self { router }
    }

    pub fn router(&self) -> &CallRouter {
        &self.router
    }

    async fn call(&self, op: ContractOperation) -> Result<Value, RouterError> {
        self.router.invoke(&op).await
    }

    async fn call_as<T: DeserializeOwned>(&self, op: ContractOperation) -> Result<T, RouterError> {
        self.router.invoke_as(&op).await
    }

    /// Select the network, load and compile the contracts.
    pub async fn initialize(&self, network: Network) -> Result<(), RouterError> {
        info!(network = %network, "Initializing contract worker");
        self.set_active_instance(network).await?;
        self.load_contract().await?;
        info!("Compiling contracts");
        self.compile_contract().await
    }

    pub async fn set_active_instance(&self, network: Network) -> Result<(), RouterError> {
        self.call(ContractOperation::SetActiveInstance(NetworkArg::named(
            network.as_str(),
        )))
        .await
        .map(drop)
    }

    pub async fn load_contract(&self) -> Result<(), RouterError> {
        self.call(ContractOperation::LoadContract).await.map(drop)
    }

    pub async fn compile_contract(&self) -> Result<(), RouterError> {
        self.call(ContractOperation::CompileContract)
            .await
            .map(drop)
    }

    /// Account JSON, or `Null` if the account does not exist.
    pub async fn fetch_account(&self, public_key: &PublicKey) -> Result<Value, RouterError> {
        self.call(ContractOperation::FetchAccount {
            public_key58: public_key.to_string(),
        })
        .await
    }

    /// Token account of `public_key` for the bound token instance.
    pub async fn fetch_token_account(&self, public_key: &PublicKey) -> Result<Value, RouterError> {
        self.call(ContractOperation::FetchTokenAccount {
            public_key58: public_key.to_string(),
        })
        .await
    }

    pub async fn init_zkapp_instance(&self, token: &PublicKey) -> Result<(), RouterError> {
        self.call(ContractOperation::InitZkappInstance {
            public_key58: token.to_string(),
        })
        .await
        .map(drop)
    }

    pub async fn get_balance(&self, owner: &PublicKey) -> Result<String, RouterError> {
        self.call_as(ContractOperation::GetBalance {
            address58: owner.to_string(),
        })
        .await
    }

    pub async fn get_decimals(&self) -> Result<String, RouterError> {
        self.call_as(ContractOperation::GetDecimals).await
    }

    pub async fn get_circulating(&self) -> Result<String, RouterError> {
        self.call_as(ContractOperation::GetCirculating).await
    }

    pub async fn create_transfer_transaction(
        &self,
        from: &PublicKey,
        to: &PublicKey,
        amount: u64,
    ) -> Result<(), RouterError> {
        self.call(ContractOperation::CreateTransferTransaction {
            from58: from.to_string(),
            to58: to.to_string(),
            amount: AmountArg::from(amount),
        })
        .await
        .map(drop)
    }

    pub async fn prove_transaction(&self) -> Result<(), RouterError> {
        self.call(ContractOperation::ProveTransaction)
            .await
            .map(drop)
    }

    pub async fn get_transaction_json(&self) -> Result<String, RouterError> {
        self.call_as(ContractOperation::GetTransactionJson).await
    }

    pub async fn get_admin_contract(&self) -> Result<String, RouterError> {
        self.call_as(ContractOperation::GetAdminContract).await
    }

    pub async fn derive_token_id(&self) -> Result<String, RouterError> {
        self.call_as(ContractOperation::DeriveTokenId).await
    }

    pub async fn mint_token(
        &self,
        sender: &PublicKey,
        recipient: &PublicKey,
        amount: u64,
        admin_key: &PrivateKey,
        fee_payer_key: &PrivateKey,
    ) -> Result<String, RouterError> {
        self.call_as(ContractOperation::MintToken {
            sender: sender.to_string(),
            recipient_address58: recipient.to_string(),
            amount: AmountArg::from(amount),
            admin_private_key58: admin_key.to_base58().to_string(),
            fee_payer_private_key58: fee_payer_key.to_base58().to_string(),
        })
        .await
    }

    /// Build, prove and sign a deploy. Uses `options` so callers can give
    /// proving a longer deadline than ordinary calls.
    pub async fn deploy_token(
        &self,
        fee_payer_key: &PrivateKey,
        symbol: &str,
        decimals: u8,
        src: Option<&str>,
        network: Network,
        options: CallOptions,
    ) -> Result<DeployResult, RouterError> {
        let op = ContractOperation::DeployToken {
            fee_payer_key58: fee_payer_key.to_base58().to_string(),
            token_symbol: symbol.to_string(),
            token_decimals: decimals,
            src: src.map(str::to_string),
            network: Some(network.as_str().to_string()),
        };
        let value = self.router.invoke_op_with(&op, options).await?;
        serde_json::from_value(value).map_err(|e| RouterError::Decode(e.to_string()))
    }
}
