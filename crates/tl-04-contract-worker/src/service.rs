//! Contract worker service: runs decoded operations against the library.
//!
//! The dispatcher is the single owner of the worker state. The worker loop
//! hands it one operation at a time, so state transitions never interleave.

use async_trait::async_trait;
use launcher_telemetry::{record_operation, OperationTimer};
use parking_lot::Mutex;
use serde_json::Value;
use shared_types::{Network, PrivateKey, PublicKey, DEPLOY_FEE_NANOMINA};
use std::sync::Arc;
use tl_01_call_router::{Dispatcher, Operation, WorkerFailure};
use tracing::{debug, info, warn};

use crate::domain::{
    Action, AmountArg, ContractKind, ContractOperation, DeployResult, NetworkArg,
    TransactionSpec, DEFAULT_TOKEN_SRC, MINT_CREATED,
};
use crate::ports::{NonceSource, ZkContractLibrary, ZkTransaction};

/// State carried between operations.
#[derive(Default)]
struct WorkerState {
    network: Option<Network>,
    contracts_loaded: bool,
    compiled: bool,
    /// Token contract bound by `initZkappInstance`.
    token: Option<PublicKey>,
    /// Last transaction built by a create, mint or deploy operation.
    transaction: Option<Box<dyn ZkTransaction>>,
}

/// Runs [`ContractOperation`]s for the background worker.
pub struct ContractDispatcher {
    library: Arc<dyn ZkContractLibrary>,
    nonces: Arc<dyn NonceSource>,
    state: Mutex<WorkerState>,
}

fn public_key(field: &str, value: &str) -> Result<PublicKey, WorkerFailure> {
    PublicKey::from_base58(value)
        .map_err(|e| WorkerFailure::invalid_arguments(format!("{}: {}", field, e)))
}

fn private_key(field: &str, value: &str) -> Result<PrivateKey, WorkerFailure> {
    PrivateKey::from_base58(value)
        .map_err(|e| WorkerFailure::invalid_arguments(format!("{}: {}", field, e)))
}

fn amount(value: &AmountArg) -> Result<u64, WorkerFailure> {
    value
        .value()
        .map_err(|e| WorkerFailure::invalid_arguments(e.to_string()))
}

fn text(value: impl ToString) -> Value {
    Value::String(value.to_string())
}

impl ContractDispatcher {
    pub fn new(library: Arc<dyn ZkContractLibrary>, nonces: Arc<dyn NonceSource>) -> Self {
        Self {
            library,
            nonces,
            state: Mutex::new(WorkerState::default()),
        }
    }

    /// Network selected by the last `setActiveInstance`.
    pub fn active_network(&self) -> Option<Network> {
        self.state.lock().network
    }

    /// Whether both contracts have been compiled.
    pub fn is_compiled(&self) -> bool {
        self.state.lock().compiled
    }

    fn require_loaded(&self) -> Result<(), WorkerFailure> {
        if self.state.lock().contracts_loaded {
            Ok(())
        } else {
            Err(WorkerFailure::invalid_state("Contracts not loaded"))
        }
    }

    fn require_instance(&self) -> Result<PublicKey, WorkerFailure> {
        self.state
            .lock()
            .token
            .clone()
            .ok_or_else(|| WorkerFailure::invalid_state("zkapp instance not initialized"))
    }

    fn take_transaction(&self) -> Result<Box<dyn ZkTransaction>, WorkerFailure> {
        self.state
            .lock()
            .transaction
            .take()
            .ok_or_else(|| WorkerFailure::invalid_state("No transaction has been created"))
    }

    fn store_transaction(&self, transaction: Box<dyn ZkTransaction>) {
        self.state.lock().transaction = Some(transaction);
    }

    async fn set_active_instance(&self, arg: NetworkArg) -> Result<Value, WorkerFailure> {
        let network = match arg.as_str() {
            "Devnet" => Network::Devnet,
            "Mainnet" => Network::Mainnet,
            other => {
                warn!(network = other, "Rejected network selection");
                return Err(WorkerFailure::invalid_arguments("Invalid network"));
            }
        };
        self.library.set_active_network(network).await?;
        self.state.lock().network = Some(network);
        info!(network = %network, graphql_url = network.graphql_url(), "Active instance set");
        Ok(Value::Null)
    }

    async fn load_contract(&self) -> Result<Value, WorkerFailure> {
        self.library.load_contracts().await?;
        self.state.lock().contracts_loaded = true;
        Ok(Value::Null)
    }

    async fn compile_contract(&self) -> Result<Value, WorkerFailure> {
        self.require_loaded()?;
        for kind in ContractKind::ALL {
            info!(contract = %kind, "Compiling contract");
            self.library.compile(kind).await?;
        }
        self.state.lock().compiled = true;
        Ok(Value::Null)
    }

    async fn fetch_account(&self, public_key58: &str) -> Result<Value, WorkerFailure> {
        let account = public_key("publicKey58", public_key58)?;
        let fetched = self.library.fetch_account(&account, None).await?;
        Ok(fetched.unwrap_or(Value::Null))
    }

    async fn fetch_token_account(&self, public_key58: &str) -> Result<Value, WorkerFailure> {
        let token = self.require_instance()?;
        let account = public_key("publicKey58", public_key58)?;
        let token_id = self.library.derive_token_id(&token).await?;
        let fetched = self.library.fetch_account(&account, Some(&token_id)).await?;
        Ok(fetched.unwrap_or(Value::Null))
    }

    async fn init_zkapp_instance(&self, public_key58: &str) -> Result<Value, WorkerFailure> {
        self.require_loaded()?;
        let token = public_key("publicKey58", public_key58)?;
        debug!(token = %token, "Token instance bound");
        self.state.lock().token = Some(token);
        Ok(Value::Null)
    }

    async fn create_transfer_transaction(
        &self,
        from58: &str,
        to58: &str,
        value: &AmountArg,
    ) -> Result<Value, WorkerFailure> {
        let token = self.require_instance()?;
        let from = public_key("from58", from58)?;
        let to = public_key("to58", to58)?;
        let amount = amount(value)?;

        let spec = TransactionSpec::new().action(Action::Transfer {
            token,
            from,
            to,
            amount,
        });
        let transaction = self.library.transaction(spec).await?;
        self.store_transaction(transaction);
        Ok(Value::Null)
    }

    async fn prove_transaction(&self) -> Result<Value, WorkerFailure> {
        let mut transaction = self.take_transaction()?;
        let proved = transaction.prove().await;
        self.store_transaction(transaction);
        proved?;
        Ok(Value::Null)
    }

    fn transaction_json(&self) -> Result<Value, WorkerFailure> {
        let state = self.state.lock();
        let transaction = state
            .transaction
            .as_ref()
            .ok_or_else(|| WorkerFailure::invalid_state("No transaction has been created"))?;
        Ok(Value::String(transaction.to_json()?))
    }

    async fn mint_token(
        &self,
        sender: &str,
        recipient_address58: &str,
        value: &AmountArg,
        admin_private_key58: &str,
        fee_payer_private_key58: &str,
    ) -> Result<Value, WorkerFailure> {
        let token = self.require_instance()?;
        let sender = public_key("sender", sender)?;
        let recipient = public_key("recipientAddress58", recipient_address58)?;
        let amount = amount(value)?;
        let admin_key = private_key("adminPrivateKey58", admin_private_key58)?;
        let fee_payer_key = private_key("feePayerPrivateKey58", fee_payer_private_key58)?;
        let fee_payer = self.library.public_key_of(&fee_payer_key)?;

        let spec = TransactionSpec::new()
            .sender(sender)
            .action(Action::FundNewAccounts {
                payer: fee_payer,
                count: 1,
            })
            .action(Action::Mint {
                token,
                recipient,
                amount,
            });

        let mut transaction = self.library.transaction(spec).await?;
        transaction.prove().await?;
        transaction.sign(&[admin_key, fee_payer_key])?;
        self.store_transaction(transaction);

        info!(amount, "Mint transaction created");
        Ok(text(MINT_CREATED))
    }

    async fn deploy_token(
        &self,
        fee_payer_key58: &str,
        token_symbol: &str,
        token_decimals: u8,
        src: Option<&str>,
        network: Option<&str>,
    ) -> Result<Value, WorkerFailure> {
        self.require_loaded()?;
        let fee_payer_key = private_key("feePayerKey58", fee_payer_key58)?;
        let network = match network {
            None => Network::Devnet,
            Some(name) => name
                .parse::<Network>()
                .map_err(|_| WorkerFailure::invalid_arguments("Invalid network"))?,
        };
        let fee_payer = self.library.public_key_of(&fee_payer_key)?;
        let admin = self.library.random_keypair();
        let contract = self.library.random_keypair();
        let src = src
            .filter(|s| !s.trim().is_empty())
            .unwrap_or(DEFAULT_TOKEN_SRC);

        info!(
            symbol = token_symbol,
            decimals = token_decimals,
            src,
            network = %network,
            "Deploying token"
        );

        let nonce = self.nonces.inferred_nonce(&fee_payer, network).await?;
        debug!(nonce, fee_payer = %fee_payer, "Fee payer nonce");

        let spec = TransactionSpec::new()
            .sender(fee_payer.clone())
            .nonce(nonce)
            .fee(DEPLOY_FEE_NANOMINA)
            .action(Action::FundNewAccounts {
                payer: fee_payer,
                count: 3,
            })
            .action(Action::DeployAdmin {
                admin_contract: admin.public_key.clone(),
                admin: admin.public_key.clone(),
            })
            .action(Action::DeployToken {
                token: contract.public_key.clone(),
                symbol: token_symbol.to_string(),
                src: src.to_string(),
            })
            .action(Action::InitializeToken {
                token: contract.public_key.clone(),
                admin: admin.public_key.clone(),
                decimals: token_decimals,
                paused: false,
            });

        let mut transaction = self.library.transaction(spec).await?;
        info!("Deploy transaction created");
        transaction.prove().await?;
        transaction.sign(&[
            fee_payer_key,
            contract.private_key.clone(),
            admin.private_key.clone(),
        ])?;
        self.store_transaction(transaction);

        let result = DeployResult {
            contract_address: contract.public_key.to_string(),
            admin_address: admin.public_key.to_string(),
            admin_private_key: admin.private_key.to_base58().to_string(),
        };
        serde_json::to_value(result).map_err(|e| WorkerFailure::internal(e.to_string()))
    }

    async fn run(&self, op: ContractOperation) -> Result<Value, WorkerFailure> {
        match op {
            ContractOperation::SetActiveInstance(arg) => self.set_active_instance(arg).await,
            ContractOperation::LoadContract => self.load_contract().await,
            ContractOperation::CompileContract => self.compile_contract().await,
            ContractOperation::FetchAccount { public_key58 } => {
                self.fetch_account(&public_key58).await
            }
            ContractOperation::FetchTokenAccount { public_key58 } => {
                self.fetch_token_account(&public_key58).await
            }
            ContractOperation::InitZkappInstance { public_key58 } => {
                self.init_zkapp_instance(&public_key58).await
            }
            ContractOperation::GetBalance { address58 } => {
                let token = self.require_instance()?;
                let owner = public_key("address58", &address58)?;
                Ok(text(self.library.balance_of(&token, &owner).await?))
            }
            ContractOperation::GetDecimals => {
                let token = self.require_instance()?;
                Ok(text(self.library.decimals(&token).await?))
            }
            ContractOperation::GetCirculating => {
                let token = self.require_instance()?;
                Ok(text(self.library.circulating(&token).await?))
            }
            ContractOperation::CreateTransferTransaction {
                from58,
                to58,
                amount,
            } => {
                self.create_transfer_transaction(&from58, &to58, &amount)
                    .await
            }
            ContractOperation::ProveTransaction => self.prove_transaction().await,
            ContractOperation::GetTransactionJson => self.transaction_json(),
            ContractOperation::GetAdminContract => {
                let token = self.require_instance()?;
                Ok(text(self.library.admin_contract(&token).await?))
            }
            ContractOperation::DeriveTokenId => {
                let token = self.require_instance()?;
                Ok(text(self.library.derive_token_id(&token).await?))
            }
            ContractOperation::MintToken {
                sender,
                recipient_address58,
                amount,
                admin_private_key58,
                fee_payer_private_key58,
            } => {
                self.mint_token(
                    &sender,
                    &recipient_address58,
                    &amount,
                    &admin_private_key58,
                    &fee_payer_private_key58,
                )
                .await
            }
            ContractOperation::DeployToken {
                fee_payer_key58,
                token_symbol,
                token_decimals,
                src,
                network,
            } => {
                self.deploy_token(
                    &fee_payer_key58,
                    &token_symbol,
                    token_decimals,
                    src.as_deref(),
                    network.as_deref(),
                )
                .await
            }
        }
    }
}

#[async_trait]
impl Dispatcher<ContractOperation> for ContractDispatcher {
    async fn dispatch(&self, op: ContractOperation) -> Result<Value, WorkerFailure> {
        let name = op.name();
        let _timer = OperationTimer::start(name);
        let result = self.run(op).await;
        record_operation(name, result.is_ok());
        result
    }
}
