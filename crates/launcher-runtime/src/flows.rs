//! User flows: deploy, mint, transfer and the read-only token views.
//!
//! Every flow initializes the worker, drives it step by step through the
//! router and hands the finished transaction to the wallet. Progress goes to
//! the log as status lines.

use anyhow::{anyhow, Context as _, Result};
use launcher_telemetry::WALLET_BROADCASTS;
use serde::Serialize;
use shared_types::{Network, PrivateKey, PublicKey, TokenRecord};
use std::fmt;
use std::time::Duration;
use tl_01_call_router::CallOptions;
use tl_02_wallet_bridge::{explorer_link, FeePayer, SendTransactionArgs, WalletProvider};
use tl_04_contract_worker::ContractWorkerClient;
use tracing::{info, warn};

use crate::context::LauncherContext;

/// Deadline for the deploy call, which compiles and proves two contracts.
pub const DEPLOY_TIMEOUT: Duration = Duration::from_secs(900);

/// A broadcast transaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Broadcast {
    pub hash: String,
    pub link: String,
}

impl fmt::Display for Broadcast {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Transaction {}\n{}", self.hash, self.link)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct DeployReport {
    pub token: TokenRecord,
    pub broadcast: Broadcast,
}

impl fmt::Display for DeployReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Token deployed at {}", self.token.address)?;
        if let Some(admin) = &self.token.admin_public_key {
            writeln!(f, "Admin contract {}", admin)?;
        }
        write!(f, "{}", self.broadcast)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BalanceReport {
    pub token: String,
    pub owner: String,
    pub balance: String,
}

impl fmt::Display for BalanceReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} holds {} of {}", self.owner, self.balance, self.token)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenInfo {
    pub address: String,
    pub token_id: String,
    pub decimals: String,
    pub circulating: String,
    /// Absent when the admin contract could not be read.
    pub admin_contract: Option<String>,
}

impl fmt::Display for TokenInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Address:      {}", self.address)?;
        writeln!(f, "Token id:     {}", self.token_id)?;
        writeln!(f, "Decimals:     {}", self.decimals)?;
        writeln!(f, "Circulating:  {}", self.circulating)?;
        write!(
            f,
            "Admin:        {}",
            self.admin_contract.as_deref().unwrap_or("unavailable")
        )
    }
}

pub struct DeployParams {
    pub symbol: String,
    pub decimals: u8,
    pub src: Option<String>,
    /// Defaults to the development account.
    pub fee_payer_key: Option<PrivateKey>,
}

pub struct MintParams {
    pub token: PublicKey,
    pub amount: u64,
    /// Defaults to the wallet account.
    pub recipient: Option<PublicKey>,
    /// Defaults to the key stored with the token.
    pub admin_key: Option<PrivateKey>,
    /// Defaults to the development account.
    pub fee_payer_key: Option<PrivateKey>,
}

pub struct TransferParams {
    pub token: PublicKey,
    pub to: PublicKey,
    pub amount: u64,
}

async fn initialize(client: &ContractWorkerClient, network: Network) -> Result<()> {
    info!("Loading contracts");
    client
        .initialize(network)
        .await
        .context("Failed to initialize the contract worker")
}

async fn broadcast(
    context: &LauncherContext,
    wallet: &dyn WalletProvider,
    client: &ContractWorkerClient,
) -> Result<Broadcast> {
    info!("Sending transaction to the wallet");
    let transaction = client.get_transaction_json().await?;
    let args = SendTransactionArgs {
        transaction,
        fee_payer: FeePayer {
            fee: context.config.wallet_fee,
            memo: String::new(),
        },
    };

    let result = wallet.send_transaction(args).await;
    let outcome = if result.is_ok() { "ok" } else { "error" };
    WALLET_BROADCASTS.with_label_values(&[outcome]).inc();
    let hash = result.context("Wallet rejected the transaction")?.hash;

    let link = explorer_link(context.network, &hash);
    info!(hash = %hash, "Transaction sent");
    Ok(Broadcast { hash, link })
}

fn default_fee_payer(context: &LauncherContext, key: Option<PrivateKey>) -> Result<PrivateKey> {
    match key {
        Some(key) => Ok(key),
        None => Ok(context.backend()?.dev_account.private_key.clone()),
    }
}

/// Deploy a new token and its admin contract, then record it locally.
pub async fn deploy(context: &LauncherContext, params: DeployParams) -> Result<DeployReport> {
    let backend = context.backend()?;
    let wallet = context.wallet()?;
    let client = &backend.client;
    let fee_payer_key = default_fee_payer(context, params.fee_payer_key)?;

    initialize(client, context.network).await?;

    info!(symbol = %params.symbol, decimals = params.decimals, "Deploying token");
    let deployed = client
        .deploy_token(
            &fee_payer_key,
            &params.symbol,
            params.decimals,
            params.src.as_deref(),
            context.network,
            CallOptions::default().with_timeout(DEPLOY_TIMEOUT),
        )
        .await
        .context("Failed to create the deploy transaction")?;

    let broadcast = broadcast(context, wallet.as_ref(), client).await?;

    let token = TokenRecord::launched(
        deployed.contract_address,
        Some(deployed.admin_address),
        Some(deployed.admin_private_key),
    );
    context.registry.add(token.clone())?;
    context.record_token_count()?;
    info!(address = %token.address, "Token saved");

    Ok(DeployReport { token, broadcast })
}

/// Mint `amount` of `token` to the recipient.
pub async fn mint(context: &LauncherContext, params: MintParams) -> Result<Broadcast> {
    let backend = context.backend()?;
    let wallet = context.wallet()?;
    let client = &backend.client;
    let sender = context.wallet_account().await?;
    let recipient = params.recipient.unwrap_or_else(|| sender.clone());
    let fee_payer_key = default_fee_payer(context, params.fee_payer_key)?;

    let admin_key = match params.admin_key {
        Some(key) => key,
        None => {
            let stored = context
                .registry
                .find_by_address(params.token.to_base58())?
                .and_then(|record| record.admin_private_key)
                .ok_or_else(|| {
                    anyhow!("No admin key stored for {}; pass --admin-key", params.token)
                })?;
            PrivateKey::from_base58(&stored).context("Stored admin key is invalid")?
        }
    };

    initialize(client, context.network).await?;
    client.init_zkapp_instance(&params.token).await?;

    info!("Fetching accounts");
    client.fetch_account(&params.token).await?;
    client.fetch_account(&sender).await?;

    info!(amount = params.amount, recipient = %recipient, "Creating mint transaction");
    let message = client
        .mint_token(
            &sender,
            &recipient,
            params.amount,
            &admin_key,
            &fee_payer_key,
        )
        .await
        .context("Failed to create the mint transaction")?;
    info!("{}", message);

    broadcast(context, wallet.as_ref(), client).await
}

/// Transfer `amount` of `token` from the wallet account.
pub async fn transfer(context: &LauncherContext, params: TransferParams) -> Result<Broadcast> {
    let backend = context.backend()?;
    let wallet = context.wallet()?;
    let client = &backend.client;
    let from = context.wallet_account().await?;

    initialize(client, context.network).await?;
    client.init_zkapp_instance(&params.token).await?;

    info!("Fetching accounts");
    client.fetch_account(&from).await?;
    client.fetch_token_account(&from).await?;

    info!(amount = params.amount, to = %params.to, "Creating transfer transaction");
    client
        .create_transfer_transaction(&from, &params.to, params.amount)
        .await
        .context("Failed to create the transfer transaction")?;

    info!("Proving transaction");
    client
        .prove_transaction()
        .await
        .context("Failed to prove the transfer")?;

    broadcast(context, wallet.as_ref(), client).await
}

/// Token balance of `owner`, or of the wallet account.
pub async fn balance(
    context: &LauncherContext,
    token: &PublicKey,
    owner: Option<PublicKey>,
) -> Result<BalanceReport> {
    let client = &context.backend()?.client;
    let owner = match owner {
        Some(owner) => owner,
        None => context.wallet_account().await?,
    };

    initialize(client, context.network).await?;
    client.init_zkapp_instance(token).await?;
    client.fetch_account(&owner).await?;
    client.fetch_token_account(&owner).await?;

    let balance = client.get_balance(&owner).await?;
    Ok(BalanceReport {
        token: token.to_string(),
        owner: owner.to_string(),
        balance,
    })
}

/// Token id, decimals, supply and admin of `token`.
pub async fn info(context: &LauncherContext, token: &PublicKey) -> Result<TokenInfo> {
    let client = &context.backend()?.client;

    initialize(client, context.network).await?;
    client.init_zkapp_instance(token).await?;
    client.fetch_account(token).await?;

    let token_id = client.derive_token_id().await?;
    let decimals = client.get_decimals().await?;
    let circulating = client.get_circulating().await?;
    let admin_contract = match client.get_admin_contract().await {
        Ok(admin) => Some(admin),
        Err(e) => {
            warn!(error = %e, "Admin contract unavailable");
            None
        }
    };

    Ok(TokenInfo {
        address: token.to_string(),
        token_id,
        decimals,
        circulating,
        admin_contract,
    })
}

/// Inferred nonce of `address`, from the indexer or the simulated ledger.
pub async fn nonce(context: &LauncherContext, address: &PublicKey) -> Result<u64> {
    let source = context.nonce_source()?;
    let nonce = source
        .inferred_nonce(address, context.network)
        .await
        .with_context(|| format!("Failed to look up the nonce of {}", address))?;
    Ok(nonce)
}
