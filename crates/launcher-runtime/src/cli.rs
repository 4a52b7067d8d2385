//! Command-line interface of `token-launcher`.

use anyhow::{bail, Result};
use clap::{Parser, Subcommand};
use shared_types::{Network, PrivateKey, PublicKey};
use std::path::PathBuf;

use crate::config::LauncherConfig;
use crate::context::LauncherContext;
use crate::flows::{self, DeployParams, MintParams, TransferParams};

#[derive(Parser, Debug)]
#[command(name = "token-launcher")]
#[command(version, about = "Deploy, mint and transfer fungible tokens", long_about = None)]
pub struct Cli {
    /// Network to use instead of the saved selection
    #[arg(long, global = true)]
    pub network: Option<Network>,

    /// Directory holding the token list and network selection
    #[arg(long, global = true)]
    pub data_dir: Option<PathBuf>,

    /// Run against the simulated network with a development wallet
    #[arg(long, global = true)]
    pub simulate: bool,

    /// Print Prometheus metrics after the command
    #[arg(long, global = true)]
    pub print_metrics: bool,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Deploy a new token with its admin contract
    Deploy {
        #[arg(long, default_value = "ABC")]
        symbol: String,
        #[arg(long, default_value_t = 9)]
        decimals: u8,
        /// Token contract source URL
        #[arg(long)]
        src: Option<String>,
        #[arg(long)]
        fee_payer_key: Option<PrivateKey>,
    },

    /// Mint tokens to an account
    Mint {
        #[arg(long)]
        token: PublicKey,
        #[arg(long, default_value_t = 99)]
        amount: u64,
        /// Defaults to the wallet account
        #[arg(long)]
        recipient: Option<PublicKey>,
        /// Defaults to the admin key saved at deploy
        #[arg(long)]
        admin_key: Option<PrivateKey>,
        #[arg(long)]
        fee_payer_key: Option<PrivateKey>,
    },

    /// Transfer tokens from the wallet account
    Transfer {
        #[arg(long)]
        token: PublicKey,
        #[arg(long)]
        to: PublicKey,
        #[arg(long)]
        amount: u64,
    },

    /// Show a token balance
    Balance {
        #[arg(long)]
        token: PublicKey,
        /// Defaults to the wallet account
        #[arg(long)]
        owner: Option<PublicKey>,
    },

    /// Show token id, decimals, supply and admin
    Info {
        #[arg(long)]
        token: PublicKey,
    },

    /// Show the inferred nonce of an account
    Nonce {
        #[arg(long)]
        address: PublicKey,
    },

    /// Manage the saved token list
    Tokens {
        #[command(subcommand)]
        action: TokensCommand,
    },

    /// Show or change the saved network
    Network { network: Option<Network> },
}

#[derive(Subcommand, Debug)]
pub enum TokensCommand {
    List,
    /// Save a token launched elsewhere
    Import {
        address: String,
        #[arg(long)]
        admin_public_key: Option<String>,
        #[arg(long)]
        admin_private_key: Option<String>,
    },
    Remove { id: String },
}

impl Cli {
    /// Environment configuration with the global flags applied on top.
    pub fn apply(&self, mut config: LauncherConfig) -> LauncherConfig {
        if let Some(network) = self.network {
            config.network = Some(network);
        }
        if let Some(dir) = &self.data_dir {
            config.data_dir = dir.clone();
        }
        if self.simulate {
            config.simulate = true;
        }
        config
    }
}

/// Run one command and return what to print.
pub async fn execute(context: &LauncherContext, command: Command) -> Result<String> {
    let output = match command {
        Command::Deploy {
            symbol,
            decimals,
            src,
            fee_payer_key,
        } => flows::deploy(
            context,
            DeployParams {
                symbol,
                decimals,
                src,
                fee_payer_key,
            },
        )
        .await?
        .to_string(),

        Command::Mint {
            token,
            amount,
            recipient,
            admin_key,
            fee_payer_key,
        } => flows::mint(
            context,
            MintParams {
                token,
                amount,
                recipient,
                admin_key,
                fee_payer_key,
            },
        )
        .await?
        .to_string(),

        Command::Transfer { token, to, amount } => {
            flows::transfer(context, TransferParams { token, to, amount })
                .await?
                .to_string()
        }

        Command::Balance { token, owner } => {
            flows::balance(context, &token, owner).await?.to_string()
        }

        Command::Info { token } => flows::info(context, &token).await?.to_string(),

        Command::Nonce { address } => flows::nonce(context, &address).await?.to_string(),

        Command::Tokens { action } => tokens(context, action)?,

        Command::Network { network: None } => context.network.to_string(),
        Command::Network {
            network: Some(network),
        } => {
            context.registry.set_network(network)?;
            format!("Network set to {}", network)
        }
    };
    Ok(output)
}

fn tokens(context: &LauncherContext, action: TokensCommand) -> Result<String> {
    match action {
        TokensCommand::List => {
            let tokens = context.registry.list()?;
            if tokens.is_empty() {
                return Ok("No tokens saved".to_string());
            }
            let lines: Vec<String> = tokens
                .iter()
                .map(|t| format!("{}  {}  {}", t.id, t.address, t.status))
                .collect();
            Ok(lines.join("\n"))
        }
        TokensCommand::Import {
            address,
            admin_public_key,
            admin_private_key,
        } => {
            let record = context.registry.import(
                &address,
                admin_public_key.as_deref(),
                admin_private_key.as_deref(),
            )?;
            context.record_token_count()?;
            Ok(format!("Imported {} as {}", record.address, record.id))
        }
        TokensCommand::Remove { id } => {
            if !context.registry.remove(&id)? {
                bail!("No token with id {}", id);
            }
            context.record_token_count()?;
            Ok(format!("Removed {}", id))
        }
    }
}
