//! Wiring for one command invocation.
//!
//! Opens the token registry, resolves the network and, when a contract
//! backend is available, starts the contract worker behind a call router.

use launcher_telemetry::{record_router_stats, TOKENS_STORED};
use shared_types::{KeyPair, Network, PublicKey, NANOMINA_PER_MINA};
use std::sync::Arc;
use thiserror::Error;
use tl_01_call_router::{spawn_router, ConfigError, RouterHandle, StatsSnapshot};
use tl_02_wallet_bridge::{DevWallet, WalletError, WalletProvider};
use tl_03_token_registry::{RegistryError, TokenRegistry};
use tl_04_contract_worker::{
    ContractDispatcher, ContractWorkerClient, GraphqlIndexer, IndexerError, LibraryError,
    NonceSource, SimulatedNetwork,
};
use tracing::{debug, info};

use crate::config::LauncherConfig;

/// Seed of the development account used in simulation mode.
pub const DEV_ACCOUNT_SEED: &str = "token-launcher-dev";

/// Balance given to the development account the first time it is used.
pub const DEV_ACCOUNT_FUNDING: u64 = 1_000 * NANOMINA_PER_MINA;

#[derive(Debug, Error)]
pub enum ContextError {
    #[error(transparent)]
    Registry(#[from] RegistryError),

    #[error("Simulated ledger: {0}")]
    Ledger(#[from] LibraryError),

    #[error(transparent)]
    Router(#[from] ConfigError),

    #[error(transparent)]
    Indexer(#[from] IndexerError),

    /// No contract library is reachable without simulation.
    #[error("No contract backend for {0}; run with --simulate")]
    NoBackend(Network),
}

/// Contract worker and wallet for the simulated network.
pub struct Backend {
    pub client: ContractWorkerClient,
    pub wallet: Arc<dyn WalletProvider>,
    pub network: SimulatedNetwork,
    /// Funded account the wallet signs for.
    pub dev_account: KeyPair,
    handle: RouterHandle,
}

pub struct LauncherContext {
    pub config: LauncherConfig,
    pub network: Network,
    pub registry: TokenRegistry,
    backend: Option<Backend>,
}

impl LauncherContext {
    /// Open the data directory and, in simulation mode, start the worker.
    ///
    /// Must be called from within a tokio runtime.
    pub fn open(config: LauncherConfig) -> Result<Self, ContextError> {
        let registry = TokenRegistry::open(&config.data_dir)?;
        let network = match config.network {
            Some(network) => network,
            None => registry.network()?,
        };
        debug!(network = %network, data_dir = %config.data_dir.display(), "Opening launcher context");

        let backend = if config.simulate {
            Some(Self::start_simulated(&config)?)
        } else {
            None
        };

        let context = Self {
            config,
            network,
            registry,
            backend,
        };
        context.record_token_count()?;
        Ok(context)
    }

    fn start_simulated(config: &LauncherConfig) -> Result<Backend, ContextError> {
        let network = SimulatedNetwork::open(config.ledger_path())?;
        let dev_account = SimulatedNetwork::keypair_from_seed(DEV_ACCOUNT_SEED);
        if network.balance(&dev_account.public_key).is_none() {
            network.fund(&dev_account.public_key, DEV_ACCOUNT_FUNDING)?;
            info!(account = %dev_account.public_key, "Funded development account");
        }

        let dispatcher =
            ContractDispatcher::new(Arc::new(network.clone()), Arc::new(network.clone()));
        let (router, handle) = spawn_router(dispatcher, &config.router)?;
        let wallet = DevWallet::connected(
            vec![dev_account.public_key.clone()],
            Arc::new(network.clone()),
        );

        Ok(Backend {
            client: ContractWorkerClient::new(router),
            wallet: Arc::new(wallet),
            network,
            dev_account,
            handle,
        })
    }

    pub fn backend(&self) -> Result<&Backend, ContextError> {
        self.backend
            .as_ref()
            .ok_or(ContextError::NoBackend(self.network))
    }

    /// Wallet for flows that broadcast. Without a backend no wallet is present.
    pub fn wallet(&self) -> Result<Arc<dyn WalletProvider>, WalletError> {
        self.backend
            .as_ref()
            .map(|b| Arc::clone(&b.wallet))
            .ok_or(WalletError::NotDetected)
    }

    /// Source of inferred nonces: the simulated ledger, or the live indexer.
    pub fn nonce_source(&self) -> Result<Arc<dyn NonceSource>, ContextError> {
        if let Some(backend) = &self.backend {
            return Ok(Arc::new(backend.network.clone()));
        }
        let mut indexer = GraphqlIndexer::new(self.config.indexer_timeout)?;
        if let Some(url) = &self.config.indexer_url {
            indexer = indexer.with_endpoint(url.clone());
        }
        Ok(Arc::new(indexer))
    }

    /// First account the wallet exposes, connecting if needed.
    pub async fn wallet_account(&self) -> anyhow::Result<PublicKey> {
        let accounts = self.wallet()?.request_accounts().await?;
        let first = accounts.first().ok_or(WalletError::NoAccounts)?;
        Ok(PublicKey::from_base58(first)?)
    }

    pub fn router_stats(&self) -> Option<StatsSnapshot> {
        self.backend.as_ref().map(|b| b.client.router().stats())
    }

    pub(crate) fn record_token_count(&self) -> Result<(), RegistryError> {
        let count = self.registry.list()?.len();
        TOKENS_STORED.set(i64::try_from(count).unwrap_or(i64::MAX));
        Ok(())
    }

    /// Mirror router counters into the metrics registry and stop the worker.
    pub async fn close(self) {
        let Some(backend) = self.backend else {
            return;
        };
        let stats = backend.client.router().stats();
        record_stats(&stats);
        let exit = backend.handle.shutdown().await;
        debug!(?exit, "Router closed");
    }
}

fn record_stats(stats: &StatsSnapshot) {
    record_router_stats(
        [
            ("registered", stats.registered),
            ("resolved", stats.resolved),
            ("rejected", stats.rejected),
            ("timeouts", stats.timeouts),
            ("cancelled", stats.cancelled),
            ("aborted", stats.aborted),
            ("unknown", stats.unknown_responses),
            ("stale", stats.stale_responses),
            ("malformed", stats.malformed_responses),
        ],
        usize::try_from(stats.pending).unwrap_or(usize::MAX),
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn config(dir: &std::path::Path, simulate: bool) -> LauncherConfig {
        LauncherConfig {
            data_dir: dir.to_path_buf(),
            simulate,
            ..LauncherConfig::default()
        }
    }

    #[tokio::test]
    async fn test_without_simulation_there_is_no_backend() {
        let dir = tempdir().unwrap();
        let context = LauncherContext::open(config(dir.path(), false)).unwrap();

        assert!(matches!(
            context.backend(),
            Err(ContextError::NoBackend(Network::Devnet))
        ));
        assert!(matches!(context.wallet(), Err(WalletError::NotDetected)));
        assert!(context.router_stats().is_none());
        context.close().await;
    }

    #[tokio::test]
    async fn test_simulation_funds_dev_account_once() {
        let dir = tempdir().unwrap();
        let context = LauncherContext::open(config(dir.path(), true)).unwrap();
        let account = context.wallet_account().await.unwrap();
        let backend = context.backend().unwrap();
        assert_eq!(account, backend.dev_account.public_key);
        assert_eq!(backend.network.balance(&account), Some(DEV_ACCOUNT_FUNDING));
        context.close().await;

        let reopened = LauncherContext::open(config(dir.path(), true)).unwrap();
        let backend = reopened.backend().unwrap();
        assert_eq!(
            backend.network.balance(&backend.dev_account.public_key),
            Some(DEV_ACCOUNT_FUNDING)
        );
        reopened.close().await;
    }

    #[tokio::test]
    async fn test_network_flag_overrides_stored_selection() {
        let dir = tempdir().unwrap();
        TokenRegistry::open(dir.path())
            .unwrap()
            .set_network(Network::Mainnet)
            .unwrap();

        let stored = LauncherContext::open(config(dir.path(), false)).unwrap();
        assert_eq!(stored.network, Network::Mainnet);

        let mut overridden = config(dir.path(), false);
        overridden.network = Some(Network::Devnet);
        let context = LauncherContext::open(overridden).unwrap();
        assert_eq!(context.network, Network::Devnet);
    }
}
