//! Outbound (driven) ports of the contract worker.
//!
//! The worker never builds proofs itself. It drives an external contract
//! library through [`ZkContractLibrary`] and asks an indexer for nonces
//! through [`NonceSource`].

use async_trait::async_trait;
use serde_json::Value;
use shared_types::{KeyPair, Network, PrivateKey, PublicKey, TokenId};

use crate::domain::{ContractKind, IndexerError, LibraryError, TransactionSpec};

/// The zero-knowledge contract library.
#[async_trait]
pub trait ZkContractLibrary: Send + Sync {
    /// Point the library at a network's GraphQL endpoint.
    async fn set_active_network(&self, network: Network) -> Result<(), LibraryError>;

    /// Load the token and admin contract definitions.
    async fn load_contracts(&self) -> Result<(), LibraryError>;

    /// Compile one contract. Requires loaded contracts.
    async fn compile(&self, contract: ContractKind) -> Result<(), LibraryError>;

    /// Fetch an account, or its token account when `token_id` is given.
    ///
    /// Returns `None` when the account does not exist.
    async fn fetch_account(
        &self,
        account: &PublicKey,
        token_id: Option<&TokenId>,
    ) -> Result<Option<Value>, LibraryError>;

    async fn derive_token_id(&self, token: &PublicKey) -> Result<TokenId, LibraryError>;

    async fn balance_of(&self, token: &PublicKey, owner: &PublicKey) -> Result<u64, LibraryError>;

    async fn decimals(&self, token: &PublicKey) -> Result<u8, LibraryError>;

    async fn circulating(&self, token: &PublicKey) -> Result<u64, LibraryError>;

    /// Address of the token's admin contract.
    async fn admin_contract(&self, token: &PublicKey) -> Result<PublicKey, LibraryError>;

    fn random_keypair(&self) -> KeyPair;

    fn public_key_of(&self, key: &PrivateKey) -> Result<PublicKey, LibraryError>;

    /// Build a transaction from its description.
    async fn transaction(
        &self,
        spec: TransactionSpec,
    ) -> Result<Box<dyn ZkTransaction>, LibraryError>;
}

/// A transaction built by the library.
#[async_trait]
pub trait ZkTransaction: Send + Sync {
    /// Generate the proofs. Slow.
    async fn prove(&mut self) -> Result<(), LibraryError>;

    fn sign(&mut self, keys: &[PrivateKey]) -> Result<(), LibraryError>;

    /// JSON form handed to the wallet.
    fn to_json(&self) -> Result<String, LibraryError>;
}

/// Source of the next nonce for a fee payer.
#[async_trait]
pub trait NonceSource: Send + Sync {
    /// Nonce including transactions still in the pool.
    async fn inferred_nonce(
        &self,
        address: &PublicKey,
        network: Network,
    ) -> Result<u64, IndexerError>;
}
