//! In-memory network.
//!
//! Plays the contract library, the indexer and the broadcast endpoint at
//! once, so whole deploy, mint and transfer flows run without a chain. Proofs
//! are digests of the transaction body and signatures are the set of signing
//! addresses. The ledger can be kept in a JSON file so state survives between
//! CLI invocations.

use async_trait::async_trait;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use sha2::{Digest, Sha256};
use shared_types::{KeyPair, Network, PrivateKey, PublicKey, TokenId, NANOMINA_PER_MINA};
use std::collections::{BTreeMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tl_02_wallet_bridge::{BroadcastError, TransactionSink};
use tracing::{debug, info};

use crate::domain::{Action, ContractKind, IndexerError, LibraryError, TransactionSpec};
use crate::ports::{NonceSource, ZkContractLibrary, ZkTransaction};

/// Charged to the payer for every account a transaction creates.
pub const ACCOUNT_CREATION_FEE: u64 = NANOMINA_PER_MINA;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AccountState {
    balance: u64,
    nonce: u64,
    /// Token balances keyed by token contract address.
    #[serde(default)]
    tokens: BTreeMap<String, u64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TokenState {
    symbol: String,
    src: String,
    decimals: u8,
    /// Set by `initialize`.
    admin_contract: Option<String>,
    paused: bool,
    circulating: u64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Ledger {
    accounts: BTreeMap<String, AccountState>,
    tokens: BTreeMap<String, TokenState>,
    /// Admin contract address to the admin key it authorises.
    admin_contracts: BTreeMap<String, String>,
    /// Hashes of applied transactions, oldest first.
    transactions: Vec<String>,
}

impl Ledger {
    fn token(&self, token: &str) -> Result<&TokenState, LibraryError> {
        self.tokens
            .get(token)
            .ok_or_else(|| LibraryError::NotDeployed(token.to_string()))
    }

    fn initialized_token(&self, token: &str) -> Result<&TokenState, LibraryError> {
        let state = self.token(token)?;
        if state.admin_contract.is_none() {
            return Err(LibraryError::NotInitialized(token.to_string()));
        }
        Ok(state)
    }

    fn token_balance(&self, token: &str, owner: &str) -> u64 {
        self.accounts
            .get(owner)
            .and_then(|a| a.tokens.get(token))
            .copied()
            .unwrap_or(0)
    }

    fn debit(&mut self, address: &str, amount: u64) -> Result<(), LibraryError> {
        let account = self
            .accounts
            .get_mut(address)
            .ok_or_else(|| LibraryError::Rejected(format!("Account {} not found", address)))?;
        if account.balance < amount {
            return Err(LibraryError::InsufficientBalance {
                account: address.to_string(),
                available: account.balance,
                required: amount,
            });
        }
        account.balance -= amount;
        Ok(())
    }

    fn apply(&mut self, action: &Action, signers: &HashSet<String>) -> Result<(), LibraryError> {
        let require_signer = |key: &PublicKey| {
            if signers.contains(key.to_base58()) {
                Ok(())
            } else {
                Err(LibraryError::Rejected(format!("Missing signature for {}", key)))
            }
        };

        match action {
            Action::FundNewAccounts { payer, count } => {
                require_signer(payer)?;
                self.debit(payer.to_base58(), u64::from(*count) * ACCOUNT_CREATION_FEE)
            }
            Action::DeployAdmin {
                admin_contract,
                admin,
            } => {
                require_signer(admin_contract)?;
                self.admin_contracts
                    .insert(admin_contract.to_string(), admin.to_string());
                self.accounts.entry(admin_contract.to_string()).or_default();
                Ok(())
            }
            Action::DeployToken { token, symbol, src } => {
                require_signer(token)?;
                if self.tokens.contains_key(token.to_base58()) {
                    return Err(LibraryError::Rejected(format!(
                        "Token contract {} is already deployed",
                        token
                    )));
                }
                self.tokens.insert(
                    token.to_string(),
                    TokenState {
                        symbol: symbol.clone(),
                        src: src.clone(),
                        decimals: 0,
                        admin_contract: None,
                        paused: true,
                        circulating: 0,
                    },
                );
                self.accounts.entry(token.to_string()).or_default();
                Ok(())
            }
            Action::InitializeToken {
                token,
                admin,
                decimals,
                paused,
            } => {
                if !self.admin_contracts.contains_key(admin.to_base58()) {
                    return Err(LibraryError::Rejected(format!(
                        "Admin contract {} is not deployed",
                        admin
                    )));
                }
                let state = self
                    .tokens
                    .get_mut(token.to_base58())
                    .ok_or_else(|| LibraryError::NotDeployed(token.to_string()))?;
                if state.admin_contract.is_some() {
                    return Err(LibraryError::Rejected(format!(
                        "Token contract {} is already initialized",
                        token
                    )));
                }
                state.admin_contract = Some(admin.to_string());
                state.decimals = *decimals;
                state.paused = *paused;
                Ok(())
            }
            Action::Mint {
                token,
                recipient,
                amount,
            } => {
                let state = self.initialized_token(token.to_base58())?;
                if state.paused {
                    return Err(LibraryError::Rejected(format!("Token {} is paused", token)));
                }
                let admin_key = state
                    .admin_contract
                    .as_ref()
                    .and_then(|contract| self.admin_contracts.get(contract))
                    .ok_or_else(|| LibraryError::NotInitialized(token.to_string()))?;
                if !signers.contains(admin_key) {
                    return Err(LibraryError::Rejected(format!(
                        "Missing signature for admin {}",
                        admin_key
                    )));
                }

                let balance = self
                    .accounts
                    .entry(recipient.to_string())
                    .or_default()
                    .tokens
                    .entry(token.to_string())
                    .or_insert(0);
                *balance = balance
                    .checked_add(*amount)
                    .ok_or_else(|| LibraryError::Rejected("Token balance overflow".into()))?;
                if let Some(state) = self.tokens.get_mut(token.to_base58()) {
                    state.circulating = state.circulating.saturating_add(*amount);
                }
                Ok(())
            }
            Action::Transfer {
                token,
                from,
                to,
                amount,
            } => {
                let state = self.token(token.to_base58())?;
                if state.paused {
                    return Err(LibraryError::Rejected(format!("Token {} is paused", token)));
                }
                require_signer(from)?;
                let available = self.token_balance(token.to_base58(), from.to_base58());
                if available < *amount {
                    return Err(LibraryError::InsufficientBalance {
                        account: from.to_string(),
                        available,
                        required: *amount,
                    });
                }
                if let Some(balance) = self
                    .accounts
                    .get_mut(from.to_base58())
                    .and_then(|a| a.tokens.get_mut(token.to_base58()))
                {
                    *balance -= amount;
                }
                *self
                    .accounts
                    .entry(to.to_string())
                    .or_default()
                    .tokens
                    .entry(token.to_string())
                    .or_insert(0) += amount;
                Ok(())
            }
        }
    }
}

#[derive(Debug, Default)]
struct Session {
    network: Option<Network>,
    loaded: bool,
    compiled: HashSet<ContractKind>,
}

struct Inner {
    ledger: RwLock<Ledger>,
    session: RwLock<Session>,
    path: Option<PathBuf>,
    prove_delay_ms: AtomicU64,
}

/// Simulated chain shared by the library, indexer and wallet sink roles.
#[derive(Clone)]
pub struct SimulatedNetwork {
    inner: Arc<Inner>,
}

impl Default for SimulatedNetwork {
    fn default() -> Self {
        Self::new()
    }
}

impl SimulatedNetwork {
    /// A network with an empty ledger held only in memory.
    pub fn new() -> Self {
        Self::with_ledger(Ledger::default(), None)
    }

    /// A network whose ledger is loaded from and saved to `path`.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, LibraryError> {
        let path = path.as_ref();
        let ledger = match fs::read_to_string(path) {
            Ok(content) if content.trim().is_empty() => Ledger::default(),
            Ok(content) => serde_json::from_str(&content).map_err(|e| {
                LibraryError::Storage(format!("{} is not a ledger: {}", path.display(), e))
            })?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ledger::default(),
            Err(e) => return Err(LibraryError::Storage(format!("{}: {}", path.display(), e))),
        };
        debug!(path = %path.display(), accounts = ledger.accounts.len(), "Simulated ledger loaded");
        Ok(Self::with_ledger(ledger, Some(path.to_path_buf())))
    }

    fn with_ledger(ledger: Ledger, path: Option<PathBuf>) -> Self {
        Self {
            inner: Arc::new(Inner {
                ledger: RwLock::new(ledger),
                session: RwLock::new(Session::default()),
                path,
                prove_delay_ms: AtomicU64::new(0),
            }),
        }
    }

    /// Make every `prove` take at least `delay`.
    pub fn set_prove_delay(&self, delay: Duration) {
        self.inner
            .prove_delay_ms
            .store(delay.as_millis() as u64, Ordering::Relaxed);
    }

    /// Deterministic key pair for `seed`.
    pub fn keypair_from_seed(seed: &str) -> KeyPair {
        let entropy = Sha256::digest(seed.as_bytes());
        let private_key = PrivateKey::from_entropy(&entropy);
        let public_key = derive_public(&private_key);
        KeyPair {
            private_key,
            public_key,
        }
    }

    /// Credit `nanomina` to an account, creating it if needed.
    pub fn fund(&self, address: &PublicKey, nanomina: u64) -> Result<(), LibraryError> {
        let mut ledger = self.inner.ledger.write();
        let mut next = ledger.clone();
        let account = next.accounts.entry(address.to_string()).or_default();
        account.balance = account.balance.saturating_add(nanomina);
        self.persist(&next)?;
        *ledger = next;
        info!(address = %address, nanomina, "Account funded");
        Ok(())
    }

    /// Balance in nanomina, `None` if the account does not exist.
    pub fn balance(&self, address: &PublicKey) -> Option<u64> {
        self.inner
            .ledger
            .read()
            .accounts
            .get(address.to_base58())
            .map(|a| a.balance)
    }

    pub fn token_balance(&self, token: &PublicKey, owner: &PublicKey) -> u64 {
        self.inner
            .ledger
            .read()
            .token_balance(token.to_base58(), owner.to_base58())
    }

    pub fn token_symbol(&self, token: &PublicKey) -> Option<String> {
        self.inner
            .ledger
            .read()
            .tokens
            .get(token.to_base58())
            .map(|t| t.symbol.clone())
    }

    /// Hashes of every applied transaction.
    pub fn transactions(&self) -> Vec<String> {
        self.inner.ledger.read().transactions.clone()
    }

    fn persist(&self, ledger: &Ledger) -> Result<(), LibraryError> {
        let Some(path) = &self.inner.path else {
            return Ok(());
        };
        let content =
            serde_json::to_string_pretty(ledger).map_err(|e| LibraryError::Storage(e.to_string()))?;
        let staging = path.with_extension("json.tmp");
        fs::write(&staging, content)
            .and_then(|_| fs::rename(&staging, path))
            .map_err(|e| LibraryError::Storage(format!("{}: {}", path.display(), e)))
    }

    fn require_network(&self) -> Result<Network, LibraryError> {
        self.inner
            .session
            .read()
            .network
            .ok_or(LibraryError::NoActiveNetwork)
    }

    fn apply_transaction(
        &self,
        body: &TransactionBody,
        fee: u64,
        hash: &str,
    ) -> Result<(), LibraryError> {
        let fee_payer = body
            .fee_payer_address()
            .ok_or_else(|| LibraryError::Rejected("Transaction has no fee payer".into()))?;

        let mut signers: HashSet<String> =
            body.signatures.iter().map(|k| k.to_string()).collect();
        signers.insert(fee_payer.to_string());

        let mut ledger = self.inner.ledger.write();
        let mut next = ledger.clone();

        let account = next.accounts.get(fee_payer.to_base58()).ok_or_else(|| {
            LibraryError::Rejected(format!("Fee payer {} not found", fee_payer))
        })?;
        if let Some(nonce) = body.fee_payer.as_ref().and_then(|f| f.nonce) {
            if nonce != account.nonce {
                return Err(LibraryError::Rejected(format!(
                    "Account nonce mismatch: expected {}, got {}",
                    account.nonce, nonce
                )));
            }
        }
        next.debit(fee_payer.to_base58(), fee)?;
        if let Some(account) = next.accounts.get_mut(fee_payer.to_base58()) {
            account.nonce += 1;
        }

        for action in &body.account_updates {
            next.apply(action, &signers)?;
        }
        next.transactions.push(hash.to_string());

        self.persist(&next)?;
        *ledger = next;
        Ok(())
    }
}

/// Address derived from a private key.
fn derive_public(key: &PrivateKey) -> PublicKey {
    PublicKey::from_digest(&Sha256::digest(key.to_base58().as_bytes()))
}

fn token_id_of(token: &str) -> TokenId {
    let digest = Sha256::digest(format!("tokenId:{}", token).as_bytes());
    let mut bytes = [0u8; 16];
    bytes.copy_from_slice(&digest[..16]);
    TokenId(u128::from_be_bytes(bytes).to_string())
}

fn digest_hex(data: &[u8]) -> String {
    hex::encode(Sha256::digest(data))
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct FeePayerBody {
    public_key: PublicKey,
    #[serde(default)]
    fee: Option<u64>,
    #[serde(default)]
    nonce: Option<u64>,
}

/// JSON form of a simulated transaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TransactionBody {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    fee_payer: Option<FeePayerBody>,
    account_updates: Vec<Action>,
    #[serde(default)]
    proof: Option<String>,
    #[serde(default)]
    signatures: Vec<PublicKey>,
}

impl TransactionBody {
    fn from_spec(spec: TransactionSpec) -> Self {
        let fee_payer = spec.sender.map(|public_key| FeePayerBody {
            public_key,
            fee: spec.fee,
            nonce: spec.nonce,
        });
        Self {
            fee_payer,
            account_updates: spec.actions,
            proof: None,
            signatures: Vec::new(),
        }
    }

    /// Explicit sender, else the source of the first transfer.
    fn fee_payer_address(&self) -> Option<&PublicKey> {
        self.fee_payer.as_ref().map(|f| &f.public_key).or_else(|| {
            self.account_updates.iter().find_map(|a| match a {
                Action::Transfer { from, .. } => Some(from),
                _ => None,
            })
        })
    }

    fn expected_proof(&self) -> Result<String, LibraryError> {
        let updates = serde_json::to_vec(&self.account_updates)
            .map_err(|e| LibraryError::Rejected(e.to_string()))?;
        Ok(digest_hex(&updates))
    }
}

struct SimulatedTransaction {
    network: SimulatedNetwork,
    body: TransactionBody,
}

#[async_trait]
impl ZkTransaction for SimulatedTransaction {
    async fn prove(&mut self) -> Result<(), LibraryError> {
        {
            let session = self.network.inner.session.read();
            if let Some(missing) = ContractKind::ALL
                .into_iter()
                .find(|kind| !session.compiled.contains(kind))
            {
                return Err(LibraryError::NotCompiled(missing));
            }
        }

        let delay = self.network.inner.prove_delay_ms.load(Ordering::Relaxed);
        if delay > 0 {
            tokio::time::sleep(Duration::from_millis(delay)).await;
        }

        self.body.proof = Some(self.body.expected_proof()?);
        debug!(updates = self.body.account_updates.len(), "Transaction proved");
        Ok(())
    }

    fn sign(&mut self, keys: &[PrivateKey]) -> Result<(), LibraryError> {
        for key in keys {
            let public = derive_public(key);
            if !self.body.signatures.contains(&public) {
                self.body.signatures.push(public);
            }
        }
        Ok(())
    }

    fn to_json(&self) -> Result<String, LibraryError> {
        serde_json::to_string(&self.body).map_err(|e| LibraryError::Rejected(e.to_string()))
    }
}

#[async_trait]
impl ZkContractLibrary for SimulatedNetwork {
    async fn set_active_network(&self, network: Network) -> Result<(), LibraryError> {
        self.inner.session.write().network = Some(network);
        debug!(network = %network, url = network.graphql_url(), "Active network set");
        Ok(())
    }

    async fn load_contracts(&self) -> Result<(), LibraryError> {
        self.inner.session.write().loaded = true;
        Ok(())
    }

    async fn compile(&self, contract: ContractKind) -> Result<(), LibraryError> {
        let mut session = self.inner.session.write();
        if !session.loaded {
            return Err(LibraryError::NotLoaded);
        }
        session.compiled.insert(contract);
        Ok(())
    }

    async fn fetch_account(
        &self,
        account: &PublicKey,
        token_id: Option<&TokenId>,
    ) -> Result<Option<Value>, LibraryError> {
        self.require_network()?;
        let ledger = self.inner.ledger.read();
        let Some(state) = ledger.accounts.get(account.to_base58()) else {
            return Ok(None);
        };

        let Some(token_id) = token_id else {
            return Ok(Some(json!({
                "publicKey": account.to_base58(),
                "balance": state.balance.to_string(),
                "nonce": state.nonce.to_string(),
            })));
        };

        let balance = ledger
            .tokens
            .keys()
            .find(|token| token_id_of(token) == *token_id)
            .and_then(|token| state.tokens.get(token));
        Ok(balance.map(|balance| {
            json!({
                "publicKey": account.to_base58(),
                "tokenId": token_id.0,
                "balance": balance.to_string(),
            })
        }))
    }

    async fn derive_token_id(&self, token: &PublicKey) -> Result<TokenId, LibraryError> {
        Ok(token_id_of(token.to_base58()))
    }

    async fn balance_of(&self, token: &PublicKey, owner: &PublicKey) -> Result<u64, LibraryError> {
        let ledger = self.inner.ledger.read();
        ledger.token(token.to_base58())?;
        Ok(ledger.token_balance(token.to_base58(), owner.to_base58()))
    }

    async fn decimals(&self, token: &PublicKey) -> Result<u8, LibraryError> {
        let ledger = self.inner.ledger.read();
        Ok(ledger.initialized_token(token.to_base58())?.decimals)
    }

    async fn circulating(&self, token: &PublicKey) -> Result<u64, LibraryError> {
        let ledger = self.inner.ledger.read();
        Ok(ledger.token(token.to_base58())?.circulating)
    }

    async fn admin_contract(&self, token: &PublicKey) -> Result<PublicKey, LibraryError> {
        let ledger = self.inner.ledger.read();
        let state = ledger.initialized_token(token.to_base58())?;
        let address = state
            .admin_contract
            .as_deref()
            .ok_or_else(|| LibraryError::NotInitialized(token.to_string()))?;
        Ok(PublicKey::from_base58(address)?)
    }

    fn random_keypair(&self) -> KeyPair {
        let entropy: [u8; 32] = rand::random();
        let private_key = PrivateKey::from_entropy(&entropy);
        let public_key = derive_public(&private_key);
        KeyPair {
            private_key,
            public_key,
        }
    }

    fn public_key_of(&self, key: &PrivateKey) -> Result<PublicKey, LibraryError> {
        Ok(derive_public(key))
    }

    async fn transaction(
        &self,
        spec: TransactionSpec,
    ) -> Result<Box<dyn ZkTransaction>, LibraryError> {
        self.require_network()?;
        {
            let ledger = self.inner.ledger.read();
            for action in &spec.actions {
                match action {
                    Action::Mint { token, .. } => {
                        ledger.initialized_token(token.to_base58())?;
                    }
                    Action::Transfer {
                        token, from, amount, ..
                    } => {
                        ledger.token(token.to_base58())?;
                        let available = ledger.token_balance(token.to_base58(), from.to_base58());
                        if available < *amount {
                            return Err(LibraryError::InsufficientBalance {
                                account: from.to_string(),
                                available,
                                required: *amount,
                            });
                        }
                    }
                    _ => {}
                }
            }
        }

        Ok(Box::new(SimulatedTransaction {
            network: self.clone(),
            body: TransactionBody::from_spec(spec),
        }))
    }
}

#[async_trait]
impl NonceSource for SimulatedNetwork {
    async fn inferred_nonce(
        &self,
        address: &PublicKey,
        _network: Network,
    ) -> Result<u64, IndexerError> {
        self.inner
            .ledger
            .read()
            .accounts
            .get(address.to_base58())
            .map(|a| a.nonce)
            .ok_or_else(|| IndexerError::AccountNotFound(address.to_string()))
    }
}

#[async_trait]
impl TransactionSink for SimulatedNetwork {
    async fn submit(
        &self,
        transaction: &str,
        fee_nanomina: u64,
        memo: &str,
    ) -> Result<String, BroadcastError> {
        let body: TransactionBody = serde_json::from_str(transaction)
            .map_err(|e| BroadcastError(format!("Malformed transaction: {}", e)))?;

        let expected = body
            .expected_proof()
            .map_err(|e| BroadcastError(e.to_string()))?;
        match &body.proof {
            None => return Err(BroadcastError(LibraryError::NotProven.to_string())),
            Some(proof) if *proof != expected => {
                return Err(BroadcastError("Invalid proof".into()))
            }
            Some(_) => {}
        }

        let hash = digest_hex(transaction.as_bytes());
        self.apply_transaction(&body, fee_nanomina, &hash)
            .map_err(|e| BroadcastError(e.to_string()))?;
        info!(hash = %hash, fee_nanomina, memo, "Simulated transaction applied");
        Ok(hash)
    }
}
