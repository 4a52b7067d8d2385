//! Development wallet.
//!
//! Stands in for the browser extension: it holds a fixed set of accounts,
//! connects without a prompt and forwards transactions to a sink.

use async_trait::async_trait;
use parking_lot::RwLock;
use shared_types::PublicKey;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::{debug, info};

use crate::domain::{SendTransactionArgs, SendTransactionResult, WalletError};
use crate::ports::{TransactionSink, WalletProvider};

const ACCOUNT_EVENT_CAPACITY: usize = 16;

pub struct DevWallet {
    accounts: RwLock<Vec<PublicKey>>,
    connected: AtomicBool,
    sink: Arc<dyn TransactionSink>,
    events: broadcast::Sender<Vec<String>>,
}

impl DevWallet {
    pub fn new(accounts: Vec<PublicKey>, sink: Arc<dyn TransactionSink>) -> Self {
        let (events, _) = broadcast::channel(ACCOUNT_EVENT_CAPACITY);
        Self {
            accounts: RwLock::new(accounts),
            connected: AtomicBool::new(false),
            sink,
            events,
        }
    }

    /// A wallet that is already connected.
    pub fn connected(accounts: Vec<PublicKey>, sink: Arc<dyn TransactionSink>) -> Self {
        let wallet = Self::new(accounts, sink);
        wallet.connected.store(true, Ordering::Release);
        wallet
    }

    /// Replace the account list and notify subscribers.
    pub fn set_accounts(&self, accounts: Vec<PublicKey>) {
        let addresses = Self::addresses(&accounts);
        *self.accounts.write() = accounts;
        info!(accounts = addresses.len(), "Wallet accounts changed");
        // no subscribers is fine
        let _ = self.events.send(addresses);
    }

    pub fn disconnect(&self) {
        self.connected.store(false, Ordering::Release);
        let _ = self.events.send(Vec::new());
    }

    pub fn is_connected(&self) -> bool {
        self.connected.load(Ordering::Acquire)
    }

    fn addresses(accounts: &[PublicKey]) -> Vec<String> {
        accounts.iter().map(|k| k.to_base58().to_string()).collect()
    }
}

#[async_trait]
impl WalletProvider for DevWallet {
    async fn get_accounts(&self) -> Result<Vec<String>, WalletError> {
        if !self.is_connected() {
            return Ok(Vec::new());
        }
        Ok(Self::addresses(&self.accounts.read()))
    }

    async fn request_accounts(&self) -> Result<Vec<String>, WalletError> {
        let accounts = Self::addresses(&self.accounts.read());
        if accounts.is_empty() {
            return Err(WalletError::NoAccounts);
        }
        if !self.connected.swap(true, Ordering::AcqRel) {
            let _ = self.events.send(accounts.clone());
        }
        Ok(accounts)
    }

    async fn send_transaction(
        &self,
        args: SendTransactionArgs,
    ) -> Result<SendTransactionResult, WalletError> {
        if !self.is_connected() {
            return Err(WalletError::NoAccounts);
        }
        if args.transaction.trim().is_empty() {
            return Err(WalletError::EmptyTransaction);
        }
        args.fee_payer.validate()?;
        let fee = args.fee_payer.fee_nanomina()?;

        debug!(fee_nanomina = fee, "Submitting transaction");
        let hash = self
            .sink
            .submit(&args.transaction, fee, &args.fee_payer.memo)
            .await?;
        info!(hash = %hash, "Transaction broadcast");

        Ok(SendTransactionResult { hash })
    }

    fn subscribe_accounts(&self) -> broadcast::Receiver<Vec<String>> {
        self.events.subscribe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{BroadcastError, FeePayer};
    use parking_lot::Mutex;
    use shared_types::{base58_digits, PUBLIC_KEY_LEN};

    #[derive(Default)]
    struct RecordingSink {
        submitted: Mutex<Vec<(String, u64, String)>>,
        fail: bool,
    }

    #[async_trait]
    impl TransactionSink for RecordingSink {
        async fn submit(
            &self,
            transaction: &str,
            fee_nanomina: u64,
            memo: &str,
        ) -> Result<String, BroadcastError> {
            if self.fail {
                return Err(BroadcastError("Account nonce mismatch".into()));
            }
            let mut submitted = self.submitted.lock();
            submitted.push((transaction.to_string(), fee_nanomina, memo.to_string()));
            Ok(format!("5Jhash{}", submitted.len()))
        }
    }

    fn key(seed: u8) -> PublicKey {
        let value = format!("B62q{}", base58_digits(&[seed, 3, 9], PUBLIC_KEY_LEN - 4));
        PublicKey::from_base58(&value).unwrap()
    }

    #[tokio::test]
    async fn test_accounts_hidden_until_connected() {
        let wallet = DevWallet::new(vec![key(1)], Arc::new(RecordingSink::default()));
        assert!(wallet.get_accounts().await.unwrap().is_empty());

        let accounts = wallet.request_accounts().await.unwrap();
        assert_eq!(accounts, vec![key(1).to_base58().to_string()]);
        assert_eq!(wallet.get_accounts().await.unwrap(), accounts);
    }

    #[tokio::test]
    async fn test_request_accounts_without_accounts() {
        let wallet = DevWallet::new(Vec::new(), Arc::new(RecordingSink::default()));
        assert!(matches!(
            wallet.request_accounts().await,
            Err(WalletError::NoAccounts)
        ));
    }

    #[tokio::test]
    async fn test_send_transaction_forwards_to_sink() {
        let sink = Arc::new(RecordingSink::default());
        let wallet = DevWallet::connected(vec![key(2)], sink.clone());

        let result = wallet
            .send_transaction(SendTransactionArgs::new("{\"tx\":1}"))
            .await
            .unwrap();
        assert_eq!(result.hash, "5Jhash1");

        let submitted = sink.submitted.lock();
        assert_eq!(
            submitted.as_slice(),
            &[("{\"tx\":1}".to_string(), 100_000_000, String::new())]
        );
    }

    #[tokio::test]
    async fn test_send_transaction_validates_input() {
        let wallet = DevWallet::connected(vec![key(2)], Arc::new(RecordingSink::default()));

        assert!(matches!(
            wallet.send_transaction(SendTransactionArgs::new("  ")).await,
            Err(WalletError::EmptyTransaction)
        ));

        let args = SendTransactionArgs {
            transaction: "{}".into(),
            fee_payer: FeePayer {
                fee: f64::NAN,
                memo: String::new(),
            },
        };
        assert!(matches!(
            wallet.send_transaction(args).await,
            Err(WalletError::InvalidFee(_))
        ));
    }

    #[tokio::test]
    async fn test_broadcast_failure_is_reported() {
        let sink = Arc::new(RecordingSink {
            fail: true,
            ..RecordingSink::default()
        });
        let wallet = DevWallet::connected(vec![key(2)], sink);

        let err = wallet
            .send_transaction(SendTransactionArgs::new("{}"))
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "Broadcast failed: Account nonce mismatch");
    }

    #[tokio::test]
    async fn test_account_change_events() {
        let wallet = DevWallet::connected(vec![key(1)], Arc::new(RecordingSink::default()));
        let mut events = wallet.subscribe_accounts();

        wallet.set_accounts(vec![key(4)]);
        assert_eq!(
            events.recv().await.unwrap(),
            vec![key(4).to_base58().to_string()]
        );

        wallet.disconnect();
        assert!(events.recv().await.unwrap().is_empty());
        assert!(wallet.get_accounts().await.unwrap().is_empty());
    }
}
