pub mod entities;
pub mod errors;

pub use entities::{
    explorer_link, FeePayer, SendTransactionArgs, SendTransactionResult, MAX_MEMO_BYTES,
};
pub use errors::{BroadcastError, WalletError};
