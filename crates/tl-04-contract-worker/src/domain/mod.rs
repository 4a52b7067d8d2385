//! Domain layer: the operation registry, transaction descriptions and errors.

pub mod errors;
pub mod operations;
pub mod transaction;

pub use errors::{IndexerError, LibraryError};
pub use operations::{
    AmountArg, ContractOperation, DeployResult, NetworkArg, DEFAULT_TOKEN_SRC, MINT_CREATED,
};
pub use transaction::{Action, ContractKind, TransactionSpec};
