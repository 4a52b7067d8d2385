pub mod outbound;

pub use outbound::{NonceSource, ZkContractLibrary, ZkTransaction};
