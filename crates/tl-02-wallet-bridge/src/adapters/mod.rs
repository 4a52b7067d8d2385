pub mod dev_wallet;

pub use dev_wallet::DevWallet;
