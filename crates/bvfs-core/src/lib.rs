pub mod config;
pub mod error;

pub use config::{BvfsConfig, CryptoConfig, TransferConfig};
pub use error::{BvfsError, BvfsResult};
