pub mod channel;
pub mod config;
pub mod error;
pub mod ledger_rpc;
pub mod wallet;

pub use error::{BridgeError, Result};
pub use wallet::*;
