pub mod codec;
pub mod keys;
pub mod seed_signer;
#[allow(clippy::module_inception)]
pub mod wallet;

pub use keys::{AccountKeys, Seed};
pub use seed_signer::*;
pub use wallet::*;
