use crate::error::{BridgeError, Result};
use crate::wallet::codec;
use crate::wallet::keys::{AccountKeys, Seed, derive_account};
use log::debug;

pub const NATIVE_CURRENCY: &str = "XRP";
/// Smallest native units (drops) per whole native unit.
pub const DROPS_PER_UNIT: u64 = 1_000_000;
pub type Drops = u64;

/// A wallet session: one seed, any number of derived accounts.
///
/// Key pairs are recomputed on demand; nothing but the seed is held.
#[derive(Debug, Clone)]
pub struct Wallet {
    seed: Seed,
}

impl Wallet {
    pub fn new(seed: Seed) -> Self {
        Self { seed }
    }

    pub fn from_seed_str(text: &str) -> Result<Self> {
        Ok(Self::new(Seed::from_encoded(text)?))
    }

    pub fn from_passphrase(passphrase: &str) -> Self {
        Self::new(Seed::from_passphrase(passphrase))
    }

    pub fn random() -> Self {
        Self::new(Seed::random())
    }

    pub fn seed_text(&self) -> String {
        self.seed.to_encoded()
    }

    pub fn account(&self, index: u32) -> Result<AccountKeys> {
        derive_account(&self.seed, index)
    }

    pub fn address(&self, index: u32) -> Result<String> {
        Ok(self.account(index)?.address)
    }

    /// Locates the signing identity for `address` among the first
    /// `scan_limit` sub-accounts of this seed.
    pub fn identity_for(&self, address: &str, scan_limit: u32) -> Result<AccountKeys> {
        codec::decode_address(address)?;
        for index in 0..scan_limit.max(1) {
            let keys = self.account(index)?;
            if keys.address == address {
                debug!("identity for {} found at index {}", address, index);
                return Ok(keys);
            }
        }
        Err(BridgeError::InvalidAddress(format!(
            "{} is not derived from this seed within {} accounts",
            address, scan_limit
        )))
    }
}
