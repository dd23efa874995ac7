//! Deterministic secp256k1 key families.
//!
//! A 16-byte seed yields a root key pair; every sub-account index yields an
//! account key pair by tweaking the root public point. Addresses are
//! `RIPEMD160(SHA256(compressed public key))` encoded with version 0.

use crate::error::{BridgeError, Result};
use crate::wallet::codec::{self, SEED_VERSION};
use k256::ecdsa::{SigningKey, VerifyingKey};
use k256::elliptic_curve::PrimeField;
use k256::elliptic_curve::sec1::ToEncodedPoint;
use k256::{FieldBytes, NonZeroScalar, ProjectivePoint, Scalar};
use rand_core::{OsRng, RngCore};
use ripemd::Ripemd160;
use sha2::{Digest, Sha256, Sha512};
use zeroize::{Zeroize, ZeroizeOnDrop};

pub const SEED_LEN: usize = 16;
pub const COMPRESSED_KEY_LEN: usize = 33;
/// Upper bound on candidates tried per scalar search. Each candidate is
/// rejected with probability ~2^-128, so this is never reached in practice.
const MAX_SCALAR_ATTEMPTS: u32 = 1 << 16;

#[derive(Clone, PartialEq, Eq, Zeroize, ZeroizeOnDrop)]
pub struct Seed([u8; SEED_LEN]);

impl Seed {
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let bytes: [u8; SEED_LEN] = bytes.try_into().map_err(|_| {
            BridgeError::InvalidSeed(format!(
                "expected {} bytes, got {}",
                SEED_LEN,
                bytes.len()
            ))
        })?;
        Ok(Self(bytes))
    }

    /// Parses the `s…` text form. Any codec failure is reported as
    /// `InvalidSeed` carrying the underlying cause.
    pub fn from_encoded(text: &str) -> Result<Self> {
        let mut payload = codec::decode(SEED_VERSION, text.trim())
            .map_err(|e| BridgeError::InvalidSeed(e.to_string()))?;
        let seed = Self::from_bytes(&payload);
        payload.zeroize();
        seed
    }

    /// First 16 bytes of SHA-512 over the passphrase.
    pub fn from_passphrase(passphrase: &str) -> Self {
        let digest = Sha512::digest(passphrase.as_bytes());
        let mut bytes = [0u8; SEED_LEN];
        bytes.copy_from_slice(&digest[..SEED_LEN]);
        Self(bytes)
    }

    pub fn random() -> Self {
        let mut bytes = [0u8; SEED_LEN];
        OsRng.fill_bytes(&mut bytes);
        Self(bytes)
    }

    pub fn to_encoded(&self) -> String {
        codec::encode(SEED_VERSION, &self.0)
    }

    pub fn as_bytes(&self) -> &[u8; SEED_LEN] {
        &self.0
    }
}

impl std::fmt::Debug for Seed {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("Seed(..)")
    }
}

/// Key material of one derived account. The private key lives only as long
/// as this value.
#[derive(Clone)]
pub struct AccountKeys {
    pub index: u32,
    pub address: String,
    pub public_key: [u8; COMPRESSED_KEY_LEN],
    signing_key: SigningKey,
}

impl AccountKeys {
    pub fn signing_key(&self) -> &SigningKey {
        &self.signing_key
    }
    pub fn verifying_key(&self) -> &VerifyingKey {
        self.signing_key.verifying_key()
    }
    pub fn public_key_hex(&self) -> String {
        hex::encode_upper(self.public_key)
    }
}

impl std::fmt::Debug for AccountKeys {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AccountKeys")
            .field("index", &self.index)
            .field("address", &self.address)
            .field("public_key", &self.public_key_hex())
            .finish_non_exhaustive()
    }
}

/// Repeatedly hashes `prefix ‖ be32(counter)` with SHA-512 and returns the
/// first 256-bit half that is a valid non-zero scalar below the group order.
fn scalar_search(prefix: &[u8]) -> Result<NonZeroScalar> {
    for counter in 0..MAX_SCALAR_ATTEMPTS {
        let mut hasher = Sha512::new();
        hasher.update(prefix);
        hasher.update(counter.to_be_bytes());
        let digest = hasher.finalize();
        let candidate = FieldBytes::clone_from_slice(&digest[..32]);
        if let Some(scalar) = Option::<NonZeroScalar>::from(NonZeroScalar::from_repr(candidate)) {
            return Ok(scalar);
        }
    }
    Err(BridgeError::InvalidSeed(
        "no valid scalar found within attempt bound".to_string(),
    ))
}

pub fn compress(point: &ProjectivePoint) -> [u8; COMPRESSED_KEY_LEN] {
    let encoded = point.to_affine().to_encoded_point(true);
    let mut out = [0u8; COMPRESSED_KEY_LEN];
    out.copy_from_slice(encoded.as_bytes());
    out
}

/// Root private scalar and root public point of a seed.
pub fn derive_root(seed: &Seed) -> Result<(NonZeroScalar, ProjectivePoint)> {
    let root = scalar_search(seed.as_bytes())?;
    let public = ProjectivePoint::GENERATOR * *root;
    Ok((root, public))
}

/// Account scalar for `index` under the given root public point.
pub fn derive_account_scalar(root_public: &ProjectivePoint, index: u32) -> Result<NonZeroScalar> {
    let mut prefix = Vec::with_capacity(COMPRESSED_KEY_LEN + 4);
    prefix.extend_from_slice(&compress(root_public));
    prefix.extend_from_slice(&index.to_be_bytes());
    scalar_search(&prefix)
}

pub fn derive_account(seed: &Seed, index: u32) -> Result<AccountKeys> {
    let (root, root_public) = derive_root(seed)?;
    let account = derive_account_scalar(&root_public, index)?;
    let account_public = ProjectivePoint::GENERATOR * *account + root_public;
    let public_key = compress(&account_public);

    // (root + account) mod n is the discrete log of account_public
    let private: Scalar = *root + *account;
    let signing_key = SigningKey::from_bytes(&private.to_repr())
        .map_err(|e| BridgeError::InvalidSeed(format!("degenerate account key: {}", e)))?;

    Ok(AccountKeys {
        index,
        address: address_from_public_key(&public_key),
        public_key,
        signing_key,
    })
}

pub fn derive_address(seed: &Seed, index: u32) -> Result<String> {
    Ok(derive_account(seed, index)?.address)
}

pub fn account_id(public_key: &[u8]) -> [u8; 20] {
    let sha256_hash = Sha256::digest(public_key);
    let ripemd160_hash = Ripemd160::digest(sha256_hash);
    let mut out = [0u8; 20];
    out.copy_from_slice(&ripemd160_hash);
    out
}

pub fn address_from_public_key(public_key: &[u8]) -> String {
    codec::encode_address(&account_id(public_key))
}
