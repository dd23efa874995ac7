use crate::error::{BridgeError, Result};
use crate::wallet::codec;
use crate::wallet::keys::{AccountKeys, address_from_public_key};
use base64::{Engine as _, engine::general_purpose};
use k256::ecdsa::signature::hazmat::{PrehashSigner, PrehashVerifier};
use k256::ecdsa::{Signature, VerifyingKey};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha512};

/// Hash prefix for single-signed transactions ("STX\0").
pub const TX_SIGN_PREFIX: [u8; 4] = *b"STX\0";
/// Hash prefix for transaction identifiers ("TXN\0").
pub const TX_ID_PREFIX: [u8; 4] = *b"TXN\0";
/// Hash prefix for free-form signed messages ("MSG\0").
pub const MESSAGE_PREFIX: [u8; 4] = *b"MSG\0";

/// First 256 bits of SHA-512 over `prefix ‖ data`.
pub fn sha512_half(prefix: &[u8], data: &[u8]) -> [u8; 32] {
    let mut hasher = Sha512::new();
    hasher.update(prefix);
    hasher.update(data);
    let digest = hasher.finalize();
    let mut out = [0u8; 32];
    out.copy_from_slice(&digest[..32]);
    out
}

/// ECDSA over `sha512_half(prefix, data)`, DER encoded, low-S.
pub fn sign_prefixed(keys: &AccountKeys, prefix: &[u8], data: &[u8]) -> Result<Vec<u8>> {
    let digest = sha512_half(prefix, data);
    let sig: Signature = keys
        .signing_key()
        .sign_prehash(&digest)
        .map_err(|e| BridgeError::Signing(e.to_string()))?;
    let sig = sig.normalize_s().unwrap_or(sig);
    Ok(sig.to_der().as_bytes().to_vec())
}

pub fn verify_prefixed(
    public_key: &[u8],
    prefix: &[u8],
    data: &[u8],
    der_signature: &[u8],
) -> Result<bool> {
    let vk = VerifyingKey::from_sec1_bytes(public_key)
        .map_err(|e| BridgeError::Signing(format!("invalid public key: {}", e)))?;
    let sig = match Signature::from_der(der_signature) {
        Ok(sig) => sig,
        Err(_) => return Ok(false),
    };
    let digest = sha512_half(prefix, data);
    Ok(vk.verify_prehash(&digest, &sig).is_ok())
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PubKeyBundle {
    #[serde(rename = "type")]
    pub key_type: String,
    pub value: String,
}

impl PubKeyBundle {
    pub fn new(key_type: String, value: String) -> Self {
        Self { key_type, value }
    }
    pub fn secp256k1(public_key: &[u8]) -> Self {
        Self::new(
            "secp256k1".to_string(),
            general_purpose::STANDARD.encode(public_key),
        )
    }
    pub fn key_bytes(&self) -> Result<Vec<u8>> {
        general_purpose::STANDARD
            .decode(self.value.as_bytes())
            .map_err(|e| BridgeError::Signing(format!("public key is not base64: {}", e)))
    }
}

/// A signed free-form message: who signed, with which key, and the signature.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignatureBundle {
    pub address: String,
    pub key: PubKeyBundle,
    pub signature: String,
}

impl SignatureBundle {
    pub fn new(address: String, key: PubKeyBundle, signature: String) -> Self {
        Self {
            address,
            key,
            signature,
        }
    }
    pub fn signature_bytes(&self) -> Vec<u8> {
        match general_purpose::STANDARD.decode(self.signature.as_bytes()) {
            Ok(sig) => sig,
            Err(_) => self.signature.as_bytes().to_vec(),
        }
    }
}

/// Sign an arbitrary message with an account key.
pub fn sign_message(keys: &AccountKeys, message: &str) -> Result<SignatureBundle> {
    let sig_bytes = sign_prefixed(keys, &MESSAGE_PREFIX, message.as_bytes())?;
    Ok(SignatureBundle::new(
        keys.address.clone(),
        PubKeyBundle::secp256k1(&keys.public_key),
        general_purpose::STANDARD.encode(sig_bytes),
    ))
}

/// True only if the bundle's key belongs to its address and the signature
/// covers `message`.
pub fn verify_message(bundle: &SignatureBundle, message: &str) -> Result<bool> {
    codec::decode_address(&bundle.address)?;
    let public_key = bundle.key.key_bytes()?;
    if address_from_public_key(&public_key) != bundle.address {
        return Ok(false);
    }
    verify_prefixed(
        &public_key,
        &MESSAGE_PREFIX,
        message.as_bytes(),
        &bundle.signature_bytes(),
    )
}
