//! Versioned base58 identifiers with a double SHA-256 checksum.
//!
//! Layout before base conversion: `version ‖ payload ‖ checksum[4]`, where the
//! checksum is the first four bytes of `sha256(sha256(version ‖ payload))`.
//! This is an error-detecting encoding, not a hardened one: comparisons are
//! not constant-time.

use crate::error::{BridgeError, Result};
use sha2::{Digest, Sha256};

/// Version byte of account addresses.
pub const ACCOUNT_ID_VERSION: u8 = 0;
/// Version byte of master seeds.
pub const SEED_VERSION: u8 = 33;
pub const CHECKSUM_LEN: usize = 4;

/// The 58-symbol ordering used for the base conversion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Alphabet {
    /// Ledger ordering (`rpshnaf39w…`); identifiers start with `r` / `s`.
    #[default]
    Ledger,
    /// Generic (Bitcoin) ordering.
    Generic,
}

impl Alphabet {
    fn table(self) -> &'static bs58::Alphabet {
        match self {
            Alphabet::Ledger => bs58::Alphabet::RIPPLE,
            Alphabet::Generic => bs58::Alphabet::BITCOIN,
        }
    }
}

pub fn checksum(bytes: &[u8]) -> [u8; CHECKSUM_LEN] {
    let digest = Sha256::digest(Sha256::digest(bytes));
    let mut out = [0u8; CHECKSUM_LEN];
    out.copy_from_slice(&digest[..CHECKSUM_LEN]);
    out
}

pub fn encode(version: u8, payload: &[u8]) -> String {
    encode_with(Alphabet::Ledger, version, payload)
}

pub fn decode(version: u8, text: &str) -> Result<Vec<u8>> {
    decode_with(Alphabet::Ledger, version, text)
}

pub fn encode_with(alphabet: Alphabet, version: u8, payload: &[u8]) -> String {
    let mut buf = Vec::with_capacity(1 + payload.len() + CHECKSUM_LEN);
    buf.push(version);
    buf.extend_from_slice(payload);
    let check = checksum(&buf);
    buf.extend_from_slice(&check);
    bs58::encode(buf).with_alphabet(alphabet.table()).into_string()
}

pub fn decode_with(alphabet: Alphabet, version: u8, text: &str) -> Result<Vec<u8>> {
    let (found, payload) = decode_any_with(alphabet, text)?;
    if found != version {
        return Err(BridgeError::InvalidVersion {
            expected: version,
            found,
        });
    }
    Ok(payload)
}

/// Decodes without asserting a version; returns `(version, payload)`.
pub fn decode_any(text: &str) -> Result<(u8, Vec<u8>)> {
    decode_any_with(Alphabet::Ledger, text)
}

pub fn decode_any_with(alphabet: Alphabet, text: &str) -> Result<(u8, Vec<u8>)> {
    let bytes = bs58::decode(text)
        .with_alphabet(alphabet.table())
        .into_vec()
        .map_err(|e| character_error(text, e))?;
    if bytes.len() < 1 + CHECKSUM_LEN {
        return Err(BridgeError::InvalidChecksum);
    }
    let (body, check) = bytes.split_at(bytes.len() - CHECKSUM_LEN);
    if checksum(body) != check {
        return Err(BridgeError::InvalidChecksum);
    }
    Ok((body[0], body[1..].to_vec()))
}

fn character_error(text: &str, e: bs58::decode::Error) -> BridgeError {
    let index = match e {
        bs58::decode::Error::InvalidCharacter { index, .. } => index,
        bs58::decode::Error::NonAsciiCharacter { index } => index,
        _ => 0,
    };
    let character = text
        .get(index..)
        .and_then(|s| s.chars().next())
        .unwrap_or(char::REPLACEMENT_CHARACTER);
    BridgeError::InvalidCharacter { character, index }
}

pub fn encode_address(account_id: &[u8; 20]) -> String {
    encode(ACCOUNT_ID_VERSION, account_id)
}

pub fn decode_address(address: &str) -> Result<[u8; 20]> {
    let payload = decode(ACCOUNT_ID_VERSION, address)?;
    payload
        .try_into()
        .map_err(|_| BridgeError::InvalidAddress(address.to_string()))
}

/// True when `address` is a well-formed account address.
pub fn is_valid_address(address: &str) -> bool {
    decode_address(address).is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round_trip_both_alphabets() {
        let payloads: [&[u8]; 4] = [&[], &[0, 0, 1], &[0xff; 20], b"ledger bridge"];
        for alphabet in [Alphabet::Ledger, Alphabet::Generic] {
            for payload in payloads {
                for version in [ACCOUNT_ID_VERSION, SEED_VERSION, 255] {
                    let text = encode_with(alphabet, version, payload);
                    let decoded = decode_with(alphabet, version, &text).unwrap();
                    assert_eq!(decoded, payload);
                    assert_eq!(encode_with(alphabet, version, &decoded), text);
                }
            }
        }
    }

    #[test]
    fn test_zero_account_is_all_leading_symbol() {
        // version 0 plus twenty zero bytes: 21 leading zeros map to 'r'
        let text = encode_address(&[0u8; 20]);
        assert_eq!(text, "rrrrrrrrrrrrrrrrrrrrrhoLvTp");
        assert_eq!(decode_address(&text).unwrap(), [0u8; 20]);
    }

    #[test]
    fn test_one_account() {
        let mut id = [0u8; 20];
        id[19] = 1;
        assert_eq!(encode_address(&id), "rrrrrrrrrrrrrrrrrrrrBZbvji");
    }

    #[test]
    fn test_foreign_version_rejected() {
        let text = encode(SEED_VERSION, &[7u8; 16]);
        match decode(ACCOUNT_ID_VERSION, &text) {
            Err(BridgeError::InvalidVersion { expected, found }) => {
                assert_eq!(expected, ACCOUNT_ID_VERSION);
                assert_eq!(found, SEED_VERSION);
            }
            other => panic!("expected InvalidVersion, got {:?}", other),
        }
    }

    #[test]
    fn test_single_character_corruption_detected() {
        let text = encode(ACCOUNT_ID_VERSION, &[0x42; 20]);
        let symbols: Vec<char> = "rpshnaf39wBUDNEGHJKLM4PQRST7VWXYZ2bcdeCg65jkm8oFqi1tuvAxyz"
            .chars()
            .collect();
        for position in 0..text.len() {
            let original = text.as_bytes()[position] as char;
            let replacement = symbols.iter().copied().find(|c| *c != original).unwrap();
            let mut corrupted: Vec<char> = text.chars().collect();
            corrupted[position] = replacement;
            let corrupted: String = corrupted.into_iter().collect();
            let result = decode(ACCOUNT_ID_VERSION, &corrupted);
            assert!(
                matches!(
                    result,
                    Err(BridgeError::InvalidChecksum) | Err(BridgeError::InvalidVersion { .. })
                ),
                "corruption at {} not detected: {:?}",
                position,
                result
            );
        }
    }

    #[test]
    fn test_character_outside_alphabet() {
        // '0' and 'l' are not in either alphabet
        match decode(ACCOUNT_ID_VERSION, "rHb9CJAWyB4rj91VRWn96Dk0kG4bwdtyTh") {
            Err(BridgeError::InvalidCharacter { character, index }) => {
                assert_eq!(character, '0');
                assert_eq!(index, 23);
            }
            other => panic!("expected InvalidCharacter, got {:?}", other),
        }
        assert!(matches!(
            decode_with(Alphabet::Generic, 0, "abcl"),
            Err(BridgeError::InvalidCharacter { character: 'l', .. })
        ));
    }

    #[test]
    fn test_too_short_fails_closed() {
        assert!(matches!(decode(0, ""), Err(BridgeError::InvalidChecksum)));
        assert!(matches!(decode(0, "rpsh"), Err(BridgeError::InvalidChecksum)));
    }

    #[test]
    fn test_alphabets_are_not_interchangeable() {
        let text = encode_with(Alphabet::Generic, 0, &[9u8; 20]);
        assert!(decode_with(Alphabet::Ledger, 0, &text).is_err());
    }
}
