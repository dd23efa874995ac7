use thiserror::Error;

#[derive(Debug, Error)]
pub enum BridgeError {
    #[error("invalid seed: {0}")]
    InvalidSeed(String),
    #[error("checksum mismatch")]
    InvalidChecksum,
    #[error("version byte {found} does not match expected {expected}")]
    InvalidVersion { expected: u8, found: u8 },
    #[error("invalid character {character:?} at position {index}")]
    InvalidCharacter { character: char, index: usize },
    #[error("invalid address {0}")]
    InvalidAddress(String),
    #[error("unknown intent kind: {0}")]
    UnknownIntentKind(String),
    #[error("invalid intent parameters: {0}")]
    InvalidIntent(String),
    #[error("missing field: {0}")]
    MissingField(&'static str),
    #[error("invalid amount: {0}")]
    InvalidAmount(String),
    #[error("invalid state transition: {0}")]
    InvalidState(String),
    #[error("signing failed: {0}")]
    Signing(String),
    #[error("remote unavailable: {0}")]
    RemoteUnavailable(String),
    #[error("RPC request failed: {0}")]
    Rpc(String),
    #[error("serialization error: {0}")]
    SerializationFailure(String),
    #[error("transaction rejected by network: {result} (code {code})")]
    RejectedByNetwork { code: i64, result: String },
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl From<serde_json::Error> for BridgeError {
    fn from(e: serde_json::Error) -> Self {
        BridgeError::SerializationFailure(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, BridgeError>;
