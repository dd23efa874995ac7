use crate::error::{BridgeError, Result};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::convert::TryFrom;

/// Engine result code of a successfully applied transaction.
pub const ENGINE_SUCCESS: i64 = 0;

/// Result payload of `submit`.
///
/// Example JSON returned by the ledger server:
/// ```json
/// {
///   "engine_result": "tesSUCCESS",
///   "engine_result_code": 0,
///   "engine_result_message": "The transaction was applied.",
///   "tx_json": { "hash": "C53E…", "TransactionType": "Payment" }
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubmitResult {
    pub engine_result: String,
    pub engine_result_code: i64,
    pub engine_result_message: Option<String>,
    pub tx_blob: Option<String>,
    pub tx_json: Option<Value>,
}

impl SubmitResult {
    pub fn is_success(&self) -> bool {
        self.engine_result_code == ENGINE_SUCCESS
    }
    pub fn tx_hash(&self) -> Option<String> {
        self.tx_json
            .as_ref()
            .and_then(|tx| tx.get("hash"))
            .and_then(|h| h.as_str())
            .map(str::to_string)
    }
    pub fn into_rejection(self) -> BridgeError {
        BridgeError::RejectedByNetwork {
            code: self.engine_result_code,
            result: self.engine_result,
        }
    }
}

impl TryFrom<Value> for SubmitResult {
    type Error = BridgeError;

    fn try_from(value: Value) -> Result<Self> {
        parse_result(value)
    }
}

/// The ledger server reports request-level failures inside `result` with
/// `"status": "error"`; turn those into `BridgeError::Rpc`.
pub fn parse_result<T: DeserializeOwned>(value: Value) -> Result<T> {
    if value.get("status").and_then(|s| s.as_str()) == Some("error") {
        let error = value
            .get("error_message")
            .or_else(|| value.get("error"))
            .and_then(|e| e.as_str())
            .unwrap_or("unknown error");
        return Err(BridgeError::Rpc(error.to_string()));
    }
    Ok(serde_json::from_value(value)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_success_result() {
        let result = SubmitResult::try_from(json!({
            "status": "success",
            "engine_result": "tesSUCCESS",
            "engine_result_code": 0,
            "engine_result_message": "The transaction was applied.",
            "tx_json": {"hash": "ABCD"}
        }))
        .unwrap();
        assert!(result.is_success());
        assert_eq!(result.tx_hash().as_deref(), Some("ABCD"));
    }

    #[test]
    fn test_rejection_carries_code() {
        let result = SubmitResult::try_from(json!({
            "engine_result": "tecUNFUNDED_PAYMENT",
            "engine_result_code": 104
        }))
        .unwrap();
        assert!(!result.is_success());
        match result.into_rejection() {
            BridgeError::RejectedByNetwork { code, result } => {
                assert_eq!(code, 104);
                assert_eq!(result, "tecUNFUNDED_PAYMENT");
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_error_status_becomes_rpc_error() {
        let err = parse_result::<SubmitResult>(json!({
            "status": "error",
            "error": "actNotFound",
            "error_message": "Account not found."
        }))
        .unwrap_err();
        assert!(matches!(err, BridgeError::Rpc(msg) if msg == "Account not found."));
    }
}
