//! Wire envelope `{ name, data, sid? }` shared by both directions.

use crate::error::{BridgeError, Result};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use std::fmt;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    pub name: String,
    #[serde(default)]
    pub data: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sid: Option<String>,
}

impl Envelope {
    pub fn parse(text: &str) -> Result<Self> {
        Ok(serde_json::from_str(text)?)
    }

    /// Serialized outbound message carrying `payload` and the session id.
    pub fn outbound<P: Serialize>(name: &str, payload: &P, sid: &str) -> Result<String> {
        let data = serde_json::to_value(payload)
            .map_err(|e| BridgeError::SerializationFailure(format!("{}: {}", name, e)))?;
        let envelope = Envelope {
            name: name.to_string(),
            data,
            sid: Some(sid.to_string()),
        };
        Ok(serde_json::to_string(&envelope)?)
    }

    /// Best-effort rendering used when `payload` cannot be serialized: the
    /// data field carries the payload's debug text.
    pub fn fallback<P: fmt::Debug>(name: &str, payload: &P, sid: &str) -> String {
        json!({
            "name": name,
            "data": format!("{:?}", payload),
            "sid": sid,
        })
        .to_string()
    }

    /// Removes `data.success` and reports whether it was truthy.
    pub fn take_success(&mut self) -> bool {
        match self.data.as_object_mut() {
            Some(data) => data.remove("success").is_some_and(|flag| is_truthy(&flag)),
            None => false,
        }
    }
}

/// Truthiness as the server's scripting side understands it.
pub fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0 && !f.is_nan()),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}
