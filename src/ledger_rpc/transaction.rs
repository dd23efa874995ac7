//! Transaction intents and their canonical, signable shape.

use super::ledger_types::{IssuedAmount, LedgerAmount, is_native_currency};
use super::rpcclient::method::TransactionType;
use crate::error::{BridgeError, Result};
use crate::wallet::keys::AccountKeys;
use crate::wallet::seed_signer::{
    TX_ID_PREFIX, TX_SIGN_PREFIX, sha512_half, sign_prefixed, verify_prefixed,
};
use crate::wallet::{DROPS_PER_UNIT, Drops, codec};
use log::error;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IntentKind {
    Payment,
    OfferCreate,
    OfferCancel,
    TrustSet,
}

impl IntentKind {
    pub fn transaction_type(self) -> TransactionType {
        match self {
            IntentKind::Payment => TransactionType::Payment,
            IntentKind::OfferCreate => TransactionType::OfferCreate,
            IntentKind::OfferCancel => TransactionType::OfferCancel,
            IntentKind::TrustSet => TransactionType::TrustSet,
        }
    }
}

/// Accepts `payment`, `Payment`, `offer_create`, `offer-create`, `OfferCreate`, ….
impl FromStr for IntentKind {
    type Err = BridgeError;

    fn from_str(s: &str) -> Result<Self> {
        let normalized: String = s
            .chars()
            .filter(|c| *c != '_' && *c != '-')
            .collect::<String>()
            .to_ascii_lowercase();
        match normalized.as_str() {
            "payment" => Ok(IntentKind::Payment),
            "offercreate" => Ok(IntentKind::OfferCreate),
            "offercancel" => Ok(IntentKind::OfferCancel),
            "trustset" => Ok(IntentKind::TrustSet),
            _ => Err(BridgeError::UnknownIntentKind(s.to_string())),
        }
    }
}

impl fmt::Display for IntentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.transaction_type().fmt(f)
    }
}

/// An amount as entered by the user: decimal text, currency, optional issuer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AmountSpec {
    pub amount: String,
    pub currency: String,
    #[serde(default)]
    pub issuer: Option<String>,
}

impl AmountSpec {
    pub fn new(amount: &str, currency: &str, issuer: Option<&str>) -> Self {
        Self {
            amount: amount.to_string(),
            currency: currency.to_string(),
            issuer: issuer.map(str::to_string),
        }
    }

    /// The native asset has no issuer.
    pub fn normalize(&mut self) {
        if is_native_currency(&self.currency) {
            self.issuer = None;
        }
    }

    fn to_ledger_amount(&self, allow_zero: bool) -> Result<LedgerAmount> {
        if is_native_currency(&self.currency) {
            return parse_drops(&self.amount, allow_zero).map(LedgerAmount::drops);
        }
        parse_amount(&self.amount, allow_zero)?;
        if self.currency.trim().is_empty() {
            return Err(BridgeError::MissingField("currency"));
        }
        let issuer = self
            .issuer
            .as_deref()
            .filter(|i| !i.is_empty())
            .ok_or(BridgeError::MissingField("issuer"))?;
        require_address(issuer)?;
        Ok(LedgerAmount::Issued(IssuedAmount {
            value: self.amount.trim().to_string(),
            currency: self.currency.clone(),
            issuer: Some(issuer.to_string()),
        }))
    }
}

const DROP_DECIMALS: usize = 6;

fn parse_amount(text: &str, allow_zero: bool) -> Result<f64> {
    let value: f64 = text
        .trim()
        .parse()
        .map_err(|_| BridgeError::InvalidAmount(format!("{:?} is not a number", text)))?;
    if !value.is_finite() || value < 0.0 || (value == 0.0 && !allow_zero) {
        return Err(BridgeError::InvalidAmount(format!(
            "amount must be a positive number, got {}",
            text
        )));
    }
    Ok(value)
}

/// Converts decimal native-currency text to drops without rounding. More
/// than six fractional digits is an error.
pub fn parse_drops(text: &str, allow_zero: bool) -> Result<Drops> {
    let trimmed = text.trim();
    let invalid = |reason: &str| BridgeError::InvalidAmount(format!("{:?}: {}", text, reason));
    let (whole, fraction) = trimmed.split_once('.').unwrap_or((trimmed, ""));
    if whole.is_empty() && fraction.is_empty() {
        return Err(invalid("not a number"));
    }
    if !whole.chars().chain(fraction.chars()).all(|c| c.is_ascii_digit()) {
        return Err(invalid("not a plain decimal number"));
    }
    if fraction.len() > DROP_DECIMALS {
        return Err(invalid("finer than one drop"));
    }
    let overflow = || invalid("too large");
    let whole_drops = if whole.is_empty() {
        0
    } else {
        whole
            .parse::<u64>()
            .map_err(|_| overflow())?
            .checked_mul(DROPS_PER_UNIT)
            .ok_or_else(overflow)?
    };
    let fraction_drops = if fraction.is_empty() {
        0
    } else {
        format!("{:0<width$}", fraction, width = DROP_DECIMALS)
            .parse::<u64>()
            .map_err(|_| invalid("not a plain decimal number"))?
    };
    let drops = whole_drops.checked_add(fraction_drops).ok_or_else(overflow)?;
    if drops == 0 && !allow_zero {
        return Err(BridgeError::InvalidAmount(format!(
            "amount must be a positive number, got {}",
            text
        )));
    }
    Ok(drops)
}

fn require_address(address: &str) -> Result<()> {
    codec::decode_address(address)
        .map(|_| ())
        .map_err(|e| BridgeError::InvalidAddress(format!("{}: {}", address, e)))
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaymentIntent {
    pub account: String,
    pub destination: String,
    pub amount: String,
    pub currency: String,
    #[serde(default)]
    pub issuer: Option<String>,
}

impl PaymentIntent {
    pub fn normalize(&mut self) {
        if is_native_currency(&self.currency) {
            self.issuer = None;
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OfferCreateIntent {
    pub account: String,
    pub taker_pays: AmountSpec,
    pub taker_gets: AmountSpec,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OfferCancelIntent {
    pub account: String,
    pub offer_sequence: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrustSetIntent {
    pub account: String,
    pub counterparty: String,
    pub currency: String,
    pub limit: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TransactionIntent {
    Payment(PaymentIntent),
    OfferCreate(OfferCreateIntent),
    OfferCancel(OfferCancelIntent),
    TrustSet(TrustSetIntent),
}

impl TransactionIntent {
    /// Builds an intent from a string tag and loose JSON parameters, as
    /// produced by form input. Unknown tags fail closed.
    pub fn from_tagged(kind: &str, params: Value) -> Result<Self> {
        let kind = kind.parse::<IntentKind>().inspect_err(|e| {
            error!("{}", e);
        })?;
        let invalid = |e: serde_json::Error| BridgeError::InvalidIntent(format!("{}: {}", kind, e));
        Ok(match kind {
            IntentKind::Payment => {
                TransactionIntent::Payment(serde_json::from_value(params).map_err(invalid)?)
            }
            IntentKind::OfferCreate => {
                TransactionIntent::OfferCreate(serde_json::from_value(params).map_err(invalid)?)
            }
            IntentKind::OfferCancel => {
                TransactionIntent::OfferCancel(serde_json::from_value(params).map_err(invalid)?)
            }
            IntentKind::TrustSet => {
                TransactionIntent::TrustSet(serde_json::from_value(params).map_err(invalid)?)
            }
        })
    }

    pub fn kind(&self) -> IntentKind {
        match self {
            TransactionIntent::Payment(_) => IntentKind::Payment,
            TransactionIntent::OfferCreate(_) => IntentKind::OfferCreate,
            TransactionIntent::OfferCancel(_) => IntentKind::OfferCancel,
            TransactionIntent::TrustSet(_) => IntentKind::TrustSet,
        }
    }

    pub fn account(&self) -> &str {
        match self {
            TransactionIntent::Payment(p) => &p.account,
            TransactionIntent::OfferCreate(o) => &o.account,
            TransactionIntent::OfferCancel(o) => &o.account,
            TransactionIntent::TrustSet(t) => &t.account,
        }
    }

    /// Validates the intent and maps it to its canonical shape. Consumes the
    /// intent: it is either shaped or discarded.
    pub fn shape(self) -> Result<ShapedTransaction> {
        require_address(self.account())?;
        let kind = self.kind();
        let mut shaped = ShapedTransaction::new(kind.transaction_type(), self.account());
        match self {
            TransactionIntent::Payment(mut p) => {
                p.normalize();
                if p.destination.trim().is_empty() {
                    return Err(BridgeError::MissingField("destination"));
                }
                require_address(&p.destination)?;
                if p.currency.trim().is_empty() {
                    return Err(BridgeError::MissingField("currency"));
                }
                let paid = AmountSpec {
                    amount: p.amount,
                    currency: p.currency,
                    issuer: p.issuer,
                };
                shaped.destination = Some(p.destination);
                shaped.amount = Some(paid.to_ledger_amount(false)?);
            }
            TransactionIntent::OfferCreate(mut o) => {
                o.taker_pays.normalize();
                o.taker_gets.normalize();
                shaped.taker_pays = Some(o.taker_pays.to_ledger_amount(false)?);
                shaped.taker_gets = Some(o.taker_gets.to_ledger_amount(false)?);
            }
            TransactionIntent::OfferCancel(o) => {
                shaped.offer_sequence = Some(o.offer_sequence);
            }
            TransactionIntent::TrustSet(t) => {
                if is_native_currency(&t.currency) {
                    return Err(BridgeError::InvalidIntent(
                        "trust lines cannot be set for the native asset".to_string(),
                    ));
                }
                let limit = AmountSpec::new(&t.limit, &t.currency, Some(&t.counterparty));
                // a zero limit removes the trust line
                shaped.limit_amount = Some(limit.to_ledger_amount(true)?);
            }
        }
        Ok(shaped)
    }
}

/// Canonical request shape. Field order is the signing order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ShapedTransaction {
    pub transaction_type: TransactionType,
    pub account: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub destination: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub amount: Option<LedgerAmount>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub taker_pays: Option<LedgerAmount>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub taker_gets: Option<LedgerAmount>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub offer_sequence: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub limit_amount: Option<LedgerAmount>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fee: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sequence: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub signing_pub_key: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub txn_signature: Option<String>,
}

impl ShapedTransaction {
    fn new(transaction_type: TransactionType, account: &str) -> Self {
        Self {
            transaction_type,
            account: account.to_string(),
            destination: None,
            amount: None,
            taker_pays: None,
            taker_gets: None,
            offer_sequence: None,
            limit_amount: None,
            fee: None,
            sequence: None,
            signing_pub_key: None,
            txn_signature: None,
        }
    }

    /// Canonical JSON of everything except the signature.
    pub fn signing_bytes(&self) -> Result<Vec<u8>> {
        let mut unsigned = self.clone();
        unsigned.txn_signature = None;
        Ok(serde_json::to_vec(&unsigned)?)
    }

    /// Attaches sequence, fee and the signer's public key, then signs.
    ///
    /// `tx_blob` is the hex of the canonical JSON, not the ledger's binary
    /// field serialization. Servers that only accept binary blobs will
    /// reject it, so submitting to a stock ledger node does not work yet.
    pub fn sign(mut self, keys: &AccountKeys, sequence: u32, fee: Drops) -> Result<SignedTransaction> {
        if keys.address != self.account {
            return Err(BridgeError::InvalidAddress(format!(
                "signing key belongs to {}, transaction is from {}",
                keys.address, self.account
            )));
        }
        self.sequence = Some(sequence);
        self.fee = Some(fee.to_string());
        self.signing_pub_key = Some(keys.public_key_hex());
        let signature = sign_prefixed(keys, &TX_SIGN_PREFIX, &self.signing_bytes()?)?;
        self.txn_signature = Some(hex::encode_upper(signature));

        let blob = serde_json::to_vec(&self)?;
        let hash = hex::encode_upper(sha512_half(&TX_ID_PREFIX, &blob));
        Ok(SignedTransaction {
            tx_json: self,
            tx_blob: hex::encode_upper(blob),
            hash,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SignedTransaction {
    pub tx_json: ShapedTransaction,
    pub tx_blob: String,
    pub hash: String,
}

impl SignedTransaction {
    /// Checks the attached signature against the attached public key.
    pub fn verify(&self) -> Result<bool> {
        let (Some(public_key), Some(signature)) =
            (&self.tx_json.signing_pub_key, &self.tx_json.txn_signature)
        else {
            return Ok(false);
        };
        let public_key = hex::decode(public_key)
            .map_err(|e| BridgeError::Signing(format!("public key is not hex: {}", e)))?;
        let signature = hex::decode(signature)
            .map_err(|e| BridgeError::Signing(format!("signature is not hex: {}", e)))?;
        verify_prefixed(
            &public_key,
            &TX_SIGN_PREFIX,
            &self.tx_json.signing_bytes()?,
            &signature,
        )
    }
}
