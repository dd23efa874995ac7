use crate::error::{BridgeError, Result};
use crate::wallet::{DROPS_PER_UNIT, Drops, NATIVE_CURRENCY};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A currency, optionally pinned to an issuing account.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Asset {
    pub currency: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub issuer: Option<String>,
}

impl Asset {
    pub fn native() -> Self {
        Self {
            currency: NATIVE_CURRENCY.to_string(),
            issuer: None,
        }
    }
    pub fn issued(currency: &str, issuer: &str) -> Self {
        Self {
            currency: currency.to_string(),
            issuer: Some(issuer.to_string()),
        }
    }
    pub fn is_native(&self) -> bool {
        is_native_currency(&self.currency)
    }
}

pub fn is_native_currency(currency: &str) -> bool {
    currency.eq_ignore_ascii_case(NATIVE_CURRENCY)
}

/// `XRP` or `CUR:issuer`.
impl FromStr for Asset {
    type Err = BridgeError;

    fn from_str(s: &str) -> Result<Self> {
        match s.split_once(':') {
            None if is_native_currency(s) => Ok(Asset::native()),
            None => Err(BridgeError::MissingField("issuer")),
            Some((currency, issuer)) if !currency.is_empty() && !issuer.is_empty() => {
                Ok(Asset::issued(currency, issuer))
            }
            Some(_) => Err(BridgeError::InvalidIntent(format!("malformed asset {}", s))),
        }
    }
}

impl fmt::Display for Asset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.issuer {
            Some(issuer) => write!(f, "{}:{}", self.currency, issuer),
            None => f.write_str(&self.currency),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IssuedAmount {
    pub value: String,
    pub currency: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub issuer: Option<String>,
}

/// Amount as it appears on the wire: native amounts are a string of drops,
/// issued amounts an object.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum LedgerAmount {
    Drops(String),
    Issued(IssuedAmount),
}

impl LedgerAmount {
    pub fn drops(drops: Drops) -> Self {
        LedgerAmount::Drops(drops.to_string())
    }
    pub fn is_native(&self) -> bool {
        matches!(self, LedgerAmount::Drops(_))
    }
    /// Magnitude in whole units: drops are scaled down, issued values are
    /// passed through.
    pub fn human_value(&self) -> Option<f64> {
        match self {
            LedgerAmount::Drops(drops) => drops
                .trim()
                .parse::<f64>()
                .ok()
                .map(|d| d / DROPS_PER_UNIT as f64),
            LedgerAmount::Issued(issued) => issued.value.trim().parse::<f64>().ok(),
        }
        .filter(|v| v.is_finite())
    }
    pub fn currency(&self) -> &str {
        match self {
            LedgerAmount::Drops(_) => NATIVE_CURRENCY,
            LedgerAmount::Issued(issued) => &issued.currency,
        }
    }
}

/// One standing offer as returned by `book_offers`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawOffer {
    #[serde(rename = "Account", default, skip_serializing_if = "Option::is_none")]
    pub account: Option<String>,
    #[serde(rename = "Sequence", default, skip_serializing_if = "Option::is_none")]
    pub sequence: Option<u32>,
    #[serde(rename = "TakerPays", alias = "taker_pays", alias = "pays")]
    pub taker_pays: LedgerAmount,
    #[serde(rename = "TakerGets", alias = "taker_gets", alias = "gets")]
    pub taker_gets: LedgerAmount,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BookOffersRequest {
    pub taker_gets: Asset,
    pub taker_pays: Asset,
    pub limit: u32,
}

impl BookOffersRequest {
    /// Query for offers paying `offered` in exchange for `requested`.
    pub fn for_pair(offered: &Asset, requested: &Asset, limit: u32) -> Self {
        Self {
            taker_pays: offered.clone(),
            taker_gets: requested.clone(),
            limit,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BookOffersResult {
    #[serde(default)]
    pub offers: Vec<RawOffer>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccountData {
    #[serde(rename = "Account")]
    pub account: String,
    #[serde(rename = "Balance", deserialize_with = "serde_this_or_that::as_u64")]
    pub balance: Drops,
    #[serde(rename = "Sequence")]
    pub sequence: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccountInfoResult {
    pub account_data: AccountData,
}
