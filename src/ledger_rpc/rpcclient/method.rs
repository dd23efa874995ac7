use serde::{Deserialize, Serialize};
use std::fmt;
use std::hash::Hash;

/// Serialized as the "method" field of ledger JSON-RPC requests.
#[derive(Copy, Clone, Debug, Hash, Eq, PartialEq, Ord, PartialOrd, Deserialize, Serialize)]
pub enum Method {
    #[allow(non_camel_case_types)]
    account_info,
    #[allow(non_camel_case_types)]
    account_lines,
    #[allow(non_camel_case_types)]
    account_offers,
    #[allow(non_camel_case_types)]
    book_offers,
    #[allow(non_camel_case_types)]
    server_info,
    #[allow(non_camel_case_types)]
    submit,
    #[allow(non_camel_case_types)]
    tx,
}

impl Method {
    pub fn as_str(&self) -> &'static str {
        match self {
            Method::account_info => "account_info",
            Method::account_lines => "account_lines",
            Method::account_offers => "account_offers",
            Method::book_offers => "book_offers",
            Method::server_info => "server_info",
            Method::submit => "submit",
            Method::tx => "tx",
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The `TransactionType` field of a shaped transaction.
#[derive(Copy, Clone, Debug, Hash, Eq, PartialEq, Deserialize, Serialize)]
pub enum TransactionType {
    Payment,
    OfferCreate,
    OfferCancel,
    TrustSet,
}

impl fmt::Display for TransactionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            TransactionType::Payment => "Payment",
            TransactionType::OfferCreate => "OfferCreate",
            TransactionType::OfferCancel => "OfferCancel",
            TransactionType::TrustSet => "TrustSet",
        };
        f.write_str(name)
    }
}
