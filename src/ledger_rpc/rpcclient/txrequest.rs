//! JSON-RPC client for the ledger server.
//!
//! Every ledger method takes a single positional parameter: an object with the
//! method's named arguments. `AsRpcParams` wraps a serializable request in that
//! one-element array.

use super::method::Method;
use super::txresult::{SubmitResult, parse_result};
use crate::error::{BridgeError, Result};
use crate::ledger_rpc::ledger_types::{
    AccountData, AccountInfoResult, BookOffersRequest, BookOffersResult, RawOffer,
};
use crate::ledger_rpc::transaction::SignedTransaction;
use crate::wallet::Drops;
use jsonrpsee::core::client::ClientT;
use jsonrpsee::core::client::Error as RpcError;
use jsonrpsee::core::traits::ToRpcParams;
use jsonrpsee::http_client::{HttpClient, HttpClientBuilder};
use log::{debug, error};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use serde_json::value::RawValue;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccountInfoRequest {
    pub account: String,
    pub ledger_index: String,
    pub strict: bool,
}

impl AccountInfoRequest {
    pub fn new(account: &str) -> Self {
        Self {
            account: account.to_string(),
            ledger_index: "current".to_string(),
            strict: true,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubmitRequest {
    pub tx_blob: String,
    pub tx_json: Value,
}

impl SubmitRequest {
    pub fn new(signed: &SignedTransaction) -> Result<Self> {
        Ok(Self {
            tx_blob: signed.tx_blob.clone(),
            tx_json: serde_json::to_value(&signed.tx_json)?,
        })
    }
}

/// The ledger operations the bridge depends on.
#[allow(async_fn_in_trait)]
pub trait LedgerClient {
    async fn account_info(&self, account: &str) -> Result<AccountData>;

    async fn book_offers(&self, request: &BookOffersRequest) -> Result<Vec<RawOffer>>;

    async fn submit(&self, signed: &SignedTransaction) -> Result<SubmitResult>;

    /// Next sequence number for transactions from `account`.
    async fn account_sequence(&self, account: &str) -> Result<u32> {
        Ok(self.account_info(account).await?.sequence)
    }

    async fn account_balance(&self, account: &str) -> Result<Drops> {
        Ok(self.account_info(account).await?.balance)
    }
}

/// HTTP JSON-RPC client for a ledger server.
///
/// # Example
///
/// ```no_run
/// use ledger_bridge::ledger_rpc::rpcclient::txrequest::{LedgerClient, LedgerJsonRpcClient};
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let client = LedgerJsonRpcClient::new("http://127.0.0.1:5005")?;
///     let balance = client.account_balance("rHb9CJAWyB4rj91VRWn96DkukG4bwdtyTh").await?;
///     println!("balance: {} drops", balance);
///     Ok(())
/// }
/// ```
#[derive(Debug, Clone)]
pub struct LedgerJsonRpcClient {
    client: HttpClient,
}

impl LedgerJsonRpcClient {
    pub fn new(url: &str) -> Result<Self> {
        let client = HttpClientBuilder::default()
            .request_timeout(std::time::Duration::from_secs(30))
            .build(url)
            .map_err(map_rpc_error)?;
        Ok(Self { client })
    }

    async fn call<P: Serialize + Send>(&self, method: Method, params: P) -> Result<Value> {
        debug!("ledger rpc call: {}", method);
        self.client
            .request::<Value, _>(method.as_str(), AsRpcParams(params))
            .await
            .map_err(|e| {
                let err = map_rpc_error(e);
                error!("{} failed: {}", method, err);
                err
            })
    }
}

impl LedgerClient for LedgerJsonRpcClient {
    async fn account_info(&self, account: &str) -> Result<AccountData> {
        let value = self
            .call(Method::account_info, AccountInfoRequest::new(account))
            .await?;
        Ok(parse_result::<AccountInfoResult>(value)?.account_data)
    }

    async fn book_offers(&self, request: &BookOffersRequest) -> Result<Vec<RawOffer>> {
        let value = self.call(Method::book_offers, request).await?;
        Ok(parse_result::<BookOffersResult>(value)?.offers)
    }

    async fn submit(&self, signed: &SignedTransaction) -> Result<SubmitResult> {
        let value = self
            .call(Method::submit, SubmitRequest::new(signed)?)
            .await?;
        parse_result(value)
    }
}

/// Connection-level failures become `RemoteUnavailable`; everything else is a
/// protocol error.
pub fn map_rpc_error(e: RpcError) -> BridgeError {
    match e {
        RpcError::Transport(_) | RpcError::RestartNeeded(_) | RpcError::RequestTimeout => {
            BridgeError::RemoteUnavailable(e.to_string())
        }
        RpcError::ParseError(e) => BridgeError::SerializationFailure(e.to_string()),
        other => BridgeError::Rpc(other.to_string()),
    }
}

pub struct AsRpcParams<T>(pub T);

impl<T: Serialize> ToRpcParams for AsRpcParams<T> {
    fn to_rpc_params(self) -> std::result::Result<Option<Box<RawValue>>, serde_json::Error> {
        let s = serde_json::to_string(&[&self.0])?;
        RawValue::from_string(s).map(Some)
    }
}
