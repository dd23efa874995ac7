use super::assembler::{AssemblyState, TransactionAssembler};
use super::ledger_types::{Asset, BookOffersRequest};
use super::order_book::{OrderBookEntry, aggregate};
use super::rpcclient::txrequest::{LedgerClient, LedgerJsonRpcClient};
use super::rpcclient::txresult::SubmitResult;
use super::transaction::{IntentKind, TransactionIntent};
use crate::config::LedgerEndPointConfig;
use crate::error::Result;
use crate::wallet::{Drops, Wallet};
use chrono::{DateTime, Utc};
use log::{error, info, warn};
use serde::Serialize;
use serde_json::Value;
use std::collections::HashMap;

/// One line of the in-memory transaction log.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SubmissionRecord {
    pub kind: IntentKind,
    pub account: String,
    pub hash: Option<String>,
    pub state: AssemblyState,
    pub engine_result: Option<String>,
    pub submitted_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrackedBook {
    pub offered: Asset,
    pub requested: Asset,
    pub limit: u32,
}

/// Submission history kept per session; older records are dropped first.
pub const MAX_RECORDS: usize = 100;

/// Signs and submits intents for the accounts of one wallet, and keeps the
/// displayed balances and order book current.
#[derive(Debug, Serialize)]
#[serde(bound(serialize = ""))]
pub struct LedgerSession<C: LedgerClient> {
    #[serde(skip)]
    pub wallet: Wallet,
    #[serde(skip)]
    pub client: C,
    pub config: LedgerEndPointConfig,
    pub balances: HashMap<String, Drops>,
    pub tracked_book: Option<TrackedBook>,
    pub order_book: Vec<OrderBookEntry>,
    pub records: Vec<SubmissionRecord>,
}

impl LedgerSession<LedgerJsonRpcClient> {
    pub fn connect(wallet: Wallet, config: Option<LedgerEndPointConfig>) -> Result<Self> {
        let config = config.unwrap_or(LedgerEndPointConfig::default());
        let client = LedgerJsonRpcClient::new(&config.rpc_endpoint)?;
        Ok(Self::new(wallet, client, config))
    }
}

impl<C: LedgerClient> LedgerSession<C> {
    pub fn new(wallet: Wallet, client: C, config: LedgerEndPointConfig) -> Self {
        Self {
            wallet,
            client,
            config,
            balances: HashMap::new(),
            tracked_book: None,
            order_book: Vec::new(),
            records: Vec::new(),
        }
    }

    /// Order book refreshed after every accepted transaction.
    pub fn track_book(&mut self, offered: Asset, requested: Asset, limit: u32) {
        self.tracked_book = Some(TrackedBook {
            offered,
            requested,
            limit,
        });
    }

    pub fn balance(&self, account: &str) -> Option<Drops> {
        self.balances.get(account).copied()
    }

    /// Validates, signs and submits `intent`.
    ///
    /// Rejection by the network is returned as `RejectedByNetwork`; an
    /// unreachable server as `RemoteUnavailable`. Neither is retried.
    pub async fn execute(&mut self, intent: TransactionIntent) -> Result<SubmitResult> {
        let mut assembler = TransactionAssembler::new(intent)?;
        let keys = self
            .wallet
            .identity_for(assembler.account(), self.config.account_scan_limit)?;

        let outcome = assembler
            .submit(&keys, &self.client, self.config.fee_drops)
            .await;
        self.record(&assembler, outcome.as_ref().ok());
        let result = outcome?;

        if !result.is_success() {
            warn!(
                "{} rejected: {} ({})",
                assembler.kind(),
                result.engine_result,
                result.engine_result_code
            );
            return Err(result.into_rejection());
        }
        info!("{} accepted: {:?}", assembler.kind(), assembler.hash());
        let account = assembler.account().to_string();
        if let Err(e) = self.refresh(&account).await {
            // the transaction itself went through
            warn!("refresh after {} failed: {}", assembler.kind(), e);
        }
        Ok(result)
    }

    pub async fn execute_tagged(&mut self, kind: &str, params: Value) -> Result<SubmitResult> {
        let intent = TransactionIntent::from_tagged(kind, params)?;
        self.execute(intent).await
    }

    /// Re-reads the balance of `account` and the tracked order book.
    pub async fn refresh(&mut self, account: &str) -> Result<()> {
        let balance = self.client.account_balance(account).await?;
        self.balances.insert(account.to_string(), balance);
        if let Some(book) = self.tracked_book.clone() {
            self.order_book = self
                .query_book(&book.offered, &book.requested, book.limit)
                .await?;
        }
        Ok(())
    }

    pub async fn query_book(
        &self,
        offered: &Asset,
        requested: &Asset,
        limit: u32,
    ) -> Result<Vec<OrderBookEntry>> {
        let request = BookOffersRequest::for_pair(offered, requested, limit);
        let offers = self.client.book_offers(&request).await.inspect_err(|e| {
            error!("book_offers {}/{} failed: {}", offered, requested, e);
        })?;
        Ok(aggregate(&offers, offered, requested, limit as usize))
    }

    fn record(&mut self, assembler: &TransactionAssembler, result: Option<&SubmitResult>) {
        self.records.push(SubmissionRecord {
            kind: assembler.kind(),
            account: assembler.account().to_string(),
            hash: assembler.hash().map(str::to_string),
            state: assembler.state().clone(),
            engine_result: result.map(|r| r.engine_result.clone()),
            submitted_at: Utc::now(),
        });
        let excess = self.records.len().saturating_sub(MAX_RECORDS);
        self.records.drain(..excess);
    }
}
