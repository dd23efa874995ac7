//! In-memory `LedgerClient` for tests.

use super::ledger_types::{AccountData, BookOffersRequest, RawOffer};
use super::rpcclient::txrequest::LedgerClient;
use super::rpcclient::txresult::SubmitResult;
use super::transaction::SignedTransaction;
use crate::error::{BridgeError, Result};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

#[derive(Debug, Clone)]
pub enum SubmitBehavior {
    Accept,
    Reject { code: i64, result: String },
    Unavailable,
}

#[derive(Debug)]
pub struct MockLedgerState {
    pub accounts: HashMap<String, AccountData>,
    pub offers: Vec<RawOffer>,
    pub submit: SubmitBehavior,
    pub reachable: bool,
    pub submitted: Vec<SignedTransaction>,
    pub book_requests: Vec<BookOffersRequest>,
    pub info_calls: usize,
}

#[derive(Debug, Clone)]
pub struct MockLedger {
    pub state: Arc<Mutex<MockLedgerState>>,
}

impl MockLedger {
    pub fn new() -> Self {
        Self {
            state: Arc::new(Mutex::new(MockLedgerState {
                accounts: HashMap::new(),
                offers: Vec::new(),
                submit: SubmitBehavior::Accept,
                reachable: true,
                submitted: Vec::new(),
                book_requests: Vec::new(),
                info_calls: 0,
            })),
        }
    }

    pub fn with_account(self, address: &str, balance: u64, sequence: u32) -> Self {
        self.state.lock().unwrap().accounts.insert(
            address.to_string(),
            AccountData {
                account: address.to_string(),
                balance,
                sequence,
            },
        );
        self
    }

    pub fn with_offers(self, offers: Vec<RawOffer>) -> Self {
        self.state.lock().unwrap().offers = offers;
        self
    }

    pub fn set_submit(&self, behavior: SubmitBehavior) {
        self.state.lock().unwrap().submit = behavior;
    }

    pub fn set_reachable(&self, reachable: bool) {
        self.state.lock().unwrap().reachable = reachable;
    }

    pub fn set_balance(&self, address: &str, balance: u64) {
        if let Some(data) = self.state.lock().unwrap().accounts.get_mut(address) {
            data.balance = balance;
        }
    }

    pub fn submitted(&self) -> Vec<SignedTransaction> {
        self.state.lock().unwrap().submitted.clone()
    }
}

impl LedgerClient for MockLedger {
    async fn account_info(&self, account: &str) -> Result<AccountData> {
        let mut state = self.state.lock().unwrap();
        if !state.reachable {
            return Err(BridgeError::RemoteUnavailable("connection refused".to_string()));
        }
        state.info_calls += 1;
        state
            .accounts
            .get(account)
            .cloned()
            .ok_or_else(|| BridgeError::Rpc("Account not found.".to_string()))
    }

    async fn book_offers(&self, request: &BookOffersRequest) -> Result<Vec<RawOffer>> {
        let mut state = self.state.lock().unwrap();
        if !state.reachable {
            return Err(BridgeError::RemoteUnavailable("connection refused".to_string()));
        }
        state.book_requests.push(request.clone());
        Ok(state.offers.clone())
    }

    async fn submit(&self, signed: &SignedTransaction) -> Result<SubmitResult> {
        let mut state = self.state.lock().unwrap();
        if !state.reachable {
            return Err(BridgeError::RemoteUnavailable("connection refused".to_string()));
        }
        let (engine_result, engine_result_code) = match state.submit.clone() {
            SubmitBehavior::Accept => ("tesSUCCESS".to_string(), 0),
            SubmitBehavior::Reject { code, result } => (result, code),
            SubmitBehavior::Unavailable => {
                return Err(BridgeError::RemoteUnavailable("connection reset".to_string()));
            }
        };
        state.submitted.push(signed.clone());
        if engine_result_code == 0 {
            if let Some(data) = state.accounts.get_mut(&signed.tx_json.account) {
                data.sequence += 1;
            }
        }
        Ok(SubmitResult {
            engine_result,
            engine_result_code,
            engine_result_message: None,
            tx_blob: Some(signed.tx_blob.clone()),
            tx_json: Some(serde_json::json!({ "hash": signed.hash })),
        })
    }
}
