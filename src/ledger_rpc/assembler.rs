//! Lifecycle of one transaction: shaping, submission, outcome.

use super::rpcclient::txrequest::LedgerClient;
use super::rpcclient::txresult::SubmitResult;
use super::transaction::{IntentKind, ShapedTransaction, TransactionIntent};
use crate::error::{BridgeError, Result};
use crate::wallet::Drops;
use crate::wallet::keys::AccountKeys;
use log::{error, info};
use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum AssemblyState {
    /// Intent accepted and shaped; nothing sent yet.
    Shaping(IntentKind),
    Submitted,
    Accepted,
    /// Network refused the transaction with this engine result code.
    Rejected(i64),
    /// The exchange with the server broke off before an outcome was known.
    Failed,
}

impl AssemblyState {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            AssemblyState::Accepted | AssemblyState::Rejected(_) | AssemblyState::Failed
        )
    }
}

#[derive(Debug, Clone)]
pub struct TransactionAssembler {
    kind: IntentKind,
    state: AssemblyState,
    shaped: ShapedTransaction,
    hash: Option<String>,
}

impl TransactionAssembler {
    /// Validates and shapes `intent`. An invalid intent never produces an
    /// assembler.
    pub fn new(intent: TransactionIntent) -> Result<Self> {
        let kind = intent.kind();
        let shaped = intent.shape().inspect_err(|e| {
            error!("discarding {} intent: {}", kind, e);
        })?;
        Ok(Self {
            kind,
            state: AssemblyState::Shaping(kind),
            shaped,
            hash: None,
        })
    }

    pub fn from_tagged(kind: &str, params: Value) -> Result<Self> {
        Self::new(TransactionIntent::from_tagged(kind, params)?)
    }

    pub fn kind(&self) -> IntentKind {
        self.kind
    }
    pub fn state(&self) -> &AssemblyState {
        &self.state
    }
    pub fn account(&self) -> &str {
        &self.shaped.account
    }
    pub fn shaped(&self) -> &ShapedTransaction {
        &self.shaped
    }
    pub fn hash(&self) -> Option<&str> {
        self.hash.as_deref()
    }

    /// Signs with `keys` at the account's current sequence and submits.
    ///
    /// The returned result is the server's verdict; a rejection is still `Ok`
    /// here and is reflected in `state()`.
    pub async fn submit<C: LedgerClient>(
        &mut self,
        keys: &AccountKeys,
        client: &C,
        fee: Drops,
    ) -> Result<SubmitResult> {
        if self.state != AssemblyState::Shaping(self.kind) {
            return Err(BridgeError::InvalidState(format!(
                "{} transaction already {:?}",
                self.kind, self.state
            )));
        }
        let sequence = match client.account_sequence(&self.shaped.account).await {
            Ok(sequence) => sequence,
            Err(e) => {
                error!("could not fetch sequence for {}: {}", self.shaped.account, e);
                self.state = AssemblyState::Failed;
                return Err(e);
            }
        };
        let signed = match self.shaped.clone().sign(keys, sequence, fee) {
            Ok(signed) => signed,
            Err(e) => {
                self.state = AssemblyState::Failed;
                return Err(e);
            }
        };
        self.hash = Some(signed.hash.clone());
        self.state = AssemblyState::Submitted;
        info!(
            "submitting {} from {} (sequence {}, hash {})",
            self.kind, self.shaped.account, sequence, signed.hash
        );

        match client.submit(&signed).await {
            Ok(result) => {
                self.on_result(&result)?;
                Ok(result)
            }
            Err(e) => {
                error!("submission of {} failed: {}", signed.hash, e);
                self.state = AssemblyState::Failed;
                Err(e)
            }
        }
    }

    /// Moves a submitted transaction to exactly one of accepted or rejected.
    pub fn on_result(&mut self, result: &SubmitResult) -> Result<()> {
        if self.state != AssemblyState::Submitted {
            return Err(BridgeError::InvalidState(format!(
                "result received while {:?}",
                self.state
            )));
        }
        if result.is_success() {
            self.state = AssemblyState::Accepted;
        } else {
            self.state = AssemblyState::Rejected(result.engine_result_code);
        }
        Ok(())
    }
}
