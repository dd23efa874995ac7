pub mod assembler;
pub mod ledger_session;
pub mod ledger_types;
#[cfg(test)]
pub mod mock;
pub mod order_book;
pub mod rpcclient;
pub mod transaction;

pub use assembler::{AssemblyState, TransactionAssembler};
pub use ledger_session::{LedgerSession, SubmissionRecord};
pub use ledger_types::{Asset, LedgerAmount};
pub use order_book::{OrderBookEntry, aggregate};
pub use transaction::{IntentKind, SignedTransaction, TransactionIntent};
