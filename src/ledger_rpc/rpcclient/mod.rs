pub mod method;
pub mod txrequest;
pub mod txresult;

pub use txrequest::{LedgerClient, LedgerJsonRpcClient};
pub use txresult::SubmitResult;
