//! Resilient push channel to the application server.

pub mod envelope;
#[cfg(test)]
pub mod mock;
pub mod reconnect;
pub mod session;
pub mod transport;

pub use envelope::{Envelope, is_truthy};
pub use reconnect::{ExponentialBackoff, Immediate, ReconnectPolicy};
pub use session::{CLOSE_EVENT, ChannelSession, ChannelStats, Handler, OPEN_EVENT};
pub use transport::{ReadyState, Transport, TransportEvent, WebSocketTransport};
