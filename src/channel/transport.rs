//! Duplex transports feeding a channel session.

use crate::error::{BridgeError, Result};
use futures::{SinkExt, StreamExt};
use log::{debug, info, warn};
use tokio::sync::{mpsc, watch};
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message;

/// Connection counter; events carry the generation of the connection that
/// produced them.
pub type Generation = u64;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ReadyState {
    Connecting,
    Open,
    Closing,
    #[default]
    Closed,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportEvent {
    Open,
    Message(String),
    Close,
}

pub type EventSender = mpsc::UnboundedSender<(Generation, TransportEvent)>;
pub type EventReceiver = mpsc::UnboundedReceiver<(Generation, TransportEvent)>;

pub trait Transport {
    /// Starts connecting to `url`. Returns immediately; `Open`, `Message` and
    /// `Close` arrive on `events` tagged with `generation`. Exactly one
    /// `Close` is emitted per successful `open`.
    fn open(&mut self, url: &str, generation: Generation, events: EventSender) -> Result<()>;

    fn send(&mut self, text: String) -> Result<()>;

    /// Closes the current connection, if any. Idempotent.
    fn close(&mut self);

    fn ready_state(&self) -> ReadyState;
}

/// WebSocket transport; each `open` spawns one I/O task on the current
/// tokio runtime.
#[derive(Debug, Default)]
pub struct WebSocketTransport {
    outbound: Option<mpsc::UnboundedSender<String>>,
    state: Option<watch::Receiver<ReadyState>>,
}

impl WebSocketTransport {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Transport for WebSocketTransport {
    fn open(&mut self, url: &str, generation: Generation, events: EventSender) -> Result<()> {
        self.close();
        let (outbound_tx, outbound_rx) = mpsc::unbounded_channel();
        let (state_tx, state_rx) = watch::channel(ReadyState::Connecting);
        self.outbound = Some(outbound_tx);
        self.state = Some(state_rx);
        tokio::spawn(run_socket(
            url.to_string(),
            generation,
            events,
            outbound_rx,
            state_tx,
        ));
        Ok(())
    }

    fn send(&mut self, text: String) -> Result<()> {
        let outbound = self
            .outbound
            .as_ref()
            .ok_or_else(|| BridgeError::RemoteUnavailable("channel not connected".to_string()))?;
        outbound
            .send(text)
            .map_err(|_| BridgeError::RemoteUnavailable("channel connection is gone".to_string()))
    }

    fn close(&mut self) {
        // dropping the sender ends the I/O task, which then reports Close
        self.outbound = None;
    }

    fn ready_state(&self) -> ReadyState {
        self.state
            .as_ref()
            .map(|state| *state.borrow())
            .unwrap_or_default()
    }
}

async fn run_socket(
    url: String,
    generation: Generation,
    events: EventSender,
    mut outbound: mpsc::UnboundedReceiver<String>,
    state: watch::Sender<ReadyState>,
) {
    let stream = match connect_async(url.as_str()).await {
        Ok((stream, _response)) => stream,
        Err(e) => {
            warn!("connection to {} failed: {}", url, e);
            state.send_replace(ReadyState::Closed);
            let _ = events.send((generation, TransportEvent::Close));
            return;
        }
    };
    info!("channel connected to {} (generation {})", url, generation);
    state.send_replace(ReadyState::Open);
    let _ = events.send((generation, TransportEvent::Open));

    let (mut sink, mut stream) = stream.split();
    loop {
        tokio::select! {
            incoming = stream.next() => {
                match incoming {
                    Some(Ok(Message::Text(text))) => {
                        let _ = events.send((generation, TransportEvent::Message(text.to_string())));
                    }
                    Some(Ok(Message::Close(frame))) => {
                        debug!("server closed channel: {:?}", frame);
                        break;
                    }
                    Some(Ok(_)) => {}
                    Some(Err(e)) => {
                        warn!("channel receive error: {}", e);
                        break;
                    }
                    None => break,
                }
            }
            outgoing = outbound.recv() => {
                match outgoing {
                    Some(text) => {
                        if let Err(e) = sink.send(Message::text(text)).await {
                            warn!("channel send error: {}", e);
                            break;
                        }
                    }
                    None => {
                        state.send_replace(ReadyState::Closing);
                        let _ = sink.close().await;
                        break;
                    }
                }
            }
        }
    }
    state.send_replace(ReadyState::Closed);
    debug!("channel generation {} closed", generation);
    let _ = events.send((generation, TransportEvent::Close));
}
