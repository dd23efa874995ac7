//! Scripted transport for session tests.

use super::transport::{EventSender, Generation, ReadyState, Transport, TransportEvent};
use crate::error::{BridgeError, Result};
use std::sync::{Arc, Mutex};

#[derive(Debug, Default)]
pub struct MockTransportState {
    pub opened: Vec<(String, Generation)>,
    pub sent: Vec<String>,
    pub close_calls: usize,
    pub ready: ReadyState,
    pub generation: Generation,
    pub events: Option<EventSender>,
    pub refuse_open: bool,
}

#[derive(Debug, Clone, Default)]
pub struct MockTransport {
    pub state: Arc<Mutex<MockTransportState>>,
}

impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    fn emit_for(&self, generation: Generation, event: TransportEvent) {
        let state = self.state.lock().unwrap();
        if let Some(events) = &state.events {
            let _ = events.send((generation, event));
        }
    }

    /// The server accepted the current connection.
    pub fn accept(&self) {
        let generation = {
            let mut state = self.state.lock().unwrap();
            state.ready = ReadyState::Open;
            state.generation
        };
        self.emit_for(generation, TransportEvent::Open);
    }

    pub fn deliver(&self, text: &str) {
        let generation = self.state.lock().unwrap().generation;
        self.emit_for(generation, TransportEvent::Message(text.to_string()));
    }

    pub fn deliver_stale(&self, generation: Generation, text: &str) {
        self.emit_for(generation, TransportEvent::Message(text.to_string()));
    }

    /// The server dropped the current connection.
    pub fn drop_connection(&self) {
        let generation = {
            let mut state = self.state.lock().unwrap();
            state.ready = ReadyState::Closed;
            state.generation
        };
        self.emit_for(generation, TransportEvent::Close);
    }

    pub fn opens(&self) -> usize {
        self.state.lock().unwrap().opened.len()
    }

    pub fn sent(&self) -> Vec<String> {
        self.state.lock().unwrap().sent.clone()
    }

    pub fn generation(&self) -> Generation {
        self.state.lock().unwrap().generation
    }
}

impl Transport for MockTransport {
    fn open(&mut self, url: &str, generation: Generation, events: EventSender) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        if state.refuse_open {
            return Err(BridgeError::RemoteUnavailable("refused".to_string()));
        }
        state.opened.push((url.to_string(), generation));
        state.generation = generation;
        state.events = Some(events);
        state.ready = ReadyState::Connecting;
        Ok(())
    }

    fn send(&mut self, text: String) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        if state.ready != ReadyState::Open {
            return Err(BridgeError::RemoteUnavailable("not open".to_string()));
        }
        state.sent.push(text);
        Ok(())
    }

    fn close(&mut self) {
        let (generation, was_closed) = {
            let mut state = self.state.lock().unwrap();
            state.close_calls += 1;
            let was_closed = state.ready == ReadyState::Closed;
            state.ready = ReadyState::Closed;
            (state.generation, was_closed)
        };
        if !was_closed {
            self.emit_for(generation, TransportEvent::Close);
        }
    }

    fn ready_state(&self) -> ReadyState {
        self.state.lock().unwrap().ready
    }
}
