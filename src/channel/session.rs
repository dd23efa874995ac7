//! One logical, self-healing connection to the push server plus the
//! per-event handler registry.

use super::envelope::Envelope;
use super::reconnect::{Immediate, ReconnectPolicy};
use super::transport::{
    EventReceiver, EventSender, Generation, ReadyState, Transport, TransportEvent,
    WebSocketTransport,
};
use crate::config::ChannelEndPointConfig;
use crate::error::{BridgeError, Result};
use log::{debug, error, info, warn};
use serde::Serialize;
use serde_json::{Value, json};
use std::collections::{HashMap, VecDeque};
use std::fmt;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

/// Name of the local event raised when the transport opens.
pub const OPEN_EVENT: &str = "open";
/// Name of the local event raised when the transport closes.
pub const CLOSE_EVENT: &str = "close";

pub type Handler = Arc<dyn Fn(&Value) -> anyhow::Result<()> + Send + Sync>;

/// Counters for traffic the session dropped instead of delivering.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ChannelStats {
    /// Inbound messages without a truthy `data.success`.
    pub swallowed: u64,
    pub dropped_unsessioned: u64,
    pub dropped_not_open: u64,
    pub serialization_failures: u64,
    pub parse_failures: u64,
    pub stale_events: u64,
    pub handler_failures: u64,
    pub open_failures: u64,
}

struct Deferred {
    name: String,
    handler: Handler,
    data: Value,
}

pub struct ChannelSession<T: Transport> {
    config: ChannelEndPointConfig,
    transport: T,
    policy: Box<dyn ReconnectPolicy>,
    handlers: HashMap<String, Vec<Handler>>,
    reconnect: bool,
    reconnect_count: u32,
    reconnect_at: Option<Instant>,
    // set by the first connect and never cleared
    attached: bool,
    generation: Generation,
    sid: Option<String>,
    deferred: VecDeque<Deferred>,
    stats: ChannelStats,
    events_tx: EventSender,
    events_rx: EventReceiver,
}

impl<T: Transport> fmt::Debug for ChannelSession<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChannelSession")
            .field("url", &self.config.socket_url())
            .field("events", &self.handlers.keys().collect::<Vec<_>>())
            .field("reconnect", &self.reconnect)
            .field("reconnect_count", &self.reconnect_count)
            .field("generation", &self.generation)
            .field("stats", &self.stats)
            .finish()
    }
}

impl ChannelSession<WebSocketTransport> {
    pub fn websocket(config: ChannelEndPointConfig) -> Self {
        Self::new(config, WebSocketTransport::new())
    }
}

impl<T: Transport> ChannelSession<T> {
    pub fn new(config: ChannelEndPointConfig, transport: T) -> Self {
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        Self {
            config,
            transport,
            policy: Box::new(Immediate),
            handlers: HashMap::new(),
            reconnect: true,
            reconnect_count: 0,
            reconnect_at: None,
            attached: false,
            generation: 0,
            sid: None,
            deferred: VecDeque::new(),
            stats: ChannelStats::default(),
            events_tx,
            events_rx,
        }
    }

    pub fn with_policy<P: ReconnectPolicy + 'static>(mut self, policy: P) -> Self {
        self.policy = Box::new(policy);
        self
    }

    pub fn stats(&self) -> &ChannelStats {
        &self.stats
    }
    pub fn swallowed_responses(&self) -> u64 {
        self.stats.swallowed
    }
    pub fn reconnect_enabled(&self) -> bool {
        self.reconnect
    }
    pub fn reconnect_count(&self) -> u32 {
        self.reconnect_count
    }
    pub fn generation(&self) -> Generation {
        self.generation
    }
    pub fn ready_state(&self) -> ReadyState {
        self.transport.ready_state()
    }
    pub fn pending_dispatches(&self) -> usize {
        self.deferred.len()
    }
    pub fn handler_count(&self, name: &str) -> usize {
        self.handlers.get(name).map_or(0, Vec::len)
    }

    pub fn set_session_id(&mut self, sid: Option<String>) {
        self.sid = sid;
    }

    /// Appends `handler` to the handlers of `name`. The same handler is never
    /// registered twice for one name; returns false when it already was.
    pub fn subscribe(&mut self, name: &str, handler: Handler) -> bool {
        let handlers = self.handlers.entry(name.to_string()).or_default();
        if handlers.iter().any(|h| Arc::ptr_eq(h, &handler)) {
            warn!("handler already subscribed to {}; skipping", name);
            return false;
        }
        handlers.push(handler);
        true
    }

    /// Wraps `f` in a `Handler`, subscribes it, and returns it. Every call
    /// registers a new handler; to re-register idempotently (for example on
    /// each reconnect), keep the returned `Handler` and pass it to
    /// `subscribe`.
    pub fn on<F>(&mut self, name: &str, f: F) -> Handler
    where
        F: Fn(&Value) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        let handler: Handler = Arc::new(f);
        self.subscribe(name, handler.clone());
        handler
    }

    pub fn unsubscribe_all(&mut self, name: &str) -> usize {
        self.handlers.remove(name).map_or(0, |h| h.len())
    }

    /// Sends `payload` as event `name`. Without a session id, or while the
    /// transport is not open, the message is dropped. Returns whether the
    /// message was handed to the transport.
    pub fn send<P: Serialize + fmt::Debug>(&mut self, name: &str, payload: &P) -> bool {
        let Some(sid) = self.sid.as_deref() else {
            self.stats.dropped_unsessioned += 1;
            debug!("no session id; dropping {}", name);
            return false;
        };
        if self.transport.ready_state() != ReadyState::Open {
            self.stats.dropped_not_open += 1;
            debug!("channel not open; dropping {}", name);
            return false;
        }
        let text = match Envelope::outbound(name, payload, sid) {
            Ok(text) => text,
            Err(e) => {
                self.stats.serialization_failures += 1;
                error!("{}; sending debug rendering instead", e);
                Envelope::fallback(name, payload, sid)
            }
        };
        match self.transport.send(text) {
            Ok(()) => true,
            Err(e) => {
                warn!("send {} failed: {}", name, e);
                false
            }
        }
    }

    /// Opens the connection and arms automatic reconnection. The reconnect
    /// count starts over only when reconnection was off, i.e. after
    /// `disconnect` or after the storm guard gave up. Calling it while armed
    /// restarts the connection and keeps the count.
    pub fn connect(&mut self) -> Result<()> {
        if !self.reconnect {
            self.reconnect_count = 0;
        }
        self.reconnect = true;
        self.reconnect_at = None;
        self.open_transport(false)
    }

    /// Stops reconnecting and closes the transport. Idempotent.
    pub fn disconnect(&mut self) {
        self.reconnect = false;
        self.reconnect_at = None;
        if self.attached {
            self.transport.close();
        }
    }

    fn open_transport(&mut self, reentry: bool) -> Result<()> {
        if reentry && self.reconnect_count > self.config.reconnect_limit {
            warn!(
                "{} reconnects exceed limit {}; this attempt is the last",
                self.reconnect_count, self.config.reconnect_limit
            );
            self.disconnect();
        }
        if self.attached {
            let keep = self.reconnect;
            self.disconnect();
            self.reconnect = keep;
            if reentry {
                self.reconnect_count += 1;
            }
        }
        self.generation += 1;
        self.attached = true;
        let url = self.config.socket_url();
        debug!("opening {} (generation {})", url, self.generation);
        self.transport
            .open(&url, self.generation, self.events_tx.clone())
            .inspect_err(|e| error!("could not open {}: {}", url, e))
    }

    // A refused open never produces a Close, so the retry is scheduled here.
    fn reopen(&mut self) {
        if self.open_transport(true).is_ok() {
            return;
        }
        self.stats.open_failures += 1;
        if self.reconnect {
            let delay = self
                .policy
                .delay(self.reconnect_count)
                .max(self.config.ready_poll_interval());
            debug!("retrying open in {:?}", delay);
            self.reconnect_at = Some(Instant::now() + delay);
        }
    }

    fn schedule_reconnect(&mut self) {
        let delay = self.policy.delay(self.reconnect_count);
        if delay.is_zero() {
            self.reopen();
        } else {
            debug!("reconnecting in {:?}", delay);
            self.reconnect_at = Some(Instant::now() + delay);
        }
    }

    fn fire_due_reconnect(&mut self) {
        if let Some(at) = self.reconnect_at {
            if Instant::now() >= at {
                self.reconnect_at = None;
                if self.reconnect {
                    self.reopen();
                }
            }
        }
    }

    /// Applies one transport event. Handler calls are queued, not run.
    pub fn handle_event(&mut self, generation: Generation, event: TransportEvent) {
        if generation != self.generation {
            self.stats.stale_events += 1;
            debug!(
                "ignoring {:?} from superseded connection {}",
                event, generation
            );
            return;
        }
        match event {
            TransportEvent::Open => {
                info!("channel open (generation {})", generation);
                self.dispatch_local(OPEN_EVENT);
            }
            TransportEvent::Message(text) => self.on_message(&text),
            TransportEvent::Close => {
                info!("channel closed (generation {})", generation);
                self.dispatch_local(CLOSE_EVENT);
                if self.reconnect {
                    self.schedule_reconnect();
                }
            }
        }
    }

    fn dispatch_local(&mut self, name: &str) {
        self.enqueue(name, json!({}));
    }

    fn on_message(&mut self, text: &str) {
        let mut envelope = match Envelope::parse(text) {
            Ok(envelope) => envelope,
            Err(e) => {
                self.stats.parse_failures += 1;
                warn!("unparsable channel message: {}", e);
                return;
            }
        };
        if !envelope.take_success() {
            self.stats.swallowed += 1;
            debug!("swallowing unsuccessful {} response", envelope.name);
            return;
        }
        self.enqueue(&envelope.name, envelope.data);
    }

    fn enqueue(&mut self, name: &str, data: Value) {
        let Some(handlers) = self.handlers.get(name) else {
            return;
        };
        for handler in handlers {
            self.deferred.push_back(Deferred {
                name: name.to_string(),
                handler: handler.clone(),
                data: data.clone(),
            });
        }
    }

    /// Runs queued handler calls in order, one per scheduler turn. A failing
    /// or panicking handler is logged and skipped.
    pub async fn run_deferred(&mut self) {
        while let Some(task) = self.deferred.pop_front() {
            match catch_unwind(AssertUnwindSafe(|| (task.handler)(&task.data))) {
                Ok(Ok(())) => {}
                Ok(Err(e)) => {
                    self.stats.handler_failures += 1;
                    warn!("{} handler failed: {:#}", task.name, e);
                }
                Err(_) => {
                    self.stats.handler_failures += 1;
                    error!("{} handler panicked", task.name);
                }
            }
            tokio::task::yield_now().await;
        }
    }

    /// Processes every event already received, then returns.
    pub async fn pump(&mut self) -> usize {
        let mut processed = 0;
        loop {
            self.fire_due_reconnect();
            let Ok((generation, event)) = self.events_rx.try_recv() else {
                break;
            };
            self.handle_event(generation, event);
            self.run_deferred().await;
            processed += 1;
        }
        processed
    }

    /// Polls the transport every `ready_poll_ms` until it is open. Fails when
    /// the transport is closed and will not be reopened.
    pub async fn wait_ready(&mut self) -> Result<()> {
        let interval = self.config.ready_poll_interval();
        loop {
            self.pump().await;
            match self.transport.ready_state() {
                ReadyState::Open => return Ok(()),
                ReadyState::Closed if !self.reconnect || !self.attached => {
                    return Err(BridgeError::RemoteUnavailable(format!(
                        "channel to {} is closed",
                        self.config.socket_url()
                    )));
                }
                _ => tokio::time::sleep(interval).await,
            }
        }
    }

    /// Event loop; returns after `cancel` fires, disconnecting first.
    pub async fn run(&mut self, cancel: CancellationToken) {
        loop {
            let reconnect_at = self.reconnect_at;
            tokio::select! {
                _ = cancel.cancelled() => {
                    info!("channel loop cancelled");
                    self.disconnect();
                    break;
                }
                received = self.events_rx.recv() => {
                    let Some((generation, event)) = received else {
                        break;
                    };
                    self.handle_event(generation, event);
                    self.run_deferred().await;
                }
                _ = tokio::time::sleep_until(reconnect_at.unwrap_or_else(Instant::now)), if reconnect_at.is_some() => {
                    self.fire_due_reconnect();
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::channel::mock::MockTransport;
    use crate::channel::reconnect::ExponentialBackoff;
    use std::collections::HashMap;
    use std::sync::Mutex;
    use std::time::Duration;

    type Log = Arc<Mutex<Vec<String>>>;

    fn session() -> (ChannelSession<MockTransport>, MockTransport) {
        let transport = MockTransport::new();
        let config = ChannelEndPointConfig::new(
            "ws://127.0.0.1:8080/".to_string(),
            "bridge".to_string(),
            10,
            1,
        );
        (ChannelSession::new(config, transport.clone()), transport)
    }

    fn recorder(log: &Log, tag: &str) -> Handler {
        let log = log.clone();
        let tag = tag.to_string();
        Arc::new(move |data: &Value| {
            log.lock().unwrap().push(format!("{}:{}", tag, data));
            Ok(())
        })
    }

    fn entries(log: &Log) -> Vec<String> {
        log.lock().unwrap().clone()
    }

    async fn open_session() -> (ChannelSession<MockTransport>, MockTransport) {
        let (mut session, transport) = session();
        session.connect().unwrap();
        transport.accept();
        session.pump().await;
        (session, transport)
    }

    #[tokio::test]
    async fn test_connect_uses_namespaced_url() {
        let (mut session, transport) = session();
        session.connect().unwrap();
        let state = transport.state.lock().unwrap();
        assert_eq!(
            state.opened,
            vec![("ws://127.0.0.1:8080/bridge".to_string(), 1)]
        );
        assert_eq!(session.generation(), 1);
    }

    #[tokio::test]
    async fn test_handlers_run_in_order_after_parsing() {
        let log = Log::default();
        let (mut session, _transport) = open_session().await;
        session.subscribe("bet", recorder(&log, "h1"));
        session.subscribe("bet", recorder(&log, "h2"));

        let generation = session.generation();
        session.handle_event(
            generation,
            TransportEvent::Message(r#"{"name":"bet","data":{"success":true,"amount":5}}"#.to_string()),
        );
        assert!(entries(&log).is_empty());
        assert_eq!(session.pending_dispatches(), 2);

        session.run_deferred().await;
        assert_eq!(
            entries(&log),
            vec![r#"h1:{"amount":5}"#.to_string(), r#"h2:{"amount":5}"#.to_string()]
        );
    }

    #[tokio::test]
    async fn test_unsuccessful_responses_swallowed_and_counted() {
        let log = Log::default();
        let (mut session, transport) = open_session().await;
        session.subscribe("bet", recorder(&log, "h1"));
        transport.deliver(r#"{"name":"bet","data":{"success":false,"error":"no funds"}}"#);
        transport.deliver(r#"{"name":"bet","data":{"amount":5}}"#);
        transport.deliver(r#"{"name":"bet","data":{"success":""}}"#);
        session.pump().await;
        assert!(entries(&log).is_empty());
        assert_eq!(session.swallowed_responses(), 3);
    }

    #[tokio::test]
    async fn test_failing_handler_does_not_break_channel() {
        let log = Log::default();
        let (mut session, transport) = open_session().await;
        session.on("bet", |_| Err(anyhow::anyhow!("handler error")));
        session.on("bet", |_| -> anyhow::Result<()> { panic!("handler panic") });
        session.subscribe("bet", recorder(&log, "h3"));

        transport.deliver(r#"{"name":"bet","data":{"success":1}}"#);
        transport.deliver(r#"not json"#);
        transport.deliver(r#"{"name":"bet","data":{"success":1,"n":2}}"#);
        session.pump().await;

        assert_eq!(entries(&log), vec!["h3:{}".to_string(), r#"h3:{"n":2}"#.to_string()]);
        assert_eq!(session.stats().handler_failures, 4);
        assert_eq!(session.stats().parse_failures, 1);
    }

    #[tokio::test]
    async fn test_reconnect_storm_stops_after_limit() {
        let (mut session, transport) = session();
        session.connect().unwrap();
        for _ in 0..20 {
            transport.drop_connection();
            session.pump().await;
        }
        // initial open, eleven counted re-entries, one final forced attempt
        assert_eq!(transport.opens(), 13);
        assert!(!session.reconnect_enabled());
        assert_eq!(session.reconnect_count(), 12);
    }

    #[tokio::test]
    async fn test_external_connect_after_disconnect_starts_over() {
        let (mut session, transport) = session();
        session.connect().unwrap();
        for _ in 0..20 {
            transport.drop_connection();
            session.pump().await;
        }
        session.disconnect();
        session.connect().unwrap();
        assert!(session.reconnect_enabled());
        assert_eq!(session.reconnect_count(), 0);
        assert_eq!(transport.opens(), 14);

        transport.drop_connection();
        session.pump().await;
        assert_eq!(transport.opens(), 15);
        assert_eq!(session.reconnect_count(), 1);
    }

    #[tokio::test]
    async fn test_connect_while_armed_keeps_reconnect_count() {
        let (mut session, transport) = session();
        session.connect().unwrap();
        for _ in 0..8 {
            transport.drop_connection();
            session.pump().await;
        }
        assert_eq!(session.reconnect_count(), 8);

        session.connect().unwrap();
        assert_eq!(session.reconnect_count(), 8);
        assert_eq!(transport.opens(), 10);
        for _ in 0..40 {
            transport.drop_connection();
            session.pump().await;
        }
        // three more counted re-entries, then the final forced attempt
        assert_eq!(transport.opens(), 14);
        assert_eq!(session.reconnect_count(), 12);
        assert!(!session.reconnect_enabled());
    }

    #[tokio::test]
    async fn test_refused_reopen_is_retried() {
        let transport = MockTransport::new();
        let config = ChannelEndPointConfig::new(
            "ws://127.0.0.1:8080/".to_string(),
            "bridge".to_string(),
            10,
            50,
        );
        let mut session = ChannelSession::new(config, transport.clone());
        session.connect().unwrap();
        transport.accept();
        session.pump().await;
        transport.state.lock().unwrap().refuse_open = true;
        transport.drop_connection();
        session.pump().await;
        assert_eq!(transport.opens(), 1);
        assert_eq!(session.stats().open_failures, 1);
        assert!(session.reconnect_enabled());

        transport.state.lock().unwrap().refuse_open = false;
        tokio::time::sleep(Duration::from_millis(60)).await;
        session.pump().await;
        assert_eq!(transport.opens(), 2);
        transport.accept();
        tokio::time::timeout(Duration::from_secs(1), session.wait_ready())
            .await
            .unwrap()
            .unwrap();
    }

    #[tokio::test]
    async fn test_refused_reopens_stop_at_limit() {
        let (mut session, transport) = open_session().await;
        transport.state.lock().unwrap().refuse_open = true;
        transport.drop_connection();
        let err = tokio::time::timeout(Duration::from_secs(5), session.wait_ready())
            .await
            .unwrap()
            .unwrap_err();
        assert!(matches!(err, BridgeError::RemoteUnavailable(_)));
        assert_eq!(transport.opens(), 1);
        assert_eq!(session.stats().open_failures, 12);
        assert_eq!(session.reconnect_count(), 12);
        assert!(!session.reconnect_enabled());
    }

    #[tokio::test]
    async fn test_disconnect_is_idempotent_and_final() {
        let log = Log::default();
        let (mut session, transport) = open_session().await;
        session.subscribe(CLOSE_EVENT, recorder(&log, "close"));
        session.disconnect();
        session.disconnect();
        session.pump().await;
        assert_eq!(entries(&log), vec!["close:{}".to_string()]);
        assert_eq!(transport.opens(), 1);
        assert!(!session.reconnect_enabled());
    }

    #[tokio::test]
    async fn test_local_open_and_close_events() {
        let log = Log::default();
        let (mut session, transport) = session();
        session.subscribe(OPEN_EVENT, recorder(&log, "open"));
        session.subscribe(CLOSE_EVENT, recorder(&log, "close"));
        session.connect().unwrap();
        transport.accept();
        transport.drop_connection();
        session.pump().await;
        assert_eq!(
            entries(&log),
            vec!["open:{}".to_string(), "close:{}".to_string()]
        );
        assert_eq!(transport.opens(), 2);
    }

    #[tokio::test]
    async fn test_send_requires_session_id() {
        let (mut session, transport) = open_session().await;
        assert!(!session.send("chat", &json!({"text": "hi"})));
        assert_eq!(session.stats().dropped_unsessioned, 1);
        assert!(transport.sent().is_empty());

        session.set_session_id(Some("s1".to_string()));
        assert!(session.send("chat", &json!({"text": "hi"})));
        let sent: Value = serde_json::from_str(&transport.sent()[0]).unwrap();
        assert_eq!(sent, json!({"name": "chat", "data": {"text": "hi"}, "sid": "s1"}));
    }

    #[tokio::test]
    async fn test_send_dropped_while_not_open() {
        let (mut session, transport) = session();
        session.set_session_id(Some("s1".to_string()));
        session.connect().unwrap();
        assert!(!session.send("chat", &json!({})));
        assert_eq!(session.stats().dropped_not_open, 1);
        assert!(transport.sent().is_empty());
    }

    #[tokio::test]
    async fn test_unserializable_payload_sent_as_debug_text() {
        let (mut session, transport) = open_session().await;
        session.set_session_id(Some("s1".to_string()));
        let payload: HashMap<(u8, u8), u8> = HashMap::from([((1, 2), 3)]);
        assert!(session.send("grid", &payload));
        assert_eq!(session.stats().serialization_failures, 1);
        let sent: Value = serde_json::from_str(&transport.sent()[0]).unwrap();
        assert_eq!(sent["data"], json!("{(1, 2): 3}"));
    }

    #[tokio::test]
    async fn test_duplicate_subscription_skipped() {
        let log = Log::default();
        let (mut session, transport) = open_session().await;
        let handler = recorder(&log, "h");
        assert!(session.subscribe("bet", handler.clone()));
        assert!(!session.subscribe("bet", handler));
        assert_eq!(session.handler_count("bet"), 1);
        transport.deliver(r#"{"name":"bet","data":{"success":true}}"#);
        session.pump().await;
        assert_eq!(entries(&log).len(), 1);
        assert_eq!(session.unsubscribe_all("bet"), 1);
    }

    #[tokio::test]
    async fn test_resubscribing_kept_handler_on_reconnect_does_not_stack() {
        let log = Log::default();
        let (mut session, transport) = open_session().await;
        let handler = recorder(&log, "h");
        let reregister = |session: &mut ChannelSession<MockTransport>| {
            session.subscribe("bet", handler.clone());
            session.on("bet_fresh", |_| Ok(()));
        };
        reregister(&mut session);
        for _ in 0..3 {
            transport.drop_connection();
            session.pump().await;
            transport.accept();
            session.wait_ready().await.unwrap();
            reregister(&mut session);
        }
        assert_eq!(session.handler_count("bet"), 1);
        // closures wrapped anew by `on` are distinct handlers
        assert_eq!(session.handler_count("bet_fresh"), 4);

        transport.deliver(r#"{"name":"bet","data":{"success":true}}"#);
        session.pump().await;
        assert_eq!(entries(&log), vec!["h:{}".to_string()]);
    }

    #[tokio::test]
    async fn test_events_from_superseded_connection_ignored() {
        let log = Log::default();
        let (mut session, transport) = open_session().await;
        session.subscribe("bet", recorder(&log, "h"));
        transport.drop_connection();
        session.pump().await;
        assert_eq!(session.generation(), 2);

        transport.deliver_stale(1, r#"{"name":"bet","data":{"success":true}}"#);
        session.pump().await;
        assert!(entries(&log).is_empty());
        assert_eq!(session.stats().stale_events, 1);
    }

    #[tokio::test]
    async fn test_wait_ready() {
        let (mut session, transport) = session();
        session.connect().unwrap();
        transport.accept();
        session.wait_ready().await.unwrap();

        session.disconnect();
        let err = session.wait_ready().await.unwrap_err();
        assert!(matches!(err, BridgeError::RemoteUnavailable(_)));
    }

    #[tokio::test]
    async fn test_backoff_policy_delays_reconnect() {
        let (session, transport) = session();
        let mut session = session.with_policy(ExponentialBackoff {
            base: Duration::from_millis(20),
            max: Duration::from_secs(1),
        });
        session.connect().unwrap();
        transport.drop_connection();
        session.pump().await;
        assert_eq!(transport.opens(), 1);

        tokio::time::sleep(Duration::from_millis(40)).await;
        session.pump().await;
        assert_eq!(transport.opens(), 2);
    }

    #[tokio::test]
    async fn test_run_until_cancelled() {
        let log = Log::default();
        let (mut session, transport) = session();
        session.subscribe("bet", recorder(&log, "h"));
        session.connect().unwrap();
        transport.accept();
        transport.deliver(r#"{"name":"bet","data":{"success":true,"k":1}}"#);

        let cancel = CancellationToken::new();
        let trigger = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(50)).await;
            trigger.cancel();
        });
        session.run(cancel).await;
        assert_eq!(entries(&log), vec![r#"h:{"k":1}"#.to_string()]);
        assert!(!session.reconnect_enabled());
    }
}
