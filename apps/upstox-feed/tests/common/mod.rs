//! In-memory feed socket for integration tests.
//!
//! `FakeDialer` hands the client one end of a pair of futures channels and
//! delivers the other end (`ServerEnd`) to the test, which plays the venue.

#![allow(dead_code, clippy::unwrap_used, clippy::expect_used)]

use std::collections::{BTreeMap, VecDeque};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use futures::SinkExt;
use futures::StreamExt;
use futures::channel::mpsc as chan;
use parking_lot::Mutex;
use prost::Message as _;
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::{Error as WsError, Message};

use upstox_feed::infrastructure::upstox::messages::{Method, SubscriptionRequest};
use upstox_feed::infrastructure::upstox::proto;
use upstox_feed::{
    ConnectionEvent, DialError, DialTarget, Dialer, FeedClient, FeedClientConfig, FeedEndpoint,
    FeedSocket, InstrumentKey, ReconnectConfig, SubscriptionMode,
};

/// Upper bound on any single wait in a test.
pub const WAIT: Duration = Duration::from_secs(2);

// =============================================================================
// Fake Dialer
// =============================================================================

/// Scripted outcome of one dial.
#[derive(Debug, Clone, Copy)]
pub enum DialOutcome {
    /// Hand out a connected socket.
    Accept,
    /// Fail the handshake with this HTTP status.
    Reject(u16),
}

/// Dialer that connects to in-memory channels.
pub struct FakeDialer {
    dials: AtomicUsize,
    targets: Mutex<Vec<DialTarget>>,
    script: Mutex<VecDeque<DialOutcome>>,
    fallback: Mutex<DialOutcome>,
    delay: Mutex<Duration>,
    accepted: mpsc::UnboundedSender<ServerEnd>,
}

impl FakeDialer {
    /// Create a dialer and the receiver of its accepted connections.
    pub fn new() -> (Arc<Self>, mpsc::UnboundedReceiver<ServerEnd>) {
        let (accepted, rx) = mpsc::unbounded_channel();
        let dialer = Arc::new(Self {
            dials: AtomicUsize::new(0),
            targets: Mutex::new(Vec::new()),
            script: Mutex::new(VecDeque::new()),
            fallback: Mutex::new(DialOutcome::Accept),
            delay: Mutex::new(Duration::ZERO),
            accepted,
        });
        (dialer, rx)
    }

    /// Queue outcomes for the next dials.
    pub fn script(&self, outcomes: impl IntoIterator<Item = DialOutcome>) {
        self.script.lock().extend(outcomes);
    }

    /// Outcome once the script is used up.
    pub fn set_fallback(&self, outcome: DialOutcome) {
        *self.fallback.lock() = outcome;
    }

    /// Delay every dial.
    pub fn set_delay(&self, delay: Duration) {
        *self.delay.lock() = delay;
    }

    /// Number of dials so far.
    pub fn dial_count(&self) -> usize {
        self.dials.load(Ordering::SeqCst)
    }

    /// Targets dialed so far.
    pub fn targets(&self) -> Vec<DialTarget> {
        self.targets.lock().clone()
    }
}

#[async_trait]
impl Dialer for FakeDialer {
    async fn dial(&self, target: &DialTarget) -> Result<FeedSocket, DialError> {
        self.dials.fetch_add(1, Ordering::SeqCst);
        self.targets.lock().push(target.clone());

        let delay = *self.delay.lock();
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }

        let outcome = self
            .script
            .lock()
            .pop_front()
            .unwrap_or_else(|| *self.fallback.lock());

        match outcome {
            DialOutcome::Reject(status) => Err(DialError::HandshakeRejected { status }),
            DialOutcome::Accept => {
                let (to_server, sent) = chan::unbounded::<Message>();
                let (inbound, from_server) = chan::unbounded::<Result<Message, WsError>>();

                let _ = self.accepted.send(ServerEnd { sent, inbound });

                Ok(FeedSocket {
                    sink: Box::pin(to_server.sink_map_err(|_| WsError::ConnectionClosed)),
                    stream: Box::pin(from_server),
                })
            }
        }
    }
}

// =============================================================================
// Server End
// =============================================================================

/// The venue side of one accepted connection.
pub struct ServerEnd {
    sent: chan::UnboundedReceiver<Message>,
    inbound: chan::UnboundedSender<Result<Message, WsError>>,
}

impl ServerEnd {
    /// Next control request written by the client.
    pub async fn next_request(&mut self) -> SubscriptionRequest {
        let frame = tokio::time::timeout(WAIT, self.sent.next())
            .await
            .expect("timed out waiting for a client frame")
            .expect("client closed the socket");

        match frame {
            Message::Binary(payload) => serde_json::from_slice(&payload).unwrap(),
            other => panic!("control requests must be binary frames, got {other:?}"),
        }
    }

    /// Collect `count` requests.
    pub async fn requests(&mut self, count: usize) -> Vec<SubscriptionRequest> {
        let mut requests = Vec::with_capacity(count);
        for _ in 0..count {
            requests.push(self.next_request().await);
        }
        requests
    }

    /// Assert the client writes nothing for `period`.
    pub async fn assert_silent(&mut self, period: Duration) {
        if let Ok(Some(frame)) = tokio::time::timeout(period, self.sent.next()).await {
            panic!("unexpected client frame: {frame:?}");
        }
    }

    /// Send a raw frame to the client.
    pub fn push(&self, message: Message) {
        self.inbound.unbounded_send(Ok(message)).unwrap();
    }

    /// Send an encoded feed response to the client.
    pub fn push_feed(&self, response: &proto::FeedResponse) {
        self.push(Message::Binary(response.encode_to_vec().into()));
    }

    /// Fail the client's next read.
    pub fn push_error(&self) {
        self.inbound
            .unbounded_send(Err(WsError::ConnectionClosed))
            .unwrap();
    }

    /// End the client's read stream.
    pub fn hang_up(self) {
        drop(self);
    }
}

// =============================================================================
// Harness
// =============================================================================

/// A client wired to a `FakeDialer` with its events captured.
pub struct Harness {
    pub client: FeedClient,
    pub dialer: Arc<FakeDialer>,
    pub accepted: mpsc::UnboundedReceiver<ServerEnd>,
    pub events: mpsc::UnboundedReceiver<ConnectionEvent>,
}

impl Harness {
    /// Harness with a pre-resolved endpoint and the given backoff.
    pub fn new(reconnect: ReconnectConfig) -> Self {
        Self::with_endpoint(
            FeedEndpoint::PreResolved("wss://feed.test/v3?code=signed".to_string()),
            reconnect,
        )
    }

    /// Harness with an explicit endpoint.
    pub fn with_endpoint(endpoint: FeedEndpoint, reconnect: ReconnectConfig) -> Self {
        let (dialer, accepted) = FakeDialer::new();
        let config = FeedClientConfig {
            handshake_timeout: Duration::from_secs(1),
            reconnect,
        };
        let client = FeedClient::with_dialer(endpoint, config, dialer.clone());

        let (tx, events) = mpsc::unbounded_channel();
        client.on_connection_event(move |event| {
            let _ = tx.send(event.clone());
        });

        Self {
            client,
            dialer,
            accepted,
            events,
        }
    }

    /// Wait for the next accepted connection.
    pub async fn accept(&mut self) -> ServerEnd {
        tokio::time::timeout(WAIT, self.accepted.recv())
            .await
            .expect("timed out waiting for a dial")
            .expect("dialer dropped")
    }

    /// Wait for the next connection event.
    pub async fn next_event(&mut self) -> ConnectionEvent {
        tokio::time::timeout(WAIT, self.events.recv())
            .await
            .expect("timed out waiting for a connection event")
            .expect("event channel closed")
    }

    /// Connect and return the venue end.
    pub async fn connected(&mut self) -> ServerEnd {
        self.client.connect().await.unwrap();
        assert_eq!(self.next_event().await, ConnectionEvent::Connected);
        self.accept().await
    }
}

/// Backoff with small delays and no jitter.
pub fn fast_backoff(initial_ms: u64, max_attempts: u32) -> ReconnectConfig {
    ReconnectConfig {
        initial_delay: Duration::from_millis(initial_ms),
        max_delay: Duration::from_secs(5),
        multiplier: 2.0,
        jitter_factor: 0.0,
        max_attempts,
    }
}

/// Group `sub` requests by mode with sorted keys.
pub fn by_mode(requests: &[SubscriptionRequest]) -> BTreeMap<SubscriptionMode, Vec<InstrumentKey>> {
    let mut grouped: BTreeMap<SubscriptionMode, Vec<InstrumentKey>> = BTreeMap::new();
    for request in requests {
        assert_eq!(request.method, Method::Sub);
        let keys = grouped.entry(request.data.mode).or_default();
        keys.extend(request.data.instrument_keys.iter().cloned());
        keys.sort();
    }
    grouped
}

/// Keys from string literals.
pub fn keys(raw: &[&str]) -> Vec<InstrumentKey> {
    raw.iter().map(|k| InstrumentKey::new(*k)).collect()
}

/// A feed response holding one LTPC-only instrument.
pub fn ltpc_frame(instrument: &str, ltp: f64, ltq: i64) -> proto::FeedResponse {
    let mut feeds = std::collections::HashMap::new();
    feeds.insert(
        instrument.to_string(),
        proto::Feed {
            request_mode: proto::RequestMode::Ltpc as i32,
            feed_union: Some(proto::feed::FeedUnion::Ltpc(proto::Ltpc {
                ltp,
                ltt: 1_700_000_000_000,
                ltq,
                cp: 100.0,
            })),
        },
    );
    proto::FeedResponse {
        r#type: proto::Type::LiveFeed as i32,
        feeds,
        current_ts: 1_700_000_000_500,
        market_info: None,
    }
}
