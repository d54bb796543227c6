//! Feed Client
//!
//! Connection manager and public API for the Upstox market data feed.
//!
//! # Architecture
//!
//! ```text
//! ┌───────────────┐  resolve   ┌──────────────┐
//! │  FeedClient   │──────────▶│ UrlResolver  │
//! │               │    dial    ├──────────────┤
//! │ RwLock<Shared>│──────────▶│    Dialer    │
//! └──────┬────────┘            └──────┬───────┘
//!        │ outbound mpsc              │ FeedSocket
//!        ▼                            ▼
//!   writer task ──▶ sink        stream ──▶ reader task ──▶ codec ──▶ translate ──▶ Dispatcher
//! ```
//!
//! One reader and one writer task run per connection, both bound to a
//! per-connection cancellation token. Subscription calls mutate the registry
//! under the write lock and, only while connected, queue a control frame on
//! the writer channel; they never wait on the network. Replay after a connect
//! runs under the same lock, so it cannot interleave with a mutation.
//!
//! On a read failure the reader consults the `ReconnectPolicy` and schedules
//! a delayed reconnect task; `close` aborts that task before it fires.

use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use parking_lot::{Mutex, RwLock, RwLockWriteGuard};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::Message;
use tokio_util::sync::CancellationToken;

use super::auth::AuthorizationResolver;
use super::codec::{CodecError, FeedCodec};
use super::dialer::TungsteniteDialer;
use super::dispatch::Dispatcher;
use super::messages::SubscriptionRequest;
use super::reconnect::{ReconnectConfig, ReconnectPolicy};
use super::translate::translate;
use crate::application::ports::{
    AuthorizationError, DialError, DialTarget, Dialer, FeedSocket, FrameSink, FrameStream,
    TokenProvider, UrlResolver,
};
use crate::domain::feed::{LiveFeedMessage, MarketInfoMessage};
use crate::domain::subscription::{
    InstrumentKey, Subscription, SubscriptionMode, SubscriptionRegistry,
};
use crate::infrastructure::metrics::{self, FrameKind};

// =============================================================================
// Errors
// =============================================================================

/// Errors returned by the public feed API.
#[derive(Debug, thiserror::Error)]
pub enum FeedError {
    /// Resolving the feed URL failed.
    #[error(transparent)]
    Authorization(#[from] AuthorizationError),

    /// Opening the socket failed.
    #[error(transparent)]
    Dial(#[from] DialError),

    /// Encoding a control frame failed.
    #[error(transparent)]
    Codec(#[from] CodecError),

    /// A subscription call was given no instrument keys.
    #[error("at least one instrument key is required")]
    NoInstrumentKeys,

    /// The connection's writer is gone.
    #[error("feed connection is not writable")]
    NotConnected,

    /// The client was closed while the connection was being established.
    #[error("feed client was closed")]
    Closed,
}

/// Why a reader task stopped.
#[derive(Debug, thiserror::Error)]
enum ReadFailure {
    #[error("transport error: {0}")]
    Transport(String),

    #[error("connection closed by peer")]
    ClosedByPeer,

    #[error("stream ended")]
    StreamEnded,
}

// =============================================================================
// State and Events
// =============================================================================

/// Lifecycle state of the feed connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConnectionState {
    /// No socket and no dial in progress.
    #[default]
    Disconnected,
    /// Resolving or dialing.
    Connecting,
    /// Socket open and reader running.
    Connected,
    /// Tearing down after `close`.
    Closing,
}

/// Connection lifecycle notification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnectionEvent {
    /// Socket opened and subscriptions replayed.
    Connected,
    /// Socket lost or closed.
    Disconnected {
        /// Cause, for diagnostics.
        reason: String,
    },
    /// A reconnect is scheduled.
    Reconnecting {
        /// 1-based attempt number.
        attempt: u32,
        /// Wait before dialing.
        delay: Duration,
    },
    /// A scheduled reconnect failed to connect.
    ReconnectFailed {
        /// Attempt that failed.
        attempt: u32,
        /// Failure description.
        error: String,
    },
    /// Attempt budget exhausted; no further automatic recovery.
    Terminated {
        /// Attempts made before giving up.
        attempts: u32,
    },
}

// =============================================================================
// Configuration
// =============================================================================

/// Client tuning.
#[derive(Debug, Clone)]
pub struct FeedClientConfig {
    /// Limit on resolve-free dial time (TCP, TLS and upgrade).
    pub handshake_timeout: Duration,
    /// Backoff for automatic reconnection.
    pub reconnect: ReconnectConfig,
}

impl Default for FeedClientConfig {
    fn default() -> Self {
        Self {
            handshake_timeout: Duration::from_secs(10),
            reconnect: ReconnectConfig::default(),
        }
    }
}

impl FeedClientConfig {
    /// Create configuration from `FeedSettings`.
    #[must_use]
    pub fn from_settings(settings: &crate::FeedSettings) -> Self {
        Self {
            handshake_timeout: settings.handshake_timeout,
            reconnect: ReconnectConfig::from_settings(settings),
        }
    }
}

/// Where the feed URL comes from.
#[derive(Clone)]
pub enum FeedEndpoint {
    /// Resolve a signed URL before every dial.
    Authorized(Arc<dyn UrlResolver>),
    /// Dial a signed URL supplied by the caller.
    PreResolved(String),
    /// Dial a fixed URL with a bearer header.
    Direct {
        /// WebSocket URL.
        url: String,
        /// Token source for the header.
        tokens: Arc<dyn TokenProvider>,
    },
}

impl FeedEndpoint {
    async fn target(&self) -> Result<DialTarget, FeedError> {
        match self {
            Self::Authorized(resolver) => Ok(DialTarget::signed(resolver.resolve().await?)),
            Self::PreResolved(url) => Ok(DialTarget::signed(url.clone())),
            Self::Direct { url, tokens } => {
                Ok(DialTarget::with_bearer(url.clone(), tokens.access_token()))
            }
        }
    }
}

impl std::fmt::Debug for FeedEndpoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Authorized(_) => f.write_str("Authorized"),
            Self::PreResolved(_) => f.write_str("PreResolved"),
            Self::Direct { url, .. } => f.debug_struct("Direct").field("url", url).finish(),
        }
    }
}

// =============================================================================
// Shared State
// =============================================================================

struct ActiveConnection {
    id: u64,
    outbound: mpsc::UnboundedSender<Message>,
    cancel: CancellationToken,
}

#[derive(Default)]
struct Shared {
    state: ConnectionState,
    registry: SubscriptionRegistry,
    /// Id of the dial in flight; cleared by `close` to void it.
    dialing: Option<u64>,
    connection: Option<ActiveConnection>,
}

struct Inner {
    endpoint: FeedEndpoint,
    dialer: Arc<dyn Dialer>,
    config: FeedClientConfig,
    codec: FeedCodec,
    shared: RwLock<Shared>,
    dispatcher: Dispatcher,
    policy: Mutex<ReconnectPolicy>,
    stopped: AtomicBool,
    pending_reconnect: Mutex<Option<JoinHandle<()>>>,
    next_id: AtomicU64,
}

// =============================================================================
// Feed Client
// =============================================================================

/// Realtime market data feed client.
///
/// Cheap to clone; clones share one connection.
///
/// # Example
///
/// ```rust,no_run
/// use std::sync::Arc;
/// use upstox_feed::{FeedClient, StaticToken, SubscriptionMode};
///
/// # async fn run() -> Result<(), Box<dyn std::error::Error>> {
/// let client = FeedClient::authorized(Arc::new(StaticToken::new("access-token")))?;
/// client.on_live_feed(|feed| println!("{} instruments", feed.feeds.len()));
/// client.subscribe_with_mode(SubscriptionMode::Full, ["NSE_EQ|INE062A01020"])?;
/// client.connect().await?;
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct FeedClient {
    inner: Arc<Inner>,
}

impl FeedClient {
    /// Create a client that dials with tokio-tungstenite.
    #[must_use]
    pub fn new(endpoint: FeedEndpoint, config: FeedClientConfig) -> Self {
        let dialer = Arc::new(TungsteniteDialer::new(config.handshake_timeout));
        Self::with_dialer(endpoint, config, dialer)
    }

    /// Create a client with a custom dialer.
    #[must_use]
    pub fn with_dialer(
        endpoint: FeedEndpoint,
        config: FeedClientConfig,
        dialer: Arc<dyn Dialer>,
    ) -> Self {
        let policy = ReconnectPolicy::new(config.reconnect.clone());
        Self {
            inner: Arc::new(Inner {
                endpoint,
                dialer,
                config,
                codec: FeedCodec::new(),
                shared: RwLock::new(Shared::default()),
                dispatcher: Dispatcher::new(),
                policy: Mutex::new(policy),
                stopped: AtomicBool::new(false),
                pending_reconnect: Mutex::new(None),
                next_id: AtomicU64::new(1),
            }),
        }
    }

    /// Client that authorizes against the production endpoint before each dial.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn authorized(tokens: Arc<dyn TokenProvider>) -> Result<Self, AuthorizationError> {
        let resolver = AuthorizationResolver::new(tokens)?;
        Ok(Self::new(
            FeedEndpoint::Authorized(Arc::new(resolver)),
            FeedClientConfig::default(),
        ))
    }

    /// Client that dials a signed URL obtained elsewhere.
    #[must_use]
    pub fn pre_resolved(url: impl Into<String>) -> Self {
        Self::new(
            FeedEndpoint::PreResolved(url.into()),
            FeedClientConfig::default(),
        )
    }

    /// Client that dials a fixed URL with a bearer header.
    #[must_use]
    pub fn direct(url: impl Into<String>, tokens: Arc<dyn TokenProvider>) -> Self {
        Self::new(
            FeedEndpoint::Direct {
                url: url.into(),
                tokens,
            },
            FeedClientConfig::default(),
        )
    }

    // -------------------------------------------------------------------------
    // Lifecycle
    // -------------------------------------------------------------------------

    /// Open the feed connection and replay registered subscriptions.
    ///
    /// Returns immediately if already connecting or connected. Re-enables
    /// automatic reconnection after a previous `close`.
    ///
    /// # Errors
    ///
    /// Returns an error if authorization or the dial fails, or if `close`
    /// is called before the dial completes.
    pub async fn connect(&self) -> Result<(), FeedError> {
        self.inner.stopped.store(false, Ordering::SeqCst);
        Inner::connect(&self.inner).await
    }

    /// Close the connection and stop reconnecting. Idempotent.
    pub fn close(&self) {
        self.inner.shutdown();
    }

    /// Current connection state.
    #[must_use]
    pub fn state(&self) -> ConnectionState {
        self.inner.shared.read().state
    }

    /// Check if the socket is open.
    #[must_use]
    pub fn is_connected(&self) -> bool {
        self.state() == ConnectionState::Connected
    }

    /// Snapshot of the registered subscriptions.
    #[must_use]
    pub fn subscriptions(&self) -> Vec<(InstrumentKey, Subscription)> {
        self.inner.shared.read().registry.snapshot()
    }

    // -------------------------------------------------------------------------
    // Subscriptions
    // -------------------------------------------------------------------------

    /// Subscribe instruments in LTPC mode.
    ///
    /// # Errors
    ///
    /// Returns an error if `keys` is empty or the request cannot be queued.
    pub fn subscribe<I, K>(&self, keys: I) -> Result<(), FeedError>
    where
        I: IntoIterator<Item = K>,
        K: Into<InstrumentKey>,
    {
        self.subscribe_with_mode(SubscriptionMode::default(), keys)
    }

    /// Subscribe instruments in `mode`.
    ///
    /// # Errors
    ///
    /// Returns an error if `keys` is empty or the request cannot be queued.
    pub fn subscribe_with_mode<I, K>(&self, mode: SubscriptionMode, keys: I) -> Result<(), FeedError>
    where
        I: IntoIterator<Item = K>,
        K: Into<InstrumentKey>,
    {
        let keys = collect_keys(keys)?;
        let mut shared = self.inner.shared.write();
        shared.registry.upsert(mode, &keys);
        metrics::set_subscriptions(shared.registry.len());

        tracing::debug!(mode = %mode, instruments = keys.len(), "Subscribing");
        self.inner
            .send_if_connected(&shared, SubscriptionRequest::subscribe(mode, keys))
    }

    /// Move registered instruments to `mode`; unknown keys are ignored.
    ///
    /// # Errors
    ///
    /// Returns an error if `keys` is empty or the request cannot be queued.
    pub fn change_mode<I, K>(&self, mode: SubscriptionMode, keys: I) -> Result<(), FeedError>
    where
        I: IntoIterator<Item = K>,
        K: Into<InstrumentKey>,
    {
        let keys = collect_keys(keys)?;
        let mut shared = self.inner.shared.write();
        let changed = shared.registry.change_mode(mode, &keys);
        if changed.is_empty() {
            tracing::debug!(mode = %mode, "No registered instruments to change");
            return Ok(());
        }

        tracing::debug!(mode = %mode, instruments = changed.len(), "Changing mode");
        self.inner
            .send_if_connected(&shared, SubscriptionRequest::change_mode(mode, changed))
    }

    /// Remove instruments; sends one `unsub` per recorded mode.
    ///
    /// # Errors
    ///
    /// Returns an error if `keys` is empty or a request cannot be queued.
    pub fn unsubscribe<I, K>(&self, keys: I) -> Result<(), FeedError>
    where
        I: IntoIterator<Item = K>,
        K: Into<InstrumentKey>,
    {
        let keys = collect_keys(keys)?;
        let mut shared = self.inner.shared.write();
        let removed = shared.registry.remove(&keys);
        metrics::set_subscriptions(shared.registry.len());

        for (mode, group) in removed {
            tracing::debug!(mode = %mode, instruments = group.len(), "Unsubscribing");
            self.inner
                .send_if_connected(&shared, SubscriptionRequest::unsubscribe(mode, group))?;
        }
        Ok(())
    }

    // -------------------------------------------------------------------------
    // Callbacks
    // -------------------------------------------------------------------------

    /// Set the market status callback, replacing any previous one.
    pub fn on_market_info<F>(&self, callback: F)
    where
        F: Fn(&MarketInfoMessage) + Send + Sync + 'static,
    {
        self.inner.dispatcher.set_market_info(callback);
    }

    /// Set the live feed callback, replacing any previous one.
    pub fn on_live_feed<F>(&self, callback: F)
    where
        F: Fn(&LiveFeedMessage) + Send + Sync + 'static,
    {
        self.inner.dispatcher.set_live_feed(callback);
    }

    /// Set the connection event callback, replacing any previous one.
    pub fn on_connection_event<F>(&self, callback: F)
    where
        F: Fn(&ConnectionEvent) + Send + Sync + 'static,
    {
        self.inner.dispatcher.set_connection_event(callback);
    }
}

impl std::fmt::Debug for FeedClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FeedClient")
            .field("endpoint", &self.inner.endpoint)
            .field("state", &self.state())
            .finish_non_exhaustive()
    }
}

fn collect_keys<I, K>(keys: I) -> Result<Vec<InstrumentKey>, FeedError>
where
    I: IntoIterator<Item = K>,
    K: Into<InstrumentKey>,
{
    let mut seen = HashSet::new();
    let keys: Vec<InstrumentKey> = keys
        .into_iter()
        .map(Into::into)
        .filter(|key| seen.insert(key.clone()))
        .collect();
    if keys.is_empty() {
        return Err(FeedError::NoInstrumentKeys);
    }
    Ok(keys)
}

// =============================================================================
// Connection Manager
// =============================================================================

impl Inner {
    async fn connect(self: &Arc<Self>) -> Result<(), FeedError> {
        let attempt = self.next_id.fetch_add(1, Ordering::Relaxed);
        {
            let mut shared = self.shared.write();
            if matches!(
                shared.state,
                ConnectionState::Connecting | ConnectionState::Connected
            ) {
                return Ok(());
            }
            shared.state = ConnectionState::Connecting;
            shared.dialing = Some(attempt);
        }

        let socket = match self.open_socket().await {
            Ok(socket) => socket,
            Err(e) => {
                let mut shared = self.shared.write();
                if shared.dialing == Some(attempt) {
                    shared.dialing = None;
                    shared.state = ConnectionState::Disconnected;
                }
                return Err(e);
            }
        };

        self.install(attempt, socket)?;

        tracing::info!(connection = attempt, "Feed connected");
        metrics::set_connected(true);
        self.dispatcher.emit(&ConnectionEvent::Connected);
        Ok(())
    }

    async fn open_socket(&self) -> Result<FeedSocket, FeedError> {
        let target = self.endpoint.target().await?;
        tracing::debug!(dial_target = ?target, "Dialing feed");

        let timeout = self.config.handshake_timeout;
        let socket = tokio::time::timeout(timeout, self.dialer.dial(&target))
            .await
            .map_err(|_| DialError::Timeout(timeout))??;
        Ok(socket)
    }

    /// Publish a freshly dialed socket and replay the registry.
    fn install(self: &Arc<Self>, id: u64, socket: FeedSocket) -> Result<(), FeedError> {
        let cancel = CancellationToken::new();
        let (outbound, rx) = mpsc::unbounded_channel();

        let mut shared = self.shared.write();
        if shared.dialing != Some(id) {
            // `close` ran during the dial; the socket drops here.
            return Err(FeedError::Closed);
        }
        shared.dialing = None;
        shared.state = ConnectionState::Connected;
        shared.connection = Some(ActiveConnection {
            id,
            outbound: outbound.clone(),
            cancel: cancel.clone(),
        });
        self.policy.lock().reset();

        tokio::spawn(write_loop(socket.sink, rx, cancel.clone()));
        tokio::spawn(read_loop(Arc::downgrade(self), id, socket.stream, cancel));

        let shared = RwLockWriteGuard::downgrade(shared);
        for (mode, keys) in shared.registry.grouped_by_mode() {
            tracing::debug!(mode = %mode, instruments = keys.len(), "Replaying subscriptions");
            let request = SubscriptionRequest::subscribe(mode, keys);
            match self.codec.encode(&request) {
                Ok(frame) => {
                    if outbound.send(frame).is_err() {
                        tracing::warn!("Writer stopped during subscription replay");
                        break;
                    }
                }
                Err(e) => tracing::warn!(mode = %mode, error = %e, "Failed to encode replay"),
            }
        }
        Ok(())
    }

    fn send_if_connected(
        &self,
        shared: &Shared,
        request: SubscriptionRequest,
    ) -> Result<(), FeedError> {
        let Some(connection) = &shared.connection else {
            tracing::trace!("Not connected; request deferred to next replay");
            return Ok(());
        };

        let frame = self.codec.encode(&request)?;
        connection
            .outbound
            .send(frame)
            .map_err(|_| FeedError::NotConnected)
    }

    fn handle_binary(&self, data: &[u8]) {
        metrics::record_frame_received(FrameKind::Binary);

        let raw = match self.codec.decode(data) {
            Ok(raw) => raw,
            Err(e) => {
                metrics::record_decode_error();
                tracing::warn!(error = %e, bytes = data.len(), "Dropping undecodable feed frame");
                return;
            }
        };

        let feed_type = raw.feed_type;
        match translate(raw) {
            Some(message) => {
                self.dispatcher.dispatch(&message);
            }
            None => tracing::debug!(?feed_type, "Ignoring feed frame"),
        }
    }

    fn on_read_failure(self: &Arc<Self>, id: u64, failure: &ReadFailure) {
        {
            let mut shared = self.shared.write();
            if shared.connection.as_ref().map(|c| c.id) != Some(id) {
                return;
            }
            if let Some(connection) = shared.connection.take() {
                connection.cancel.cancel();
            }
            shared.state = ConnectionState::Disconnected;
        }

        tracing::warn!(connection = id, error = %failure, "Feed connection lost");
        metrics::set_connected(false);
        self.dispatcher.emit(&ConnectionEvent::Disconnected {
            reason: failure.to_string(),
        });

        self.schedule_reconnect();
    }

    fn schedule_reconnect(self: &Arc<Self>) {
        if self.stopped.load(Ordering::SeqCst) {
            return;
        }

        let (delay, attempt) = {
            let mut policy = self.policy.lock();
            (policy.next_delay(), policy.attempt_count())
        };

        let Some(delay) = delay else {
            self.stopped.store(true, Ordering::SeqCst);
            tracing::error!(attempts = attempt, "Reconnect attempts exhausted, giving up");
            self.dispatcher
                .emit(&ConnectionEvent::Terminated { attempts: attempt });
            return;
        };

        tracing::info!(
            attempt,
            delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
            "Scheduling reconnect"
        );
        metrics::record_reconnect();
        self.dispatcher
            .emit(&ConnectionEvent::Reconnecting { attempt, delay });

        let weak = Arc::downgrade(self);
        let handle = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            let Some(inner) = weak.upgrade() else {
                return;
            };
            if inner.stopped.load(Ordering::SeqCst) {
                return;
            }

            if let Err(e) = Self::connect(&inner).await {
                if matches!(e, FeedError::Closed) {
                    return;
                }
                tracing::warn!(attempt, error = %e, "Reconnect failed");
                inner.dispatcher.emit(&ConnectionEvent::ReconnectFailed {
                    attempt,
                    error: e.to_string(),
                });
                inner.schedule_reconnect();
            }
        });

        *self.pending_reconnect.lock() = Some(handle);
    }

    fn shutdown(&self) {
        self.stopped.store(true, Ordering::SeqCst);
        if let Some(handle) = self.pending_reconnect.lock().take() {
            handle.abort();
        }

        let connection = {
            let mut shared = self.shared.write();
            shared.dialing = None;
            if shared.connection.is_some() {
                shared.state = ConnectionState::Closing;
            } else if shared.state == ConnectionState::Connecting {
                shared.state = ConnectionState::Disconnected;
            }
            shared.connection.take()
        };

        let Some(connection) = connection else {
            return;
        };
        connection.cancel.cancel();

        {
            let mut shared = self.shared.write();
            if shared.state == ConnectionState::Closing {
                shared.state = ConnectionState::Disconnected;
            }
        }

        tracing::info!(connection = connection.id, "Feed closed");
        metrics::set_connected(false);
        self.dispatcher.emit(&ConnectionEvent::Disconnected {
            reason: "closed by client".to_string(),
        });
    }
}

impl Drop for Inner {
    fn drop(&mut self) {
        if let Some(handle) = self.pending_reconnect.get_mut().take() {
            handle.abort();
        }
        if let Some(connection) = self.shared.get_mut().connection.take() {
            connection.cancel.cancel();
        }
    }
}

// =============================================================================
// Connection Tasks
// =============================================================================

async fn write_loop(
    mut sink: FrameSink,
    mut rx: mpsc::UnboundedReceiver<Message>,
    cancel: CancellationToken,
) {
    loop {
        tokio::select! {
            biased;
            () = cancel.cancelled() => break,
            frame = rx.recv() => {
                let Some(frame) = frame else { break };
                if let Err(e) = sink.send(frame).await {
                    tracing::warn!(error = %e, "Failed to write feed frame");
                    break;
                }
            }
        }
    }

    if let Err(e) = sink.close().await {
        tracing::debug!(error = %e, "Error closing feed socket");
    }
}

async fn read_loop(
    inner: Weak<Inner>,
    id: u64,
    mut stream: FrameStream,
    cancel: CancellationToken,
) {
    let failure = loop {
        let next = tokio::select! {
            biased;
            () = cancel.cancelled() => return,
            frame = stream.next() => frame,
        };

        let Some(client) = inner.upgrade() else {
            return;
        };

        match next {
            Some(Ok(Message::Binary(data))) => client.handle_binary(&data),
            Some(Ok(Message::Text(text))) => {
                metrics::record_frame_received(FrameKind::Text);
                tracing::debug!(text = %text.as_str(), "Feed text frame");
            }
            Some(Ok(Message::Close(frame))) => {
                tracing::debug!(?frame, "Feed close frame");
                break ReadFailure::ClosedByPeer;
            }
            Some(Ok(_)) => metrics::record_frame_received(FrameKind::Control),
            Some(Err(e)) => break ReadFailure::Transport(e.to_string()),
            None => break ReadFailure::StreamEnded,
        }
    };

    if let Some(client) = inner.upgrade() {
        client.on_read_failure(id, &failure);
    }
}
