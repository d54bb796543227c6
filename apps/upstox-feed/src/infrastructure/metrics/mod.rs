//! Prometheus Metrics Module
//!
//! Exposes feed client metrics via Prometheus format for monitoring.
//!
//! # Metrics Categories
//!
//! - **Frames**: Inbound frames by kind and decode failures
//! - **Dispatch**: Messages delivered to callbacks and callback latency
//! - **Connection**: Connected flag and reconnect attempts
//! - **Subscriptions**: Registered instrument count
//!
//! Recording is a no-op until `init_metrics` or `serve_metrics` installs a
//! recorder, so the library can be embedded without exporting anything.

use std::net::SocketAddr;
use std::sync::OnceLock;
use std::time::Duration;

use metrics::{counter, describe_counter, describe_gauge, describe_histogram, gauge, histogram};
use metrics_exporter_prometheus::{BuildError, PrometheusBuilder, PrometheusHandle};

// =============================================================================
// Global Metrics Handle
// =============================================================================

static PROMETHEUS_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

/// Initialize the Prometheus metrics recorder without an HTTP listener.
///
/// Subsequent calls return the handle installed by the first.
///
/// # Errors
///
/// Returns an error if another global recorder is already installed.
pub fn init_metrics() -> Result<PrometheusHandle, BuildError> {
    if let Some(handle) = PROMETHEUS_HANDLE.get() {
        return Ok(handle.clone());
    }

    let handle = PrometheusBuilder::new().install_recorder()?;
    register_metrics();

    Ok(PROMETHEUS_HANDLE.get_or_init(|| handle).clone())
}

/// Install the recorder and serve `/metrics` on `addr`.
///
/// Must be called from within a Tokio runtime.
///
/// # Errors
///
/// Returns an error if the listener cannot bind or a recorder is already
/// installed.
pub fn serve_metrics(addr: SocketAddr) -> Result<(), BuildError> {
    PrometheusBuilder::new().with_http_listener(addr).install()?;
    register_metrics();
    Ok(())
}

/// Get the Prometheus handle for rendering metrics.
///
/// Returns `None` unless `init_metrics` has been called.
#[must_use]
pub fn get_metrics_handle() -> Option<PrometheusHandle> {
    PROMETHEUS_HANDLE.get().cloned()
}

// =============================================================================
// Metric Registration
// =============================================================================

fn register_metrics() {
    describe_counter!(
        "upstox_feed_frames_received_total",
        "Total WebSocket frames received from the feed by kind"
    );
    describe_counter!(
        "upstox_feed_decode_errors_total",
        "Total binary frames dropped because they failed to decode"
    );
    describe_counter!(
        "upstox_feed_messages_dispatched_total",
        "Total translated messages delivered to callbacks"
    );
    describe_counter!(
        "upstox_feed_reconnects_total",
        "Total scheduled reconnection attempts"
    );

    describe_gauge!(
        "upstox_feed_connected",
        "1 while the feed socket is connected, 0 otherwise"
    );
    describe_gauge!(
        "upstox_feed_subscriptions",
        "Number of instruments in the subscription registry"
    );

    describe_histogram!(
        "upstox_feed_dispatch_seconds",
        "Time spent inside user callbacks per message"
    );
}

// =============================================================================
// Metric Recording Functions
// =============================================================================

/// Metric labels for inbound frames.
#[derive(Debug, Clone, Copy)]
pub enum FrameKind {
    /// Protobuf feed frame.
    Binary,
    /// Diagnostic text frame.
    Text,
    /// Ping, pong or other control frame.
    Control,
}

impl FrameKind {
    const fn as_str(self) -> &'static str {
        match self {
            Self::Binary => "binary",
            Self::Text => "text",
            Self::Control => "control",
        }
    }
}

/// Metric labels for dispatched messages.
#[derive(Debug, Clone, Copy)]
pub enum DispatchCategory {
    /// Segment status message.
    MarketInfo,
    /// Initial or live feed message.
    LiveFeed,
    /// Connection lifecycle event.
    ConnectionEvent,
}

impl DispatchCategory {
    const fn as_str(self) -> &'static str {
        match self {
            Self::MarketInfo => "market_info",
            Self::LiveFeed => "live_feed",
            Self::ConnectionEvent => "connection_event",
        }
    }
}

/// Record a frame received from the feed.
pub fn record_frame_received(kind: FrameKind) {
    counter!(
        "upstox_feed_frames_received_total",
        "kind" => kind.as_str()
    )
    .increment(1);
}

/// Record a frame that failed to decode.
pub fn record_decode_error() {
    counter!("upstox_feed_decode_errors_total").increment(1);
}

/// Record a message delivered to a callback.
pub fn record_dispatched(category: DispatchCategory, duration: Duration) {
    counter!(
        "upstox_feed_messages_dispatched_total",
        "category" => category.as_str()
    )
    .increment(1);
    histogram!(
        "upstox_feed_dispatch_seconds",
        "category" => category.as_str()
    )
    .record(duration.as_secs_f64());
}

/// Record a scheduled reconnection attempt.
pub fn record_reconnect() {
    counter!("upstox_feed_reconnects_total").increment(1);
}

/// Update the connected flag.
pub fn set_connected(connected: bool) {
    gauge!("upstox_feed_connected").set(if connected { 1.0 } else { 0.0 });
}

/// Update the registered instrument count.
#[allow(clippy::cast_precision_loss)]
pub fn set_subscriptions(count: usize) {
    gauge!("upstox_feed_subscriptions").set(count as f64);
}

// =============================================================================
// Tests
// =============================================================================
