#![cfg_attr(
    test,
    allow(
        clippy::unwrap_used,
        clippy::expect_used,
        clippy::float_cmp,
        clippy::significant_drop_tightening,
        clippy::too_many_lines,
        clippy::match_same_arms,
        clippy::needless_pass_by_value,
        clippy::needless_collect,
        clippy::option_if_let_else,
        clippy::default_trait_access,
        clippy::items_after_statements,
        clippy::or_fun_call
    )
)]

//! Upstox Feed - Realtime Market Data Client
//!
//! Maintains a single WebSocket connection to the Upstox market data feed,
//! tracks which instruments the caller wants and in what mode, translates
//! the protobuf wire format into a typed model and delivers it to
//! registered callbacks, reconnecting with backoff on failure.
//!
//! # Layers (inside → outside)
//!
//! - **Domain**: Data types with no I/O
//!   - `feed`: Translated market data (LTPC, full feed, greeks, status)
//!   - `subscription`: Instrument keys, modes and the registry
//!
//! - **Application**: Port definitions
//!   - `ports`: Token provider, URL resolver and socket dialer
//!
//! - **Infrastructure**: Adapters and external integrations
//!   - `upstox`: Authorization, codec, translator, dispatcher and client
//!   - `config`: Environment configuration for the binary
//!   - `metrics`: Prometheus instrumentation
//!   - `telemetry`: Tracing subscriber setup
//!
//! # Data Flow
//!
//! ```text
//!                ┌──────────────┐
//! access token ─▶│ Authorization│── signed URL ──┐
//!                └──────────────┘                ▼
//! subscribe() ─▶ Registry ── replay ──▶ ┌──────────────┐
//!                                       │  Feed socket │
//! callbacks ◀── Dispatcher ◀── translate ◀── decode ◀─┘
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::pedantic)]

// =============================================================================
// Module Declarations
// =============================================================================

/// Domain layer - Feed and subscription types with no external dependencies.
pub mod domain;

/// Application layer - Port definitions.
pub mod application;

/// Infrastructure layer - Adapters and external integrations.
pub mod infrastructure;

// =============================================================================
// Re-exports
// =============================================================================

// Domain types
pub use domain::feed::{
    FeedData, FirstLevelWithGreeks, FullFeed, IndexFullFeed, LiveFeedMessage, Ltpc,
    MarketFullFeed, MarketInfoMessage, MarketStatus, Ohlc, OptionGreeks, Quote, RequestMode,
    TranslatedMessage,
};
pub use domain::subscription::{
    InstrumentKey, Subscription, SubscriptionMode, SubscriptionRegistry,
};

// Ports
pub use application::ports::{
    AuthorizationError, DialError, DialTarget, Dialer, FeedSocket, StaticToken, TokenProvider,
    UrlResolver,
};

// Feed client
pub use infrastructure::upstox::{
    AuthorizationResolver, ConnectionEvent, ConnectionState, FeedClient, FeedClientConfig,
    FeedEndpoint, FeedError, ReconnectConfig,
};

// Infrastructure config
pub use infrastructure::config::{ConfigError, FeedSettings};

// Metrics
pub use infrastructure::metrics::{init_metrics, serve_metrics};

// Telemetry
pub use infrastructure::telemetry::{LogFormat, TelemetryConfig, init as init_telemetry};
