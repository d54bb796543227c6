//! Upstox Market Data Feed Adapters
//!
//! Client for the Upstox v3 realtime market data feed.
//!
//! # Components
//!
//! - `auth`: Authorization Resolver (signed feed URL over HTTPS)
//! - `codec`: Frame Codec (JSON control frames out, protobuf feed frames in)
//! - `translate`: Feed Translator (wire variants to the public model)
//! - `dispatch`: Dispatcher (single-slot callbacks)
//! - `client`: Connection Manager and public API
//!
//! # Protocol
//!
//! - Authorization: `GET /v3/feed/market-data-feed/authorize` with a bearer token
//! - Control frames: JSON sent as *binary* WebSocket frames
//! - Feed frames: protobuf `FeedResponse` in binary frames

pub mod auth;
pub mod client;
pub mod codec;
pub mod dialer;
pub mod dispatch;
pub mod messages;
pub mod proto;
pub mod reconnect;
pub mod translate;

pub use auth::AuthorizationResolver;
pub use client::{
    ConnectionEvent, ConnectionState, FeedClient, FeedClientConfig, FeedEndpoint, FeedError,
};
pub use codec::{CodecError, FeedCodec, FeedType, RawFeedMessage};
pub use dialer::TungsteniteDialer;
pub use dispatch::Dispatcher;
pub use messages::{Method, SubscriptionRequest};
pub use reconnect::{ReconnectConfig, ReconnectPolicy};
pub use translate::translate;
