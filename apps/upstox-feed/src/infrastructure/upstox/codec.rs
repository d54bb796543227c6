//! Feed Codec
//!
//! Encodes subscription control requests and decodes inbound feed frames.
//!
//! - **Outbound**: JSON `SubscriptionRequest`, sent as a *binary* frame
//! - **Inbound**: protobuf `FeedResponse` in binary frames; text frames are
//!   diagnostics and never parsed as feed data

use std::collections::HashMap;

use prost::Message as _;
use tokio_tungstenite::tungstenite::Message;

use super::messages::SubscriptionRequest;
use super::proto;

/// Codec errors.
#[derive(Debug, thiserror::Error)]
pub enum CodecError {
    /// JSON encoding failed.
    #[error("JSON codec error: {0}")]
    Json(#[from] serde_json::Error),

    /// Protobuf decoding failed.
    #[error("protobuf decode error: {0}")]
    Protobuf(#[from] prost::DecodeError),
}

/// Outer type tag of a feed frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeedType {
    /// Snapshot sent right after subscribing.
    InitialFeed,
    /// Incremental live update.
    LiveFeed,
    /// Market segment status.
    MarketInfo,
    /// Tag this client does not understand.
    Other(i32),
}

impl From<i32> for FeedType {
    fn from(tag: i32) -> Self {
        match proto::Type::try_from(tag) {
            Ok(proto::Type::InitialFeed) => Self::InitialFeed,
            Ok(proto::Type::LiveFeed) => Self::LiveFeed,
            Ok(proto::Type::MarketInfo) => Self::MarketInfo,
            Err(_) => Self::Other(tag),
        }
    }
}

/// A decoded, not yet translated, feed frame.
#[derive(Debug, Clone, PartialEq)]
pub struct RawFeedMessage {
    /// Outer type tag.
    pub feed_type: FeedType,
    /// Venue timestamp (epoch millis).
    pub current_ts: i64,
    /// Per-instrument wire feeds.
    pub feeds: HashMap<String, proto::Feed>,
    /// Segment status, present on `market_info` frames.
    pub market_info: Option<proto::MarketInfo>,
}

impl From<proto::FeedResponse> for RawFeedMessage {
    fn from(response: proto::FeedResponse) -> Self {
        Self {
            feed_type: FeedType::from(response.r#type),
            current_ts: response.current_ts,
            feeds: response.feeds,
            market_info: response.market_info,
        }
    }
}

/// Codec for the Upstox market data feed.
#[derive(Debug, Default, Clone, Copy)]
pub struct FeedCodec;

impl FeedCodec {
    /// Create a new feed codec.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    /// Encode a control request into a binary frame.
    ///
    /// # Errors
    ///
    /// Returns an error if JSON serialization fails.
    pub fn encode(&self, request: &SubscriptionRequest) -> Result<Message, CodecError> {
        let payload = serde_json::to_vec(request)?;
        Ok(Message::Binary(payload.into()))
    }

    /// Decode the payload of a binary frame.
    ///
    /// # Errors
    ///
    /// Returns an error if the payload is not a valid `FeedResponse`.
    pub fn decode(&self, data: &[u8]) -> Result<RawFeedMessage, CodecError> {
        let response = proto::FeedResponse::decode(data)?;
        Ok(response.into())
    }
}
