//! Market Data Feed Types
//!
//! The public, codec-agnostic model delivered to callbacks. Wire types live
//! in `infrastructure::upstox::proto`; the translator projects them into
//! these types.
//!
//! # Shape Rules
//!
//! - Structured groups (LTPC, quotes, greeks, OHLC) that the source variant
//!   does not carry are `None` or empty and skipped on serialization.
//! - Numeric scalars default to zero when absent on the wire.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::domain::subscription::InstrumentKey;

// =============================================================================
// Market Status
// =============================================================================

/// Trading session status of a market segment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MarketStatus {
    /// Pre-open session started.
    PreOpenStart,
    /// Pre-open session ended.
    PreOpenEnd,
    /// Normal trading session open.
    NormalOpen,
    /// Normal trading session closed.
    NormalClose,
    /// Closing session started.
    ClosingStart,
    /// Closing session ended.
    ClosingEnd,
}

impl MarketStatus {
    /// Map a wire status code, falling back to `NormalOpen` for unknown codes.
    #[must_use]
    pub const fn from_code(code: i32) -> Self {
        match code {
            0 => Self::PreOpenStart,
            1 => Self::PreOpenEnd,
            3 => Self::NormalClose,
            4 => Self::ClosingStart,
            5 => Self::ClosingEnd,
            _ => Self::NormalOpen,
        }
    }

    /// Get the status name.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::PreOpenStart => "PRE_OPEN_START",
            Self::PreOpenEnd => "PRE_OPEN_END",
            Self::NormalOpen => "NORMAL_OPEN",
            Self::NormalClose => "NORMAL_CLOSE",
            Self::ClosingStart => "CLOSING_START",
            Self::ClosingEnd => "CLOSING_END",
        }
    }
}

/// Mode the venue reports having served an instrument in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RequestMode {
    /// LTPC only.
    Ltpc,
    /// Full feed, five depth levels.
    FullD5,
    /// First level with option greeks.
    OptionGreeks,
    /// Full feed, thirty depth levels.
    FullD30,
}

// =============================================================================
// Feed Building Blocks
// =============================================================================

/// Last traded price, time, quantity and close price.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Ltpc {
    /// Last traded price.
    pub ltp: f64,
    /// Last traded time (epoch millis).
    pub ltt: i64,
    /// Last traded quantity. Zero is a value, not an absence.
    pub ltq: i64,
    /// Previous close price.
    pub cp: f64,
}

/// A bid/ask price-quantity level.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Quote {
    /// Bid quantity.
    pub bid_q: i64,
    /// Bid price.
    pub bid_p: f64,
    /// Ask quantity.
    pub ask_q: i64,
    /// Ask price.
    pub ask_p: f64,
}

/// Option sensitivities.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct OptionGreeks {
    /// Delta.
    pub delta: f64,
    /// Theta.
    pub theta: f64,
    /// Gamma.
    pub gamma: f64,
    /// Vega.
    pub vega: f64,
    /// Rho.
    pub rho: f64,
}

/// One OHLC candle.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Ohlc {
    /// Candle interval (e.g. `1d`, `I1`).
    pub interval: String,
    /// Open price.
    pub open: f64,
    /// High price.
    pub high: f64,
    /// Low price.
    pub low: f64,
    /// Close price.
    pub close: f64,
    /// Traded volume.
    #[serde(rename = "vol")]
    pub volume: i64,
    /// Candle timestamp (epoch millis).
    pub ts: i64,
}

// =============================================================================
// Feed Variants
// =============================================================================

/// Full feed for a tradable (non-index) instrument.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MarketFullFeed {
    /// LTPC snapshot.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ltpc: Option<Ltpc>,
    /// Depth levels.
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub market_level: Vec<Quote>,
    /// Option greeks.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub option_greeks: Option<OptionGreeks>,
    /// OHLC candles.
    #[serde(rename = "marketOHLC", skip_serializing_if = "Vec::is_empty", default)]
    pub market_ohlc: Vec<Ohlc>,
    /// Average traded price.
    pub atp: f64,
    /// Total traded volume.
    pub vtt: i64,
    /// Open interest.
    pub oi: f64,
    /// Implied volatility.
    pub iv: f64,
    /// Total buy quantity.
    pub tbq: f64,
    /// Total sell quantity.
    pub tsq: f64,
}

/// Full feed for an index.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IndexFullFeed {
    /// LTPC snapshot.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ltpc: Option<Ltpc>,
    /// OHLC candles.
    #[serde(rename = "marketOHLC", skip_serializing_if = "Vec::is_empty", default)]
    pub market_ohlc: Vec<Ohlc>,
}

/// Full feed, either market-class or index-class.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum FullFeed {
    /// Tradable instrument.
    #[serde(rename = "marketFF")]
    Market(MarketFullFeed),
    /// Index.
    #[serde(rename = "indexFF")]
    Index(IndexFullFeed),
}

impl FullFeed {
    /// LTPC of whichever class is populated.
    #[must_use]
    pub const fn ltpc(&self) -> Option<&Ltpc> {
        match self {
            Self::Market(ff) => ff.ltpc.as_ref(),
            Self::Index(ff) => ff.ltpc.as_ref(),
        }
    }
}

/// Best bid/ask with option greeks.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FirstLevelWithGreeks {
    /// LTPC snapshot.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ltpc: Option<Ltpc>,
    /// Best bid/ask.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub first_depth: Option<Quote>,
    /// Option greeks.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub option_greeks: Option<OptionGreeks>,
    /// Total traded volume.
    pub vtt: i64,
    /// Open interest.
    pub oi: f64,
    /// Implied volatility.
    pub iv: f64,
}

/// Translated per-instrument feed.
///
/// At most one of `ltpc`, `full_feed` and `first_level_with_greeks` is
/// populated, matching the wire variant.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeedData {
    /// LTPC-only variant.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ltpc: Option<Ltpc>,
    /// Full feed variant.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub full_feed: Option<FullFeed>,
    /// First level with greeks variant.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub first_level_with_greeks: Option<FirstLevelWithGreeks>,
    /// Mode the venue served this instrument in.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_mode: Option<RequestMode>,
}

impl FeedData {
    /// LTPC of whichever variant is populated.
    #[must_use]
    pub fn last_traded(&self) -> Option<&Ltpc> {
        self.ltpc
            .as_ref()
            .or_else(|| self.full_feed.as_ref().and_then(FullFeed::ltpc))
            .or_else(|| {
                self.first_level_with_greeks
                    .as_ref()
                    .and_then(|f| f.ltpc.as_ref())
            })
    }
}

// =============================================================================
// Translated Messages
// =============================================================================

/// Session status update for market segments.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MarketInfoMessage {
    /// Segment name to status.
    pub segment_status: HashMap<String, MarketStatus>,
    /// Venue timestamp (epoch millis).
    pub current_ts: i64,
}

/// Live (or initial snapshot) feed for subscribed instruments.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LiveFeedMessage {
    /// Per-instrument feed.
    pub feeds: HashMap<InstrumentKey, FeedData>,
    /// Venue timestamp (epoch millis).
    pub current_ts: i64,
    /// Whether this is the initial snapshot sent after subscribing.
    pub initial: bool,
}

/// A translated feed message.
#[derive(Debug, Clone, PartialEq)]
pub enum TranslatedMessage {
    /// Market status update.
    MarketInfo(MarketInfoMessage),
    /// Instrument feed update.
    LiveFeed(LiveFeedMessage),
}
