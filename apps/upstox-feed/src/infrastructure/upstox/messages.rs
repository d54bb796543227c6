//! Upstox JSON Message Types
//!
//! JSON payloads exchanged outside the protobuf feed:
//!
//! - `SubscriptionRequest`: control frames sent on the feed socket
//! - `AuthorizeResponse`: body of the feed authorization endpoint
//!
//! # Wire Format (control frame)
//!
//! ```json
//! {"guid":"…","method":"sub","data":{"mode":"ltpc","instrumentKeys":["NSE_EQ|INE062A01020"]}}
//! ```
//!
//! The venue requires control frames to be sent as binary WebSocket frames
//! even though the payload is JSON text.

use serde::{Deserialize, Serialize};

use crate::domain::subscription::{InstrumentKey, SubscriptionMode};

// =============================================================================
// Control Requests
// =============================================================================

/// Subscription control method.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Method {
    /// Start receiving data for instruments.
    Sub,
    /// Stop receiving data for instruments.
    Unsub,
    /// Switch instruments to another mode.
    ChangeMode,
}

impl Method {
    /// Get the method name used on the wire.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Sub => "sub",
            Self::Unsub => "unsub",
            Self::ChangeMode => "change_mode",
        }
    }
}

/// Payload of a control request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestData {
    /// Mode the request applies to.
    pub mode: SubscriptionMode,
    /// Instruments the request applies to.
    pub instrument_keys: Vec<InstrumentKey>,
}

/// Control request sent on the feed socket.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubscriptionRequest {
    /// Fresh random identifier per request.
    pub guid: String,
    /// Control method.
    pub method: Method,
    /// Mode and instruments.
    pub data: RequestData,
}

impl SubscriptionRequest {
    /// Build a request with a freshly generated GUID.
    #[must_use]
    pub fn new(method: Method, mode: SubscriptionMode, instrument_keys: Vec<InstrumentKey>) -> Self {
        Self {
            guid: uuid::Uuid::new_v4().to_string(),
            method,
            data: RequestData {
                mode,
                instrument_keys,
            },
        }
    }

    /// Build a `sub` request.
    #[must_use]
    pub fn subscribe(mode: SubscriptionMode, instrument_keys: Vec<InstrumentKey>) -> Self {
        Self::new(Method::Sub, mode, instrument_keys)
    }

    /// Build an `unsub` request.
    #[must_use]
    pub fn unsubscribe(mode: SubscriptionMode, instrument_keys: Vec<InstrumentKey>) -> Self {
        Self::new(Method::Unsub, mode, instrument_keys)
    }

    /// Build a `change_mode` request.
    #[must_use]
    pub fn change_mode(mode: SubscriptionMode, instrument_keys: Vec<InstrumentKey>) -> Self {
        Self::new(Method::ChangeMode, mode, instrument_keys)
    }
}

// =============================================================================
// Authorization
// =============================================================================

/// Body returned by the feed authorization endpoint.
///
/// # Wire Format (JSON)
/// ```json
/// {"status":"success","data":{"authorized_redirect_uri":"wss://…"}}
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthorizeResponse {
    /// `success` or `error`.
    pub status: String,
    /// Present on success.
    #[serde(default)]
    pub data: Option<AuthorizeData>,
}

/// Data section of `AuthorizeResponse`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthorizeData {
    /// Short-lived signed WebSocket URL.
    pub authorized_redirect_uri: String,
}

impl AuthorizeResponse {
    /// Check if the endpoint reported success.
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.status == "success"
    }
}
