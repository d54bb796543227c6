//! Port Interfaces
//!
//! Defines the interfaces (ports) for external systems following
//! the Hexagonal Architecture pattern. These are the contracts that
//! infrastructure adapters must implement.
//!
//! ## Driven Ports (Outbound)
//!
//! - `TokenProvider`: Supplies the current bearer token
//! - `UrlResolver`: Produces a signed feed URL for one connect attempt
//! - `Dialer`: Opens a WebSocket and hands back a frame sink and stream

use std::pin::Pin;
use std::time::Duration;

use async_trait::async_trait;
use futures_util::{Sink, Stream};
use tokio_tungstenite::tungstenite::{self, Message};

// =============================================================================
// Token Provider
// =============================================================================

/// Source of the bearer token used for authorization and direct dials.
pub trait TokenProvider: Send + Sync {
    /// Current access token.
    fn access_token(&self) -> String;
}

/// A fixed access token.
#[derive(Clone)]
pub struct StaticToken(String);

impl StaticToken {
    /// Wrap a token.
    #[must_use]
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }
}

impl TokenProvider for StaticToken {
    fn access_token(&self) -> String {
        self.0.clone()
    }
}

impl std::fmt::Debug for StaticToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("StaticToken([REDACTED])")
    }
}

// =============================================================================
// URL Resolver
// =============================================================================

/// Errors from resolving the authorized feed URL.
#[derive(Debug, thiserror::Error)]
pub enum AuthorizationError {
    /// HTTP request failed (network, timeout, TLS).
    #[error("authorization request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// Endpoint answered with a non-success status.
    #[error("authorization rejected: status={status} (HTTP {http_status})")]
    Rejected {
        /// `status` field of the response body.
        status: String,
        /// HTTP status code.
        http_status: u16,
    },

    /// Response body was not the expected JSON.
    #[error("invalid authorization response: {0}")]
    InvalidResponse(#[from] serde_json::Error),

    /// Successful response without a redirect URI.
    #[error("authorization response missing authorized_redirect_uri")]
    MissingRedirectUri,

    /// Token provider returned an empty token.
    #[error("access token is empty")]
    MissingToken,
}

/// Produces the URL to dial for one connect attempt.
#[async_trait]
pub trait UrlResolver: Send + Sync {
    /// Resolve a fresh, signed feed URL.
    async fn resolve(&self) -> Result<String, AuthorizationError>;
}

// =============================================================================
// Dialer
// =============================================================================

/// Outbound half of a feed socket.
pub type FrameSink = Pin<Box<dyn Sink<Message, Error = tungstenite::Error> + Send>>;

/// Inbound half of a feed socket.
pub type FrameStream = Pin<Box<dyn Stream<Item = Result<Message, tungstenite::Error>> + Send>>;

/// An open feed socket, split into its two halves.
pub struct FeedSocket {
    /// Frames written to the venue.
    pub sink: FrameSink,
    /// Frames read from the venue.
    pub stream: FrameStream,
}

impl std::fmt::Debug for FeedSocket {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FeedSocket").finish_non_exhaustive()
    }
}

/// Where and how to dial.
#[derive(Clone, PartialEq, Eq)]
pub struct DialTarget {
    /// WebSocket URL.
    pub url: String,
    /// Bearer token sent in the handshake, if any.
    pub bearer_token: Option<String>,
}

impl DialTarget {
    /// Dial a pre-signed URL without extra headers.
    #[must_use]
    pub fn signed(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            bearer_token: None,
        }
    }

    /// Dial a fixed URL with a bearer header.
    #[must_use]
    pub fn with_bearer(url: impl Into<String>, token: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            bearer_token: Some(token.into()),
        }
    }
}

impl std::fmt::Debug for DialTarget {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // Signed URLs carry credentials in the query string.
        let host = self.url.split('?').next().unwrap_or_default();
        f.debug_struct("DialTarget")
            .field("url", &host)
            .field("bearer_token", &self.bearer_token.as_ref().map(|_| "[REDACTED]"))
            .finish()
    }
}

/// Errors from opening the feed socket.
#[derive(Debug, thiserror::Error)]
pub enum DialError {
    /// URL could not be turned into a handshake request.
    #[error("invalid feed URL: {0}")]
    InvalidUrl(String),

    /// Bearer token is not a valid header value.
    #[error("invalid authorization header")]
    InvalidHeader,

    /// Handshake did not finish in time.
    #[error("handshake timed out after {0:?}")]
    Timeout(Duration),

    /// Server answered the upgrade with a non-101 status.
    #[error("handshake rejected with HTTP {status}")]
    HandshakeRejected {
        /// HTTP status code.
        status: u16,
    },

    /// Transport failure (DNS, TCP, TLS).
    #[error("network failure: {0}")]
    Network(String),
}

/// Opens feed sockets.
#[async_trait]
pub trait Dialer: Send + Sync {
    /// Dial `target` and complete the WebSocket handshake.
    async fn dial(&self, target: &DialTarget) -> Result<FeedSocket, DialError>;
}
