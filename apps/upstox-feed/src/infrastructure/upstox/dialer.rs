//! WebSocket Dialer
//!
//! Production `Dialer` backed by tokio-tungstenite with rustls.

use std::time::Duration;

use async_trait::async_trait;
use futures_util::StreamExt;
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::http::HeaderValue;
use tokio_tungstenite::tungstenite::http::header::AUTHORIZATION;
use tokio_tungstenite::tungstenite::Error as WsError;

use crate::application::ports::{DialError, DialTarget, Dialer, FeedSocket};

/// Default time allowed for TCP, TLS and upgrade combined.
pub const DEFAULT_HANDSHAKE_TIMEOUT: Duration = Duration::from_secs(10);

/// Dials the feed over TLS using tokio-tungstenite.
#[derive(Debug, Clone, Copy)]
pub struct TungsteniteDialer {
    handshake_timeout: Duration,
}

impl TungsteniteDialer {
    /// Create a dialer with the given handshake timeout.
    #[must_use]
    pub const fn new(handshake_timeout: Duration) -> Self {
        Self { handshake_timeout }
    }
}

impl Default for TungsteniteDialer {
    fn default() -> Self {
        Self::new(DEFAULT_HANDSHAKE_TIMEOUT)
    }
}

#[async_trait]
impl Dialer for TungsteniteDialer {
    async fn dial(&self, target: &DialTarget) -> Result<FeedSocket, DialError> {
        let mut request = target
            .url
            .as_str()
            .into_client_request()
            .map_err(|e| DialError::InvalidUrl(e.to_string()))?;

        if let Some(token) = &target.bearer_token {
            let value = HeaderValue::from_str(&format!("Bearer {token}"))
                .map_err(|_| DialError::InvalidHeader)?;
            request.headers_mut().insert(AUTHORIZATION, value);
        }

        let connect = tokio_tungstenite::connect_async(request);
        let (ws_stream, _response) = tokio::time::timeout(self.handshake_timeout, connect)
            .await
            .map_err(|_| DialError::Timeout(self.handshake_timeout))?
            .map_err(map_handshake_error)?;

        let (sink, stream) = ws_stream.split();

        Ok(FeedSocket {
            sink: Box::pin(sink),
            stream: Box::pin(stream),
        })
    }
}

fn map_handshake_error(error: WsError) -> DialError {
    match error {
        WsError::Http(response) => DialError::HandshakeRejected {
            status: response.status().as_u16(),
        },
        WsError::Url(e) => DialError::InvalidUrl(e.to_string()),
        other => DialError::Network(other.to_string()),
    }
}
