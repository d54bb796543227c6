//! Feed Authorization
//!
//! Obtains the short-lived, signed WebSocket URL for the market data feed.
//!
//! # Authorization Flow
//!
//! 1. `GET /v3/feed/market-data-feed/authorize` with `Authorization: Bearer <token>`
//! 2. Receive `{"status":"success","data":{"authorized_redirect_uri":"wss://…"}}`
//! 3. Dial the redirect URI before it expires
//!
//! The URL is single-use, so it is resolved again on every (re)connect.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use reqwest::header::{ACCEPT, AUTHORIZATION};

use super::messages::AuthorizeResponse;
use crate::application::ports::{AuthorizationError, TokenProvider, UrlResolver};

// =============================================================================
// Constants
// =============================================================================

/// Production feed authorization endpoint.
pub const DEFAULT_AUTHORIZE_URL: &str = "https://api.upstox.com/v3/feed/market-data-feed/authorize";

/// Timeout for the authorization request.
pub const AUTHORIZE_TIMEOUT: Duration = Duration::from_secs(10);

// =============================================================================
// Authorization Resolver
// =============================================================================

/// Resolves the feed URL through the authorization endpoint.
#[derive(Clone)]
pub struct AuthorizationResolver {
    client: Client,
    endpoint: String,
    tokens: Arc<dyn TokenProvider>,
}

impl AuthorizationResolver {
    /// Create a resolver against the production endpoint.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(tokens: Arc<dyn TokenProvider>) -> Result<Self, AuthorizationError> {
        Self::with_endpoint(tokens, DEFAULT_AUTHORIZE_URL, AUTHORIZE_TIMEOUT)
    }

    /// Create a resolver against a custom endpoint.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn with_endpoint(
        tokens: Arc<dyn TokenProvider>,
        endpoint: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, AuthorizationError> {
        let client = Client::builder().timeout(timeout).build()?;

        Ok(Self {
            client,
            endpoint: endpoint.into(),
            tokens,
        })
    }

    /// Endpoint this resolver calls.
    #[must_use]
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

impl std::fmt::Debug for AuthorizationResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthorizationResolver")
            .field("endpoint", &self.endpoint)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl UrlResolver for AuthorizationResolver {
    async fn resolve(&self) -> Result<String, AuthorizationError> {
        let token = self.tokens.access_token();
        if token.is_empty() {
            return Err(AuthorizationError::MissingToken);
        }

        tracing::debug!(endpoint = %self.endpoint, "Requesting feed authorization");

        let response = self
            .client
            .get(&self.endpoint)
            .header(AUTHORIZATION, format!("Bearer {token}"))
            .header(ACCEPT, "application/json")
            .send()
            .await?;

        let http_status = response.status();
        let body = response.text().await?;

        let parsed = match serde_json::from_str::<AuthorizeResponse>(&body) {
            Ok(parsed) => parsed,
            Err(_) if !http_status.is_success() => {
                return Err(AuthorizationError::Rejected {
                    status: http_status.to_string(),
                    http_status: http_status.as_u16(),
                });
            }
            Err(e) => return Err(e.into()),
        };

        if !parsed.is_success() {
            return Err(AuthorizationError::Rejected {
                status: parsed.status,
                http_status: http_status.as_u16(),
            });
        }

        parsed
            .data
            .map(|d| d.authorized_redirect_uri)
            .filter(|uri| !uri.is_empty())
            .ok_or(AuthorizationError::MissingRedirectUri)
    }
}
