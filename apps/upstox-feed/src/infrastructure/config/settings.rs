//! Feed Configuration Settings
//!
//! Settings for the feed binary, loaded from environment variables.

use std::sync::Arc;
use std::time::Duration;

use crate::application::ports::{AuthorizationError, StaticToken};
use crate::domain::subscription::{InstrumentKey, SubscriptionMode};
use crate::infrastructure::telemetry::LogFormat;
use crate::infrastructure::upstox::auth::{
    AUTHORIZE_TIMEOUT, AuthorizationResolver, DEFAULT_AUTHORIZE_URL,
};
use crate::infrastructure::upstox::client::FeedEndpoint;

/// Complete feed binary configuration.
#[derive(Clone)]
pub struct FeedSettings {
    /// Bearer token for authorization and direct dials.
    pub access_token: String,
    /// Fixed feed URL; when set, dialed directly with a bearer header.
    pub feed_url: Option<String>,
    /// Authorization endpoint used when no fixed URL is set.
    pub authorize_url: String,
    /// Instruments to subscribe at startup.
    pub instruments: Vec<InstrumentKey>,
    /// Mode for the startup subscription.
    pub mode: SubscriptionMode,
    /// Dial handshake timeout.
    pub handshake_timeout: Duration,
    /// Delay before the first reconnection attempt.
    pub reconnect_delay_initial: Duration,
    /// Reconnection attempts before giving up (0 = unlimited).
    pub max_reconnect_attempts: u32,
    /// Randomization applied to each reconnect delay, as a fraction in `[0, 1]`.
    pub reconnect_jitter: f64,
    /// Prometheus exporter port (0 = disabled).
    pub metrics_port: u16,
    /// Log output format.
    pub log_format: LogFormat,
}

impl Default for FeedSettings {
    fn default() -> Self {
        Self {
            access_token: String::new(),
            feed_url: None,
            authorize_url: DEFAULT_AUTHORIZE_URL.to_string(),
            instruments: Vec::new(),
            mode: SubscriptionMode::default(),
            handshake_timeout: Duration::from_secs(10),
            reconnect_delay_initial: Duration::from_secs(1),
            max_reconnect_attempts: 3,
            reconnect_jitter: 0.0,
            metrics_port: 9090,
            log_format: LogFormat::default(),
        }
    }
}

impl FeedSettings {
    /// Create configuration from environment variables.
    ///
    /// # Errors
    ///
    /// Returns an error if `UPSTOX_ACCESS_TOKEN` is missing or empty, if
    /// `UPSTOX_MODE` is not a known mode, or if `FEED_RECONNECT_JITTER` is not
    /// a fraction between 0 and 1.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Create configuration from an arbitrary key lookup.
    ///
    /// # Errors
    ///
    /// Same as [`FeedSettings::from_env`].
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        let access_token = lookup("UPSTOX_ACCESS_TOKEN")
            .ok_or_else(|| ConfigError::MissingEnvVar("UPSTOX_ACCESS_TOKEN".to_string()))?;
        if access_token.trim().is_empty() {
            return Err(ConfigError::EmptyValue("UPSTOX_ACCESS_TOKEN".to_string()));
        }

        let feed_url = lookup("UPSTOX_FEED_URL").filter(|v| !v.trim().is_empty());

        let authorize_url = lookup("UPSTOX_AUTHORIZE_URL")
            .filter(|v| !v.trim().is_empty())
            .unwrap_or(defaults.authorize_url);

        let instruments = lookup("UPSTOX_INSTRUMENTS")
            .map(|v| parse_instruments(&v))
            .unwrap_or_default();

        let mode = match lookup("UPSTOX_MODE") {
            Some(v) => v.parse().map_err(|_| ConfigError::InvalidValue {
                key: "UPSTOX_MODE".to_string(),
                value: v,
            })?,
            None => defaults.mode,
        };

        let reconnect_jitter = match lookup("FEED_RECONNECT_JITTER") {
            Some(v) => parse_fraction(&v).ok_or_else(|| ConfigError::InvalidValue {
                key: "FEED_RECONNECT_JITTER".to_string(),
                value: v,
            })?,
            None => defaults.reconnect_jitter,
        };

        let log_format = lookup("LOG_FORMAT")
            .map(|v| LogFormat::from_str_case_insensitive(&v))
            .unwrap_or_default();

        Ok(Self {
            access_token,
            feed_url,
            authorize_url,
            instruments,
            mode,
            handshake_timeout: parse_duration_secs(
                &lookup,
                "FEED_HANDSHAKE_TIMEOUT_SECS",
                defaults.handshake_timeout,
            ),
            reconnect_delay_initial: parse_duration_millis(
                &lookup,
                "FEED_RECONNECT_DELAY_INITIAL_MS",
                defaults.reconnect_delay_initial,
            ),
            max_reconnect_attempts: parse_or(
                &lookup,
                "FEED_MAX_RECONNECT_ATTEMPTS",
                defaults.max_reconnect_attempts,
            ),
            reconnect_jitter,
            metrics_port: parse_or(&lookup, "FEED_METRICS_PORT", defaults.metrics_port),
            log_format,
        })
    }

    /// Build the feed endpoint these settings describe.
    ///
    /// # Errors
    ///
    /// Returns an error if the authorization HTTP client cannot be built.
    pub fn endpoint(&self) -> Result<FeedEndpoint, AuthorizationError> {
        let tokens = Arc::new(StaticToken::new(self.access_token.clone()));

        if let Some(url) = &self.feed_url {
            return Ok(FeedEndpoint::Direct {
                url: url.clone(),
                tokens,
            });
        }

        let resolver =
            AuthorizationResolver::with_endpoint(tokens, &self.authorize_url, AUTHORIZE_TIMEOUT)?;
        Ok(FeedEndpoint::Authorized(Arc::new(resolver)))
    }
}

impl std::fmt::Debug for FeedSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FeedSettings")
            .field("access_token", &"[REDACTED]")
            .field("feed_url", &self.feed_url)
            .field("authorize_url", &self.authorize_url)
            .field("instruments", &self.instruments)
            .field("mode", &self.mode)
            .field("handshake_timeout", &self.handshake_timeout)
            .field("reconnect_delay_initial", &self.reconnect_delay_initial)
            .field("max_reconnect_attempts", &self.max_reconnect_attempts)
            .field("reconnect_jitter", &self.reconnect_jitter)
            .field("metrics_port", &self.metrics_port)
            .field("log_format", &self.log_format)
            .finish()
    }
}

/// Configuration error.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Required environment variable is missing.
    #[error("missing required environment variable: {0}")]
    MissingEnvVar(String),
    /// Environment variable has empty value.
    #[error("environment variable {0} cannot be empty")]
    EmptyValue(String),
    /// Environment variable has a value that cannot be parsed.
    #[error("invalid value for {key}: {value}")]
    InvalidValue {
        /// Variable name.
        key: String,
        /// Rejected value.
        value: String,
    },
}

fn parse_instruments(value: &str) -> Vec<InstrumentKey> {
    value
        .split(',')
        .map(str::trim)
        .filter(|key| !key.is_empty())
        .map(InstrumentKey::from)
        .collect()
}

fn parse_fraction(value: &str) -> Option<f64> {
    value
        .trim()
        .parse::<f64>()
        .ok()
        .filter(|f| (0.0..=1.0).contains(f))
}

fn parse_or<F, T>(lookup: &F, key: &str, default: T) -> T
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
{
    lookup(key)
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(default)
}

fn parse_duration_secs<F>(lookup: &F, key: &str, default: Duration) -> Duration
where
    F: Fn(&str) -> Option<String>,
{
    lookup(key)
        .and_then(|v| v.trim().parse::<u64>().ok())
        .map_or(default, Duration::from_secs)
}

fn parse_duration_millis<F>(lookup: &F, key: &str, default: Duration) -> Duration
where
    F: Fn(&str) -> Option<String>,
{
    lookup(key)
        .and_then(|v| v.trim().parse::<u64>().ok())
        .map_or(default, Duration::from_millis)
}
