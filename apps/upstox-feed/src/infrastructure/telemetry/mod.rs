//! Tracing Initialization
//!
//! Installs a `tracing-subscriber` registry with an `EnvFilter` and a fmt
//! layer, in human-readable or JSON form.
//!
//! # Environment Variables
//!
//! - `RUST_LOG`: Filter directives (default adds `upstox_feed=info`)
//! - `LOG_FORMAT`: `pretty` (default) or `json`
//!
//! # Usage
//!
//! ```ignore
//! use upstox_feed::infrastructure::telemetry;
//!
//! telemetry::init(telemetry::TelemetryConfig::from_env());
//! tracing::info!("Feed starting");
//! ```

use tracing_subscriber::EnvFilter;
use tracing_subscriber::filter::Directive;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

/// Default filter directive for this crate.
const DEFAULT_DIRECTIVE: &str = "upstox_feed=info";

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    /// Human-readable lines.
    #[default]
    Pretty,
    /// One JSON object per event.
    Json,
}

impl LogFormat {
    /// Parse format from string; unknown values select `Pretty`.
    #[must_use]
    pub fn from_str_case_insensitive(s: &str) -> Self {
        match s.trim().to_lowercase().as_str() {
            "json" => Self::Json,
            _ => Self::Pretty,
        }
    }
}

/// Telemetry configuration.
#[derive(Debug, Clone, Default)]
pub struct TelemetryConfig {
    /// Output format.
    pub format: LogFormat,
}

impl TelemetryConfig {
    /// Create configuration from environment variables.
    #[must_use]
    pub fn from_env() -> Self {
        let format = std::env::var("LOG_FORMAT")
            .map(|v| LogFormat::from_str_case_insensitive(&v))
            .unwrap_or_default();

        Self { format }
    }
}

/// Initialize the global subscriber.
///
/// Does nothing if a subscriber is already installed.
pub fn init(config: TelemetryConfig) {
    let env_filter = EnvFilter::from_default_env().add_directive(default_directive());

    let fmt_layer = tracing_subscriber::fmt::layer()
        .with_target(true)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false);

    let result = match config.format {
        LogFormat::Pretty => tracing_subscriber::registry()
            .with(env_filter)
            .with(fmt_layer)
            .try_init(),
        LogFormat::Json => tracing_subscriber::registry()
            .with(env_filter)
            .with(fmt_layer.json().flatten_event(true))
            .try_init(),
    };

    if let Err(e) = result {
        eprintln!("Tracing subscriber already installed: {e}");
    }
}

fn default_directive() -> Directive {
    DEFAULT_DIRECTIVE
        .parse()
        .unwrap_or_else(|_| Directive::from(tracing::Level::INFO))
}

// =============================================================================
// Tests
// =============================================================================
