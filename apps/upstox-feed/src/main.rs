//! Upstox Feed Binary
//!
//! Connects to the Upstox market data feed, subscribes the configured
//! instruments and logs every message until interrupted.
//!
//! # Usage
//!
//! ```bash
//! cargo run --bin upstox-feed
//! ```
//!
//! # Environment Variables
//!
//! ## Required
//! - `UPSTOX_ACCESS_TOKEN`: OAuth access token
//!
//! ## Optional
//! - `UPSTOX_INSTRUMENTS`: Comma-separated instrument keys
//! - `UPSTOX_MODE`: ltpc | full | option_greeks | full_d30 (default: ltpc)
//! - `UPSTOX_FEED_URL`: Fixed feed URL dialed with a bearer header
//! - `UPSTOX_AUTHORIZE_URL`: Authorization endpoint override
//! - `FEED_HANDSHAKE_TIMEOUT_SECS`: Dial timeout (default: 10)
//! - `FEED_RECONNECT_DELAY_INITIAL_MS`: First backoff delay (default: 1000)
//! - `FEED_MAX_RECONNECT_ATTEMPTS`: Attempts before giving up (default: 3)
//! - `FEED_METRICS_PORT`: Prometheus port, 0 disables (default: 9090)
//! - `LOG_FORMAT`: pretty | json (default: pretty)
//! - `RUST_LOG`: Log filter (default: `upstox_feed=info`)

use std::net::SocketAddr;

use anyhow::Context;
use tokio::signal;
use tokio::sync::mpsc;
use upstox_feed::{
    ConnectionEvent, FeedClient, FeedClientConfig, FeedSettings, TelemetryConfig, init_telemetry,
    serve_metrics,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    if rustls::crypto::ring::default_provider()
        .install_default()
        .is_err()
    {
        anyhow::bail!("failed to install rustls crypto provider");
    }

    load_dotenv();

    let settings = FeedSettings::from_env()?;

    init_telemetry(TelemetryConfig {
        format: settings.log_format,
    });

    tracing::info!("Starting Upstox feed client");
    log_settings(&settings);

    if settings.metrics_port != 0 {
        let addr = SocketAddr::from(([0, 0, 0, 0], settings.metrics_port));
        serve_metrics(addr).context("failed to start metrics exporter")?;
        tracing::info!(addr = %addr, "Metrics exporter listening");
    }

    let endpoint = settings
        .endpoint()
        .context("failed to build feed endpoint")?;
    let client = FeedClient::new(endpoint, FeedClientConfig::from_settings(&settings));

    let (terminated_tx, mut terminated_rx) = mpsc::unbounded_channel();
    register_callbacks(&client, terminated_tx);

    if !settings.instruments.is_empty() {
        client.subscribe_with_mode(settings.mode, settings.instruments.clone())?;
    }

    client.connect().await.context("initial connect failed")?;
    tracing::info!("Feed client ready");

    tokio::select! {
        () = await_shutdown() => {}
        Some(attempts) = terminated_rx.recv() => {
            tracing::error!(attempts, "Feed gave up reconnecting");
        }
    }

    client.close();
    tracing::info!("Feed client stopped");
    Ok(())
}

fn register_callbacks(client: &FeedClient, terminated: mpsc::UnboundedSender<u32>) {
    client.on_market_info(|info| {
        for (segment, status) in &info.segment_status {
            tracing::info!(segment = %segment, status = status.as_str(), "Market status");
        }
    });

    client.on_live_feed(|feed| {
        for (key, data) in &feed.feeds {
            match data.last_traded() {
                Some(ltpc) => tracing::info!(
                    instrument = %key,
                    ltp = ltpc.ltp,
                    ltq = ltpc.ltq,
                    cp = ltpc.cp,
                    initial = feed.initial,
                    "Feed"
                ),
                None => tracing::debug!(instrument = %key, "Feed without LTPC"),
            }
        }
    });

    client.on_connection_event(move |event| match event {
        ConnectionEvent::Terminated { attempts } => {
            let _ = terminated.send(*attempts);
        }
        other => tracing::debug!(event = ?other, "Connection event"),
    });
}

/// Log the parsed configuration.
fn log_settings(settings: &FeedSettings) {
    tracing::info!(
        instruments = settings.instruments.len(),
        mode = %settings.mode,
        direct = settings.feed_url.is_some(),
        max_reconnect_attempts = settings.max_reconnect_attempts,
        reconnect_jitter = settings.reconnect_jitter,
        metrics_port = settings.metrics_port,
        "Configuration loaded"
    );
}

/// Load .env file from current directory or any ancestor directory.
fn load_dotenv() {
    if dotenvy::dotenv().is_ok() {
        return;
    }

    if let Ok(cwd) = std::env::current_dir() {
        let mut dir = cwd.as_path();
        while let Some(parent) = dir.parent() {
            let env_path = parent.join(".env");
            if env_path.exists() {
                let _ = dotenvy::from_path(&env_path);
                return;
            }
            dir = parent;
        }
    }
}

/// Wait for shutdown signal (SIGTERM or SIGINT).
async fn await_shutdown() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            tracing::info!("Received Ctrl+C, initiating shutdown");
        }
        () = terminate => {
            tracing::info!("Received SIGTERM, initiating shutdown");
        }
    }
}
