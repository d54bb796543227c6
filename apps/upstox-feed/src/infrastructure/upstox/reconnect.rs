//! Reconnection Policy
//!
//! Exponential backoff for feed reconnection. The first retry waits the
//! initial delay, each subsequent retry multiplies it, and once the attempt
//! budget is spent the policy yields nothing and the connection manager
//! stops for good.

use std::time::Duration;

use rand::Rng;

/// Backoff parameters for the connection manager.
#[derive(Debug, Clone)]
pub struct ReconnectConfig {
    /// Delay before the first reconnection attempt.
    pub initial_delay: Duration,
    /// Ceiling for any single delay.
    pub max_delay: Duration,
    /// Growth factor between consecutive attempts.
    pub multiplier: f64,
    /// Fraction of each delay randomized in both directions (0 disables).
    pub jitter_factor: f64,
    /// Attempts before the manager gives up (0 = unlimited).
    pub max_attempts: u32,
}

impl Default for ReconnectConfig {
    fn default() -> Self {
        Self {
            initial_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(64),
            multiplier: 2.0,
            jitter_factor: 0.0,
            max_attempts: 3,
        }
    }
}

impl ReconnectConfig {
    /// Backoff described by `FeedSettings`.
    #[must_use]
    pub fn from_settings(settings: &crate::FeedSettings) -> Self {
        Self {
            initial_delay: settings.reconnect_delay_initial,
            jitter_factor: settings.reconnect_jitter,
            max_attempts: settings.max_reconnect_attempts,
            ..Self::default()
        }
    }

    /// Un-randomized delay before the attempt at zero-based `index`.
    #[must_use]
    pub fn base_delay(&self, index: u32) -> Duration {
        let max_ms = millis(self.max_delay);
        let growth = self
            .multiplier
            .max(0.0)
            .powi(i32::try_from(index).unwrap_or(i32::MAX));

        #[allow(clippy::cast_precision_loss)]
        let scaled = (millis(self.initial_delay) as f64 * growth).round();

        #[allow(
            clippy::cast_precision_loss,
            clippy::cast_possible_truncation,
            clippy::cast_sign_loss
        )]
        let delay_ms = if scaled.is_finite() && scaled < max_ms as f64 {
            scaled as u64
        } else {
            max_ms
        };
        Duration::from_millis(delay_ms)
    }
}

/// Attempt-counting backoff state.
///
/// ```rust
/// use upstox_feed::infrastructure::upstox::reconnect::{ReconnectConfig, ReconnectPolicy};
/// use std::time::Duration;
///
/// let mut policy = ReconnectPolicy::new(ReconnectConfig::default());
///
/// assert_eq!(policy.next_delay(), Some(Duration::from_secs(1)));
/// assert_eq!(policy.next_delay(), Some(Duration::from_secs(2)));
/// assert_eq!(policy.next_delay(), Some(Duration::from_secs(4)));
/// assert_eq!(policy.next_delay(), None);
///
/// policy.reset();
/// assert_eq!(policy.attempt_count(), 0);
/// ```
#[derive(Debug)]
pub struct ReconnectPolicy {
    config: ReconnectConfig,
    attempts: u32,
}

impl ReconnectPolicy {
    /// Fresh policy with no attempts consumed.
    #[must_use]
    pub const fn new(config: ReconnectConfig) -> Self {
        Self {
            config,
            attempts: 0,
        }
    }

    /// Consume one attempt and return how long to wait before it.
    ///
    /// Returns `None` once the attempt budget is exhausted.
    #[must_use]
    pub fn next_delay(&mut self) -> Option<Duration> {
        if !self.should_retry() {
            return None;
        }
        let base = self.config.base_delay(self.attempts);
        self.attempts = self.attempts.saturating_add(1);
        Some(jittered(base, self.config.jitter_factor))
    }

    /// Forget consumed attempts after a successful connection.
    pub const fn reset(&mut self) {
        self.attempts = 0;
    }

    /// Attempts consumed since the last reset.
    #[must_use]
    pub const fn attempt_count(&self) -> u32 {
        self.attempts
    }

    /// Whether the budget allows another attempt.
    #[must_use]
    pub const fn should_retry(&self) -> bool {
        self.config.max_attempts == 0 || self.attempts < self.config.max_attempts
    }
}

fn millis(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}

/// Spread `base` uniformly over `base ± base * factor`, never below 1ms.
fn jittered(base: Duration, factor: f64) -> Duration {
    let base_ms = millis(base);

    #[allow(
        clippy::cast_precision_loss,
        clippy::cast_possible_truncation,
        clippy::cast_sign_loss
    )]
    let spread = (base_ms as f64 * factor.clamp(0.0, 1.0)).round() as u64;
    if spread == 0 {
        return base;
    }

    let low = base_ms.saturating_sub(spread).max(1);
    let high = base_ms.saturating_add(spread);
    Duration::from_millis(rand::rng().random_range(low..=high))
}
