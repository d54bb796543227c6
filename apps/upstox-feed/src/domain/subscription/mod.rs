//! Subscription Registry
//!
//! Domain types for tracking which instruments the caller wants data for
//! and in what resolution.
//!
//! # Design
//!
//! The registry is the desired state, not the connection state:
//! - Each instrument key maps to exactly one current mode
//! - Entries survive across reconnects and are replayed after each dial
//! - Mutations return the upstream changes that must be sent when connected
//!
//! The registry itself holds no lock. The connection manager guards it
//! together with the connection handle so mutation and replay cannot
//! interleave.

use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// =============================================================================
// Types
// =============================================================================

/// Exchange-qualified instrument identifier (e.g. `NSE_EQ|INE062A01020`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct InstrumentKey(String);

impl InstrumentKey {
    /// Create a new instrument key.
    #[must_use]
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    /// Get the key as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for InstrumentKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for InstrumentKey {
    fn from(key: &str) -> Self {
        Self::new(key)
    }
}

impl From<String> for InstrumentKey {
    fn from(key: String) -> Self {
        Self(key)
    }
}

impl From<&String> for InstrumentKey {
    fn from(key: &String) -> Self {
        Self(key.clone())
    }
}

/// Data resolution requested for an instrument.
///
/// Determines which wire variant the venue emits for that instrument.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum SubscriptionMode {
    /// Last traded price, time, quantity and close.
    #[default]
    Ltpc,
    /// Full feed with five depth levels.
    Full,
    /// First level quote with option greeks.
    OptionGreeks,
    /// Full feed with thirty depth levels.
    FullD30,
}

impl SubscriptionMode {
    /// Get all subscription modes.
    #[must_use]
    pub const fn all() -> &'static [Self] {
        &[Self::Ltpc, Self::Full, Self::OptionGreeks, Self::FullD30]
    }

    /// Get the mode name used on the wire.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Ltpc => "ltpc",
            Self::Full => "full",
            Self::OptionGreeks => "option_greeks",
            Self::FullD30 => "full_d30",
        }
    }
}

impl fmt::Display for SubscriptionMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when parsing an unknown mode name.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown subscription mode: {0}")]
pub struct ParseModeError(String);

impl FromStr for SubscriptionMode {
    type Err = ParseModeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "ltpc" => Ok(Self::Ltpc),
            "full" => Ok(Self::Full),
            "option_greeks" => Ok(Self::OptionGreeks),
            "full_d30" => Ok(Self::FullD30),
            other => Err(ParseModeError(other.to_string())),
        }
    }
}

/// A registered subscription: current mode plus when it was last set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Subscription {
    /// Current desired mode.
    pub mode: SubscriptionMode,
    /// Time the mode was last set.
    pub updated_at: DateTime<Utc>,
}

/// Instrument keys grouped by mode, in mode order.
pub type ModeGroups = BTreeMap<SubscriptionMode, Vec<InstrumentKey>>;

// =============================================================================
// Subscription Registry
// =============================================================================

/// Desired subscription state, independent of any connection.
///
/// # Example
///
/// ```rust
/// use upstox_feed::domain::subscription::{InstrumentKey, SubscriptionMode, SubscriptionRegistry};
///
/// let mut registry = SubscriptionRegistry::new();
/// let key = InstrumentKey::new("NSE_EQ|X");
///
/// registry.upsert(SubscriptionMode::Ltpc, &[key.clone()]);
/// registry.change_mode(SubscriptionMode::Full, &[key.clone()]);
///
/// assert_eq!(registry.len(), 1);
/// assert_eq!(registry.mode_of(&key), Some(SubscriptionMode::Full));
/// ```
#[derive(Debug, Default, Clone)]
pub struct SubscriptionRegistry {
    entries: HashMap<InstrumentKey, Subscription>,
}

impl SubscriptionRegistry {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or overwrite entries for `keys` with `mode`.
    pub fn upsert(&mut self, mode: SubscriptionMode, keys: &[InstrumentKey]) {
        let now = Utc::now();
        for key in keys {
            self.entries.insert(
                key.clone(),
                Subscription {
                    mode,
                    updated_at: now,
                },
            );
        }
    }

    /// Update the mode of keys already registered.
    ///
    /// Returns the keys that were present (and therefore changed), in
    /// input order. Unknown keys are ignored.
    pub fn change_mode(
        &mut self,
        mode: SubscriptionMode,
        keys: &[InstrumentKey],
    ) -> Vec<InstrumentKey> {
        let now = Utc::now();
        let mut changed = Vec::new();

        for key in keys {
            if let Some(entry) = self.entries.get_mut(key) {
                entry.mode = mode;
                entry.updated_at = now;
                changed.push(key.clone());
            }
        }

        changed
    }

    /// Remove entries for `keys`.
    ///
    /// Returns the removed keys grouped by the mode they were registered
    /// with. Unknown keys are ignored.
    pub fn remove(&mut self, keys: &[InstrumentKey]) -> ModeGroups {
        let mut removed = ModeGroups::new();

        for key in keys {
            if let Some(entry) = self.entries.remove(key) {
                removed.entry(entry.mode).or_default().push(key.clone());
            }
        }

        removed
    }

    /// Get the current mode of an instrument.
    #[must_use]
    pub fn mode_of(&self, key: &InstrumentKey) -> Option<SubscriptionMode> {
        self.entries.get(key).map(|s| s.mode)
    }

    /// Get the subscription for an instrument.
    #[must_use]
    pub fn get(&self, key: &InstrumentKey) -> Option<&Subscription> {
        self.entries.get(key)
    }

    /// All registered keys grouped by mode, each group sorted.
    ///
    /// This is what gets replayed after every successful connect.
    #[must_use]
    pub fn grouped_by_mode(&self) -> ModeGroups {
        let mut groups = ModeGroups::new();
        for (key, entry) in &self.entries {
            groups.entry(entry.mode).or_default().push(key.clone());
        }
        for keys in groups.values_mut() {
            keys.sort();
        }
        groups
    }

    /// Snapshot of all entries, sorted by key.
    #[must_use]
    pub fn snapshot(&self) -> Vec<(InstrumentKey, Subscription)> {
        let mut entries: Vec<_> = self
            .entries
            .iter()
            .map(|(k, v)| (k.clone(), *v))
            .collect();
        entries.sort_by(|a, b| a.0.cmp(&b.0));
        entries
    }

    /// Number of registered instruments.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check if no instruments are registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
