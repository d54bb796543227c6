//! Message Dispatcher
//!
//! Routes translated messages to the callbacks registered by the caller.
//!
//! Each category has a single slot: registering again replaces the previous
//! callback, and a message with no callback in its slot is dropped. Callbacks
//! run on the reader task, so a slow callback delays the next frame.

use std::sync::Arc;
use std::time::Instant;

use parking_lot::RwLock;

use super::client::ConnectionEvent;
use crate::domain::feed::{LiveFeedMessage, MarketInfoMessage, TranslatedMessage};
use crate::infrastructure::metrics::{self, DispatchCategory};

type Callback<T> = Arc<dyn Fn(&T) + Send + Sync>;

/// Single-slot callback table.
pub struct Dispatcher {
    market_info: RwLock<Option<Callback<MarketInfoMessage>>>,
    live_feed: RwLock<Option<Callback<LiveFeedMessage>>>,
    connection_event: RwLock<Option<Callback<ConnectionEvent>>>,
}

impl Dispatcher {
    /// Create a dispatcher with empty slots.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            market_info: RwLock::new(None),
            live_feed: RwLock::new(None),
            connection_event: RwLock::new(None),
        }
    }

    /// Replace the market info callback.
    pub fn set_market_info<F>(&self, callback: F)
    where
        F: Fn(&MarketInfoMessage) + Send + Sync + 'static,
    {
        *self.market_info.write() = Some(Arc::new(callback));
    }

    /// Replace the live feed callback.
    pub fn set_live_feed<F>(&self, callback: F)
    where
        F: Fn(&LiveFeedMessage) + Send + Sync + 'static,
    {
        *self.live_feed.write() = Some(Arc::new(callback));
    }

    /// Replace the connection event callback.
    pub fn set_connection_event<F>(&self, callback: F)
    where
        F: Fn(&ConnectionEvent) + Send + Sync + 'static,
    {
        *self.connection_event.write() = Some(Arc::new(callback));
    }

    /// Deliver a translated message to its slot.
    ///
    /// Returns `true` if a callback received it.
    pub fn dispatch(&self, message: &TranslatedMessage) -> bool {
        match message {
            TranslatedMessage::MarketInfo(info) => {
                invoke(&self.market_info, info, DispatchCategory::MarketInfo)
            }
            TranslatedMessage::LiveFeed(feed) => {
                invoke(&self.live_feed, feed, DispatchCategory::LiveFeed)
            }
        }
    }

    /// Deliver a connection lifecycle event.
    pub fn emit(&self, event: &ConnectionEvent) -> bool {
        invoke(
            &self.connection_event,
            event,
            DispatchCategory::ConnectionEvent,
        )
    }
}

impl Default for Dispatcher {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dispatcher")
            .field("market_info", &self.market_info.read().is_some())
            .field("live_feed", &self.live_feed.read().is_some())
            .field("connection_event", &self.connection_event.read().is_some())
            .finish()
    }
}

fn invoke<T>(slot: &RwLock<Option<Callback<T>>>, value: &T, category: DispatchCategory) -> bool {
    // Clone out of the lock so a callback may re-register without deadlocking.
    let Some(callback) = slot.read().clone() else {
        return false;
    };

    let start = Instant::now();
    callback(value);
    metrics::record_dispatched(category, start.elapsed());
    true
}
