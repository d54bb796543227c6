//! Domain Layer - Core feed and subscription types.
//!
//! This layer contains the public market data model and the subscription
//! registry, with no I/O.

/// Translated market data types (LTPC, full feed, greeks, market status).
pub mod feed;

/// Subscription registry and instrument/mode types.
pub mod subscription;
