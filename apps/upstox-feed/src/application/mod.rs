//! Application Layer - Port definitions.
//!
//! Interfaces the connection manager consumes: token and URL providers and
//! the socket dialer.

/// Port interfaces for external systems (authorization, WebSocket).
pub mod ports;
