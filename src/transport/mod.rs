//! # Transport Layer
//!
//! WebSocket connection handling.
//!
//! One [`ws::Connection`] owns one accepted socket for its whole lifetime:
//! the WebSocket handshake, the strict read/dispatch/write cycle, and
//! teardown. Connections never share state with each other.

pub mod ws;

pub use ws::Connection;
