//! # ws-packet-server
//!
//! Asynchronous WebSocket server core for a framed binary command/response
//! protocol.
//!
//! Clients send framed command packets inside binary WebSocket messages; the
//! server validates framing, dispatches recognized commands, and returns
//! correlated response packets. Each connection is driven by a single task
//! that enforces strict alternation: one transport operation outstanding at
//! a time, with every queued response written before the next read.
//!
//! ## Components
//! - [`core::packet`]: wire format, framing validation, command codes
//! - [`protocol::session`]: per-connection state machine and response queue
//! - [`transport::ws`]: the connection actor driving the I/O cycle
//! - [`service::server`]: the accept loop constructing connection actors
//!
//! ## Example
//! ```no_run
//! use ws_packet_server::{NetworkConfig, WsServer};
//!
//! #[tokio::main]
//! async fn main() -> ws_packet_server::Result<()> {
//!     let config = NetworkConfig::default();
//!     WsServer::bind(config).await?.run().await
//! }
//! ```

pub mod config;
pub mod core;
pub mod error;
pub mod protocol;
pub mod service;
pub mod transport;
pub mod utils;

pub use config::NetworkConfig;
pub use core::packet::Packet;
pub use error::{ProtocolError, Result};
pub use protocol::session::{ChallengeGenerator, Session};
pub use service::server::WsServer;
