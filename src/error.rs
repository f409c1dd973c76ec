//! # Error Types
//!
//! Error handling for the packet protocol server.
//!
//! This module defines all error variants that can occur while serving
//! connections, from low-level I/O failures to protocol framing violations.
//!
//! ## Error Categories
//! - **I/O Errors**: Socket and accept failures
//! - **Transport Errors**: WebSocket handshake, read, and write failures
//! - **Framing Errors**: Packets violating the wire-format invariants
//! - **Resource Errors**: Timeouts and queue capacity violations
//!
//! Framing errors are recoverable: the offending packet is discarded and the
//! connection continues. Everything else is fatal to the connection that
//! raised it, and only to that connection.

use std::io;
use thiserror::Error;
use tokio_tungstenite::tungstenite;

/// Primary error type for all protocol operations
#[derive(Error, Debug)]
pub enum ProtocolError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("websocket error: {0}")]
    WebSocket(#[from] tungstenite::Error),

    #[error("packet too short: {0} bytes")]
    TruncatedPacket(usize),

    #[error("packet size {0} is not a multiple of 4")]
    MisalignedPacket(usize),

    #[error("declared payload length {declared} does not match actual length {actual}")]
    PayloadLengthMismatch { declared: u32, actual: u32 },

    #[error("outbound queue full ({0} packets)")]
    QueueOverflow(usize),

    #[error("operation timed out")]
    Timeout,

    #[error("connection timed out (no activity)")]
    ConnectionTimeout,

    #[error("configuration error: {0}")]
    ConfigError(String),
}

impl ProtocolError {
    /// Whether this error is a framing violation that is handled by
    /// discarding the packet rather than closing the connection.
    pub fn is_malformed(&self) -> bool {
        matches!(
            self,
            ProtocolError::TruncatedPacket(_)
                | ProtocolError::MisalignedPacket(_)
                | ProtocolError::PayloadLengthMismatch { .. }
        )
    }
}

/// Type alias for Results using ProtocolError
pub type Result<T> = std::result::Result<T, ProtocolError>;
