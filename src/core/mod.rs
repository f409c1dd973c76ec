//! # Core Protocol Components
//!
//! Low-level packet handling and wire format.
//!
//! This module provides the foundation for the protocol: the packet type,
//! its fixed binary envelope, and the framing validation applied to every
//! inbound message.
//!
//! ## Wire Format
//! ```text
//! [ClientId(4)] [Sequence(4)] [Code(4)] [PayloadLen(4)] [Payload(N*4)]
//! ```
//!
//! All fields are little-endian. One WebSocket binary message carries
//! exactly one packet.

pub mod packet;
