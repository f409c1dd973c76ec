//! # Service Layer
//!
//! The listener that accepts raw sockets and hands each one to a new
//! connection actor.

pub mod server;

pub use server::WsServer;
