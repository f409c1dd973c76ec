//! # Protocol State Machine
//!
//! Per-connection protocol logic, layered on top of the packet codec.
//!
//! ## Components
//! - **Session**: identity, challenge secret, and the outbound response queue
//! - **ChallengeGenerator**: explicitly threaded source of session challenges

pub mod session;

pub use session::{ChallengeGenerator, Session};
