//! Per-connection protocol session.
//!
//! A session validates inbound packets, dispatches recognized commands, and
//! queues the correlated responses for the connection actor to drain. It is
//! created together with its connection and dropped with it; nothing
//! survives a reconnect.
//!
//! The protocol is closed: two commands, exactly one response queued per
//! received request. Extending it means adding new `code` branches to
//! [`Session::receive`] with the same echo-and-respond contract.

use std::collections::VecDeque;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex, PoisonError};

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::{debug, warn};

use crate::core::packet::{
    Packet, CMD_GET_CHALLENGE, RESPONSE_CHALLENGE, RESPONSE_UNKNOWN_PACKET,
};
use crate::error::{ProtocolError, Result};

/// Source of per-session challenge secrets.
///
/// Constructed once at startup and handed to the listener, which threads it
/// into each new session. Seeding it explicitly makes challenge values
/// deterministic for tests; production servers seed from OS entropy.
#[derive(Debug, Clone)]
pub struct ChallengeGenerator {
    rng: Arc<Mutex<StdRng>>,
}

impl ChallengeGenerator {
    /// Generator seeded from operating-system entropy.
    pub fn from_os_entropy() -> Self {
        Self {
            rng: Arc::new(Mutex::new(StdRng::from_os_rng())),
        }
    }

    /// Deterministically seeded generator.
    pub fn seeded(seed: u64) -> Self {
        Self {
            rng: Arc::new(Mutex::new(StdRng::seed_from_u64(seed))),
        }
    }

    /// Draw the next 64-bit challenge.
    pub fn next_challenge(&self) -> u64 {
        // A poisoned lock cannot corrupt the generator state we care about.
        let mut rng = self.rng.lock().unwrap_or_else(PoisonError::into_inner);
        rng.random()
    }
}

/// Per-connection protocol state: identity, challenge secret, and the
/// outbound response queue.
#[derive(Debug)]
pub struct Session {
    id: u64,
    peer: SocketAddr,
    challenge: u64,
    outbound: VecDeque<Packet>,
    queue_limit: usize,
}

impl Session {
    /// Create the session for a freshly accepted connection.
    ///
    /// The challenge is drawn once here and never changes for the lifetime
    /// of the session.
    pub fn new(
        id: u64,
        peer: SocketAddr,
        challenges: &ChallengeGenerator,
        queue_limit: usize,
    ) -> Self {
        Self {
            id,
            peer,
            challenge: challenges.next_challenge(),
            outbound: VecDeque::new(),
            queue_limit,
        }
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn peer(&self) -> SocketAddr {
        self.peer
    }

    /// The session's fixed 64-bit challenge.
    pub fn challenge(&self) -> u64 {
        self.challenge
    }

    /// Validate and dispatch the bytes of one inbound transport message.
    ///
    /// Malformed packets are logged and discarded without queueing a
    /// response; the connection continues normally. A recognized command
    /// queues exactly one response, as does an unrecognized one (the
    /// unknown-packet reply). The only fatal outcome is an outbound queue
    /// at capacity.
    pub fn receive(&mut self, bytes: &[u8]) -> Result<()> {
        let packet = match Packet::decode(bytes) {
            Ok(packet) => packet,
            Err(e) if e.is_malformed() => {
                warn!(
                    conn = self.id,
                    peer = %self.peer,
                    size = bytes.len(),
                    error = %e,
                    "discarded bad packet"
                );
                return Ok(());
            }
            Err(e) => return Err(e),
        };

        match packet.code {
            CMD_GET_CHALLENGE => self.cmd_get_challenge(&packet),
            _ => self.respond_unknown_packet(&packet),
        }
    }

    /// Remove and return the oldest queued response, if any.
    pub fn pop_outbound(&mut self) -> Option<Packet> {
        self.outbound.pop_front()
    }

    fn cmd_get_challenge(&mut self, request: &Packet) -> Result<()> {
        debug!(
            conn = self.id,
            peer = %self.peer,
            sequence = request.sequence,
            "challenge requested"
        );

        // Low word first, high word second.
        let data = [self.challenge as u32, (self.challenge >> 32) as u32];
        self.respond(request, RESPONSE_CHALLENGE, &data)
    }

    fn respond_unknown_packet(&mut self, request: &Packet) -> Result<()> {
        debug!(
            conn = self.id,
            peer = %self.peer,
            code = request.code,
            "unknown packet code"
        );

        self.respond(request, RESPONSE_UNKNOWN_PACKET, &[request.code as u32])
    }

    fn respond(&mut self, request: &Packet, code: i32, data: &[u32]) -> Result<()> {
        if self.outbound.len() >= self.queue_limit {
            return Err(ProtocolError::QueueOverflow(self.queue_limit));
        }

        self.outbound.push_back(Packet::new(
            request.client_id,
            request.sequence,
            code,
            data.to_vec(),
        ));

        Ok(())
    }
}
