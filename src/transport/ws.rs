//! WebSocket connection actor.
//!
//! Owns one accepted socket end to end: performs the WebSocket handshake,
//! then drives the read / dispatch / drain-queue cycle until the peer closes
//! or an error ends the connection.
//!
//! The central invariant is strict alternation: at most one transport
//! operation is outstanding per connection at any time, and every queued
//! response is written before the next read is issued. The actor is a plain
//! value owned by its connection task, so the task's stack frame keeps the
//! connection and its session alive exactly as long as an operation can
//! still be scheduled.

use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use futures::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::protocol::WebSocketConfig;
use tokio_tungstenite::tungstenite::{Error as WsError, Message};
use tokio_tungstenite::WebSocketStream;
use tracing::{debug, error, info, warn};

use crate::config::TransportConfig;
use crate::error::{ProtocolError, Result};
use crate::protocol::session::{ChallengeGenerator, Session};
use crate::utils::metrics::Metrics;
use crate::utils::timeout::with_timeout_error;

static NEXT_CONNECTION_ID: AtomicU64 = AtomicU64::new(0);

/// Process-unique, monotonically assigned connection id, shared with the
/// connection's session.
fn next_connection_id() -> u64 {
    NEXT_CONNECTION_ID.fetch_add(1, Ordering::Relaxed) + 1
}

/// One connection: the WebSocket transport plus its protocol session.
pub struct Connection {
    id: u64,
    peer: SocketAddr,
    ws: WebSocketStream<TcpStream>,
    session: Session,
    limits: TransportConfig,
    metrics: Arc<Metrics>,
}

impl Connection {
    /// Perform the WebSocket handshake on a freshly accepted socket and
    /// build the actor.
    ///
    /// The transport is configured before the first read: binary payloads
    /// only (checked per message), message and frame sizes capped. On
    /// handshake failure the connection is logged and dropped; no session
    /// is created.
    pub async fn accept(
        stream: TcpStream,
        transport: &TransportConfig,
        challenges: &ChallengeGenerator,
        metrics: Arc<Metrics>,
    ) -> Result<Self> {
        let peer = stream.peer_addr()?;
        let id = next_connection_id();

        info!(conn = id, peer = %peer, "connected");

        let ws_config = WebSocketConfig::default()
            .max_message_size(Some(transport.max_message_size))
            .max_frame_size(Some(transport.max_message_size));

        let ws = match tokio_tungstenite::accept_async_with_config(stream, Some(ws_config)).await
        {
            Ok(ws) => ws,
            Err(e) => {
                error!(conn = id, peer = %peer, error = %e, "accept error");
                metrics.handshake_failed();
                return Err(e.into());
            }
        };

        info!(conn = id, peer = %peer, "accepted");
        metrics.connection_established();

        let session = Session::new(id, peer, challenges, transport.outbound_queue_limit);

        Ok(Self {
            id,
            peer,
            ws,
            session,
            limits: transport.clone(),
            metrics,
        })
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn peer(&self) -> SocketAddr {
        self.peer
    }

    /// Drive the connection until the peer closes or an error ends it,
    /// then tear down. Consumes the actor; the session drops with it.
    pub async fn run(mut self) {
        if self.drive().await.is_err() {
            // Each failure site logs its own event; only count the teardown.
            self.metrics.connection_error();
        }

        self.metrics.connection_closed();
        info!(conn = self.id, peer = %self.peer, "disconnected");
    }

    /// The read / dispatch / drain cycle.
    ///
    /// Exactly one read is outstanding at a time; once a message has been
    /// handed to the session, every response it queued is written before
    /// the next read is issued. `Ok(())` means the peer ended the
    /// connection gracefully.
    async fn drive(&mut self) -> Result<()> {
        loop {
            let message =
                match tokio::time::timeout(self.limits.idle_read_timeout, self.ws.next()).await {
                    Ok(Some(Ok(message))) => message,
                    Ok(Some(Err(WsError::ConnectionClosed | WsError::AlreadyClosed)))
                    | Ok(None) => {
                        info!(conn = self.id, peer = %self.peer, "connection closed");
                        return Ok(());
                    }
                    Ok(Some(Err(e))) => {
                        error!(conn = self.id, peer = %self.peer, error = %e, "read error");
                        return Err(e.into());
                    }
                    Err(_) => {
                        warn!(conn = self.id, peer = %self.peer, "idle timeout");
                        return Err(ProtocolError::ConnectionTimeout);
                    }
                };

            match message {
                Message::Binary(data) => {
                    debug!(
                        conn = self.id,
                        peer = %self.peer,
                        size = data.len(),
                        "received message"
                    );
                    self.metrics.message_received(data.len() as u64);

                    if let Err(e) = self.session.receive(&data) {
                        error!(conn = self.id, peer = %self.peer, error = %e, "protocol error");
                        return Err(e);
                    }
                }
                Message::Text(text) => {
                    debug!(
                        conn = self.id,
                        peer = %self.peer,
                        size = text.len(),
                        "ignoring text message"
                    );
                }
                Message::Close(_) => {
                    info!(conn = self.id, peer = %self.peer, "connection closed");
                    return Ok(());
                }
                Message::Ping(payload) => {
                    // Transport housekeeping, not a protocol message.
                    self.ws.send(Message::Pong(payload)).await?;
                    continue;
                }
                Message::Pong(_) | Message::Frame(_) => continue,
            }

            self.drain_outbound().await?;
        }
    }

    /// Flush every queued response before the next read is issued.
    async fn drain_outbound(&mut self) -> Result<()> {
        let write_timeout = self.limits.write_timeout;

        while let Some(packet) = self.session.pop_outbound() {
            let bytes = packet.encode();
            let size = bytes.len() as u64;

            debug!(conn = self.id, peer = %self.peer, size, "sending message");

            let write = with_timeout_error(
                async {
                    self.ws.send(Message::Binary(bytes)).await?;
                    Ok(())
                },
                write_timeout,
            )
            .await;

            if let Err(e) = write {
                error!(conn = self.id, peer = %self.peer, error = %e, "write error");
                return Err(e);
            }

            self.metrics.message_sent(size);
        }

        Ok(())
    }
}
