//! WebSocket listener service.
//!
//! Binds the listen socket, accepts connections in a loop, and spawns one
//! task per connection. Accept failures are fatal to that attempt only; the
//! listener re-arms immediately and keeps accepting regardless of any single
//! connection's outcome.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

use crate::config::NetworkConfig;
use crate::error::Result;
use crate::protocol::session::ChallengeGenerator;
use crate::transport::ws::Connection;
use crate::utils::metrics::Metrics;

/// The listening half of the server: accepts sockets and constructs
/// connection actors.
pub struct WsServer {
    listener: TcpListener,
    config: NetworkConfig,
    challenges: ChallengeGenerator,
    metrics: Arc<Metrics>,
}

impl WsServer {
    /// Validate the configuration and bind the listen socket.
    pub async fn bind(config: NetworkConfig) -> Result<Self> {
        config.validate_strict()?;

        let listener = TcpListener::bind(&config.server.address).await?;
        info!(address = %config.server.address, "listening");

        Ok(Self {
            listener,
            config,
            challenges: ChallengeGenerator::from_os_entropy(),
            metrics: Arc::new(Metrics::new()),
        })
    }

    /// Replace the challenge source, e.g. with a deterministically seeded
    /// generator.
    pub fn with_challenges(mut self, challenges: ChallengeGenerator) -> Self {
        self.challenges = challenges;
        self
    }

    /// The address the server actually bound, useful when the configured
    /// port was 0.
    pub fn local_addr(&self) -> Result<SocketAddr> {
        Ok(self.listener.local_addr()?)
    }

    /// Shared handle to the server's counters.
    pub fn metrics(&self) -> Arc<Metrics> {
        Arc::clone(&self.metrics)
    }

    /// Run until CTRL+C.
    pub async fn run(self) -> Result<()> {
        let (shutdown_tx, shutdown_rx) = mpsc::channel::<()>(1);

        tokio::spawn(async move {
            if let Ok(()) = tokio::signal::ctrl_c().await {
                info!("received CTRL+C signal, shutting down");
                let _ = shutdown_tx.send(()).await;
            }
        });

        self.run_with_shutdown(shutdown_rx).await
    }

    /// Run until a message arrives on the shutdown channel, then stop
    /// accepting and wait for active connections to drain.
    pub async fn run_with_shutdown(self, mut shutdown_rx: mpsc::Receiver<()>) -> Result<()> {
        loop {
            tokio::select! {
                _ = shutdown_rx.recv() => {
                    info!("shutting down, waiting for connections to close");
                    self.await_drain().await;
                    self.metrics.log_metrics();
                    return Ok(());
                }

                accept_result = self.listener.accept() => {
                    match accept_result {
                        Ok((stream, peer)) => self.spawn_connection(stream, peer),
                        Err(e) => {
                            error!(error = %e, "accept error");
                        }
                    }
                }
            }
        }
    }

    fn spawn_connection(&self, stream: TcpStream, peer: SocketAddr) {
        let active = self.metrics.active_connections();
        if active >= self.config.server.max_connections as u64 {
            warn!(peer = %peer, active, "connection limit reached, refusing connection");
            return;
        }

        let transport = self.config.transport.clone();
        let challenges = self.challenges.clone();
        let metrics = Arc::clone(&self.metrics);

        tokio::spawn(async move {
            // Handshake failures are logged and counted inside accept().
            if let Ok(connection) =
                Connection::accept(stream, &transport, &challenges, metrics).await
            {
                connection.run().await;
            }
        });
    }

    /// Wait for active connections to finish, bounded by the configured
    /// shutdown timeout.
    async fn await_drain(&self) {
        let timeout = tokio::time::sleep(self.config.server.shutdown_timeout);
        tokio::pin!(timeout);

        loop {
            tokio::select! {
                _ = &mut timeout => {
                    warn!("shutdown timeout reached, forcing exit");
                    return;
                }

                _ = tokio::time::sleep(Duration::from_millis(100)) => {
                    let active = self.metrics.active_connections();
                    if active == 0 {
                        info!("all connections closed");
                        return;
                    }
                    debug!(connections = active, "waiting for connections to close");
                }
            }
        }
    }
}
