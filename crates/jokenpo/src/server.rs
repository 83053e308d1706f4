//! `JokenpoServer` builder and server loop.
//!
//! This is the entry point for running a match server. It ties the layers
//! together: transport → protocol → hub and rooms.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;

use jokenpo_protocol::JsonCodec;
use jokenpo_room::Hub;
use jokenpo_transport::{Transport, WebSocketTransport};

use crate::JokenpoError;
use crate::config::ServerConfig;
use crate::handler::handle_connection;
use crate::lobby::Lobby;
use crate::provision::RoomProvisioner;

/// Shared server state passed to each connection handler task.
pub(crate) struct ServerState {
    pub(crate) hub: Arc<Hub>,
    pub(crate) provisioner: RoomProvisioner,
    pub(crate) lobby: Arc<Lobby>,
    pub(crate) codec: JsonCodec,
    pub(crate) config: ServerConfig,
    /// Reference point for `server_time` in heartbeat replies.
    pub(crate) started: Instant,
}

/// Builder for configuring and starting a Jokenpo server.
///
/// # Example
///
/// ```rust,no_run
/// # async fn run() -> Result<(), jokenpo::JokenpoError> {
/// use clap::Parser;
/// use jokenpo::{JokenpoServer, ServerConfig};
///
/// let server = JokenpoServer::builder()
///     .config(ServerConfig::parse())
///     .bind("127.0.0.1:8081")
///     .build()
///     .await?;
/// server.run().await
/// # }
/// ```
#[derive(Debug, Clone, Default)]
pub struct JokenpoServerBuilder {
    config: ServerConfig,
}

impl JokenpoServerBuilder {
    /// Creates a new builder with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the whole configuration.
    pub fn config(mut self, config: ServerConfig) -> Self {
        self.config = config;
        self
    }

    /// Sets the address to bind the server to.
    pub fn bind(mut self, addr: &str) -> Self {
        self.config.bind_addr = addr.to_string();
        self
    }

    /// Sets the admin token that guards room provisioning.
    pub fn admin_token(mut self, token: impl Into<String>) -> Self {
        self.config.admin_token = Some(token.into());
        self
    }

    /// Binds the listener and assembles the server state.
    pub async fn build(self) -> Result<JokenpoServer, JokenpoError> {
        let transport = WebSocketTransport::bind(&self.config.bind_addr).await?;

        let hub = Arc::new(Hub::new());
        let provisioner = RoomProvisioner::new(
            Arc::clone(&hub),
            self.config.finished_grace,
            self.config.room_ttl,
        );
        let state = Arc::new(ServerState {
            hub,
            provisioner,
            lobby: Arc::new(Lobby::default()),
            codec: JsonCodec,
            config: self.config,
            started: Instant::now(),
        });

        Ok(JokenpoServer { transport, state })
    }
}

/// A bound Jokenpo server.
///
/// Call [`run()`](Self::run) to start accepting connections.
pub struct JokenpoServer {
    transport: WebSocketTransport,
    state: Arc<ServerState>,
}

impl JokenpoServer {
    /// Creates a new builder.
    pub fn builder() -> JokenpoServerBuilder {
        JokenpoServerBuilder::new()
    }

    /// Returns the local address the server is bound to.
    pub fn local_addr(&self) -> Result<SocketAddr, JokenpoError> {
        Ok(self.transport.local_addr()?)
    }

    /// The registry of live rooms.
    pub fn hub(&self) -> Arc<Hub> {
        Arc::clone(&self.state.hub)
    }

    /// Provisions rooms in-process, without going through the admin
    /// messages.
    pub fn provisioner(&self) -> &RoomProvisioner {
        &self.state.provisioner
    }

    /// Runs the accept loop, spawning a handler task per connection.
    ///
    /// Runs until the process is terminated.
    pub async fn run(mut self) -> Result<(), JokenpoError> {
        tracing::info!(
            addr = %self.local_addr()?,
            provisioning = self.state.config.admin_token().is_some(),
            "Jokenpo server running"
        );

        loop {
            match self.transport.accept().await {
                Ok(conn) => {
                    let state = Arc::clone(&self.state);
                    tokio::spawn(async move {
                        if let Err(e) = handle_connection(conn, state).await {
                            tracing::debug!(error = %e, "connection ended with error");
                        }
                    });
                }
                Err(e) => {
                    tracing::error!(error = %e, "accept failed");
                }
            }
        }
    }
}
