//! TCP WebSocket front end for the broker.
//! Each accepted connection gets a reader loop feeding `Broker::handle` and a writer task draining its outbound queue,
//! so a slow or dead peer never blocks delivery to the others.

use super::Broker;
use crate::utils::{ConnectionHandle, HermesError, OrError};
use crate::{hermes_error, hermes_error_cause};
use futures_util::{SinkExt, StreamExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_tungstenite::{accept_async, tungstenite::Message};
use tracing::{debug, error, info, warn};

/// Relay process: accepts WebSocket connections and routes their envelopes through one shared `Broker`.
/// Dropping the server stops accepting; connections already open keep their tasks until they close.
pub struct RelayServer {
    connection: ConnectionHandle,
    broker: Broker,
    task_handle: JoinHandle<()>,
}

impl RelayServer {
    /// Binds `host:port` and starts the accept loop. Port 0 picks a free port; see `connection()`.
    /// Error: Bind fails → propagates to caller. Per-connection errors are logged and only end that connection.
    pub async fn new(host: &str, port: u16) -> OrError<Self> {
        let listener = TcpListener::bind((host, port)).await.map_err(|e| {
            HermesError::Connect(hermes_error_cause!(
                "broker::RelayServer",
                "new",
                &format!("failed to bind relay to {}:{}", host, port),
                e
            ))
        })?;
        let local_addr = listener.local_addr().map_err(|e| {
            HermesError::Connect(hermes_error_cause!(
                "broker::RelayServer",
                "new",
                "bound listener has no local address",
                e
            ))
        })?;
        let connection = ConnectionHandle::from(local_addr);
        info!("Hermes relay listening on {}", connection);

        let broker = Broker::new();
        let accept_broker = broker.clone();

        // Accept loop: spawn per-connection handler tasks
        let task_handle = tokio::spawn(async move {
            loop {
                match listener.accept().await {
                    Ok((tcp_stream, peer_addr)) => {
                        let broker = accept_broker.clone();
                        tokio::spawn(async move {
                            if let Err(e) = handle_connection(broker, tcp_stream).await {
                                warn!("Relay connection from {} error: {}", peer_addr, e);
                            }
                        });
                    }
                    Err(e) => {
                        error!("Relay accept error: {}", e);
                    }
                }
            }
        });

        Ok(Self {
            connection,
            broker,
            task_handle,
        })
    }

    /// Runs a relay until Ctrl+C.
    /// Called by: `relay` binary
    pub async fn run_server(host: &str, port: u16) -> anyhow::Result<()> {
        let server = Self::new(host, port).await?;
        tokio::signal::ctrl_c().await?;
        info!(
            "Shutting down relay on {} with {} live connections ({} served)",
            server.connection(),
            server.broker().connection_count().await,
            server.broker().connections_served()
        );
        Ok(())
    }

    /// Address the relay is actually bound to.
    pub fn connection(&self) -> &ConnectionHandle {
        &self.connection
    }

    pub fn broker(&self) -> &Broker {
        &self.broker
    }
}

impl Drop for RelayServer {
    fn drop(&mut self) {
        self.task_handle.abort();
    }
}

// Serves one WebSocket connection until the peer closes or errors, then discards its table entry.
async fn handle_connection(broker: Broker, tcp_stream: TcpStream) -> OrError<()> {
    let ws_stream = accept_async(tcp_stream).await.map_err(|e| {
        HermesError::Channel(hermes_error_cause!(
            "broker::RelayServer",
            "handle_connection",
            "WebSocket upgrade failed",
            e
        ))
    })?;
    let (mut ws_write, mut ws_read) = ws_stream.split();

    let (outbound_tx, mut outbound_rx) = mpsc::unbounded_channel::<String>();
    let connection = broker.register(outbound_tx).await;

    // Writer: outbound queue → socket. Ends when the broker drops the queue or the peer goes away.
    let writer = tokio::spawn(async move {
        while let Some(payload) = outbound_rx.recv().await {
            if let Err(e) = ws_write.send(Message::Text(payload.into())).await {
                debug!(%connection, "send failed: {}", e);
                break;
            }
        }
    });

    let mut outcome = Ok(());
    while let Some(message) = ws_read.next().await {
        match message {
            Ok(Message::Text(text)) => {
                broker.handle(connection, text.as_str()).await;
            }
            Ok(Message::Binary(bytes)) => match std::str::from_utf8(&bytes) {
                Ok(text) => {
                    broker.handle(connection, text).await;
                }
                Err(_) => debug!(%connection, "dropping non UTF-8 binary frame"),
            },
            Ok(Message::Close(_)) => break,
            // Ping/pong frames are answered by tungstenite
            Ok(_) => {}
            Err(e) => {
                outcome = Err(HermesError::Channel(hermes_error!(
                    "broker::RelayServer",
                    "handle_connection",
                    &format!("{} read error: {}", connection, e)
                )));
                break;
            }
        }
    }

    broker.unregister(connection).await;
    writer.abort();
    outcome
}
