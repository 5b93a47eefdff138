#![allow(dead_code)]

use hermes::transport::{Channel, Connector, WsChannel, WsConnector};
use hermes::{ConnectionHandle, Envelope, HermesError, OrError, RelayServer};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::io::copy_bidirectional;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::timeout;

/// How long a test waits for something that should happen.
pub const PATIENCE: Duration = Duration::from_secs(2);

/// How long a test waits to be sure something does not happen.
pub const QUIET: Duration = Duration::from_millis(200);

/// Relay on a free localhost port.
pub async fn start_relay() -> RelayServer {
    RelayServer::new("127.0.0.1", 0)
        .await
        .expect("relay should bind a free port")
}

/// Raw WebSocket connection to the relay, standing in for an agent or a hand-driven client.
pub async fn ws_client(relay: &RelayServer) -> WsChannel {
    WsConnector::new(relay.connection())
        .connect()
        .await
        .expect("client should connect to the relay")
}

/// Sends one envelope and waits for the relay's answer to it.
pub async fn round_trip<C: Channel>(channel: &mut C, envelope: Envelope) -> Envelope {
    channel
        .send(envelope.encode())
        .await
        .expect("send should succeed");
    next_envelope(channel).await
}

pub async fn next_envelope<C: Channel>(channel: &mut C) -> Envelope {
    let raw = timeout(PATIENCE, channel.receive())
        .await
        .expect("timed out waiting for an envelope")
        .expect("channel should stay open");
    Envelope::decode(&raw).expect("relay should only send valid envelopes")
}

/// True if nothing arrives within `QUIET`.
pub async fn stays_quiet<C: Channel>(channel: &mut C) -> bool {
    timeout(QUIET, channel.receive()).await.is_err()
}

/// Relay side of one in-memory connection.
pub struct RemoteEnd {
    from_session: mpsc::UnboundedReceiver<String>,
    to_session: mpsc::UnboundedSender<String>,
}

impl RemoteEnd {
    /// Next envelope the session transmitted.
    pub async fn next_envelope(&mut self) -> Envelope {
        let raw = timeout(PATIENCE, self.from_session.recv())
            .await
            .expect("timed out waiting for the session to send")
            .expect("session side dropped the connection");
        Envelope::decode(&raw).expect("session should only send valid envelopes")
    }

    pub async fn stays_quiet(&mut self) -> bool {
        timeout(QUIET, self.from_session.recv()).await.is_err()
    }

    pub fn send(&self, envelope: Envelope) {
        self.to_session
            .send(envelope.encode())
            .expect("session side dropped the connection");
    }

    pub fn send_raw(&self, raw: &str) {
        self.to_session
            .send(raw.to_string())
            .expect("session side dropped the connection");
    }
}

/// Test double for the relay: hands out the remote end of every connection a session opens.
pub struct MemoryRelay {
    accepted: mpsc::UnboundedReceiver<RemoteEnd>,
}

impl MemoryRelay {
    pub async fn accept(&mut self) -> RemoteEnd {
        timeout(PATIENCE, self.accepted.recv())
            .await
            .expect("timed out waiting for the session to connect")
            .expect("connector dropped")
    }

    /// True if the session does not open another connection within `QUIET`.
    pub async fn no_more_connections(&mut self) -> bool {
        !matches!(timeout(QUIET, self.accepted.recv()).await, Ok(Some(_)))
    }
}

#[derive(Debug, Clone)]
pub struct MemoryConnector {
    accept: mpsc::UnboundedSender<RemoteEnd>,
    // Time every connect attempt takes before it succeeds
    delay: Duration,
}

pub fn memory_relay() -> (MemoryConnector, MemoryRelay) {
    memory_relay_with_delay(Duration::ZERO)
}

/// In-memory relay whose connections take `delay` to establish.
pub fn memory_relay_with_delay(delay: Duration) -> (MemoryConnector, MemoryRelay) {
    let (accept, accepted) = mpsc::unbounded_channel();
    (MemoryConnector { accept, delay }, MemoryRelay { accepted })
}

pub struct MemoryChannel {
    outgoing: mpsc::UnboundedSender<String>,
    incoming: mpsc::UnboundedReceiver<String>,
}

impl Channel for MemoryChannel {
    async fn send(&mut self, payload: String) -> OrError<()> {
        self.outgoing
            .send(payload)
            .map_err(|_| HermesError::ChannelClosed)
    }

    async fn receive(&mut self) -> OrError<String> {
        self.incoming.recv().await.ok_or(HermesError::ChannelClosed)
    }

    async fn close(&mut self) -> OrError<()> {
        self.incoming.close();
        Ok(())
    }
}

impl Connector for MemoryConnector {
    type Channel = MemoryChannel;

    async fn connect(&self) -> OrError<MemoryChannel> {
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        let (outgoing, from_session) = mpsc::unbounded_channel();
        let (to_session, incoming) = mpsc::unbounded_channel();
        self.accept
            .send(RemoteEnd {
                from_session,
                to_session,
            })
            .map_err(|_| HermesError::Connect("memory relay is gone".to_string()))?;
        Ok(MemoryChannel { outgoing, incoming })
    }
}

/// TCP forwarder in front of a relay. `cut()` drops every live link, which both ends see as a lost connection.
pub struct TcpProxy {
    connection: ConnectionHandle,
    links: Arc<Mutex<Vec<JoinHandle<()>>>>,
    accept_task: JoinHandle<()>,
}

impl TcpProxy {
    pub async fn start(target: &ConnectionHandle) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("proxy should bind a free port");
        let connection = ConnectionHandle::from(listener.local_addr().unwrap());
        let target = target.to_string();
        let links = Arc::new(Mutex::new(Vec::new()));
        let accepted = Arc::clone(&links);

        let accept_task = tokio::spawn(async move {
            while let Ok((mut inbound, _)) = listener.accept().await {
                let target = target.clone();
                let link = tokio::spawn(async move {
                    if let Ok(mut outbound) = TcpStream::connect(target.as_str()).await {
                        let _ = copy_bidirectional(&mut inbound, &mut outbound).await;
                    }
                });
                accepted.lock().unwrap().push(link);
            }
        });

        Self {
            connection,
            links,
            accept_task,
        }
    }

    pub fn connection(&self) -> &ConnectionHandle {
        &self.connection
    }

    pub fn cut(&self) {
        for link in self.links.lock().unwrap().drain(..) {
            link.abort();
        }
    }
}

impl Drop for TcpProxy {
    fn drop(&mut self) {
        self.accept_task.abort();
        self.cut();
    }
}
