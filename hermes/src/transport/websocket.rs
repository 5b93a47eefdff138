use super::{Channel, Connector};
use crate::hermes_error_cause;
use crate::utils::{ConnectionHandle, HermesError, OrError};
use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::{self, Message};
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};
use tracing::debug;

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Connects to `ws://host:port` of a relay.
#[derive(Debug, Clone)]
pub struct WsConnector {
    url: String,
}

impl WsConnector {
    pub fn new(relay: &ConnectionHandle) -> Self {
        Self {
            url: relay.ws_url(),
        }
    }

    pub fn from_url(url: impl Into<String>) -> Self {
        Self { url: url.into() }
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

impl Connector for WsConnector {
    type Channel = WsChannel;

    async fn connect(&self) -> OrError<WsChannel> {
        let (ws_stream, _) = connect_async(self.url.as_str()).await.map_err(|e| {
            HermesError::Connect(hermes_error_cause!(
                "transport::WsConnector",
                "connect",
                &format!("failed to connect to {}", self.url),
                e
            ))
        })?;
        debug!("connected to {}", self.url);
        Ok(WsChannel { ws_stream })
    }
}

/// Text-frame channel over one WebSocket connection.
pub struct WsChannel {
    ws_stream: WsStream,
}

impl Channel for WsChannel {
    async fn send(&mut self, payload: String) -> OrError<()> {
        self.ws_stream
            .send(Message::Text(payload.into()))
            .await
            .map_err(channel_error)
    }

    async fn receive(&mut self) -> OrError<String> {
        loop {
            match self.ws_stream.next().await {
                Some(Ok(Message::Text(text))) => return Ok(text.as_str().to_owned()),
                Some(Ok(Message::Binary(bytes))) => match String::from_utf8(bytes.to_vec()) {
                    Ok(text) => return Ok(text),
                    Err(_) => debug!("dropping non UTF-8 binary frame"),
                },
                Some(Ok(Message::Close(_))) | None => return Err(HermesError::ChannelClosed),
                // Ping/pong frames are answered by tungstenite
                Some(Ok(_)) => {}
                Some(Err(e)) => return Err(channel_error(e)),
            }
        }
    }

    async fn close(&mut self) -> OrError<()> {
        match self.ws_stream.close(None).await {
            Ok(()) => Ok(()),
            Err(e) => match channel_error(e) {
                HermesError::ChannelClosed => Ok(()),
                other => Err(other),
            },
        }
    }
}

fn channel_error(e: tungstenite::Error) -> HermesError {
    match e {
        tungstenite::Error::ConnectionClosed | tungstenite::Error::AlreadyClosed => {
            HermesError::ChannelClosed
        }
        other => HermesError::Channel(other.to_string()),
    }
}
