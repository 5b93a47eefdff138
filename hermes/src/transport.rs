//! Transport boundary consumed by sessions and agents: something that opens a duplex text channel to the relay.
//! `WsConnector`/`WsChannel` implement it over `tokio-tungstenite`; tests plug in in-memory channels.

use crate::utils::OrError;
use std::future::Future;

mod websocket;
pub use websocket::{WsChannel, WsConnector};

/// One open duplex message channel. Every method may fail with a transport error.
pub trait Channel: Send + 'static {
    fn send(&mut self, payload: String) -> impl Future<Output = OrError<()>> + Send;

    /// Next inbound payload. `HermesError::ChannelClosed` once the remote side is gone.
    fn receive(&mut self) -> impl Future<Output = OrError<String>> + Send;

    fn close(&mut self) -> impl Future<Output = OrError<()>> + Send;
}

/// Opens channels to a fixed relay address. Called again for every reconnection attempt.
pub trait Connector: Send + Sync + 'static {
    type Channel: Channel;

    fn connect(&self) -> impl Future<Output = OrError<Self::Channel>> + Send;
}
