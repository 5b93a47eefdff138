//! Relay broker: one subscription table shared by every connection, and the routing decision for each inbound payload.
//! `Broker` is transport-agnostic (connections are outbound queues); `RelayServer` feeds it from WebSocket connections.

mod router;
pub use router::{Broker, Route};

mod server;
pub use server::RelayServer;

mod table;
pub use table::{ConnectionId, SubscriptionTable};
