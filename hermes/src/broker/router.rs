//! Routing engine: decodes each payload, applies its table mutation and delivers the result.
//! `Broker` holds one `BrokerState` behind a `RwLock`: mutations take the write lock, fan-out and queries the read lock,
//! so a broadcast never observes a half-updated set.

use super::table::{ConnectionId, SubscriptionTable};
use crate::protocol::{Envelope, SensorId};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::{RwLock, mpsc};
use tracing::{debug, info, warn};

/// Outbound queue of one connection. Drained by that connection's writer task.
pub type Outbound = mpsc::UnboundedSender<String>;

/// What the broker did with one inbound payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Route {
    /// Payload sent back to the sender only (raw echo or generated answer).
    Reply(String),
    /// Raw payload forwarded unchanged to these connections.
    FanOut(Vec<ConnectionId>),
    /// Malformed payload: no reply, no table change.
    Dropped,
}

#[derive(Debug, Default)]
struct BrokerState {
    table: SubscriptionTable,
    connections: HashMap<ConnectionId, Outbound>,
}

impl BrokerState {
    // Each target is sent to independently; a closed outbound never stops the others.
    fn deliver(&self, sender: ConnectionId, route: &Route, raw: &str) {
        match route {
            Route::Reply(payload) => self.send_to(sender, payload.clone()),
            Route::FanOut(targets) => {
                for target in targets {
                    self.send_to(*target, raw.to_string());
                }
            }
            Route::Dropped => {}
        }
    }

    fn send_to(&self, connection: ConnectionId, payload: String) {
        match self.connections.get(&connection) {
            Some(outbound) => {
                if outbound.send(payload).is_err() {
                    warn!(%connection, "outbound queue closed, skipping delivery");
                }
            }
            None => debug!(%connection, "no outbound queue for connection"),
        }
    }
}

/// Shared subscription-routing engine. Cheap to clone; all clones share one table.
#[derive(Debug, Clone, Default)]
pub struct Broker {
    state: Arc<RwLock<BrokerState>>,
    next_id: Arc<AtomicU64>,
}

impl Broker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Tracks a new connection. It has no subscriptions until it asks for some.
    pub async fn register(&self, outbound: Outbound) -> ConnectionId {
        let connection = ConnectionId::new(self.next_id.fetch_add(1, Ordering::Relaxed));
        let mut state = self.state.write().await;
        state.connections.insert(connection, outbound);
        info!(%connection, live = state.connections.len(), "connection registered");
        connection
    }

    /// Forgets a closed connection and its subscriptions. Other parties are not notified.
    pub async fn unregister(&self, connection: ConnectionId) {
        let mut state = self.state.write().await;
        state.connections.remove(&connection);
        let dropped = state.table.discard(connection);
        info!(
            %connection,
            subscriptions = dropped.map_or(0, |sensors| sensors.len()),
            live = state.connections.len(),
            "connection unregistered"
        );
    }

    /// Routes one raw payload from `sender` and performs the resulting sends.
    /// Called by: `RelayServer` connection reader for every text frame.
    pub async fn handle(&self, sender: ConnectionId, raw: &str) -> Route {
        let envelope = match Envelope::decode(raw) {
            Ok(envelope) => envelope,
            Err(e) => {
                debug!(%sender, error = %e, "dropping malformed payload");
                return Route::Dropped;
            }
        };

        let route = if mutates_table(&envelope) {
            let mut state = self.state.write().await;
            apply(&mut state.table, sender, &envelope);
            let route = decide(&state.table, sender, raw, &envelope);
            state.deliver(sender, &route, raw);
            route
        } else {
            let state = self.state.read().await;
            let route = decide(&state.table, sender, raw, &envelope);
            state.deliver(sender, &route, raw);
            route
        };
        debug!(%sender, event = envelope.event(), ?route, "routed");
        route
    }

    /// Snapshot of the connection's subscription set.
    pub async fn subscriptions(&self, connection: ConnectionId) -> HashSet<SensorId> {
        let state = self.state.read().await;
        state.table.sensors(connection).cloned().unwrap_or_default()
    }

    pub async fn connection_count(&self) -> usize {
        self.state.read().await.connections.len()
    }

    /// Connections registered since the broker was created, closed ones included.
    pub fn connections_served(&self) -> u64 {
        self.next_id.load(Ordering::Relaxed)
    }
}

fn mutates_table(envelope: &Envelope) -> bool {
    matches!(
        envelope,
        Envelope::AgentConnect { .. }
            | Envelope::SubscribeSensor { .. }
            | Envelope::UnsubscribeSensor { .. }
    )
}

/// Applies the table change an envelope asks for. Envelopes that do not touch the table are ignored.
fn apply(table: &mut SubscriptionTable, sender: ConnectionId, envelope: &Envelope) {
    match envelope {
        Envelope::AgentConnect { sensors } => table.replace(sender, sensors.iter().cloned()),
        Envelope::SubscribeSensor { sensor_id } => {
            table.insert(sender, sensor_id.clone());
        }
        Envelope::UnsubscribeSensor { sensor_id } => {
            table.remove(sender, sensor_id);
        }
        _ => {}
    }
}

/// Decides who receives what for an already-applied envelope.
fn decide(
    table: &SubscriptionTable,
    sender: ConnectionId,
    raw: &str,
    envelope: &Envelope,
) -> Route {
    match envelope {
        Envelope::NewSensorData { sensor_id, .. } => {
            Route::FanOut(table.subscribers(sensor_id, sender))
        }
        // Membership is checked against the querying connection's own set
        Envelope::SensorConnectionStatus { sensor_id, .. } => Route::Reply(
            Envelope::status_reply(sensor_id.as_str(), table.contains(sender, sensor_id)).encode(),
        ),
        Envelope::Ping => Route::Reply(Envelope::Pong.encode()),
        Envelope::ClientConnect { client_name } | Envelope::ClientDisconnect { client_name } => {
            debug!(%sender, event = envelope.event(), client_name = ?client_name, "client announcement");
            Route::Reply(raw.to_string())
        }
        Envelope::AgentConnect { .. }
        | Envelope::SubscribeSensor { .. }
        | Envelope::UnsubscribeSensor { .. }
        | Envelope::Pong
        | Envelope::Unknown { .. } => Route::Reply(raw.to_string()),
    }
}
