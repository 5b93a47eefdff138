use crate::protocol::SensorId;
use std::collections::{HashMap, HashSet};
use std::fmt::{self, Display};

/// Opaque handle for one open relay connection. Never reused within a broker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ConnectionId(u64);

impl ConnectionId {
    pub fn new(raw: u64) -> Self {
        Self(raw)
    }
}

impl Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "conn-{}", self.0)
    }
}

/// Sensors each connection wants delivered to it.
/// Invariant: at most one entry per connection; a missing entry means "no subscriptions".
#[derive(Debug, Default)]
pub struct SubscriptionTable {
    entries: HashMap<ConnectionId, HashSet<SensorId>>,
}

impl SubscriptionTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Overwrites the connection's set. Used for agents announcing what they own.
    pub fn replace<I>(&mut self, connection: ConnectionId, sensors: I)
    where
        I: IntoIterator<Item = SensorId>,
    {
        self.entries
            .insert(connection, sensors.into_iter().collect());
    }

    /// Returns false if the sensor was already in the set.
    pub fn insert(&mut self, connection: ConnectionId, sensor_id: SensorId) -> bool {
        self.entries.entry(connection).or_default().insert(sensor_id)
    }

    /// Removing an absent sensor is a no-op and returns false.
    pub fn remove(&mut self, connection: ConnectionId, sensor_id: &str) -> bool {
        self.entries
            .get_mut(&connection)
            .is_some_and(|sensors| sensors.remove(sensor_id))
    }

    pub fn contains(&self, connection: ConnectionId, sensor_id: &str) -> bool {
        self.entries
            .get(&connection)
            .is_some_and(|sensors| sensors.contains(sensor_id))
    }

    pub fn sensors(&self, connection: ConnectionId) -> Option<&HashSet<SensorId>> {
        self.entries.get(&connection)
    }

    /// Connections other than `sender` whose set contains `sensor_id`.
    pub fn subscribers(&self, sensor_id: &str, sender: ConnectionId) -> Vec<ConnectionId> {
        let mut subscribers: Vec<ConnectionId> = self
            .entries
            .iter()
            .filter(|(connection, sensors)| **connection != sender && sensors.contains(sensor_id))
            .map(|(connection, _)| *connection)
            .collect();
        subscribers.sort();
        subscribers
    }

    /// Drops the connection's entry when its channel closes.
    pub fn discard(&mut self, connection: ConnectionId) -> Option<HashSet<SensorId>> {
        self.entries.remove(&connection)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
