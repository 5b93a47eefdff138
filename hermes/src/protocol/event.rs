use std::fmt::{self, Display};

/// Event tags with a defined payload shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    AgentConnect,
    NewSensorData,
    SubscribeSensor,
    UnsubscribeSensor,
    SensorConnectionStatus,
    Ping,
    Pong,
    ClientConnect,
    ClientDisconnect,
}

impl EventKind {
    pub const ALL: [EventKind; 9] = [
        EventKind::AgentConnect,
        EventKind::NewSensorData,
        EventKind::SubscribeSensor,
        EventKind::UnsubscribeSensor,
        EventKind::SensorConnectionStatus,
        EventKind::Ping,
        EventKind::Pong,
        EventKind::ClientConnect,
        EventKind::ClientDisconnect,
    ];

    /// Tag as written on the wire.
    pub fn tag(self) -> &'static str {
        match self {
            EventKind::AgentConnect => "agent_connect",
            EventKind::NewSensorData => "new_sensor_data",
            EventKind::SubscribeSensor => "subscribe_sensor",
            EventKind::UnsubscribeSensor => "unsubscribe_sensor",
            EventKind::SensorConnectionStatus => "sensor_connection_status",
            EventKind::Ping => "ping",
            EventKind::Pong => "pong",
            EventKind::ClientConnect => "Client connect",
            EventKind::ClientDisconnect => "Client disconnect",
        }
    }

    /// Tags are matched exactly, including case and spaces.
    pub fn from_tag(tag: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.tag() == tag)
    }
}

impl Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}
