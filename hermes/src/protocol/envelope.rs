use super::EventKind;
use crate::utils::{HermesError, OrError};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

pub type SensorId = String;

/// Unit of wire exchange between agents, the relay and subscriber sessions.
/// Serialized as `{"event": <tag>, "data": {...}}`; `data` decodes to an empty map when absent or `null`.
/// Unrecognized tags are kept as `Unknown` with their data untouched so the relay can still echo them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawEnvelope", into = "RawEnvelope")]
pub enum Envelope {
    /// Agent announces every sensor it owns.
    AgentConnect { sensors: Vec<SensorId> },
    NewSensorData {
        sensor_id: SensorId,
        sensor_readings: String,
    },
    SubscribeSensor { sensor_id: SensorId },
    UnsubscribeSensor { sensor_id: SensorId },
    /// Query when `connected` is `None`, relay answer otherwise.
    SensorConnectionStatus {
        sensor_id: SensorId,
        connected: Option<bool>,
    },
    Ping,
    Pong,
    ClientConnect { client_name: Option<String> },
    ClientDisconnect { client_name: Option<String> },
    Unknown {
        event: String,
        data: Map<String, Value>,
    },
}

#[derive(Serialize, Deserialize)]
struct RawEnvelope {
    event: String,
    #[serde(default)]
    data: Option<Map<String, Value>>,
}

#[derive(Deserialize)]
struct SensorsData {
    sensors: Vec<SensorId>,
}

#[derive(Deserialize)]
struct SensorData {
    sensor_id: SensorId,
}

#[derive(Deserialize)]
struct ReadingData {
    sensor_id: SensorId,
    sensor_readings: String,
}

#[derive(Deserialize)]
struct StatusData {
    sensor_id: SensorId,
    #[serde(default)]
    connected: Option<bool>,
}

// Identity announcements are informational; any `client_name` value is accepted
#[derive(Deserialize)]
struct ClientData {
    #[serde(default)]
    client_name: Option<Value>,
}

impl ClientData {
    fn client_name(self) -> Option<String> {
        match self.client_name? {
            Value::Null => None,
            Value::String(name) => Some(name),
            other => Some(other.to_string()),
        }
    }
}

fn parse_data<T: DeserializeOwned>(kind: EventKind, data: Map<String, Value>) -> OrError<T> {
    serde_json::from_value(Value::Object(data))
        .map_err(|e| HermesError::ParseFailure(format!("bad data for '{}': {}", kind, e)))
}

impl TryFrom<RawEnvelope> for Envelope {
    type Error = HermesError;

    fn try_from(raw: RawEnvelope) -> OrError<Self> {
        let RawEnvelope { event, data } = raw;
        let data = data.unwrap_or_default();
        let Some(kind) = EventKind::from_tag(&event) else {
            return Ok(Envelope::Unknown { event, data });
        };

        let envelope = match kind {
            EventKind::AgentConnect => {
                let SensorsData { sensors } = parse_data(kind, data)?;
                Envelope::AgentConnect { sensors }
            }
            EventKind::NewSensorData => {
                let ReadingData {
                    sensor_id,
                    sensor_readings,
                } = parse_data(kind, data)?;
                Envelope::NewSensorData {
                    sensor_id,
                    sensor_readings,
                }
            }
            EventKind::SubscribeSensor => {
                let SensorData { sensor_id } = parse_data(kind, data)?;
                Envelope::SubscribeSensor { sensor_id }
            }
            EventKind::UnsubscribeSensor => {
                let SensorData { sensor_id } = parse_data(kind, data)?;
                Envelope::UnsubscribeSensor { sensor_id }
            }
            EventKind::SensorConnectionStatus => {
                let StatusData {
                    sensor_id,
                    connected,
                } = parse_data(kind, data)?;
                Envelope::SensorConnectionStatus {
                    sensor_id,
                    connected,
                }
            }
            EventKind::Ping => Envelope::Ping,
            EventKind::Pong => Envelope::Pong,
            EventKind::ClientConnect => {
                let client: ClientData = parse_data(kind, data)?;
                Envelope::ClientConnect {
                    client_name: client.client_name(),
                }
            }
            EventKind::ClientDisconnect => {
                let client: ClientData = parse_data(kind, data)?;
                Envelope::ClientDisconnect {
                    client_name: client.client_name(),
                }
            }
        };
        Ok(envelope)
    }
}

impl From<Envelope> for RawEnvelope {
    fn from(envelope: Envelope) -> Self {
        Self {
            event: envelope.event().to_string(),
            data: Some(envelope.data()),
        }
    }
}

impl Envelope {
    /// Decodes one wire payload. Anything that is not a well-formed envelope is a `ParseFailure`.
    pub fn decode(raw: &str) -> OrError<Self> {
        serde_json::from_str(raw).map_err(|e| HermesError::ParseFailure(e.to_string()))
    }

    pub fn encode(&self) -> String {
        let mut object = Map::new();
        object.insert("event".to_string(), Value::from(self.event()));
        object.insert("data".to_string(), Value::Object(self.data()));
        Value::Object(object).to_string()
    }

    /// `None` for tags outside the known set.
    pub fn kind(&self) -> Option<EventKind> {
        match self {
            Envelope::AgentConnect { .. } => Some(EventKind::AgentConnect),
            Envelope::NewSensorData { .. } => Some(EventKind::NewSensorData),
            Envelope::SubscribeSensor { .. } => Some(EventKind::SubscribeSensor),
            Envelope::UnsubscribeSensor { .. } => Some(EventKind::UnsubscribeSensor),
            Envelope::SensorConnectionStatus { .. } => Some(EventKind::SensorConnectionStatus),
            Envelope::Ping => Some(EventKind::Ping),
            Envelope::Pong => Some(EventKind::Pong),
            Envelope::ClientConnect { .. } => Some(EventKind::ClientConnect),
            Envelope::ClientDisconnect { .. } => Some(EventKind::ClientDisconnect),
            Envelope::Unknown { .. } => None,
        }
    }

    /// Wire tag, including the received tag of an `Unknown` envelope.
    pub fn event(&self) -> &str {
        match self {
            Envelope::Unknown { event, .. } => event,
            known => known.kind().map(EventKind::tag).unwrap_or_default(),
        }
    }

    pub fn data(&self) -> Map<String, Value> {
        let mut data = Map::new();
        match self {
            Envelope::AgentConnect { sensors } => {
                data.insert("sensors".to_string(), Value::from(sensors.clone()));
            }
            Envelope::NewSensorData {
                sensor_id,
                sensor_readings,
            } => {
                data.insert("sensor_id".to_string(), Value::from(sensor_id.as_str()));
                data.insert(
                    "sensor_readings".to_string(),
                    Value::from(sensor_readings.as_str()),
                );
            }
            Envelope::SubscribeSensor { sensor_id } | Envelope::UnsubscribeSensor { sensor_id } => {
                data.insert("sensor_id".to_string(), Value::from(sensor_id.as_str()));
            }
            Envelope::SensorConnectionStatus {
                sensor_id,
                connected,
            } => {
                data.insert("sensor_id".to_string(), Value::from(sensor_id.as_str()));
                if let Some(connected) = connected {
                    data.insert("connected".to_string(), Value::from(*connected));
                }
            }
            Envelope::Ping | Envelope::Pong => {}
            Envelope::ClientConnect { client_name } | Envelope::ClientDisconnect { client_name } => {
                if let Some(name) = client_name {
                    data.insert("client_name".to_string(), Value::from(name.as_str()));
                }
            }
            Envelope::Unknown { data: raw, .. } => return raw.clone(),
        }
        data
    }

    /// Sensor the envelope refers to, if its shape carries one.
    pub fn sensor_id(&self) -> Option<&str> {
        match self {
            Envelope::NewSensorData { sensor_id, .. }
            | Envelope::SubscribeSensor { sensor_id }
            | Envelope::UnsubscribeSensor { sensor_id }
            | Envelope::SensorConnectionStatus { sensor_id, .. } => Some(sensor_id),
            _ => None,
        }
    }

    pub fn agent_connect<I, S>(sensors: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<SensorId>,
    {
        Envelope::AgentConnect {
            sensors: sensors.into_iter().map(Into::into).collect(),
        }
    }

    pub fn reading(sensor_id: impl Into<SensorId>, sensor_readings: impl Into<String>) -> Self {
        Envelope::NewSensorData {
            sensor_id: sensor_id.into(),
            sensor_readings: sensor_readings.into(),
        }
    }

    pub fn subscribe(sensor_id: impl Into<SensorId>) -> Self {
        Envelope::SubscribeSensor {
            sensor_id: sensor_id.into(),
        }
    }

    pub fn unsubscribe(sensor_id: impl Into<SensorId>) -> Self {
        Envelope::UnsubscribeSensor {
            sensor_id: sensor_id.into(),
        }
    }

    pub fn status_query(sensor_id: impl Into<SensorId>) -> Self {
        Envelope::SensorConnectionStatus {
            sensor_id: sensor_id.into(),
            connected: None,
        }
    }

    pub fn status_reply(sensor_id: impl Into<SensorId>, connected: bool) -> Self {
        Envelope::SensorConnectionStatus {
            sensor_id: sensor_id.into(),
            connected: Some(connected),
        }
    }

    pub fn client_connect(client_name: impl Into<String>) -> Self {
        Envelope::ClientConnect {
            client_name: Some(client_name.into()),
        }
    }

    pub fn client_disconnect() -> Self {
        Envelope::ClientDisconnect { client_name: None }
    }
}
