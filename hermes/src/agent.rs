//! Publishing endpoint: an agent owns a fixed set of sensors, announces them once, then streams readings.
//! `Sensor` is a dummy reading generator standing in for real hardware.

use crate::hermes_error;
use crate::protocol::{Envelope, SensorId};
use crate::transport::{Channel, Connector};
use crate::utils::{HermesError, OrError};
use rand::Rng;
use std::time::Duration;
use tokio::time::{MissedTickBehavior, interval};
use tracing::{debug, info};

/// Dummy sensor producing random readings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sensor {
    sensor_id: SensorId,
}

impl Sensor {
    pub fn new(sensor_id: impl Into<SensorId>) -> Self {
        Self {
            sensor_id: sensor_id.into(),
        }
    }

    pub fn sensor_id(&self) -> &str {
        &self.sensor_id
    }

    /// One `new_sensor_data` envelope with a fresh reading.
    pub fn reading(&self) -> Envelope {
        let value: f64 = rand::rng().random_range(0.0..100.0);
        Envelope::reading(self.sensor_id.as_str(), format!("{:.2}", value))
    }
}

/// Publisher that owns `sensors` for the lifetime of one connection.
pub struct Agent<C: Connector> {
    connector: C,
    sensors: Vec<Sensor>,
    publish_every: Duration,
}

impl<C: Connector> Agent<C> {
    /// Error: no sensors or a zero interval → `InvalidState`.
    pub fn new(connector: C, sensors: Vec<Sensor>, publish_every: Duration) -> OrError<Self> {
        if sensors.is_empty() {
            return Err(HermesError::InvalidState(hermes_error!(
                "agent::Agent",
                "new",
                "an agent needs at least one sensor"
            )));
        }
        if publish_every.is_zero() {
            return Err(HermesError::InvalidState(hermes_error!(
                "agent::Agent",
                "new",
                "publish interval must be positive"
            )));
        }
        Ok(Self {
            connector,
            sensors,
            publish_every,
        })
    }

    pub fn sensors(&self) -> &[Sensor] {
        &self.sensors
    }

    /// Connects, sends `agent_connect` with every sensor id, waits for the echo,
    /// then publishes one reading from a random sensor per interval.
    /// Inbound traffic (echoes, forwarded readings) is drained and logged.
    /// Returns when the channel fails; agents do not reconnect.
    pub async fn run(&self) -> OrError<()> {
        let mut channel = self.connector.connect().await?;

        let announcement =
            Envelope::agent_connect(self.sensors.iter().map(|sensor| sensor.sensor_id().to_string()));
        channel.send(announcement.encode()).await?;
        let echo = channel.receive().await?;
        info!(sensors = self.sensors.len(), "agent registered: {}", echo);

        let mut ticker = interval(self.publish_every);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // First tick completes immediately
        ticker.tick().await;

        loop {
            let inbound = tokio::select! {
                _ = ticker.tick() => None,
                inbound = channel.receive() => Some(inbound),
            };

            match inbound {
                None => {
                    let reading = self.pick_sensor().reading();
                    debug!(sensor_id = reading.sensor_id(), "publishing reading");
                    channel.send(reading.encode()).await?;
                }
                Some(inbound) => {
                    let raw = inbound?;
                    debug!("agent received: {}", raw);
                }
            }
        }
    }

    fn pick_sensor(&self) -> &Sensor {
        let index = rand::rng().random_range(0..self.sensors.len());
        &self.sensors[index]
    }
}
