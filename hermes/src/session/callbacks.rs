use crate::protocol::SensorId;
use crate::utils::{HermesError, OrError};
use std::collections::HashMap;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::{Arc, Mutex};
use tracing::error;

/// Handler for one sensor's readings: `(sensor_id, sensor_readings, extra_args)`.
pub type SensorCallback = Arc<dyn Fn(&str, &str, &[String]) + Send + Sync>;

type Registration = (SensorCallback, Vec<String>);

/// Per-sensor handlers with the fixed extra arguments given at registration.
/// Written by the application, read by the session loop; handlers run outside the lock.
#[derive(Default)]
pub struct CallbackRegistry {
    entries: Mutex<HashMap<SensorId, Vec<Registration>>>,
}

impl CallbackRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a handler; handlers for one sensor run in registration order.
    pub fn register(&self, sensor_id: SensorId, callback: SensorCallback, args: Vec<String>) {
        self.entries
            .lock()
            .unwrap()
            .entry(sensor_id)
            .or_default()
            .push((callback, args));
    }

    /// Drops every handler for the sensor.
    /// Error: nothing registered → `NoCallbackRegistered`.
    pub fn remove(&self, sensor_id: &str) -> OrError<usize> {
        self.entries
            .lock()
            .unwrap()
            .remove(sensor_id)
            .map(|registrations| registrations.len())
            .ok_or_else(|| HermesError::NoCallbackRegistered(sensor_id.to_string()))
    }

    pub fn count(&self, sensor_id: &str) -> usize {
        self.entries
            .lock()
            .unwrap()
            .get(sensor_id)
            .map_or(0, Vec::len)
    }

    /// Runs every handler for the sensor synchronously and returns how many ran.
    /// A panicking handler is logged and skipped; the remaining handlers still run.
    pub fn invoke(&self, sensor_id: &str, sensor_readings: &str) -> usize {
        // Snapshot so handlers may (un)register without deadlocking
        let registrations: Vec<Registration> = match self.entries.lock().unwrap().get(sensor_id) {
            Some(registrations) => registrations.clone(),
            None => return 0,
        };

        for (callback, args) in &registrations {
            let outcome = catch_unwind(AssertUnwindSafe(|| {
                callback(sensor_id, sensor_readings, args.as_slice())
            }));
            if outcome.is_err() {
                error!(sensor_id, "sensor callback panicked");
            }
        }
        registrations.len()
    }
}
