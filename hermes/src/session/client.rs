//! Caller-facing handle of a subscriber session.
//! Every call except `disconnect` only touches shared state and the command queue, so it never waits on the network.

use super::backoff::Backoff;
use super::callbacks::SensorCallback;
use super::config::SessionConfig;
use super::driver::{Driver, Shared};
use super::queue::Command;
use super::state::SessionState;
use crate::hermes_error;
use crate::hermes_error_cause;
use crate::protocol::{Envelope, SensorId};
use crate::transport::{Connector, WsConnector};
use crate::utils::{ConnectionHandle, HermesError, OrError};
use std::sync::{Arc, Mutex};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_stream::wrappers::BroadcastStream;

/// Long-lived subscribing endpoint.
/// Owns the Desired Subscription Set and Callback Registry; a background loop (started by `connect`)
/// owns the connection, reconnects on failure and replays the desired set first.
/// Must be used from within a Tokio runtime.
pub struct Session<C: Connector> {
    shared: Arc<Shared>,
    // Handed to the loop on `connect`
    pending: Mutex<Option<(C, Box<dyn Backoff>)>>,
    shutdown: watch::Sender<bool>,
    bg_handle: Mutex<Option<JoinHandle<()>>>,
}

impl Session<WsConnector> {
    /// Session talking WebSocket to the relay at `relay`.
    pub fn websocket(relay: &ConnectionHandle, config: SessionConfig) -> Self {
        Self::new(WsConnector::new(relay), config)
    }
}

impl<C: Connector> Session<C> {
    pub fn new(connector: C, config: SessionConfig) -> Self {
        let SessionConfig {
            client_name,
            backoff,
            inbound_buffer,
        } = config;
        let (shutdown, _) = watch::channel(false);
        Self {
            shared: Arc::new(Shared::new(client_name, inbound_buffer)),
            pending: Mutex::new(Some((connector, backoff))),
            shutdown,
            bg_handle: Mutex::new(None),
        }
    }

    /// Queues the identity announcement and starts the connection-driving loop.
    /// Error: already connected, or the session was stopped → `InvalidState`.
    pub fn connect(&self) -> OrError<()> {
        let state = self.shared.state();
        if state != SessionState::Disconnected {
            return Err(HermesError::InvalidState(hermes_error!(
                "session::Session",
                "connect",
                &format!("cannot connect while {}", state)
            )));
        }
        let Some((connector, backoff)) = self.pending.lock().unwrap().take() else {
            return Err(HermesError::InvalidState(hermes_error!(
                "session::Session",
                "connect",
                "connection loop already started"
            )));
        };

        // Identity goes ahead of anything queued before connecting
        self.shared
            .queue
            .push_front_all([Command::Send(self.shared.announcement())]);
        self.shared.set_state(SessionState::Connecting);

        let driver = Driver::new(
            connector,
            backoff,
            Arc::clone(&self.shared),
            self.shutdown.subscribe(),
        );
        *self.bg_handle.lock().unwrap() = Some(tokio::spawn(driver.run()));
        Ok(())
    }

    /// Queues the disconnect notice and waits for the loop to drain the queue, send it and exit.
    /// No reconnection happens afterwards. A connect attempt already in flight is completed first;
    /// if the relay is unreachable the loop exits without sending. Calling it again is a no-op.
    pub async fn disconnect(&self) -> OrError<()> {
        let handle = self.bg_handle.lock().unwrap().take();
        let Some(handle) = handle else {
            self.shared.set_state(SessionState::Stopped);
            return Ok(());
        };

        self.shared
            .queue
            .push_back(Command::Disconnect(Envelope::client_disconnect()));
        self.shutdown.send_replace(true);

        let joined = handle.await;
        self.shared.set_state(SessionState::Stopped);
        joined.map_err(|e| {
            HermesError::Channel(hermes_error_cause!(
                "session::Session",
                "disconnect",
                "connection loop ended abnormally",
                e
            ))
        })
    }

    /// Adds the sensor to the desired set and queues `subscribe_sensor`.
    pub fn subscribe(&self, sensor_id: impl Into<SensorId>) -> OrError<()> {
        self.ensure_running("subscribe")?;
        let sensor_id = sensor_id.into();
        let mut desired = self.shared.desired.lock().unwrap();
        desired.insert(sensor_id.clone());
        self.shared
            .queue
            .push_back(Command::Send(Envelope::subscribe(sensor_id)));
        Ok(())
    }

    /// Removes the sensor from the desired set and queues `unsubscribe_sensor`.
    /// Error: sensor not currently desired → `NotSubscribed`.
    pub fn unsubscribe(&self, sensor_id: &str) -> OrError<()> {
        self.ensure_running("unsubscribe")?;
        let mut desired = self.shared.desired.lock().unwrap();
        if !desired.remove(sensor_id) {
            return Err(HermesError::NotSubscribed(sensor_id.to_string()));
        }
        self.shared
            .queue
            .push_back(Command::Send(Envelope::unsubscribe(sensor_id)));
        Ok(())
    }

    /// Queues a `sensor_connection_status` query. The answer arrives on `inbound()`.
    pub fn connection_status(&self, sensor_id: impl Into<SensorId>) -> OrError<()> {
        self.ensure_running("connection_status")?;
        self.shared
            .queue
            .push_back(Command::Send(Envelope::status_query(sensor_id)));
        Ok(())
    }

    /// Appends a handler called with `(sensor_id, sensor_readings, args)` for every reading of the sensor.
    /// Handlers run on the session loop in registration order; a slow handler delays the whole session.
    pub fn register_callback<F>(&self, sensor_id: impl Into<SensorId>, callback: F, args: Vec<String>)
    where
        F: Fn(&str, &str, &[String]) + Send + Sync + 'static,
    {
        let callback: SensorCallback = Arc::new(callback);
        self.shared
            .callbacks
            .register(sensor_id.into(), callback, args);
    }

    /// Error: nothing registered for the sensor → `NoCallbackRegistered`.
    pub fn remove_callback(&self, sensor_id: &str) -> OrError<()> {
        self.shared.callbacks.remove(sensor_id).map(|_| ())
    }

    pub fn state(&self) -> SessionState {
        self.shared.state()
    }

    /// Receiver that observes every state transition.
    pub fn watch_state(&self) -> watch::Receiver<SessionState> {
        self.shared.state.subscribe()
    }

    /// Stream of every decoded inbound envelope (acknowledgements, status answers, readings).
    /// Only envelopes received after the call are yielded.
    pub fn inbound(&self) -> BroadcastStream<Envelope> {
        BroadcastStream::new(self.shared.inbound.subscribe())
    }

    /// Desired Subscription Set, sorted.
    pub fn desired_subscriptions(&self) -> Vec<SensorId> {
        self.shared.desired.lock().unwrap().iter().cloned().collect()
    }

    pub fn client_name(&self) -> &str {
        &self.shared.client_name
    }

    /// Commands waiting to be transmitted, head first.
    pub fn pending_commands(&self) -> Vec<Command> {
        self.shared.queue.snapshot()
    }

    fn ensure_running(&self, method: &str) -> OrError<()> {
        if self.shared.state() == SessionState::Stopped {
            return Err(HermesError::InvalidState(format!(
                "Hermes session::Session::{} Error: session is stopped",
                method
            )));
        }
        Ok(())
    }
}

impl<C: Connector> Drop for Session<C> {
    fn drop(&mut self) {
        if let Some(handle) = self.bg_handle.lock().unwrap().take() {
            handle.abort();
        }
    }
}
