//! Connection-driving loop of a session and the state it shares with the `Session` handle.
//! One loop per session: connect → drain queue / receive until failure → replay → back off → reconnect,
//! until `disconnect()` sends the final command, or flags shutdown while the relay cannot be reached.

use super::backoff::Backoff;
use super::callbacks::CallbackRegistry;
use super::queue::{Command, CommandQueue};
use super::state::SessionState;
use crate::protocol::{Envelope, SensorId};
use crate::transport::{Channel, Connector};
use crate::utils::{HermesError, OrError};
use std::collections::BTreeSet;
use std::sync::{Arc, Mutex};
use tokio::sync::{broadcast, watch};
use tracing::{debug, info, warn};

/// State owned jointly by the application side and the loop.
pub(super) struct Shared {
    pub(super) queue: CommandQueue,
    /// Desired Subscription Set. Survives every reconnection.
    pub(super) desired: Mutex<BTreeSet<SensorId>>,
    pub(super) callbacks: CallbackRegistry,
    pub(super) state: watch::Sender<SessionState>,
    pub(super) inbound: broadcast::Sender<Envelope>,
    pub(super) client_name: String,
}

impl Shared {
    pub(super) fn new(client_name: String, inbound_buffer: usize) -> Self {
        let (state, _) = watch::channel(SessionState::Disconnected);
        let (inbound, _) = broadcast::channel(inbound_buffer);
        Self {
            queue: CommandQueue::new(),
            desired: Mutex::new(BTreeSet::new()),
            callbacks: CallbackRegistry::new(),
            state,
            inbound,
            client_name,
        }
    }

    pub(super) fn state(&self) -> SessionState {
        *self.state.borrow()
    }

    pub(super) fn set_state(&self, next: SessionState) {
        let previous = self.state.send_replace(next);
        if previous != next {
            info!(client = %self.client_name, "session {} -> {}", previous, next);
        }
    }

    pub(super) fn announcement(&self) -> Envelope {
        Envelope::client_connect(self.client_name.as_str())
    }

    /// Puts announcement + one subscribe per desired sensor at the head of the queue as one burst.
    /// The desired set stays locked while the burst is queued so a concurrent `subscribe` lands after it.
    pub(super) fn enqueue_replay(&self) {
        let desired = self.desired.lock().unwrap();
        let mut burst = Vec::with_capacity(desired.len() + 1);
        burst.push(Command::Send(self.announcement()));
        burst.extend(
            desired
                .iter()
                .map(|sensor_id| Command::Send(Envelope::subscribe(sensor_id.as_str()))),
        );
        debug!(client = %self.client_name, replayed = desired.len(), "queued resubscription burst");
        self.queue.push_front_all(burst);
    }

    /// Handles one inbound payload: publish it to inbound streams, then run data callbacks in order.
    pub(super) fn dispatch(&self, raw: &str) {
        let envelope = match Envelope::decode(raw) {
            Ok(envelope) => envelope,
            Err(e) => {
                debug!(error = %e, "dropping malformed inbound payload");
                return;
            }
        };

        if let Envelope::NewSensorData {
            sensor_id,
            sensor_readings,
        } = &envelope
        {
            self.callbacks.invoke(sensor_id, sensor_readings);
        }
        // No stream readers is fine
        let _ = self.inbound.send(envelope);
    }
}

// Resolves once `disconnect()` flags shutdown or the session handle is gone.
async fn stop_requested(shutdown: &mut watch::Receiver<bool>) {
    let _ = shutdown.wait_for(|stop| *stop).await;
}

enum Step {
    Outgoing(Command),
    Inbound(OrError<String>),
}

enum Exit {
    Stopped,
    Failed(HermesError),
}

/// Background worker that owns the connector and the backoff policy.
pub(super) struct Driver<C: Connector> {
    connector: C,
    backoff: Box<dyn Backoff>,
    shared: Arc<Shared>,
    shutdown: watch::Receiver<bool>,
}

impl<C: Connector> Driver<C> {
    pub(super) fn new(
        connector: C,
        backoff: Box<dyn Backoff>,
        shared: Arc<Shared>,
        shutdown: watch::Receiver<bool>,
    ) -> Self {
        Self {
            connector,
            backoff,
            shared,
            shutdown,
        }
    }

    /// Runs until the disconnect command is sent, or shutdown is flagged while a connect attempt
    /// fails or the loop waits out a backoff delay.
    /// A connect attempt in progress is never abandoned, so a reachable relay still gets every queued command.
    pub(super) async fn run(mut self) {
        loop {
            match self.connector.connect().await {
                Ok(mut channel) => {
                    self.backoff.reset();
                    self.shared.set_state(SessionState::Connected);
                    match self.drive(&mut channel).await {
                        Exit::Stopped => {
                            if let Err(e) = channel.close().await {
                                debug!("close after disconnect failed: {}", e);
                            }
                            break;
                        }
                        Exit::Failed(e) => {
                            warn!(client = %self.shared.client_name, "connection lost: {}", e);
                            self.shared.set_state(SessionState::Reconnecting);
                            self.shared.enqueue_replay();
                        }
                    }
                }
                Err(e) => {
                    warn!(client = %self.shared.client_name, "connect failed: {}", e);
                    if *self.shutdown.borrow() {
                        break;
                    }
                }
            }

            let delay = self.backoff.next_delay();
            debug!(?delay, "waiting before reconnecting");
            tokio::select! {
                _ = tokio::time::sleep(delay) => {}
                _ = stop_requested(&mut self.shutdown) => break,
            }
        }
        self.shared.set_state(SessionState::Stopped);
    }

    // Outgoing commands take priority over inbound traffic; a send failure puts the command back behind any replay burst.
    async fn drive(&mut self, channel: &mut C::Channel) -> Exit {
        loop {
            let step = tokio::select! {
                biased;
                command = self.shared.queue.pop() => Step::Outgoing(command),
                inbound = channel.receive() => Step::Inbound(inbound),
            };

            match step {
                Step::Outgoing(command) => {
                    let payload = command.envelope().encode();
                    if let Err(e) = channel.send(payload).await {
                        self.shared.queue.push_front_all([command]);
                        return Exit::Failed(e);
                    }
                    if command.is_disconnect() {
                        return Exit::Stopped;
                    }
                }
                Step::Inbound(Ok(raw)) => self.shared.dispatch(&raw),
                Step::Inbound(Err(e)) => return Exit::Failed(e),
            }
        }
    }
}
