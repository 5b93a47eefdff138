use super::backoff::{Backoff, FixedBackoff};
use crate::constants::INBOUND_BUFFER_SIZE;
use uuid::Uuid;

/// Settings a `Session` is built with. The relay address lives in the `Connector`.
pub struct SessionConfig {
    pub(super) client_name: String,
    pub(super) backoff: Box<dyn Backoff>,
    pub(super) inbound_buffer: usize,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionConfig {
    /// Random client name, fixed reconnection delay.
    pub fn new() -> Self {
        Self {
            client_name: Uuid::new_v4().to_string(),
            backoff: Box::new(FixedBackoff::default()),
            inbound_buffer: INBOUND_BUFFER_SIZE,
        }
    }

    /// Name sent in every `Client connect` announcement.
    pub fn with_client_name(mut self, client_name: impl Into<String>) -> Self {
        self.client_name = client_name.into();
        self
    }

    pub fn with_backoff(mut self, backoff: impl Backoff) -> Self {
        self.backoff = Box::new(backoff);
        self
    }

    pub fn with_inbound_buffer(mut self, capacity: usize) -> Self {
        self.inbound_buffer = capacity.max(1);
        self
    }

    pub fn client_name(&self) -> &str {
        &self.client_name
    }
}
