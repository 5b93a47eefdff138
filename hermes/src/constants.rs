/// Central configuration for all Hermes services

/// Default host the relay binds to and endpoints connect to.
pub const DEFAULT_HOST: &str = "localhost";

/// Default port for the Hermes relay.
pub const DEFAULT_PORT: u16 = 5192;

/// Agents publish one reading per interval.
pub const AGENT_PUBLISH_EVERY_MS: u64 = 3000;

/// Session waits this long between reconnection attempts unless configured otherwise.
pub const RECONNECT_EVERY_MS: u64 = 100;

/// Upper bound for the exponential reconnection delay.
pub const RECONNECT_MAX_DELAY_MS: u64 = 5000;

/// Capacity of the session's inbound envelope broadcast. Slow stream readers lag past this.
pub const INBOUND_BUFFER_SIZE: usize = 1024;
