//! Subscriber session: keeps one relay connection alive, replays subscriptions after a drop,
//! and bridges the application's calls onto the connection through a command queue.
//! `Session` is the caller-facing handle; the connection-driving loop runs as one background task.

mod backoff;
pub use backoff::{Backoff, ExponentialBackoff, FixedBackoff};

mod callbacks;
pub use callbacks::{CallbackRegistry, SensorCallback};

mod client;
pub use client::Session;

mod config;
pub use config::SessionConfig;

mod driver;

mod queue;
pub use queue::{Command, CommandQueue};

mod state;
pub use state::SessionState;
