use thiserror::Error;

/// Every failure the relay, the session and the transport can report.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum HermesError {
    /// Payload could not be decoded into an envelope. Dropped locally, never sent to a peer.
    #[error("malformed envelope: {0}")]
    ParseFailure(String),

    /// Remote side closed the channel.
    #[error("channel closed")]
    ChannelClosed,

    /// Transport-level failure on an open channel.
    #[error("{0}")]
    Channel(String),

    /// Could not open a channel to the relay.
    #[error("{0}")]
    Connect(String),

    #[error("sensor '{0}' is not subscribed")]
    NotSubscribed(String),

    #[error("no callback registered for sensor '{0}'")]
    NoCallbackRegistered(String),

    /// Lifecycle call made in a state that does not allow it.
    #[error("{0}")]
    InvalidState(String),
}

impl HermesError {
    /// Transport failures are recovered by reconnecting; everything else is caller-facing.
    pub fn is_transport(&self) -> bool {
        matches!(
            self,
            HermesError::ChannelClosed | HermesError::Channel(_) | HermesError::Connect(_)
        )
    }
}

pub type OrError<T> = Result<T, HermesError>;
