use std::fmt::{Display, Formatter};
use std::net::{Ipv6Addr, SocketAddr};

/// Host and port of a relay endpoint.
#[derive(serde::Deserialize, serde::Serialize, Debug, Clone, PartialEq, Eq, Hash)]
pub struct ConnectionHandle {
    host: String,
    port: u16,
}

/// Creates standardized Hermes error message
#[macro_export]
macro_rules! hermes_error {
    ($component:expr, $method:expr, $msg:expr) => {
        format!("Hermes {} Error: {}", concat!($component, "::", $method), $msg)
    };
}

/// Creates error with cause chain
#[macro_export]
macro_rules! hermes_error_cause {
    ($component:expr, $method:expr, $msg:expr, $cause:expr) => {
        format!("Hermes {} Error: {}\nCaused by: {}",
            concat!($component, "::", $method), $msg, $cause)
    };
}

impl ConnectionHandle {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
        }
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    /// WebSocket URL the relay accepts connections on.
    pub fn ws_url(&self) -> String {
        format!("ws://{}", self)
    }
}

impl From<SocketAddr> for ConnectionHandle {
    fn from(addr: SocketAddr) -> Self {
        Self::new(addr.ip().to_string(), addr.port())
    }
}

impl Display for ConnectionHandle {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        // Bare IPv6 literals need brackets before the port
        if self.host.parse::<Ipv6Addr>().is_ok() {
            write!(f, "[{}]:{}", self.host, self.port)
        } else {
            write!(f, "{}:{}", self.host, self.port)
        }
    }
}
