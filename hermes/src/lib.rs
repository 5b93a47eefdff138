pub mod agent;
pub mod broker;
pub mod constants;
pub mod protocol;
pub mod session;
pub mod transport;
pub mod utils;

// Re-export core types at the top level for easy access
pub use agent::{Agent, Sensor};
pub use broker::{Broker, RelayServer};
pub use protocol::{Envelope, EventKind, SensorId};
pub use session::{Session, SessionConfig, SessionState};
pub use utils::{ConnectionHandle, HermesError, OrError};
