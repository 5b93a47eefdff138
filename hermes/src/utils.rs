mod common;
pub use common::ConnectionHandle;

mod error;
pub use error::{HermesError, OrError};

mod logging;
pub use logging::init_tracing;
