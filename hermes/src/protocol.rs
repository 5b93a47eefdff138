//! Wire protocol shared by the relay, agents and subscriber sessions.
//! One JSON object per text frame: `{"event": "<tag>", "data": {...}}`. `Envelope` is the closed set of known tags plus `Unknown`.

mod envelope;
pub use envelope::{Envelope, SensorId};

mod event;
pub use event::EventKind;
