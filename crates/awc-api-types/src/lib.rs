//! Shared wire types for the event bus and HTTP API: the response envelope,
//! the closed set of server-emitted event frames, and the client frames the
//! duplex channel accepts. Kept dependency-free of the core/queue crates so
//! it can be shared by the bus, the drivers, and (eventually) any other
//! process that needs to speak the wire protocol without pulling in
//! persistence.

pub mod envelope;
pub mod event;

pub use envelope::{ApiEnvelope, ApiErrorBody};
pub use event::{ClientFrame, ServerEvent};
