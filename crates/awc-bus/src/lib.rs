//! The event bus and HTTP API: a single authenticated surface pairing
//! request/response REST endpoints with a duplex event stream, per the
//! system's C6 component.
//!
//! - [`auth`] — bearer-token middleware (header or `?token=` query param)
//! - [`api_error`] — maps [`awc_core::error::CoreError`] onto HTTP status
//! - [`event_bus`] — pub/sub fan-out of [`awc_api_types::ServerEvent`]
//! - [`sink`] — wires the orchestrator's `EventSink` onto the event bus
//! - [`workspace_action`] — parses `:::action` blocks out of chat replies
//! - [`state`] — the shared `ApiState` every route handler receives
//! - [`routes`] — one module per resource family
//! - [`router`] — assembles all of the above into one `axum::Router`

pub mod api_error;
pub mod auth;
pub mod event_bus;
pub mod router;
pub mod routes;
pub mod sink;
pub mod state;
pub mod workspace_action;

pub use router::build_router;
pub use state::ApiState;
