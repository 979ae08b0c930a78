//! Agent process sessions: a capacity-limited subprocess pool with
//! line-delimited stdout/stderr capture and CLI-variant adapters.
//!
//! Key components:
//! - [`process_pool`] — capacity-limited pool of plain child processes
//! - [`cli_adapter`] — per-CLI spawn conventions and done-marker detection
//! - [`session`] — ties an agent identity to a process handle and adapter

pub mod cli_adapter;
pub mod process_pool;
pub mod session;
