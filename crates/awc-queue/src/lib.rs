//! Kanban / work-queue service: priority card selection, the card lifecycle
//! state machine, and optimistic-locking passthroughs onto the persistence
//! core.

pub mod board;
pub mod queue;
pub mod selection;

pub use board::Board;
pub use queue::WorkQueue;
