//! The heartbeat daemon's driving logic: three subphases run strictly in
//! sequence on every tick of a single scheduler, replacing the ad hoc
//! independently-ticking background loops this crate inherited.
//!
//! - [`builder`] — picks ready cards and dispatches agent runs
//! - [`synthesizer`] — merges branch-verified cards, re-verifies via Gate 2
//! - [`daily`] — once-a-day housekeeping: retries, worktree GC, digests, PRs
//! - [`scheduler`] — the single ticker that serialises the three above

pub mod builder;
pub mod daily;
pub mod github_draft;
pub mod scheduler;
pub mod synthesizer;

pub use builder::{Builder, BuilderReport};
pub use daily::{Daily, DailyReport, DraftPrPreparer, NoOpDraftPrPreparer};
pub use github_draft::GitHubDraftPrPreparer;
pub use scheduler::HeartbeatScheduler;
pub use synthesizer::{Synthesizer, SynthesizerReport};
