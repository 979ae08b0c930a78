//! GitHub integration, narrowed to the single surface the Daily driver
//! needs: opening a draft pull request for a merge-verified card.

pub mod client;
pub mod pull_requests;
