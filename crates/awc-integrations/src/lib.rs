//! External service integrations. Narrowed to the one surface the Daily
//! driver needs — opening a draft pull request on GitHub for a
//! merge-verified card.

pub mod github;
pub mod types;
