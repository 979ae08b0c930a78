use chrono::{DateTime, Utc};
use thiserror::Error;

/// The error taxonomy shared across every crate in the workspace.
///
/// Each crate keeps its own `thiserror` leaf enum for its internal concerns
/// (`StoreError`, `WorktreeManagerError`, …) but converts into this type at
/// its public boundary, so a single HTTP-facing error type sits above all of
/// them.
#[derive(Debug, Error)]
pub enum CoreError {
    /// The caller supplied a malformed or out-of-range argument.
    #[error("validation failed: {0}")]
    Validation(String),

    /// No entity with the given id/criteria exists.
    #[error("not found: {0}")]
    NotFound(String),

    /// An optimistic-lock (`ifUpdatedAt`) mismatch, or a uniqueness violation.
    #[error("conflict: {message}")]
    Conflict {
        message: String,
        current_updated_at: Option<DateTime<Utc>>,
    },

    /// The operation can't proceed because a resource is at capacity
    /// (concurrency cap, rate limit).
    #[error("busy: {0}")]
    Busy(String),

    /// A bounded operation exceeded its deadline.
    #[error("timeout: {0}")]
    Timeout(String),

    /// A dependency outside the process failed (git, a gate command, GitHub).
    #[error("external error: {0}")]
    External(String),

    /// An invariant was violated, or an unexpected internal failure occurred.
    #[error("internal error: {0}")]
    Internal(String),
}

impl CoreError {
    pub fn conflict(message: impl Into<String>, current_updated_at: DateTime<Utc>) -> Self {
        CoreError::Conflict {
            message: message.into(),
            current_updated_at: Some(current_updated_at),
        }
    }

    /// Stable tag used on the wire (HTTP error envelope, audit log).
    pub fn kind(&self) -> &'static str {
        match self {
            CoreError::Validation(_) => "validation",
            CoreError::NotFound(_) => "not_found",
            CoreError::Conflict { .. } => "conflict",
            CoreError::Busy(_) => "busy",
            CoreError::Timeout(_) => "timeout",
            CoreError::External(_) => "external",
            CoreError::Internal(_) => "internal",
        }
    }
}

impl From<tokio_rusqlite::Error> for CoreError {
    fn from(e: tokio_rusqlite::Error) -> Self {
        CoreError::Internal(e.to_string())
    }
}

impl From<rusqlite::Error> for CoreError {
    fn from(e: rusqlite::Error) -> Self {
        CoreError::Internal(e.to_string())
    }
}

impl From<std::io::Error> for CoreError {
    fn from(e: std::io::Error) -> Self {
        CoreError::External(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn conflict_carries_current_updated_at() {
        let now = Utc::now();
        let err = CoreError::conflict("stale update", now);
        match err {
            CoreError::Conflict {
                current_updated_at, ..
            } => assert_eq!(current_updated_at, Some(now)),
            _ => panic!("expected Conflict"),
        }
    }

    #[test]
    fn kind_tags_match_variant() {
        assert_eq!(CoreError::Validation("x".into()).kind(), "validation");
        assert_eq!(CoreError::NotFound("x".into()).kind(), "not_found");
        assert_eq!(CoreError::Busy("x".into()).kind(), "busy");
        assert_eq!(CoreError::Timeout("x".into()).kind(), "timeout");
        assert_eq!(CoreError::External("x".into()).kind(), "external");
        assert_eq!(CoreError::Internal("x".into()).kind(), "internal");
    }
}
