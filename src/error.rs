//! Error types shared across the repositories and storage backends.

use thiserror::Error;

/// Main error type for taskdeck operations.
#[derive(Error, Debug)]
pub enum Error {
    // Lookup failures, raised before any persistence attempt
    #[error("task not found: {0}")]
    TaskNotFound(String),

    #[error("context not found: {0}")]
    ContextNotFound(String),

    #[error("view not found: {0}")]
    ViewNotFound(String),

    // Guard failures, raised before any persistence attempt
    #[error("built-in view cannot be deleted: {0}")]
    BuiltInProtected(String),

    #[error("invalid import payload: {0}")]
    InvalidFormat(String),

    // Persistence failures
    #[error("storage quota exceeded")]
    QuotaExceeded,

    #[error("storage failure: {0}")]
    Storage(String),
}

impl Error {
    /// True for the `NotFound` family regardless of entity kind.
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            Error::TaskNotFound(_) | Error::ContextNotFound(_) | Error::ViewNotFound(_)
        )
    }

    /// True when the underlying persistence layer failed (quota included).
    pub fn is_storage(&self) -> bool {
        matches!(self, Error::Storage(_) | Error::QuotaExceeded)
    }

    /// Wrap an arbitrary persistence-layer failure.
    pub fn storage(err: impl std::fmt::Display) -> Self {
        Error::Storage(err.to_string())
    }
}

impl From<rusqlite::Error> for Error {
    fn from(err: rusqlite::Error) -> Self {
        if let rusqlite::Error::SqliteFailure(e, _) = &err {
            if e.code == rusqlite::ErrorCode::DiskFull {
                return Error::QuotaExceeded;
            }
        }
        Error::storage(err)
    }
}

impl From<reqwest::Error> for Error {
    fn from(err: reqwest::Error) -> Self {
        Error::storage(err)
    }
}

/// Result type alias for taskdeck operations.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_found_classification() {
        assert!(Error::TaskNotFound("t1".into()).is_not_found());
        assert!(Error::ViewNotFound("v1".into()).is_not_found());
        assert!(!Error::QuotaExceeded.is_not_found());
    }

    #[test]
    fn storage_classification() {
        assert!(Error::QuotaExceeded.is_storage());
        assert!(Error::Storage("disk on fire".into()).is_storage());
        assert!(!Error::BuiltInProtected("Inbox".into()).is_storage());
    }
}
