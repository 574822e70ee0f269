//! Error types for Nereus operations.
//!
//! ## Error Philosophy
//!
//! Nereus separates "the answer is empty" from "the answer could not be
//! computed":
//! - Unknown entities, unresolved identifiers and unmatched names are ordinary
//!   return values (`Resolution::NotFound`, `Option::None`, ...), never errors
//! - Store failures (missing, corrupt or unopened database) are errors and
//!   abort the query, so "no impact" is never reported when the real answer
//!   is "couldn't check"
//! - Hitting a depth or size limit is not an error; results carry a
//!   `truncated` flag instead

use thiserror::Error;

/// Result type for Nereus operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Top-level error type for Nereus operations.
///
/// These errors represent infrastructure failures that prevent
/// the operation from completing.
#[derive(Debug, Error)]
pub enum Error {
    /// Database operation failed
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// File system operation failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The graph store could not be opened or is missing its tables
    #[error("graph store unavailable: {0}")]
    StoreUnavailable(String),

    /// Invalid configuration or arguments
    #[error("configuration error: {0}")]
    Config(String),

    /// Snapshot or report (de)serialization failed
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Graph data violates an invariant (duplicate ids, unknown relation type, ...)
    #[error("invalid graph data: {0}")]
    InvalidData(String),

    /// Internal error (lock poisoning, broken invariant)
    #[error("internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Returns `true` if the error means the store could not be queried at all.
    ///
    /// Callers use this to distinguish "couldn't check" from bad input.
    #[must_use]
    pub fn is_store_failure(&self) -> bool {
        matches!(
            self,
            Self::Database(_) | Self::StoreUnavailable(_) | Self::Internal(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn store_failures_are_categorized() {
        assert!(Error::StoreUnavailable("gone".to_string()).is_store_failure());
        assert!(Error::Internal("poisoned".to_string()).is_store_failure());
        assert!(!Error::Config("bad threshold".to_string()).is_store_failure());
        assert!(!Error::InvalidData("dup id".to_string()).is_store_failure());
    }

    #[test]
    fn display_includes_context() {
        let error = Error::StoreUnavailable("no graph database at /tmp/x.db".to_string());
        let display = error.to_string();
        assert!(display.contains("graph store unavailable"));
        assert!(display.contains("/tmp/x.db"));
    }
}
