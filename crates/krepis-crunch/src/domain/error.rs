//! Domain Model: Search Error Types
//!
//! Failures that abort a search. Property violations found by the search are
//! not errors; they are reported as [`ViolationTrace`](crate::ViolationTrace)
//! data in the final report.

use crate::infrastructure::StorageError;

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Search Error Types
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Fatal search errors
///
/// Every variant aborts the whole search and is returned from
/// [`Crunch::crunch`](crate::Crunch::crunch) as `Err`.
#[derive(Debug, thiserror::Error)]
pub enum SearchError {
    // ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
    // Caller Errors
    // ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

    /// Configuration rejected by validation
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
    // Frontier Storage Errors
    // ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

    /// Disk frontier could not be read or written
    #[error("Frontier storage failed: {0}")]
    Storage(#[from] StorageError),

    // ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
    // Internal Errors
    // ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

    /// A worker thread panicked
    #[error("Worker {worker} panicked: {reason}")]
    WorkerPanicked {
        /// Index of the failed worker
        worker: usize,
        /// Panic payload, when it was a string
        reason: String,
    },

    /// Unexpected failure inside the engine
    #[error("Internal error: {0}")]
    Internal(String),
}

impl SearchError {
    /// Short category label for logs
    pub fn category(&self) -> &'static str {
        match self {
            Self::InvalidConfig(_) => "CONFIG_ERROR",
            Self::Storage(_) => "STORAGE_ERROR",
            Self::WorkerPanicked { .. } | Self::Internal(_) => "INTERNAL_ERROR",
        }
    }
}

/// Result alias for search operations
pub type SearchResult<T> = Result<T, SearchError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_messages() {
        let err = SearchError::WorkerPanicked { worker: 3, reason: "boom".into() };
        assert_eq!(err.to_string(), "Worker 3 panicked: boom");

        let err = SearchError::InvalidConfig("workers must be at least 1".into());
        assert!(err.to_string().contains("workers must be at least 1"));
    }

    #[test]
    fn test_storage_conversion() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "gone");
        let err: SearchError = StorageError::from(io).into();
        assert_eq!(err.category(), "STORAGE_ERROR");
    }
}
