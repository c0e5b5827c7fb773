//! Sorted set error types
//!
//! Error codes:
//! - SPILL_IO_ERROR (Io) - a read or write against the backing file failed
//! - SPILL_VERIFY_FAILED (Verification) - persisted file did not match what was written
//! - SPILL_REQUIRES_LOAD (IllegalState) - mutation attempted while persisted
//! - SPILL_INDETERMINATE_SIZE (IllegalState) - size() on a persisted subset
//! - SPILL_NO_HANDLER (IllegalState) - persist() with no handler assigned
//! - SPILL_INVALID_RANGE (IllegalState) - subset bounds out of order
//! - SPILL_INVALID_INPUT (IllegalState) - direct persist fed unsorted input
//! - SPILL_NOT_FOUND (NotFound) - first()/last() on an empty set

use std::fmt;

use super::handler::HandlerError;

/// Classification of sorted set failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// Persisted file failed post-write verification
    Verification,
    /// Underlying stream failure
    Io,
    /// Programmer error, never recoverable by retrying
    IllegalState,
    /// Expected empty signal, not a failure
    NotFound,
}

impl ErrorCategory {
    /// Returns the string representation
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCategory::Verification => "VERIFICATION",
            ErrorCategory::Io => "IO",
            ErrorCategory::IllegalState => "ILLEGAL_STATE",
            ErrorCategory::NotFound => "NOT_FOUND",
        }
    }
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Sorted set error codes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortedSetErrorCode {
    /// Stream read/write failure
    SpillIoError,
    /// Post-write verification failed
    SpillVerifyFailed,
    /// Mutation while persisted
    SpillRequiresLoad,
    /// Exact size unavailable for a persisted subset
    SpillIndeterminateSize,
    /// No handler to persist to
    SpillNoHandler,
    /// Subset lower bound above upper bound
    SpillInvalidRange,
    /// Direct persistence input was not strictly ascending
    SpillInvalidInput,
    /// Empty (sub)set
    SpillNotFound,
}

impl SortedSetErrorCode {
    /// Returns the string code
    pub fn code(&self) -> &'static str {
        match self {
            SortedSetErrorCode::SpillIoError => "SPILL_IO_ERROR",
            SortedSetErrorCode::SpillVerifyFailed => "SPILL_VERIFY_FAILED",
            SortedSetErrorCode::SpillRequiresLoad => "SPILL_REQUIRES_LOAD",
            SortedSetErrorCode::SpillIndeterminateSize => "SPILL_INDETERMINATE_SIZE",
            SortedSetErrorCode::SpillNoHandler => "SPILL_NO_HANDLER",
            SortedSetErrorCode::SpillInvalidRange => "SPILL_INVALID_RANGE",
            SortedSetErrorCode::SpillInvalidInput => "SPILL_INVALID_INPUT",
            SortedSetErrorCode::SpillNotFound => "SPILL_NOT_FOUND",
        }
    }

    /// Returns the category for this code
    pub fn category(&self) -> ErrorCategory {
        match self {
            SortedSetErrorCode::SpillIoError => ErrorCategory::Io,
            SortedSetErrorCode::SpillVerifyFailed => ErrorCategory::Verification,
            SortedSetErrorCode::SpillRequiresLoad
            | SortedSetErrorCode::SpillIndeterminateSize
            | SortedSetErrorCode::SpillNoHandler
            | SortedSetErrorCode::SpillInvalidRange
            | SortedSetErrorCode::SpillInvalidInput => ErrorCategory::IllegalState,
            SortedSetErrorCode::SpillNotFound => ErrorCategory::NotFound,
        }
    }
}

impl fmt::Display for SortedSetErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// Sorted set error with full context
#[derive(Debug)]
pub struct SortedSetError {
    code: SortedSetErrorCode,
    message: String,
    details: Option<String>,
    source: Option<HandlerError>,
}

impl SortedSetError {
    fn new(code: SortedSetErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            details: None,
            source: None,
        }
    }

    /// Stream failure with the underlying handler error
    pub fn io_error(message: impl Into<String>, source: HandlerError) -> Self {
        Self {
            source: Some(source),
            ..Self::new(SortedSetErrorCode::SpillIoError, message)
        }
    }

    /// Verification failure without an underlying stream error
    pub fn verify_failed(message: impl Into<String>) -> Self {
        Self::new(SortedSetErrorCode::SpillVerifyFailed, message)
    }

    /// Verification failure caused by a stream error while re-reading
    pub fn verify_failed_with(message: impl Into<String>, source: HandlerError) -> Self {
        Self {
            source: Some(source),
            ..Self::new(SortedSetErrorCode::SpillVerifyFailed, message)
        }
    }

    /// Mutation attempted on a persisted set
    pub fn requires_load(operation: &str) -> Self {
        Self {
            details: Some(format!("operation: {}", operation)),
            ..Self::new(
                SortedSetErrorCode::SpillRequiresLoad,
                "Cannot modify a persisted sorted set. Please call load() first.",
            )
        }
    }

    /// size() requested on a persisted subset
    pub fn indeterminate_size() -> Self {
        Self::new(
            SortedSetErrorCode::SpillIndeterminateSize,
            "Unable to determine size of a subset of a persisted set. Please call load() first.",
        )
    }

    /// persist() without a handler
    pub fn no_handler() -> Self {
        Self::new(
            SortedSetErrorCode::SpillNoHandler,
            "No file handler assigned to persist to",
        )
    }

    /// Subset bounds out of order
    pub fn invalid_range(message: impl Into<String>) -> Self {
        Self::new(SortedSetErrorCode::SpillInvalidRange, message)
    }

    /// Unsorted or duplicated input for direct persistence
    pub fn invalid_input(position: u64) -> Self {
        Self {
            details: Some(format!("element: {}", position)),
            ..Self::new(
                SortedSetErrorCode::SpillInvalidInput,
                "Input is not strictly ascending under the set's comparator",
            )
        }
    }

    /// Empty (sub)set
    pub fn not_found(operation: &str) -> Self {
        Self {
            details: Some(format!("operation: {}", operation)),
            ..Self::new(SortedSetErrorCode::SpillNotFound, "No such element")
        }
    }

    /// Returns the error code
    pub fn code(&self) -> SortedSetErrorCode {
        self.code
    }

    /// Returns the error category
    pub fn category(&self) -> ErrorCategory {
        self.code.category()
    }

    /// Returns the error message
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Returns additional error details
    pub fn details(&self) -> Option<&str> {
        self.details.as_deref()
    }

    /// Returns whether this is the expected empty signal
    pub fn is_not_found(&self) -> bool {
        self.code == SortedSetErrorCode::SpillNotFound
    }

    /// Returns whether this signals misuse of the API rather than a storage fault
    pub fn is_illegal_state(&self) -> bool {
        self.category() == ErrorCategory::IllegalState
    }
}

impl fmt::Display for SortedSetError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}] {}: {}",
            self.code.category(),
            self.code.code(),
            self.message
        )?;
        if let Some(ref details) = self.details {
            write!(f, " ({})", details)?;
        }
        Ok(())
    }
}

impl std::error::Error for SortedSetError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.source
            .as_ref()
            .map(|e| e as &(dyn std::error::Error + 'static))
    }
}

/// Result type for sorted set operations
pub type SortedSetResult<T> = Result<T, SortedSetError>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error;
    use std::io;

    #[test]
    fn test_error_codes() {
        assert_eq!(SortedSetErrorCode::SpillIoError.code(), "SPILL_IO_ERROR");
        assert_eq!(SortedSetErrorCode::SpillVerifyFailed.code(), "SPILL_VERIFY_FAILED");
        assert_eq!(SortedSetErrorCode::SpillRequiresLoad.code(), "SPILL_REQUIRES_LOAD");
        assert_eq!(SortedSetErrorCode::SpillNotFound.code(), "SPILL_NOT_FOUND");
    }

    #[test]
    fn test_categories() {
        assert_eq!(SortedSetErrorCode::SpillIoError.category(), ErrorCategory::Io);
        assert_eq!(
            SortedSetErrorCode::SpillVerifyFailed.category(),
            ErrorCategory::Verification
        );
        assert_eq!(
            SortedSetErrorCode::SpillIndeterminateSize.category(),
            ErrorCategory::IllegalState
        );
        assert_eq!(SortedSetErrorCode::SpillNotFound.category(), ErrorCategory::NotFound);
    }

    #[test]
    fn test_not_found_is_distinct() {
        let err = SortedSetError::not_found("first");
        assert!(err.is_not_found());
        assert!(!err.is_illegal_state());

        let err = SortedSetError::requires_load("insert");
        assert!(!err.is_not_found());
        assert!(err.is_illegal_state());
    }

    #[test]
    fn test_display_contains_code_and_details() {
        let err = SortedSetError::requires_load("remove");
        let display = err.to_string();
        assert!(display.contains("ILLEGAL_STATE"));
        assert!(display.contains("SPILL_REQUIRES_LOAD"));
        assert!(display.contains("load()"));
        assert!(display.contains("operation: remove"));
    }

    #[test]
    fn test_source_is_exposed() {
        let err = SortedSetError::io_error(
            "Unable to read file",
            HandlerError::Io(io::Error::new(io::ErrorKind::Other, "disk gone")),
        );
        assert!(err.source().is_some());
        assert!(SortedSetError::no_handler().source().is_none());
    }
}
