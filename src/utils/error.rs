//! Error types for mediacore
//!
//! This module defines the error taxonomy used throughout the pipeline core.
//! We use thiserror for convenient error type definitions. Flow-control
//! conditions (needs-input, end-of-stream) are not errors and are modeled
//! as `ReadResult` variants on the decoder adapter instead.

use thiserror::Error;

/// Main error type for mediacore
#[derive(Error, Debug)]
pub enum MediaCoreError {
    /// Unrecognized codec, pixel or sample format; non-retryable
    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),

    /// Missing or invalid required configuration (e.g. codec header bytes)
    #[error("Bad parameter: {0}")]
    BadParameter(String),

    /// Allocation failure in the underlying engine; caller may retry later
    #[error("Resource exhausted: {0}")]
    ResourceExhausted(String),

    /// Transient backpressure on write; drain via read() and retry
    #[error("Resource busy: engine cannot accept more input right now")]
    ResourceBusy,

    /// Fatal decode failure; the adapter instance must be recreated
    #[error("Decode error: {0}")]
    DecodeError(String),

    /// Reorder queue release ordering broken by upstream timestamps
    #[error("Timestamp order violation: pts {pts} after {last}")]
    TimestampOrderViolation {
        /// Presentation time of the offending frame
        pts: i64,

        /// Presentation time last released by the queue
        last: i64,
    },

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// File I/O errors
    #[error("File error: {0}")]
    FileIO(#[from] std::io::Error),

    /// Generic error for unexpected situations
    #[error("Internal error: {0}")]
    Internal(String),
}

impl MediaCoreError {
    /// Create a decode error from string
    pub fn decode_error<S: Into<String>>(msg: S) -> Self {
        MediaCoreError::DecodeError(msg.into())
    }

    /// Whether the error is a transient condition the caller should retry
    /// after draining, rather than a failure
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            MediaCoreError::ResourceBusy | MediaCoreError::ResourceExhausted(_)
        )
    }
}

/// Convenience type alias for Results in mediacore
pub type Result<T> = std::result::Result<T, MediaCoreError>;

/// Extension trait for converting other errors to MediaCoreError
pub trait IntoCoreError<T> {
    /// Convert this error into a decode error with the given context
    fn decode_err(self, context: &str) -> Result<T>;
    fn config_err(self, context: &str) -> Result<T>;
    fn param_err(self, context: &str) -> Result<T>;
}

impl<T, E: std::fmt::Display> IntoCoreError<T> for std::result::Result<T, E> {
    fn decode_err(self, context: &str) -> Result<T> {
        self.map_err(|e| MediaCoreError::DecodeError(format!("{}: {}", context, e)))
    }

    fn config_err(self, context: &str) -> Result<T> {
        self.map_err(|e| MediaCoreError::Config(format!("{}: {}", context, e)))
    }

    fn param_err(self, context: &str) -> Result<T> {
        self.map_err(|e| MediaCoreError::BadParameter(format!("{}: {}", context, e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = MediaCoreError::UnsupportedFormat("pcm_alaw".to_string());
        assert_eq!(err.to_string(), "Unsupported format: pcm_alaw");

        let err = MediaCoreError::TimestampOrderViolation { pts: 100, last: 200 };
        assert_eq!(err.to_string(), "Timestamp order violation: pts 100 after 200");
    }

    #[test]
    fn test_error_conversion() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "File not found");
        let core_err: MediaCoreError = io_err.into();
        assert!(matches!(core_err, MediaCoreError::FileIO(_)));
    }

    #[test]
    fn test_transient_classification() {
        assert!(MediaCoreError::ResourceBusy.is_transient());
        assert!(MediaCoreError::ResourceExhausted("no surfaces".into()).is_transient());
        assert!(!MediaCoreError::DecodeError("codec not opened".into()).is_transient());
    }

    #[test]
    fn test_into_core_error_trait() {
        let result: std::result::Result<(), &str> = Err("session died");
        let converted = result.decode_err("Submitting packet");

        match converted {
            Err(MediaCoreError::DecodeError(msg)) => {
                assert_eq!(msg, "Submitting packet: session died");
            }
            _ => panic!("Expected DecodeError"),
        }
    }
}
