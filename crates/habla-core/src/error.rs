//! Unified error types for the speech service.

/// Main error type for synthesis operations.
#[derive(Debug, thiserror::Error)]
pub enum TtsError {
    /// Invalid input provided by the caller (never retried by the service).
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// The scheduler queue is full; the caller may retry with backoff.
    #[error("synthesis queue is full (capacity {capacity})")]
    Overload { capacity: usize },

    /// A job exceeded its deadline while queued or running.
    #[error("synthesis timed out after {ms}ms")]
    Timeout { ms: u64 },

    /// Model inference failed at runtime (e.g. out of memory).
    #[error("inference error: {0}")]
    Inference(String),

    /// Model weights could not be resolved or loaded.
    #[error("model load failed for {source_id}: {reason}")]
    ModelLoad { source_id: String, reason: String },

    /// The service can no longer serve requests until restarted.
    #[error("service unavailable: {0}")]
    Unavailable(String),

    /// Unrecognized target audio format.
    #[error("unsupported audio format: {0}")]
    UnsupportedFormat(String),

    /// Configuration error detected at startup.
    #[error("configuration error: {0}")]
    Config(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Internal error (should not happen in normal operation).
    #[error("internal error: {0}")]
    Internal(String),
}

/// Convenience type alias for Results with TtsError.
pub type TtsResult<T> = Result<T, TtsError>;

impl TtsError {
    /// Create an invalid input error with message.
    pub fn invalid_input(msg: impl Into<String>) -> Self {
        Self::InvalidInput(msg.into())
    }

    /// Create an inference error with message.
    pub fn inference(msg: impl Into<String>) -> Self {
        Self::Inference(msg.into())
    }

    /// Create a model load error.
    pub fn model_load(source_id: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::ModelLoad {
            source_id: source_id.into(),
            reason: reason.into(),
        }
    }

    /// Create an unavailable error with message.
    pub fn unavailable(msg: impl Into<String>) -> Self {
        Self::Unavailable(msg.into())
    }

    /// Create a config error with message.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create an internal error with message.
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    /// Fatal errors mark the scheduler unhealthy: the process cannot recover
    /// without an external restart (model reload is too expensive to retry
    /// in-process).
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::ModelLoad { .. } | Self::Unavailable(_))
    }

    /// Whether the caller may reasonably retry with backoff.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Overload { .. } | Self::Timeout { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = TtsError::invalid_input("empty text");
        assert_eq!(err.to_string(), "invalid input: empty text");

        let err = TtsError::Timeout { ms: 5000 };
        assert_eq!(err.to_string(), "synthesis timed out after 5000ms");

        let err = TtsError::Overload { capacity: 16 };
        assert_eq!(err.to_string(), "synthesis queue is full (capacity 16)");
    }

    #[test]
    fn test_fatal_classification() {
        assert!(TtsError::model_load("models/es", "missing weights").is_fatal());
        assert!(TtsError::unavailable("device lost").is_fatal());
        assert!(!TtsError::inference("nan in output").is_fatal());
        assert!(!TtsError::invalid_input("too long").is_fatal());
    }

    #[test]
    fn test_retryable_classification() {
        assert!(TtsError::Overload { capacity: 8 }.is_retryable());
        assert!(TtsError::Timeout { ms: 100 }.is_retryable());
        assert!(!TtsError::inference("oom").is_retryable());
    }
}
