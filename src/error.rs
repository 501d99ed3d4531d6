use thiserror::Error;

/// Flight recorder error types
#[derive(Error, Debug)]
pub enum RecorderError {
    #[error("Session already running")]
    AlreadyRunning,

    #[error("Session not running")]
    NotRunning,

    #[error("Invalid parameters: {0}")]
    InvalidParameters(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type for recorder operations
pub type RecorderResult<T> = Result<T, RecorderError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        assert_eq!(
            RecorderError::AlreadyRunning.to_string(),
            "Session already running"
        );
        assert_eq!(
            RecorderError::InvalidParameters("window_ms must be positive".to_string()).to_string(),
            "Invalid parameters: window_ms must be positive"
        );
    }

    #[test]
    fn test_io_conversion() {
        fn open_missing() -> RecorderResult<std::fs::File> {
            Ok(std::fs::File::open("/definitely/not/here.json")?)
        }

        assert!(matches!(open_missing(), Err(RecorderError::Io(_))));
    }
}
