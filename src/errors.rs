use std::path::PathBuf;
use thiserror::Error;

/// Structured error types for the image search.
///
/// Fatal variants (`Configuration`, `InvalidSearchPath`, `Model`) stop the run
/// and map to an exit code through [`SearchError::exit_code`]. `Detection` is
/// the per-image failure the searcher reports and skips; `Extraction` is
/// downgraded to "no detections" by the label matcher.
#[derive(Error, Debug)]
pub enum SearchError {
    #[error("Configuration error: {message}")]
    Configuration { message: String },

    #[error("Path not found or not a directory: {}", .path.display())]
    InvalidSearchPath { path: PathBuf },

    #[error("Model error: {operation} failed")]
    Model {
        operation: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    #[error("{operation} failed: {source}")]
    Detection {
        path: PathBuf,
        operation: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    #[error("Malformed detection output: {reason}")]
    Extraction { reason: String },

    #[error("Filesystem error: {operation} failed for {path:?}")]
    Io {
        path: PathBuf,
        operation: String,
        #[source]
        source: std::io::Error,
    },
}

pub type Result<T> = std::result::Result<T, SearchError>;

impl SearchError {
    pub(crate) fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    pub(crate) fn model(
        operation: impl Into<String>,
        source: impl Into<Box<dyn std::error::Error + Send + Sync>>,
    ) -> Self {
        Self::Model {
            operation: operation.into(),
            source: source.into(),
        }
    }

    pub(crate) fn detection(
        path: impl Into<PathBuf>,
        operation: impl Into<String>,
        source: impl Into<Box<dyn std::error::Error + Send + Sync>>,
    ) -> Self {
        Self::Detection {
            path: path.into(),
            operation: operation.into(),
            source: source.into(),
        }
    }

    /// Process exit code for an error that ends the run.
    ///
    /// Configuration and input-path problems share the usage-error code `2`;
    /// everything else is a generic failure.
    pub const fn exit_code(&self) -> u8 {
        match self {
            Self::Configuration { .. } | Self::InvalidSearchPath { .. } => 2,
            _ => 1,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fatal_input_errors_use_usage_exit_code() {
        let config = SearchError::configuration("YOLO_LABELS not configured");
        let path = SearchError::InvalidSearchPath {
            path: PathBuf::from("/nowhere"),
        };

        assert_eq!(config.exit_code(), 2);
        assert_eq!(path.exit_code(), 2);
    }

    #[test]
    fn test_model_error_is_generic_failure() {
        let err = SearchError::model(
            "load model",
            std::io::Error::new(std::io::ErrorKind::NotFound, "missing"),
        );
        assert_eq!(err.exit_code(), 1);
    }

    #[test]
    fn test_detection_error_message_includes_cause() {
        let err = SearchError::detection(
            "a.jpg",
            "decode image",
            std::io::Error::new(std::io::ErrorKind::InvalidData, "truncated file"),
        );
        assert_eq!(err.to_string(), "decode image failed: truncated file");
    }
}
