//! Error types for annotation synchronization and backend access.

use thiserror::Error;

/// Errors surfaced by the annotation client.
#[derive(Error, Debug)]
pub enum AnnotatorError {
    /// Transport-level HTTP failure (connection, timeout, bad URL).
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON serialization or deserialization failure.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// The backend answered with a non-success status code.
    #[error("backend returned {status}: {message}")]
    Backend { status: u16, message: String },

    /// Geometry payload is not a JSON object or cannot be parsed.
    #[error("invalid geometry: {message}")]
    InvalidGeometry { message: String },

    /// A required field was absent from a payload.
    #[error("missing required field: {field}")]
    MissingField { field: String },

    /// User-supplied input could not be interpreted.
    #[error("invalid input: {message}")]
    InvalidInput { message: String },

    /// The drawing widget could not be created.
    #[error("drawing widget is not available")]
    WidgetUnavailable,

    /// An operation was requested before the adapter was initialized.
    #[error("annotation adapter is not initialized")]
    NotInitialized,
}

impl AnnotatorError {
    pub fn backend(status: u16, message: impl Into<String>) -> Self {
        Self::Backend {
            status,
            message: message.into(),
        }
    }

    pub fn invalid_geometry(message: impl Into<String>) -> Self {
        Self::InvalidGeometry {
            message: message.into(),
        }
    }

    pub fn missing_field(field: impl Into<String>) -> Self {
        Self::MissingField {
            field: field.into(),
        }
    }

    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::InvalidInput {
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backend_error_message_includes_status() {
        let err = AnnotatorError::backend(503, "unavailable");
        assert_eq!(err.to_string(), "backend returned 503: unavailable");
    }

    #[test]
    fn missing_field_names_the_field() {
        let err = AnnotatorError::missing_field("geometry");
        assert!(err.to_string().contains("geometry"));
    }
}
