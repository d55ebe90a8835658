//! Error types for the Studykit client.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A shared error type for the entire Studykit client.
///
/// This provides typed, structured error variants with automatic conversion
/// from common error types via the `From` trait.
#[derive(Error, Debug, Clone, Serialize, Deserialize)]
pub enum StudykitError {
    /// No file in a selection carried an allowed extension.
    #[error("No valid files selected; supported types are DOCX, PPTX, PDF, DOC and PPT")]
    NoValidFiles,

    /// A mimic run was started without a document or a parsed exam path.
    #[error("No input: upload a document or provide a parsed exam directory")]
    NoInput,

    /// Input validation failure. Reported inline to the user, never logged
    /// to the session, and never changes the session step.
    #[error("Validation error: {0}")]
    Validation(String),

    /// Non-success response from the generation backend. `detail` carries
    /// the backend's structured error string when one was present, or a
    /// plain status description otherwise.
    #[error("Backend error: {detail}")]
    Remote {
        status: Option<u16>,
        detail: String,
    },

    /// The backend responded successfully but produced zero items.
    #[error("No items were generated; try different input")]
    EmptyResult,

    /// Transport-level failure on the streaming connection.
    #[error("Stream error: {0}")]
    Stream(String),

    /// IO error (file system operations)
    #[error("IO error: {message}")]
    Io { message: String },

    /// Serialization/deserialization error
    #[error("Serialization error: {format} - {message}")]
    Serialization {
        format: String, // "TOML", "JSON", etc.
        message: String,
    },

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Internal error (should not happen in normal operation)
    #[error("Internal error: {0}")]
    Internal(String),
}

impl StudykitError {
    // ============================================================================
    // Constructor helpers
    // ============================================================================

    /// Creates a Validation error
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    /// Creates a Remote error carrying a structured backend detail
    pub fn remote(status: impl Into<Option<u16>>, detail: impl Into<String>) -> Self {
        Self::Remote {
            status: status.into(),
            detail: detail.into(),
        }
    }

    /// Creates a Remote error from a bare status code, used when the
    /// response body carried no parseable detail
    pub fn remote_status(status: u16) -> Self {
        Self::Remote {
            status: Some(status),
            detail: format!("HTTP error, status: {status}"),
        }
    }

    /// Creates a Stream error
    pub fn stream(message: impl Into<String>) -> Self {
        Self::Stream(message.into())
    }

    /// Creates an IO error
    pub fn io(message: impl Into<String>) -> Self {
        Self::Io {
            message: message.into(),
        }
    }

    /// Creates a Config error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// Creates an Internal error
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }

    /// The message to surface to the user, without the variant prefix.
    /// Remote errors yield the backend's `detail` string verbatim.
    pub fn user_message(&self) -> String {
        match self {
            Self::Remote { detail, .. } => detail.clone(),
            Self::Validation(message)
            | Self::Stream(message)
            | Self::Config(message)
            | Self::Internal(message) => message.clone(),
            other => other.to_string(),
        }
    }

    // ============================================================================
    // Type checking methods
    // ============================================================================

    /// Check if this is a validation-class error (bad file type, missing
    /// input). These are reported inline and never alter session state.
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            Self::NoValidFiles | Self::NoInput | Self::Validation(_)
        )
    }

    /// Check if this is a Remote error
    pub fn is_remote(&self) -> bool {
        matches!(self, Self::Remote { .. })
    }

    /// Check if this is an EmptyResult error
    pub fn is_empty_result(&self) -> bool {
        matches!(self, Self::EmptyResult)
    }

    /// Check if this is a Stream error
    pub fn is_stream(&self) -> bool {
        matches!(self, Self::Stream(_))
    }
}

// ============================================================================
// From implementations for automatic conversion
// ============================================================================

impl From<std::io::Error> for StudykitError {
    fn from(err: std::io::Error) -> Self {
        Self::Io {
            message: format!("{} (kind: {:?})", err, err.kind()),
        }
    }
}

impl From<serde_json::Error> for StudykitError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization {
            format: "JSON".to_string(),
            message: err.to_string(),
        }
    }
}

/// A type alias for `Result<T, StudykitError>`.
pub type Result<T> = std::result::Result<T, StudykitError>;
