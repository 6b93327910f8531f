//! Error types for cadmesh-io.

use cadmesh_core::FaceError;
use thiserror::Error;

/// Result type for cadmesh-io operations.
pub type Result<T> = std::result::Result<T, IoError>;

/// Errors that can occur while encoding or decoding mesh containers.
#[derive(Debug, Error)]
pub enum IoError {
    /// Malformed container structure.
    #[error("parse error: {message}")]
    ParseError {
        /// Error message.
        message: String,
        /// Byte offset where the error occurred.
        offset: Option<usize>,
    },

    /// Invalid data in the document or its buffers.
    #[error("invalid data: {0}")]
    InvalidData(String),

    /// Missing required data.
    #[error("missing required: {0}")]
    MissingRequired(String),

    /// Unsupported feature, version or input format.
    #[error("unsupported: {0}")]
    Unsupported(String),

    /// A triangle points at a face outside the face list.
    #[error("triangle {triangle} refers to face {value}, but only {face_count} faces exist")]
    Alignment {
        triangle: usize,
        value: u32,
        face_count: usize,
    },

    /// A recognized face record is malformed.
    #[error(transparent)]
    Face(#[from] FaceError),

    /// I/O error.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization error.
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

impl IoError {
    /// Create a parse error at a byte offset.
    pub fn parse_at(message: impl Into<String>, offset: usize) -> Self {
        Self::ParseError {
            message: message.into(),
            offset: Some(offset),
        }
    }
}
