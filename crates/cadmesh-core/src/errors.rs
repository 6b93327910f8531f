//! Error types for face records.

use thiserror::Error;

/// Result type for face parsing operations.
pub type Result<T> = std::result::Result<T, FaceError>;

/// Errors raised while reading an analytical face record.
///
/// A record without a recognized `type` is never an error; it parses to
/// `None`. These variants only fire once a record has declared a surface
/// kind and thereby committed to that kind's fields.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum FaceError {
    #[error("face {face_index}: missing required field '{field}'")]
    MissingField {
        field: &'static str,
        face_index: usize,
    },

    #[error("face {face_index}: invalid field '{field}': {reason}")]
    InvalidField {
        field: &'static str,
        face_index: usize,
        reason: String,
    },

    #[error("face {face_index}: field '{field}' is not a unit vector (norm {norm})")]
    NotUnit {
        field: &'static str,
        face_index: usize,
        norm: f64,
    },

    #[error("unknown surface type: {0}")]
    UnknownType(String),
}

impl FaceError {
    /// The field this error refers to, if any.
    pub fn field(&self) -> Option<&'static str> {
        match self {
            FaceError::MissingField { field, .. }
            | FaceError::InvalidField { field, .. }
            | FaceError::NotUnit { field, .. } => Some(field),
            FaceError::UnknownType(_) => None,
        }
    }

    /// The face index this error refers to, if any.
    pub fn face_index(&self) -> Option<usize> {
        match self {
            FaceError::MissingField { face_index, .. }
            | FaceError::InvalidField { face_index, .. }
            | FaceError::NotUnit { face_index, .. } => Some(*face_index),
            FaceError::UnknownType(_) => None,
        }
    }
}
