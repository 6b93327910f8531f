//! Error types for schema resolution and validation.

use std::fmt;
use std::path::PathBuf;

use thiserror::Error;

/// Result type for schema resolution.
pub type Result<T> = std::result::Result<T, ResolveError>;

/// Errors raised while loading fragments or inlining `$ref`s.
#[derive(Debug, Error)]
pub enum ResolveError {
    #[error("unknown schema fragment '{fragment}' in $ref '{reference}'")]
    UnknownFragment { fragment: String, reference: String },

    #[error("segment '{segment}' not found while following $ref '{reference}'")]
    MissingSegment { reference: String, segment: String },

    #[error("invalid $ref: {0}")]
    InvalidRef(String),

    #[error("circular $ref: {}", .chain.join(" -> "))]
    Cycle { chain: Vec<String> },

    #[error("$ref nesting exceeds {max_depth} levels at '{reference}'")]
    DepthExceeded { reference: String, max_depth: usize },

    #[error("failed to read {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse {}: {source}", .path.display())]
    Json {
        path: PathBuf,
        source: serde_json::Error,
    },
}

impl ResolveError {
    /// A `$ref` target (fragment or pointer segment) does not exist.
    pub fn is_reference_error(&self) -> bool {
        matches!(
            self,
            ResolveError::UnknownFragment { .. }
                | ResolveError::MissingSegment { .. }
                | ResolveError::InvalidRef(_)
        )
    }

    /// Resolution would not terminate.
    pub fn is_cycle(&self) -> bool {
        matches!(
            self,
            ResolveError::Cycle { .. } | ResolveError::DepthExceeded { .. }
        )
    }
}

/// One schema violation found in an instance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    /// JSON pointer into the instance, `""` for the root.
    pub path: String,
    pub message: String,
    /// The face the violation belongs to, when it is inside a face record.
    pub face_index: Option<usize>,
}

impl ValidationError {
    /// The last path segment, usually the offending field name.
    pub fn field(&self) -> Option<&str> {
        self.path.rsplit('/').next().filter(|s| !s.is_empty())
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let path = if self.path.is_empty() { "/" } else { &self.path };
        match self.face_index {
            Some(face) => write!(f, "face {face} at {path}: {}", self.message),
            None => write!(f, "{path}: {}", self.message),
        }
    }
}

/// All violations found in one validation pass.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("schema validation failed: {}", join(.errors))]
pub struct ValidationErrors {
    pub errors: Vec<ValidationError>,
}

impl ValidationErrors {
    pub fn iter(&self) -> impl Iterator<Item = &ValidationError> {
        self.errors.iter()
    }

    pub fn len(&self) -> usize {
        self.errors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    /// Whether any violation is located at a path ending in `field`.
    pub fn mentions(&self, field: &str) -> bool {
        self.errors.iter().any(|e| e.field() == Some(field))
    }
}

fn join(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}
