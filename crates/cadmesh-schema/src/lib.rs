//! cadmesh-schema: the `TM_brep_faces` JSON schema.
//!
//! The schema is authored as a set of small fragments that point at each
//! other with `$ref`. This crate loads those fragments ([`SchemaStore`]),
//! inlines every reference into one self-contained document ([`Resolver`]),
//! and validates extension payloads against the result ([`SchemaValidator`]).
//!
//! The resolved document is also checked in as [`BUNDLED_SCHEMA`]; the
//! `cadmesh-build-schema` binary (enabled by the `cli` feature) regenerates it.
//!
//! ```
//! use cadmesh_schema::SchemaValidator;
//! use serde_json::json;
//!
//! let validator = SchemaValidator::bundled()?;
//! let payload = json!({ "faceIndices": 1, "faces": [null] });
//! assert!(validator.validate_extension(&payload).is_ok());
//! # Ok::<(), cadmesh_schema::ResolveError>(())
//! ```

pub mod bundled;
pub mod error;
pub mod resolver;
pub mod store;
pub mod validate;

pub use bundled::{BUNDLED_SCHEMA, FRAGMENTS, ROOT_FRAGMENT};
pub use error::{ResolveError, Result, ValidationError, ValidationErrors};
pub use resolver::{
    is_resolved, resolve_bundled, resolve_pointer, ResolveOptions, Resolver, DEFAULT_MAX_DEPTH,
};
pub use store::SchemaStore;
pub use validate::SchemaValidator;
