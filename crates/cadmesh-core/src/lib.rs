//! cadmesh-core: analytical BREP surface primitives.
//!
//! A tessellated CAD part can carry, next to its triangles, the exact
//! surface each triangle came from. This crate defines that surface data:
//!
//! - [`Primitive`]: the five analytical surface kinds (plane, cylinder,
//!   cone, sphere, torus). Free-form faces have no primitive.
//! - [`parse_face`] / [`parse_faces`]: reading loosely-typed JSON face
//!   records into primitives.
//! - [`filter_faces`]: type filtering that keeps face list positions stable.
//!
//! # Example
//!
//! ```
//! use cadmesh_core::{parse_face, Primitive};
//! use serde_json::json;
//!
//! let record = json!({
//!     "type": "sphere",
//!     "center": [0.0, 0.0, 0.0],
//!     "radius": 0.5,
//! });
//! let Some(Primitive::Sphere(sphere)) = parse_face(&record, 3)? else {
//!     unreachable!();
//! };
//! assert_eq!(sphere.face_index, 3);
//! # Ok::<(), cadmesh_core::FaceError>(())
//! ```

pub mod errors;
pub mod filter;
pub mod parse;
pub mod primitive;

pub use errors::{FaceError, Result};
pub use filter::{face_kind, filter_faces, kind_counts, TypeFilter};
pub use parse::{parse_face, parse_faces};
pub use primitive::{
    Bounds, Cone, Cylinder, Plane, Primitive, Sphere, SurfaceKind, Torus, FULL_TURN,
    LATITUDE_RANGE, UNIT_TOLERANCE,
};

/// Re-exported so callers can build and inspect points without a direct glam dependency.
pub use glam::DVec3;
