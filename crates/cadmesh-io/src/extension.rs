//! The `TM_brep_faces` mesh primitive extension.
//!
//! ```json
//! "extensions": {
//!   "TM_brep_faces": {
//!     "faceIndices": 3,
//!     "faces": [{ "type": "plane", ... }, null, ...],
//!     "materials": [{ ... }]
//!   }
//! }
//! ```
//!
//! `faceIndices` names a SCALAR accessor holding one face index per
//! triangle. `faces` is positional: entry `i` describes face `i`, and is
//! `null` for free-form or filtered faces.

use cadmesh_core::{parse_faces, Primitive};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::debug;

use crate::error::{IoError, Result};

/// Extension name as it appears in `extensionsUsed` and `extensions`.
pub const EXTENSION_NAME: &str = "TM_brep_faces";

/// An opaque material record, passed through unchanged.
pub type Material = Map<String, Value>;

/// Extension payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BrepFacesExtension {
    /// Accessor holding the per-triangle face-index array.
    #[serde(rename = "faceIndices")]
    pub face_indices: usize,
    /// Face records. `None` when the payload carries only the index array.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub faces: Option<Vec<Value>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub materials: Option<Vec<Material>>,
}

impl BrepFacesExtension {
    pub fn from_value(value: &Value) -> Result<Self> {
        Ok(Self::deserialize(value)?)
    }

    /// The face records, empty when `faces` is absent.
    pub fn face_records(&self) -> &[Value] {
        self.faces.as_deref().unwrap_or(&[])
    }
}

/// A decoded extension.
#[derive(Debug, Clone, PartialEq)]
pub struct DecodedBrepFaces {
    /// One face index per triangle.
    pub brep_index: Vec<u32>,
    /// One entry per face, `None` for free-form or filtered faces.
    pub primitives: Vec<Option<Primitive>>,
    /// The raw face records, `None` when the payload had no `faces` key.
    pub faces: Option<Vec<Value>>,
    pub materials: Option<Vec<Material>>,
}

impl DecodedBrepFaces {
    /// The primitive a triangle was tessellated from.
    pub fn primitive_for_triangle(&self, triangle: usize) -> Option<&Primitive> {
        let face = *self.brep_index.get(triangle)? as usize;
        self.primitives.get(face)?.as_ref()
    }

    /// Indices of the triangles belonging to `face`.
    pub fn triangles_of_face(&self, face: u32) -> impl Iterator<Item = usize> + '_ {
        self.brep_index
            .iter()
            .enumerate()
            .filter_map(move |(t, f)| (*f == face).then_some(t))
    }
}

/// Check that every entry of `brep_index` points into a face list of
/// `face_count` entries.
///
/// Faces without triangles are allowed, so the largest index may be below
/// `face_count - 1`.
pub fn check_alignment(brep_index: &[u32], face_count: usize) -> Result<()> {
    match brep_index
        .iter()
        .enumerate()
        .find(|(_, face)| **face as usize >= face_count)
    {
        Some((triangle, value)) => Err(IoError::Alignment {
            triangle,
            value: *value,
            face_count,
        }),
        None => Ok(()),
    }
}

/// Decode a payload given the contents of its `faceIndices` accessor.
///
/// `null` and unrecognized face records decode to `None`; only malformed
/// records of a recognized type fail. When faces are present the index
/// array must be aligned with them.
pub fn decode_extension(
    payload: &BrepFacesExtension,
    accessor_data: Vec<u32>,
) -> Result<DecodedBrepFaces> {
    let records = payload.face_records();
    let primitives = parse_faces(records)?;
    if !records.is_empty() {
        check_alignment(&accessor_data, records.len())?;
    }
    debug!(
        triangles = accessor_data.len(),
        faces = records.len(),
        analytical = primitives.iter().flatten().count(),
        "decoded BREP face extension"
    );
    Ok(DecodedBrepFaces {
        brep_index: accessor_data,
        primitives,
        faces: payload.faces.clone(),
        materials: payload.materials.clone(),
    })
}
