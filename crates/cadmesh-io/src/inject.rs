//! Writing the `TM_brep_faces` extension into a glTF document.
//!
//! The tessellator reports which run of triangles each BREP face produced.
//! [`inject_brep_extension`] turns those runs into the per-triangle
//! face-index array, appends it to buffer 0 and attaches the face records
//! to the first mesh primitive.

use cadmesh_core::{filter_faces, TypeFilter};
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use tracing::debug;

use crate::error::{IoError, Result};
use crate::extension::{check_alignment, BrepFacesExtension, Material, EXTENSION_NAME};
use crate::glb::{align4, read_glb, write_glb};
use crate::gltf::{COMPONENT_UNSIGNED_INT, TYPE_SCALAR};
use crate::handlers::{MATERIALS, METADATA_NAMESPACE};

/// The triangles one face was tessellated into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FaceTriangles {
    pub face_index: u32,
    pub tri_start: usize,
    pub tri_count: usize,
}

/// Options for encoding face data.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EncodeOptions {
    /// Face kinds to keep; the empty filter keeps every face.
    pub brep_types: TypeFilter,
    /// Copy material records into the document.
    pub include_materials: bool,
}

impl EncodeOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_brep_types(mut self, filter: TypeFilter) -> Self {
        self.brep_types = filter;
        self
    }

    pub fn with_materials(mut self) -> Self {
        self.include_materials = true;
        self
    }
}

/// Expand face triangle runs into one face index per triangle.
///
/// The runs must tile the triangle range `0..n` with no gaps or overlaps;
/// they may be given in any order.
pub fn build_face_index_array(ranges: &[FaceTriangles]) -> Result<Vec<u32>> {
    let mut sorted: Vec<&FaceTriangles> = ranges.iter().collect();
    sorted.sort_by_key(|r| r.tri_start);

    let total = ranges.iter().map(|r| r.tri_count).sum();
    let mut index = Vec::with_capacity(total);
    for range in sorted {
        if range.tri_start != index.len() {
            return Err(IoError::InvalidData(format!(
                "face {} starts at triangle {}, expected {}",
                range.face_index,
                range.tri_start,
                index.len()
            )));
        }
        index.resize(index.len() + range.tri_count, range.face_index);
    }
    Ok(index)
}

/// Add face data for the first mesh primitive of `document`.
///
/// `existing_bin_len` is the current length of the binary chunk. The
/// returned bytes (alignment padding followed by the face-index array) must
/// be appended to it. `faces` is the full face list, indexed by
/// `FaceTriangles::face_index`; it is filtered with
/// [`EncodeOptions::brep_types`] before being written.
///
/// Materials are written only with [`EncodeOptions::include_materials`],
/// into the extension payload and into `meshes[0].extras.cadmesh.materials`.
/// The latter happens even when there are no triangles to describe.
///
/// On error `document` is left unchanged.
pub fn inject_brep_extension(
    document: &mut Value,
    existing_bin_len: usize,
    ranges: &[FaceTriangles],
    faces: &[Value],
    materials: Option<&[Material]>,
    options: &EncodeOptions,
) -> Result<Vec<u8>> {
    let materials = materials.filter(|_| options.include_materials);
    let has_brep = !ranges.is_empty() && ranges.iter().any(|r| r.tri_count > 0);

    if has_brep && !document.pointer("/meshes/0/primitives/0").is_some_and(Value::is_object) {
        return Err(IoError::MissingRequired("meshes[0].primitives[0]".into()));
    }
    if materials.is_some() && !document.pointer("/meshes/0").is_some_and(Value::is_object) {
        return Err(IoError::MissingRequired("meshes[0]".into()));
    }
    check_containers(document, has_brep, materials.is_some())?;
    let index = if has_brep {
        let index = build_face_index_array(ranges)?;
        check_alignment(&index, faces.len())?;
        index
    } else {
        Vec::new()
    };
    let root = document
        .as_object_mut()
        .ok_or_else(|| IoError::InvalidData("glTF document is not a JSON object".into()))?;

    let mut appended = Vec::new();
    if has_brep {

        let offset = align4(existing_bin_len);
        let byte_length = index.len() * 4;
        appended.resize(offset - existing_bin_len, 0);
        appended.reserve(byte_length);
        for face in &index {
            appended.extend_from_slice(&face.to_le_bytes());
        }

        let buffers = array_mut(root, "buffers")?;
        if buffers.is_empty() {
            buffers.push(json!({ "byteLength": 0 }));
        }
        let buffer = buffers[0]
            .as_object_mut()
            .ok_or_else(|| IoError::InvalidData("buffers[0] is not an object".into()))?;
        buffer.insert("byteLength".into(), json!(offset + byte_length));

        let views = array_mut(root, "bufferViews")?;
        let view_index = views.len();
        views.push(json!({ "buffer": 0, "byteOffset": offset, "byteLength": byte_length }));

        let accessors = array_mut(root, "accessors")?;
        let accessor_index = accessors.len();
        accessors.push(json!({
            "bufferView": view_index,
            "byteOffset": 0,
            "componentType": COMPONENT_UNSIGNED_INT,
            "count": index.len(),
            "type": TYPE_SCALAR,
        }));

        let used = array_mut(root, "extensionsUsed")?;
        if !used.iter().any(|name| name == EXTENSION_NAME) {
            used.push(json!(EXTENSION_NAME));
        }

        let payload = BrepFacesExtension {
            face_indices: accessor_index,
            faces: Some(filter_faces(faces, &options.brep_types)),
            materials: materials.map(<[Material]>::to_vec),
        };
        let primitive = root
            .get_mut("meshes")
            .and_then(|m| m.pointer_mut("/0/primitives/0"))
            .ok_or_else(|| IoError::MissingRequired("meshes[0].primitives[0]".into()))?;
        object_mut(primitive, "extensions")?
            .insert(EXTENSION_NAME.to_string(), serde_json::to_value(&payload)?);

        debug!(
            triangles = index.len(),
            faces = faces.len(),
            kept = payload.face_records().iter().filter(|f| !f.is_null()).count(),
            accessor = accessor_index,
            "injected BREP face extension"
        );
    }

    if let Some(materials) = materials {
        let mesh = root
            .get_mut("meshes")
            .and_then(|m| m.get_mut(0))
            .ok_or_else(|| IoError::MissingRequired("meshes[0]".into()))?;
        let extras = object_mut(mesh, "extras")?;
        let namespace = extras
            .entry(METADATA_NAMESPACE)
            .or_insert_with(|| Value::Object(Map::new()))
            .as_object_mut()
            .ok_or_else(|| {
                IoError::InvalidData("meshes[0].extras.cadmesh is not an object".into())
            })?;
        let records = materials.iter().cloned().map(Value::Object).collect();
        namespace.insert(MATERIALS.to_string(), Value::Array(records));
    }

    Ok(appended)
}

/// Add face data to an existing GLB file, returning the new file.
pub fn attach_brep_faces(
    glb: &[u8],
    ranges: &[FaceTriangles],
    faces: &[Value],
    materials: Option<&[Material]>,
    options: &EncodeOptions,
) -> Result<Vec<u8>> {
    let chunks = read_glb(glb)?;
    let mut document = chunks.document()?;
    let mut bin = chunks.bin.unwrap_or_default().to_vec();

    let appended =
        inject_brep_extension(&mut document, bin.len(), ranges, faces, materials, options)?;
    bin.extend_from_slice(&appended);
    write_glb(&document, &bin)
}

/// Check the JSON type of every container the encoder writes into, before
/// anything is written.
fn check_containers(document: &Value, has_brep: bool, has_materials: bool) -> Result<()> {
    if has_brep {
        for key in ["buffers", "bufferViews", "accessors", "extensionsUsed"] {
            expect_kind(document.get(key), key, Value::is_array, "an array")?;
        }
        expect_kind(document.pointer("/buffers/0"), "buffers[0]", Value::is_object, "an object")?;
        expect_kind(
            document.pointer("/meshes/0/primitives/0/extensions"),
            "meshes[0].primitives[0].extensions",
            Value::is_object,
            "an object",
        )?;
    }
    if has_materials {
        let extras = document.pointer("/meshes/0/extras");
        expect_kind(extras, "meshes[0].extras", Value::is_object, "an object")?;
        expect_kind(
            extras.and_then(|e| e.get(METADATA_NAMESPACE)),
            "meshes[0].extras.cadmesh",
            Value::is_object,
            "an object",
        )?;
    }
    Ok(())
}

fn expect_kind(
    value: Option<&Value>,
    name: &str,
    is_kind: fn(&Value) -> bool,
    kind: &str,
) -> Result<()> {
    match value {
        Some(value) if !is_kind(value) => {
            Err(IoError::InvalidData(format!("'{name}' is not {kind}")))
        }
        _ => Ok(()),
    }
}

fn array_mut<'a>(object: &'a mut Map<String, Value>, key: &str) -> Result<&'a mut Vec<Value>> {
    object
        .entry(key)
        .or_insert_with(|| Value::Array(Vec::new()))
        .as_array_mut()
        .ok_or_else(|| IoError::InvalidData(format!("'{key}' is not an array")))
}

fn object_mut<'a>(value: &'a mut Value, key: &str) -> Result<&'a mut Map<String, Value>> {
    value
        .as_object_mut()
        .ok_or_else(|| IoError::InvalidData(format!("parent of '{key}' is not an object")))?
        .entry(key)
        .or_insert_with(|| Value::Object(Map::new()))
        .as_object_mut()
        .ok_or_else(|| IoError::InvalidData(format!("'{key}' is not an object")))
}
