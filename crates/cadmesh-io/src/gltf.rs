//! The subset of the glTF 2.0 document model needed to reach extension data.
//!
//! Unknown members (nodes, materials, textures, ...) are ignored when reading;
//! documents are edited as `serde_json::Value` when they must round-trip
//! untouched.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Component type UNSIGNED_BYTE.
pub const COMPONENT_UNSIGNED_BYTE: u32 = 5121;
/// Component type UNSIGNED_SHORT.
pub const COMPONENT_UNSIGNED_SHORT: u32 = 5123;
/// Component type UNSIGNED_INT.
pub const COMPONENT_UNSIGNED_INT: u32 = 5125;

/// Accessor element type for single values.
pub const TYPE_SCALAR: &str = "SCALAR";

/// Root glTF object.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Gltf {
    #[serde(default)]
    pub asset: Asset,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub meshes: Vec<Mesh>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub accessors: Vec<Accessor>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub buffer_views: Vec<BufferView>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub buffers: Vec<Buffer>,
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub extensions: IndexMap<String, Value>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub extensions_used: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub extensions_required: Vec<String>,
}

/// Asset metadata.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Asset {
    pub version: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub generator: Option<String>,
}

impl Default for Asset {
    fn default() -> Self {
        Self {
            version: "2.0".to_string(),
            generator: None,
        }
    }
}

/// A mesh containing primitives.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Mesh {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default)]
    pub primitives: Vec<MeshPrimitive>,
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub extensions: IndexMap<String, Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub extras: Option<Value>,
}

/// A mesh primitive.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MeshPrimitive {
    /// Vertex attributes (POSITION, NORMAL, ...).
    #[serde(default)]
    pub attributes: IndexMap<String, usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub indices: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub material: Option<usize>,
    /// Rendering mode (4 = TRIANGLES).
    #[serde(default = "default_primitive_mode")]
    pub mode: u32,
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub extensions: IndexMap<String, Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub extras: Option<Value>,
}

fn default_primitive_mode() -> u32 {
    4
}

/// An accessor for typed buffer data.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Accessor {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub buffer_view: Option<usize>,
    #[serde(default)]
    pub byte_offset: usize,
    pub component_type: u32,
    pub count: usize,
    /// Element type ("SCALAR", "VEC3", ...).
    #[serde(rename = "type")]
    pub accessor_type: String,
    #[serde(default)]
    pub normalized: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

/// A view into a buffer.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BufferView {
    pub buffer: usize,
    #[serde(default)]
    pub byte_offset: usize,
    pub byte_length: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub byte_stride: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target: Option<u32>,
}

/// A buffer containing binary data.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Buffer {
    pub byte_length: usize,
    /// Data URI or external file; absent for the GLB binary chunk.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub uri: Option<String>,
}

/// Byte size of one component, for the integer types accepted as indices.
pub fn component_size(component_type: u32) -> Option<usize> {
    match component_type {
        COMPONENT_UNSIGNED_BYTE => Some(1),
        COMPONENT_UNSIGNED_SHORT => Some(2),
        COMPONENT_UNSIGNED_INT => Some(4),
        _ => None,
    }
}
