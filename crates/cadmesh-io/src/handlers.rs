//! Extension handlers and GLB loading.
//!
//! Handlers are looked up by extension name in an [`ExtensionHandlers`]
//! table the caller builds and passes to [`load_glb`]. Nothing is
//! registered globally.
//!
//! ```ignore
//! use cadmesh_io::{load_glb, ExtensionHandlers};
//!
//! let handlers = ExtensionHandlers::with_defaults();
//! for primitive in load_glb(&bytes, &handlers)? {
//!     if let Some(index) = primitive.brep_index() {
//!         println!("{} triangles", index.len());
//!     }
//! }
//! ```

use cadmesh_core::Primitive;
use indexmap::IndexMap;
use serde_json::Value;
use tracing::{debug, warn};

use crate::accessor::read_scalar_u32;
use crate::error::Result;
use crate::extension::{decode_extension, BrepFacesExtension, EXTENSION_NAME};
use crate::glb::{is_glb, load_buffers, read_glb};
use crate::gltf::Gltf;

/// Metadata namespace written by the built-in handler.
pub const METADATA_NAMESPACE: &str = "cadmesh";
/// Face attribute holding the per-triangle face index.
pub const BREP_INDEX: &str = "brep_index";
/// Metadata key holding the decoded primitives.
pub const BREP_PRIMITIVES: &str = "brep_primitives";
/// Metadata key holding the raw face records.
pub const BREP_FACES: &str = "brep_faces";
/// Metadata key holding the opaque material records.
pub const MATERIALS: &str = "materials";

/// Where in the document an extension lives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HandlerScope {
    /// `meshes[i].primitives[j].extensions`
    Primitive,
    /// `meshes[i].extensions`
    Mesh,
}

/// A metadata entry produced by a handler.
#[derive(Debug, Clone, PartialEq)]
pub enum MetadataValue {
    Primitives(Vec<Option<Primitive>>),
    Json(Value),
}

impl MetadataValue {
    pub fn as_primitives(&self) -> Option<&[Option<Primitive>]> {
        match self {
            MetadataValue::Primitives(p) => Some(p),
            MetadataValue::Json(_) => None,
        }
    }

    pub fn as_json(&self) -> Option<&Value> {
        match self {
            MetadataValue::Json(v) => Some(v),
            MetadataValue::Primitives(_) => None,
        }
    }
}

/// Metadata grouped by namespace.
pub type Metadata = IndexMap<String, IndexMap<String, MetadataValue>>;

/// What a handler contributes to a mesh primitive.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct HandlerOutput {
    /// Per-triangle arrays keyed by attribute name.
    pub face_attributes: IndexMap<String, Vec<u32>>,
    pub metadata: Metadata,
}

impl HandlerOutput {
    pub fn is_empty(&self) -> bool {
        self.face_attributes.is_empty() && self.metadata.is_empty()
    }

    /// Insert `value` under `namespace.key`.
    pub fn insert_metadata(&mut self, namespace: &str, key: &str, value: MetadataValue) {
        self.metadata
            .entry(namespace.to_string())
            .or_default()
            .insert(key.to_string(), value);
    }
}

/// Everything a handler can see while importing one extension object.
#[derive(Debug, Clone, Copy)]
pub struct HandlerContext<'a> {
    pub gltf: &'a Gltf,
    pub buffers: &'a [Vec<u8>],
    pub mesh: usize,
    /// `None` for mesh-scoped extensions.
    pub primitive: Option<usize>,
    /// The extension object itself.
    pub data: &'a Value,
}

impl HandlerContext<'_> {
    /// Read an integer SCALAR accessor.
    pub fn accessor_u32(&self, index: usize) -> Result<Vec<u32>> {
        read_scalar_u32(self.gltf, self.buffers, index)
    }
}

/// Imports one named glTF extension.
pub trait ExtensionHandler: Send + Sync {
    /// Extension name, as used in `extensionsUsed`.
    fn name(&self) -> &'static str;

    fn scope(&self) -> HandlerScope {
        HandlerScope::Primitive
    }

    /// Import the extension object in `ctx`. `Ok(None)` contributes nothing.
    fn import(&self, ctx: &HandlerContext<'_>) -> Result<Option<HandlerOutput>>;
}

/// Handler for `TM_brep_faces`.
#[derive(Debug, Clone, Copy, Default)]
pub struct BrepFacesHandler;

impl ExtensionHandler for BrepFacesHandler {
    fn name(&self) -> &'static str {
        EXTENSION_NAME
    }

    fn import(&self, ctx: &HandlerContext<'_>) -> Result<Option<HandlerOutput>> {
        let payload = BrepFacesExtension::from_value(ctx.data)?;
        let brep_index = ctx.accessor_u32(payload.face_indices)?;
        let decoded = decode_extension(&payload, brep_index)?;

        let mut output = HandlerOutput::default();
        output
            .face_attributes
            .insert(BREP_INDEX.to_string(), decoded.brep_index);
        if let Some(faces) = decoded.faces {
            output.insert_metadata(
                METADATA_NAMESPACE,
                BREP_PRIMITIVES,
                MetadataValue::Primitives(decoded.primitives),
            );
            output.insert_metadata(
                METADATA_NAMESPACE,
                BREP_FACES,
                MetadataValue::Json(Value::Array(faces)),
            );
        }
        if let Some(materials) = decoded.materials {
            let materials = materials.into_iter().map(Value::Object).collect();
            output.insert_metadata(
                METADATA_NAMESPACE,
                MATERIALS,
                MetadataValue::Json(Value::Array(materials)),
            );
        }
        Ok(Some(output))
    }
}

/// Extension handlers keyed by name.
#[derive(Default)]
pub struct ExtensionHandlers {
    handlers: IndexMap<String, Box<dyn ExtensionHandler>>,
}

impl std::fmt::Debug for ExtensionHandlers {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_set().entries(self.handlers.keys()).finish()
    }
}

impl ExtensionHandlers {
    /// An empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// A table with the `TM_brep_faces` handler.
    pub fn with_defaults() -> Self {
        let mut handlers = Self::new();
        handlers.register(BrepFacesHandler);
        handlers
    }

    /// Register `handler`, replacing any handler with the same name.
    pub fn register<H: ExtensionHandler + 'static>(&mut self, handler: H) -> &mut Self {
        let name = handler.name().to_string();
        if self.handlers.insert(name.clone(), Box::new(handler)).is_some() {
            debug!(extension = %name, "replaced extension handler");
        }
        self
    }

    pub fn with<H: ExtensionHandler + 'static>(mut self, handler: H) -> Self {
        self.register(handler);
        self
    }

    pub fn remove(&mut self, name: &str) -> Option<Box<dyn ExtensionHandler>> {
        self.handlers.shift_remove(name)
    }

    pub fn get(&self, name: &str) -> Option<&dyn ExtensionHandler> {
        self.handlers.get(name).map(|h| h.as_ref())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.handlers.contains_key(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.handlers.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }
}

/// One mesh primitive with the data its extensions contributed.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LoadedPrimitive {
    pub mesh: usize,
    pub primitive: usize,
    pub face_attributes: IndexMap<String, Vec<u32>>,
    pub metadata: Metadata,
}

impl LoadedPrimitive {
    fn new(mesh: usize, primitive: usize) -> Self {
        Self {
            mesh,
            primitive,
            ..Default::default()
        }
    }

    fn merge(&mut self, output: HandlerOutput) {
        self.face_attributes.extend(output.face_attributes);
        for (namespace, entries) in output.metadata {
            self.metadata.entry(namespace).or_default().extend(entries);
        }
    }

    pub fn metadata_value(&self, namespace: &str, key: &str) -> Option<&MetadataValue> {
        self.metadata.get(namespace)?.get(key)
    }

    /// The per-triangle face-index array.
    pub fn brep_index(&self) -> Option<&[u32]> {
        self.face_attributes.get(BREP_INDEX).map(Vec::as_slice)
    }

    pub fn brep_primitives(&self) -> Option<&[Option<Primitive>]> {
        self.metadata_value(METADATA_NAMESPACE, BREP_PRIMITIVES)?
            .as_primitives()
    }

    pub fn brep_faces(&self) -> Option<&[Value]> {
        self.metadata_value(METADATA_NAMESPACE, BREP_FACES)?
            .as_json()?
            .as_array()
            .map(Vec::as_slice)
    }

    pub fn materials(&self) -> Option<&[Value]> {
        self.metadata_value(METADATA_NAMESPACE, MATERIALS)?
            .as_json()?
            .as_array()
            .map(Vec::as_slice)
    }
}

/// Load a binary glTF and run `handlers` over every mesh primitive.
///
/// Returns one entry per mesh primitive, in document order. Extensions
/// without a handler are skipped.
pub fn load_glb(data: &[u8], handlers: &ExtensionHandlers) -> Result<Vec<LoadedPrimitive>> {
    let chunks = read_glb(data)?;
    let gltf = chunks.gltf()?;
    let buffers = load_buffers(&gltf, chunks.bin)?;
    load_document(&gltf, &buffers, handlers)
}

/// Load either a binary glTF or a JSON glTF with data-URI buffers.
pub fn load(data: &[u8], handlers: &ExtensionHandlers) -> Result<Vec<LoadedPrimitive>> {
    if is_glb(data) {
        return load_glb(data, handlers);
    }
    let gltf: Gltf = serde_json::from_slice(data)?;
    let buffers = load_buffers(&gltf, None)?;
    load_document(&gltf, &buffers, handlers)
}

fn load_document(
    gltf: &Gltf,
    buffers: &[Vec<u8>],
    handlers: &ExtensionHandlers,
) -> Result<Vec<LoadedPrimitive>> {
    for name in &gltf.extensions_required {
        if !handlers.contains(name) {
            warn!(extension = %name, "required extension has no handler");
        }
    }

    let mut loaded = Vec::new();
    for (mesh_index, mesh) in gltf.meshes.iter().enumerate() {
        let mesh_extras = mesh_metadata(mesh.extras.as_ref());

        for (primitive_index, primitive) in mesh.primitives.iter().enumerate() {
            let mut entry = LoadedPrimitive::new(mesh_index, primitive_index);
            entry.merge(mesh_extras.clone());

            let base = HandlerContext {
                gltf,
                buffers,
                mesh: mesh_index,
                primitive: None,
                data: &Value::Null,
            };
            for (name, data) in &mesh.extensions {
                let ctx = HandlerContext { data, ..base };
                entry.merge(run_handler(handlers, HandlerScope::Mesh, name, &ctx)?);
            }
            for (name, data) in &primitive.extensions {
                let ctx = HandlerContext {
                    data,
                    primitive: Some(primitive_index),
                    ..base
                };
                entry.merge(run_handler(handlers, HandlerScope::Primitive, name, &ctx)?);
            }
            loaded.push(entry);
        }
    }

    debug!(primitives = loaded.len(), "loaded glTF mesh primitives");
    Ok(loaded)
}

fn run_handler(
    handlers: &ExtensionHandlers,
    scope: HandlerScope,
    name: &str,
    ctx: &HandlerContext<'_>,
) -> Result<HandlerOutput> {
    match handlers.get(name) {
        Some(handler) if handler.scope() == scope => {
            Ok(handler.import(ctx)?.unwrap_or_default())
        }
        Some(_) => {
            debug!(extension = name, ?scope, "handler registered for a different scope");
            Ok(HandlerOutput::default())
        }
        None => {
            debug!(extension = name, "no handler for extension, skipping");
            Ok(HandlerOutput::default())
        }
    }
}

/// `meshes[i].extras.cadmesh` entries become metadata, so materials written
/// without BREP data are still visible after loading.
fn mesh_metadata(extras: Option<&Value>) -> HandlerOutput {
    let mut output = HandlerOutput::default();
    let entries = extras
        .and_then(|e| e.get(METADATA_NAMESPACE))
        .and_then(Value::as_object);
    for (key, value) in entries.into_iter().flatten() {
        output.insert_metadata(METADATA_NAMESPACE, key, MetadataValue::Json(value.clone()));
    }
    output
}
