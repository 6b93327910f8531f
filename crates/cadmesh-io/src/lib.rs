//! cadmesh-io: the `TM_brep_faces` glTF extension.
//!
//! A converted CAD part is a binary glTF whose first mesh primitive carries
//! the extension: an accessor with one BREP face index per triangle, and a
//! positional list of analytical face records.
//!
//! | Direction | Entry point |
//! |-----------|-------------|
//! | Encode | [`inject_brep_extension`], [`attach_brep_faces`] |
//! | Decode | [`decode_extension`], [`load_glb`] with [`ExtensionHandlers`] |
//! | Container | [`read_glb`], [`write_glb`] |
//! | Conversion | [`BrepConverter`], [`ConversionOptions`] |
//!
//! ```text
//! tessellator ─> TessellatedShape ─> finish_conversion ─> GLB
//!                                                          │
//!             LoadedPrimitive <─ load_glb(handlers) <──────┘
//! ```

pub mod accessor;
pub mod convert;
pub mod error;
pub mod extension;
pub mod glb;
pub mod gltf;
pub mod handlers;
pub mod inject;

pub use accessor::read_scalar_u32;
pub use convert::{
    finish_conversion, BrepConverter, ConversionOptions, InputFormat, TessellatedShape,
};
pub use error::{IoError, Result};
pub use extension::{
    check_alignment, decode_extension, BrepFacesExtension, DecodedBrepFaces, Material,
    EXTENSION_NAME,
};
pub use glb::{is_glb, read_glb, write_glb, GlbChunks};
pub use handlers::{
    load, load_glb, BrepFacesHandler, ExtensionHandler, ExtensionHandlers, HandlerContext,
    HandlerOutput, HandlerScope, LoadedPrimitive, Metadata, MetadataValue, METADATA_NAMESPACE,
};
pub use inject::{
    attach_brep_faces, build_face_index_array, inject_brep_extension, EncodeOptions,
    FaceTriangles,
};
