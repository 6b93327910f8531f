//! The BREP-to-mesh conversion boundary.
//!
//! Tessellation itself lives behind [`BrepConverter`]; this module fixes the
//! options it receives and how its output is turned into the final GLB.

use std::fmt;
use std::path::Path;
use std::str::FromStr;

use cadmesh_core::TypeFilter;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{IoError, Result};
use crate::extension::Material;
use crate::inject::{attach_brep_faces, EncodeOptions, FaceTriangles};

/// Supported BREP input formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InputFormat {
    Step,
    Iges,
}

impl InputFormat {
    /// File extensions recognized for this format.
    pub fn extensions(&self) -> &'static [&'static str] {
        match self {
            InputFormat::Step => &["step", "stp"],
            InputFormat::Iges => &["iges", "igs"],
        }
    }

    /// Guess the format from a file extension.
    pub fn from_path(path: &Path) -> Result<Self> {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .ok_or_else(|| IoError::Unsupported(format!("no file extension: {}", path.display())))?;
        ext.parse()
    }
}

impl fmt::Display for InputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            InputFormat::Step => "step",
            InputFormat::Iges => "iges",
        })
    }
}

impl FromStr for InputFormat {
    type Err = IoError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim_start_matches('.').to_lowercase().as_str() {
            "step" | "stp" => Ok(InputFormat::Step),
            "iges" | "igs" => Ok(InputFormat::Iges),
            _ => Err(IoError::Unsupported(format!(
                "input format '{s}', expected step or iges"
            ))),
        }
    }
}

/// Options for converting a BREP file to GLB.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConversionOptions {
    /// Linear deflection tolerance for meshing.
    pub tol_linear: f64,
    /// Angular deflection tolerance in radians.
    pub tol_angular: f64,
    /// Whether `tol_linear` is relative to edge length.
    pub tol_relative: bool,
    /// One mesh primitive per part.
    pub merge_primitives: bool,
    /// Mesh and export in parallel.
    pub use_parallel: bool,
    /// Attach `TM_brep_faces` data.
    pub include_brep: bool,
    /// Face kinds to describe when `include_brep` is set; empty means all.
    pub brep_types: TypeFilter,
    /// Copy material records into the output.
    pub include_materials: bool,
}

impl Default for ConversionOptions {
    fn default() -> Self {
        Self {
            tol_linear: 0.01,
            tol_angular: 0.5,
            tol_relative: false,
            merge_primitives: true,
            use_parallel: true,
            include_brep: false,
            brep_types: TypeFilter::all(),
            include_materials: false,
        }
    }
}

impl ConversionOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_tolerances(mut self, linear: f64, angular: f64) -> Self {
        self.tol_linear = linear;
        self.tol_angular = angular;
        self
    }

    /// Attach BREP face data, restricted to `brep_types`.
    pub fn with_brep(mut self, brep_types: TypeFilter) -> Self {
        self.include_brep = true;
        self.brep_types = brep_types;
        self
    }

    pub fn with_materials(mut self) -> Self {
        self.include_materials = true;
        self
    }

    pub fn sequential(mut self) -> Self {
        self.use_parallel = false;
        self
    }

    pub fn encode_options(&self) -> EncodeOptions {
        EncodeOptions {
            brep_types: self.brep_types.clone(),
            include_materials: self.include_materials,
        }
    }
}

/// Mesh output of a tessellator, before face data is attached.
#[derive(Debug, Clone, Default)]
pub struct TessellatedShape {
    /// A GLB holding the triangulated mesh.
    pub glb: Vec<u8>,
    /// Triangle runs per BREP face.
    pub face_triangles: Vec<FaceTriangles>,
    /// One record per BREP face, `null` for free-form faces.
    pub faces: Vec<Value>,
    pub materials: Option<Vec<Material>>,
}

/// Attach face and material data to a tessellation as `options` asks.
pub fn finish_conversion(shape: &TessellatedShape, options: &ConversionOptions) -> Result<Vec<u8>> {
    let ranges: &[FaceTriangles] = if options.include_brep {
        &shape.face_triangles
    } else {
        &[]
    };
    if ranges.is_empty() && !(options.include_materials && shape.materials.is_some()) {
        return Ok(shape.glb.clone());
    }
    attach_brep_faces(
        &shape.glb,
        ranges,
        &shape.faces,
        shape.materials.as_deref(),
        &options.encode_options(),
    )
}

/// Converts BREP file content into GLB bytes.
pub trait BrepConverter: Send + Sync {
    fn convert(
        &self,
        data: &[u8],
        format: InputFormat,
        options: &ConversionOptions,
    ) -> Result<Vec<u8>>;

    /// Read and convert a file, picking the format from its extension.
    fn convert_path(&self, path: &Path, options: &ConversionOptions) -> Result<Vec<u8>> {
        let format = InputFormat::from_path(path)?;
        let data = std::fs::read(path)?;
        self.convert(&data, format, options)
    }
}
