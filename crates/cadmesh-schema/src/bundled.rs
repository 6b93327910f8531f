//! Schema fragments and the resolved artifact shipped with the crate.

/// Name of the root fragment describing the mesh primitive extension.
pub const ROOT_FRAGMENT: &str = "mesh.primitive.TM_brep_faces.schema.json";

/// The source fragments, keyed by file name.
pub const FRAGMENTS: &[(&str, &str)] = &[
    (
        "definitions.schema.json",
        include_str!("../../../extensions/TM_brep_faces/schema/definitions.schema.json"),
    ),
    (
        "face.schema.json",
        include_str!("../../../extensions/TM_brep_faces/schema/face.schema.json"),
    ),
    (
        "plane.schema.json",
        include_str!("../../../extensions/TM_brep_faces/schema/plane.schema.json"),
    ),
    (
        "cylinder.schema.json",
        include_str!("../../../extensions/TM_brep_faces/schema/cylinder.schema.json"),
    ),
    (
        "cone.schema.json",
        include_str!("../../../extensions/TM_brep_faces/schema/cone.schema.json"),
    ),
    (
        "sphere.schema.json",
        include_str!("../../../extensions/TM_brep_faces/schema/sphere.schema.json"),
    ),
    (
        "torus.schema.json",
        include_str!("../../../extensions/TM_brep_faces/schema/torus.schema.json"),
    ),
    (
        ROOT_FRAGMENT,
        include_str!("../../../extensions/TM_brep_faces/schema/mesh.primitive.TM_brep_faces.schema.json"),
    ),
];

/// The packaged, fully resolved schema. Regenerate with `cadmesh-build-schema`
/// (`cli` feature).
pub const BUNDLED_SCHEMA: &str = include_str!("../schema.json");
