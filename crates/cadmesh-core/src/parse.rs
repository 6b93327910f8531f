//! Face record parsing.
//!
//! Turns the loosely-typed JSON face records carried by the `TM_brep_faces`
//! extension into [`Primitive`] values.

use glam::DVec3;
use serde_json::{Map, Value};
use tracing::trace;

use crate::errors::{FaceError, Result};
use crate::primitive::{
    check_unit, Bounds, Cone, Cylinder, Plane, Primitive, Sphere, SurfaceKind, Torus, FULL_TURN,
    LATITUDE_RANGE,
};

/// Parse one face record.
///
/// Returns `Ok(None)` for `null` records and for records whose `type` is
/// missing or not one of the five analytical kinds. A record that names a
/// known kind must carry every geometry field of that kind.
///
/// `index` is used as the face index when the record does not carry its own
/// `face_index`.
pub fn parse_face(record: &Value, index: usize) -> Result<Option<Primitive>> {
    let Some(obj) = record.as_object() else {
        return Ok(None);
    };

    let tag = obj.get("type").and_then(Value::as_str);
    let Some(kind) = tag.and_then(SurfaceKind::from_tag) else {
        trace!(index, tag = ?tag, "face has no analytical description");
        return Ok(None);
    };

    let face_index = read_face_index(obj, index)?;
    let fields = Fields { obj, face_index };

    let primitive = match kind {
        SurfaceKind::Plane => {
            let origin = fields.point("origin")?;
            let normal = fields.direction("normal")?;
            let x_dir = fields.direction("x_dir")?;
            Primitive::Plane(Plane {
                face_index,
                u_bounds: fields.bounds("u_bounds")?,
                v_bounds: fields.bounds("v_bounds")?,
                origin,
                normal,
                x_dir,
            })
        }
        SurfaceKind::Cylinder => {
            let origin = fields.point("origin")?;
            let axis = fields.direction("axis")?;
            let radius = fields.number("radius")?;
            Primitive::Cylinder(Cylinder {
                face_index,
                u_bounds: fields.bounds_or("u_bounds", FULL_TURN)?,
                v_bounds: fields.bounds("v_bounds")?,
                origin,
                axis,
                radius,
            })
        }
        SurfaceKind::Cone => {
            let apex = fields.point("apex")?;
            let axis = fields.direction("axis")?;
            let semi_angle = fields.number("semi_angle")?;
            let ref_radius = fields.number("ref_radius")?;
            Primitive::Cone(Cone {
                face_index,
                u_bounds: fields.bounds_or("u_bounds", FULL_TURN)?,
                v_bounds: fields.bounds("v_bounds")?,
                apex,
                axis,
                semi_angle,
                ref_radius,
            })
        }
        SurfaceKind::Sphere => {
            let center = fields.point("center")?;
            let radius = fields.number("radius")?;
            Primitive::Sphere(Sphere {
                face_index,
                u_bounds: fields.bounds_or("u_bounds", FULL_TURN)?,
                v_bounds: fields.bounds_or("v_bounds", LATITUDE_RANGE)?,
                center,
                radius,
            })
        }
        SurfaceKind::Torus => {
            let center = fields.point("center")?;
            let axis = fields.direction("axis")?;
            let major_radius = fields.number("major_radius")?;
            let minor_radius = fields.number("minor_radius")?;
            Primitive::Torus(Torus {
                face_index,
                u_bounds: fields.bounds_or("u_bounds", FULL_TURN)?,
                v_bounds: fields.bounds_or("v_bounds", FULL_TURN)?,
                center,
                axis,
                major_radius,
                minor_radius,
            })
        }
    };

    Ok(Some(primitive))
}

/// Parse a whole face list, keeping its length and order.
pub fn parse_faces(faces: &[Value]) -> Result<Vec<Option<Primitive>>> {
    faces
        .iter()
        .enumerate()
        .map(|(i, face)| parse_face(face, i))
        .collect()
}

fn read_face_index(obj: &Map<String, Value>, index: usize) -> Result<usize> {
    match obj.get("face_index") {
        None | Some(Value::Null) => Ok(index),
        Some(value) => value
            .as_u64()
            .and_then(|v| usize::try_from(v).ok())
            .ok_or_else(|| FaceError::InvalidField {
                field: "face_index",
                face_index: index,
                reason: format!("expected a non-negative integer, found {value}"),
            }),
    }
}

/// Typed field access on a face record.
struct Fields<'a> {
    obj: &'a Map<String, Value>,
    face_index: usize,
}

impl Fields<'_> {
    fn get(&self, field: &'static str) -> Option<&Value> {
        self.obj.get(field).filter(|v| !v.is_null())
    }

    fn require(&self, field: &'static str) -> Result<&Value> {
        self.get(field).ok_or(FaceError::MissingField {
            field,
            face_index: self.face_index,
        })
    }

    fn invalid(&self, field: &'static str, reason: String) -> FaceError {
        FaceError::InvalidField {
            field,
            face_index: self.face_index,
            reason,
        }
    }

    fn number(&self, field: &'static str) -> Result<f64> {
        let value = self.require(field)?;
        value
            .as_f64()
            .ok_or_else(|| self.invalid(field, format!("expected a number, found {value}")))
    }

    fn numbers<const N: usize>(&self, field: &'static str, value: &Value) -> Result<[f64; N]> {
        let items = value
            .as_array()
            .ok_or_else(|| self.invalid(field, format!("expected an array, found {value}")))?;
        if items.len() != N {
            return Err(self.invalid(
                field,
                format!("expected {N} numbers, found {}", items.len()),
            ));
        }
        let mut out = [0.0; N];
        for (slot, item) in out.iter_mut().zip(items) {
            *slot = item
                .as_f64()
                .ok_or_else(|| self.invalid(field, format!("expected a number, found {item}")))?;
        }
        Ok(out)
    }

    fn point(&self, field: &'static str) -> Result<DVec3> {
        let value = self.require(field)?;
        Ok(DVec3::from_array(self.numbers::<3>(field, value)?))
    }

    fn direction(&self, field: &'static str) -> Result<DVec3> {
        let v = self.point(field)?;
        check_unit(field, v, self.face_index)?;
        Ok(v)
    }

    fn bounds(&self, field: &'static str) -> Result<Bounds> {
        let value = self.require(field)?;
        Ok(Bounds::from(self.numbers::<2>(field, value)?))
    }

    fn bounds_or(&self, field: &'static str, default: Bounds) -> Result<Bounds> {
        match self.get(field) {
            Some(value) => Ok(Bounds::from(self.numbers::<2>(field, value)?)),
            None => Ok(default),
        }
    }
}
