//! Analytical surface primitives.
//!
//! These are the five closed-form surface kinds a BREP face can carry
//! alongside its tessellation. Every primitive remembers the position of its
//! face in the owning shape (`face_index`) and the parametric extents of the
//! trimmed face (`u_bounds`, `v_bounds`).
//!
//! | Kind | u | v |
//! |------|---|---|
//! | Plane | length along `x_dir` | length along `normal × x_dir` |
//! | Cylinder | angle around `axis` | height along `axis` |
//! | Cone | angle around `axis` | distance along the generator |
//! | Sphere | longitude | latitude |
//! | Torus | angle around `axis` | angle around the tube |

use std::f64::consts::{FRAC_PI_2, TAU};
use std::fmt;
use std::str::FromStr;

use glam::DVec3;
use serde::{Deserialize, Serialize};

use crate::errors::{FaceError, Result};

/// Maximum deviation from unit length tolerated for direction fields.
pub const UNIT_TOLERANCE: f64 = 1e-6;

/// A parametric extent `[min, max]`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(from = "[f64; 2]", into = "[f64; 2]")]
pub struct Bounds {
    pub min: f64,
    pub max: f64,
}

impl Bounds {
    pub const fn new(min: f64, max: f64) -> Self {
        Self { min, max }
    }

    /// Width of the extent.
    pub fn span(&self) -> f64 {
        self.max - self.min
    }

    /// Whether `max > min`.
    pub fn is_ordered(&self) -> bool {
        self.max > self.min
    }

    pub fn contains(&self, value: f64) -> bool {
        value >= self.min && value <= self.max
    }
}

impl From<[f64; 2]> for Bounds {
    fn from([min, max]: [f64; 2]) -> Self {
        Self { min, max }
    }
}

impl From<Bounds> for [f64; 2] {
    fn from(bounds: Bounds) -> Self {
        [bounds.min, bounds.max]
    }
}

/// Default for angular bounds that are left out of a record: one full turn.
pub const FULL_TURN: Bounds = Bounds::new(0.0, TAU);

/// Default for the sphere latitude bound when it is left out of a record.
pub const LATITUDE_RANGE: Bounds = Bounds::new(-FRAC_PI_2, FRAC_PI_2);

/// The closed set of analytical surface kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SurfaceKind {
    Plane,
    Cylinder,
    Cone,
    Sphere,
    Torus,
}

impl SurfaceKind {
    /// All kinds, in wire order.
    pub const ALL: [SurfaceKind; 5] = [
        SurfaceKind::Plane,
        SurfaceKind::Cylinder,
        SurfaceKind::Cone,
        SurfaceKind::Sphere,
        SurfaceKind::Torus,
    ];

    /// The `type` discriminator used on the wire.
    pub fn as_str(&self) -> &'static str {
        match self {
            SurfaceKind::Plane => "plane",
            SurfaceKind::Cylinder => "cylinder",
            SurfaceKind::Cone => "cone",
            SurfaceKind::Sphere => "sphere",
            SurfaceKind::Torus => "torus",
        }
    }

    /// Look up a wire discriminator. Unrecognized tags such as `bspline`
    /// return `None`.
    pub fn from_tag(tag: &str) -> Option<Self> {
        match tag {
            "plane" => Some(SurfaceKind::Plane),
            "cylinder" => Some(SurfaceKind::Cylinder),
            "cone" => Some(SurfaceKind::Cone),
            "sphere" => Some(SurfaceKind::Sphere),
            "torus" => Some(SurfaceKind::Torus),
            _ => None,
        }
    }
}

impl fmt::Display for SurfaceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SurfaceKind {
    type Err = FaceError;

    fn from_str(s: &str) -> Result<Self> {
        SurfaceKind::from_tag(s.trim().to_ascii_lowercase().as_str())
            .ok_or_else(|| FaceError::UnknownType(s.to_string()))
    }
}

/// A planar face.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Plane {
    pub face_index: usize,
    pub u_bounds: Bounds,
    pub v_bounds: Bounds,
    /// A point on the plane.
    pub origin: DVec3,
    /// Unit normal.
    pub normal: DVec3,
    /// Unit in-plane X direction, perpendicular to `normal`.
    pub x_dir: DVec3,
}

impl Plane {
    /// In-plane Y direction completing the right-handed frame.
    pub fn y_dir(&self) -> DVec3 {
        self.normal.cross(self.x_dir)
    }

    /// Signed distance from `point` to the plane.
    pub fn signed_distance(&self, point: DVec3) -> f64 {
        (point - self.origin).dot(self.normal)
    }
}

/// A cylindrical face.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Cylinder {
    pub face_index: usize,
    pub u_bounds: Bounds,
    pub v_bounds: Bounds,
    /// A point on the axis.
    pub origin: DVec3,
    pub axis: DVec3,
    pub radius: f64,
}

/// A conical face.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Cone {
    pub face_index: usize,
    pub u_bounds: Bounds,
    pub v_bounds: Bounds,
    pub apex: DVec3,
    /// Unit axis pointing away from the apex.
    pub axis: DVec3,
    /// Half-angle at the apex, in radians.
    pub semi_angle: f64,
    /// Radius in the reference plane of the cone's placement.
    pub ref_radius: f64,
}

/// A spherical face.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Sphere {
    pub face_index: usize,
    pub u_bounds: Bounds,
    pub v_bounds: Bounds,
    pub center: DVec3,
    pub radius: f64,
}

/// A toroidal face.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Torus {
    pub face_index: usize,
    pub u_bounds: Bounds,
    pub v_bounds: Bounds,
    pub center: DVec3,
    /// Unit axis normal to the torus mid-plane.
    pub axis: DVec3,
    /// Distance from `center` to the tube center.
    pub major_radius: f64,
    /// Tube radius.
    pub minor_radius: f64,
}

/// One analytical face.
///
/// Non-analytical or filtered faces have no `Primitive`; they are `None`
/// wherever a face list is represented as `Vec<Option<Primitive>>`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Primitive {
    Plane(Plane),
    Cylinder(Cylinder),
    Cone(Cone),
    Sphere(Sphere),
    Torus(Torus),
}

impl Primitive {
    pub fn kind(&self) -> SurfaceKind {
        match self {
            Primitive::Plane(_) => SurfaceKind::Plane,
            Primitive::Cylinder(_) => SurfaceKind::Cylinder,
            Primitive::Cone(_) => SurfaceKind::Cone,
            Primitive::Sphere(_) => SurfaceKind::Sphere,
            Primitive::Torus(_) => SurfaceKind::Torus,
        }
    }

    pub fn face_index(&self) -> usize {
        match self {
            Primitive::Plane(p) => p.face_index,
            Primitive::Cylinder(c) => c.face_index,
            Primitive::Cone(c) => c.face_index,
            Primitive::Sphere(s) => s.face_index,
            Primitive::Torus(t) => t.face_index,
        }
    }

    pub fn u_bounds(&self) -> Bounds {
        match self {
            Primitive::Plane(p) => p.u_bounds,
            Primitive::Cylinder(c) => c.u_bounds,
            Primitive::Cone(c) => c.u_bounds,
            Primitive::Sphere(s) => s.u_bounds,
            Primitive::Torus(t) => t.u_bounds,
        }
    }

    pub fn v_bounds(&self) -> Bounds {
        match self {
            Primitive::Plane(p) => p.v_bounds,
            Primitive::Cylinder(c) => c.v_bounds,
            Primitive::Cone(c) => c.v_bounds,
            Primitive::Sphere(s) => s.v_bounds,
            Primitive::Torus(t) => t.v_bounds,
        }
    }

    /// Check the geometric invariants of this primitive's kind.
    ///
    /// Both bounds must satisfy `max > min`. Directions must be unit length
    /// within [`UNIT_TOLERANCE`] and a plane's `x_dir` must be perpendicular
    /// to its normal. Radii must be positive; a cone's half-angle must lie in
    /// `(0, π/2)`.
    pub fn check_invariants(&self) -> Result<()> {
        let face_index = self.face_index();
        check_ordered("u_bounds", self.u_bounds(), face_index)?;
        check_ordered("v_bounds", self.v_bounds(), face_index)?;
        match self {
            Primitive::Plane(p) => {
                check_unit("normal", p.normal, face_index)?;
                check_unit("x_dir", p.x_dir, face_index)?;
                let dot = p.normal.dot(p.x_dir);
                if dot.abs() > UNIT_TOLERANCE {
                    return Err(FaceError::InvalidField {
                        field: "x_dir",
                        face_index,
                        reason: format!("not perpendicular to normal (dot {dot})"),
                    });
                }
            }
            Primitive::Cylinder(c) => {
                check_unit("axis", c.axis, face_index)?;
                check_positive("radius", c.radius, face_index)?;
            }
            Primitive::Cone(c) => {
                check_unit("axis", c.axis, face_index)?;
                if !(c.semi_angle > 0.0 && c.semi_angle < FRAC_PI_2) {
                    return Err(FaceError::InvalidField {
                        field: "semi_angle",
                        face_index,
                        reason: format!("{} is outside (0, pi/2)", c.semi_angle),
                    });
                }
                if c.ref_radius < 0.0 {
                    return Err(FaceError::InvalidField {
                        field: "ref_radius",
                        face_index,
                        reason: format!("{} is negative", c.ref_radius),
                    });
                }
            }
            Primitive::Sphere(s) => {
                check_positive("radius", s.radius, face_index)?;
            }
            Primitive::Torus(t) => {
                check_unit("axis", t.axis, face_index)?;
                check_positive("major_radius", t.major_radius, face_index)?;
                check_positive("minor_radius", t.minor_radius, face_index)?;
            }
        }
        Ok(())
    }
}

pub(crate) fn check_unit(field: &'static str, v: DVec3, face_index: usize) -> Result<()> {
    let norm = v.length();
    if (norm - 1.0).abs() > UNIT_TOLERANCE {
        return Err(FaceError::NotUnit {
            field,
            face_index,
            norm,
        });
    }
    Ok(())
}

fn check_ordered(field: &'static str, bounds: Bounds, face_index: usize) -> Result<()> {
    if bounds.is_ordered() {
        Ok(())
    } else {
        Err(FaceError::InvalidField {
            field,
            face_index,
            reason: format!("[{}, {}] is not increasing", bounds.min, bounds.max),
        })
    }
}

fn check_positive(field: &'static str, value: f64, face_index: usize) -> Result<()> {
    if value > 0.0 {
        Ok(())
    } else {
        Err(FaceError::InvalidField {
            field,
            face_index,
            reason: format!("{value} must be > 0"),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn unit_cylinder() -> Cylinder {
        Cylinder {
            face_index: 3,
            u_bounds: FULL_TURN,
            v_bounds: Bounds::new(-0.5, 0.5),
            origin: DVec3::ZERO,
            axis: DVec3::Z,
            radius: 0.5,
        }
    }

    #[test]
    fn test_surface_kind_round_trip_names() {
        for kind in SurfaceKind::ALL {
            assert_eq!(kind.as_str().parse::<SurfaceKind>().unwrap(), kind);
            assert_eq!(SurfaceKind::from_tag(&kind.to_string()), Some(kind));
        }
        assert_eq!("Cylinder".parse::<SurfaceKind>().unwrap(), SurfaceKind::Cylinder);
        assert_eq!(SurfaceKind::from_tag("bspline"), None);
        assert!(matches!(
            "bspline".parse::<SurfaceKind>(),
            Err(FaceError::UnknownType(_))
        ));
    }

    #[test]
    fn test_bounds_helpers() {
        let b = Bounds::new(-0.5, 0.5);
        assert!((b.span() - 1.0).abs() < 1e-12);
        assert!(b.is_ordered());
        assert!(b.contains(0.0));
        assert!(!b.contains(0.6));
        assert!(!Bounds::new(1.0, 1.0).is_ordered());
    }

    #[test]
    fn test_primitive_accessors() {
        let prim = Primitive::Cylinder(unit_cylinder());
        assert_eq!(prim.kind(), SurfaceKind::Cylinder);
        assert_eq!(prim.face_index(), 3);
        assert_eq!(prim.u_bounds(), FULL_TURN);
        assert_eq!(prim.v_bounds(), Bounds::new(-0.5, 0.5));
    }

    #[test]
    fn test_serialize_wire_shape() {
        let prim = Primitive::Cylinder(unit_cylinder());
        let value = serde_json::to_value(prim).unwrap();
        assert_eq!(value["type"], "cylinder");
        assert_eq!(value["face_index"], 3);
        assert_eq!(value["axis"], serde_json::json!([0.0, 0.0, 1.0]));
        assert_eq!(value["v_bounds"], serde_json::json!([-0.5, 0.5]));
        assert_eq!(value["radius"], 0.5);
    }

    #[test]
    fn test_invariants_hold_for_valid_primitives() {
        let plane = Primitive::Plane(Plane {
            face_index: 0,
            u_bounds: Bounds::new(-1.0, 1.0),
            v_bounds: Bounds::new(-1.0, 1.0),
            origin: DVec3::ZERO,
            normal: DVec3::Z,
            x_dir: DVec3::X,
        });
        assert!(plane.check_invariants().is_ok());
        assert!(Primitive::Cylinder(unit_cylinder()).check_invariants().is_ok());
    }

    #[test]
    fn test_invariants_reject_bad_geometry() {
        let skewed = Primitive::Plane(Plane {
            face_index: 1,
            u_bounds: Bounds::new(-1.0, 1.0),
            v_bounds: Bounds::new(-1.0, 1.0),
            origin: DVec3::ZERO,
            normal: DVec3::Z,
            x_dir: DVec3::new(0.0, 0.6, 0.8),
        });
        assert!(matches!(
            skewed.check_invariants(),
            Err(FaceError::InvalidField { field: "x_dir", .. })
        ));

        let mut flat = unit_cylinder();
        flat.radius = 0.0;
        assert!(matches!(
            Primitive::Cylinder(flat).check_invariants(),
            Err(FaceError::InvalidField { field: "radius", .. })
        ));

        let mut long_axis = unit_cylinder();
        long_axis.axis = DVec3::new(0.0, 0.0, 2.0);
        assert!(matches!(
            Primitive::Cylinder(long_axis).check_invariants(),
            Err(FaceError::NotUnit { field: "axis", .. })
        ));

        let wide = Primitive::Cone(Cone {
            face_index: 2,
            u_bounds: FULL_TURN,
            v_bounds: Bounds::new(0.1, 1.0),
            apex: DVec3::ZERO,
            axis: DVec3::Z,
            semi_angle: FRAC_PI_2,
            ref_radius: 0.5,
        });
        assert!(matches!(
            wide.check_invariants(),
            Err(FaceError::InvalidField { field: "semi_angle", .. })
        ));
    }

    #[test]
    fn test_invariants_reject_unordered_bounds() {
        let mut reversed = unit_cylinder();
        reversed.u_bounds = Bounds::new(1.0, 0.0);
        assert!(matches!(
            Primitive::Cylinder(reversed).check_invariants(),
            Err(FaceError::InvalidField { field: "u_bounds", face_index: 3, .. })
        ));

        let mut empty = unit_cylinder();
        empty.v_bounds = Bounds::new(0.5, 0.5);
        assert!(matches!(
            Primitive::Cylinder(empty).check_invariants(),
            Err(FaceError::InvalidField { field: "v_bounds", .. })
        ));

        let sphere = Primitive::Sphere(Sphere {
            face_index: 0,
            u_bounds: FULL_TURN,
            v_bounds: Bounds::new(FRAC_PI_2, -FRAC_PI_2),
            center: DVec3::ZERO,
            radius: 1.0,
        });
        assert!(matches!(
            sphere.check_invariants(),
            Err(FaceError::InvalidField { field: "v_bounds", .. })
        ));
    }

    #[test]
    fn test_plane_frame() {
        let plane = Plane {
            face_index: 0,
            u_bounds: Bounds::new(0.0, 1.0),
            v_bounds: Bounds::new(0.0, 1.0),
            origin: DVec3::new(0.0, 0.0, 2.0),
            normal: DVec3::Z,
            x_dir: DVec3::X,
        };
        assert_eq!(plane.y_dir(), DVec3::Y);
        assert!((plane.signed_distance(DVec3::new(5.0, 5.0, 3.0)) - 1.0).abs() < 1e-12);
    }
}
