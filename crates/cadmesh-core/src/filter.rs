//! Type filtering that preserves face list alignment.
//!
//! The per-triangle face-index array is computed once at tessellation time
//! and points into the face list by position. Filtering therefore never
//! removes entries: faces outside the requested kinds become `null` in place.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::errors::Result;
use crate::primitive::SurfaceKind;

/// A set of surface kinds to keep. The empty set keeps everything.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TypeFilter {
    kinds: BTreeSet<SurfaceKind>,
}

impl TypeFilter {
    /// A filter that keeps every face.
    pub fn all() -> Self {
        Self::default()
    }

    /// A filter keeping only `kinds`.
    pub fn only(kinds: impl IntoIterator<Item = SurfaceKind>) -> Self {
        Self {
            kinds: kinds.into_iter().collect(),
        }
    }

    /// Build a filter from wire names such as `"plane"` or `"cylinder"`.
    pub fn parse<I, S>(names: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let kinds = names
            .into_iter()
            .map(|name| name.as_ref().parse::<SurfaceKind>())
            .collect::<Result<BTreeSet<_>>>()?;
        Ok(Self { kinds })
    }

    /// Whether this filter keeps every face unchanged.
    pub fn is_unfiltered(&self) -> bool {
        self.kinds.is_empty()
    }

    pub fn allows(&self, kind: SurfaceKind) -> bool {
        self.kinds.is_empty() || self.kinds.contains(&kind)
    }

    pub fn kinds(&self) -> impl Iterator<Item = SurfaceKind> + '_ {
        self.kinds.iter().copied()
    }

    /// Whether `record` survives this filter.
    ///
    /// An active filter only keeps records whose `type` is one of its kinds,
    /// so non-analytical and unrecognized records are dropped to `null`.
    pub fn keeps(&self, record: &Value) -> bool {
        if self.is_unfiltered() {
            return true;
        }
        face_kind(record).is_some_and(|kind| self.kinds.contains(&kind))
    }
}

impl FromIterator<SurfaceKind> for TypeFilter {
    fn from_iter<T: IntoIterator<Item = SurfaceKind>>(iter: T) -> Self {
        Self::only(iter)
    }
}

/// The analytical kind declared by a face record, if any.
pub fn face_kind(record: &Value) -> Option<SurfaceKind> {
    record
        .get("type")
        .and_then(Value::as_str)
        .and_then(SurfaceKind::from_tag)
}

/// Apply `filter` to a face list.
///
/// The result always has `faces.len()` entries; filtered faces are `null`
/// at their original position.
pub fn filter_faces(faces: &[Value], filter: &TypeFilter) -> Vec<Value> {
    faces
        .iter()
        .map(|face| {
            if filter.keeps(face) {
                face.clone()
            } else {
                Value::Null
            }
        })
        .collect()
}

/// Count analytical faces per kind. `null` and unrecognized records are not counted.
pub fn kind_counts(faces: &[Value]) -> BTreeMap<SurfaceKind, usize> {
    let mut counts = BTreeMap::new();
    for kind in faces.iter().filter_map(face_kind) {
        *counts.entry(kind).or_insert(0) += 1;
    }
    counts
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::FaceError;
    use crate::parse::parse_faces;
    use proptest::prelude::*;
    use serde_json::json;

    fn record(kind: SurfaceKind, face_index: usize) -> Value {
        match kind {
            SurfaceKind::Plane => json!({
                "type": "plane", "face_index": face_index,
                "u_bounds": [-1.0, 1.0], "v_bounds": [-1.0, 1.0],
                "origin": [0.0, 0.0, 0.0], "normal": [0.0, 0.0, 1.0], "x_dir": [1.0, 0.0, 0.0]
            }),
            SurfaceKind::Cylinder => json!({
                "type": "cylinder", "face_index": face_index,
                "u_bounds": [0.0, 6.283], "v_bounds": [0.0, 0.01],
                "origin": [0.0, 0.0, 0.0], "axis": [0.0, 0.0, 1.0], "radius": 0.005
            }),
            SurfaceKind::Cone => json!({
                "type": "cone", "face_index": face_index,
                "u_bounds": [0.0, 6.283], "v_bounds": [0.1, 1.0],
                "apex": [0.0, 0.0, 0.0], "axis": [0.0, 0.0, 1.0],
                "semi_angle": 0.5, "ref_radius": 0.2
            }),
            SurfaceKind::Sphere => json!({
                "type": "sphere", "face_index": face_index,
                "center": [0.0, 0.0, 0.0], "radius": 1.0
            }),
            SurfaceKind::Torus => json!({
                "type": "torus", "face_index": face_index,
                "center": [0.0, 0.0, 0.0], "axis": [0.0, 1.0, 0.0],
                "major_radius": 1.0, "minor_radius": 0.1
            }),
        }
    }

    /// 46 cylinders, 49 planes and one free-form face.
    fn feature_part() -> Vec<Value> {
        (0..96)
            .map(|i| match i {
                50 => Value::Null,
                i if i % 2 == 0 && i < 94 => record(SurfaceKind::Cylinder, i),
                i => record(SurfaceKind::Plane, i),
            })
            .collect()
    }

    #[test]
    fn test_feature_part_composition() {
        let faces = feature_part();
        let counts = kind_counts(&faces);
        assert_eq!(counts[&SurfaceKind::Cylinder], 46);
        assert_eq!(counts[&SurfaceKind::Plane], 49);
    }

    #[test]
    fn test_filter_cylinders_only() {
        let faces = feature_part();
        let filtered = filter_faces(&faces, &TypeFilter::only([SurfaceKind::Cylinder]));
        assert_eq!(filtered.len(), 96);
        let kept: Vec<_> = filtered.iter().filter(|f| !f.is_null()).collect();
        assert_eq!(kept.len(), 46);
        assert!(kept
            .iter()
            .all(|f| face_kind(f) == Some(SurfaceKind::Cylinder)));
    }

    #[test]
    fn test_filter_cylinders_and_planes() {
        let faces = feature_part();
        let filter = TypeFilter::parse(["cylinder", "plane"]).unwrap();
        let filtered = filter_faces(&faces, &filter);
        assert_eq!(filtered.len(), 96);
        assert_eq!(filtered.iter().filter(|f| !f.is_null()).count(), 95);

        let parsed = parse_faces(&filtered).unwrap();
        assert_eq!(parsed.len(), 96);
        assert!(parsed[50].is_none());
    }

    #[test]
    fn test_filtered_positions_are_stable() {
        let faces = feature_part();
        let filtered = filter_faces(&faces, &TypeFilter::only([SurfaceKind::Plane]));
        for (i, face) in filtered.iter().enumerate() {
            if !face.is_null() {
                assert_eq!(face["face_index"], i);
            }
        }
    }

    #[test]
    fn test_unfiltered_keeps_everything() {
        let faces = feature_part();
        assert_eq!(filter_faces(&faces, &TypeFilter::all()), faces);
        assert!(TypeFilter::all().allows(SurfaceKind::Torus));
    }

    #[test]
    fn test_parse_rejects_unknown_names() {
        assert!(matches!(
            TypeFilter::parse(["plane", "nurbs"]),
            Err(FaceError::UnknownType(name)) if name == "nurbs"
        ));
    }

    #[test]
    fn test_filter_serde() {
        let filter: TypeFilter = serde_json::from_value(json!(["torus", "plane"])).unwrap();
        assert_eq!(
            filter.kinds().collect::<Vec<_>>(),
            vec![SurfaceKind::Plane, SurfaceKind::Torus]
        );
        assert_eq!(serde_json::to_value(&filter).unwrap(), json!(["plane", "torus"]));
    }

    fn face_strategy() -> impl Strategy<Value = Option<SurfaceKind>> {
        prop::option::weighted(0.8, prop::sample::select(SurfaceKind::ALL.to_vec()))
    }

    proptest! {
        #[test]
        fn prop_filter_preserves_length(
            kinds in prop::collection::vec(face_strategy(), 0..200),
            mask in prop::array::uniform5(any::<bool>()),
        ) {
            let keep: BTreeSet<SurfaceKind> = SurfaceKind::ALL
                .iter()
                .zip(mask)
                .filter_map(|(kind, on)| on.then_some(*kind))
                .collect();
            prop_assume!(!keep.is_empty());
            let faces: Vec<Value> = kinds
                .iter()
                .enumerate()
                .map(|(i, k)| k.map_or(Value::Null, |k| record(k, i)))
                .collect();
            let filter = TypeFilter::only(keep.iter().copied());
            let filtered = filter_faces(&faces, &filter);

            prop_assert_eq!(filtered.len(), faces.len());
            let expected = kinds.iter().filter(|k| k.is_some_and(|k| keep.contains(&k))).count();
            prop_assert_eq!(filtered.iter().filter(|f| !f.is_null()).count(), expected);

            let parsed = parse_faces(&filtered).unwrap();
            prop_assert_eq!(parsed.len(), faces.len());
            for (i, prim) in parsed.iter().enumerate() {
                if let Some(prim) = prim {
                    prop_assert_eq!(prim.face_index(), i);
                    prop_assert!(keep.contains(&prim.kind()));
                }
            }
        }
    }
}
