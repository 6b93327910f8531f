//! Validation of extension payloads against the resolved schema.
//!
//! Only the keyword subset used by the `TM_brep_faces` fragments is
//! interpreted; annotation keywords (`title`, `description`, `$schema`,
//! `$id`, `$defs`) are ignored. The schema must already be resolved.
//!
//! One keyword is local to this crate: `"x-ordered": true` on an array schema
//! requires a numeric pair `[min, max]` to satisfy `max > min`.

use std::cmp::Ordering;

use serde_json::{Map, Number, Value};
use tracing::debug;

use crate::bundled::{BUNDLED_SCHEMA, ROOT_FRAGMENT};
use crate::error::{ResolveError, ValidationError, ValidationErrors};
use crate::resolver::Resolver;
use crate::store::SchemaStore;

/// Pointer to the face record schema inside the root schema.
const FACE_SCHEMA_POINTER: &str = "/properties/faces/items";

/// Validates JSON instances against a resolved schema.
#[derive(Debug, Clone)]
pub struct SchemaValidator {
    schema: Value,
}

impl SchemaValidator {
    pub fn new(schema: Value) -> Self {
        Self { schema }
    }

    /// Resolve `root` from `store` and validate against it.
    pub fn from_store(store: &SchemaStore, root: &str) -> Result<Self, ResolveError> {
        Ok(Self::new(Resolver::new(store).resolve_root(root)?))
    }

    /// The packaged schema.
    pub fn bundled() -> Result<Self, ResolveError> {
        let schema = serde_json::from_str(BUNDLED_SCHEMA).map_err(|source| ResolveError::Json {
            path: ROOT_FRAGMENT.into(),
            source,
        })?;
        Ok(Self::new(schema))
    }

    pub fn schema(&self) -> &Value {
        &self.schema
    }

    /// Validate `instance` against the whole schema.
    pub fn validate(&self, instance: &Value) -> Result<(), ValidationErrors> {
        let mut errors = Vec::new();
        check(&self.schema, instance, "", &mut errors);
        finish(errors)
    }

    /// Validate an extension payload, attributing errors to faces.
    pub fn validate_extension(&self, payload: &Value) -> Result<(), ValidationErrors> {
        let mut errors = Vec::new();
        check(&self.schema, payload, "", &mut errors);
        for error in &mut errors {
            error.face_index = face_of_path(&error.path);
        }
        finish(errors)
    }

    /// Validate one face record (or `null`) on its own.
    ///
    /// Errors are attributed to the record's `face_index` when it has one.
    pub fn validate_face(&self, record: &Value) -> Result<(), ValidationErrors> {
        let schema = self.schema.pointer(FACE_SCHEMA_POINTER).unwrap_or(&self.schema);
        let mut errors = Vec::new();
        check(schema, record, "", &mut errors);
        let face_index = record
            .get("face_index")
            .and_then(Value::as_u64)
            .and_then(|i| usize::try_from(i).ok());
        for error in &mut errors {
            error.face_index = face_index;
        }
        finish(errors)
    }
}

fn finish(errors: Vec<ValidationError>) -> Result<(), ValidationErrors> {
    if errors.is_empty() {
        Ok(())
    } else {
        debug!(count = errors.len(), "schema validation failed");
        Err(ValidationErrors { errors })
    }
}

/// `/faces/<n>/...` belongs to face `n`.
fn face_of_path(path: &str) -> Option<usize> {
    let rest = path.strip_prefix("/faces/")?;
    rest.split('/').next()?.parse().ok()
}

fn push(errors: &mut Vec<ValidationError>, path: &str, message: String) {
    errors.push(ValidationError {
        path: path.to_string(),
        message,
        face_index: None,
    });
}

fn child(path: &str, segment: &str) -> String {
    let escaped = segment.replace('~', "~0").replace('/', "~1");
    format!("{path}/{escaped}")
}

fn check(schema: &Value, instance: &Value, path: &str, errors: &mut Vec<ValidationError>) {
    let keywords = match schema {
        Value::Bool(true) => return,
        Value::Bool(false) => {
            push(errors, path, "no value is allowed here".to_string());
            return;
        }
        Value::Object(map) => map,
        _ => return,
    };

    check_type(keywords, instance, path, errors);
    check_literal(keywords, instance, path, errors);
    if let Value::Number(n) = instance {
        check_number(keywords, n, path, errors);
    }
    if let Value::Array(items) = instance {
        check_array(keywords, items, path, errors);
    }
    if let Value::Object(object) = instance {
        check_object(keywords, object, path, errors);
    }
    check_combinators(keywords, instance, path, errors);
}

fn type_name(instance: &Value) -> &'static str {
    match instance {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

fn is_type(instance: &Value, name: &str) -> bool {
    match name {
        "integer" => match instance {
            Value::Number(n) => {
                n.is_i64() || n.is_u64() || n.as_f64().is_some_and(|f| f.fract() == 0.0)
            }
            _ => false,
        },
        other => type_name(instance) == other,
    }
}

fn check_type(
    keywords: &Map<String, Value>,
    instance: &Value,
    path: &str,
    errors: &mut Vec<ValidationError>,
) {
    let allowed: Vec<&str> = match keywords.get("type") {
        Some(Value::String(name)) => vec![name.as_str()],
        Some(Value::Array(names)) => names.iter().filter_map(Value::as_str).collect(),
        _ => return,
    };
    if !allowed.iter().any(|name| is_type(instance, name)) {
        push(
            errors,
            path,
            format!("expected {}, found {}", allowed.join(" or "), type_name(instance)),
        );
    }
}

fn check_literal(
    keywords: &Map<String, Value>,
    instance: &Value,
    path: &str,
    errors: &mut Vec<ValidationError>,
) {
    if let Some(expected) = keywords.get("const") {
        if !json_eq(expected, instance) {
            push(errors, path, format!("expected {expected}, found {instance}"));
        }
    }
    if let Some(Value::Array(options)) = keywords.get("enum") {
        if !options.iter().any(|option| json_eq(option, instance)) {
            let options = Value::Array(options.clone());
            push(errors, path, format!("{instance} is not one of {options}"));
        }
    }
}

fn check_number(
    keywords: &Map<String, Value>,
    n: &Number,
    path: &str,
    errors: &mut Vec<ValidationError>,
) {
    let Some(value) = n.as_f64() else {
        return;
    };
    let limit = |key: &str| keywords.get(key).and_then(Value::as_f64);

    if let Some(min) = limit("minimum") {
        if value < min {
            push(errors, path, format!("{value} is less than the minimum of {min}"));
        }
    }
    if let Some(max) = limit("maximum") {
        if value > max {
            push(errors, path, format!("{value} is greater than the maximum of {max}"));
        }
    }
    if let Some(min) = limit("exclusiveMinimum") {
        if value <= min {
            push(errors, path, format!("{value} must be greater than {min}"));
        }
    }
    if let Some(max) = limit("exclusiveMaximum") {
        if value >= max {
            push(errors, path, format!("{value} must be less than {max}"));
        }
    }
}

fn check_array(
    keywords: &Map<String, Value>,
    items: &[Value],
    path: &str,
    errors: &mut Vec<ValidationError>,
) {
    let count = |key: &str| keywords.get(key).and_then(Value::as_u64);

    if let Some(min) = count("minItems") {
        if (items.len() as u64) < min {
            let found = items.len();
            push(errors, path, format!("expected at least {min} items, found {found}"));
        }
    }
    if let Some(max) = count("maxItems") {
        if (items.len() as u64) > max {
            let found = items.len();
            push(errors, path, format!("expected at most {max} items, found {found}"));
        }
    }
    match keywords.get("items") {
        Some(Value::Array(positional)) => {
            for (i, (schema, item)) in positional.iter().zip(items).enumerate() {
                check(schema, item, &child(path, &i.to_string()), errors);
            }
        }
        Some(schema) => {
            for (i, item) in items.iter().enumerate() {
                check(schema, item, &child(path, &i.to_string()), errors);
            }
        }
        None => {}
    }
    if keywords.get("x-ordered") == Some(&Value::Bool(true)) {
        if let [Some(min), Some(max)] = [items.first(), items.get(1)].map(|v| v?.as_f64()) {
            if max.partial_cmp(&min) != Some(Ordering::Greater) {
                push(errors, path, format!("[{min}, {max}] must satisfy max > min"));
            }
        }
    }
}

fn check_object(
    keywords: &Map<String, Value>,
    object: &Map<String, Value>,
    path: &str,
    errors: &mut Vec<ValidationError>,
) {
    if let Some(Value::Array(required)) = keywords.get("required") {
        for name in required.iter().filter_map(Value::as_str) {
            if !object.contains_key(name) {
                push(
                    errors,
                    &child(path, name),
                    format!("missing required property '{name}'"),
                );
            }
        }
    }

    let properties = keywords.get("properties").and_then(Value::as_object);
    if let Some(properties) = properties {
        for (name, schema) in properties {
            if let Some(value) = object.get(name) {
                check(schema, value, &child(path, name), errors);
            }
        }
    }

    if let Some(additional) = keywords.get("additionalProperties") {
        for (name, value) in object {
            if properties.is_some_and(|p| p.contains_key(name)) {
                continue;
            }
            match additional {
                Value::Bool(false) => push(
                    errors,
                    &child(path, name),
                    format!("unexpected property '{name}'"),
                ),
                schema => check(schema, value, &child(path, name), errors),
            }
        }
    }
}

fn check_combinators(
    keywords: &Map<String, Value>,
    instance: &Value,
    path: &str,
    errors: &mut Vec<ValidationError>,
) {
    if let Some(Value::Array(schemas)) = keywords.get("allOf") {
        for schema in schemas {
            check(schema, instance, path, errors);
        }
    }

    if let Some(Value::Array(schemas)) = keywords.get("anyOf") {
        let outcomes = branch_outcomes(schemas, instance, path);
        if !outcomes.iter().any(Vec::is_empty) {
            errors.extend(closest_branch(outcomes));
        }
    }

    if let Some(Value::Array(schemas)) = keywords.get("oneOf") {
        let outcomes = branch_outcomes(schemas, instance, path);
        match outcomes.iter().filter(|o| o.is_empty()).count() {
            1 => {}
            0 => errors.extend(closest_branch(outcomes)),
            n => push(
                errors,
                path,
                format!("value matches {n} alternatives, expected exactly one"),
            ),
        }
    }

    if let Some(schema) = keywords.get("not") {
        if passes(schema, instance, path) {
            push(errors, path, "value matches a disallowed schema".to_string());
        }
    }

    if let Some(condition) = keywords.get("if") {
        let branch = if passes(condition, instance, path) {
            keywords.get("then")
        } else {
            keywords.get("else")
        };
        if let Some(schema) = branch {
            check(schema, instance, path, errors);
        }
    }
}

fn passes(schema: &Value, instance: &Value, path: &str) -> bool {
    let mut errors = Vec::new();
    check(schema, instance, path, &mut errors);
    errors.is_empty()
}

fn branch_outcomes(schemas: &[Value], instance: &Value, path: &str) -> Vec<Vec<ValidationError>> {
    schemas
        .iter()
        .map(|schema| {
            let mut errors = Vec::new();
            check(schema, instance, path, &mut errors);
            errors
        })
        .collect()
}

/// The failing alternative that came closest: fewest errors, then the
/// deepest error location.
fn closest_branch(outcomes: Vec<Vec<ValidationError>>) -> Vec<ValidationError> {
    let depth = |errors: &[ValidationError]| {
        errors
            .iter()
            .map(|e| e.path.matches('/').count())
            .max()
            .unwrap_or(0)
    };
    outcomes
        .into_iter()
        .min_by(|a, b| {
            a.len()
                .cmp(&b.len())
                .then_with(|| depth(b).cmp(&depth(a)))
        })
        .unwrap_or_default()
}

/// Structural equality with numbers compared by value, so `1` equals `1.0`.
fn json_eq(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => x.as_f64() == y.as_f64(),
        (Value::Array(x), Value::Array(y)) => {
            x.len() == y.len() && x.iter().zip(y).all(|(a, b)| json_eq(a, b))
        }
        (Value::Object(x), Value::Object(y)) => {
            x.len() == y.len()
                && x.iter()
                    .all(|(key, a)| y.get(key).is_some_and(|b| json_eq(a, b)))
        }
        _ => a == b,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn validator() -> SchemaValidator {
        SchemaValidator::bundled().unwrap()
    }

    fn cylinder() -> Value {
        json!({
            "type": "cylinder", "face_index": 3,
            "u_bounds": [0.0, 6.283], "v_bounds": [-0.5, 0.5],
            "origin": [0, 0, 0], "axis": [0, 0, 1], "radius": 0.5
        })
    }

    fn valid_faces() -> Vec<Value> {
        vec![
            json!({
                "type": "plane", "face_index": 0,
                "u_bounds": [-1.0, 1.0], "v_bounds": [-1.0, 1.0],
                "origin": [0, 0, 0], "normal": [0, 0, 1], "x_dir": [1, 0, 0]
            }),
            json!({
                "type": "cylinder", "face_index": 1,
                "u_bounds": [0.0, 6.283], "v_bounds": [-0.5, 0.5],
                "origin": [0, 0, 0], "axis": [0, 0, 1], "radius": 0.5
            }),
            json!({
                "type": "cone", "face_index": 2,
                "u_bounds": [0.0, 6.283], "v_bounds": [0.0, 1.0],
                "apex": [0, 0, 1], "axis": [0, 0, -1], "semi_angle": 0.4, "ref_radius": 0.0
            }),
            json!({
                "type": "sphere", "face_index": 3,
                "u_bounds": [0.0, 6.283], "v_bounds": [-1.5707, 1.5707],
                "center": [0, 0, 0], "radius": 2.0
            }),
            json!({
                "type": "torus", "face_index": 4,
                "u_bounds": [0.0, 6.283], "v_bounds": [0.0, 6.283],
                "center": [0, 0, 0], "axis": [0, 1, 0],
                "major_radius": 1.0, "minor_radius": 0.25
            }),
        ]
    }

    #[test]
    fn test_all_kinds_validate() {
        let validator = validator();
        for face in valid_faces() {
            assert!(validator.validate_face(&face).is_ok(), "{face}");
        }
        assert!(validator.validate_face(&Value::Null).is_ok());
    }

    #[test]
    fn test_zero_radius_rejected() {
        let mut face = cylinder();
        face["radius"] = json!(0);
        let errors = validator().validate_face(&face).unwrap_err();
        assert!(errors.mentions("radius"), "{errors}");
        assert!(errors.iter().all(|e| e.face_index == Some(3)));
    }

    #[test]
    fn test_short_vector_rejected() {
        let mut face = cylinder();
        face["origin"] = json!([0.0, 0.0]);
        let errors = validator().validate_face(&face).unwrap_err();
        assert!(errors.mentions("origin"), "{errors}");
    }

    #[test]
    fn test_missing_fields_rejected() {
        let validator = validator();
        for field in ["type", "face_index", "v_bounds", "origin", "axis", "radius"] {
            let mut face = cylinder();
            face.as_object_mut().unwrap().remove(field);
            assert!(
                validator.validate_face(&face).is_err(),
                "record without {field} validated"
            );
        }
    }

    #[test]
    fn test_defaulted_angular_bounds_are_optional() {
        let validator = validator();
        let mut face = cylinder();
        face.as_object_mut().unwrap().remove("u_bounds");
        assert!(validator.validate_face(&face).is_ok());

        let sphere = json!({
            "type": "sphere", "face_index": 0, "center": [0, 0, 0], "radius": 1.0
        });
        assert!(validator.validate_face(&sphere).is_ok());

        let mut plane = valid_faces()[0].clone();
        plane.as_object_mut().unwrap().remove("u_bounds");
        assert!(validator.validate_face(&plane).unwrap_err().mentions("u_bounds"));
    }

    #[test]
    fn test_unordered_bounds_rejected() {
        let validator = validator();

        let mut reversed = cylinder();
        reversed["u_bounds"] = json!([1.0, 0.0]);
        let errors = validator.validate_face(&reversed).unwrap_err();
        assert!(errors.iter().any(|e| e.path == "/u_bounds"), "{errors}");

        let mut empty = cylinder();
        empty["v_bounds"] = json!([0.5, 0.5]);
        let errors = validator.validate_face(&empty).unwrap_err();
        assert!(errors.iter().any(|e| e.path == "/v_bounds"), "{errors}");

        let payload = json!({ "faceIndices": 0, "faces": [Value::Null, reversed] });
        let errors = validator.validate_extension(&payload).unwrap_err();
        let bound = errors.iter().find(|e| e.path == "/faces/1/u_bounds").unwrap();
        assert_eq!(bound.face_index, Some(1));
    }

    #[test]
    fn test_ordered_keyword() {
        let validator = SchemaValidator::new(json!({ "type": "array", "x-ordered": true }));
        assert!(validator.validate(&json!([0, 1])).is_ok());
        assert!(validator.validate(&json!([1, 0])).is_err());
        assert!(validator.validate(&json!([-0.5, -0.5])).is_err());
        assert!(validator.validate(&json!(["a", "b"])).is_ok());
    }

    #[test]
    fn test_unknown_face_type_rejected() {
        let face = json!({ "type": "bspline", "face_index": 0 });
        assert!(validator().validate_face(&face).is_err());
    }

    #[test]
    fn test_extension_payload() {
        let validator = validator();
        let mut faces = valid_faces();
        faces.push(Value::Null);
        let payload = json!({
            "faceIndices": 2,
            "faces": faces,
            "materials": [{ "name": "steel", "baseColor": [0.5, 0.5, 0.5] }]
        });
        assert!(validator.validate_extension(&payload).is_ok());
        assert!(validator.validate(&payload).is_ok());
    }

    #[test]
    fn test_extension_errors_carry_face_index() {
        let mut bad = cylinder();
        bad["radius"] = json!(-1.0);
        let payload = json!({ "faceIndices": 0, "faces": [Value::Null, bad] });
        let errors = validator().validate_extension(&payload).unwrap_err();
        let radius = errors.iter().find(|e| e.field() == Some("radius")).unwrap();
        assert_eq!(radius.path, "/faces/1/radius");
        assert_eq!(radius.face_index, Some(1));
    }

    #[test]
    fn test_extension_requires_fields() {
        let errors = validator()
            .validate_extension(&json!({ "faces": [] }))
            .unwrap_err();
        assert!(errors.mentions("faceIndices"));

        let errors = validator()
            .validate_extension(&json!({ "faceIndices": -1, "faces": [] }))
            .unwrap_err();
        assert!(errors.mentions("faceIndices"));
    }

    #[test]
    fn test_direction_components_bounded() {
        let mut face = cylinder();
        face["axis"] = json!([0.0, 0.0, 2.0]);
        let errors = validator().validate_face(&face).unwrap_err();
        assert!(errors.iter().any(|e| e.path == "/axis/2"), "{errors}");
    }

    #[test]
    fn test_cone_semi_angle_range() {
        let mut cone = valid_faces()[2].clone();
        cone["semi_angle"] = json!(std::f64::consts::FRAC_PI_2);
        assert!(validator().validate_face(&cone).unwrap_err().mentions("semi_angle"));
    }

    #[test]
    fn test_keywords() {
        let schema = json!({
            "type": ["object", "null"],
            "properties": {
                "kind": { "enum": ["a", "b"] },
                "n": { "type": "integer", "maximum": 10 }
            },
            "additionalProperties": false,
            "if": { "properties": { "kind": { "const": "a" } }, "required": ["kind"] },
            "then": { "required": ["n"] },
            "else": { "not": { "required": ["n"] } }
        });
        let validator = SchemaValidator::new(schema);
        assert!(validator.validate(&Value::Null).is_ok());
        assert!(validator.validate(&json!({ "kind": "a", "n": 3.0 })).is_ok());
        assert!(validator.validate(&json!({ "kind": "b" })).is_ok());
        assert!(validator.validate(&json!({ "kind": "a" })).is_err());
        assert!(validator.validate(&json!({ "kind": "b", "n": 1 })).is_err());
        assert!(validator.validate(&json!({ "kind": "c" })).is_err());
        assert!(validator.validate(&json!({ "kind": "a", "n": 11 })).is_err());
        assert!(validator.validate(&json!({ "kind": "a", "n": 1.5 })).is_err());
        let errors = validator.validate(&json!({ "extra": 1 })).unwrap_err();
        assert!(errors.mentions("extra"));
    }

    #[test]
    fn test_one_of_rejects_ambiguity() {
        let validator =
            SchemaValidator::new(json!({ "oneOf": [{ "type": "number" }, { "minimum": 0 }] }));
        assert!(validator.validate(&json!(-1)).is_ok());
        assert!(validator.validate(&json!(1)).is_err());
    }

    #[test]
    fn test_const_compares_numbers_by_value() {
        assert!(json_eq(&json!(1), &json!(1.0)));
        assert!(json_eq(&json!({ "a": [1, 2] }), &json!({ "a": [1.0, 2.0] })));
        assert!(!json_eq(&json!([1]), &json!([1, 1])));
    }

    #[test]
    fn test_from_store_matches_bundled() {
        let store = SchemaStore::bundled().unwrap();
        let fresh = SchemaValidator::from_store(&store, ROOT_FRAGMENT).unwrap();
        assert_eq!(fresh.schema(), validator().schema());
    }

    #[test]
    fn test_serialized_primitives_validate() {
        use cadmesh_core::parse_faces;

        let validator = validator();
        let faces = valid_faces();
        for primitive in parse_faces(&faces).unwrap().into_iter().flatten() {
            let record = serde_json::to_value(&primitive).unwrap();
            assert!(validator.validate_face(&record).is_ok(), "{record}");
        }
    }
}
