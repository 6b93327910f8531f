//! `$ref` inlining.
//!
//! A fragment set is turned into one self-contained schema by replacing every
//! mapping that carries a `$ref` with the (recursively resolved) value it
//! points at. Sibling keys of a `$ref` are discarded.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::{debug, trace};

use crate::bundled::ROOT_FRAGMENT;
use crate::error::{ResolveError, Result};
use crate::store::SchemaStore;

/// Default limit on nested `$ref` expansion.
pub const DEFAULT_MAX_DEPTH: usize = 64;

/// Options controlling resolution.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ResolveOptions {
    /// Maximum number of `$ref`s being expanded at once.
    pub max_depth: usize,
}

impl Default for ResolveOptions {
    fn default() -> Self {
        Self {
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }
}

impl ResolveOptions {
    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }
}

/// Follow a JSON pointer such as `/$defs/vec3` inside `fragment`.
///
/// Empty segments are ignored, so `""` and `"/"` both name the fragment
/// itself. `~1` and `~0` unescape to `/` and `~`; arrays are indexed by
/// decimal position.
pub fn resolve_pointer<'a>(fragment: &'a Value, pointer: &str) -> Result<&'a Value> {
    navigate(fragment, pointer, pointer)
}

fn navigate<'a>(fragment: &'a Value, pointer: &str, reference: &str) -> Result<&'a Value> {
    let mut current = fragment;
    for raw in pointer.split('/').filter(|s| !s.is_empty()) {
        let segment = raw.replace("~1", "/").replace("~0", "~");
        trace!(reference, segment = %segment, "following pointer segment");
        let next = match current {
            Value::Object(map) => map.get(&segment),
            Value::Array(items) => segment.parse::<usize>().ok().and_then(|i| items.get(i)),
            _ => None,
        };
        current = next.ok_or_else(|| ResolveError::MissingSegment {
            reference: reference.to_string(),
            segment: segment.clone(),
        })?;
    }
    Ok(current)
}

/// Whether `node` is free of `$ref` keys.
pub fn is_resolved(node: &Value) -> bool {
    match node {
        Value::Object(map) => !map.contains_key("$ref") && map.values().all(is_resolved),
        Value::Array(items) => items.iter().all(is_resolved),
        _ => true,
    }
}

/// Resolve the bundled fragment set from its root.
pub fn resolve_bundled() -> Result<Value> {
    let store = SchemaStore::bundled()?;
    Resolver::new(&store).resolve_root(ROOT_FRAGMENT)
}

/// Inlines `$ref`s against a [`SchemaStore`].
#[derive(Debug, Clone)]
pub struct Resolver<'s> {
    store: &'s SchemaStore,
    options: ResolveOptions,
}

impl<'s> Resolver<'s> {
    pub fn new(store: &'s SchemaStore) -> Self {
        Self::with_options(store, ResolveOptions::default())
    }

    pub fn with_options(store: &'s SchemaStore, options: ResolveOptions) -> Self {
        Self { store, options }
    }

    pub fn options(&self) -> &ResolveOptions {
        &self.options
    }

    /// Look up the raw target of `reference` without resolving inside it.
    ///
    /// `"name.schema.json"` is the whole fragment, `"name.schema.json#/a/b"`
    /// a pointer into it.
    pub fn resolve_ref(&self, reference: &str) -> Result<&'s Value> {
        let target = split_ref(reference, None)?;
        let (_, fragment) = self.fragment(target.fragment, reference)?;
        match target.pointer {
            Some(pointer) => navigate(fragment, pointer, reference),
            None => Ok(fragment),
        }
    }

    /// Resolve every `$ref` inside `node`.
    ///
    /// Same-fragment references (`"#/..."`) are rejected here since `node`
    /// does not belong to a fragment; use [`Resolver::resolve_root`] for
    /// fragments that contain them.
    pub fn resolve(&self, node: &Value) -> Result<Value> {
        self.walk().node(node, None)
    }

    /// Resolve the fragment named `name`.
    pub fn resolve_root(&self, name: &str) -> Result<Value> {
        debug!(root = name, "resolving schema");
        self.walk().reference(name, None)
    }

    /// Resolve every fragment of the store independently.
    pub fn resolve_all(&self) -> Result<SchemaStore> {
        let mut resolved = SchemaStore::new();
        for name in self.store.names() {
            resolved.insert(name, self.resolve_root(name)?);
        }
        Ok(resolved)
    }

    fn walk(&self) -> Walk<'s> {
        Walk {
            store: self.store,
            max_depth: self.options.max_depth,
            active: Vec::new(),
        }
    }

    fn fragment(&self, name: &str, reference: &str) -> Result<(&'s str, &'s Value)> {
        lookup(self.store, name, reference)
    }
}

fn lookup<'s>(store: &'s SchemaStore, name: &str, reference: &str) -> Result<(&'s str, &'s Value)> {
    store
        .get_entry(name)
        .ok_or_else(|| ResolveError::UnknownFragment {
            fragment: name.to_string(),
            reference: reference.to_string(),
        })
}

struct RefTarget<'r> {
    fragment: &'r str,
    pointer: Option<&'r str>,
}

fn split_ref<'r>(reference: &'r str, base: Option<&'r str>) -> Result<RefTarget<'r>> {
    let (fragment, pointer) = match reference.split_once('#') {
        Some((fragment, pointer)) => (fragment, Some(pointer)),
        None => (reference, None),
    };
    let fragment = if fragment.is_empty() {
        base.ok_or_else(|| ResolveError::InvalidRef(reference.to_string()))?
    } else {
        fragment
    };
    Ok(RefTarget { fragment, pointer })
}

/// State of one resolution pass.
struct Walk<'s> {
    store: &'s SchemaStore,
    max_depth: usize,
    /// References currently being expanded, outermost first.
    active: Vec<String>,
}

impl<'s> Walk<'s> {
    fn node(&mut self, node: &Value, base: Option<&'s str>) -> Result<Value> {
        match node {
            Value::Object(map) => {
                if let Some(reference) = map.get("$ref") {
                    let reference = reference
                        .as_str()
                        .ok_or_else(|| ResolveError::InvalidRef(reference.to_string()))?;
                    return self.reference(reference, base);
                }
                let mut out = Map::with_capacity(map.len());
                for (key, value) in map {
                    out.insert(key.clone(), self.node(value, base)?);
                }
                Ok(Value::Object(out))
            }
            Value::Array(items) => items
                .iter()
                .map(|item| self.node(item, base))
                .collect::<Result<Vec<_>>>()
                .map(Value::Array),
            scalar => Ok(scalar.clone()),
        }
    }

    fn reference(&mut self, reference: &str, base: Option<&'s str>) -> Result<Value> {
        if reference.is_empty() {
            return Err(ResolveError::InvalidRef(reference.to_string()));
        }
        let target = split_ref(reference, base)?;
        let key = match target.pointer {
            Some(pointer) => format!("{}#{}", target.fragment, pointer),
            None => target.fragment.to_string(),
        };

        if self.active.contains(&key) {
            let mut chain = self.active.clone();
            chain.push(key);
            return Err(ResolveError::Cycle { chain });
        }
        if self.active.len() >= self.max_depth {
            return Err(ResolveError::DepthExceeded {
                reference: reference.to_string(),
                max_depth: self.max_depth,
            });
        }

        let (name, fragment) = lookup(self.store, target.fragment, reference)?;
        let value = match target.pointer {
            Some(pointer) => navigate(fragment, pointer, reference)?,
            None => fragment,
        };

        debug!(reference, depth = self.active.len(), "inlining $ref");
        self.active.push(key);
        let resolved = self.node(value, Some(name));
        self.active.pop();
        resolved
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bundled::BUNDLED_SCHEMA;
    use serde_json::json;

    fn store(fragments: &[(&str, Value)]) -> SchemaStore {
        fragments
            .iter()
            .map(|(name, value)| (name.to_string(), value.clone()))
            .collect()
    }

    #[test]
    fn test_bundled_artifact_is_current() {
        let packaged: Value = serde_json::from_str(BUNDLED_SCHEMA).unwrap();
        assert_eq!(resolve_bundled().unwrap(), packaged);
    }

    #[test]
    fn test_resolution_is_idempotent() {
        let resolved = resolve_bundled().unwrap();
        assert!(is_resolved(&resolved));

        let store = SchemaStore::bundled().unwrap();
        let again = Resolver::new(&store).resolve(&resolved).unwrap();
        assert_eq!(again, resolved);
    }

    #[test]
    fn test_every_bundled_fragment_resolves() {
        let store = SchemaStore::bundled().unwrap();
        let resolved = Resolver::new(&store).resolve_all().unwrap();
        assert_eq!(resolved.len(), store.len());
        assert!(resolved.fragments().all(|(_, v)| is_resolved(v)));
    }

    #[test]
    fn test_pointer_ref_inlines_definition() {
        let store = SchemaStore::bundled().unwrap();
        let resolver = Resolver::new(&store);
        let vec3 = resolver
            .resolve_ref("definitions.schema.json#/$defs/vec3")
            .unwrap();
        assert_eq!(vec3["minItems"], 3);

        let node = json!({ "center": { "$ref": "definitions.schema.json#/$defs/vec3" } });
        let resolved = resolver.resolve(&node).unwrap();
        assert_eq!(resolved["center"], *vec3);
    }

    #[test]
    fn test_ref_siblings_are_discarded() {
        let store = store(&[("a.json", json!({ "type": "number" }))]);
        let node = json!({ "$ref": "a.json", "description": "dropped" });
        let resolved = Resolver::new(&store).resolve(&node).unwrap();
        assert_eq!(resolved, json!({ "type": "number" }));
    }

    #[test]
    fn test_arrays_resolve_in_order() {
        let store = store(&[
            ("a.json", json!({ "const": "a" })),
            ("b.json", json!({ "const": "b" })),
        ]);
        let node = json!([{ "$ref": "b.json" }, 3, { "$ref": "a.json" }]);
        let resolved = Resolver::new(&store).resolve(&node).unwrap();
        assert_eq!(resolved, json!([{ "const": "b" }, 3, { "const": "a" }]));
    }

    #[test]
    fn test_same_fragment_pointer() {
        let store = store(&[(
            "local.json",
            json!({
                "$defs": { "n": { "type": "integer" } },
                "properties": { "count": { "$ref": "#/$defs/n" } }
            }),
        )]);
        let resolved = Resolver::new(&store).resolve_root("local.json").unwrap();
        assert_eq!(resolved["properties"]["count"], json!({ "type": "integer" }));
    }

    #[test]
    fn test_same_fragment_pointer_needs_a_fragment() {
        let store = SchemaStore::new();
        let result = Resolver::new(&store).resolve(&json!({ "$ref": "#/$defs/n" }));
        assert!(matches!(result, Err(ResolveError::InvalidRef(_))));
    }

    #[test]
    fn test_escaped_and_indexed_pointers() {
        let fragment = json!({
            "a/b": { "m~n": [10, 20, { "deep": true }] }
        });
        assert_eq!(resolve_pointer(&fragment, "/a~1b/m~0n/1").unwrap(), 20);
        assert_eq!(
            resolve_pointer(&fragment, "/a~1b/m~0n/2/deep/").unwrap(),
            true
        );
        assert_eq!(resolve_pointer(&fragment, "").unwrap(), &fragment);
    }

    #[test]
    fn test_unknown_fragment() {
        let store = SchemaStore::bundled().unwrap();
        let err = Resolver::new(&store)
            .resolve(&json!({ "$ref": "nurbs.schema.json" }))
            .unwrap_err();
        assert!(err.is_reference_error());
        assert!(matches!(
            err,
            ResolveError::UnknownFragment { ref fragment, .. } if fragment == "nurbs.schema.json"
        ));
    }

    #[test]
    fn test_missing_segment() {
        let store = SchemaStore::bundled().unwrap();
        let err = Resolver::new(&store)
            .resolve_ref("definitions.schema.json#/$defs/vec4")
            .unwrap_err();
        assert!(matches!(
            err,
            ResolveError::MissingSegment { ref segment, .. } if segment == "vec4"
        ));

        let fragment = json!({ "items": [1, 2] });
        assert!(resolve_pointer(&fragment, "/items/2").is_err());
        assert!(resolve_pointer(&fragment, "/items/x").is_err());
        assert!(resolve_pointer(&fragment, "/items/0/deeper").is_err());
    }

    #[test]
    fn test_non_string_ref_is_invalid() {
        let store = SchemaStore::new();
        let result = Resolver::new(&store).resolve(&json!({ "$ref": 7 }));
        assert!(matches!(result, Err(ResolveError::InvalidRef(_))));
    }

    #[test]
    fn test_mutual_cycle_detected() {
        let store = store(&[
            ("a.json", json!({ "items": { "$ref": "b.json" } })),
            ("b.json", json!({ "items": { "$ref": "a.json" } })),
        ]);
        let err = Resolver::new(&store).resolve_root("a.json").unwrap_err();
        assert!(err.is_cycle());
        match err {
            ResolveError::Cycle { chain } => assert_eq!(chain, ["a.json", "b.json", "a.json"]),
            other => panic!("expected cycle, got {other:?}"),
        }
    }

    #[test]
    fn test_self_pointer_cycle_detected() {
        let store = store(&[(
            "self.json",
            json!({ "$defs": { "x": { "not": { "$ref": "#/$defs/x" } } }, "$ref": "#/$defs/x" }),
        )]);
        let err = Resolver::new(&store).resolve_root("self.json").unwrap_err();
        assert!(matches!(err, ResolveError::Cycle { .. }));
    }

    #[test]
    fn test_repeated_ref_is_not_a_cycle() {
        let store = store(&[
            ("leaf.json", json!({ "type": "number" })),
            (
                "pair.json",
                json!({ "prefixItems": [{ "$ref": "leaf.json" }, { "$ref": "leaf.json" }] }),
            ),
        ]);
        let resolved = Resolver::new(&store).resolve_root("pair.json").unwrap();
        assert_eq!(resolved["prefixItems"][1], json!({ "type": "number" }));
    }

    #[test]
    fn test_depth_exceeded() {
        let mut chain = SchemaStore::new();
        for i in 0..10 {
            let next = format!("f{}.json", i + 1);
            chain.insert(format!("f{i}.json"), json!({ "items": { "$ref": next } }));
        }
        chain.insert("f10.json", json!({ "type": "null" }));

        let options = ResolveOptions::default().with_max_depth(5);
        let err = Resolver::with_options(&chain, options)
            .resolve_root("f0.json")
            .unwrap_err();
        assert!(err.is_cycle());
        assert!(matches!(err, ResolveError::DepthExceeded { max_depth: 5, .. }));

        assert!(Resolver::new(&chain).resolve_root("f0.json").is_ok());
    }

    #[test]
    fn test_options_serde_default() {
        let options: ResolveOptions = serde_json::from_value(json!({})).unwrap();
        assert_eq!(options.max_depth, DEFAULT_MAX_DEPTH);
    }
}
