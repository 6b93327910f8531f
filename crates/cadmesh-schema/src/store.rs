//! Named schema fragments.

use std::fs;
use std::path::Path;

use indexmap::IndexMap;
use serde_json::Value;
use tracing::debug;

use crate::bundled::FRAGMENTS;
use crate::error::{ResolveError, Result};

/// A set of schema fragments keyed by file name.
///
/// Fragments refer to each other through `$ref`s naming these keys, either
/// whole (`"face.schema.json"`) or with a pointer
/// (`"definitions.schema.json#/$defs/vec3"`).
#[derive(Debug, Clone, Default)]
pub struct SchemaStore {
    fragments: IndexMap<String, Value>,
}

impl SchemaStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// The fragments compiled into this crate.
    pub fn bundled() -> Result<Self> {
        Self::from_sources(FRAGMENTS.iter().copied())
    }

    /// Parse fragments from `(name, json text)` pairs.
    pub fn from_sources<'a>(sources: impl IntoIterator<Item = (&'a str, &'a str)>) -> Result<Self> {
        let mut store = Self::new();
        for (name, text) in sources {
            let value = serde_json::from_str(text).map_err(|source| ResolveError::Json {
                path: name.into(),
                source,
            })?;
            store.insert(name, value);
        }
        Ok(store)
    }

    /// Load every `*.json` file in `dir`, keyed by file name.
    pub fn load_dir(dir: impl AsRef<Path>) -> Result<Self> {
        let dir = dir.as_ref();
        let io_err = |source| ResolveError::Io {
            path: dir.to_path_buf(),
            source,
        };

        let mut paths = Vec::new();
        for entry in fs::read_dir(dir).map_err(io_err)? {
            let path = entry.map_err(io_err)?.path();
            if path.is_file() && path.extension().is_some_and(|ext| ext == "json") {
                paths.push(path);
            }
        }
        paths.sort();

        let mut store = Self::new();
        for path in paths {
            let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
                continue;
            };
            let text = fs::read_to_string(&path).map_err(|source| ResolveError::Io {
                path: path.clone(),
                source,
            })?;
            let value = serde_json::from_str(&text).map_err(|source| ResolveError::Json {
                path: path.clone(),
                source,
            })?;
            debug!(fragment = name, "loaded schema fragment");
            store.insert(name, value);
        }
        Ok(store)
    }

    pub fn insert(&mut self, name: impl Into<String>, fragment: Value) -> Option<Value> {
        self.fragments.insert(name.into(), fragment)
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.fragments.get(name)
    }

    /// Look up a fragment together with its stored name.
    pub(crate) fn get_entry(&self, name: &str) -> Option<(&str, &Value)> {
        self.fragments
            .get_key_value(name)
            .map(|(k, v)| (k.as_str(), v))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.fragments.contains_key(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.fragments.keys().map(String::as_str)
    }

    pub fn fragments(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.fragments.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.fragments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fragments.is_empty()
    }
}

impl FromIterator<(String, Value)> for SchemaStore {
    fn from_iter<T: IntoIterator<Item = (String, Value)>>(iter: T) -> Self {
        Self {
            fragments: iter.into_iter().collect(),
        }
    }
}
