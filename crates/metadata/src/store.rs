//! Hierarchical option store addressed by dotted paths.

use std::collections::HashMap;
use std::sync::LazyLock;

use regex::Regex;
use serde_json::{Map, Value};

use crate::error::{MetadataError, MetadataResult};

static SEGMENT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[\w-]+$").expect("static segment pattern"));

/// Nested JSON document with dotted-path insert/query.
///
/// The root is always an object. Intermediate levels are created on demand by
/// [`insert`](Self::insert); a scalar sitting where a level is needed gets
/// replaced by an empty object.
#[derive(Debug, Clone, PartialEq)]
pub struct ConfigStore {
    data: Value,
}

impl Default for ConfigStore {
    fn default() -> Self {
        Self::new()
    }
}

impl ConfigStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self {
            data: Value::Object(Map::new()),
        }
    }

    /// Create a store seeded with an existing document.
    #[must_use]
    pub fn from_map(map: Map<String, Value>) -> Self {
        Self {
            data: Value::Object(map),
        }
    }

    /// Insert `value` at `path`.
    ///
    /// When the terminal level already holds an object and `value` is an
    /// object too, `merge` decides between a deep overlay and a plain
    /// overwrite. An empty path addresses the root.
    pub fn insert(&mut self, path: &str, value: Value, merge: bool) -> MetadataResult<()> {
        let segments = split_path(path)?;

        let Some((last, parents)) = segments.split_last() else {
            return match value {
                Value::Object(_) if merge => {
                    merge_json(&mut self.data, value);
                    Ok(())
                }
                Value::Object(_) => {
                    self.data = value;
                    Ok(())
                }
                _ => Err(MetadataError::InvalidPath {
                    path: path.to_string(),
                    segment: String::new(),
                }),
            };
        };

        let mut current = &mut self.data;
        for part in parents {
            current = ensure_object(current)
                .entry((*part).to_string())
                .or_insert_with(|| Value::Object(Map::new()));
        }

        let level = ensure_object(current);
        match level.get_mut(*last) {
            Some(existing) if merge && existing.is_object() && value.is_object() => {
                merge_json(existing, value);
            }
            _ => {
                level.insert((*last).to_string(), value);
            }
        }

        Ok(())
    }

    /// Look up `path`, returning `None` when any segment is absent.
    pub fn get(&self, path: &str) -> MetadataResult<Option<&Value>> {
        let segments = split_path(path)?;
        let mut current = &self.data;
        for part in segments {
            match current.as_object().and_then(|obj| obj.get(part)) {
                Some(next) => current = next,
                None => return Ok(None),
            }
        }
        Ok(Some(current))
    }

    /// Look up `path`, falling back to `default`.
    pub fn query<'a>(&'a self, path: &str, default: &'a Value) -> MetadataResult<&'a Value> {
        Ok(self.get(path)?.unwrap_or(default))
    }

    /// Whether `path` is present.
    pub fn contains(&self, path: &str) -> MetadataResult<bool> {
        Ok(self.get(path)?.is_some())
    }

    /// Remove the value at `path`, returning it.
    pub fn remove(&mut self, path: &str) -> MetadataResult<Option<Value>> {
        let segments = split_path(path)?;
        let Some((last, parents)) = segments.split_last() else {
            return Ok(Some(std::mem::replace(
                &mut self.data,
                Value::Object(Map::new()),
            )));
        };

        let mut current = &mut self.data;
        for part in parents {
            match current.as_object_mut().and_then(|obj| obj.get_mut(*part)) {
                Some(next) => current = next,
                None => return Ok(None),
            }
        }
        Ok(current.as_object_mut().and_then(|obj| obj.shift_remove(*last)))
    }

    /// The whole document.
    #[must_use]
    pub fn as_value(&self) -> &Value {
        &self.data
    }

    /// All leaves keyed by their dotted path.
    #[must_use]
    pub fn flatten(&self) -> HashMap<String, Value> {
        let mut map = HashMap::new();
        flatten_into("", &self.data, &mut map);
        map
    }
}

/// Split and validate a dotted path. The empty path has no segments.
pub(crate) fn split_path(path: &str) -> MetadataResult<Vec<&str>> {
    if path.is_empty() {
        return Ok(Vec::new());
    }
    path.split('.')
        .map(|segment| {
            if SEGMENT.is_match(segment) {
                Ok(segment)
            } else {
                Err(MetadataError::InvalidPath {
                    path: path.to_string(),
                    segment: segment.to_string(),
                })
            }
        })
        .collect()
}

fn ensure_object(value: &mut Value) -> &mut Map<String, Value> {
    if !value.is_object() {
        *value = Value::Object(Map::new());
    }
    match value {
        Value::Object(map) => map,
        _ => unreachable!("replaced with an object above"),
    }
}

/// Overlay `source` onto `target`, recursing through objects.
pub(crate) fn merge_json(target: &mut Value, source: Value) {
    match (target, source) {
        (Value::Object(target_obj), Value::Object(source_obj)) => {
            for (key, value) in source_obj {
                if let Some(existing) = target_obj.get_mut(&key) {
                    merge_json(existing, value);
                } else {
                    target_obj.insert(key, value);
                }
            }
        }
        (target, source) => {
            *target = source;
        }
    }
}

fn flatten_into(prefix: &str, value: &Value, map: &mut HashMap<String, Value>) {
    match value {
        Value::Object(obj) if !obj.is_empty() => {
            for (key, val) in obj {
                let full_key = if prefix.is_empty() {
                    key.clone()
                } else {
                    format!("{prefix}.{key}")
                };
                flatten_into(&full_key, val, map);
            }
        }
        _ if prefix.is_empty() => {}
        _ => {
            map.insert(prefix.to_string(), value.clone());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rstest::rstest;
    use serde_json::json;

    #[test]
    fn insert_creates_intermediate_levels() {
        let mut store = ConfigStore::new();
        store
            .insert("handler.web.writeOptions.status", json!(201), false)
            .unwrap();
        assert_eq!(
            store.as_value(),
            &json!({"handler": {"web": {"writeOptions": {"status": 201}}}})
        );
    }

    #[test]
    fn insert_merges_objects_when_requested() {
        let mut store = ConfigStore::new();
        store
            .insert("headers", json!({"a": 1, "nested": {"x": 1}}), false)
            .unwrap();
        store
            .insert("headers", json!({"b": 2, "nested": {"y": 2}}), true)
            .unwrap();
        assert_eq!(
            store.get("headers").unwrap(),
            Some(&json!({"a": 1, "b": 2, "nested": {"x": 1, "y": 2}}))
        );
    }

    #[test]
    fn insert_overwrites_without_merge() {
        let mut store = ConfigStore::new();
        store.insert("headers", json!({"a": 1}), false).unwrap();
        store.insert("headers", json!({"b": 2}), false).unwrap();
        assert_eq!(store.get("headers").unwrap(), Some(&json!({"b": 2})));
    }

    #[test]
    fn merge_only_applies_to_object_pairs() {
        let mut store = ConfigStore::new();
        store.insert("value", json!([1, 2]), false).unwrap();
        store.insert("value", json!({"a": 1}), true).unwrap();
        assert_eq!(store.get("value").unwrap(), Some(&json!({"a": 1})));
    }

    #[test]
    fn scalar_intermediate_is_replaced() {
        let mut store = ConfigStore::new();
        store.insert("a", json!(1), false).unwrap();
        store.insert("a.b", json!(2), false).unwrap();
        assert_eq!(store.get("a").unwrap(), Some(&json!({"b": 2})));
    }

    #[test]
    fn query_returns_default_for_missing_segments() {
        let mut store = ConfigStore::new();
        store.insert("a.b", json!(true), false).unwrap();
        let fallback = json!("fallback");
        assert_eq!(store.query("a.b", &fallback).unwrap(), &json!(true));
        assert_eq!(store.query("a.c", &fallback).unwrap(), &fallback);
        assert_eq!(store.query("a.b.c", &fallback).unwrap(), &fallback);
    }

    #[test]
    fn empty_path_returns_whole_store() {
        let mut store = ConfigStore::new();
        store.insert("k", json!("v"), false).unwrap();
        let fallback = Value::Null;
        assert_eq!(store.query("", &fallback).unwrap(), &json!({"k": "v"}));
    }

    #[rstest]
    #[case("a b")]
    #[case("a..b")]
    #[case("a.b!")]
    #[case(".a")]
    #[case("a/b")]
    fn illegal_segments_fail_with_format_error(#[case] path: &str) {
        let mut store = ConfigStore::new();
        let err = store.insert(path, json!(1), false).unwrap_err();
        assert_eq!(err.category(), "format");
        assert!(store.get(path).is_err());
    }

    #[test]
    fn dash_and_word_segments_are_legal() {
        let mut store = ConfigStore::new();
        store.insert("x-forwarded.for_1", json!("ip"), false).unwrap();
        assert!(store.contains("x-forwarded.for_1").unwrap());
    }

    #[test]
    fn remove_detaches_values() {
        let mut store = ConfigStore::new();
        store.insert("a.b", json!(1), false).unwrap();
        store.insert("a.c", json!(2), false).unwrap();
        assert_eq!(store.remove("a.b").unwrap(), Some(json!(1)));
        assert_eq!(store.remove("a.b").unwrap(), None);
        assert_eq!(store.remove("z.b").unwrap(), None);
        assert_eq!(store.as_value(), &json!({"a": {"c": 2}}));
    }

    #[test]
    fn flatten_keys_by_dotted_path() {
        let mut store = ConfigStore::new();
        store
            .insert("server", json!({"host": "localhost", "port": 8080}), false)
            .unwrap();
        let flat = store.flatten();
        assert_eq!(flat["server.host"], json!("localhost"));
        assert_eq!(flat["server.port"], json!(8080));
        assert_eq!(flat.len(), 2);
    }
}
