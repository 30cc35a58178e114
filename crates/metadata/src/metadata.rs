//! Per-action / per-handler option documents.

use std::fmt;
use std::sync::Arc;

use serde_json::Value;

use crate::error::MetadataResult;
use crate::store::ConfigStore;
use crate::variables::VariableRegistry;

/// Which side of a handler an option applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OptionKind {
    /// Options consumed by a handler's reader.
    Read,
    /// Options consumed by a handler's writer.
    Write,
}

impl OptionKind {
    /// Path segment used under `handler.<name>`.
    #[must_use]
    pub fn as_segment(self) -> &'static str {
        match self {
            Self::Read => "readOptions",
            Self::Write => "writeOptions",
        }
    }
}

impl fmt::Display for OptionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_segment())
    }
}

/// Hierarchical options with `$variable` aware paths.
///
/// Cloning deep-copies the document but keeps sharing the variable registry.
#[derive(Clone)]
pub struct Metadata {
    store: ConfigStore,
    variables: Arc<VariableRegistry>,
}

impl Default for Metadata {
    fn default() -> Self {
        Self::new(VariableRegistry::global())
    }
}

impl Metadata {
    /// Create an empty document bound to `variables`.
    #[must_use]
    pub fn new(variables: Arc<VariableRegistry>) -> Self {
        Self {
            store: ConfigStore::new(),
            variables,
        }
    }

    /// The variable registry paths are resolved against.
    #[must_use]
    pub fn variables(&self) -> &Arc<VariableRegistry> {
        &self.variables
    }

    /// The underlying store.
    #[must_use]
    pub fn store(&self) -> &ConfigStore {
        &self.store
    }

    /// Insert `value` at `path` (variables expanded first).
    pub fn set(&mut self, path: &str, value: Value, merge: bool) -> MetadataResult<()> {
        let resolved = self.variables.resolve_path(path)?;
        self.store.insert(&resolved, value, merge)
    }

    /// Value at `path`, if any.
    pub fn get(&self, path: &str) -> MetadataResult<Option<&Value>> {
        let resolved = self.variables.resolve_path(path)?;
        self.store.get(&resolved)
    }

    /// Value at `path`, or `default`.
    pub fn get_or<'a>(&'a self, path: &str, default: &'a Value) -> MetadataResult<&'a Value> {
        let resolved = self.variables.resolve_path(path)?;
        self.store.query(&resolved, default)
    }

    /// Whether `path` holds a value.
    pub fn has(&self, path: &str) -> MetadataResult<bool> {
        Ok(self.get(path)?.is_some())
    }

    /// Remove and return the value at `path`.
    pub fn remove(&mut self, path: &str) -> MetadataResult<Option<Value>> {
        let resolved = self.variables.resolve_path(path)?;
        self.store.remove(&resolved)
    }

    /// All options of one handler side: `handler.<handler>.<kind>`.
    pub fn handler_options(&self, handler: &str, kind: OptionKind) -> MetadataResult<Option<&Value>> {
        self.store
            .get(&format!("handler.{handler}.{}", kind.as_segment()))
    }

    /// A single handler option: `handler.<handler>.<kind>.<option>`.
    pub fn handler_option(
        &self,
        handler: &str,
        kind: OptionKind,
        option: &str,
    ) -> MetadataResult<Option<&Value>> {
        self.store
            .get(&format!("handler.{handler}.{}.{option}", kind.as_segment()))
    }

    /// Set a single handler option.
    pub fn set_handler_option(
        &mut self,
        handler: &str,
        kind: OptionKind,
        option: &str,
        value: Value,
    ) -> MetadataResult<()> {
        self.store.insert(
            &format!("handler.{handler}.{}.{option}", kind.as_segment()),
            value,
            true,
        )
    }
}

impl fmt::Debug for Metadata {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Metadata")
            .field("document", self.store.as_value())
            .field("variables", &self.variables.variables().len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn metadata() -> Metadata {
        Metadata::new(Arc::new(VariableRegistry::with_defaults()))
    }

    #[test]
    fn alias_and_plain_paths_address_the_same_slot() {
        let mut meta = metadata();
        meta.set("$webHeaders", json!({"X-Trace": "1"}), true).unwrap();
        assert_eq!(
            meta.get("handler.web.writeOptions.headers").unwrap(),
            Some(&json!({"X-Trace": "1"}))
        );
        assert_eq!(
            meta.handler_option("web", OptionKind::Write, "headers").unwrap(),
            Some(&json!({"X-Trace": "1"}))
        );
    }

    #[test]
    fn merging_headers_through_alias_accumulates() {
        let mut meta = metadata();
        meta.set("$webHeaders", json!({"a": "1"}), true).unwrap();
        meta.set("$webHeaders.b", json!("2"), true).unwrap();
        assert_eq!(
            meta.handler_options("web", OptionKind::Write).unwrap(),
            Some(&json!({"headers": {"a": "1", "b": "2"}}))
        );
    }

    #[test]
    fn clone_is_independent_document() {
        let mut meta = metadata();
        meta.set("a", json!(1), false).unwrap();
        let mut copy = meta.clone();
        copy.set("a", json!(2), false).unwrap();
        assert_eq!(meta.get("a").unwrap(), Some(&json!(1)));
        assert_eq!(copy.get("a").unwrap(), Some(&json!(2)));
        assert!(Arc::ptr_eq(meta.variables(), copy.variables()));
    }

    #[test]
    fn get_or_and_has() {
        let mut meta = metadata();
        meta.set_handler_option("cli", OptionKind::Read, "positional", json!(["a"]))
            .unwrap();
        assert!(meta.has("$cliReadOptions.positional").unwrap());
        let fallback = json!(null);
        assert_eq!(meta.get_or("$cliWriteOptions.x", &fallback).unwrap(), &fallback);
        assert!(meta.get("$undefinedAlias.x").is_err());
    }

    #[test]
    fn remove_through_alias() {
        let mut meta = metadata();
        meta.set("$webReadOptions.limit", json!(10), false).unwrap();
        assert_eq!(meta.remove("$webReadOptions.limit").unwrap(), Some(json!(10)));
        assert!(!meta.has("$webReadOptions.limit").unwrap());
    }
}
