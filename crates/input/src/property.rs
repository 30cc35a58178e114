//! Per-type property defaults resolved along the type hierarchy.
//!
//! Every input type declares its parent when it is registered; the ancestor
//! list is fixed at that point. The flattened view of a type's properties is
//! memoized and the whole memo is dropped on any registration.

use std::collections::HashMap;
use std::sync::Arc;

use indexmap::IndexMap;
use parking_lot::RwLock;
use serde_json::Value;

use crate::error::{InputError, InputResult};

/// Flattened `property -> initial value` view for one type.
pub type PropertyMap = IndexMap<String, Value>;

#[derive(Debug, Default)]
struct Tables {
    /// type -> [type, parent, grandparent, ...]
    ancestors: HashMap<String, Vec<String>>,
    /// type -> properties declared directly on it
    declared: HashMap<String, PropertyMap>,
}

/// Registry of property defaults keyed by input type.
#[derive(Debug, Default)]
pub struct PropertyRegistry {
    tables: RwLock<Tables>,
    effective: RwLock<HashMap<String, Arc<PropertyMap>>>,
}

impl PropertyRegistry {
    /// An empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry holding one root type with its properties.
    pub fn with_root<'a>(
        type_name: &str,
        properties: impl IntoIterator<Item = (&'a str, Value)>,
    ) -> Self {
        let declared = properties
            .into_iter()
            .map(|(name, initial)| (name.to_string(), initial))
            .collect();
        Self {
            tables: RwLock::new(Tables {
                ancestors: HashMap::from([(type_name.to_string(), vec![type_name.to_string()])]),
                declared: HashMap::from([(type_name.to_string(), declared)]),
            }),
            effective: RwLock::default(),
        }
    }

    /// Declare `type_name` as a child of `parent` (or as a root type).
    pub fn declare_type(&self, type_name: &str, parent: Option<&str>) -> InputResult<()> {
        let mut tables = self.tables.write();
        if tables.ancestors.contains_key(type_name) {
            return Err(InputError::TypeAlreadyRegistered {
                type_name: type_name.to_string(),
            });
        }

        let mut chain = vec![type_name.to_string()];
        if let Some(parent) = parent {
            let inherited =
                tables
                    .ancestors
                    .get(parent)
                    .ok_or_else(|| InputError::UnknownType {
                        type_name: parent.to_string(),
                    })?;
            chain.extend(inherited.iter().cloned());
        }

        tables.ancestors.insert(type_name.to_string(), chain);
        tables.declared.entry(type_name.to_string()).or_default();
        drop(tables);

        self.effective.write().clear();
        Ok(())
    }

    /// Register `name` with an initial value on `type_name`.
    pub fn register(&self, type_name: &str, name: &str, initial: Value) -> InputResult<()> {
        let mut tables = self.tables.write();
        let declared =
            tables
                .declared
                .get_mut(type_name)
                .ok_or_else(|| InputError::UnknownType {
                    type_name: type_name.to_string(),
                })?;
        declared.insert(name.to_string(), initial);
        drop(tables);

        tracing::trace!(input_type = %type_name, property = %name, "registered input property");
        self.effective.write().clear();
        Ok(())
    }

    /// Whether `type_name` has been declared.
    pub fn is_declared(&self, type_name: &str) -> bool {
        self.tables.read().ancestors.contains_key(type_name)
    }

    /// `type_name` followed by its ancestors, closest first.
    pub fn ancestors(&self, type_name: &str) -> InputResult<Vec<String>> {
        self.tables
            .read()
            .ancestors
            .get(type_name)
            .cloned()
            .ok_or_else(|| InputError::UnknownType {
                type_name: type_name.to_string(),
            })
    }

    /// Every property visible on `type_name`; closer registrations win.
    pub fn effective_properties(&self, type_name: &str) -> InputResult<Arc<PropertyMap>> {
        if let Some(hit) = self.effective.read().get(type_name) {
            return Ok(Arc::clone(hit));
        }

        let tables = self.tables.read();
        let chain = tables
            .ancestors
            .get(type_name)
            .ok_or_else(|| InputError::UnknownType {
                type_name: type_name.to_string(),
            })?;

        // Walk root-first so closer types overwrite.
        let mut flattened = PropertyMap::new();
        for ancestor in chain.iter().rev() {
            if let Some(declared) = tables.declared.get(ancestor) {
                for (name, value) in declared {
                    flattened.insert(name.clone(), value.clone());
                }
            }
        }
        drop(tables);

        let flattened = Arc::new(flattened);
        self.effective
            .write()
            .insert(type_name.to_string(), Arc::clone(&flattened));
        Ok(flattened)
    }

    /// Whether `name` is visible on `type_name`.
    pub fn is_registered(&self, type_name: &str, name: &str) -> bool {
        self.effective_properties(type_name)
            .is_ok_and(|props| props.contains_key(name))
    }

    /// Resolve `name`: an instance override wins over the type default.
    pub fn get(&self, overrides: &PropertyMap, type_name: &str, name: &str) -> InputResult<Value> {
        if let Some(value) = overrides.get(name) {
            return Ok(value.clone());
        }
        self.effective_properties(type_name)?
            .get(name)
            .cloned()
            .ok_or_else(|| InputError::MissingProperty {
                type_name: type_name.to_string(),
                property: name.to_string(),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn hierarchy() -> PropertyRegistry {
        let registry = PropertyRegistry::new();
        registry.declare_type("base", None).unwrap();
        registry.declare_type("text", Some("base")).unwrap();
        registry.declare_type("hex", Some("text")).unwrap();
        registry.register("base", "hidden", json!(false)).unwrap();
        registry.register("text", "max", json!(null)).unwrap();
        registry
    }

    #[test]
    fn children_inherit_ancestor_properties() {
        let registry = hierarchy();
        let props = registry.effective_properties("hex").unwrap();
        assert_eq!(props.get("hidden"), Some(&json!(false)));
        assert_eq!(props.get("max"), Some(&json!(null)));
        assert_eq!(
            registry.ancestors("hex").unwrap(),
            vec!["hex".to_string(), "text".into(), "base".into()]
        );
    }

    #[test]
    fn closer_registration_wins() {
        let registry = hierarchy();
        registry.register("hex", "max", json!(64)).unwrap();
        assert_eq!(
            registry.effective_properties("hex").unwrap().get("max"),
            Some(&json!(64))
        );
        assert_eq!(
            registry.effective_properties("text").unwrap().get("max"),
            Some(&json!(null))
        );
    }

    #[test]
    fn registration_invalidates_memo_for_descendants() {
        let registry = hierarchy();
        let before = registry.effective_properties("hex").unwrap();
        assert!(!before.contains_key("late"));

        registry.register("base", "late", json!(1)).unwrap();
        assert!(registry.is_registered("hex", "late"));
    }

    #[test]
    fn instance_override_wins_and_missing_fails() {
        let registry = hierarchy();
        let mut overrides = PropertyMap::new();
        overrides.insert("hidden".into(), json!(true));
        assert_eq!(
            registry.get(&overrides, "text", "hidden").unwrap(),
            json!(true)
        );
        assert!(matches!(
            registry.get(&overrides, "text", "nope"),
            Err(InputError::MissingProperty { .. })
        ));
    }

    #[test]
    fn unknown_parent_and_duplicate_types_are_rejected() {
        let registry = hierarchy();
        assert!(matches!(
            registry.declare_type("orphan", Some("missing")),
            Err(InputError::UnknownType { .. })
        ));
        assert!(matches!(
            registry.declare_type("text", Some("base")),
            Err(InputError::TypeAlreadyRegistered { .. })
        ));
    }

    #[test]
    fn root_registry_accepts_children() {
        let registry = PropertyRegistry::with_root("base", [("hidden", json!(false))]);
        assert!(registry.is_declared("base"));
        registry.declare_type("text", Some("base")).unwrap();
        assert_eq!(
            registry.effective_properties("text").unwrap().get("hidden"),
            Some(&json!(false))
        );
        assert!(matches!(
            registry.declare_type("base", None),
            Err(InputError::TypeAlreadyRegistered { .. })
        ));
    }
}
