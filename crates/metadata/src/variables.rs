//! `$variable` path aliases.
//!
//! A variable maps a `$name` to a dotted path which may itself contain
//! `$segments`. Expansion is memoized per variable; the memo is flushed on
//! every registration.

use std::collections::HashMap;
use std::sync::{Arc, LazyLock};

use indexmap::IndexMap;
use parking_lot::RwLock;
use regex::Regex;

use crate::error::{MetadataError, MetadataResult};

/// Depth ceiling for nested alias expansion.
pub const MAX_RESOLUTION_DEPTH: usize = 1000;

/// Number of chain links kept in a [`MetadataError::CircularReference`].
const REPORTED_CHAIN_LEN: usize = 8;

/// Leading character of every variable name.
pub const VARIABLE_SIGIL: char = '$';

static VARIABLE_NAME: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\$\w+$").expect("static variable name pattern"));

static VARIABLE_VALUE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[\w.$-]+$").expect("static variable value pattern"));

static GLOBAL: LazyLock<Arc<VariableRegistry>> =
    LazyLock::new(|| Arc::new(VariableRegistry::with_defaults()));

/// Standard handler aliases.
const DEFAULT_VARIABLES: &[(&str, &str)] = &[
    ("$handler", "handler"),
    ("$cli", "$handler.cli"),
    ("$cliReadOptions", "$cli.readOptions"),
    ("$cliWriteOptions", "$cli.writeOptions"),
    ("$web", "$handler.web"),
    ("$webReadOptions", "$web.readOptions"),
    ("$webWriteOptions", "$web.writeOptions"),
    ("$webHeaders", "$webWriteOptions.headers"),
];

/// Registry of `$name` → path aliases with memoized resolution.
#[derive(Debug, Default)]
pub struct VariableRegistry {
    variables: RwLock<IndexMap<String, String>>,
    resolved: RwLock<HashMap<String, String>>,
}

impl VariableRegistry {
    /// An empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry holding the standard `$handler`, `$cli*` and `$web*` aliases.
    #[must_use]
    pub fn with_defaults() -> Self {
        let registry = Self::new();
        {
            let mut variables = registry.variables.write();
            for (name, value) in DEFAULT_VARIABLES {
                variables.insert((*name).to_string(), (*value).to_string());
            }
        }
        registry
    }

    /// The shared registry used when no registry is injected explicitly.
    #[must_use]
    pub fn global() -> Arc<Self> {
        Arc::clone(&GLOBAL)
    }

    /// Register (or replace) a variable and flush the resolution memo.
    pub fn register_variable(
        &self,
        name: impl Into<String>,
        value: impl Into<String>,
    ) -> MetadataResult<()> {
        let name = name.into();
        let value = value.into();

        if !VARIABLE_NAME.is_match(&name) {
            return Err(MetadataError::InvalidVariableName { name });
        }
        if !VARIABLE_VALUE.is_match(&value) || value.split('.').any(str::is_empty) {
            return Err(MetadataError::InvalidVariableValue { name, value });
        }

        tracing::debug!(variable = %name, path = %value, "registered metadata variable");
        self.variables.write().insert(name, value);
        self.resolved.write().clear();
        Ok(())
    }

    /// Whether `name` is registered.
    pub fn is_registered(&self, name: &str) -> bool {
        self.variables.read().contains_key(name)
    }

    /// Registered `(name, raw value)` pairs in registration order.
    pub fn variables(&self) -> Vec<(String, String)> {
        self.variables
            .read()
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect()
    }

    /// Drop every memoized expansion.
    pub fn clear_cache(&self) {
        self.resolved.write().clear();
    }

    /// Fully expand a variable into a `$`-free dotted path.
    pub fn resolve(&self, name: &str) -> MetadataResult<String> {
        let mut chain = Vec::new();
        self.expand(name, 0, &mut chain)
    }

    /// Expand every `$segment` of a dotted path.
    pub fn resolve_path(&self, path: &str) -> MetadataResult<String> {
        if !path.contains(VARIABLE_SIGIL) {
            return Ok(path.to_string());
        }
        let segments = path
            .split('.')
            .map(|segment| {
                if segment.starts_with(VARIABLE_SIGIL) {
                    self.resolve(segment)
                } else {
                    Ok(segment.to_string())
                }
            })
            .collect::<MetadataResult<Vec<_>>>()?;
        Ok(segments.join("."))
    }

    fn expand(&self, name: &str, depth: usize, chain: &mut Vec<String>) -> MetadataResult<String> {
        if let Some(hit) = self.resolved.read().get(name) {
            tracing::trace!(variable = %name, "variable memo hit");
            return Ok(hit.clone());
        }

        let cycle = chain.iter().any(|link| link == name);
        if cycle || depth >= MAX_RESOLUTION_DEPTH {
            let root = chain.first().cloned().unwrap_or_else(|| name.to_string());
            let mut reported: Vec<String> =
                chain.iter().take(REPORTED_CHAIN_LEN).cloned().collect();
            if chain.len() > REPORTED_CHAIN_LEN {
                reported.push("...".to_string());
            }
            reported.push(name.to_string());
            return Err(MetadataError::CircularReference {
                root,
                chain: reported,
            });
        }

        let raw = self
            .variables
            .read()
            .get(name)
            .cloned()
            .ok_or_else(|| MetadataError::UnknownVariable {
                name: name.to_string(),
            })?;

        chain.push(name.to_string());
        let mut parts = Vec::new();
        for segment in raw.split('.') {
            if segment.starts_with(VARIABLE_SIGIL) {
                parts.push(self.expand(segment, depth + 1, chain)?);
            } else {
                parts.push(segment.to_string());
            }
        }
        chain.pop();

        let expanded = parts.join(".");
        self.resolved
            .write()
            .insert(name.to_string(), expanded.clone());
        Ok(expanded)
    }
}
