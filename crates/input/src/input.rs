//! The typed value container.

use std::any::Any;
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::Arc;

use futures::future::join_all;
use parking_lot::RwLock;
use serde_json::Value;

use crate::error::{InputError, InputResult, ValidationError};
use crate::kind::{ExtendedValidator, InputKind};
use crate::property::{PropertyMap, PropertyRegistry};

/// Property names understood by every input type.
pub mod props {
    pub const TYPE: &str = "type";
    pub const VECTOR: &str = "vector";
    pub const REQUIRED: &str = "required";
    pub const DEFAULT_VALUE: &str = "defaultValue";
    pub const IMMUTABLE: &str = "immutable";
    pub const HIDDEN: &str = "hidden";
    pub const SERIALIZE: &str = "serialize";
    pub const AUTOFILL: &str = "autofill";
    pub const DESCRIPTION: &str = "description";
}

/// A memoized derived value.
pub type CacheEntry = Arc<dyn Any + Send + Sync>;

/// Key of a memoized derived value: a property name plus an optional vector
/// element index.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    pub property: String,
    pub index: Option<usize>,
}

impl CacheKey {
    /// Key for a whole-value derivation.
    pub fn new(property: impl Into<String>) -> Self {
        Self {
            property: property.into(),
            index: None,
        }
    }

    /// Key for a derivation of one element (or the whole value when `None`).
    pub fn at(property: impl Into<String>, index: Option<usize>) -> Self {
        Self {
            property: property.into(),
            index,
        }
    }
}

#[derive(Default)]
struct State {
    value: Value,
    overrides: PropertyMap,
    locked: HashSet<String>,
    read_only: bool,
    cache: HashMap<CacheKey, CacheEntry>,
}

/// One named, typed, validated value.
///
/// Inputs are shared as `Arc<Input>`; every method takes `&self` and state
/// sits behind a lock, so the read-only flag holds against any code that can
/// reach the input.
pub struct Input {
    name: String,
    kind: Arc<dyn InputKind>,
    registry: Arc<PropertyRegistry>,
    extended: Option<Arc<dyn ExtendedValidator>>,
    state: RwLock<State>,
}

impl Input {
    pub(crate) fn new(
        name: String,
        kind: Arc<dyn InputKind>,
        registry: Arc<PropertyRegistry>,
        extended: Option<Arc<dyn ExtendedValidator>>,
    ) -> Self {
        Self {
            name,
            kind,
            registry,
            extended,
            state: RwLock::new(State::default()),
        }
    }

    /// Input name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Registered name of the concrete type.
    #[must_use]
    pub fn type_name(&self) -> &'static str {
        self.kind.type_name()
    }

    /// The concrete type.
    #[must_use]
    pub fn kind(&self) -> &Arc<dyn InputKind> {
        &self.kind
    }

    // ------------------------------------------------------------------
    // Value
    // ------------------------------------------------------------------

    /// A copy of the current value.
    #[must_use]
    pub fn value(&self) -> Value {
        self.state.read().value.clone()
    }

    /// Borrow the current value for the duration of `f`.
    pub fn with_value<R>(&self, f: impl FnOnce(&Value) -> R) -> R {
        f(&self.state.read().value)
    }

    /// Replace the value. Clears the cache.
    pub fn set_value(&self, value: Value) -> InputResult<()> {
        let mut state = self.state.write();
        self.ensure_writable(&state)?;
        state.value = value;
        state.cache.clear();
        Ok(())
    }

    /// Mutate the value in place.
    ///
    /// Fails with [`InputError::Immutable`] when the `immutable` property is
    /// set and a value is present; use [`set_value`](Self::set_value) to
    /// replace it instead.
    pub fn value_mut<R>(&self, f: impl FnOnce(&mut Value) -> R) -> InputResult<R> {
        let immutable = self.is_immutable();
        let mut state = self.state.write();
        self.ensure_writable(&state)?;
        if immutable && !state.value.is_null() {
            return Err(InputError::Immutable {
                input: self.name.clone(),
            });
        }
        let result = f(&mut state.value);
        state.cache.clear();
        Ok(result)
    }

    /// Whether the current value counts as empty for this type.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.kind.is_empty_value(&self.state.read().value)
    }

    // ------------------------------------------------------------------
    // Properties
    // ------------------------------------------------------------------

    /// Resolve a property: instance override first, then the type default.
    pub fn property(&self, name: &str) -> InputResult<Value> {
        let state = self.state.read();
        self.registry.get(&state.overrides, self.type_name(), name)
    }

    /// Every property visible on this input with its current value.
    pub fn properties(&self) -> InputResult<PropertyMap> {
        let mut merged = (*self.registry.effective_properties(self.type_name())?).clone();
        for (name, value) in &self.state.read().overrides {
            merged.insert(name.clone(), value.clone());
        }
        Ok(merged)
    }

    /// Assign a property on this instance. Clears the cache.
    ///
    /// Unregistered names are rejected unless `loose` is set.
    pub fn assign_property(&self, name: &str, value: Value, loose: bool) -> InputResult<()> {
        let mut state = self.state.write();
        self.ensure_writable(&state)?;
        if !loose
            && !state.overrides.contains_key(name)
            && !self.registry.is_registered(self.type_name(), name)
        {
            return Err(InputError::MissingProperty {
                type_name: self.type_name().to_string(),
                property: name.to_string(),
            });
        }
        if state.locked.contains(name) {
            return Err(InputError::PropertyLocked {
                input: self.name.clone(),
                property: name.to_string(),
            });
        }
        state.overrides.insert(name.to_string(), value);
        state.cache.clear();
        Ok(())
    }

    /// Lock a property against further assignment.
    pub fn lock_property(&self, name: &str) -> InputResult<()> {
        if !self.has_property(name) {
            return Err(InputError::MissingProperty {
                type_name: self.type_name().to_string(),
                property: name.to_string(),
            });
        }
        self.state.write().locked.insert(name.to_string());
        Ok(())
    }

    /// Whether the property exists on this instance or its type.
    #[must_use]
    pub fn has_property(&self, name: &str) -> bool {
        self.state.read().overrides.contains_key(name)
            || self.registry.is_registered(self.type_name(), name)
    }

    /// Whether the property is locked.
    #[must_use]
    pub fn is_locked(&self, name: &str) -> bool {
        self.state.read().locked.contains(name)
    }

    fn flag(&self, name: &str) -> bool {
        self.property(name)
            .ok()
            .and_then(|value| value.as_bool())
            .unwrap_or(false)
    }

    #[must_use]
    pub fn is_vector(&self) -> bool {
        self.flag(props::VECTOR)
    }

    #[must_use]
    pub fn is_required(&self) -> bool {
        self.flag(props::REQUIRED)
    }

    #[must_use]
    pub fn is_hidden(&self) -> bool {
        self.flag(props::HIDDEN)
    }

    #[must_use]
    pub fn is_serializable(&self) -> bool {
        self.flag(props::SERIALIZE)
    }

    #[must_use]
    pub fn is_immutable(&self) -> bool {
        self.flag(props::IMMUTABLE)
    }

    /// Value applied at construction when none is supplied.
    #[must_use]
    pub fn default_value(&self) -> Value {
        self.property(props::DEFAULT_VALUE).unwrap_or(Value::Null)
    }

    /// Session autofill key, if the input takes part in autofill.
    #[must_use]
    pub fn autofill_key(&self) -> Option<String> {
        match self.property(props::AUTOFILL) {
            Ok(Value::String(key)) if !key.is_empty() => Some(key),
            _ => None,
        }
    }

    // ------------------------------------------------------------------
    // Read-only state
    // ------------------------------------------------------------------

    /// Whether the input currently rejects mutation.
    #[must_use]
    pub fn is_read_only(&self) -> bool {
        self.state.read().read_only
    }

    /// Toggle the read-only flag.
    ///
    /// Reserved for the action engine, which flips it around a run.
    #[doc(hidden)]
    pub fn set_read_only(&self, read_only: bool) {
        self.state.write().read_only = read_only;
    }

    fn ensure_writable(&self, state: &State) -> InputResult<()> {
        if state.read_only {
            return Err(InputError::ReadOnly {
                input: self.name.clone(),
            });
        }
        Ok(())
    }

    // ------------------------------------------------------------------
    // Cache
    // ------------------------------------------------------------------

    /// A memoized value, if present and of type `T`.
    pub fn cached<T: Any + Send + Sync>(&self, key: &CacheKey) -> Option<Arc<T>> {
        let entry = self.state.read().cache.get(key).cloned()?;
        entry.downcast::<T>().ok()
    }

    /// Memoize `value` under `key`.
    pub fn cache_insert<T: Any + Send + Sync>(&self, key: CacheKey, value: T) -> Arc<T> {
        let value = Arc::new(value);
        let entry: CacheEntry = Arc::clone(&value) as CacheEntry;
        self.state.write().cache.insert(key, entry);
        value
    }

    /// Return the memoized value under `key`, computing it on a miss.
    pub fn cache_get_or_insert_with<T, E>(
        &self,
        key: CacheKey,
        compute: impl FnOnce() -> Result<T, E>,
    ) -> Result<Arc<T>, E>
    where
        T: Any + Send + Sync,
    {
        if let Some(hit) = self.cached::<T>(&key) {
            return Ok(hit);
        }
        Ok(self.cache_insert(key, compute()?))
    }

    /// Drop every memoized value.
    pub fn clear_cache(&self) {
        self.state.write().cache.clear();
    }

    /// Number of memoized values.
    #[must_use]
    pub fn cache_len(&self) -> usize {
        self.state.read().cache.len()
    }

    // ------------------------------------------------------------------
    // Validation
    // ------------------------------------------------------------------

    /// Validate the current value.
    ///
    /// Vector elements are checked concurrently; the first failure in
    /// element order is returned once every check has finished.
    pub async fn validate(&self) -> Result<(), ValidationError> {
        let value = self.value();
        self.validate_value(&value).await.map_err(|err| {
            if err.input.is_some() {
                err
            } else {
                err.with_input(self.name.clone())
            }
        })
    }

    async fn validate_value(&self, value: &Value) -> Result<(), ValidationError> {
        if self.kind.is_empty_value(value) {
            if self.is_required() {
                return Err(ValidationError::required());
            }
            return Ok(());
        }

        if !self.is_vector() {
            return self.validate_element(value, None).await;
        }

        let Value::Array(items) = value else {
            return Err(ValidationError::vector_not_array());
        };
        let checks = items
            .iter()
            .enumerate()
            .map(|(index, item)| self.validate_element(item, Some(index)));
        join_all(checks).await.into_iter().collect()
    }

    async fn validate_element(
        &self,
        value: &Value,
        index: Option<usize>,
    ) -> Result<(), ValidationError> {
        // An empty element would decode back to null.
        if value.is_null() || (index.is_some() && self.kind.is_empty_value(value)) {
            return Err(match index {
                Some(index) => ValidationError::vector_null_element(index),
                None => ValidationError::required(),
            });
        }

        self.kind
            .validate_element(self, value, index)
            .await
            .map_err(|err| at_index(err, index))?;

        if let Some(extended) = &self.extended {
            extended
                .validate(self, value, index)
                .await
                .map_err(|err| at_index(err, index))?;
        }
        Ok(())
    }

    // ------------------------------------------------------------------
    // Codec
    // ------------------------------------------------------------------

    /// Decode a serialized value, assigning it when `assign` is set.
    ///
    /// The empty string decodes to `null`. Vector inputs expect a JSON array
    /// literal whose elements go through the scalar decoder; empty-string
    /// elements decode to `null`, which validation rejects.
    pub fn parse_value(&self, serialized: &str, assign: bool) -> InputResult<Value> {
        let value = if serialized.is_empty() {
            Value::Null
        } else if self.is_vector() {
            let items: Vec<Value> =
                serde_json::from_str(serialized).map_err(|err| InputError::Decode {
                    input: self.name.clone(),
                    raw: serialized.to_string(),
                    reason: err.to_string(),
                })?;
            Value::Array(
                items
                    .into_iter()
                    .map(|item| self.parse_element(item))
                    .collect::<InputResult<_>>()?,
            )
        } else {
            self.kind.parse_scalar(self, serialized)?
        };

        if assign {
            self.set_value(value.clone())?;
        }
        Ok(value)
    }

    fn parse_element(&self, item: Value) -> InputResult<Value> {
        match item {
            Value::Null => Ok(Value::Null),
            Value::String(raw) if raw.is_empty() => Ok(Value::Null),
            Value::String(raw) => self.kind.parse_scalar(self, &raw),
            other => self.kind.parse_scalar(self, &other.to_string()),
        }
    }

    /// Validate, then encode the current value.
    ///
    /// Scalars use the type's string form; vectors a JSON array literal.
    pub async fn serialize_value(&self) -> InputResult<String> {
        self.validate().await?;

        let value = self.value();
        if self.is_vector() {
            return match &value {
                Value::Array(_) => {
                    serde_json::to_string(&value).map_err(|err| InputError::Encode {
                        input: self.name.clone(),
                        reason: err.to_string(),
                    })
                }
                _ => Ok(String::new()),
            };
        }
        if self.kind.is_empty_value(&value) {
            return Ok(String::new());
        }
        self.kind.serialize_scalar(self, &value)
    }

    // ------------------------------------------------------------------
    // Transplanting
    // ------------------------------------------------------------------

    /// Copy the value of a same-type `source` into this input.
    ///
    /// With `at`, a single element of a vector source fills a scalar
    /// target. The cache travels along when `copy_cache` is set and both
    /// inputs are immutable.
    pub fn setup_from(&self, source: &Input, at: Option<usize>, copy_cache: bool) -> InputResult<()> {
        if std::ptr::eq(self, source) {
            return Ok(());
        }

        let mismatch = |reason: &str| InputError::SetupMismatch {
            input: self.name.clone(),
            source_input: source.name.clone(),
            reason: reason.to_string(),
        };

        if source.type_name() != self.type_name() {
            return Err(mismatch("input types differ"));
        }

        let source_vector = source.is_vector();
        let target_vector = self.is_vector();
        let share_cache = copy_cache && source.is_immutable() && self.is_immutable();

        let (value, cache): (Value, Vec<(CacheKey, CacheEntry)>) = {
            let state = source.state.read();
            match at {
                Some(index) => {
                    if !source_vector {
                        return Err(mismatch("an index was given for a non-vector source"));
                    }
                    if target_vector {
                        return Err(mismatch("a single element cannot fill a vector target"));
                    }
                    let element = state
                        .value
                        .as_array()
                        .and_then(|items| items.get(index))
                        .cloned()
                        .ok_or_else(|| mismatch("index is out of range"))?;
                    let cache = if share_cache {
                        state
                            .cache
                            .iter()
                            .filter(|(key, _)| key.index == Some(index))
                            .map(|(key, entry)| (CacheKey::new(key.property.clone()), Arc::clone(entry)))
                            .collect()
                    } else {
                        Vec::new()
                    };
                    (element, cache)
                }
                None => {
                    if source_vector != target_vector {
                        return Err(mismatch("source and target differ in vector-ness"));
                    }
                    let cache = if share_cache {
                        state
                            .cache
                            .iter()
                            .map(|(key, entry)| (key.clone(), Arc::clone(entry)))
                            .collect()
                    } else {
                        Vec::new()
                    };
                    (state.value.clone(), cache)
                }
            }
        };

        let mut state = self.state.write();
        self.ensure_writable(&state)?;
        state.value = value;
        state.cache.clear();
        state.cache.extend(cache);
        Ok(())
    }
}

fn at_index(err: ValidationError, index: Option<usize>) -> ValidationError {
    match (err.index, index) {
        (None, Some(index)) => err.with_index(index),
        _ => err,
    }
}

impl fmt::Debug for Input {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state.read();
        f.debug_struct("Input")
            .field("name", &self.name)
            .field("type", &self.type_name())
            .field("value", &state.value)
            .field("overrides", &state.overrides)
            .field("read_only", &state.read_only)
            .field("cached", &state.cache.len())
            .finish_non_exhaustive()
    }
}
