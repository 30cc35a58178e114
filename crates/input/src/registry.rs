//! Input type registry and the input factory.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::RwLock;
use serde_json::{Value, json};

use crate::declaration::Declaration;
use crate::error::{InputError, InputResult, ValidationError};
use crate::input::{Input, props};
use crate::kind::{BASE_TYPE, ExtendedValidator, InputKind};
use crate::property::PropertyRegistry;
use crate::types;

/// Root of the type hierarchy; carries the shared properties.
struct BaseKind;

#[async_trait]
impl InputKind for BaseKind {
    fn type_name(&self) -> &'static str {
        BASE_TYPE
    }

    fn parent(&self) -> Option<&'static str> {
        None
    }

    fn properties(&self) -> Vec<(&'static str, Value)> {
        vec![
            (props::TYPE, Value::Null),
            (props::VECTOR, json!(false)),
            (props::REQUIRED, json!(true)),
            (props::DEFAULT_VALUE, Value::Null),
            (props::IMMUTABLE, json!(true)),
            (props::HIDDEN, json!(false)),
            (props::SERIALIZE, json!(true)),
            (props::AUTOFILL, Value::Null),
            (props::DESCRIPTION, json!("")),
        ]
    }

    async fn validate_element(
        &self,
        _input: &Input,
        _value: &Value,
        _index: Option<usize>,
    ) -> Result<(), ValidationError> {
        Ok(())
    }

    fn parse_scalar(&self, _input: &Input, raw: &str) -> InputResult<Value> {
        Ok(Value::String(raw.to_string()))
    }

    fn serialize_scalar(&self, input: &Input, value: &Value) -> InputResult<String> {
        match value {
            Value::String(s) => Ok(s.clone()),
            other => serde_json::to_string(other).map_err(|err| InputError::Encode {
                input: input.name().to_string(),
                reason: err.to_string(),
            }),
        }
    }
}

/// Registered input types plus their property defaults.
///
/// Inputs created by a registry share its [`PropertyRegistry`], so property
/// defaults registered later are visible to existing inputs.
pub struct InputRegistry {
    kinds: RwLock<HashMap<&'static str, Arc<dyn InputKind>>>,
    properties: Arc<PropertyRegistry>,
}

impl Default for InputRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl InputRegistry {
    /// A registry holding only the root type.
    #[must_use]
    pub fn new() -> Self {
        let base: Arc<dyn InputKind> = Arc::new(BaseKind);
        let properties = PropertyRegistry::with_root(BASE_TYPE, base.properties());
        Self {
            kinds: RwLock::new(HashMap::from([(BASE_TYPE, base)])),
            properties: Arc::new(properties),
        }
    }

    /// A registry with the bundled `text`, `numeric`, `bool` and `hex` types.
    #[must_use]
    pub fn with_builtin_types() -> Self {
        let registry = Self::new();
        for kind in types::builtin() {
            let name = kind.type_name();
            if let Err(err) = registry.register_type(kind) {
                tracing::warn!(input_type = %name, error = %err, "skipping builtin input type");
            }
        }
        registry
    }

    /// Register a type. Its parent must already be registered.
    pub fn register_type(&self, kind: Arc<dyn InputKind>) -> InputResult<()> {
        let name = kind.type_name();
        self.properties.declare_type(name, kind.parent())?;
        for (property, initial) in kind.properties() {
            self.properties.register(name, property, initial)?;
        }
        self.kinds.write().insert(name, kind);

        tracing::debug!(input_type = %name, "registered input type");
        Ok(())
    }

    /// Look up a registered type.
    pub fn kind(&self, type_name: &str) -> InputResult<Arc<dyn InputKind>> {
        self.kinds
            .read()
            .get(type_name)
            .cloned()
            .ok_or_else(|| InputError::UnknownType {
                type_name: type_name.to_string(),
            })
    }

    /// Whether a type is registered.
    pub fn has_type(&self, type_name: &str) -> bool {
        self.kinds.read().contains_key(type_name)
    }

    /// Shared property defaults.
    #[must_use]
    pub fn properties(&self) -> &Arc<PropertyRegistry> {
        &self.properties
    }

    /// Create an input from a declaration such as `count?: numeric[]`.
    ///
    /// `properties` is `null` or an object of instance properties. A
    /// non-null `defaultValue` becomes the initial value. `type`, `vector`
    /// and `defaultValue` are locked afterwards.
    pub fn create(
        &self,
        declaration: &str,
        properties: Value,
        extended: Option<Arc<dyn ExtendedValidator>>,
    ) -> InputResult<Arc<Input>> {
        let decl = Declaration::parse(declaration)?;
        let kind = self.kind(&decl.type_name)?;
        let overrides = match properties {
            Value::Null => serde_json::Map::new(),
            Value::Object(map) => map,
            other => {
                return Err(InputError::InvalidProperties {
                    found: json_kind(&other).to_string(),
                });
            }
        };

        let input = Input::new(decl.name, kind, Arc::clone(&self.properties), extended);
        input.assign_property(props::TYPE, json!(decl.type_name), false)?;
        input.assign_property(props::VECTOR, json!(decl.vector), false)?;
        input.assign_property(props::REQUIRED, json!(decl.required), false)?;
        input.lock_property(props::TYPE)?;
        input.lock_property(props::VECTOR)?;

        for (name, value) in overrides {
            input.assign_property(&name, value, false)?;
        }

        let default = input.default_value();
        if !default.is_null() {
            input.set_value(default)?;
        }
        input.lock_property(props::DEFAULT_VALUE)?;

        tracing::trace!(input = %input.name(), input_type = %input.type_name(), "created input");
        Ok(Arc::new(input))
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
