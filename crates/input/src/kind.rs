//! Extension contract for input types.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;

use crate::error::{InputResult, ValidationError};
use crate::input::Input;

/// Name of the root type every input type descends from.
pub const BASE_TYPE: &str = "input";

/// Behaviour of one input type.
///
/// A type contributes property defaults through [`properties`](Self::properties),
/// validates one scalar element at a time and knows how to convert a scalar
/// to and from its string form. Vector handling, null guards, the `required`
/// check and the JSON array codec are shared by every type and live on
/// [`Input`].
///
/// Subtypes that refine a parent type hold an instance of it and call its
/// [`validate_element`](Self::validate_element) before their own checks.
#[async_trait]
pub trait InputKind: Send + Sync + 'static {
    /// Registered type name.
    fn type_name(&self) -> &'static str;

    /// Type this one inherits properties from.
    fn parent(&self) -> Option<&'static str> {
        Some(BASE_TYPE)
    }

    /// Properties introduced by this type with their initial values.
    fn properties(&self) -> Vec<(&'static str, Value)> {
        Vec::new()
    }

    /// Whether `value` counts as "no value" for the `required` check.
    fn is_empty_value(&self, value: &Value) -> bool {
        match value {
            Value::Null => true,
            Value::String(s) => s.is_empty(),
            Value::Array(items) => items.is_empty(),
            _ => false,
        }
    }

    /// Validate one non-null scalar. `index` is set for vector elements.
    async fn validate_element(
        &self,
        input: &Input,
        value: &Value,
        index: Option<usize>,
    ) -> Result<(), ValidationError>;

    /// Decode one scalar from its non-empty string form.
    fn parse_scalar(&self, input: &Input, raw: &str) -> InputResult<Value>;

    /// Encode one validated scalar.
    fn serialize_scalar(&self, input: &Input, value: &Value) -> InputResult<String>;
}

/// Additional per-element check attached to a single input instance.
///
/// Runs after the type's own checks, for the same element and index.
#[async_trait]
pub trait ExtendedValidator: Send + Sync {
    async fn validate(
        &self,
        input: &Input,
        value: &Value,
        index: Option<usize>,
    ) -> Result<(), ValidationError>;
}

/// Adapter turning a synchronous closure into an [`ExtendedValidator`].
pub struct FnValidator<F>(F);

#[async_trait]
impl<F> ExtendedValidator for FnValidator<F>
where
    F: Fn(&Input, &Value, Option<usize>) -> Result<(), ValidationError> + Send + Sync,
{
    async fn validate(
        &self,
        input: &Input,
        value: &Value,
        index: Option<usize>,
    ) -> Result<(), ValidationError> {
        (self.0)(input, value, index)
    }
}

/// Wrap a closure as a shareable extended validator.
pub fn validator_fn<F>(f: F) -> Arc<dyn ExtendedValidator>
where
    F: Fn(&Input, &Value, Option<usize>) -> Result<(), ValidationError> + Send + Sync + 'static,
{
    Arc::new(FnValidator(f))
}
