//! Free-form text with length bounds and an optional pattern.

use async_trait::async_trait;
use regex::Regex;
use serde_json::Value;

use super::{number_property, scalar_string};
use crate::error::{InputResult, ValidationError};
use crate::input::{CacheKey, Input};
use crate::kind::InputKind;

/// `text`: properties `min` / `max` (character count) and `pattern`.
#[derive(Debug, Clone, Copy, Default)]
pub struct Text;

#[async_trait]
impl InputKind for Text {
    fn type_name(&self) -> &'static str {
        "text"
    }

    fn properties(&self) -> Vec<(&'static str, Value)> {
        vec![("min", Value::Null), ("max", Value::Null), ("pattern", Value::Null)]
    }

    async fn validate_element(
        &self,
        input: &Input,
        value: &Value,
        _index: Option<usize>,
    ) -> Result<(), ValidationError> {
        let Some(text) = value.as_str() else {
            return Err(ValidationError::type_mismatch("string"));
        };

        let length = text.chars().count();
        if let Some(min) = number_property(input, "min")
            && (length as f64) < min
        {
            return Err(
                ValidationError::new("min_length", format!("must be at least {min} characters"))
                    .with_param("min", min)
                    .with_param("actual", length),
            );
        }
        if let Some(max) = number_property(input, "max")
            && (length as f64) > max
        {
            return Err(
                ValidationError::new("max_length", format!("must be at most {max} characters"))
                    .with_param("max", max)
                    .with_param("actual", length),
            );
        }

        if let Ok(Value::String(pattern)) = input.property("pattern") {
            let compiled = input
                .cache_get_or_insert_with(CacheKey::new("pattern"), || Regex::new(&pattern))
                .map_err(|err| {
                    ValidationError::new("pattern_invalid", format!("invalid pattern: {err}"))
                        .with_param("pattern", &pattern)
                })?;
            if !compiled.is_match(text) {
                return Err(
                    ValidationError::new("pattern", format!("must match `{pattern}`"))
                        .with_param("pattern", &pattern),
                );
            }
        }
        Ok(())
    }

    fn parse_scalar(&self, _input: &Input, raw: &str) -> InputResult<Value> {
        Ok(Value::String(raw.to_string()))
    }

    fn serialize_scalar(&self, input: &Input, value: &Value) -> InputResult<String> {
        scalar_string(input, value)
    }
}
