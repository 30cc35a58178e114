//! Booleans.

use async_trait::async_trait;
use serde_json::Value;

use super::{decode_error, encode_error};
use crate::error::{InputResult, ValidationError};
use crate::input::Input;
use crate::kind::InputKind;

const TRUTHY: &[&str] = &["true", "1", "yes", "on", "y"];
const FALSY: &[&str] = &["false", "0", "no", "off", "n"];

/// `bool`: accepts the usual textual spellings on decode.
#[derive(Debug, Clone, Copy, Default)]
pub struct Bool;

#[async_trait]
impl InputKind for Bool {
    fn type_name(&self) -> &'static str {
        "bool"
    }

    async fn validate_element(
        &self,
        _input: &Input,
        value: &Value,
        _index: Option<usize>,
    ) -> Result<(), ValidationError> {
        if value.is_boolean() {
            Ok(())
        } else {
            Err(ValidationError::type_mismatch("boolean"))
        }
    }

    fn parse_scalar(&self, input: &Input, raw: &str) -> InputResult<Value> {
        let lowered = raw.trim().to_ascii_lowercase();
        if TRUTHY.contains(&lowered.as_str()) {
            Ok(Value::Bool(true))
        } else if FALSY.contains(&lowered.as_str()) {
            Ok(Value::Bool(false))
        } else {
            Err(decode_error(input, raw, "not a boolean"))
        }
    }

    fn serialize_scalar(&self, input: &Input, value: &Value) -> InputResult<String> {
        value
            .as_bool()
            .map(|b| b.to_string())
            .ok_or_else(|| encode_error(input, value, "a boolean"))
    }
}

#[cfg(test)]
mod tests {
    use crate::InputRegistry;
    use rstest::rstest;
    use serde_json::{Value, json};

    #[rstest]
    #[case("true", true)]
    #[case("YES", true)]
    #[case("0", false)]
    #[case(" off ", false)]
    fn decodes_spellings(#[case] raw: &str, #[case] expected: bool) {
        let registry = InputRegistry::with_builtin_types();
        let input = registry.create("flag: bool", Value::Null, None).unwrap();
        assert_eq!(input.parse_value(raw, false).unwrap(), json!(expected));
    }

    #[tokio::test]
    async fn false_is_a_value_not_empty() {
        let registry = InputRegistry::with_builtin_types();
        let input = registry.create("flag: bool", Value::Null, None).unwrap();
        input.set_value(json!(false)).unwrap();
        input.validate().await.unwrap();
        assert_eq!(input.serialize_value().await.unwrap(), "false");
    }
}
