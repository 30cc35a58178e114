//! Numbers with optional bounds.

use async_trait::async_trait;
use serde_json::{Number, Value};

use super::{decode_error, encode_error, number_property};
use crate::error::{InputResult, ValidationError};
use crate::input::Input;
use crate::kind::InputKind;

/// `numeric`: properties `min`, `max` and `integer`.
#[derive(Debug, Clone, Copy, Default)]
pub struct Numeric;

#[async_trait]
impl InputKind for Numeric {
    fn type_name(&self) -> &'static str {
        "numeric"
    }

    fn properties(&self) -> Vec<(&'static str, Value)> {
        vec![
            ("min", Value::Null),
            ("max", Value::Null),
            ("integer", Value::Bool(false)),
        ]
    }

    async fn validate_element(
        &self,
        input: &Input,
        value: &Value,
        _index: Option<usize>,
    ) -> Result<(), ValidationError> {
        let Some(number) = value.as_number() else {
            return Err(ValidationError::type_mismatch("number"));
        };
        let n = number.as_f64().unwrap_or(f64::NAN);

        let integer = input
            .property("integer")
            .ok()
            .and_then(|v| v.as_bool())
            .unwrap_or(false);
        if integer && !(number.is_i64() || number.is_u64() || n.fract() == 0.0) {
            return Err(ValidationError::new("integer", "must be a whole number")
                .with_param("actual", number));
        }

        if let Some(min) = number_property(input, "min")
            && n < min
        {
            return Err(ValidationError::new("min", format!("must be at least {min}"))
                .with_param("min", min)
                .with_param("actual", number));
        }
        if let Some(max) = number_property(input, "max")
            && n > max
        {
            return Err(ValidationError::new("max", format!("must be at most {max}"))
                .with_param("max", max)
                .with_param("actual", number));
        }
        Ok(())
    }

    fn parse_scalar(&self, input: &Input, raw: &str) -> InputResult<Value> {
        let trimmed = raw.trim();
        if let Ok(n) = trimmed.parse::<i64>() {
            return Ok(Value::Number(n.into()));
        }
        if let Ok(n) = trimmed.parse::<u64>() {
            return Ok(Value::Number(n.into()));
        }
        trimmed
            .parse::<f64>()
            .ok()
            .and_then(Number::from_f64)
            .map(Value::Number)
            .ok_or_else(|| decode_error(input, raw, "not a finite number"))
    }

    fn serialize_scalar(&self, input: &Input, value: &Value) -> InputResult<String> {
        value
            .as_number()
            .map(ToString::to_string)
            .ok_or_else(|| encode_error(input, value, "a number"))
    }
}

#[cfg(test)]
mod tests {
    use crate::{InputError, InputRegistry};
    use pretty_assertions::assert_eq;
    use rstest::rstest;
    use serde_json::{Value, json};

    #[rstest]
    #[case("42", json!(42))]
    #[case(" -7 ", json!(-7))]
    #[case("1.5", json!(1.5))]
    #[case("18446744073709551615", json!(u64::MAX))]
    fn decodes_numbers(#[case] raw: &str, #[case] expected: Value) {
        let registry = InputRegistry::with_builtin_types();
        let input = registry.create("n: numeric", Value::Null, None).unwrap();
        assert_eq!(input.parse_value(raw, false).unwrap(), expected);
    }

    #[rstest]
    #[case("abc")]
    #[case("NaN")]
    #[case("inf")]
    fn rejects_non_numbers(#[case] raw: &str) {
        let registry = InputRegistry::with_builtin_types();
        let input = registry.create("n: numeric", Value::Null, None).unwrap();
        assert!(matches!(
            input.parse_value(raw, false),
            Err(InputError::Decode { .. })
        ));
    }

    #[tokio::test]
    async fn integer_flag_rejects_fractions() {
        let registry = InputRegistry::with_builtin_types();
        let input = registry
            .create("n: numeric", json!({"integer": true}), None)
            .unwrap();
        input.set_value(json!(2.5)).unwrap();
        assert_eq!(input.validate().await.unwrap_err().code, "integer");
        input.set_value(json!(2)).unwrap();
        input.validate().await.unwrap();
    }
}
