//! Hexadecimal strings, refining `text`.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;

use super::Text;
use crate::error::{InputResult, ValidationError};
use crate::input::{CacheKey, Input};
use crate::kind::InputKind;

/// Cache key of the decoded bytes of an element.
pub const BYTES_CACHE_KEY: &str = "bytes";

/// `hex`: a `text` of hexadecimal digits encoding whole bytes.
///
/// Text checks run first. The optional `bytes` property fixes the decoded
/// length. Decoded bytes are memoized per element under
/// [`BYTES_CACHE_KEY`].
#[derive(Debug, Clone, Copy, Default)]
pub struct Hex {
    text: Text,
}

impl Hex {
    /// Decoded bytes of the element at `index` (or the scalar value).
    pub fn bytes(input: &Input, index: Option<usize>) -> Option<Arc<Vec<u8>>> {
        input.cached::<Vec<u8>>(&CacheKey::at(BYTES_CACHE_KEY, index))
    }
}

#[async_trait]
impl InputKind for Hex {
    fn type_name(&self) -> &'static str {
        "hex"
    }

    fn parent(&self) -> Option<&'static str> {
        Some(self.text.type_name())
    }

    fn properties(&self) -> Vec<(&'static str, Value)> {
        vec![("bytes", Value::Null)]
    }

    async fn validate_element(
        &self,
        input: &Input,
        value: &Value,
        index: Option<usize>,
    ) -> Result<(), ValidationError> {
        self.text.validate_element(input, value, index).await?;

        let digits = value.as_str().unwrap_or_default();
        let decoded = input
            .cache_get_or_insert_with(CacheKey::at(BYTES_CACHE_KEY, index), || {
                hex::decode(digits)
            })
            .map_err(|err| {
                ValidationError::new("hex", format!("not a hexadecimal string: {err}"))
            })?;

        if let Some(expected) = input.property("bytes").ok().and_then(|v| v.as_u64())
            && decoded.len() as u64 != expected
        {
            return Err(ValidationError::new(
                "hex_length",
                format!("must encode exactly {expected} bytes"),
            )
            .with_param("bytes", expected)
            .with_param("actual", decoded.len()));
        }
        Ok(())
    }

    fn parse_scalar(&self, input: &Input, raw: &str) -> InputResult<Value> {
        self.text.parse_scalar(input, raw)
    }

    fn serialize_scalar(&self, input: &Input, value: &Value) -> InputResult<String> {
        self.text.serialize_scalar(input, value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::InputRegistry;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[tokio::test]
    async fn text_checks_run_before_hex_checks() {
        let registry = InputRegistry::with_builtin_types();
        let input = registry
            .create("digest: hex", json!({"max": 4}), None)
            .unwrap();
        input.set_value(json!("zzzzzz")).unwrap();
        assert_eq!(input.validate().await.unwrap_err().code, "max_length");

        input.set_value(json!("zz")).unwrap();
        assert_eq!(input.validate().await.unwrap_err().code, "hex");
    }

    #[tokio::test]
    async fn decoded_bytes_are_cached_per_element() {
        let registry = InputRegistry::with_builtin_types();
        let input = registry
            .create("keys: hex[]", json!({"bytes": 2}), None)
            .unwrap();
        input.set_value(json!(["beef", "CAFE"])).unwrap();
        input.validate().await.unwrap();

        assert_eq!(*Hex::bytes(&input, Some(1)).unwrap(), vec![0xca, 0xfe]);

        input.set_value(json!(["beef", "00"])).unwrap();
        let err = input.validate().await.unwrap_err();
        assert_eq!(err.code, "hex_length");
        assert_eq!(err.index, Some(1));
    }

    #[test]
    fn inherits_text_properties() {
        let registry = InputRegistry::with_builtin_types();
        let input = registry.create("digest: hex", json!(null), None).unwrap();
        assert!(input.has_property("pattern"));
        assert!(input.has_property("bytes"));
    }
}
