//! Bundled input types.

use std::sync::Arc;

use serde_json::Value;

use crate::error::{InputError, InputResult};
use crate::input::Input;
use crate::kind::InputKind;

mod boolean;
mod hex;
mod numeric;
mod text;

pub use boolean::Bool;
pub use hex::Hex;
pub use numeric::Numeric;
pub use text::Text;

/// Bundled types in parent-first order.
pub fn builtin() -> Vec<Arc<dyn InputKind>> {
    vec![
        Arc::new(Text),
        Arc::new(Numeric),
        Arc::new(Bool),
        Arc::new(Hex::default()),
    ]
}

/// Numeric property, `None` when unset or `null`.
pub(crate) fn number_property(input: &Input, name: &str) -> Option<f64> {
    input.property(name).ok().and_then(|value| value.as_f64())
}

pub(crate) fn decode_error(input: &Input, raw: &str, reason: impl Into<String>) -> InputError {
    InputError::Decode {
        input: input.name().to_string(),
        raw: raw.to_string(),
        reason: reason.into(),
    }
}

pub(crate) fn encode_error(input: &Input, value: &Value, expected: &str) -> InputError {
    InputError::Encode {
        input: input.name().to_string(),
        reason: format!("expected {expected}, got {value}"),
    }
}

pub(crate) fn scalar_string(input: &Input, value: &Value) -> InputResult<String> {
    value
        .as_str()
        .map(str::to_string)
        .ok_or_else(|| encode_error(input, value, "a string"))
}
