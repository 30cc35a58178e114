//! Error types for input declaration, mutation and validation.

use std::borrow::Cow;
use std::fmt;

/// Result type for input operations.
pub type InputResult<T> = Result<T, InputError>;

/// Errors raised while declaring, configuring or mutating an [`Input`](crate::Input).
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum InputError {
    // -- Declaration --
    /// The declaration string does not follow `name[?]: type[[]]`.
    #[error("invalid input declaration `{declaration}`: {reason}")]
    InvalidDeclaration { declaration: String, reason: String },

    /// The input name contains characters outside `[\w.-]`.
    #[error("invalid input name `{name}`")]
    InvalidName { name: String },

    /// The input name is reserved by the framework.
    #[error("input name `{name}` is reserved")]
    ReservedName { name: String },

    /// No input type is registered under this name.
    #[error("unknown input type `{type_name}`")]
    UnknownType { type_name: String },

    /// A type with this name has already been registered.
    #[error("input type `{type_name}` is already registered")]
    TypeAlreadyRegistered { type_name: String },

    /// Properties passed at construction were not a mapping.
    #[error("input properties must be an object, got {found}")]
    InvalidProperties { found: String },

    // -- Properties --
    /// The property is not registered for the input type.
    #[error("property `{property}` is not registered for type `{type_name}`")]
    MissingProperty { type_name: String, property: String },

    /// The property was locked and cannot be reassigned.
    #[error("property `{property}` of input `{input}` is locked")]
    PropertyLocked { input: String, property: String },

    // -- Value state --
    /// The input is read-only while an action runs.
    #[error("input `{input}` is read-only")]
    ReadOnly { input: String },

    /// The value is frozen against in-place mutation.
    #[error("value of input `{input}` is immutable")]
    Immutable { input: String },

    /// `setup_from` was asked to combine incompatible inputs.
    #[error("cannot set up `{input}` from `{source_input}`: {reason}")]
    SetupMismatch {
        input: String,
        source_input: String,
        reason: String,
    },

    // -- Codec --
    /// A serialized value could not be decoded.
    #[error("cannot decode `{raw}` for input `{input}`: {reason}")]
    Decode {
        input: String,
        raw: String,
        reason: String,
    },

    /// A value could not be encoded.
    #[error("cannot encode value of input `{input}`: {reason}")]
    Encode { input: String, reason: String },

    /// The value failed validation.
    #[error(transparent)]
    Validation(#[from] ValidationError),
}

impl InputError {
    /// Stable machine-readable error code.
    #[must_use]
    pub fn code(&self) -> &'static str {
        match self {
            Self::InvalidDeclaration { .. } => "INPUT_INVALID_DECLARATION",
            Self::InvalidName { .. } => "INPUT_INVALID_NAME",
            Self::ReservedName { .. } => "INPUT_RESERVED_NAME",
            Self::UnknownType { .. } => "INPUT_UNKNOWN_TYPE",
            Self::TypeAlreadyRegistered { .. } => "INPUT_TYPE_EXISTS",
            Self::InvalidProperties { .. } => "INPUT_INVALID_PROPERTIES",
            Self::MissingProperty { .. } => "INPUT_MISSING_PROPERTY",
            Self::PropertyLocked { .. } => "INPUT_PROPERTY_LOCKED",
            Self::ReadOnly { .. } => "INPUT_READ_ONLY",
            Self::Immutable { .. } => "INPUT_IMMUTABLE",
            Self::SetupMismatch { .. } => "INPUT_SETUP_MISMATCH",
            Self::Decode { .. } => "INPUT_DECODE",
            Self::Encode { .. } => "INPUT_ENCODE",
            Self::Validation(_) => "INPUT_VALIDATION",
        }
    }

    /// Coarse grouping used for log fields and error rendering.
    #[must_use]
    pub fn category(&self) -> &'static str {
        match self {
            Self::InvalidDeclaration { .. }
            | Self::InvalidName { .. }
            | Self::ReservedName { .. }
            | Self::UnknownType { .. }
            | Self::TypeAlreadyRegistered { .. }
            | Self::InvalidProperties { .. } => "declaration",
            Self::MissingProperty { .. } | Self::PropertyLocked { .. } => "property",
            Self::ReadOnly { .. } | Self::Immutable { .. } | Self::SetupMismatch { .. } => {
                "state"
            }
            Self::Decode { .. } | Self::Encode { .. } => "codec",
            Self::Validation(_) => "validation",
        }
    }

    /// Whether the caller can recover by supplying a different value.
    #[must_use]
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Self::Validation(_) | Self::Decode { .. })
    }
}

// ============================================================================
// VALIDATION ERROR
// ============================================================================

/// Codes shared by every input type.
pub mod codes {
    /// A required input holds no value.
    pub const REQUIRED: &str = "required";
    /// A vector input holds something other than an array.
    pub const VECTOR_NOT_ARRAY: &str = "vector_not_array";
    /// A vector input contains a `null` element.
    pub const VECTOR_NULL_ELEMENT: &str = "vector_null_element";
    /// The value has the wrong JSON shape for the type.
    pub const TYPE_MISMATCH: &str = "type_mismatch";
}

/// A single validation failure.
///
/// `code` is stable and suitable for programmatic handling; `message` is the
/// default English rendering. `input` is filled in once the failure is tagged
/// with the owning input's name, `index` when it concerns one vector element.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    pub code: Cow<'static, str>,
    pub message: Cow<'static, str>,
    pub input: Option<String>,
    pub index: Option<usize>,
    pub params: Vec<(Cow<'static, str>, String)>,
}

impl ValidationError {
    /// Create an error with a code and message.
    pub fn new(code: impl Into<Cow<'static, str>>, message: impl Into<Cow<'static, str>>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
            input: None,
            index: None,
            params: Vec::new(),
        }
    }

    /// The input is required but empty.
    #[must_use]
    pub fn required() -> Self {
        Self::new(codes::REQUIRED, "value is required")
    }

    /// The input is a vector but the value is not an array.
    #[must_use]
    pub fn vector_not_array() -> Self {
        Self::new(codes::VECTOR_NOT_ARRAY, "expected a list of values")
    }

    /// A vector element is `null`.
    #[must_use]
    pub fn vector_null_element(index: usize) -> Self {
        Self::new(codes::VECTOR_NULL_ELEMENT, "list elements cannot be null or empty").with_index(index)
    }

    /// The value has the wrong JSON shape.
    pub fn type_mismatch(expected: &'static str) -> Self {
        Self::new(codes::TYPE_MISMATCH, format!("expected a {expected}"))
            .with_param("expected", expected)
    }

    /// Tag with the owning input's name.
    #[must_use = "builder methods must be chained or built"]
    pub fn with_input(mut self, input: impl Into<String>) -> Self {
        self.input = Some(input.into());
        self
    }

    /// Tag with a vector element index.
    #[must_use = "builder methods must be chained or built"]
    pub fn with_index(mut self, index: usize) -> Self {
        self.index = Some(index);
        self
    }

    /// Add a message parameter.
    #[must_use = "builder methods must be chained or built"]
    pub fn with_param(mut self, key: impl Into<Cow<'static, str>>, value: impl ToString) -> Self {
        self.params.push((key.into(), value.to_string()));
        self
    }

    /// Look up a parameter by key.
    #[must_use]
    pub fn param(&self, key: &str) -> Option<&str> {
        self.params
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (&self.input, self.index) {
            (Some(input), Some(index)) => write!(f, "{input}[{index}]: ")?,
            (Some(input), None) => write!(f, "{input}: ")?,
            (None, Some(index)) => write!(f, "[{index}]: ")?,
            (None, None) => {}
        }
        write!(f, "{} ({})", self.message, self.code)
    }
}

impl std::error::Error for ValidationError {}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn display_includes_input_and_index() {
        let err = ValidationError::new("max", "must be at most 10")
            .with_param("max", 10)
            .with_input("count")
            .with_index(2);
        assert_eq!(err.to_string(), "count[2]: must be at most 10 (max)");
        assert_eq!(err.param("max"), Some("10"));
    }

    #[test]
    fn validation_converts_into_input_error() {
        let err: InputError = ValidationError::required().into();
        assert_eq!(err.code(), "INPUT_VALIDATION");
        assert_eq!(err.category(), "validation");
        assert!(err.is_recoverable());
    }

    #[test]
    fn state_errors_are_not_recoverable() {
        let err = InputError::ReadOnly {
            input: "name".into(),
        };
        assert_eq!(err.code(), "INPUT_READ_ONLY");
        assert!(!err.is_recoverable());
    }
}
