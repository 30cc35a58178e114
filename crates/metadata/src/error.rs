/// Result alias for metadata operations.
pub type MetadataResult<T> = Result<T, MetadataError>;

/// Error type for option-store and variable operations.
///
/// Every variant is a programmer/configuration error: it is raised
/// synchronously by the call that caused it and is never retryable.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MetadataError {
    /// A path segment does not match the `[\w-]+` grammar.
    #[error("invalid path `{path}`: illegal segment `{segment}`")]
    InvalidPath { path: String, segment: String },

    /// A variable name is not `$` followed by word characters.
    #[error("invalid variable name `{name}`")]
    InvalidVariableName { name: String },

    /// A variable value contains characters that cannot appear in a path.
    #[error("invalid value `{value}` for variable `{name}`")]
    InvalidVariableValue { name: String, value: String },

    /// A `$segment` refers to a variable that was never registered.
    #[error("unknown variable `{name}`")]
    UnknownVariable { name: String },

    /// Alias expansion looped back on itself or exceeded the depth ceiling.
    ///
    /// `chain` holds only the leading links of the expansion.
    #[error("circular reference while resolving `{root}`: {}", chain.join(" -> "))]
    CircularReference { root: String, chain: Vec<String> },
}

impl MetadataError {
    /// Broad error category for grouping in logs.
    #[must_use]
    pub fn category(&self) -> &str {
        match self {
            Self::InvalidPath { .. } => "format",
            Self::InvalidVariableName { .. } | Self::InvalidVariableValue { .. } => "format",
            Self::UnknownVariable { .. } => "lookup",
            Self::CircularReference { .. } => "cycle",
        }
    }

    /// Machine-readable error code.
    #[must_use]
    pub fn code(&self) -> &str {
        match self {
            Self::InvalidPath { .. } => "META_INVALID_PATH",
            Self::InvalidVariableName { .. } => "META_INVALID_VAR_NAME",
            Self::InvalidVariableValue { .. } => "META_INVALID_VAR_VALUE",
            Self::UnknownVariable { .. } => "META_UNKNOWN_VAR",
            Self::CircularReference { .. } => "META_CIRCULAR",
        }
    }
}
