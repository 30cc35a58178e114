//! Error type for logger setup.

/// Result alias for logger operations.
pub type LogResult<T> = Result<T, LogError>;

/// Errors raised while building or installing a subscriber.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LogError {
    /// The level/filter directive could not be parsed.
    #[error("invalid filter `{filter}`: {reason}")]
    Filter {
        /// The directive as given.
        filter: String,
        /// Parser message.
        reason: String,
    },

    /// A global subscriber was already installed.
    #[error("logger already initialized: {0}")]
    AlreadyInitialized(String),
}

impl LogError {
    /// Machine-readable error code.
    #[must_use]
    pub fn code(&self) -> &'static str {
        match self {
            Self::Filter { .. } => "LOG_FILTER",
            Self::AlreadyInitialized(_) => "LOG_ALREADY_INIT",
        }
    }
}
