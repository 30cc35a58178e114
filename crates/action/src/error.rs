//! Error types for action execution, the task queue and sessions.

use std::fmt;

use tessera_input::{InputError, ValidationError};
use tessera_metadata::MetadataError;

/// Result type for action operations.
pub type ActionResult<T> = Result<T, ActionError>;

/// Where an action was started from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Origin {
    /// Started directly by a handler or caller.
    TopLevel,
    /// Created by another action through `create_action`.
    Nested,
}

impl fmt::Display for Origin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::TopLevel => "top-level",
            Self::Nested => "nested",
        })
    }
}

/// Broad class of an [`ActionError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[non_exhaustive]
pub enum ActionErrorKind {
    /// An input value failed validation.
    Validation,
    /// An input could not be declared, decoded or assigned.
    Input,
    /// Option lookup or variable expansion failed.
    Metadata,
    /// No action is registered under the requested name.
    NotFound,
    /// The business logic rejected the call.
    Execution,
    /// The caller asked for usage information instead of a result.
    Help,
}

impl ActionErrorKind {
    /// Whether errors of this kind should still be rendered when they come
    /// out of a nested action.
    #[must_use]
    pub fn allows_nested_output(self) -> bool {
        !matches!(self, Self::Validation | Self::Help)
    }

    fn as_str(self) -> &'static str {
        match self {
            Self::Validation => "validation",
            Self::Input => "input",
            Self::Metadata => "metadata",
            Self::NotFound => "not found",
            Self::Execution => "execution",
            Self::Help => "help",
        }
    }
}

impl fmt::Display for ActionErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Failure of an action run.
///
/// As the error travels out through nested runs every frame appends one
/// breadcrumb line and records its origin, so [`origin`](Self::origin) ends up
/// naming the outermost frame. Errors that passed through a nested frame and
/// whose kind opts out of nested output report
/// [`is_output_enabled`](Self::is_output_enabled) as `false`; transports must
/// not render those.
#[derive(Debug, Clone, PartialEq)]
pub struct ActionError {
    kind: ActionErrorKind,
    message: String,
    origin: Option<Origin>,
    nested: bool,
    nested_output: bool,
    trace: Vec<String>,
    validation: Option<ValidationError>,
    details: Option<serde_json::Value>,
}

impl ActionError {
    /// Create an error of `kind`.
    pub fn new(kind: ActionErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            origin: None,
            nested: false,
            nested_output: kind.allows_nested_output(),
            trace: Vec::new(),
            validation: None,
            details: None,
        }
    }

    /// Business-logic failure.
    pub fn execution(message: impl Into<String>) -> Self {
        Self::new(ActionErrorKind::Execution, message)
    }

    /// Usage information was requested.
    pub fn help(message: impl Into<String>) -> Self {
        Self::new(ActionErrorKind::Help, message)
    }

    /// No action registered under `name`.
    pub fn not_found(name: &str) -> Self {
        Self::new(
            ActionErrorKind::NotFound,
            format!("no action registered under `{name}`"),
        )
    }

    /// Attach structured details.
    #[must_use = "builder methods must be chained or built"]
    pub fn with_details(mut self, details: serde_json::Value) -> Self {
        self.details = Some(details);
        self
    }

    /// Override whether this error may be rendered after leaving a nested
    /// action.
    #[must_use = "builder methods must be chained or built"]
    pub fn with_nested_output(mut self, enabled: bool) -> Self {
        self.nested_output = enabled;
        self
    }

    pub fn kind(&self) -> ActionErrorKind {
        self.kind
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    /// Origin of the outermost frame the error passed through.
    pub fn origin(&self) -> Option<Origin> {
        self.origin
    }

    /// Whether the error passed through a nested action.
    pub fn is_nested(&self) -> bool {
        self.nested
    }

    /// Whether a transport may render this error.
    pub fn is_output_enabled(&self) -> bool {
        !self.nested || self.nested_output
    }

    /// Breadcrumbs, outermost first.
    pub fn trace(&self) -> &[String] {
        &self.trace
    }

    /// The underlying validation failure, for [`ActionErrorKind::Validation`].
    pub fn validation_error(&self) -> Option<&ValidationError> {
        self.validation.as_ref()
    }

    pub fn details(&self) -> Option<&serde_json::Value> {
        self.details.as_ref()
    }

    /// Stable machine-readable code.
    pub fn code(&self) -> &'static str {
        match self.kind {
            ActionErrorKind::Validation => "ACTION_VALIDATION",
            ActionErrorKind::Input => "ACTION_INPUT",
            ActionErrorKind::Metadata => "ACTION_METADATA",
            ActionErrorKind::NotFound => "ACTION_NOT_FOUND",
            ActionErrorKind::Execution => "ACTION_EXECUTION",
            ActionErrorKind::Help => "ACTION_HELP",
        }
    }

    /// Record one frame of the run that is propagating this error. Frames
    /// are added innermost first, so each one goes in front.
    pub(crate) fn enrich(mut self, frame: &str, origin: Origin) -> Self {
        self.trace.insert(0, format!("{frame} ({origin})"));
        self.origin = Some(origin);
        if origin == Origin::Nested {
            self.nested = true;
        }
        self
    }
}

impl fmt::Display for ActionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.kind, self.message)
    }
}

impl std::error::Error for ActionError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.validation
            .as_ref()
            .map(|err| err as &(dyn std::error::Error + 'static))
    }
}

impl From<ValidationError> for ActionError {
    fn from(err: ValidationError) -> Self {
        let mut error = Self::new(ActionErrorKind::Validation, err.to_string());
        error.validation = Some(err);
        error
    }
}

impl From<InputError> for ActionError {
    fn from(err: InputError) -> Self {
        match err {
            InputError::Validation(validation) => validation.into(),
            other => Self::new(ActionErrorKind::Input, other.to_string()),
        }
    }
}

impl From<MetadataError> for ActionError {
    fn from(err: MetadataError) -> Self {
        Self::new(ActionErrorKind::Metadata, err.to_string())
    }
}

// ============================================================================
// TASK QUEUE / SESSION
// ============================================================================

/// One failed task queue entry.
#[derive(Debug, Clone, PartialEq)]
pub struct TaskFailure {
    /// Human-readable description of the entry.
    pub task: String,
    pub priority: i32,
    pub error: ActionError,
}

impl fmt::Display for TaskFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (priority {}): {}", self.task, self.priority, self.error)?;
        for line in self.error.trace() {
            write!(f, "\n    at {line}")?;
        }
        Ok(())
    }
}

/// Errors from running a task queue.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum TaskQueueError {
    /// Every entry was attempted; these failed.
    #[error("{} task(s) failed:\n{}", .failures.len(), render_failures(.failures))]
    Aggregate { failures: Vec<TaskFailure> },
}

impl TaskQueueError {
    pub fn failures(&self) -> &[TaskFailure] {
        match self {
            Self::Aggregate { failures } => failures,
        }
    }
}

fn render_failures(failures: &[TaskFailure]) -> String {
    failures
        .iter()
        .map(|failure| format!("  - {failure}"))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Errors from finalizing a session.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum SessionError {
    /// `finalize` was already called on this session.
    #[error("session has already been finalized")]
    AlreadyFinalized,

    /// Wrap-up tasks failed.
    #[error(transparent)]
    Tasks(#[from] TaskQueueError),
}

impl SessionError {
    pub fn code(&self) -> &'static str {
        match self {
            Self::AlreadyFinalized => "SESSION_FINALIZED",
            Self::Tasks(_) => "SESSION_TASKS_FAILED",
        }
    }
}

/// Errors surfaced by a [`Handler`](crate::io::Handler) instead of being
/// written.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum HandlerError {
    /// The run failed with an error that must not be rendered.
    #[error("unhandled action failure: {0}")]
    Unhandled(ActionError),

    /// The writer itself failed.
    #[error("writer failed: {0}")]
    Write(ActionError),
}
