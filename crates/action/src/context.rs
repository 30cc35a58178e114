use std::sync::Arc;

use indexmap::IndexMap;
use serde_json::Value;
use tessera_input::Input;
use tessera_metadata::Metadata;

use crate::error::{ActionError, ActionResult};
use crate::handle::ActionHandle;
use crate::runtime::ActionRuntime;
use crate::session::Session;

/// What an action sees while it runs.
///
/// Built by the engine for each run. Input values are a snapshot taken
/// after autofill; the inputs themselves are read-only until the run ends.
pub struct ActionContext {
    label: String,
    values: IndexMap<String, Value>,
    inputs: IndexMap<String, Arc<Input>>,
    metadata: Metadata,
    session: Session,
    runtime: Arc<ActionRuntime>,
}

impl ActionContext {
    /// Create an empty context for `label`.
    pub fn new(label: impl Into<String>, runtime: Arc<ActionRuntime>, session: Session) -> Self {
        let metadata = Metadata::new(Arc::clone(runtime.variables()));
        Self {
            label: label.into(),
            values: IndexMap::new(),
            inputs: IndexMap::new(),
            metadata,
            session,
            runtime,
        }
    }

    /// Attach the inputs and snapshot their values.
    #[must_use]
    pub fn with_inputs(mut self, inputs: IndexMap<String, Arc<Input>>) -> Self {
        self.values = inputs
            .iter()
            .map(|(name, input)| (name.clone(), input.value()))
            .collect();
        self.inputs = inputs;
        self
    }

    /// Attach the options document.
    #[must_use]
    pub fn with_metadata(mut self, metadata: Metadata) -> Self {
        self.metadata = metadata;
        self
    }

    /// Registered name or type marker of the running action.
    pub fn label(&self) -> &str {
        &self.label
    }

    /// Snapshot value of an input.
    pub fn value(&self, name: &str) -> Option<&Value> {
        self.values.get(name)
    }

    /// Snapshot value of an input, failing when it is not declared.
    pub fn require(&self, name: &str) -> ActionResult<&Value> {
        self.values
            .get(name)
            .ok_or_else(|| ActionError::execution(format!("no input named `{name}`")))
    }

    /// Every input value in declaration order.
    pub fn values(&self) -> &IndexMap<String, Value> {
        &self.values
    }

    /// The live input, e.g. to read properties or cached derivations.
    pub fn input(&self, name: &str) -> Option<&Arc<Input>> {
        self.inputs.get(name)
    }

    pub fn metadata(&self) -> &Metadata {
        &self.metadata
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    /// Build a registered action as a nested call sharing this session's
    /// task queue and result cache.
    pub fn create_action(&self, name: &str) -> ActionResult<ActionHandle> {
        self.runtime
            .create_nested(name, self.session.clone_scoped())
    }
}

impl std::fmt::Debug for ActionContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ActionContext")
            .field("label", &self.label)
            .field("values", &self.values)
            .field("metadata", &self.metadata)
            .finish_non_exhaustive()
    }
}
