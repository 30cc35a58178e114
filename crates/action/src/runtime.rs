//! Shared wiring every action handle is built from.

use std::sync::Arc;

use tessera_input::InputRegistry;
use tessera_metadata::VariableRegistry;

use crate::action::Action;
use crate::error::{ActionError, ActionResult, Origin};
use crate::handle::ActionHandle;
use crate::registry::ActionRegistry;
use crate::session::Session;
use crate::signature::{SignatureHasher, default_hasher};

/// Input types, registered actions, metadata variables and the signature
/// hasher.
///
/// Built once at startup, shared as `Arc<ActionRuntime>`.
pub struct ActionRuntime {
    inputs: Arc<InputRegistry>,
    actions: Arc<ActionRegistry>,
    variables: Arc<VariableRegistry>,
    hasher: Arc<dyn SignatureHasher>,
}

impl ActionRuntime {
    /// Create a runtime using the global variable registry and the default
    /// hasher.
    pub fn new(inputs: Arc<InputRegistry>, actions: Arc<ActionRegistry>) -> Self {
        Self {
            inputs,
            actions,
            variables: VariableRegistry::global(),
            hasher: default_hasher(),
        }
    }

    #[must_use]
    pub fn with_variables(mut self, variables: Arc<VariableRegistry>) -> Self {
        self.variables = variables;
        self
    }

    #[must_use]
    pub fn with_hasher(mut self, hasher: Arc<dyn SignatureHasher>) -> Self {
        self.hasher = hasher;
        self
    }

    pub fn inputs(&self) -> &Arc<InputRegistry> {
        &self.inputs
    }

    pub fn actions(&self) -> &Arc<ActionRegistry> {
        &self.actions
    }

    pub fn variables(&self) -> &Arc<VariableRegistry> {
        &self.variables
    }

    pub fn hasher(&self) -> &Arc<dyn SignatureHasher> {
        &self.hasher
    }

    /// Wrap an action instance for a top-level run.
    pub fn handle(
        self: &Arc<Self>,
        action: Arc<dyn Action>,
        session: Session,
    ) -> ActionResult<ActionHandle> {
        ActionHandle::build(Arc::clone(self), action, None, session, Origin::TopLevel)
    }

    /// Build a registered action for a top-level run.
    pub fn create(self: &Arc<Self>, name: &str, session: Session) -> ActionResult<ActionHandle> {
        self.create_with_origin(name, session, Origin::TopLevel)
    }

    pub(crate) fn create_nested(
        self: &Arc<Self>,
        name: &str,
        session: Session,
    ) -> ActionResult<ActionHandle> {
        self.create_with_origin(name, session, Origin::Nested)
    }

    fn create_with_origin(
        self: &Arc<Self>,
        name: &str,
        session: Session,
        origin: Origin,
    ) -> ActionResult<ActionHandle> {
        let action = self
            .actions
            .create(name)
            .ok_or_else(|| ActionError::not_found(name))?;
        tracing::debug!(action = %name, %origin, "creating action");
        ActionHandle::build(
            Arc::clone(self),
            action,
            Some(name.to_string()),
            session,
            origin,
        )
    }
}

impl std::fmt::Debug for ActionRuntime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ActionRuntime")
            .field("actions", &self.actions)
            .field("hasher", &self.hasher.algorithm())
            .finish_non_exhaustive()
    }
}
