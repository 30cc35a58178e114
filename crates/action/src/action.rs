use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use tessera_input::ExtendedValidator;
use tessera_metadata::Metadata;

use crate::context::ActionContext;
use crate::error::ActionResult;

/// Declaration of one input an action takes.
#[derive(Clone)]
pub struct InputSpec {
    pub declaration: String,
    pub properties: Value,
    pub validator: Option<Arc<dyn ExtendedValidator>>,
}

impl InputSpec {
    /// Declare an input such as `count?: numeric[]`.
    pub fn new(declaration: impl Into<String>) -> Self {
        Self {
            declaration: declaration.into(),
            properties: Value::Null,
            validator: None,
        }
    }

    /// Instance properties, as a JSON object.
    #[must_use]
    pub fn with_properties(mut self, properties: Value) -> Self {
        self.properties = properties;
        self
    }

    /// Extra per-element check.
    #[must_use]
    pub fn with_validator(mut self, validator: Arc<dyn ExtendedValidator>) -> Self {
        self.validator = Some(validator);
        self
    }
}

impl std::fmt::Debug for InputSpec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InputSpec")
            .field("declaration", &self.declaration)
            .field("properties", &self.properties)
            .field("validator", &self.validator.is_some())
            .finish()
    }
}

/// A unit of business logic runnable from any transport.
///
/// The engine creates the declared inputs, fills and validates them, makes
/// them read-only and then calls [`execute`](Self::execute) with a snapshot
/// of their values. [`finalize`](Self::finalize) sees every outcome and its
/// result is what the caller gets.
#[async_trait]
pub trait Action: Send + Sync + 'static {
    /// Name the action is registered under, if any.
    fn name(&self) -> Option<&str> {
        None
    }

    /// Concrete type name, used in signatures of unregistered actions.
    fn type_name(&self) -> &'static str {
        std::any::type_name::<Self>()
    }

    /// Inputs this action takes, in order.
    fn inputs(&self) -> Vec<InputSpec> {
        Vec::new()
    }

    /// Seed the action's options document.
    fn configure(&self, _metadata: &mut Metadata) -> ActionResult<()> {
        Ok(())
    }

    /// Whether results may be served from the session result cache.
    fn is_cacheable(&self) -> bool {
        false
    }

    /// Business logic.
    async fn execute(&self, ctx: &ActionContext) -> ActionResult<Value>;

    /// Post-process the outcome. The default passes it through.
    async fn finalize(
        &self,
        _ctx: &ActionContext,
        outcome: ActionResult<Value>,
    ) -> ActionResult<Value> {
        outcome
    }
}
