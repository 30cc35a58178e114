//! Named action factories.

use std::sync::Arc;

use dashmap::DashMap;

use crate::action::Action;

/// Builds a fresh action instance.
pub type ActionFactory = Arc<dyn Fn() -> Arc<dyn Action> + Send + Sync>;

/// Thread-safe registry of action factories keyed by name.
///
/// Every lookup builds a new instance, so actions never share per-call state.
///
/// # Examples
///
/// ```rust
/// use std::sync::Arc;
/// use async_trait::async_trait;
/// use serde_json::{Value, json};
/// use tessera_action::{Action, ActionContext, ActionRegistry, ActionResult};
///
/// struct Ping;
///
/// #[async_trait]
/// impl Action for Ping {
///     fn name(&self) -> Option<&str> { Some("ping") }
///     async fn execute(&self, _ctx: &ActionContext) -> ActionResult<Value> {
///         Ok(json!("pong"))
///     }
/// }
///
/// let registry = ActionRegistry::new();
/// registry.register_fn("ping", || Ping);
/// assert!(registry.contains("ping"));
/// assert!(registry.create("unknown").is_none());
/// ```
#[derive(Default)]
pub struct ActionRegistry {
    factories: DashMap<String, ActionFactory>,
}

impl ActionRegistry {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a factory. Replaces any factory under the same name.
    pub fn register(&self, name: impl Into<String>, factory: ActionFactory) {
        let name = name.into();
        tracing::info!(action = %name, "registered action");
        self.factories.insert(name, factory);
    }

    /// Register a closure producing a concrete action.
    pub fn register_fn<A, F>(&self, name: impl Into<String>, factory: F)
    where
        A: Action,
        F: Fn() -> A + Send + Sync + 'static,
    {
        self.register(name, Arc::new(move || Arc::new(factory()) as Arc<dyn Action>));
    }

    /// Build a new instance of the action registered under `name`.
    pub fn create(&self, name: &str) -> Option<Arc<dyn Action>> {
        self.factories.get(name).map(|factory| (factory.value())())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.factories.contains_key(name)
    }

    /// Remove a factory. Returns whether one was registered.
    pub fn unregister(&self, name: &str) -> bool {
        self.factories.remove(name).is_some()
    }

    /// Registered names, sorted.
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .factories
            .iter()
            .map(|entry| entry.key().clone())
            .collect();
        names.sort();
        names
    }

    pub fn len(&self) -> usize {
        self.factories.len()
    }

    pub fn is_empty(&self) -> bool {
        self.factories.is_empty()
    }
}

impl std::fmt::Debug for ActionRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ActionRegistry")
            .field("names", &self.names())
            .finish()
    }
}
