//! The action execution engine.
//!
//! An [`ActionHandle`] owns one action instance together with its inputs,
//! options and session, and drives a run:
//!
//! 1. autofill empty inputs from the session;
//! 2. for cacheable actions, serve a cached result for the same signature;
//! 3. make every input read-only, validate all of them concurrently and run
//!    the business logic, restoring the previous read-only flags afterwards
//!    whatever happens;
//! 4. hand the outcome to the action's `finalize`, whose result is final;
//! 5. on success publish autofill values and cache the result.

use std::sync::Arc;

use futures::future::{join_all, try_join_all};
use indexmap::IndexMap;
use serde_json::Value;
use tessera_input::Input;
use tessera_metadata::Metadata;

use crate::action::Action;
use crate::context::ActionContext;
use crate::error::{ActionError, ActionErrorKind, ActionResult, Origin};
use crate::io::Reader;
use crate::runtime::ActionRuntime;
use crate::session::Session;
use crate::signature;

/// Restores the read-only flags recorded at construction when dropped.
struct ReadOnlyGuard {
    saved: Vec<(Arc<Input>, bool)>,
}

impl ReadOnlyGuard {
    fn engage<'a>(inputs: impl Iterator<Item = &'a Arc<Input>>) -> Self {
        let saved = inputs
            .map(|input| {
                let was = input.is_read_only();
                input.set_read_only(true);
                (Arc::clone(input), was)
            })
            .collect();
        Self { saved }
    }
}

impl Drop for ReadOnlyGuard {
    fn drop(&mut self) {
        for (input, was) in &self.saved {
            input.set_read_only(*was);
        }
    }
}

/// One action instance ready to run.
pub struct ActionHandle {
    runtime: Arc<ActionRuntime>,
    action: Arc<dyn Action>,
    registered_name: Option<String>,
    inputs: IndexMap<String, Arc<Input>>,
    metadata: Metadata,
    session: Session,
    origin: Origin,
}

impl ActionHandle {
    pub(crate) fn build(
        runtime: Arc<ActionRuntime>,
        action: Arc<dyn Action>,
        registered_name: Option<String>,
        session: Session,
        origin: Origin,
    ) -> ActionResult<Self> {
        let mut metadata = Metadata::new(Arc::clone(runtime.variables()));
        action.configure(&mut metadata)?;

        let mut inputs = IndexMap::new();
        for spec in action.inputs() {
            let input = runtime
                .inputs()
                .create(&spec.declaration, spec.properties, spec.validator)?;
            let name = input.name().to_string();
            if inputs.contains_key(&name) {
                return Err(ActionError::new(
                    ActionErrorKind::Input,
                    format!("input `{name}` is declared twice"),
                ));
            }
            inputs.insert(name, input);
        }

        Ok(Self {
            runtime,
            action,
            registered_name,
            inputs,
            metadata,
            session,
            origin,
        })
    }

    /// Registered name, if the action has one.
    pub fn name(&self) -> Option<&str> {
        self.registered_name
            .as_deref()
            .or_else(|| self.action.name())
    }

    /// Registered name, or a marker derived from the concrete type.
    pub fn label(&self) -> String {
        self.name().map_or_else(
            || signature::unregistered_marker(self.action.type_name()),
            str::to_string,
        )
    }

    pub fn action(&self) -> &Arc<dyn Action> {
        &self.action
    }

    pub fn origin(&self) -> Origin {
        self.origin
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn metadata(&self) -> &Metadata {
        &self.metadata
    }

    pub fn metadata_mut(&mut self) -> &mut Metadata {
        &mut self.metadata
    }

    pub fn inputs(&self) -> &IndexMap<String, Arc<Input>> {
        &self.inputs
    }

    pub fn input(&self, name: &str) -> Option<&Arc<Input>> {
        self.inputs.get(name)
    }

    /// Assign an input value by name.
    pub fn set_value(&self, name: &str, value: Value) -> ActionResult<()> {
        let input = self.inputs.get(name).ok_or_else(|| {
            ActionError::new(ActionErrorKind::Input, format!("no input named `{name}`"))
        })?;
        input.set_value(value)?;
        Ok(())
    }

    /// Inputs a transport should expose: serializable and not hidden.
    pub fn visible_inputs(&self) -> Vec<Arc<Input>> {
        self.inputs
            .values()
            .filter(|input| input.is_serializable() && !input.is_hidden())
            .cloned()
            .collect()
    }

    /// Signature over the action name and every input's serialized value.
    ///
    /// Recomputed on each call. Fails when an input does not validate.
    pub async fn id(&self) -> ActionResult<String> {
        let serialized = try_join_all(self.inputs.values().map(|input| input.serialize_value()))
            .await?;
        let payload = signature::payload(
            &self.label(),
            self.inputs.keys().map(String::as_str).zip(serialized),
        );
        Ok(self.runtime.hasher().digest(payload.as_bytes()))
    }

    /// Build a registered action as a nested call of this one.
    pub fn create_action(&self, name: &str) -> ActionResult<Self> {
        self.runtime
            .create_nested(name, self.session.clone_scoped())
    }

    /// Ask `reader` for raw values of the visible inputs and decode them.
    pub async fn fetch_inputs(&self, reader: &dyn Reader) -> ActionResult<()> {
        let visible = self.visible_inputs();
        let raw = reader.read(self, &visible).await?;

        for (name, value) in raw {
            let Some(input) = visible.iter().find(|input| input.name() == name) else {
                tracing::debug!(action = %self.label(), input = %name, "ignoring value for unknown input");
                continue;
            };
            let serialized = value.into_serialized(input)?;
            input.parse_value(&serialized, true)?;
        }
        Ok(())
    }

    /// Run the action.
    ///
    /// With `use_cache`, cacheable actions look their signature up in the
    /// session result cache first and store successful results there.
    pub async fn run(&self, use_cache: bool) -> ActionResult<Value> {
        let label = self.label();
        tracing::debug!(action = %label, origin = %self.origin, "running action");

        self.run_frame(&label, use_cache).await.map_err(|err| {
            tracing::debug!(action = %label, error = %err, "action failed");
            err.enrich(&label, self.origin)
        })
    }

    async fn run_frame(&self, label: &str, use_cache: bool) -> ActionResult<Value> {
        self.apply_autofill()?;

        let signature = if use_cache && self.action.is_cacheable() {
            match self.id().await {
                Ok(signature) => Some(signature),
                Err(err) => {
                    tracing::trace!(action = %label, error = %err, "no signature, bypassing cache");
                    None
                }
            }
        } else {
            None
        };

        if let Some(signature) = &signature
            && let Some(hit) = self.session.cache().get(signature)
        {
            tracing::trace!(action = %label, %signature, "result cache hit");
            return Ok(hit);
        }

        let ctx = ActionContext::new(label, Arc::clone(&self.runtime), self.session.clone())
            .with_inputs(self.inputs.clone())
            .with_metadata(self.metadata.clone());

        let outcome = self.evaluate(&ctx).await;
        let result = self.action.finalize(&ctx, outcome).await;

        if let Ok(value) = &result {
            self.publish_autofill();
            if let Some(signature) = signature {
                self.session.cache().insert(signature, value.clone());
            }
        }
        result
    }

    async fn evaluate(&self, ctx: &ActionContext) -> ActionResult<Value> {
        let _read_only = ReadOnlyGuard::engage(self.inputs.values());

        for result in join_all(self.inputs.values().map(|input| input.validate())).await {
            result?;
        }
        self.action.execute(ctx).await
    }

    fn apply_autofill(&self) -> ActionResult<()> {
        for input in self.inputs.values() {
            let Some(key) = input.autofill_key() else {
                continue;
            };
            if !input.is_empty() {
                continue;
            }
            if let Some(value) = self.session.autofill(&key) {
                tracing::trace!(input = %input.name(), key = %key, "autofilled input");
                input.set_value(value)?;
            }
        }
        Ok(())
    }

    fn publish_autofill(&self) {
        for input in self.inputs.values() {
            if let Some(key) = input.autofill_key()
                && !input.is_empty()
            {
                self.session.set_autofill(key, input.value());
            }
        }
    }
}

impl std::fmt::Debug for ActionHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ActionHandle")
            .field("label", &self.label())
            .field("origin", &self.origin)
            .field("inputs", &self.inputs.keys().collect::<Vec<_>>())
            .finish_non_exhaustive()
    }
}
