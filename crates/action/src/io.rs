//! Contracts for transport adapters.
//!
//! A transport supplies a [`Reader`] that turns its request into raw input
//! values and a [`Writer`] that renders the outcome. A [`Handler`] pairs the
//! two under a handler name; per-handler options live in each action's
//! metadata at `handler.<name>.readOptions` / `handler.<name>.writeOptions`.

use std::sync::Arc;

use async_trait::async_trait;
use indexmap::IndexMap;
use serde_json::Value;
use tessera_input::Input;
use tessera_metadata::OptionKind;

use crate::error::{ActionError, ActionErrorKind, ActionResult, HandlerError};
use crate::handle::ActionHandle;

/// A raw value as a transport received it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RawValue {
    /// One string, e.g. `--name=x` or a single query parameter.
    Single(String),
    /// A repeated value, e.g. `--tag a --tag b`.
    List(Vec<String>),
}

impl RawValue {
    /// The string handed to the input's decoder.
    ///
    /// Lists become a JSON array literal for vector inputs. A single value
    /// for a vector input is taken as an array literal when it looks like
    /// one and as a one-element list otherwise.
    pub fn into_serialized(self, input: &Input) -> ActionResult<String> {
        let vector = input.is_vector();
        let items = match self {
            Self::Single(raw) if !vector => return Ok(raw),
            Self::Single(raw) if raw.trim_start().starts_with('[') => return Ok(raw),
            Self::Single(raw) => vec![raw],
            Self::List(mut items) if !vector => {
                if items.len() != 1 {
                    return Err(ActionError::new(
                        ActionErrorKind::Input,
                        format!(
                            "input `{}` takes a single value, got {}",
                            input.name(),
                            items.len()
                        ),
                    ));
                }
                return Ok(items.remove(0));
            }
            Self::List(items) => items,
        };
        serde_json::to_string(&items)
            .map_err(|err| ActionError::new(ActionErrorKind::Input, err.to_string()))
    }
}

/// Source of raw input values.
#[async_trait]
pub trait Reader: Send + Sync {
    /// Raw values for `inputs`, keyed by input name. Absent inputs are
    /// omitted.
    async fn read(
        &self,
        action: &ActionHandle,
        inputs: &[Arc<Input>],
    ) -> ActionResult<IndexMap<String, RawValue>>;
}

/// Sink for action outcomes.
#[async_trait]
pub trait Writer: Send + Sync {
    async fn write(&self, action: &ActionHandle, outcome: ActionResult<Value>) -> ActionResult<()>;
}

/// A reader and writer under one handler name.
#[derive(Clone)]
pub struct Handler {
    name: String,
    reader: Arc<dyn Reader>,
    writer: Arc<dyn Writer>,
}

impl Handler {
    pub fn new(name: impl Into<String>, reader: Arc<dyn Reader>, writer: Arc<dyn Writer>) -> Self {
        Self {
            name: name.into(),
            reader,
            writer,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// This handler's options for `action`.
    pub fn options<'a>(
        &self,
        action: &'a ActionHandle,
        kind: OptionKind,
    ) -> ActionResult<Option<&'a Value>> {
        Ok(action.metadata().handler_options(&self.name, kind)?)
    }

    /// Read inputs, run the action and write the outcome.
    ///
    /// Failures that must not be rendered are returned as
    /// [`HandlerError::Unhandled`] without reaching the writer.
    pub async fn dispatch(&self, action: &ActionHandle) -> Result<(), HandlerError> {
        let outcome = match action.fetch_inputs(self.reader.as_ref()).await {
            Ok(()) => action.run(true).await,
            Err(err) => Err(err),
        };

        match outcome {
            Err(err) if !err.is_output_enabled() => {
                tracing::debug!(handler = %self.name, error = %err, "suppressing nested failure");
                Err(HandlerError::Unhandled(err))
            }
            outcome => self
                .writer
                .write(action, outcome)
                .await
                .map_err(HandlerError::Write),
        }
    }
}

impl std::fmt::Debug for Handler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Handler")
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}
