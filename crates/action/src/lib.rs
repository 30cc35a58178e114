//! # Tessera Action
//!
//! Runs typed actions independently of the transport that invoked them.
//!
//! - [`Action`]: declares inputs and options, holds the business logic.
//! - [`ActionHandle`]: one action instance with its inputs, options and
//!   session; drives autofill, caching, read-only validation, execution and
//!   finalization.
//! - [`ActionRuntime`]: input types, registered actions, metadata variables
//!   and the signature hasher every handle is built from.
//! - [`Session`]: per-call autofill values, the [`TaskQueue`] of wrap-up
//!   work and the LRU [`ResultCache`].
//! - [`Handler`]: pairs a transport [`Reader`] and [`Writer`].
//!
//! ```rust
//! use std::sync::Arc;
//! use async_trait::async_trait;
//! use serde_json::{Value, json};
//! use tessera_action::prelude::*;
//! use tessera_action::{ActionRegistry, ActionRuntime};
//! use tessera_input::InputRegistry;
//!
//! struct Sum;
//!
//! #[async_trait]
//! impl Action for Sum {
//!     fn inputs(&self) -> Vec<InputSpec> {
//!         vec![InputSpec::new("values: numeric[]")]
//!     }
//!
//!     async fn execute(&self, ctx: &ActionContext) -> ActionResult<Value> {
//!         let values = ctx.require("values")?.as_array().cloned().unwrap_or_default();
//!         Ok(json!(values.iter().filter_map(Value::as_i64).sum::<i64>()))
//!     }
//! }
//!
//! let actions = Arc::new(ActionRegistry::new());
//! actions.register_fn("sum", || Sum);
//! let runtime = Arc::new(ActionRuntime::new(
//!     Arc::new(InputRegistry::with_builtin_types()),
//!     actions,
//! ));
//!
//! # futures::executor::block_on(async {
//! let session = Session::new();
//! let sum = runtime.create("sum", session.clone())?;
//! sum.input("values").unwrap().parse_value("[1,2,3]", true)?;
//! assert_eq!(sum.run(true).await?, json!(6));
//! session.finalize().await.unwrap();
//! # Ok::<(), ActionError>(())
//! # }).unwrap();
//! ```

#![forbid(unsafe_code)]

pub mod action;
pub mod cache;
pub mod context;
pub mod error;
pub mod handle;
pub mod io;
pub mod prelude;
pub mod registry;
pub mod runtime;
pub mod session;
pub mod signature;
pub mod tasks;

pub use action::{Action, InputSpec};
pub use cache::{CacheConfig, CacheStats, ResultCache};
pub use context::ActionContext;
pub use error::{
    ActionError, ActionErrorKind, ActionResult, HandlerError, Origin, SessionError, TaskFailure,
    TaskQueueError,
};
pub use handle::ActionHandle;
pub use io::{Handler, RawValue, Reader, Writer};
pub use registry::{ActionFactory, ActionRegistry};
pub use runtime::ActionRuntime;
pub use session::Session;
#[cfg(feature = "fast-hash")]
pub use signature::Blake3Hasher;
pub use signature::{Sha256Hasher, SignatureHasher, default_hasher};
pub use tasks::{DeferredFn, QueuedTask, Task, TaskQueue};
