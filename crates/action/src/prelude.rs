//! Re-exports for action authors.
//!
//! ```rust
//! use tessera_action::prelude::*;
//! ```

pub use crate::action::{Action, InputSpec};
pub use crate::context::ActionContext;
pub use crate::error::{ActionError, ActionErrorKind, ActionResult};
pub use crate::handle::ActionHandle;
pub use crate::session::Session;

pub use tessera_input::{ValidationError, validator_fn};
pub use tessera_metadata::Metadata;
