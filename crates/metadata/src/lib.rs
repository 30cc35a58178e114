//! # Tessera Metadata
//!
//! Option documents attached to actions and handlers.
//!
//! - [`ConfigStore`]: nested JSON document with dotted-path insert/query and
//!   deep merge.
//! - [`VariableRegistry`]: `$alias` → path mapping with memoized, cycle-safe
//!   expansion.
//! - [`Metadata`]: a store whose paths may contain `$alias` segments.
//!
//! Handler options live under `handler.<name>.<readOptions|writeOptions>`,
//! reachable through the default `$cli*` / `$web*` aliases:
//!
//! ```rust
//! use tessera_metadata::Metadata;
//! use serde_json::json;
//!
//! let mut meta = Metadata::default();
//! meta.set("$webHeaders", json!({"Cache-Control": "no-store"}), true)?;
//! assert!(meta.has("handler.web.writeOptions.headers")?);
//! # Ok::<(), tessera_metadata::MetadataError>(())
//! ```

#![forbid(unsafe_code)]

pub mod error;
pub mod metadata;
pub mod store;
pub mod variables;

pub use error::{MetadataError, MetadataResult};
pub use metadata::{Metadata, OptionKind};
pub use store::ConfigStore;
pub use variables::{MAX_RESOLUTION_DEPTH, VARIABLE_SIGIL, VariableRegistry};
