//! # Tessera Input
//!
//! Typed, validated values for actions.
//!
//! An [`Input`] holds one named value of a registered type. Types form a
//! hierarchy: each declares its parent and inherits property defaults through
//! the [`PropertyRegistry`]. Inputs are declared with a compact grammar and
//! created through an [`InputRegistry`]:
//!
//! ```rust
//! use serde_json::json;
//! use tessera_input::InputRegistry;
//!
//! # futures::executor::block_on(async {
//! let registry = InputRegistry::with_builtin_types();
//! let count = registry.create("count: numeric[]", json!({"min": 0, "max": 10}), None)?;
//!
//! count.parse_value("[1,5,9]", true)?;
//! count.validate().await?;
//! assert_eq!(count.serialize_value().await?, "[1,5,9]");
//! # Ok::<(), tessera_input::InputError>(())
//! # }).unwrap();
//! ```
//!
//! Validation runs per element, concurrently for vectors, and reports the
//! first failing element as a [`ValidationError`] with its index.

#![forbid(unsafe_code)]

pub mod declaration;
pub mod error;
pub mod input;
pub mod kind;
pub mod property;
pub mod registry;
pub mod types;

pub use declaration::{Declaration, RESERVED_NAMES};
pub use error::{InputError, InputResult, ValidationError, codes};
pub use input::{CacheEntry, CacheKey, Input, props};
pub use kind::{BASE_TYPE, ExtendedValidator, FnValidator, InputKind, validator_fn};
pub use property::{PropertyMap, PropertyRegistry};
pub use registry::InputRegistry;
