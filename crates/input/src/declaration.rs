//! Parsing of `name[?]: type[[]]` input declarations.

use std::sync::LazyLock;

use regex::Regex;

use crate::error::{InputError, InputResult};

/// Names that can never be used for an input.
pub const RESERVED_NAMES: &[&str] = &["help"];

static DECLARATION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*([^\s:?]+)\s*(\?)?\s*:\s*([A-Za-z_][\w.-]*)\s*(\[\])?\s*$")
        .expect("static declaration pattern")
});

static NAME: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[\w.-]+$").expect("static input name pattern"));

/// A parsed input declaration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Declaration {
    pub name: String,
    pub type_name: String,
    pub required: bool,
    pub vector: bool,
}

impl Declaration {
    /// Parse `name: type`, `name?: type`, `name: type[]` or `name?: type[]`.
    pub fn parse(declaration: &str) -> InputResult<Self> {
        let captures =
            DECLARATION
                .captures(declaration)
                .ok_or_else(|| InputError::InvalidDeclaration {
                    declaration: declaration.to_string(),
                    reason: "expected `name[?]: type[[]]`".to_string(),
                })?;

        let name = captures[1].to_string();
        validate_name(&name)?;

        Ok(Self {
            name,
            type_name: captures[3].to_string(),
            required: captures.get(2).is_none(),
            vector: captures.get(4).is_some(),
        })
    }
}

/// Check an input name against the identifier grammar and reserved words.
pub fn validate_name(name: &str) -> InputResult<()> {
    if !NAME.is_match(name) {
        return Err(InputError::InvalidName {
            name: name.to_string(),
        });
    }
    if RESERVED_NAMES.contains(&name) {
        return Err(InputError::ReservedName {
            name: name.to_string(),
        });
    }
    Ok(())
}
