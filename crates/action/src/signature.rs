//! Content-addressable action signatures.
//!
//! The payload is a JSON array of the action's registered name (or a marker
//! derived from its type), the number of inputs, and one `[name, serialized]`
//! pair per input. JSON string escaping keeps distinct inputs from producing
//! the same payload. Only the digest algorithm is pluggable.

use std::fmt;
use std::sync::Arc;

use serde_json::{Value, json};
use sha2::{Digest, Sha256};

/// Digest strategy for action signatures.
pub trait SignatureHasher: Send + Sync + fmt::Debug {
    /// Short algorithm name, used in logs.
    fn algorithm(&self) -> &'static str;

    /// Lowercase hex digest of `payload`.
    fn digest(&self, payload: &[u8]) -> String;
}

/// BLAKE3 signatures.
#[cfg(feature = "fast-hash")]
#[derive(Debug, Clone, Copy, Default)]
pub struct Blake3Hasher;

#[cfg(feature = "fast-hash")]
impl SignatureHasher for Blake3Hasher {
    fn algorithm(&self) -> &'static str {
        "blake3"
    }

    fn digest(&self, payload: &[u8]) -> String {
        blake3::hash(payload).to_hex().to_string()
    }
}

/// SHA-256 signatures.
#[derive(Debug, Clone, Copy, Default)]
pub struct Sha256Hasher;

impl SignatureHasher for Sha256Hasher {
    fn algorithm(&self) -> &'static str {
        "sha256"
    }

    fn digest(&self, payload: &[u8]) -> String {
        hex::encode(Sha256::digest(payload).as_slice())
    }
}

/// BLAKE3 with the `fast-hash` feature, SHA-256 otherwise.
#[must_use]
pub fn default_hasher() -> Arc<dyn SignatureHasher> {
    #[cfg(feature = "fast-hash")]
    {
        Arc::new(Blake3Hasher)
    }
    #[cfg(not(feature = "fast-hash"))]
    {
        Arc::new(Sha256Hasher)
    }
}

/// Marker used in place of a registered name.
pub(crate) fn unregistered_marker(type_name: &str) -> String {
    format!("unregistered:{type_name}")
}

/// Build the signature payload.
pub(crate) fn payload<'a>(
    name: &str,
    inputs: impl ExactSizeIterator<Item = (&'a str, String)>,
) -> String {
    let count = inputs.len();
    let pairs: Vec<Value> = inputs
        .map(|(input, serialized)| json!([input, serialized]))
        .collect();
    json!([name, count, pairs]).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn payload_lists_name_count_and_inputs() {
        let lines = vec![("a", "1".to_string()), ("b", "[1,2]".to_string())];
        assert_eq!(
            payload("sum", lines.into_iter()),
            r#"["sum",2,[["a","1"],["b","[1,2]"]]]"#
        );
    }

    #[test]
    fn separators_inside_values_do_not_collide() {
        let first = vec![("a", "1\nb: 2".to_string()), ("b", String::new())];
        let second = vec![("a", "1".to_string()), ("b", "2\nb: ".to_string())];
        assert_ne!(
            payload("two", first.into_iter()),
            payload("two", second.into_iter())
        );
    }

    #[test]
    fn sha256_matches_known_digest() {
        assert_eq!(
            Sha256Hasher.digest(b"abc"),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    #[cfg(feature = "fast-hash")]
    #[test]
    fn default_is_blake3_with_fast_hash() {
        let hasher = default_hasher();
        assert_eq!(hasher.algorithm(), "blake3");
        assert_eq!(hasher.digest(b"abc").len(), 64);
        assert_ne!(hasher.digest(b"abc"), Sha256Hasher.digest(b"abc"));
    }
}
