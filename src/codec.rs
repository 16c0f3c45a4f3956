//! Pure conversions between a typed message and the two wire forms.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::ProtoError;

/// A schema-driven message: serde-codable, structurally comparable and
/// hashable, default-constructible for freshly created wrappers.
pub trait Message: Serialize + DeserializeOwned + PartialEq + Hash + Default {}

impl<T> Message for T where T: Serialize + DeserializeOwned + PartialEq + Hash + Default {}

/// Encode a message to its compact binary form.
///
/// The encoding is positional: field names are not written, so persisted
/// binary survives schema field renames.
pub fn encode_binary<T: Message>(message: &T) -> Result<Vec<u8>, ProtoError> {
    bincode::serialize(message).map_err(|e| ProtoError::BinaryEncode(format!("{}", e)))
}

/// Decode the binary form back into a message. Fails on malformed or
/// truncated input.
pub fn decode_binary<T: Message>(bytes: &[u8]) -> Result<T, ProtoError> {
    bincode::deserialize(bytes).map_err(|e| ProtoError::BinaryDecode(format!("{}", e)))
}

/// Encode a message to its human-readable text form.
///
/// Field-name-dependent: renaming a schema field breaks text decode of
/// previously persisted assets. Accepted trade-off for diffable assets.
pub fn encode_text<T: Message>(message: &T) -> Result<String, ProtoError> {
    serde_json::to_string(message).map_err(|e| ProtoError::TextEncode(format!("{}", e)))
}

/// Decode the text form back into a message.
pub fn decode_text<T: Message>(text: &str) -> Result<T, ProtoError> {
    serde_json::from_str(text).map_err(|e| ProtoError::TextDecode(format!("{}", e)))
}

/// Structural hash used for change detection.
///
/// Fixed-key hasher, so structurally equal messages always hash equal
/// within a build. Not a cryptographic digest; a collision only costs one
/// skipped re-encode.
pub fn structural_hash<T: Message>(message: &T) -> u64 {
    let mut hasher = DefaultHasher::new();
    message.hash(&mut hasher);
    hasher.finish()
}
