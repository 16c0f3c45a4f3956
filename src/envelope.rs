//! The durable record holding both encoded forms and reconciliation
//! metadata for one message instance.

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use serde::{Deserialize, Serialize};

use crate::error::ProtoError;

/// Persisted envelope for one wrapped message.
///
/// Owns both wire forms plus the structural hash observed when they were
/// last synchronized. The binary form is stored as base64 so the host
/// serializer only ever sees strings. When the hash matches the in-memory
/// message, the populated forms are mutually consistent encodings of it.
///
/// `legacy_binary_form` predates the dual-form layout: readable forever,
/// migrated into `binary_form` on first read, never written again.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Envelope {
    /// Base64 of the compact binary encoding. Empty when absent.
    pub binary_form: String,
    /// Human-readable text encoding. Empty when absent.
    pub text_form: String,
    /// Structural hash of the message at the last synchronization.
    pub last_known_hash: u64,
    /// Deprecated single-form slot kept for one-time forward migration.
    #[serde(with = "serde_bytes", skip_serializing_if = "Vec::is_empty")]
    pub legacy_binary_form: Vec<u8>,
}

impl Envelope {
    pub fn has_binary(&self) -> bool {
        !self.binary_form.is_empty()
    }

    pub fn has_text(&self) -> bool {
        !self.text_form.is_empty()
    }

    pub fn has_legacy(&self) -> bool {
        !self.legacy_binary_form.is_empty()
    }

    /// Store raw binary bytes into the base64 slot.
    pub fn set_binary(&mut self, bytes: &[u8]) {
        self.binary_form = BASE64.encode(bytes);
    }

    /// Decode the base64 binary slot. A malformed slot is reported as a
    /// decode failure so the reconciliation machinery treats it like any
    /// other corrupted binary form.
    pub fn binary(&self) -> Result<Vec<u8>, ProtoError> {
        BASE64
            .decode(&self.binary_form)
            .map_err(|e| ProtoError::Base64(format!("{}", e)))
    }

    /// Move the legacy payload into the binary slot and clear it.
    ///
    /// One-way: never reversed, and not rolled back if a later step of the
    /// calling transition fails. Returns whether a migration happened.
    pub fn migrate_legacy(&mut self) -> bool {
        if self.legacy_binary_form.is_empty() {
            return false;
        }
        let legacy = std::mem::take(&mut self.legacy_binary_form);
        self.set_binary(&legacy);
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn binary_slot_round_trip() {
        let mut envelope = Envelope::default();
        envelope.set_binary(&[1, 2, 3, 250]);
        assert!(envelope.has_binary());
        assert_eq!(envelope.binary().unwrap(), vec![1, 2, 3, 250]);
    }

    #[test]
    fn malformed_base64_is_an_error() {
        let envelope = Envelope {
            binary_form: "%%%not base64%%%".to_string(),
            ..Default::default()
        };
        assert!(matches!(envelope.binary(), Err(ProtoError::Base64(_))));
    }

    #[test]
    fn empty_binary_slot_decodes_to_empty() {
        assert_eq!(Envelope::default().binary().unwrap(), Vec::<u8>::new());
    }

    #[test]
    fn migrate_legacy_moves_payload_into_binary_slot() {
        let mut envelope = Envelope {
            legacy_binary_form: vec![9, 8, 7],
            ..Default::default()
        };
        assert!(envelope.migrate_legacy());
        assert!(!envelope.has_legacy());
        assert_eq!(envelope.binary().unwrap(), vec![9, 8, 7]);
        // Second call is a no-op
        assert!(!envelope.migrate_legacy());
    }

    #[test]
    fn migrate_legacy_overwrites_stale_binary_form() {
        let mut envelope = Envelope {
            legacy_binary_form: vec![1, 1],
            ..Default::default()
        };
        envelope.set_binary(&[2, 2]);
        envelope.migrate_legacy();
        assert_eq!(envelope.binary().unwrap(), vec![1, 1]);
    }

    #[test]
    fn persisted_field_names() {
        let mut envelope = Envelope::default();
        envelope.set_binary(&[42]);
        envelope.text_form = "{}".to_string();
        envelope.last_known_hash = 7;

        let json: serde_json::Value = serde_json::to_value(&envelope).unwrap();
        let object = json.as_object().unwrap();
        assert!(object.contains_key("binaryForm"));
        assert!(object.contains_key("textForm"));
        assert!(object.contains_key("lastKnownHash"));
        // Cleared legacy slot is never written
        assert!(!object.contains_key("legacyBinaryForm"));
    }

    #[test]
    fn legacy_slot_stays_readable() {
        let json = r#"{
            "binaryForm": "",
            "textForm": "",
            "lastKnownHash": 0,
            "legacyBinaryForm": [5, 6, 7]
        }"#;
        let envelope: Envelope = serde_json::from_str(json).unwrap();
        assert_eq!(envelope.legacy_binary_form, vec![5, 6, 7]);
    }

    #[test]
    fn missing_fields_default() {
        let envelope: Envelope = serde_json::from_str("{}").unwrap();
        assert_eq!(envelope, Envelope::default());
    }
}
