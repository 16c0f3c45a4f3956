//! The generic wrapper and its save/load reconciliation.

use serde::{Deserialize, Serialize};

use crate::codec::{self, Message};
use crate::envelope::Envelope;
use crate::error::ProtoError;
use crate::mode::{EncodingMode, WireForm};

/// Typed message wrapper persisted through a dual-form [`Envelope`].
///
/// The host owns the lifecycle: it calls [`Proto::before_serialize`] from
/// its own save path and [`Proto::after_deserialize`] after reconstructing
/// the owning object from persisted data. Neither transition runs
/// implicitly.
///
/// The envelope is synchronized lazily. Mutating the value sets no flag;
/// the next save transition detects the change by structural hash and
/// re-encodes then. Hosts save far more often than values change (every
/// inspector repaint), so the hash gate keeps a clean save at O(hash)
/// instead of O(encode).
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Proto<T: Message> {
    #[serde(skip)]
    value: T,
    /// Owner name used in decode-failure logs. Not persisted.
    #[serde(skip)]
    label: String,
    #[serde(default)]
    mode: EncodingMode,
    #[serde(flatten)]
    envelope: Envelope,
}

impl<T: Message> Default for Proto<T> {
    fn default() -> Self {
        Proto::new(T::default())
    }
}

impl<T: Message> Proto<T> {
    /// Wrap a value with an empty envelope and the default mode.
    pub fn new(value: T) -> Self {
        Proto::with_mode(value, EncodingMode::default())
    }

    /// Wrap a value with an explicit encoding mode.
    pub fn with_mode(value: T, mode: EncodingMode) -> Self {
        Proto {
            value,
            label: String::new(),
            mode,
            envelope: Envelope::default(),
        }
    }

    /// The current decoded value.
    pub fn value(&self) -> &T {
        &self.value
    }

    /// Mutable access to the decoded value. Changes are picked up by the
    /// next save transition through the structural hash.
    pub fn value_mut(&mut self) -> &mut T {
        &mut self.value
    }

    pub fn set_value(&mut self, value: T) {
        self.value = value;
    }

    pub fn into_value(self) -> T {
        self.value
    }

    pub fn mode(&self) -> EncodingMode {
        self.mode
    }

    /// Takes effect at the next save transition; no immediate re-encode.
    pub fn set_mode(&mut self, mode: EncodingMode) {
        self.mode = mode;
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    /// Name the owning object for decode-failure diagnostics.
    pub fn set_label(&mut self, label: impl Into<String>) {
        self.label = label.into();
    }

    pub fn envelope(&self) -> &Envelope {
        &self.envelope
    }

    /// Direct envelope access for host persistence glue that stores the
    /// fields out-of-band.
    pub fn envelope_mut(&mut self) -> &mut Envelope {
        &mut self.envelope
    }

    fn owner(&self) -> &str {
        if self.label.is_empty() {
            std::any::type_name::<T>()
        } else {
            &self.label
        }
    }

    /// Synchronize-on-write. Call from the owner's save path, before the
    /// host persists the envelope fields.
    ///
    /// A pending legacy payload is migrated first and forces a re-encode.
    /// Otherwise, when the structural hash still matches the envelope, the
    /// forms are already consistent and nothing is re-encoded.
    pub fn before_serialize(&mut self) -> Result<(), ProtoError> {
        let migrated = self.envelope.migrate_legacy();

        let current = codec::structural_hash(&self.value);
        if !migrated && current == self.envelope.last_known_hash {
            return Ok(());
        }

        // Encode into temporaries first so an encode failure leaves the
        // persisted forms untouched (legacy migration excepted, which is
        // one-way by contract).
        let binary = if self.mode.writes_binary() {
            Some(codec::encode_binary(&self.value)?)
        } else {
            None
        };
        let text = if self.mode.writes_text() {
            Some(codec::encode_text(&self.value)?)
        } else {
            None
        };

        match binary {
            Some(bytes) => self.envelope.set_binary(&bytes),
            None => self.envelope.binary_form.clear(),
        }
        match text {
            Some(text) => self.envelope.text_form = text,
            None => self.envelope.text_form.clear(),
        }
        self.envelope.last_known_hash = current;
        Ok(())
    }

    /// Reconcile-on-read. Call after the host has repopulated the envelope
    /// fields from persisted data.
    ///
    /// A single present form is decoded regardless of mode, so assets
    /// survive a later mode change without data loss. With both forms
    /// present, the mode-preferred form is decoded; under a fallback mode a
    /// primary failure is logged and the other form is tried. If no form
    /// decodes, the error propagates and the value is never silently
    /// replaced with a default.
    pub fn after_deserialize(&mut self) -> Result<(), ProtoError> {
        if self.envelope.migrate_legacy() {
            tracing::debug!(owner = self.owner(), "migrated legacy binary payload");
        }

        match (self.envelope.has_binary(), self.envelope.has_text()) {
            // Nothing was ever persisted; keep the constructed value and
            // leave the hash alone so the first save still encodes.
            (false, false) => return Ok(()),
            (true, false) => self.value = self.decode_single(WireForm::Binary)?,
            (false, true) => self.value = self.decode_single(WireForm::Text)?,
            (true, true) => self.value = self.decode_preferred()?,
        }

        self.envelope.last_known_hash = codec::structural_hash(&self.value);
        Ok(())
    }

    /// Decode when only one form is present. Failure is fatal: there is
    /// nothing to fall back to.
    fn decode_single(&self, form: WireForm) -> Result<T, ProtoError> {
        self.decode_form(form).map_err(|e| {
            tracing::error!(
                owner = self.owner(),
                form = %form,
                error = %e,
                "decode failed with no other form present"
            );
            e
        })
    }

    /// Decode when both forms are present: preferred first, then the
    /// mode's fallback if it has one.
    fn decode_preferred(&self) -> Result<T, ProtoError> {
        let preferred = self.mode.preferred();
        let primary_err = match self.decode_form(preferred) {
            Ok(value) => return Ok(value),
            Err(e) => e,
        };

        let Some(fallback) = self.mode.fallback() else {
            tracing::error!(
                owner = self.owner(),
                form = %preferred,
                error = %primary_err,
                "decode failed and mode permits no fallback"
            );
            return Err(primary_err);
        };

        tracing::warn!(
            owner = self.owner(),
            form = %preferred,
            error = %primary_err,
            "decode failed, trying {} form", fallback
        );
        self.decode_form(fallback).map_err(|fallback_err| {
            tracing::error!(
                owner = self.owner(),
                form = %fallback,
                error = %fallback_err,
                "fallback decode failed; both persisted forms are unreadable"
            );
            fallback_err
        })
    }

    fn decode_form(&self, form: WireForm) -> Result<T, ProtoError> {
        match form {
            WireForm::Binary => codec::decode_binary(&self.envelope.binary()?),
            WireForm::Text => codec::decode_text(&self.envelope.text_form),
        }
    }
}

/// Type-erased access for host code that handles heterogeneous wrappers
/// (one inspector over many message types). The decoded value crosses the
/// boundary as a JSON tree.
pub trait DynProto {
    fn encoding_mode(&self) -> EncodingMode;

    fn set_encoding_mode(&mut self, mode: EncodingMode);

    /// The decoded value as a JSON tree.
    fn value_json(&self) -> Result<serde_json::Value, ProtoError>;

    /// Replace the decoded value from a JSON tree.
    fn set_value_json(&mut self, value: serde_json::Value) -> Result<(), ProtoError>;

    fn before_serialize(&mut self) -> Result<(), ProtoError>;

    fn after_deserialize(&mut self) -> Result<(), ProtoError>;
}

impl<T: Message> DynProto for Proto<T> {
    fn encoding_mode(&self) -> EncodingMode {
        self.mode()
    }

    fn set_encoding_mode(&mut self, mode: EncodingMode) {
        self.set_mode(mode);
    }

    fn value_json(&self) -> Result<serde_json::Value, ProtoError> {
        Ok(serde_json::to_value(&self.value)?)
    }

    fn set_value_json(&mut self, value: serde_json::Value) -> Result<(), ProtoError> {
        self.value = serde_json::from_value(value)?;
        Ok(())
    }

    fn before_serialize(&mut self) -> Result<(), ProtoError> {
        Proto::before_serialize(self)
    }

    fn after_deserialize(&mut self) -> Result<(), ProtoError> {
        Proto::after_deserialize(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, Clone, PartialEq, Hash, Default, Serialize, Deserialize)]
    struct SpawnConfig {
        name: String,
        count: u32,
    }

    fn sample() -> SpawnConfig {
        SpawnConfig {
            name: "Alpha".to_string(),
            count: 3,
        }
    }

    #[test]
    fn save_populates_both_forms_under_fallback_mode() {
        let mut proto = Proto::new(sample());
        proto.before_serialize().unwrap();
        assert!(proto.envelope().has_binary());
        assert!(proto.envelope().has_text());
        assert_eq!(
            proto.envelope().last_known_hash,
            codec::structural_hash(&sample())
        );
    }

    #[test]
    fn strict_modes_clear_the_other_form() {
        let mut proto = Proto::with_mode(sample(), EncodingMode::Binary);
        proto.before_serialize().unwrap();
        assert!(proto.envelope().has_binary());
        assert!(!proto.envelope().has_text());

        proto.set_mode(EncodingMode::Text);
        proto.value_mut().count = 4;
        proto.before_serialize().unwrap();
        assert!(!proto.envelope().has_binary());
        assert!(proto.envelope().has_text());
    }

    #[test]
    fn clean_save_short_circuits() {
        let mut proto = Proto::new(sample());
        proto.before_serialize().unwrap();

        // Tamper with a form directly; a second clean save must not
        // rewrite it, because the hash gate skips re-encoding.
        proto.envelope_mut().text_form = "tampered".to_string();
        proto.before_serialize().unwrap();
        assert_eq!(proto.envelope().text_form, "tampered");

        // A value change makes the save dirty again.
        proto.value_mut().count = 4;
        proto.before_serialize().unwrap();
        assert_ne!(proto.envelope().text_form, "tampered");
    }

    #[test]
    fn mode_change_alone_does_not_rewrite_forms() {
        let mut proto = Proto::with_mode(sample(), EncodingMode::Binary);
        proto.before_serialize().unwrap();
        proto.set_mode(EncodingMode::Text);
        proto.before_serialize().unwrap();
        // Hash unchanged, so the binary-only layout stays as persisted.
        assert!(proto.envelope().has_binary());
        assert!(!proto.envelope().has_text());
    }

    #[test]
    fn legacy_payload_forces_reencode_on_save() {
        let mut proto = Proto::new(sample());
        proto.before_serialize().unwrap();
        let synced = proto.envelope().clone();

        // Same value, but a pending legacy payload: the hash gate must not
        // short-circuit past the migration.
        proto.envelope_mut().legacy_binary_form = vec![1, 2, 3];
        proto.before_serialize().unwrap();
        assert!(!proto.envelope().has_legacy());
        assert_eq!(proto.envelope(), &synced);
    }

    #[test]
    fn load_with_empty_envelope_keeps_value() {
        let mut proto = Proto::new(sample());
        proto.after_deserialize().unwrap();
        assert_eq!(proto.value(), &sample());
        assert_eq!(proto.envelope().last_known_hash, 0);
    }

    #[test]
    fn load_sets_hash_to_decoded_value() {
        let mut proto = Proto::new(sample());
        proto.before_serialize().unwrap();

        let mut reloaded: Proto<SpawnConfig> = Proto::default();
        *reloaded.envelope_mut() = proto.envelope().clone();
        reloaded.after_deserialize().unwrap();
        assert_eq!(reloaded.value(), &sample());
        assert_eq!(
            reloaded.envelope().last_known_hash,
            codec::structural_hash(&sample())
        );
    }

    #[test]
    fn dyn_proto_round_trips_json_value() {
        let mut proto = Proto::new(sample());
        let erased: &mut dyn DynProto = &mut proto;

        let json = erased.value_json().unwrap();
        assert_eq!(json["name"], "Alpha");

        erased
            .set_value_json(serde_json::json!({"name": "Beta", "count": 5}))
            .unwrap();
        assert_eq!(erased.encoding_mode(), EncodingMode::BinaryWithFallback);
        assert_eq!(proto.value().name, "Beta");
        assert_eq!(proto.value().count, 5);
    }

    #[test]
    fn dyn_proto_rejects_mismatched_json() {
        let mut proto = Proto::new(sample());
        let before = proto.value().clone();
        let err = proto
            .set_value_json(serde_json::json!({"name": 1, "count": "x"}))
            .unwrap_err();
        assert!(matches!(err, ProtoError::Json(_)));
        assert_eq!(proto.value(), &before);
    }
}
