//! Dual-encoding persistence for schema-driven typed messages.
//!
//! A [`Proto<T>`] wraps a typed message and keeps a persisted [`Envelope`]
//! holding two wire forms: a compact binary encoding (base64 in the
//! envelope) and a human-readable text encoding. An [`EncodingMode`]
//! selects which form is written on save and trusted on load, with
//! optional fallback to the other form when the preferred one fails to
//! decode. The host drives both transitions explicitly from its own
//! save/load lifecycle; nothing here runs on implicit hooks.

pub mod codec;
pub mod envelope;
pub mod error;
pub mod fields;
pub mod mode;
pub mod proto;

pub use codec::{
    decode_binary, decode_text, encode_binary, encode_text, structural_hash, Message,
};
pub use envelope::Envelope;
pub use error::ProtoError;
pub use fields::{field_kind, register_kind, FieldKind, FieldRegistry, FieldStrategy};
pub use mode::{EncodingMode, WireForm};
pub use proto::{DynProto, Proto};
