//! Encoding policy: which wire form is written on save and trusted on load.

use std::fmt;

use serde::{Deserialize, Serialize};

/// One of the two persisted wire representations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WireForm {
    Binary,
    Text,
}

impl WireForm {
    /// The opposite form.
    pub fn other(self) -> WireForm {
        match self {
            WireForm::Binary => WireForm::Text,
            WireForm::Text => WireForm::Binary,
        }
    }
}

impl fmt::Display for WireForm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WireForm::Binary => f.write_str("binary"),
            WireForm::Text => f.write_str("text"),
        }
    }
}

/// Selects which wire form(s) are authoritative and the fallback order.
///
/// Text encoding keeps asset diffs readable in source control but depends on
/// schema field names, so a rename breaks text decode of existing assets.
/// Binary encoding is positional and survives renames but is opaque in
/// diffs. The fallback modes persist both forms so an asset survives a
/// schema change that breaks only one of them.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum EncodingMode {
    /// Binary only; the text form is cleared on save.
    Binary,
    /// Text only; the binary form is cleared on save.
    Text,
    /// Both forms written; binary trusted on load, text as fallback.
    #[default]
    BinaryWithFallback,
    /// Both forms written; text trusted on load, binary as fallback.
    TextWithFallback,
}

impl EncodingMode {
    /// Whether the save transition writes the binary form.
    pub fn writes_binary(self) -> bool {
        !matches!(self, EncodingMode::Text)
    }

    /// Whether the save transition writes the text form.
    pub fn writes_text(self) -> bool {
        !matches!(self, EncodingMode::Binary)
    }

    /// The form decoded first when both are present.
    pub fn preferred(self) -> WireForm {
        match self {
            EncodingMode::Binary | EncodingMode::BinaryWithFallback => WireForm::Binary,
            EncodingMode::Text | EncodingMode::TextWithFallback => WireForm::Text,
        }
    }

    /// The form tried after the preferred one fails to decode. `None` for
    /// the strict modes: a strict-mode decode failure is fatal.
    pub fn fallback(self) -> Option<WireForm> {
        match self {
            EncodingMode::BinaryWithFallback => Some(WireForm::Text),
            EncodingMode::TextWithFallback => Some(WireForm::Binary),
            EncodingMode::Binary | EncodingMode::Text => None,
        }
    }
}
