use thiserror::Error;

#[derive(Debug, Error)]
pub enum ProtoError {
    #[error("binary encode error: {0}")]
    BinaryEncode(String),

    #[error("binary decode error: {0}")]
    BinaryDecode(String),

    #[error("text encode error: {0}")]
    TextEncode(String),

    #[error("text decode error: {0}")]
    TextDecode(String),

    #[error("binary form is not valid base64: {0}")]
    Base64(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl ProtoError {
    /// Whether this error came from decoding a persisted form (as opposed
    /// to encoding an in-memory message).
    pub fn is_decode(&self) -> bool {
        matches!(
            self,
            ProtoError::BinaryDecode(_) | ProtoError::TextDecode(_) | ProtoError::Base64(_)
        )
    }
}
