//! Codec errors

use thiserror::Error;

use crate::BlobMsgType;

#[derive(Debug, Error)]
pub enum BlobError {
    #[error("Attribute truncated: need {needed} bytes, have {available}")]
    Truncated { needed: usize, available: usize },

    #[error("Attribute length {0} is shorter than its header")]
    BadLength(usize),

    #[error("Expected a named attribute")]
    NotExtended,

    #[error("Unknown attribute type {0}")]
    UnknownType(u8),

    #[error("Payload of {len} bytes is invalid for {kind:?}")]
    BadPayload { kind: BlobMsgType, len: usize },

    #[error("String is not NUL-terminated")]
    Unterminated,

    #[error("Invalid UTF-8 in attribute")]
    InvalidUtf8,

    #[error("Table member without a name")]
    UnnamedMember,

    #[error("Attribute exceeds the 16 MiB length limit")]
    TooLarge,

    #[error("Containers nested deeper than {0} levels")]
    TooDeep(usize),

    #[error("Top-level JSON value must be an object")]
    NotAnObject,

    #[error("Integer {0} does not fit in 64 bits")]
    IntegerOutOfRange(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type BlobResult<T> = Result<T, BlobError>;
