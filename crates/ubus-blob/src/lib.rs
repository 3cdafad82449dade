//! Binary attribute codec for bus messages
//!
//! Attribute layout:
//! ```text
//! ┌─────────────────────────────┬──────────────────────────┬─────────┐
//! │ id_len (4B, big-endian u32) │ payload (len - 4 bytes)  │ padding │
//! │ bit 31: extended            │                          │ to 4B   │
//! │ bits 24..30: id / type      │                          │         │
//! │ bits 0..23: len incl. header│                          │         │
//! └─────────────────────────────┴──────────────────────────┴─────────┘
//! ```
//!
//! Extended ("blobmsg") attributes start their payload with a name header:
//! a big-endian `u16` name length, the name, a NUL byte, padding to 4 bytes.
//! Containers (the buffer head, tables, arrays) hold nested attributes.

mod attr;
mod buf;
mod error;
mod json;

pub use attr::*;
pub use buf::*;
pub use error::*;
pub use json::*;

/// Size of the `id_len` header word.
pub const ATTR_HEADER_LEN: usize = 4;
const ATTR_ALIGN: usize = 4;

pub(crate) const ID_MASK: u32 = 0x7f00_0000;
pub(crate) const ID_SHIFT: u32 = 24;
pub(crate) const LEN_MASK: u32 = 0x00ff_ffff;
pub(crate) const EXTENDED: u32 = 0x8000_0000;

/// Largest attribute the 24-bit length field can describe.
pub const MAX_ATTR_LEN: usize = LEN_MASK as usize;

/// Deepest container nesting converted to or from JSON, the buffer head
/// counting as the first level. Matches serde_json's parser limit.
pub const MAX_NESTING: usize = 128;

/// Attribute length (header included, padding excluded) from its header.
pub fn attr_len(header: [u8; ATTR_HEADER_LEN]) -> usize {
    (u32::from_be_bytes(header) & LEN_MASK) as usize
}

pub(crate) fn pad_len(len: usize) -> usize {
    (len + ATTR_ALIGN - 1) & !(ATTR_ALIGN - 1)
}

/// Length of a blobmsg name header for a name of `name_len` bytes.
pub(crate) fn msg_header_len(name_len: usize) -> usize {
    pad_len(2 + name_len + 1)
}

/// Payload type of an extended attribute
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum BlobMsgType {
    Unspec = 0,
    Array = 1,
    Table = 2,
    String = 3,
    Int64 = 4,
    Int32 = 5,
    Int16 = 6,
    /// Also used for booleans
    Int8 = 7,
    Double = 8,
}

impl BlobMsgType {
    pub fn from_id(id: u8) -> Option<Self> {
        Some(match id {
            0 => Self::Unspec,
            1 => Self::Array,
            2 => Self::Table,
            3 => Self::String,
            4 => Self::Int64,
            5 => Self::Int32,
            6 => Self::Int16,
            7 => Self::Int8,
            8 => Self::Double,
            _ => return None,
        })
    }

    /// Minimum payload size for fixed-width types
    fn min_payload(&self) -> usize {
        match self {
            Self::Int64 | Self::Double => 8,
            Self::Int32 => 4,
            Self::Int16 => 2,
            Self::Int8 | Self::String => 1,
            Self::Unspec | Self::Array | Self::Table => 0,
        }
    }
}
