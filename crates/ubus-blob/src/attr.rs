//! Validating reader for attributes

use crate::{
    msg_header_len, pad_len, BlobError, BlobMsgType, BlobResult, ATTR_HEADER_LEN, EXTENDED,
    ID_MASK, ID_SHIFT, LEN_MASK,
};

/// Borrowed view of one attribute: header plus payload, without padding
#[derive(Debug, Clone, Copy)]
pub struct BlobAttr<'a> {
    raw: &'a [u8],
}

impl<'a> BlobAttr<'a> {
    /// Parse the attribute at the front of `bytes`.
    ///
    /// Returns the attribute and whatever follows its padding. The final
    /// attribute of a slice may omit its padding.
    pub fn parse(bytes: &'a [u8]) -> BlobResult<(Self, &'a [u8])> {
        if bytes.len() < ATTR_HEADER_LEN {
            return Err(BlobError::Truncated {
                needed: ATTR_HEADER_LEN,
                available: bytes.len(),
            });
        }

        let id_len = u32::from_be_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]);
        let len = (id_len & LEN_MASK) as usize;
        if len < ATTR_HEADER_LEN {
            return Err(BlobError::BadLength(len));
        }
        if len > bytes.len() {
            return Err(BlobError::Truncated {
                needed: len,
                available: bytes.len(),
            });
        }

        let next = pad_len(len).min(bytes.len());
        Ok((Self { raw: &bytes[..len] }, &bytes[next..]))
    }

    /// Wrap bytes already known to hold one well-formed attribute.
    pub(crate) fn from_raw(raw: &'a [u8]) -> Self {
        Self { raw }
    }

    fn header(&self) -> u32 {
        u32::from_be_bytes([self.raw[0], self.raw[1], self.raw[2], self.raw[3]])
    }

    pub fn id(&self) -> u8 {
        ((self.header() & ID_MASK) >> ID_SHIFT) as u8
    }

    pub fn is_extended(&self) -> bool {
        self.header() & EXTENDED != 0
    }

    /// Length including the header, excluding padding
    pub fn raw_len(&self) -> usize {
        self.raw.len()
    }

    pub fn as_bytes(&self) -> &'a [u8] {
        self.raw
    }

    /// Payload following the 4-byte header
    pub fn data(&self) -> &'a [u8] {
        &self.raw[ATTR_HEADER_LEN..]
    }

    /// Nested attributes, treating the whole payload as a container.
    pub fn children(&self) -> Attrs<'a> {
        Attrs::new(self.data())
    }

    pub fn as_msg(&self) -> BlobResult<BlobMsg<'a>> {
        BlobMsg::from_attr(*self)
    }
}

/// Iterator over consecutive attributes in a container payload
#[derive(Debug, Clone)]
pub struct Attrs<'a> {
    rest: &'a [u8],
}

impl<'a> Attrs<'a> {
    pub fn new(bytes: &'a [u8]) -> Self {
        Self { rest: bytes }
    }
}

impl<'a> Iterator for Attrs<'a> {
    type Item = BlobResult<BlobAttr<'a>>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.rest.is_empty() {
            return None;
        }

        match BlobAttr::parse(self.rest) {
            Ok((attr, rest)) => {
                self.rest = rest;
                Some(Ok(attr))
            }
            Err(e) => {
                // A broken length makes everything after it unreadable
                self.rest = &[];
                Some(Err(e))
            }
        }
    }
}

/// Named, typed view of an extended attribute
#[derive(Debug, Clone, Copy)]
pub struct BlobMsg<'a> {
    name: &'a str,
    kind: BlobMsgType,
    payload: &'a [u8],
}

impl<'a> BlobMsg<'a> {
    pub fn from_attr(attr: BlobAttr<'a>) -> BlobResult<Self> {
        if !attr.is_extended() {
            return Err(BlobError::NotExtended);
        }
        let kind = BlobMsgType::from_id(attr.id()).ok_or(BlobError::UnknownType(attr.id()))?;

        let data = attr.data();
        if data.len() < 2 {
            return Err(BlobError::Truncated {
                needed: 2,
                available: data.len(),
            });
        }

        let name_len = u16::from_be_bytes([data[0], data[1]]) as usize;
        let header_len = msg_header_len(name_len);
        if data.len() < header_len {
            return Err(BlobError::Truncated {
                needed: header_len,
                available: data.len(),
            });
        }
        if data[2 + name_len] != 0 {
            return Err(BlobError::Unterminated);
        }
        let name = std::str::from_utf8(&data[2..2 + name_len]).map_err(|_| BlobError::InvalidUtf8)?;

        let payload = &data[header_len..];
        if payload.len() < kind.min_payload() {
            return Err(BlobError::BadPayload {
                kind,
                len: payload.len(),
            });
        }
        if kind == BlobMsgType::String && payload.last() != Some(&0) {
            return Err(BlobError::Unterminated);
        }

        Ok(Self {
            name,
            kind,
            payload,
        })
    }

    pub fn name(&self) -> &'a str {
        self.name
    }

    pub fn kind(&self) -> BlobMsgType {
        self.kind
    }

    pub fn payload(&self) -> &'a [u8] {
        self.payload
    }

    pub fn as_bool(&self) -> bool {
        self.payload[0] != 0
    }

    pub fn as_i16(&self) -> i16 {
        i16::from_be_bytes([self.payload[0], self.payload[1]])
    }

    pub fn as_i32(&self) -> i32 {
        i32::from_be_bytes(self.fixed::<4>())
    }

    pub fn as_i64(&self) -> i64 {
        i64::from_be_bytes(self.fixed::<8>())
    }

    pub fn as_f64(&self) -> f64 {
        f64::from_bits(u64::from_be_bytes(self.fixed::<8>()))
    }

    /// String payload without its terminator
    pub fn as_str(&self) -> BlobResult<&'a str> {
        let bytes = &self.payload[..self.payload.len() - 1];
        std::str::from_utf8(bytes).map_err(|_| BlobError::InvalidUtf8)
    }

    /// Members of a table or array
    pub fn children(&self) -> Attrs<'a> {
        Attrs::new(self.payload)
    }

    fn fixed<const N: usize>(&self) -> [u8; N] {
        let mut out = [0u8; N];
        out.copy_from_slice(&self.payload[..N]);
        out
    }
}
