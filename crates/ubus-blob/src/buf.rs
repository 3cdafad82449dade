//! Attribute buffer builder

use std::cell::Cell;
use std::fmt;

use crate::{
    pad_len, BlobAttr, BlobError, BlobMsgType, BlobResult, ATTR_HEADER_LEN, EXTENDED, ID_SHIFT,
    LEN_MASK, MAX_ATTR_LEN,
};

thread_local! {
    static LIVE_BUFFERS: Cell<usize> = const { Cell::new(0) };
}

/// Number of buffers currently alive on the calling thread.
pub fn live_buffers() -> usize {
    LIVE_BUFFERS.with(|count| count.get())
}

fn track_alloc() {
    LIVE_BUFFERS.with(|count| count.set(count.get() + 1));
}

fn track_release() {
    LIVE_BUFFERS.with(|count| count.set(count.get().saturating_sub(1)));
}

/// Marks an open table or array; pass it back to [`BlobBuf::close`].
#[must_use = "an opened container must be closed"]
#[derive(Debug)]
pub struct NestCookie(usize);

/// Growable attribute buffer.
///
/// The buffer starts with a plain container header (id 0) whose length
/// always covers every attribute added so far.
pub struct BlobBuf {
    data: Vec<u8>,
}

impl BlobBuf {
    pub fn new() -> Self {
        track_alloc();
        Self {
            data: (ATTR_HEADER_LEN as u32).to_be_bytes().to_vec(),
        }
    }

    /// Whole buffer including the head attribute
    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    /// The head attribute
    pub fn head(&self) -> BlobAttr<'_> {
        // The head length is rewritten after every attribute, so it always
        // spans the whole buffer.
        BlobAttr::from_raw(&self.data)
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// True when no attribute has been added
    pub fn is_empty(&self) -> bool {
        self.data.len() == ATTR_HEADER_LEN
    }

    pub fn add_unspec(&mut self, name: &str) -> BlobResult<()> {
        self.add_field(BlobMsgType::Unspec, name, &[])
    }

    pub fn add_bool(&mut self, name: &str, value: bool) -> BlobResult<()> {
        self.add_field(BlobMsgType::Int8, name, &[value as u8])
    }

    pub fn add_i16(&mut self, name: &str, value: i16) -> BlobResult<()> {
        self.add_field(BlobMsgType::Int16, name, &value.to_be_bytes())
    }

    pub fn add_i32(&mut self, name: &str, value: i32) -> BlobResult<()> {
        self.add_field(BlobMsgType::Int32, name, &value.to_be_bytes())
    }

    pub fn add_i64(&mut self, name: &str, value: i64) -> BlobResult<()> {
        self.add_field(BlobMsgType::Int64, name, &value.to_be_bytes())
    }

    pub fn add_f64(&mut self, name: &str, value: f64) -> BlobResult<()> {
        self.add_field(BlobMsgType::Double, name, &value.to_bits().to_be_bytes())
    }

    pub fn add_string(&mut self, name: &str, value: &str) -> BlobResult<()> {
        let start = self.begin(BlobMsgType::String, name)?;
        self.data.extend_from_slice(value.as_bytes());
        self.data.push(0);
        self.end(start)
    }

    pub fn open_table(&mut self, name: &str) -> BlobResult<NestCookie> {
        self.begin(BlobMsgType::Table, name).map(NestCookie)
    }

    pub fn open_array(&mut self, name: &str) -> BlobResult<NestCookie> {
        self.begin(BlobMsgType::Array, name).map(NestCookie)
    }

    pub fn close(&mut self, cookie: NestCookie) -> BlobResult<()> {
        self.end(cookie.0)
    }

    fn add_field(&mut self, kind: BlobMsgType, name: &str, payload: &[u8]) -> BlobResult<()> {
        let start = self.begin(kind, name)?;
        self.data.extend_from_slice(payload);
        self.end(start)
    }

    /// Write the attribute header (length patched by `end`) and the name header.
    fn begin(&mut self, kind: BlobMsgType, name: &str) -> BlobResult<usize> {
        let name_len = u16::try_from(name.len()).map_err(|_| BlobError::TooLarge)?;

        let start = self.data.len();
        let header = EXTENDED | ((kind as u32) << ID_SHIFT);
        self.data.extend_from_slice(&header.to_be_bytes());
        self.data.extend_from_slice(&name_len.to_be_bytes());
        self.data.extend_from_slice(name.as_bytes());
        self.data.push(0);
        self.pad();
        Ok(start)
    }

    fn end(&mut self, start: usize) -> BlobResult<()> {
        let len = self.data.len() - start;
        self.set_len(start, len)?;
        self.pad();
        let total = self.data.len();
        self.set_len(0, total)
    }

    fn set_len(&mut self, offset: usize, len: usize) -> BlobResult<()> {
        if len > MAX_ATTR_LEN {
            return Err(BlobError::TooLarge);
        }
        let word = &mut self.data[offset..offset + ATTR_HEADER_LEN];
        let header = u32::from_be_bytes([word[0], word[1], word[2], word[3]]);
        let header = (header & !LEN_MASK) | len as u32;
        word.copy_from_slice(&header.to_be_bytes());
        Ok(())
    }

    fn pad(&mut self) {
        let padded = pad_len(self.data.len());
        self.data.resize(padded, 0);
    }
}

impl Default for BlobBuf {
    fn default() -> Self {
        Self::new()
    }
}

impl Clone for BlobBuf {
    fn clone(&self) -> Self {
        track_alloc();
        Self {
            data: self.data.clone(),
        }
    }
}

impl Drop for BlobBuf {
    fn drop(&mut self) {
        track_release();
    }
}

impl fmt::Debug for BlobBuf {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BlobBuf").field("len", &self.data.len()).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_buffer_is_an_empty_container() {
        let buf = BlobBuf::new();
        assert!(buf.is_empty());
        assert_eq!(buf.as_bytes(), &[0, 0, 0, 4]);
        assert_eq!(buf.head().id(), 0);
        assert!(!buf.head().is_extended());
    }

    #[test]
    fn string_layout_matches_wire_format() {
        let mut buf = BlobBuf::new();
        buf.add_string("a", "hi").unwrap();

        // head(4) + attr header(4) + name header(4) + "hi\0" padded to 4
        assert_eq!(buf.len(), 16);
        assert_eq!(
            buf.as_bytes(),
            &[
                0x00, 0x00, 0x00, 0x10, // head: id 0, len 16
                0x83, 0x00, 0x00, 0x0b, // extended, STRING, len 11
                0x00, 0x01, b'a', 0x00, // name header
                b'h', b'i', 0x00, 0x00, // payload + padding
            ]
        );
    }

    #[test]
    fn nested_containers_cover_children() {
        let mut buf = BlobBuf::new();
        let table = buf.open_table("t").unwrap();
        buf.add_i32("n", 5).unwrap();
        let array = buf.open_array("l").unwrap();
        buf.add_bool("", true).unwrap();
        buf.close(array).unwrap();
        buf.close(table).unwrap();

        let head = buf.head();
        assert_eq!(head.raw_len(), buf.len());

        let table = head.children().next().unwrap().unwrap().as_msg().unwrap();
        assert_eq!(table.name(), "t");
        assert_eq!(table.kind(), BlobMsgType::Table);

        let members: Vec<_> = table
            .children()
            .map(|attr| attr.unwrap().as_msg().unwrap())
            .collect();
        assert_eq!(members.len(), 2);
        assert_eq!(members[0].as_i32(), 5);
        assert_eq!(members[1].kind(), BlobMsgType::Array);

        let items: Vec<_> = members[1]
            .children()
            .map(|attr| attr.unwrap().as_msg().unwrap())
            .collect();
        assert_eq!(items.len(), 1);
        assert!(items[0].as_bool());
    }

    #[test]
    fn scalar_values_read_back() {
        let mut buf = BlobBuf::new();
        buf.add_i16("s", -2).unwrap();
        buf.add_i64("l", i64::MIN).unwrap();
        buf.add_f64("d", 1.5).unwrap();
        buf.add_unspec("u").unwrap();

        let msgs: Vec<_> = buf
            .head()
            .children()
            .map(|attr| attr.unwrap().as_msg().unwrap())
            .collect();
        assert_eq!(msgs[0].as_i16(), -2);
        assert_eq!(msgs[1].as_i64(), i64::MIN);
        assert_eq!(msgs[2].as_f64(), 1.5);
        assert_eq!(msgs[3].kind(), BlobMsgType::Unspec);
        assert!(msgs[3].payload().is_empty());
    }

    #[test]
    fn oversized_names_are_rejected() {
        let mut buf = BlobBuf::new();
        let name = "n".repeat(u16::MAX as usize + 1);
        assert!(matches!(buf.add_bool(&name, true), Err(BlobError::TooLarge)));
    }

    #[test]
    fn live_count_tracks_buffers_on_this_thread() {
        let before = live_buffers();
        let buf = BlobBuf::new();
        let copy = buf.clone();
        assert_eq!(live_buffers(), before + 2);
        drop(buf);
        drop(copy);
        assert_eq!(live_buffers(), before);
    }
}
