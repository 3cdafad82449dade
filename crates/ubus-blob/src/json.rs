//! JSON conversion in both directions
//!
//! Encoding follows the bus daemon's JSON import rules: the document must be
//! an object, integers that fit 32 bits become INT32, larger ones INT64,
//! booleans INT8, null UNSPEC. Decoding renders a container's members as one
//! JSON object, with INT8 read back as a boolean.

use serde_json::{Map, Number, Value};

use crate::{Attrs, BlobAttr, BlobBuf, BlobError, BlobMsg, BlobMsgType, BlobResult, MAX_NESTING};

impl BlobBuf {
    /// Build a buffer from JSON text.
    pub fn from_json_str(text: &str) -> BlobResult<Self> {
        let value: Value = serde_json::from_str(text)?;
        Self::from_json(&value)
    }

    /// Build a buffer from a JSON object.
    pub fn from_json(value: &Value) -> BlobResult<Self> {
        let Value::Object(map) = value else {
            return Err(BlobError::NotAnObject);
        };

        let mut buf = Self::new();
        buf.add_json_object(map)?;
        Ok(buf)
    }

    /// Append every member of `map` as a named attribute.
    pub fn add_json_object(&mut self, map: &Map<String, Value>) -> BlobResult<()> {
        self.add_json_members(map, 1)
    }

    pub fn add_json_element(&mut self, name: &str, value: &Value) -> BlobResult<()> {
        self.add_json_value(name, value, 1)
    }

    fn add_json_members(&mut self, map: &Map<String, Value>, depth: usize) -> BlobResult<()> {
        for (name, value) in map {
            self.add_json_value(name, value, depth)?;
        }
        Ok(())
    }

    fn add_json_value(&mut self, name: &str, value: &Value, depth: usize) -> BlobResult<()> {
        match value {
            Value::Null => self.add_unspec(name),
            Value::Bool(b) => self.add_bool(name, *b),
            Value::Number(n) => self.add_json_number(name, n),
            Value::String(s) => self.add_string(name, s),
            Value::Array(items) => {
                let depth = nest(depth)?;
                let cookie = self.open_array(name)?;
                for item in items {
                    self.add_json_value("", item, depth)?;
                }
                self.close(cookie)
            }
            Value::Object(map) => {
                let depth = nest(depth)?;
                let cookie = self.open_table(name)?;
                self.add_json_members(map, depth)?;
                self.close(cookie)
            }
        }
    }

    fn add_json_number(&mut self, name: &str, n: &Number) -> BlobResult<()> {
        if let Some(i) = n.as_i64() {
            return match i32::try_from(i) {
                Ok(small) => self.add_i32(name, small),
                Err(_) => self.add_i64(name, i),
            };
        }
        if n.is_u64() {
            return Err(BlobError::IntegerOutOfRange(n.to_string()));
        }
        match n.as_f64() {
            Some(f) => self.add_f64(name, f),
            None => Err(BlobError::IntegerOutOfRange(n.to_string())),
        }
    }
}

/// Render a raw attribute's members as JSON text.
pub fn format_json(raw: &[u8]) -> BlobResult<String> {
    let value = to_json_value(raw)?;
    Ok(serde_json::to_string(&value)?)
}

/// Decode a raw attribute's members into a JSON value.
pub fn to_json_value(raw: &[u8]) -> BlobResult<Value> {
    let (attr, _) = BlobAttr::parse(raw)?;
    attr_to_json(attr)
}

/// Decode an attribute as a container.
///
/// Plain attributes (a buffer head, a message's data attribute) and tables
/// become objects; an array stays an array.
pub fn attr_to_json(attr: BlobAttr<'_>) -> BlobResult<Value> {
    if !attr.is_extended() {
        return table_to_json(attr.children(), 1);
    }

    let msg = attr.as_msg()?;
    match msg.kind() {
        BlobMsgType::Table => table_to_json(msg.children(), 1),
        BlobMsgType::Array => array_to_json(msg.children(), 1),
        kind => Err(BlobError::BadPayload {
            kind,
            len: msg.payload().len(),
        }),
    }
}

/// Depth of a container opened inside one at `depth`
fn nest(depth: usize) -> BlobResult<usize> {
    if depth >= MAX_NESTING {
        return Err(BlobError::TooDeep(MAX_NESTING));
    }
    Ok(depth + 1)
}

fn table_to_json(members: Attrs<'_>, depth: usize) -> BlobResult<Value> {
    let mut map = Map::new();
    for member in members {
        let msg = member?.as_msg()?;
        if msg.name().is_empty() {
            return Err(BlobError::UnnamedMember);
        }
        map.insert(msg.name().to_string(), msg_to_json(&msg, depth)?);
    }
    Ok(Value::Object(map))
}

fn array_to_json(items: Attrs<'_>, depth: usize) -> BlobResult<Value> {
    items
        .map(|item| msg_to_json(&item?.as_msg()?, depth))
        .collect::<BlobResult<Vec<_>>>()
        .map(Value::Array)
}

fn msg_to_json(msg: &BlobMsg<'_>, depth: usize) -> BlobResult<Value> {
    Ok(match msg.kind() {
        BlobMsgType::Unspec => Value::Null,
        BlobMsgType::Int8 => Value::Bool(msg.as_bool()),
        BlobMsgType::Int16 => Value::from(msg.as_i16()),
        BlobMsgType::Int32 => Value::from(msg.as_i32()),
        BlobMsgType::Int64 => Value::from(msg.as_i64()),
        BlobMsgType::Double => {
            let f = msg.as_f64();
            Number::from_f64(f)
                .map(Value::Number)
                .ok_or(BlobError::BadPayload {
                    kind: BlobMsgType::Double,
                    len: msg.payload().len(),
                })?
        }
        BlobMsgType::String => Value::String(msg.as_str()?.to_string()),
        BlobMsgType::Table => table_to_json(msg.children(), nest(depth)?)?,
        BlobMsgType::Array => array_to_json(msg.children(), nest(depth)?)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn kinds(buf: &BlobBuf) -> Vec<BlobMsgType> {
        buf.head()
            .children()
            .map(|attr| attr.unwrap().as_msg().unwrap().kind())
            .collect()
    }

    #[test]
    fn object_members_become_named_attributes() {
        let buf = BlobBuf::from_json_str(
            r#"{"flag": true, "small": 7, "big": 5000000000, "ratio": 0.5, "name": "lan", "none": null}"#,
        )
        .unwrap();

        assert_eq!(
            kinds(&buf),
            vec![
                BlobMsgType::Int8,
                BlobMsgType::Int32,
                BlobMsgType::Int64,
                BlobMsgType::Double,
                BlobMsgType::String,
                BlobMsgType::Unspec,
            ]
        );
    }

    #[test]
    fn top_level_must_be_an_object() {
        assert!(matches!(
            BlobBuf::from_json_str("[1, 2]"),
            Err(BlobError::NotAnObject)
        ));
        assert!(matches!(
            BlobBuf::from_json_str("42"),
            Err(BlobError::NotAnObject)
        ));
    }

    #[test]
    fn malformed_text_is_a_json_error() {
        assert!(matches!(
            BlobBuf::from_json_str("{\"a\": "),
            Err(BlobError::Json(_))
        ));
    }

    #[test]
    fn unsigned_beyond_i64_is_rejected() {
        let err = BlobBuf::from_json_str(r#"{"n": 18446744073709551615}"#).unwrap_err();
        assert!(matches!(err, BlobError::IntegerOutOfRange(_)));
    }

    #[test]
    fn nested_document_decodes_unchanged() {
        let doc = json!({
            "interface": "lan",
            "up": true,
            "mtu": 1500,
            "uptime": 9_000_000_000i64,
            "load": [0.25, 0.5],
            "dns": [],
            "route": {"target": "0.0.0.0", "mask": 0, "metric": null},
        });

        let buf = BlobBuf::from_json(&doc).unwrap();
        let decoded = to_json_value(buf.as_bytes()).unwrap();
        assert_eq!(decoded, doc);
    }

    #[test]
    fn format_json_renders_compact_text() {
        let buf = BlobBuf::from_json_str(r#"{"a": 1}"#).unwrap();
        assert_eq!(format_json(buf.as_bytes()).unwrap(), r#"{"a":1}"#);
    }

    #[test]
    fn empty_container_formats_as_empty_object() {
        let buf = BlobBuf::new();
        assert_eq!(format_json(buf.as_bytes()).unwrap(), "{}");
    }

    #[test]
    fn int16_decodes_as_number() {
        let mut buf = BlobBuf::new();
        buf.add_i16("port", -3).unwrap();
        assert_eq!(to_json_value(buf.as_bytes()).unwrap(), json!({"port": -3}));
    }

    #[test]
    fn unnamed_table_member_is_rejected() {
        let mut buf = BlobBuf::new();
        buf.add_i32("", 1).unwrap();
        assert!(matches!(
            format_json(buf.as_bytes()),
            Err(BlobError::UnnamedMember)
        ));
    }

    #[test]
    fn truncated_message_is_rejected() {
        let buf = BlobBuf::from_json_str(r#"{"a": "text"}"#).unwrap();
        let bytes = buf.as_bytes();
        assert!(format_json(&bytes[..bytes.len() - 4]).is_err());
    }

    #[test]
    fn nan_double_cannot_be_formatted() {
        let mut buf = BlobBuf::new();
        buf.add_f64("x", f64::NAN).unwrap();
        assert!(matches!(
            format_json(buf.as_bytes()),
            Err(BlobError::BadPayload {
                kind: BlobMsgType::Double,
                ..
            })
        ));
    }

    #[test]
    fn extended_table_formats_its_members() {
        let mut buf = BlobBuf::new();
        let cookie = buf.open_table("t").unwrap();
        buf.add_string("k", "v").unwrap();
        buf.close(cookie).unwrap();

        let table = buf.head().children().next().unwrap().unwrap();
        assert_eq!(attr_to_json(table).unwrap(), json!({"k": "v"}));
    }

    /// Buffer whose head holds `levels` tables, each inside the previous one
    fn nested_tables(levels: usize) -> BlobBuf {
        let mut buf = BlobBuf::new();
        let cookies: Vec<_> = (0..levels).map(|_| buf.open_table("t").unwrap()).collect();
        for cookie in cookies.into_iter().rev() {
            buf.close(cookie).unwrap();
        }
        buf
    }

    #[test]
    fn nesting_up_to_the_limit_decodes() {
        // the head is the first level
        let buf = nested_tables(MAX_NESTING - 1);
        let mut value = to_json_value(buf.as_bytes()).unwrap();
        let mut levels = 1;
        while let Some(inner) = value.get_mut("t").map(Value::take) {
            value = inner;
            levels += 1;
        }
        assert_eq!(levels, MAX_NESTING);
    }

    #[test]
    fn nesting_past_the_limit_is_rejected() {
        let buf = nested_tables(MAX_NESTING);
        assert!(matches!(
            format_json(buf.as_bytes()),
            Err(BlobError::TooDeep(MAX_NESTING))
        ));
    }

    #[test]
    fn very_deep_message_fails_without_overflowing() {
        let buf = nested_tables(200_000);
        assert!(matches!(
            format_json(buf.as_bytes()),
            Err(BlobError::TooDeep(_))
        ));
    }

    #[test]
    fn deep_json_value_is_not_encoded() {
        let mut doc = json!({});
        for _ in 0..MAX_NESTING {
            doc = json!({ "t": doc });
        }
        assert!(matches!(
            BlobBuf::from_json(&doc),
            Err(BlobError::TooDeep(MAX_NESTING))
        ));
    }
}
