//! Response collection for one outstanding call

use tracing::debug;
use ubus_blob::format_json;

use crate::{from_json_text, HostValue};

/// Accumulates decoded response messages in arrival order.
///
/// Messages that do not decode are dropped and counted; they never fail the
/// call.
#[derive(Debug, Default)]
pub struct ResponseCollector {
    responses: Vec<HostValue>,
    dropped: usize,
}

impl ResponseCollector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Handle one raw data message from the bus
    pub fn on_message(&mut self, raw: &[u8]) {
        let decoded = format_json(raw)
            .map_err(|e| e.to_string())
            .and_then(|text| from_json_text(&text).map_err(|e| e.to_string()));

        match decoded {
            Ok(value) => self.responses.push(value),
            Err(error) => {
                self.dropped += 1;
                debug!(error = %error, len = raw.len(), "Dropping undecodable response message");
            }
        }
    }

    pub fn responses(&self) -> &[HostValue] {
        &self.responses
    }

    /// Number of messages that could not be decoded
    pub fn dropped(&self) -> usize {
        self.dropped
    }

    pub fn into_responses(self) -> Vec<HostValue> {
        self.responses
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use ubus_blob::{BlobBuf, MAX_NESTING};

    fn message(value: serde_json::Value) -> Vec<u8> {
        BlobBuf::from_json(&value).unwrap().as_bytes().to_vec()
    }

    #[test]
    fn messages_are_kept_in_arrival_order() {
        let mut collector = ResponseCollector::new();
        collector.on_message(&message(json!({"seq": 1})));
        collector.on_message(&message(json!({"seq": 2})));
        collector.on_message(&message(json!({"seq": 3})));

        let seqs: Vec<_> = collector
            .responses()
            .iter()
            .map(|r| r.as_dict().unwrap().get_str("seq").unwrap())
            .collect();
        assert_eq!(
            seqs,
            vec![HostValue::Int(1), HostValue::Int(2), HostValue::Int(3)]
        );
        assert_eq!(collector.dropped(), 0);
    }

    #[test]
    fn malformed_message_is_dropped() {
        let mut collector = ResponseCollector::new();
        collector.on_message(&[0x00, 0x00, 0x00, 0x02]);
        collector.on_message(&[0x00, 0x00]);
        collector.on_message(&message(json!({"ok": true})));

        assert_eq!(collector.dropped(), 2);
        assert_eq!(
            collector.into_responses(),
            vec![HostValue::dict([("ok", true)])]
        );
    }

    #[test]
    fn empty_message_decodes_to_empty_dict() {
        let mut collector = ResponseCollector::new();
        collector.on_message(BlobBuf::new().as_bytes());
        assert_eq!(collector.responses(), &[HostValue::Dict(Default::default())]);
    }

    fn nested_tables(levels: usize) -> Vec<u8> {
        let mut buf = BlobBuf::new();
        let cookies: Vec<_> = (0..levels).map(|_| buf.open_table("t").unwrap()).collect();
        for cookie in cookies.into_iter().rev() {
            buf.close(cookie).unwrap();
        }
        buf.as_bytes().to_vec()
    }

    #[test]
    fn overly_nested_message_is_dropped() {
        let mut collector = ResponseCollector::new();
        collector.on_message(&nested_tables(MAX_NESTING));
        collector.on_message(&nested_tables(200_000));
        collector.on_message(&message(json!({"after": 1})));

        assert_eq!(collector.dropped(), 2);
        assert_eq!(
            collector.into_responses(),
            vec![HostValue::dict([("after", 1)])]
        );
    }
}
