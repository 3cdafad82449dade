//! Argument marshaling: host value -> JSON -> attribute buffer

use serde_json::{Map, Number, Value};
use ubus_blob::{BlobBuf, MAX_NESTING};
use ubus_util::{UbusError, UbusResult};

use crate::{HostDict, HostList, HostValue};

/// Convert a host value into a JSON document.
///
/// Fails on cycles, non-string dict keys, bytes, non-finite floats and
/// containers nested deeper than [`MAX_NESTING`]. A container reachable
/// twice without being its own ancestor is not a cycle.
pub fn to_json(value: &HostValue) -> UbusResult<Value> {
    let mut path = Vec::new();
    value_to_json(value, &mut path)
}

fn value_to_json(value: &HostValue, path: &mut Vec<usize>) -> UbusResult<Value> {
    match value {
        HostValue::None => Ok(Value::Null),
        HostValue::Bool(b) => Ok(Value::Bool(*b)),
        HostValue::Int(i) => Ok(Value::from(*i)),
        HostValue::Float(x) => Number::from_f64(*x)
            .map(Value::Number)
            .ok_or_else(|| UbusError::value(format!("float {x} is not JSON serializable"))),
        HostValue::Str(s) => Ok(Value::String(s.clone())),
        HostValue::Bytes(_) => Err(UbusError::value(
            "object of type bytes is not JSON serializable",
        )),
        HostValue::List(list) => list_to_json(list, path),
        HostValue::Dict(dict) => dict_to_json(dict, path),
    }
}

fn enter(path: &mut Vec<usize>, id: usize) -> UbusResult<()> {
    if path.contains(&id) {
        return Err(UbusError::value("circular reference detected"));
    }
    if path.len() >= MAX_NESTING {
        return Err(UbusError::value(format!(
            "containers nested deeper than {MAX_NESTING} levels"
        )));
    }
    path.push(id);
    Ok(())
}

fn list_to_json(list: &HostList, path: &mut Vec<usize>) -> UbusResult<Value> {
    enter(path, list.identity())?;
    let items = list
        .items()
        .iter()
        .map(|item| value_to_json(item, path))
        .collect::<UbusResult<Vec<_>>>();
    path.pop();
    items.map(Value::Array)
}

fn dict_to_json(dict: &HostDict, path: &mut Vec<usize>) -> UbusResult<Value> {
    enter(path, dict.identity())?;
    let result = dict_members(dict, path);
    path.pop();
    result.map(Value::Object)
}

fn dict_members(dict: &HostDict, path: &mut Vec<usize>) -> UbusResult<Map<String, Value>> {
    let mut map = Map::new();
    for (key, value) in dict.items().iter() {
        let Some(key) = key.as_str() else {
            return Err(UbusError::value(format!(
                "keys must be str, not {}",
                key.type_name()
            )));
        };
        map.insert(key.to_string(), value_to_json(value, path)?);
    }
    Ok(map)
}

/// Render a host value as compact JSON text.
pub fn to_json_text(value: &HostValue) -> UbusResult<String> {
    let json = to_json(value)?;
    serde_json::to_string(&json).map_err(|e| UbusError::value(e.to_string()))
}

/// Parse JSON text into a host value.
pub fn from_json_text(text: &str) -> UbusResult<HostValue> {
    let json: Value = serde_json::from_str(text).map_err(|e| UbusError::value(e.to_string()))?;
    Ok(HostValue::from(json))
}

/// Build the outgoing attribute buffer for a call argument.
///
/// The value goes through its JSON text form, so anything the JSON
/// conversion or the blob encoder rejects surfaces as a value error.
pub fn encode(value: &HostValue) -> UbusResult<BlobBuf> {
    let text = to_json_text(value)?;
    BlobBuf::from_json_str(&text).map_err(|e| UbusError::value(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use ubus_blob::{live_buffers, to_json_value};

    fn is_value_error<T: std::fmt::Debug>(result: UbusResult<T>) -> bool {
        matches!(result, Err(UbusError::Value(_)))
    }

    #[test]
    fn scalars_and_containers_convert() {
        let value = HostValue::dict([
            ("n", HostValue::None),
            ("b", HostValue::Bool(true)),
            ("i", HostValue::Int(7)),
            ("f", HostValue::Float(0.5)),
            ("s", HostValue::from("x")),
            ("l", HostValue::list([HostValue::Int(1), HostValue::from("two")])),
        ]);

        assert_eq!(
            to_json(&value).unwrap(),
            json!({"n": null, "b": true, "i": 7, "f": 0.5, "s": "x", "l": [1, "two"]})
        );
    }

    #[test]
    fn self_referencing_list_is_rejected() {
        let list = HostList::new();
        list.push(HostValue::List(list.clone()));
        assert!(is_value_error(to_json(&HostValue::List(list))));
    }

    #[test]
    fn indirect_dict_cycle_is_rejected() {
        let outer = HostDict::new();
        let inner = HostDict::new();
        inner.insert("up", outer.clone());
        outer.insert("down", inner);

        let err = to_json(&HostValue::Dict(outer)).unwrap_err();
        assert!(err.to_string().contains("circular"));
    }

    #[test]
    fn shared_container_is_not_a_cycle() {
        let shared = HostValue::list([HostValue::Int(1)]);
        let value = HostValue::dict([("a", shared.clone()), ("b", shared)]);
        assert_eq!(to_json(&value).unwrap(), json!({"a": [1], "b": [1]}));
    }

    #[test]
    fn non_string_key_is_rejected() {
        let dict = HostDict::new();
        dict.insert(1, "one");
        let err = to_json(&HostValue::Dict(dict)).unwrap_err();
        assert!(err.to_string().contains("int"));
    }

    #[test]
    fn bytes_and_non_finite_floats_are_rejected() {
        assert!(is_value_error(to_json(&HostValue::Bytes(vec![1, 2]))));
        assert!(is_value_error(to_json(&HostValue::Float(f64::NAN))));
        assert!(is_value_error(to_json(&HostValue::Float(f64::INFINITY))));
    }

    #[test]
    fn json_text_round_trips() {
        let value = HostValue::dict([("k", HostValue::list([HostValue::Bool(false)]))]);
        let text = to_json_text(&value).unwrap();
        assert_eq!(text, r#"{"k":[false]}"#);
        assert_eq!(from_json_text(&text).unwrap(), value);
    }

    #[test]
    fn malformed_json_text_is_a_value_error() {
        assert!(is_value_error(from_json_text("{\"a\":")));
    }

    #[test]
    fn encode_builds_blob_from_dict() {
        let value = HostValue::dict([("name", HostValue::from("lan")), ("up", HostValue::Bool(true))]);
        let buf = encode(&value).unwrap();
        assert_eq!(
            to_json_value(buf.as_bytes()).unwrap(),
            json!({"name": "lan", "up": true})
        );
    }

    #[test]
    fn encode_rejects_non_object_top_level() {
        let before = live_buffers();
        assert!(is_value_error(encode(&HostValue::list([HostValue::Int(1)]))));
        assert!(is_value_error(encode(&HostValue::Int(1))));
        assert_eq!(live_buffers(), before);
    }

    #[test]
    fn encode_failure_before_blob_allocates_nothing() {
        let before = live_buffers();
        let list = HostList::new();
        list.push(HostValue::List(list.clone()));
        let value = HostValue::dict([("loop", HostValue::List(list))]);

        assert!(is_value_error(encode(&value)));
        assert_eq!(live_buffers(), before);
    }

    /// `levels` lists, each holding the next, inside a one-key dict
    fn nested_lists(levels: usize) -> HostValue {
        let mut value = HostValue::list([]);
        for _ in 1..levels {
            value = HostValue::list([value]);
        }
        HostValue::dict([("deep", value)])
    }

    #[test]
    fn nesting_up_to_the_limit_converts() {
        assert!(to_json(&nested_lists(MAX_NESTING - 1)).is_ok());
    }

    #[test]
    fn encode_rejects_nesting_past_the_limit() {
        let before = live_buffers();
        let err = encode(&nested_lists(MAX_NESTING)).unwrap_err();
        assert!(err.to_string().contains("nested deeper"));
        assert_eq!(live_buffers(), before);
    }
}
