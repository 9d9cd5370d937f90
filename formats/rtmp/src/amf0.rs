//! Thin wrapper around the `amf` crate's AMF0 codec. The session core hands
//! us raw command/data payload bytes; we hand back a `Vec<Value>` the way
//! an RTMP command message is really encoded — a flat sequence of AMF0
//! values with no outer envelope.

use amf::amf0::Value;

use crate::errors::{RtmpFormatsError, RtmpFormatsResult};

/// Byte length of a single encoded AMF0 value, used to walk a payload that
/// packs several values back to back (command name, transaction id, command
/// object, further arguments).
pub fn encoded_len(value: &Value) -> usize {
    match value {
        Value::Number(_) => 9,
        Value::Boolean(_) => 2,
        Value::String(s) => s.len() + 3,
        Value::Object { entries, .. } => {
            let mut len = 4;
            for entry in entries {
                len += entry.key.len() + 2 + encoded_len(&entry.value);
            }
            len
        }
        Value::Null | Value::Undefined => 1,
        Value::EcmaArray { entries } => {
            let mut len = 8;
            for entry in entries {
                len += entry.key.len() + 2 + encoded_len(&entry.value);
            }
            len
        }
        Value::Array { entries } => {
            let mut len = 5;
            for entry in entries {
                len += encoded_len(&entry.value);
            }
            len
        }
        Value::Date { .. } => 11,
        Value::XmlDocument(s) => s.len() + 5,
        Value::AvmPlus(bytes) => bytes.len() + 1,
    }
}

/// Decode every AMF0 value packed into a command (type 20) or data (type 18)
/// message payload.
pub fn decode_all(bytes: &[u8]) -> RtmpFormatsResult<Vec<Value>> {
    let mut values = Vec::new();
    let mut read = 0usize;
    while read < bytes.len() {
        let value = Value::read_from(&mut &bytes[read..])
            .map_err(|e| RtmpFormatsError::Amf0Decode(format!("{e:?}")))?;
        read += encoded_len(&value);
        values.push(value);
    }
    Ok(values)
}

/// Look a string-keyed field up in an `Object`/`EcmaArray` value's entries.
pub fn field<'a>(object: &'a Value, key: &str) -> Option<&'a Value> {
    match object {
        Value::Object { entries, .. } | Value::EcmaArray { entries } => {
            entries.iter().find(|e| e.key == key).map(|e| &e.value)
        }
        _ => None,
    }
}
