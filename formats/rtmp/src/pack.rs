//! Builds the payload bytes for every canned message the session core
//! writes back to a peer. Callers are responsible for chunk-framing and
//! sending what these functions return; nothing here touches a socket.

use amf::amf0::{Entry, Value};
use byteorder::{BigEndian, WriteBytesExt};

use crate::consts::{self, response_code, response_level};
use crate::errors::{RtmpFormatsError, RtmpFormatsResult};

fn encode_values(values: &[Value]) -> RtmpFormatsResult<Vec<u8>> {
    let mut buf = Vec::new();
    for value in values {
        value
            .write_to(&mut buf)
            .map_err(|e| RtmpFormatsError::Amf0Decode(format!("{e:?}")))?;
    }
    Ok(buf)
}

fn entry(key: &str, value: Value) -> Entry {
    Entry {
        key: key.to_owned(),
        value,
    }
}

pub mod protocol_control {
    use super::*;

    pub fn set_chunk_size(chunk_size: u32) -> RtmpFormatsResult<Vec<u8>> {
        let mut buf = Vec::with_capacity(4);
        buf.write_u32::<BigEndian>(chunk_size & 0x7FFF_FFFF)?;
        Ok(buf)
    }

    pub fn window_ack_size(size: u32) -> RtmpFormatsResult<Vec<u8>> {
        let mut buf = Vec::with_capacity(4);
        buf.write_u32::<BigEndian>(size)?;
        Ok(buf)
    }

    /// `limit_type`: 0 = Hard, 1 = Soft, 2 = Dynamic.
    pub fn set_peer_bandwidth(size: u32, limit_type: u8) -> RtmpFormatsResult<Vec<u8>> {
        let mut buf = Vec::with_capacity(5);
        buf.write_u32::<BigEndian>(size)?;
        buf.write_u8(limit_type)?;
        Ok(buf)
    }
}

pub mod command {
    use super::*;

    /// `NetConnection.connect`'s `_result` reply: properties describing this
    /// server, then an information object carrying the status code.
    pub fn connect_result(transaction_id: f64) -> RtmpFormatsResult<Vec<u8>> {
        let properties = Value::Object {
            class_name: None,
            entries: vec![
                entry("fmsVer", Value::String(consts::FMSVER.to_owned())),
                entry("capabilities", Value::Number(consts::FMS_CAPABILITIES)),
            ],
        };
        let information = Value::Object {
            class_name: None,
            entries: vec![
                entry("level", Value::String(response_level::STATUS.to_owned())),
                entry(
                    "code",
                    Value::String(response_code::NET_CONNECTION_CONNECT_SUCCESS.to_owned()),
                ),
                entry(
                    "description",
                    Value::String("Connection succeeded.".to_owned()),
                ),
                entry("objectEncoding", Value::Number(0.0)),
            ],
        };
        encode_values(&[
            Value::String(consts::command_name::RESULT.to_owned()),
            Value::Number(transaction_id),
            properties,
            information,
        ])
    }

    /// `createStream`'s `_result` reply, carrying the assigned message
    /// stream id.
    pub fn create_stream_result(transaction_id: f64, stream_id: f64) -> RtmpFormatsResult<Vec<u8>> {
        encode_values(&[
            Value::String(consts::command_name::RESULT.to_owned()),
            Value::Number(transaction_id),
            Value::Null,
            Value::Number(stream_id),
        ])
    }

    /// A generic `onStatus` reply, used for publish/play/deleteStream
    /// acknowledgements.
    pub fn on_status(level: &str, code: &str, description: &str) -> RtmpFormatsResult<Vec<u8>> {
        let info = Value::Object {
            class_name: None,
            entries: vec![
                entry("level", Value::String(level.to_owned())),
                entry("code", Value::String(code.to_owned())),
                entry("description", Value::String(description.to_owned())),
            ],
        };
        encode_values(&[
            Value::String(consts::command_name::ON_STATUS.to_owned()),
            Value::Number(0.0),
            Value::Null,
            info,
        ])
    }
}
