//! Data message (msg_type_id 18) handling: `@setDataFrame` / `onMetaData`.

use std::collections::HashMap;

use amf::amf0::Value;
use rtmp_formats::consts::command_name;
use tracing::warn;

use crate::errors::SessionResult;
use crate::session::Session;
use tokio::io::{AsyncRead, AsyncWrite};

/// Any deviation from the expected `@setDataFrame`, `onMetaData`, ECMA-array
/// shape is logged and the whole message is dropped — this is not a
/// protocol violation, just data this session core doesn't understand.
pub async fn handle<S>(session: &mut Session<S>, payload: &[u8]) -> SessionResult<()>
where
    S: AsyncRead + AsyncWrite + Unpin + Send,
{
    let values = match rtmp_formats::amf0::decode_all(payload) {
        Ok(v) => v,
        Err(e) => {
            warn!(error = ?e, "data message failed to decode, dropped");
            return Ok(());
        }
    };

    let Some(Value::String(first)) = values.first() else {
        warn!("data message did not start with a string, dropped");
        return Ok(());
    };
    if first != command_name::SET_DATA_FRAME {
        warn!(name = %first, "data message is not @setDataFrame, dropped");
        return Ok(());
    }
    let Some(Value::String(second)) = values.get(1) else {
        warn!("data message missing onMetaData marker, dropped");
        return Ok(());
    };
    if second != command_name::ON_METADATA {
        warn!(name = %second, "data message did not carry onMetaData, dropped");
        return Ok(());
    }
    let Some(array @ Value::EcmaArray { .. }) = values.get(2) else {
        warn!("onMetaData was not followed by an ECMA array, dropped");
        return Ok(());
    };

    let mut decoded = HashMap::new();
    if let Value::EcmaArray { entries } = array {
        for entry in entries {
            decoded.insert(entry.key.clone(), entry.value.clone());
        }
    }

    let meta_ptr = rtmp_formats::amf0::encoded_len(&values[0]);
    let meta_len = payload.len().saturating_sub(meta_ptr);
    let id = session.id();
    session
        .callbacks
        .fire_metadata(id, payload, meta_ptr, meta_len, &decoded);
    Ok(())
}
