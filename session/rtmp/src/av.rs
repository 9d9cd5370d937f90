//! Audio/video message (msg_type_id 8/9) handling. The session never
//! retains the payload past handoff to the callback.

use rtmp_formats::consts::csid;

use crate::chunk::RtmpHeader;
use crate::session::Session;
use tokio::io::{AsyncRead, AsyncWrite};

pub fn handle<S>(session: &mut Session<S>, header: RtmpHeader, payload: Vec<u8>)
where
    S: AsyncRead + AsyncWrite + Unpin + Send,
{
    let canonical = RtmpHeader {
        csid: if header.msg_type_id == 8 {
            csid::AUDIO
        } else {
            csid::VIDEO
        },
        timestamp: header.timestamp,
        msg_len: payload.len() as u32,
        msg_type_id: header.msg_type_id,
        msg_stream_id: rtmp_formats::consts::MSID,
    };
    let id = session.id();
    session.callbacks.fire_av_data(id, &payload, canonical);
}
