use std::io;

use thiserror::Error;

/// Fatal outcomes for a session. `NeedMoreData` is deliberately not a
/// variant here — it is represented at the type level by returning
/// `Ok(None)` from the parser, so callers cannot accidentally log it as a
/// failure or propagate it past the read loop.
#[derive(Debug, Error)]
pub enum SessionError {
    /// The peer closed the connection cleanly (EOF, or a zero-length read).
    #[error("peer closed the connection")]
    PeerClosed,

    /// The transport misbehaved: a read/write error other than EOF, or a
    /// read/write timeout.
    #[error("transport error: {0}")]
    Transport(#[from] io::Error),

    /// The peer sent bytes that cannot be interpreted as valid RTMP: bad
    /// handshake signature, unknown message type, malformed AMF0, a CSID
    /// count over the session's cap, or a command sent with the wrong
    /// transaction id. Fatal; the session is closed.
    #[error("protocol violation: {0}")]
    Protocol(String),

    #[error("amf encode/decode error: {0}")]
    Amf(#[from] rtmp_formats::RtmpFormatsError),
}

pub type SessionResult<T> = Result<T, SessionError>;

impl SessionError {
    pub fn protocol(msg: impl Into<String>) -> Self {
        SessionError::Protocol(msg.into())
    }
}
