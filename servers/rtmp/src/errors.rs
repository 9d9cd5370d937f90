use std::io;

use rtmp_session::SessionError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RtmpServerError {
    #[error("io error: {0}")]
    Io(#[from] io::Error),
    #[error("session error: {0}")]
    Session(#[from] SessionError),
}

pub type RtmpServerResult<T> = Result<T, RtmpServerError>;
