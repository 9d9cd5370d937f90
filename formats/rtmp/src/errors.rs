use std::io;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum RtmpFormatsError {
    #[error("io error: {0}")]
    Io(#[from] io::Error),
    #[error("amf0 decode error: {0}")]
    Amf0Decode(String),
}

pub type RtmpFormatsResult<T> = Result<T, RtmpFormatsError>;
