//! Server-side RTMP session core: handshake, chunk-stream reassembly,
//! command/control dispatch, and the upward callbacks a relay registers to
//! learn about publish/play/metadata/AV events.

pub mod av;
pub mod byte_buffer;
pub mod callbacks;
pub mod chunk;
pub mod commands;
pub mod config;
pub mod control;
pub mod data;
pub mod egress;
pub mod errors;
pub mod handshake;
pub mod session;

pub use callbacks::SessionId;
pub use config::SessionConfig;
pub use errors::{SessionError, SessionResult};
pub use session::{Role, Session};
