//! A minimal, single-process RTMP server: accepts connections, runs each
//! through `rtmp-session`, and relays publishers to subscribers in memory.
//! Exists so the workspace has a runnable binary, not just a library.

pub mod config;
pub mod errors;
pub mod relay;
pub mod server;

pub use config::RtmpServerConfig;
pub use errors::{RtmpServerError, RtmpServerResult};
pub use relay::Relay;
pub use server::RtmpServer;
