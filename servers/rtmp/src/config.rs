use std::net::IpAddr;

use rtmp_session::SessionConfig;
use serde::{Deserialize, Serialize};

/// Listener-level configuration: where to bind, and the per-session
/// defaults handed to every accepted connection. Connection-level read/write
/// timeouts are deliberately absent here, same as in `SessionConfig` — a
/// stalled peer just parks the accept task's read, it is never kicked by
/// the core.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RtmpServerConfig {
    pub address: IpAddr,
    pub port: u16,
    #[serde(flatten)]
    pub session: SessionConfig,
}

impl Default for RtmpServerConfig {
    fn default() -> Self {
        Self {
            address: IpAddr::from([0, 0, 0, 0]),
            port: 1935,
            session: SessionConfig::default(),
        }
    }
}
