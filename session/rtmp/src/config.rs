use serde::{Deserialize, Serialize};

/// Tunables for one session. Separate from `rtmp-server`'s listener config:
/// this is what the session core itself needs, independent of how a caller
/// accepted the socket.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Chunk size this side announces to the peer right after the
    /// handshake completes.
    pub local_chunk_size: u32,
    /// Window acknowledgement size announced on `connect`.
    pub window_ack_size: u32,
    /// Peer bandwidth announced on `connect`.
    pub peer_bandwidth: u32,
    /// 0 = Hard, 1 = Soft, 2 = Dynamic.
    pub peer_bandwidth_limit_type: u8,
    /// Upper bound on distinct chunk stream ids a session will track before
    /// treating further new ids as a protocol violation.
    pub max_chunk_streams: usize,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            local_chunk_size: 4096,
            window_ack_size: 2_500_000,
            peer_bandwidth: 2_500_000,
            peer_bandwidth_limit_type: 2,
            max_chunk_streams: 16,
        }
    }
}
