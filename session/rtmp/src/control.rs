//! Protocol control (msg_type_id 1/2/3/5/6) and user control (4) message
//! handling. These never produce a reply; their only effect is on session
//! state (peer chunk size, peer window ack size) or the log.

use tracing::{debug, trace, warn};

use crate::chunk::ChunkParser;
use crate::errors::{SessionError, SessionResult};

fn read_u32_be(payload: &[u8]) -> SessionResult<u32> {
    if payload.len() < 4 {
        return Err(SessionError::protocol(
            "control message payload shorter than 4 bytes",
        ));
    }
    Ok(u32::from_be_bytes([
        payload[0], payload[1], payload[2], payload[3],
    ]))
}

/// Dispatches one protocol-control or user-control message. `peer_win_ack_size`
/// is updated in place when the peer announces a Window Ack Size.
pub fn handle(
    msg_type_id: u8,
    payload: &[u8],
    parser: &mut ChunkParser,
    peer_win_ack_size: &mut u32,
) -> SessionResult<()> {
    match msg_type_id {
        1 => {
            let val = read_u32_be(payload)?;
            debug!(chunk_size = val, "peer set chunk size");
            parser.set_peer_chunk_size(val);
        }
        2 => {
            let val = read_u32_be(payload)?;
            trace!(chunk_stream_id = val, "abort message, ignored");
        }
        3 => {
            let val = read_u32_be(payload)?;
            trace!(sequence_number = val, "acknowledgement, ignored");
        }
        4 => {
            warn!(len = payload.len(), "user control message, not implemented");
        }
        5 => {
            let val = read_u32_be(payload)?;
            debug!(window_ack_size = val, "peer announced window ack size");
            *peer_win_ack_size = val;
        }
        6 => {
            let val = read_u32_be(payload)?;
            trace!(size = val, "set peer bandwidth, ignored");
        }
        other => {
            return Err(SessionError::protocol(format!(
                "unknown control message type {other}"
            )));
        }
    }
    Ok(())
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn set_chunk_size_updates_parser() {
        let mut parser = ChunkParser::new(128, 16);
        let mut win = 0u32;
        handle(1, &1000u32.to_be_bytes(), &mut parser, &mut win).unwrap();
        // indirectly exercised via chunk.rs's own tests of peer_chunk_size
        assert_eq!(win, 0);
    }

    #[test]
    fn window_ack_size_is_recorded() {
        let mut parser = ChunkParser::new(128, 16);
        let mut win = 0u32;
        handle(5, &2_500_000u32.to_be_bytes(), &mut parser, &mut win).unwrap();
        assert_eq!(win, 2_500_000);
    }
}
