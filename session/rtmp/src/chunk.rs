//! Chunk-stream table and parser: turns a byte stream into fully
//! reassembled RTMP messages. Resumable at byte granularity — if fewer
//! bytes are available than a chunk needs, [`ChunkParser::parse_next`]
//! returns [`ParseOutcome::NeedMore`] without consuming anything from the
//! slice it was given.

use std::collections::HashMap;

use crate::errors::{SessionError, SessionResult};

/// A fully decoded chunk (or message) header: csid, absolute timestamp,
/// declared message length, message type id, and message stream id.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RtmpHeader {
    pub csid: u32,
    pub timestamp: u32,
    pub msg_len: u32,
    pub msg_type_id: u8,
    pub msg_stream_id: u32,
}

/// Per-CSID state: the last full header seen (for fmt 1/2/3 inheritance)
/// and the in-progress reassembly buffer for the current message.
#[derive(Debug, Default)]
struct ChunkStreamState {
    last_header: Option<RtmpHeader>,
    extended_timestamp_enabled: bool,
    buffer: Vec<u8>,
}

/// The header-done latch: once a chunk's header has been decoded, we hold
/// onto it here so a resumption (not enough payload bytes yet) skips
/// straight back to copying payload instead of re-decoding the header.
struct PendingChunk {
    header: RtmpHeader,
    header_len: usize,
    payload_needed: usize,
}

pub enum ParseOutcome {
    NeedMore,
    Consumed {
        n: usize,
        message: Option<(RtmpHeader, Vec<u8>)>,
    },
}

pub struct ChunkParser {
    streams: HashMap<u32, ChunkStreamState>,
    peer_chunk_size: u32,
    max_chunk_streams: usize,
    pending: Option<PendingChunk>,
}

fn read_u24_be(b: &[u8]) -> u32 {
    (b[0] as u32) << 16 | (b[1] as u32) << 8 | b[2] as u32
}

fn write_u24_be(buf: &mut Vec<u8>, v: u32) {
    buf.extend_from_slice(&v.to_be_bytes()[1..]);
}

fn write_basic_header(buf: &mut Vec<u8>, fmt: u8, csid: u32) {
    if csid < 64 {
        buf.push((fmt << 6) | csid as u8);
    } else if csid <= 319 {
        buf.push(fmt << 6);
        buf.push((csid - 64) as u8);
    } else {
        buf.push((fmt << 6) | 1);
        let value = csid - 64;
        buf.push((value & 0xFF) as u8);
        buf.push(((value >> 8) & 0xFF) as u8);
    }
}

/// Frames one outbound RTMP message as a single chunk stream: a type-0
/// header for the first `local_chunk_size` bytes, then type-3 continuation
/// chunks for the rest. Used for every reply this session core sends —
/// control acknowledgements, command replies, and forwarded AV frames.
pub fn frame_message(
    csid: u32,
    msg_type_id: u8,
    msg_stream_id: u32,
    timestamp: u32,
    payload: &[u8],
    local_chunk_size: u32,
) -> Vec<u8> {
    let chunk_size = (local_chunk_size.max(1)) as usize;
    let msg_len = payload.len() as u32;
    let has_ext = timestamp >= 0xFFFFFF;

    let mut out = Vec::with_capacity(payload.len() + 16);
    write_basic_header(&mut out, 0, csid);
    write_u24_be(&mut out, if has_ext { 0xFFFFFF } else { timestamp });
    write_u24_be(&mut out, msg_len);
    out.push(msg_type_id);
    out.extend_from_slice(&msg_stream_id.to_le_bytes());
    if has_ext {
        out.extend_from_slice(&timestamp.to_be_bytes());
    }

    let mut offset = 0usize;
    let first_len = chunk_size.min(payload.len());
    out.extend_from_slice(&payload[offset..offset + first_len]);
    offset += first_len;

    while offset < payload.len() {
        write_basic_header(&mut out, 3, csid);
        if has_ext {
            out.extend_from_slice(&timestamp.to_be_bytes());
        }
        let len = chunk_size.min(payload.len() - offset);
        out.extend_from_slice(&payload[offset..offset + len]);
        offset += len;
    }

    out
}

impl ChunkParser {
    pub fn new(initial_peer_chunk_size: u32, max_chunk_streams: usize) -> Self {
        Self {
            streams: HashMap::new(),
            peer_chunk_size: initial_peer_chunk_size,
            max_chunk_streams,
            pending: None,
        }
    }

    pub fn set_peer_chunk_size(&mut self, size: u32) {
        self.peer_chunk_size = size.max(1);
    }

    /// Attempt to advance by exactly one chunk. Returns `NeedMore` without
    /// consuming anything if `input` does not yet hold a whole chunk;
    /// otherwise returns how many bytes were consumed and, if the message
    /// this chunk belongs to is now complete, the assembled message.
    pub fn parse_next(&mut self, input: &[u8]) -> SessionResult<ParseOutcome> {
        let pending = match self.pending.take() {
            Some(p) => p,
            None => match self.parse_header(input)? {
                Some(p) => p,
                None => return Ok(ParseOutcome::NeedMore),
            },
        };

        let total_needed = pending.header_len + pending.payload_needed;
        if input.len() < total_needed {
            self.pending = Some(pending);
            return Ok(ParseOutcome::NeedMore);
        }

        let payload_slice = &input[pending.header_len..total_needed];
        let state = self
            .streams
            .get_mut(&pending.header.csid)
            .expect("chunk stream must exist once header is parsed");
        state.buffer.extend_from_slice(payload_slice);

        let message = if state.buffer.len() as u32 == pending.header.msg_len {
            Some((pending.header, std::mem::take(&mut state.buffer)))
        } else {
            None
        };

        Ok(ParseOutcome::Consumed {
            n: total_needed,
            message,
        })
    }

    fn parse_header(&mut self, input: &[u8]) -> SessionResult<Option<PendingChunk>> {
        if input.is_empty() {
            return Ok(None);
        }
        let first = input[0];
        let fmt = first >> 6;
        let csid_hint = first & 0x3F;

        let (csid, basic_len) = match csid_hint {
            0 => {
                if input.len() < 2 {
                    return Ok(None);
                }
                (64 + input[1] as u32, 2)
            }
            1 => {
                if input.len() < 3 {
                    return Ok(None);
                }
                (64 + input[1] as u32 + 256 * input[2] as u32, 3)
            }
            hint => (hint as u32, 1),
        };

        let msg_header_len = match fmt {
            0 => 11,
            1 => 7,
            2 => 3,
            3 => 0,
            _ => unreachable!("fmt is 2 bits"),
        };
        if input.len() < basic_len + msg_header_len {
            return Ok(None);
        }
        let mh = &input[basic_len..basic_len + msg_header_len];

        let is_new_stream = !self.streams.contains_key(&csid);
        if is_new_stream {
            if fmt != 0 {
                return Err(SessionError::protocol(format!(
                    "csid {csid} used with fmt {fmt} before any type-0 header"
                )));
            }
            if self.streams.len() >= self.max_chunk_streams {
                return Err(SessionError::protocol(format!(
                    "too many distinct chunk stream ids (cap {})",
                    self.max_chunk_streams
                )));
            }
        }
        // Only fmt 3 may continue a message that's still being reassembled;
        // any other fmt arriving mid-message would shrink or replace
        // `msg_len` out from under the bytes already buffered for it.
        if fmt != 3 {
            let mid_message = self
                .streams
                .get(&csid)
                .map(|s| !s.buffer.is_empty())
                .unwrap_or(false);
            if mid_message {
                return Err(SessionError::protocol(format!(
                    "csid {csid}: fmt {fmt} header arrived before the in-progress message finished"
                )));
            }
        }
        let prev = self.streams.entry(csid).or_default().last_header;
        let prev_ext_enabled = self
            .streams
            .get(&csid)
            .map(|s| s.extended_timestamp_enabled)
            .unwrap_or(false);

        let (ts_field_or_delta, msg_len, msg_type_id, msg_stream_id) = match fmt {
            0 => (
                read_u24_be(&mh[0..3]),
                read_u24_be(&mh[3..6]),
                mh[6],
                u32::from_le_bytes([mh[7], mh[8], mh[9], mh[10]]),
            ),
            1 => {
                let prev = prev.ok_or_else(|| {
                    SessionError::protocol(format!("csid {csid}: fmt 1 with no prior header"))
                })?;
                (
                    read_u24_be(&mh[0..3]),
                    read_u24_be(&mh[3..6]),
                    mh[6],
                    prev.msg_stream_id,
                )
            }
            2 => {
                let prev = prev.ok_or_else(|| {
                    SessionError::protocol(format!("csid {csid}: fmt 2 with no prior header"))
                })?;
                (
                    read_u24_be(&mh[0..3]),
                    prev.msg_len,
                    prev.msg_type_id,
                    prev.msg_stream_id,
                )
            }
            3 => {
                let prev = prev.ok_or_else(|| {
                    SessionError::protocol(format!("csid {csid}: fmt 3 with no prior header"))
                })?;
                (0, prev.msg_len, prev.msg_type_id, prev.msg_stream_id)
            }
            _ => unreachable!(),
        };

        let wants_ext = if fmt == 3 {
            prev_ext_enabled
        } else {
            ts_field_or_delta == 0xFFFFFF
        };
        let ext_len = if wants_ext { 4 } else { 0 };
        if input.len() < basic_len + msg_header_len + ext_len {
            return Ok(None);
        }
        let ext_value = if wants_ext {
            let b = &input[basic_len + msg_header_len..basic_len + msg_header_len + 4];
            Some(u32::from_be_bytes([b[0], b[1], b[2], b[3]]))
        } else {
            None
        };

        let timestamp = match fmt {
            0 => ext_value.unwrap_or(ts_field_or_delta),
            1 | 2 => {
                let delta = ext_value.unwrap_or(ts_field_or_delta);
                prev.expect("checked above").timestamp.wrapping_add(delta)
            }
            3 => prev.expect("checked above").timestamp,
            _ => unreachable!(),
        };

        let extended_timestamp_enabled = if fmt == 3 {
            prev_ext_enabled
        } else {
            ext_value.is_some()
        };

        let header = RtmpHeader {
            csid,
            timestamp,
            msg_len,
            msg_type_id,
            msg_stream_id,
        };

        let state = self.streams.get_mut(&csid).expect("just inserted above");
        state.last_header = Some(header);
        state.extended_timestamp_enabled = extended_timestamp_enabled;

        let already_buffered = state.buffer.len();
        let remaining = (msg_len as usize).checked_sub(already_buffered).ok_or_else(|| {
            SessionError::protocol(format!(
                "csid {csid}: msg_len {msg_len} smaller than the {already_buffered} bytes already buffered"
            ))
        })?;
        let payload_needed = (self.peer_chunk_size as usize).min(remaining);

        Ok(Some(PendingChunk {
            header,
            header_len: basic_len + msg_header_len + ext_len,
            payload_needed,
        }))
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn frame_then_parse_reproduces_header_and_payload() {
        let payload = b"hello rtmp".to_vec();
        let wire = frame_message(3, 20, 1, 1234, &payload, 4096);

        let mut parser = ChunkParser::new(4096, 16);
        match parser.parse_next(&wire).unwrap() {
            ParseOutcome::Consumed { n, message } => {
                assert_eq!(n, wire.len());
                let (header, body) = message.unwrap();
                assert_eq!(header.timestamp, 1234);
                assert_eq!(header.msg_len, payload.len() as u32);
                assert_eq!(header.msg_type_id, 20);
                assert_eq!(header.msg_stream_id, 1);
                assert_eq!(body, payload);
            }
            ParseOutcome::NeedMore => panic!(),
        }
    }

    #[test]
    fn frame_message_splits_across_local_chunk_size() {
        let payload = vec![0x42u8; 2500];
        let wire = frame_message(4, 9, 1, 0, &payload, 1000);

        let mut parser = ChunkParser::new(1000, 16);
        let mut offset = 0;
        let mut assembled = None;
        loop {
            match parser.parse_next(&wire[offset..]).unwrap() {
                ParseOutcome::Consumed { n, message } => {
                    offset += n;
                    if message.is_some() {
                        assembled = message;
                        break;
                    }
                }
                ParseOutcome::NeedMore => panic!(),
            }
        }
        assert_eq!(assembled.unwrap().1, payload);
    }

    fn fmt0_header(csid: u32, timestamp: u32, msg_len: u32, msg_type_id: u8, msid: u32) -> Vec<u8> {
        let mut v = vec![(0u8 << 6) | csid as u8];
        v.extend_from_slice(&timestamp.to_be_bytes()[1..]);
        v.extend_from_slice(&msg_len.to_be_bytes()[1..]);
        v.push(msg_type_id);
        v.extend_from_slice(&msid.to_le_bytes());
        v
    }

    #[test]
    fn single_chunk_message_is_delivered_whole() {
        let mut parser = ChunkParser::new(128, 16);
        let mut wire = fmt0_header(5, 0, 4, 1, 1);
        wire.extend_from_slice(&[0, 0, 4, 0]); // set chunk size payload

        match parser.parse_next(&wire).unwrap() {
            ParseOutcome::Consumed { n, message } => {
                assert_eq!(n, wire.len());
                let (header, payload) = message.expect("message complete");
                assert_eq!(header.csid, 5);
                assert_eq!(header.msg_len, 4);
                assert_eq!(payload, vec![0, 0, 4, 0]);
            }
            ParseOutcome::NeedMore => panic!("expected a complete chunk"),
        }
    }

    #[test]
    fn csid_encoding_matches_spec_examples() {
        let mut parser = ChunkParser::new(128, 16);
        // 0x00 0x05 -> csid 69
        let mut wire = vec![0x00u8, 0x05];
        wire.extend_from_slice(&0u32.to_be_bytes()[1..]);
        wire.extend_from_slice(&1u32.to_be_bytes()[1..]);
        wire.push(20);
        wire.extend_from_slice(&1u32.to_le_bytes());
        wire.push(0xAA);
        match parser.parse_next(&wire).unwrap() {
            ParseOutcome::Consumed { message, .. } => {
                assert_eq!(message.unwrap().0.csid, 69);
            }
            ParseOutcome::NeedMore => panic!(),
        }

        let mut parser = ChunkParser::new(128, 16);
        // 0x01 0x00 0x01 -> csid 320
        let mut wire = vec![0x01u8, 0x00, 0x01];
        wire.extend_from_slice(&0u32.to_be_bytes()[1..]);
        wire.extend_from_slice(&1u32.to_be_bytes()[1..]);
        wire.push(20);
        wire.extend_from_slice(&1u32.to_le_bytes());
        wire.push(0xAA);
        match parser.parse_next(&wire).unwrap() {
            ParseOutcome::Consumed { message, .. } => {
                assert_eq!(message.unwrap().0.csid, 320);
            }
            ParseOutcome::NeedMore => panic!(),
        }
    }

    #[test]
    fn extended_timestamp_is_applied() {
        let mut parser = ChunkParser::new(128, 16);
        let mut wire = vec![0x05u8];
        wire.extend_from_slice(&0xFFFFFFu32.to_be_bytes()[1..]);
        wire.extend_from_slice(&1u32.to_be_bytes()[1..]);
        wire.push(20);
        wire.extend_from_slice(&1u32.to_le_bytes());
        wire.extend_from_slice(&0x0100_0000u32.to_be_bytes());
        wire.push(0xAA);

        match parser.parse_next(&wire).unwrap() {
            ParseOutcome::Consumed { message, .. } => {
                assert_eq!(message.unwrap().0.timestamp, 16_777_216);
            }
            ParseOutcome::NeedMore => panic!(),
        }
    }

    #[test]
    fn message_split_across_three_chunks_reassembles() {
        let mut parser = ChunkParser::new(1000, 16);
        let mut wire = fmt0_header(4, 0, 3000, 8, 1);
        wire.extend(vec![0xAAu8; 1000]);
        // fmt=3 continuation, same csid
        wire.push(3 << 6 | 4);
        wire.extend(vec![0xBBu8; 1000]);
        wire.push(3 << 6 | 4);
        wire.extend(vec![0xCCu8; 1000]);

        let mut offset = 0;
        let mut assembled = None;
        loop {
            match parser.parse_next(&wire[offset..]).unwrap() {
                ParseOutcome::Consumed { n, message } => {
                    offset += n;
                    if message.is_some() {
                        assembled = message;
                        break;
                    }
                }
                ParseOutcome::NeedMore => panic!("wire should have been complete"),
            }
        }
        let (header, payload) = assembled.unwrap();
        assert_eq!(header.msg_len, 3000);
        assert_eq!(payload.len(), 3000);
        assert_eq!(&payload[0..1000], &[0xAAu8; 1000][..]);
        assert_eq!(&payload[1000..2000], &[0xBBu8; 1000][..]);
        assert_eq!(&payload[2000..3000], &[0xCCu8; 1000][..]);
    }

    #[test]
    fn fragmenting_input_yields_need_more_then_same_result() {
        let mut parser = ChunkParser::new(128, 16);
        let wire = {
            let mut v = fmt0_header(5, 0, 4, 1, 1);
            v.extend_from_slice(&[0, 0, 4, 0]);
            v
        };

        // Feed one byte at a time; only the final call should complete.
        for i in 1..wire.len() {
            match parser.parse_next(&wire[..i]).unwrap() {
                ParseOutcome::NeedMore => {}
                ParseOutcome::Consumed { .. } => panic!("should not complete early at {i}"),
            }
        }
        match parser.parse_next(&wire).unwrap() {
            ParseOutcome::Consumed { n, message } => {
                assert_eq!(n, wire.len());
                assert!(message.is_some());
            }
            ParseOutcome::NeedMore => panic!(),
        }
    }

    #[test]
    fn new_header_mid_message_on_same_csid_is_a_protocol_violation() {
        let mut parser = ChunkParser::new(128, 16);

        // First chunk of a 200-byte message on csid 7: only 128 bytes land,
        // leaving the message incomplete and the csid's buffer non-empty.
        let first = {
            let mut v = fmt0_header(7, 0, 200, 1, 1);
            v.extend_from_slice(&[0xAAu8; 128]);
            v
        };
        match parser.parse_next(&first).unwrap() {
            ParseOutcome::Consumed { n, message } => {
                assert_eq!(n, first.len());
                assert!(message.is_none());
            }
            ParseOutcome::NeedMore => panic!(),
        }

        // A fresh fmt 0 header on the same csid, declaring a message shorter
        // than what's already buffered, must not be allowed to continue —
        // it would otherwise underflow `msg_len - already_buffered`.
        let second = fmt0_header(7, 0, 50, 1, 1);
        let err = parser.parse_next(&second).unwrap_err();
        assert!(matches!(err, SessionError::Protocol(_)));
    }
}
