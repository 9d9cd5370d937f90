//! The session itself: ties together the handshake, chunk parser, message
//! dispatch, and egress queue behind the small public surface a relay
//! drives (`start`, `close`, and the six callback registrations).

use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite};
use tracing::{debug, error, info, instrument, warn};

use crate::av;
use crate::byte_buffer::ByteBuffer;
use crate::callbacks::{SessionCallbacks, SessionId};
use crate::chunk::{self, ChunkParser, ParseOutcome};
use crate::commands;
use crate::config::SessionConfig;
use crate::control;
use crate::data;
use crate::egress::EgressQueue;
use crate::errors::{SessionError, SessionResult};
use crate::handshake;

const READ_CHUNK: usize = 4096;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Unresolved,
    Publisher,
    Subscriber,
}

/// Owns the socket, buffers, and chunk-stream table for one connection.
/// Exactly one execution context ever touches this struct: there are no
/// internal locks.
pub struct Session<S> {
    id: SessionId,
    pub(crate) stream: S,
    read_buf: ByteBuffer,
    parser: ChunkParser,
    egress: EgressQueue,
    pub(crate) local_chunk_size: u32,
    peer_win_ack_size: u32,
    pub(crate) role: Role,
    pub(crate) app_name: Option<String>,
    pub(crate) live_name: Option<String>,
    pub(crate) config: SessionConfig,
    pub(crate) callbacks: SessionCallbacks,
    closed: bool,
}

impl<S> Session<S>
where
    S: AsyncRead + AsyncWrite + Unpin + Send,
{
    pub fn new(stream: S, config: SessionConfig, id: SessionId) -> Self {
        Self {
            id,
            stream,
            read_buf: ByteBuffer::with_capacity(READ_CHUNK),
            parser: ChunkParser::new(128, config.max_chunk_streams),
            egress: EgressQueue::new(),
            local_chunk_size: 128,
            peer_win_ack_size: 0,
            role: Role::Unresolved,
            app_name: None,
            live_name: None,
            config,
            callbacks: SessionCallbacks::new(),
            closed: false,
        }
    }

    pub fn id(&self) -> SessionId {
        self.id
    }

    pub fn role(&self) -> Role {
        self.role
    }

    pub fn app_name(&self) -> Option<&str> {
        self.app_name.as_deref()
    }

    pub fn live_name(&self) -> Option<&str> {
        self.live_name.as_deref()
    }

    pub fn on_publish(&mut self, cb: impl FnMut(SessionId, &str) + Send + 'static) {
        self.callbacks.set_publish(cb);
    }

    pub fn on_play(&mut self, cb: impl FnMut(SessionId, &str) + Send + 'static) {
        self.callbacks.set_play(cb);
    }

    pub fn on_publish_stop(&mut self, cb: impl FnMut(SessionId, &str) + Send + 'static) {
        self.callbacks.set_publish_stop(cb);
    }

    pub fn on_session_close(&mut self, cb: impl FnMut(SessionId) + Send + 'static) {
        self.callbacks.set_session_close(cb);
    }

    pub fn on_metadata(
        &mut self,
        cb: impl FnMut(SessionId, &[u8], usize, usize, &std::collections::HashMap<String, amf::amf0::Value>)
        + Send
        + 'static,
    ) {
        self.callbacks.set_metadata(cb);
    }

    pub fn on_av_data(
        &mut self,
        cb: impl FnMut(SessionId, &[u8], chunk::RtmpHeader) + Send + 'static,
    ) {
        self.callbacks.set_av_data(cb);
    }

    /// Begins the handshake and runs the session to completion: returns
    /// once the peer closes the connection or a fatal error occurs. Always
    /// invokes the close callback exactly once before returning, whatever
    /// the outcome.
    #[instrument(skip(self), fields(session_id = self.id))]
    pub async fn start(&mut self) -> SessionResult<()> {
        let outcome = self.run().await;
        self.close().await;
        match outcome {
            Ok(()) | Err(SessionError::PeerClosed) => Ok(()),
            Err(e) => Err(e),
        }
    }

    async fn run(&mut self) -> SessionResult<()> {
        handshake::run_server_handshake(&mut self.stream).await?;
        debug!("handshake complete, entering chunk read loop");

        loop {
            loop {
                let outcome = self.parser.parse_next(self.read_buf.readable())?;
                match outcome {
                    ParseOutcome::NeedMore => break,
                    ParseOutcome::Consumed { n, message } => {
                        self.read_buf.erase(n);
                        if let Some((header, payload)) = message {
                            self.dispatch(header, payload).await?;
                        }
                    }
                }
            }

            let slice = self.read_buf.writable_slice(READ_CHUNK);
            let n = self.stream.read(slice).await?;
            if n == 0 {
                return Err(SessionError::PeerClosed);
            }
            self.read_buf.seek_write_pos(n);
        }
    }

    async fn dispatch(&mut self, header: chunk::RtmpHeader, payload: Vec<u8>) -> SessionResult<()> {
        use rtmp_formats::consts::message_type;

        match header.msg_type_id {
            1 | 2 | 3 | 4 | 5 | 6 => {
                control::handle(
                    header.msg_type_id,
                    &payload,
                    &mut self.parser,
                    &mut self.peer_win_ack_size,
                )
            }
            t if t == message_type::AUDIO || t == message_type::VIDEO => {
                av::handle(self, header, payload);
                Ok(())
            }
            t if t == message_type::DATA_AMF0 => data::handle(self, &payload).await,
            t if t == message_type::COMMAND_AMF0 => commands::handle(self, &payload).await,
            other => Err(SessionError::protocol(format!(
                "unknown message type id {other}"
            ))),
        }
    }

    /// Reframes `payload` under `header`'s own csid/timestamp and flushes it
    /// before returning. This is how a relay forwards a publisher's AV
    /// message on to a subscriber session: the header travels with the
    /// packet, so the subscriber doesn't need to know the publisher's
    /// chunk-stream assignment.
    pub async fn forward_av(&mut self, header: &chunk::RtmpHeader, payload: &[u8]) -> SessionResult<()> {
        let framed = chunk::frame_message(
            header.csid,
            header.msg_type_id,
            rtmp_formats::consts::MSID,
            header.timestamp,
            payload,
            self.local_chunk_size,
        );
        self.egress.push(framed);
        self.egress.drain(&mut self.stream).await
    }

    /// Frames `payload` as one message and flushes it before returning —
    /// used for every control/command reply so each is its own distinct
    /// write, never coalesced with what follows.
    pub(crate) async fn send_now(
        &mut self,
        csid: u32,
        msg_type_id: u8,
        payload: Vec<u8>,
    ) -> SessionResult<()> {
        let framed = chunk::frame_message(
            csid,
            msg_type_id,
            rtmp_formats::consts::MSID,
            0,
            &payload,
            self.local_chunk_size,
        );
        self.egress.push(framed);
        self.egress.drain(&mut self.stream).await
    }

    /// Idempotent: closing an already-closed session is a no-op besides
    /// firing nothing a second time.
    pub async fn close(&mut self) {
        if self.closed {
            return;
        }
        self.closed = true;
        let id = self.id;
        self.callbacks.fire_session_close(id);
        if let Err(e) = tokio::io::AsyncWriteExt::shutdown(&mut self.stream).await {
            warn!(error = %e, "error shutting down socket on close");
        }
        info!("session closed");
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use tokio::io::{AsyncWriteExt, duplex};

    fn encode(values: &[amf::amf0::Value]) -> Vec<u8> {
        let mut buf = Vec::new();
        for v in values {
            v.write_to(&mut buf).unwrap();
        }
        buf
    }

    #[tokio::test]
    async fn close_fires_the_close_callback_exactly_once() {
        let (a, _b) = duplex(4096);
        let mut session = Session::new(a, SessionConfig::default(), 42);
        let fired = std::sync::Arc::new(std::sync::atomic::AtomicUsize::new(0));
        let counter = fired.clone();
        session.on_session_close(move |_id| {
            counter.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
        });

        session.close().await;
        session.close().await;

        assert_eq!(fired.load(std::sync::atomic::Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn connect_create_stream_publish_yields_six_writes_in_order() {
        use amf::amf0::Value;

        let (server, mut client) = duplex(1 << 16);
        let mut session = Session::new(server, SessionConfig::default(), 1);

        let connect_payload = encode(&[
            Value::String("connect".to_owned()),
            Value::Number(1.0),
            Value::Object {
                class_name: None,
                entries: vec![amf::amf0::Entry {
                    key: "app".to_owned(),
                    value: Value::String("live".to_owned()),
                }],
            },
        ]);
        commands::handle(&mut session, &connect_payload).await.unwrap();
        assert_eq!(session.app_name(), Some("live"));

        let create_stream_payload = encode(&[
            Value::String("createStream".to_owned()),
            Value::Number(4.0),
            Value::Null,
        ]);
        commands::handle(&mut session, &create_stream_payload)
            .await
            .unwrap();

        let publish_payload = encode(&[
            Value::String("publish".to_owned()),
            Value::Number(0.0),
            Value::Null,
            Value::String("camera1".to_owned()),
            Value::String("live".to_owned()),
        ]);
        commands::handle(&mut session, &publish_payload).await.unwrap();

        drop(session);
        client.shutdown().await.ok();

        let mut written = Vec::new();
        tokio::io::AsyncReadExt::read_to_end(&mut client, &mut written)
            .await
            .unwrap();

        // Six distinct RTMP messages were written: each begins with a
        // type-0 basic header on either csid 2 (protocol control) or csid
        // 3 (command replies).
        let mut seen_csids = Vec::new();
        let mut parser = ChunkParser::new(4096, 16);
        let mut offset = 0;
        let mut completed = 0;
        while offset < written.len() {
            match parser.parse_next(&written[offset..]).unwrap() {
                ParseOutcome::Consumed { n, message } => {
                    offset += n;
                    if let Some((header, _)) = message {
                        seen_csids.push(header.csid);
                        completed += 1;
                    }
                }
                ParseOutcome::NeedMore => break,
            }
        }
        assert_eq!(completed, 6);
        assert_eq!(seen_csids, vec![2, 2, 2, 3, 3, 3]);
    }
}
