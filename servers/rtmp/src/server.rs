//! TCP accept loop: one task per connection, wiring `rtmp-session`'s six
//! callbacks into the in-memory `Relay`. A minimal, single-process demo —
//! it ingests a publisher's AV/metadata into the relay and logs play
//! requests, but doesn't itself drive a subscriber's socket: that would mean
//! sharing one `Session` across the read loop and a forwarder task, which
//! is a bigger design than this workspace's "runnable, not just a library"
//! goal calls for. `Relay::subscribe` and `Session::forward_av` are the
//! building blocks a fuller server would use to close that loop.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use rtmp_session::{Session, SessionId};
use tokio::net::{TcpListener, TcpStream};
use tracing::{error, info, instrument, warn};

use crate::config::RtmpServerConfig;
use crate::errors::RtmpServerResult;
use crate::relay::{AvPacket, Relay};

pub struct RtmpServer {
    config: RtmpServerConfig,
    relay: Relay,
    next_id: Arc<AtomicU64>,
}

impl RtmpServer {
    pub fn new(config: RtmpServerConfig) -> Self {
        Self {
            config,
            relay: Relay::new(),
            next_id: Arc::new(AtomicU64::new(1)),
        }
    }

    pub fn relay(&self) -> Relay {
        self.relay.clone()
    }

    pub async fn run(&self) -> RtmpServerResult<()> {
        let listener = TcpListener::bind((self.config.address, self.config.port)).await?;
        info!(address = %self.config.address, port = self.config.port, "rtmp server listening");

        loop {
            let (socket, peer) = listener.accept().await?;
            let id = self.next_id.fetch_add(1, Ordering::Relaxed);
            info!(session_id = id, %peer, "accepted connection");
            let session_config = self.config.session.clone();
            let relay = self.relay.clone();
            tokio::spawn(async move {
                run_connection(socket, session_config, relay, id).await;
            });
        }
    }
}

#[instrument(skip(socket, config, relay), fields(session_id = id))]
async fn run_connection(
    socket: TcpStream,
    config: rtmp_session::SessionConfig,
    relay: Relay,
    id: SessionId,
) {
    if let Err(e) = socket.set_nodelay(true) {
        warn!(error = %e, "failed to set TCP_NODELAY");
    }

    let mut session = Session::new(socket, config, id);

    // Tracks which stream this session is publishing, so the av/metadata
    // callbacks (which only carry the session id, per the upward API) know
    // which relay bucket to fan out into.
    let publishing_as: Arc<Mutex<Option<String>>> = Arc::new(Mutex::new(None));

    {
        let publishing_as = publishing_as.clone();
        session.on_publish(move |_id, name| {
            info!(stream = name, "publisher attached");
            *publishing_as.lock().unwrap() = Some(name.to_owned());
        });
    }
    {
        let publishing_as = publishing_as.clone();
        let relay = relay.clone();
        session.on_publish_stop(move |_id, name| {
            info!(stream = name, "publisher detached");
            relay.remove_publisher(name);
            *publishing_as.lock().unwrap() = None;
        });
    }
    session.on_play(move |_id, name| {
        info!(stream = name, "subscriber requested playback");
    });
    {
        let publishing_as = publishing_as.clone();
        let relay = relay.clone();
        session.on_metadata(move |_id, _raw, _ptr, _len, decoded| {
            if let Some(name) = publishing_as.lock().unwrap().clone() {
                relay.publish_metadata(&name, decoded.clone());
            }
        });
    }
    {
        let relay = relay.clone();
        session.on_av_data(move |_id, payload, header| {
            if let Some(name) = publishing_as.lock().unwrap().clone() {
                relay.publish_av(
                    &name,
                    AvPacket {
                        header,
                        payload: Arc::new(payload.to_vec()),
                    },
                );
            }
        });
    }
    session.on_session_close(move |_id| {
        info!("session closed");
    });

    if let Err(e) = session.start().await {
        error!(error = %e, "session ended with error");
    }
}
