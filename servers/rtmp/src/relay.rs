//! In-memory stream registry: pairs one publisher with N subscribers per
//! stream key. No persistence, no cross-process fan-out — a single
//! process's publish/play demo, the simplest thing that exercises
//! `rtmp-session`'s six callbacks end to end.

use std::collections::HashMap;
use std::sync::Arc;

use amf::amf0::Value;
use dashmap::DashMap;
use rtmp_session::chunk::RtmpHeader;
use tokio::sync::broadcast;

const FANOUT_CAPACITY: usize = 1024;

/// One AV message, cheaply clonable so every subscriber's broadcast
/// receiver gets its own handle to the same bytes.
#[derive(Debug, Clone)]
pub struct AvPacket {
    pub header: RtmpHeader,
    pub payload: Arc<Vec<u8>>,
}

/// What a late-joining subscriber needs to catch up on: the most recent
/// metadata and, since interleaved AV carries no separate "sequence header"
/// concept here, nothing else — this is a demo relay, not a GOP cache.
#[derive(Default)]
struct StreamState {
    metadata: Option<Arc<HashMap<String, Value>>>,
    sender: Option<broadcast::Sender<AvPacket>>,
}

/// Keyed by stream (publishing) name. Cheaply cloned: every session task
/// holds its own handle to the same underlying map.
#[derive(Clone, Default)]
pub struct Relay {
    streams: Arc<DashMap<String, StreamState>>,
}

impl Relay {
    pub fn new() -> Self {
        Self::default()
    }

    /// Called from a publisher's `on_av_data` callback: fans the packet out
    /// to whatever subscribers are currently attached. Silently drops if
    /// nobody has subscribed yet — `broadcast::Sender::send` only errors
    /// when there are zero receivers, which is the normal "nobody is
    /// watching" case here.
    pub fn publish_av(&self, name: &str, packet: AvPacket) {
        // Fast path: `get_mut` alone is an atomic lock-check-mutate, so the
        // common case (stream already registered) costs no allocation and
        // no separate insert. Only the miss falls back to the allocating
        // `entry().or_default()` — still atomic, so a concurrent `subscribe`
        // racing to create the same entry can't have its sender clobbered.
        if let Some(mut state) = self.streams.get_mut(name) {
            let sender = state
                .sender
                .get_or_insert_with(|| broadcast::channel(FANOUT_CAPACITY).0);
            let _ = sender.send(packet);
            return;
        }
        let mut state = self.streams.entry(name.to_owned()).or_default();
        let sender = state
            .sender
            .get_or_insert_with(|| broadcast::channel(FANOUT_CAPACITY).0);
        let _ = sender.send(packet);
    }

    pub fn publish_metadata(&self, name: &str, metadata: HashMap<String, Value>) {
        let mut entry = self.streams.entry(name.to_owned()).or_default();
        entry.metadata = Some(Arc::new(metadata));
    }

    /// Subscribes to a stream's live AV fan-out, creating the channel if no
    /// publisher has shown up yet (a subscriber may arrive first).
    pub fn subscribe(&self, name: &str) -> broadcast::Receiver<AvPacket> {
        let mut entry = self.streams.entry(name.to_owned()).or_default();
        if let Some(sender) = &entry.sender {
            sender.subscribe()
        } else {
            let (tx, rx) = broadcast::channel(FANOUT_CAPACITY);
            entry.sender = Some(tx);
            rx
        }
    }

    pub fn cached_metadata(&self, name: &str) -> Option<Arc<HashMap<String, Value>>> {
        self.streams.get(name).and_then(|s| s.metadata.clone())
    }

    pub fn remove_publisher(&self, name: &str) {
        self.streams.remove(name);
    }
}
