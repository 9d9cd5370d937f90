//! The six upward hooks a relay registers on a session. Each is
//! set-once-overwrite: registering again simply replaces the previous
//! closure. Closures are `Send` because a relay may be driven from a
//! different task than the one running this session.

use std::collections::HashMap;

use amf::amf0::Value;

use crate::chunk::RtmpHeader;

pub type SessionId = u64;

type PublishCb = Box<dyn FnMut(SessionId, &str) + Send>;
type PlayCb = Box<dyn FnMut(SessionId, &str) + Send>;
type PublishStopCb = Box<dyn FnMut(SessionId, &str) + Send>;
type SessionCloseCb = Box<dyn FnMut(SessionId) + Send>;
type MetadataCb = Box<dyn FnMut(SessionId, &[u8], usize, usize, &HashMap<String, Value>) + Send>;
type AvDataCb = Box<dyn FnMut(SessionId, &[u8], RtmpHeader) + Send>;

#[derive(Default)]
pub struct SessionCallbacks {
    publish: Option<PublishCb>,
    play: Option<PlayCb>,
    publish_stop: Option<PublishStopCb>,
    session_close: Option<SessionCloseCb>,
    metadata: Option<MetadataCb>,
    av_data: Option<AvDataCb>,
}

impl SessionCallbacks {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_publish(&mut self, cb: impl FnMut(SessionId, &str) + Send + 'static) {
        self.publish = Some(Box::new(cb));
    }

    pub fn set_play(&mut self, cb: impl FnMut(SessionId, &str) + Send + 'static) {
        self.play = Some(Box::new(cb));
    }

    pub fn set_publish_stop(&mut self, cb: impl FnMut(SessionId, &str) + Send + 'static) {
        self.publish_stop = Some(Box::new(cb));
    }

    pub fn set_session_close(&mut self, cb: impl FnMut(SessionId) + Send + 'static) {
        self.session_close = Some(Box::new(cb));
    }

    pub fn set_metadata(
        &mut self,
        cb: impl FnMut(SessionId, &[u8], usize, usize, &HashMap<String, Value>) + Send + 'static,
    ) {
        self.metadata = Some(Box::new(cb));
    }

    pub fn set_av_data(
        &mut self,
        cb: impl FnMut(SessionId, &[u8], RtmpHeader) + Send + 'static,
    ) {
        self.av_data = Some(Box::new(cb));
    }

    pub fn fire_publish(&mut self, id: SessionId, live_name: &str) {
        if let Some(cb) = self.publish.as_mut() {
            cb(id, live_name);
        }
    }

    pub fn fire_play(&mut self, id: SessionId, live_name: &str) {
        if let Some(cb) = self.play.as_mut() {
            cb(id, live_name);
        }
    }

    pub fn fire_publish_stop(&mut self, id: SessionId, live_name: &str) {
        if let Some(cb) = self.publish_stop.as_mut() {
            cb(id, live_name);
        }
    }

    /// Invoked exactly once per session, regardless of how many times
    /// `close()` is called.
    pub fn fire_session_close(&mut self, id: SessionId) {
        if let Some(cb) = self.session_close.as_mut() {
            cb(id);
        }
    }

    pub fn fire_metadata(
        &mut self,
        id: SessionId,
        raw_buf: &[u8],
        meta_ptr: usize,
        meta_len: usize,
        decoded: &HashMap<String, Value>,
    ) {
        if let Some(cb) = self.metadata.as_mut() {
            cb(id, raw_buf, meta_ptr, meta_len, decoded);
        }
    }

    pub fn fire_av_data(&mut self, id: SessionId, payload: &[u8], header: RtmpHeader) {
        if let Some(cb) = self.av_data.as_mut() {
            cb(id, payload, header);
        }
    }
}
