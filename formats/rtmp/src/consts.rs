pub const FMSVER: &str = "FMS/3,0,1,123";
pub const FMS_CAPABILITIES: f64 = 31.0;

/// Reserved chunk stream ids used by the session core when it writes.
pub mod csid {
    pub const PROTOCOL_CONTROL: u32 = 2;
    pub const COMMAND: u32 = 3;
    pub const AUDIO: u32 = 4;
    pub const VIDEO: u32 = 6;
}

/// The session core only ever addresses message stream id 1; RTMP allows
/// more, but multiplexing several message streams over one chunk stream is
/// out of scope here.
pub const MSID: u32 = 1;

pub mod protocol_control_message_type {
    pub const SET_CHUNK_SIZE: u8 = 1;
    pub const ABORT: u8 = 2;
    pub const ACKNOWLEDGEMENT: u8 = 3;
    pub const USER_CONTROL: u8 = 4;
    pub const WINDOW_ACK_SIZE: u8 = 5;
    pub const SET_PEER_BANDWIDTH: u8 = 6;
}

pub mod message_type {
    pub const AUDIO: u8 = 8;
    pub const VIDEO: u8 = 9;
    pub const DATA_AMF0: u8 = 18;
    pub const COMMAND_AMF0: u8 = 20;
}

pub mod command_name {
    pub const CONNECT: &str = "connect";
    pub const CALL: &str = "call";
    pub const CREATE_STREAM: &str = "createStream";
    pub const PLAY: &str = "play";
    pub const PLAY2: &str = "play2";
    pub const DELETE_STREAM: &str = "deleteStream";
    pub const CLOSE_STREAM: &str = "closeStream";
    pub const RECEIVE_AUDIO: &str = "receiveAudio";
    pub const RECEIVE_VIDEO: &str = "receiveVideo";
    pub const PUBLISH: &str = "publish";
    pub const SEEK: &str = "seek";
    pub const PAUSE: &str = "pause";
    pub const RELEASE_STREAM: &str = "releaseStream";
    pub const FC_PUBLISH: &str = "FCPublish";
    pub const FC_UNPUBLISH: &str = "FCUnpublish";
    pub const FC_SUBSCRIBE: &str = "FCSubscribe";
    pub const GET_STREAM_LENGTH: &str = "getStreamLength";

    pub const RESULT: &str = "_result";
    pub const ERROR: &str = "_error";
    pub const ON_STATUS: &str = "onStatus";
    pub const ON_METADATA: &str = "onMetaData";
    pub const SET_DATA_FRAME: &str = "@setDataFrame";
}

pub mod response_code {
    pub const NET_CONNECTION_CONNECT_SUCCESS: &str = "NetConnection.Connect.Success";
    pub const NET_STREAM_DELETE_SUCCESS: &str = "NetStream.DeleteStream.Success";
    pub const NET_STREAM_PUBLISH_START_SUCCESS: &str = "NetStream.Publish.Start";
    pub const NET_STREAM_PLAY_START: &str = "NetStream.Play.Start";
    pub const NET_STREAM_PLAY_RESET: &str = "NetStream.Play.Reset";
}

pub mod response_level {
    pub const STATUS: &str = "status";
    pub const WARNING: &str = "warning";
    pub const ERROR: &str = "error";
}
