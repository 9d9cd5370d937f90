//! AMF0 command message (msg_type_id 20) handling: `connect`, `createStream`,
//! `publish`, `play`, `deleteStream`, and the handful of legacy commands
//! that need no reply.

use amf::amf0::Value;
use rtmp_formats::consts::{command_name, csid, message_type, protocol_control_message_type};
use rtmp_formats::pack;
use tokio::io::{AsyncRead, AsyncWrite};
use tracing::info;

use crate::errors::{SessionError, SessionResult};
use crate::session::{Role, Session};

pub async fn handle<S>(session: &mut Session<S>, payload: &[u8]) -> SessionResult<()>
where
    S: AsyncRead + AsyncWrite + Unpin + Send,
{
    let values = rtmp_formats::amf0::decode_all(payload)?;

    let Some(Value::String(name)) = values.first() else {
        return Err(SessionError::protocol("command message missing command name"));
    };
    let name = name.clone();
    let transaction_id = match values.get(1) {
        Some(Value::Number(n)) => *n,
        _ => return Err(SessionError::protocol("command message missing transaction id")),
    };

    match name.as_str() {
        command_name::CONNECT => handle_connect(session, transaction_id, values.get(2)).await,
        command_name::CREATE_STREAM => handle_create_stream(session, transaction_id).await,
        command_name::PUBLISH => handle_publish(session, transaction_id, &values).await,
        command_name::PLAY => handle_play(session, transaction_id, &values).await,
        command_name::DELETE_STREAM => handle_delete_stream(session, &values).await,
        command_name::RELEASE_STREAM
        | command_name::FC_PUBLISH
        | command_name::FC_UNPUBLISH
        | command_name::FC_SUBSCRIBE
        | command_name::GET_STREAM_LENGTH => {
            info!(command = %name, "accepted, no response required");
            Ok(())
        }
        other => Err(SessionError::protocol(format!("unknown command: {other}"))),
    }
}

async fn handle_connect<S>(
    session: &mut Session<S>,
    transaction_id: f64,
    command_object: Option<&Value>,
) -> SessionResult<()>
where
    S: AsyncRead + AsyncWrite + Unpin + Send,
{
    if transaction_id != 1.0 {
        return Err(SessionError::protocol("connect transaction id must be 1"));
    }
    let app = command_object
        .and_then(|v| rtmp_formats::amf0::field(v, "app"))
        .and_then(|v| match v {
            Value::String(s) => Some(s.clone()),
            _ => None,
        })
        .ok_or_else(|| SessionError::protocol("connect command object missing required `app`"))?;
    info!(app = %app, "connect");
    session.app_name = Some(app);

    let win = pack::protocol_control::window_ack_size(session.config.window_ack_size)?;
    session
        .send_now(
            csid::PROTOCOL_CONTROL,
            protocol_control_message_type::WINDOW_ACK_SIZE,
            win,
        )
        .await?;

    let bw = pack::protocol_control::set_peer_bandwidth(
        session.config.peer_bandwidth,
        session.config.peer_bandwidth_limit_type,
    )?;
    session
        .send_now(
            csid::PROTOCOL_CONTROL,
            protocol_control_message_type::SET_PEER_BANDWIDTH,
            bw,
        )
        .await?;

    let cs = pack::protocol_control::set_chunk_size(session.config.local_chunk_size)?;
    session
        .send_now(
            csid::PROTOCOL_CONTROL,
            protocol_control_message_type::SET_CHUNK_SIZE,
            cs,
        )
        .await?;
    // Takes effect for every frame we send from here on, per the "Set Chunk
    // Size" message governing the sender's own framing.
    session.local_chunk_size = session.config.local_chunk_size;

    let result = pack::command::connect_result(transaction_id)?;
    session
        .send_now(csid::COMMAND, message_type::COMMAND_AMF0, result)
        .await
}

async fn handle_create_stream<S>(session: &mut Session<S>, transaction_id: f64) -> SessionResult<()>
where
    S: AsyncRead + AsyncWrite + Unpin + Send,
{
    let result = pack::command::create_stream_result(transaction_id, rtmp_formats::consts::MSID as f64)?;
    session
        .send_now(csid::COMMAND, message_type::COMMAND_AMF0, result)
        .await
}

async fn handle_publish<S>(
    session: &mut Session<S>,
    transaction_id: f64,
    values: &[Value],
) -> SessionResult<()>
where
    S: AsyncRead + AsyncWrite + Unpin + Send,
{
    if transaction_id != 0.0 {
        return Err(SessionError::protocol("publish transaction id must be 0"));
    }
    // values[2] is the skipped null.
    let publishing_name = match values.get(3) {
        Some(Value::String(s)) => s.clone(),
        _ => return Err(SessionError::protocol("publish missing publishing name")),
    };
    info!(name = %publishing_name, "publish");

    session.role = Role::Publisher;
    session.live_name = Some(publishing_name.clone());
    let id = session.id();
    session.callbacks.fire_publish(id, &publishing_name);

    let status = pack::command::on_status(
        rtmp_formats::consts::response_level::STATUS,
        rtmp_formats::consts::response_code::NET_STREAM_PUBLISH_START_SUCCESS,
        "Start publishing",
    )?;
    session
        .send_now(csid::COMMAND, message_type::COMMAND_AMF0, status)
        .await
}

async fn handle_play<S>(
    session: &mut Session<S>,
    transaction_id: f64,
    values: &[Value],
) -> SessionResult<()>
where
    S: AsyncRead + AsyncWrite + Unpin + Send,
{
    if transaction_id != 0.0 {
        return Err(SessionError::protocol("play transaction id must be 0"));
    }
    let stream_name = match values.get(3) {
        Some(Value::String(s)) => s.clone(),
        _ => return Err(SessionError::protocol("play missing stream name")),
    };
    info!(name = %stream_name, "play");
    session.live_name = Some(stream_name.clone());

    let status = pack::command::on_status(
        rtmp_formats::consts::response_level::STATUS,
        rtmp_formats::consts::response_code::NET_STREAM_PLAY_START,
        "Start playing",
    )?;
    // The role flip and play callback only happen once this write has
    // actually completed — `send_now` awaits the flush before returning.
    session
        .send_now(csid::COMMAND, message_type::COMMAND_AMF0, status)
        .await?;

    session.role = Role::Subscriber;
    let id = session.id();
    session.callbacks.fire_play(id, &stream_name);
    Ok(())
}

async fn handle_delete_stream<S>(session: &mut Session<S>, values: &[Value]) -> SessionResult<()>
where
    S: AsyncRead + AsyncWrite + Unpin + Send,
{
    match values.get(3) {
        Some(Value::Number(_)) => {}
        _ => return Err(SessionError::protocol("deleteStream missing message stream id")),
    }
    if session.role == Role::Publisher {
        let id = session.id();
        let name = session.live_name.clone().unwrap_or_default();
        session.callbacks.fire_publish_stop(id, &name);
    }
    Ok(())
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::config::SessionConfig;
    use tokio::io::duplex;

    fn encode(values: &[Value]) -> Vec<u8> {
        let mut buf = Vec::new();
        for v in values {
            v.write_to(&mut buf).unwrap();
        }
        buf
    }

    #[tokio::test]
    async fn connect_requires_transaction_id_one() {
        let (a, _b) = duplex(4096);
        let mut session = Session::new(a, SessionConfig::default(), 1);
        let payload = encode(&[
            Value::String("connect".to_owned()),
            Value::Number(2.0),
            Value::Object {
                class_name: None,
                entries: vec![],
            },
        ]);
        let err = handle(&mut session, &payload).await.unwrap_err();
        assert!(matches!(err, SessionError::Protocol(_)));
    }

    /// Boundary scenario 6: the onStatus write must already be sitting in
    /// the peer's buffer by the time the play callback fires, and the role
    /// flip must not have happened any earlier either.
    #[tokio::test]
    async fn play_writes_onstatus_before_flipping_role_and_firing_callback() {
        use std::pin::Pin;
        use std::sync::{Arc, Mutex};
        use std::task::{Context, Poll, Waker};
        use tokio::io::{AsyncRead, ReadBuf};

        let (a, mut client) = duplex(4096);
        let mut session = Session::new(a, SessionConfig::default(), 1);

        let callback_fired = Arc::new(Mutex::new(false));
        let status_already_written = Arc::new(Mutex::new(false));
        {
            let callback_fired = callback_fired.clone();
            let status_already_written = status_already_written.clone();
            session.on_play(move |_id, name| {
                assert_eq!(name, "camera1");
                *callback_fired.lock().unwrap() = true;

                // This closure is sync, so a non-blocking poll (rather than
                // an await) is the only way to check, from inside the
                // callback itself, whether the write already landed.
                let waker = Waker::noop();
                let mut cx = Context::from_waker(waker);
                let mut buf = [0u8; 4096];
                let mut read_buf = ReadBuf::new(&mut buf);
                if let Poll::Ready(Ok(())) = Pin::new(&mut client).poll_read(&mut cx, &mut read_buf) {
                    *status_already_written.lock().unwrap() = !read_buf.filled().is_empty();
                }
            });
        }

        let payload = encode(&[
            Value::String("play".to_owned()),
            Value::Number(0.0),
            Value::Null,
            Value::String("camera1".to_owned()),
        ]);
        handle(&mut session, &payload).await.unwrap();

        assert!(*callback_fired.lock().unwrap());
        assert!(*status_already_written.lock().unwrap());
        assert_eq!(session.role(), Role::Subscriber);
    }
}
