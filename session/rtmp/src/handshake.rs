//! The plain (non-encrypted, non-digest) RTMP handshake: C0/C1 in, S0/S1/S2
//! out, C2 in. This mirrors the original session's handshake sequence —
//! `do_read_c0c1` -> `do_write_s0s1` -> `do_write_s2` -> `do_read_c2` — with
//! no complex-handshake digest validation, matching what that session
//! actually implements.

use tokio::io::{AsyncReadExt, AsyncWriteExt};

use crate::errors::{SessionError, SessionResult};

const RTMP_VERSION: u8 = 3;
const HANDSHAKE_PACKET_SIZE: usize = 1536;

/// Runs the server side of the handshake to completion over `stream`.
/// Returns once S0/S1/S2 have been written and C2 has been read and
/// validated; the session's chunk-reading loop starts immediately after.
pub async fn run_server_handshake<S>(stream: &mut S) -> SessionResult<()>
where
    S: AsyncReadExt + AsyncWriteExt + Unpin,
{
    // C0 + C1: accepted without validating the version/schema/digest — a
    // permissive server, per the boundary scenario where a C0 of 0x00 still
    // reaches ChunkRead.
    let mut c0 = [0u8; 1];
    read_exact_or_closed(stream, &mut c0).await?;

    let mut c1 = [0u8; HANDSHAKE_PACKET_SIZE];
    read_exact_or_closed(stream, &mut c1).await?;

    // S0 + S1: echo our own version and a freshly generated S1 payload.
    let mut s1 = [0u8; HANDSHAKE_PACKET_SIZE];
    s1[0..4].copy_from_slice(&0u32.to_be_bytes()); // time
    s1[4..8].copy_from_slice(&0u32.to_be_bytes()); // zero
    utils::random::random_fill(&mut s1[8..]);

    stream.write_all(&[RTMP_VERSION]).await?;
    stream.write_all(&s1).await?;

    // S2: echo C1 back verbatim, the simple-handshake convention.
    stream.write_all(&c1).await?;
    stream.flush().await?;

    // C2: the peer echoes our S1 back; we don't validate its payload, only
    // that it actually arrives — the original implementation does the same.
    let mut c2 = [0u8; HANDSHAKE_PACKET_SIZE];
    read_exact_or_closed(stream, &mut c2).await?;

    Ok(())
}

async fn read_exact_or_closed<S>(stream: &mut S, buf: &mut [u8]) -> SessionResult<()>
where
    S: AsyncReadExt + Unpin,
{
    match stream.read_exact(buf).await {
        Ok(_) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => Err(SessionError::PeerClosed),
        Err(e) => Err(SessionError::Transport(e)),
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use tokio::io::duplex;

    #[tokio::test]
    async fn handshake_completes_over_a_duplex_pipe() {
        let (mut server, mut client) = duplex(1 << 16);

        let server_task = tokio::spawn(async move { run_server_handshake(&mut server).await });

        // Minimal client side: C0/C1, read S0/S1/S2, send C2.
        client.write_all(&[RTMP_VERSION]).await.unwrap();
        let c1 = vec![0u8; HANDSHAKE_PACKET_SIZE];
        client.write_all(&c1).await.unwrap();

        let mut s0 = [0u8; 1];
        client.read_exact(&mut s0).await.unwrap();
        assert_eq!(s0[0], RTMP_VERSION);
        let mut s1 = [0u8; HANDSHAKE_PACKET_SIZE];
        client.read_exact(&mut s1).await.unwrap();
        let mut s2 = [0u8; HANDSHAKE_PACKET_SIZE];
        client.read_exact(&mut s2).await.unwrap();
        assert_eq!(s2, c1.as_slice());

        client.write_all(&s1).await.unwrap();

        server_task.await.unwrap().unwrap();
    }

    /// Boundary scenario 1: a C0 of 0x00 (not the real RTMP_VERSION) still
    /// completes the handshake — the server is permissive and never
    /// validates the schema/digest.
    #[tokio::test]
    async fn non_standard_c0_byte_is_accepted() {
        let (mut server, mut client) = duplex(1 << 16);

        let server_task = tokio::spawn(async move { run_server_handshake(&mut server).await });

        client.write_all(&[0x00]).await.unwrap();
        let c1 = vec![0u8; HANDSHAKE_PACKET_SIZE];
        client.write_all(&c1).await.unwrap();

        let mut s0 = [0u8; 1];
        client.read_exact(&mut s0).await.unwrap();
        assert_eq!(s0[0], RTMP_VERSION);
        let mut s1 = [0u8; HANDSHAKE_PACKET_SIZE];
        client.read_exact(&mut s1).await.unwrap();
        let mut s2 = [0u8; HANDSHAKE_PACKET_SIZE];
        client.read_exact(&mut s2).await.unwrap();
        assert_eq!(s2, c1.as_slice());

        client.write_all(&s1).await.unwrap();

        server_task.await.unwrap().unwrap();
    }
}
