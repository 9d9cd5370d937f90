//! Outbound write queue. The session owns exactly one execution context, so
//! there is never more than one producer; what this type guarantees is
//! FIFO submission order and that a buffer is written to completion before
//! the next one starts — no interleaving of bytes from two different
//! frames, matching the original session's `async_send`/`do_send` chain.

use std::collections::VecDeque;

use tokio::io::{AsyncWrite, AsyncWriteExt};

use crate::errors::SessionResult;

#[derive(Debug, Default)]
pub struct EgressQueue {
    queue: VecDeque<Vec<u8>>,
}

impl EgressQueue {
    pub fn new() -> Self {
        Self {
            queue: VecDeque::new(),
        }
    }

    /// Enqueue a buffer for transmission. Does not write anything itself;
    /// call [`Self::drain`] to flush.
    pub fn push(&mut self, buf: Vec<u8>) {
        self.queue.push_back(buf);
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    /// Write every currently queued buffer, in submission order, one at a
    /// time. A write error aborts with whatever is left still queued, so a
    /// caller that reconnects could in principle resume, though this
    /// session core always treats a write error as fatal.
    pub async fn drain<W>(&mut self, writer: &mut W) -> SessionResult<()>
    where
        W: AsyncWrite + Unpin,
    {
        while let Some(buf) = self.queue.pop_front() {
            writer.write_all(&buf).await?;
        }
        writer.flush().await?;
        Ok(())
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[tokio::test]
    async fn buffers_flush_in_submission_order_without_interleaving() {
        let mut queue = EgressQueue::new();
        queue.push(b"first".to_vec());
        queue.push(b"second".to_vec());
        queue.push(b"third".to_vec());

        let mut out = Vec::new();
        queue.drain(&mut out).await.unwrap();

        assert_eq!(out, b"firstsecondthird");
        assert!(queue.is_empty());
    }
}
