//! Blocking reader over chunks produced on another thread.

use std::io::{self, Read};
use std::sync::Arc;

use bytes::{Buf, Bytes};
use flume::{Receiver, Sender};
use tracing::debug;

use super::CompletionCallback;
use crate::executor::Executor;
use crate::image::EncodingError;
use crate::raster::Raster;

/// Producer half of a [`ChannelReader`].
///
/// Dropping the sender ends the stream; readers then see EOF.
#[derive(Clone)]
pub struct ChunkSender {
    tx: Sender<io::Result<Bytes>>,
}

impl ChunkSender {
    /// Queue a chunk. Returns `false` once the reader has gone away.
    pub fn send(&self, chunk: impl Into<Bytes>) -> bool {
        self.tx.send(Ok(chunk.into())).is_ok()
    }

    /// Queue an error; the reader returns it in place of further data.
    pub fn fail(&self, error: io::Error) {
        let _ = self.tx.send(Err(error));
    }
}

/// A [`Read`] fed by a [`ChunkSender`].
///
/// The channel is unbounded so a producer running inline on the reader's
/// thread completes without waiting for a consumer. Sending never blocks,
/// so a [`ChunkSender`] may also be driven from an async task.
pub struct ChannelReader {
    rx: Receiver<io::Result<Bytes>>,
    current: Bytes,
    failed: bool,
}

impl ChannelReader {
    /// Create a connected sender and reader.
    pub fn channel() -> (ChunkSender, ChannelReader) {
        let (tx, rx) = flume::unbounded();
        (
            ChunkSender { tx },
            ChannelReader {
                rx,
                current: Bytes::new(),
                failed: false,
            },
        )
    }
}

impl Read for ChannelReader {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if buf.is_empty() {
            return Ok(0);
        }
        while !self.current.has_remaining() {
            if self.failed {
                return Ok(0);
            }
            match self.rx.recv() {
                Ok(Ok(chunk)) => self.current = chunk,
                Ok(Err(e)) => {
                    self.failed = true;
                    return Err(e);
                }
                // Producer finished.
                Err(_) => return Ok(0),
            }
        }
        let n = buf.len().min(self.current.remaining());
        self.current.copy_to_slice(&mut buf[..n]);
        Ok(n)
    }
}

/// Run `encode` on `executor`, streaming whatever it sends.
///
/// After `encode` returns the raster is released, then `on_complete` runs,
/// then the stream ends. A reader that reached EOF therefore observes the
/// completion side effects.
pub(crate) fn spawn_encode<F>(
    executor: &dyn Executor,
    raster: Arc<Raster>,
    encode: F,
    on_complete: CompletionCallback,
) -> Box<dyn Read + Send>
where
    F: FnOnce(&Raster, &ChunkSender) -> Result<(), EncodingError> + Send + 'static,
{
    let (tx, reader) = ChannelReader::channel();
    executor.execute(Box::new(move || {
        let result = encode(&raster, &tx);
        drop(raster);
        if let Err(e) = result {
            debug!(error = %e, "Streaming DDS encode failed");
            tx.fail(io::Error::other(e));
        }
        on_complete();
        drop(tx);
    }));
    Box::new(reader)
}
