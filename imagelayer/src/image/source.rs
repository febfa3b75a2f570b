//! Input streams that expose a caller-controlled cancellation flag.
//!
//! Decoders never implement their own cancellation. They consult
//! [`ImageSource::is_cancelled`] when interpreting I/O failures so a
//! caller-initiated cancellation is logged as benign rather than as a fault.

use std::fs::File;
use std::io::{self, Cursor, Read};

use bytes::{Bytes, BytesMut};
use tokio_util::sync::CancellationToken;

/// A byte stream an image can be decoded from.
pub trait ImageSource: Read + Send {
    /// Whether the producer of this stream was explicitly cancelled.
    fn is_cancelled(&self) -> bool {
        false
    }
}

impl<T: AsRef<[u8]> + Send> ImageSource for Cursor<T> {}

impl ImageSource for &[u8] {}

impl ImageSource for File {}

impl<S: ImageSource + ?Sized> ImageSource for Box<S> {
    fn is_cancelled(&self) -> bool {
        (**self).is_cancelled()
    }
}

impl<S: ImageSource + ?Sized> ImageSource for &mut S {
    fn is_cancelled(&self) -> bool {
        (**self).is_cancelled()
    }
}

/// Wraps any reader with a [`CancellationToken`].
///
/// Once the token is cancelled, further reads fail with
/// [`io::ErrorKind::Interrupted`] and `is_cancelled()` reports `true`.
pub struct CancellableSource<R> {
    inner: R,
    token: CancellationToken,
}

impl<R: Read + Send> CancellableSource<R> {
    /// Wrap `inner`, cancelled through `token`.
    pub fn new(inner: R, token: CancellationToken) -> Self {
        Self { inner, token }
    }

    /// The token controlling this source.
    pub fn token(&self) -> &CancellationToken {
        &self.token
    }
}

impl<R: Read + Send> Read for CancellableSource<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if self.token.is_cancelled() {
            return Err(io::Error::new(
                io::ErrorKind::Interrupted,
                "image stream cancelled",
            ));
        }
        self.inner.read(buf)
    }
}

impl<R: Read + Send> ImageSource for CancellableSource<R> {
    fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }
}

/// Read the whole source into memory.
///
/// `content_length`, when declared, pre-sizes the buffer; it is a hint and
/// never truncates the read.
pub fn read_fully<S: ImageSource + ?Sized>(
    source: &mut S,
    content_length: Option<u64>,
) -> io::Result<Bytes> {
    let capacity = content_length
        .map(|len| len.min(64 * 1024 * 1024) as usize)
        .unwrap_or(64 * 1024);
    let mut buf = BytesMut::with_capacity(capacity);
    let mut chunk = [0u8; 16 * 1024];
    loop {
        match source.read(&mut chunk) {
            Ok(0) => break,
            Ok(n) => buf.extend_from_slice(&chunk[..n]),
            // A cancelled source also reports Interrupted; only retry live ones.
            Err(e) if e.kind() == io::ErrorKind::Interrupted && !source.is_cancelled() => {
                continue
            }
            Err(e) => return Err(e),
        }
    }
    Ok(buf.freeze())
}
