//! Byte sinks the framer writes frames into.

use std::fmt;
use std::io::{self, Write};

use bytes::BytesMut;

/// Destination for outgoing frame bytes.
///
/// A frame is delivered in several chunks; a sink must keep chunks in call
/// order and must not reorder bytes within a chunk. Returning an error aborts
/// the frame being sent.
pub trait ByteSink {
    /// Accept one chunk of frame bytes.
    fn write_chunk(&mut self, chunk: &[u8]) -> io::Result<()>;
}

impl<S: ByteSink + ?Sized> ByteSink for &mut S {
    fn write_chunk(&mut self, chunk: &[u8]) -> io::Result<()> {
        (**self).write_chunk(chunk)
    }
}

impl<S: ByteSink + ?Sized> ByteSink for Box<S> {
    fn write_chunk(&mut self, chunk: &[u8]) -> io::Result<()> {
        (**self).write_chunk(chunk)
    }
}

impl ByteSink for Vec<u8> {
    fn write_chunk(&mut self, chunk: &[u8]) -> io::Result<()> {
        self.extend_from_slice(chunk);
        Ok(())
    }
}

impl ByteSink for BytesMut {
    fn write_chunk(&mut self, chunk: &[u8]) -> io::Result<()> {
        self.extend_from_slice(chunk);
        Ok(())
    }
}

/// Sink backed by a closure.
pub struct FnSink<F>(F);

impl<F> FnSink<F>
where
    F: FnMut(&[u8]) -> io::Result<()>,
{
    /// Wrap a closure.
    pub fn new(f: F) -> Self {
        Self(f)
    }
}

impl<F> ByteSink for FnSink<F>
where
    F: FnMut(&[u8]) -> io::Result<()>,
{
    fn write_chunk(&mut self, chunk: &[u8]) -> io::Result<()> {
        (self.0)(chunk)
    }
}

impl<F> fmt::Debug for FnSink<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FnSink").finish_non_exhaustive()
    }
}

/// Sink writing to any [`Write`] (serial port, socket, file).
///
/// Each chunk is written with `write_all`, so `Interrupted` is retried and
/// short writes are completed before the next chunk.
#[derive(Debug)]
pub struct WriteSink<W> {
    inner: W,
}

impl<W: Write> WriteSink<W> {
    /// Wrap a writer.
    pub fn new(inner: W) -> Self {
        Self { inner }
    }

    /// Borrow the underlying writer.
    pub fn get_ref(&self) -> &W {
        &self.inner
    }

    /// Consume the sink and return the writer.
    pub fn into_inner(self) -> W {
        self.inner
    }
}

impl<W: Write> ByteSink for WriteSink<W> {
    fn write_chunk(&mut self, chunk: &[u8]) -> io::Result<()> {
        self.inner.write_all(chunk)
    }
}
