//! Fixed-capacity chunk accumulation.

use std::{collections::VecDeque, io};

use bytes::{Bytes, BytesMut};

/// Receives chunks flushed by a [`ChunkSink`].
pub trait ChunkConsumer {
    /// Takes ownership of a full (or final) chunk.
    fn accept(&mut self, chunk: Bytes);
}

impl ChunkConsumer for VecDeque<Bytes> {
    fn accept(&mut self, chunk: Bytes) {
        self.push_back(chunk);
    }
}

impl ChunkConsumer for Vec<Bytes> {
    fn accept(&mut self, chunk: Bytes) {
        self.push(chunk);
    }
}

impl<C: ChunkConsumer + ?Sized> ChunkConsumer for &mut C {
    fn accept(&mut self, chunk: Bytes) {
        (**self).accept(chunk);
    }
}

/// Accumulates written bytes into chunks of a fixed capacity.
///
/// A write that does not fit in the current chunk first flushes it to the
/// consumer and starts a new chunk of `max(capacity, write length)` bytes, so
/// a single write is never split. [`close`](Self::close) flushes a non-empty
/// partial chunk.
///
/// ```
/// use jsonflow::ChunkSink;
///
/// let mut chunks: Vec<bytes::Bytes> = Vec::new();
/// let mut sink = ChunkSink::new(&mut chunks, 4);
/// sink.write(b"[1,");
/// sink.write(b"22,");
/// sink.write_byte(b']');
/// sink.close();
/// assert_eq!(chunks, [&b"[1,"[..], b"22,]"]);
/// ```
#[derive(Debug)]
pub struct ChunkSink<C> {
    consumer: C,
    capacity: usize,
    chunk: BytesMut,
    /// Capacity of the current chunk.
    limit: usize,
}

impl<C: ChunkConsumer> ChunkSink<C> {
    /// Creates a sink flushing chunks of `capacity` bytes into `consumer`.
    ///
    /// A zero capacity is treated as one.
    pub fn new(consumer: C, capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            consumer,
            capacity,
            chunk: BytesMut::with_capacity(capacity),
            limit: capacity,
        }
    }

    /// Writes a single byte.
    pub fn write_byte(&mut self, byte: u8) {
        self.write(&[byte]);
    }

    /// Writes `bytes`, flushing the current chunk first if they do not fit.
    pub fn write(&mut self, bytes: &[u8]) {
        if bytes.len() > self.limit - self.chunk.len() {
            self.replace_chunk(bytes.len());
        }
        self.chunk.extend_from_slice(bytes);
    }

    /// Writes `len` bytes of `bytes` starting at `offset`.
    ///
    /// # Panics
    ///
    /// Panics if `offset + len` is out of bounds for `bytes`.
    pub fn write_at(&mut self, bytes: &[u8], offset: usize, len: usize) {
        self.write(&bytes[offset..offset + len]);
    }

    /// Flushes the current chunk if it holds any bytes. No replacement is
    /// allocated until the next write.
    pub fn close(&mut self) {
        let chunk = core::mem::take(&mut self.chunk);
        self.limit = 0;
        if !chunk.is_empty() {
            self.consumer.accept(chunk.freeze());
        }
    }

    /// Drops the current chunk without flushing it.
    pub fn discard(&mut self) {
        self.chunk = BytesMut::new();
        self.limit = 0;
    }

    /// Bytes written to the current, unflushed chunk.
    #[must_use]
    pub fn buffered(&self) -> usize {
        self.chunk.len()
    }

    /// Chunks flushed so far.
    #[must_use]
    pub fn consumer(&self) -> &C {
        &self.consumer
    }

    /// Mutable access to the consumer.
    pub fn consumer_mut(&mut self) -> &mut C {
        &mut self.consumer
    }

    /// Returns the consumer. Unflushed bytes are dropped.
    pub fn into_inner(self) -> C {
        self.consumer
    }

    fn replace_chunk(&mut self, needed: usize) {
        let size = self.capacity.max(needed);
        let full = core::mem::replace(&mut self.chunk, BytesMut::with_capacity(size));
        self.limit = size;
        if !full.is_empty() {
            self.consumer.accept(full.freeze());
        }
    }
}

impl<C: ChunkConsumer> io::Write for ChunkSink<C> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        ChunkSink::write(self, buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}
