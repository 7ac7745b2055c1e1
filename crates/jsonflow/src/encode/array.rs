use serde::Serialize;

use super::sink::{ChunkConsumer, ChunkSink};
use crate::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Framing {
    /// Nothing written yet.
    Empty,
    /// `[` and at least one element written.
    Open,
    /// Closed or aborted; further writes are ignored.
    Closed,
}

/// Frames a sequence of values as one JSON array over a [`ChunkSink`].
///
/// The opening bracket is written together with the first element, so an
/// array that never received one is written as `[]` by
/// [`finish`](Self::finish). [`abort`](Self::abort) stops without the closing
/// bracket, leaving the output visibly truncated.
///
/// ```
/// use jsonflow::ArrayWriter;
///
/// let mut chunks: Vec<bytes::Bytes> = Vec::new();
/// let mut writer = ArrayWriter::new(&mut chunks, 8192);
/// writer.write_element(&1).unwrap();
/// writer.write_element(&"two").unwrap();
/// writer.finish();
/// assert_eq!(chunks, [&br#"[1,"two"]"#[..]]);
/// ```
#[derive(Debug)]
pub struct ArrayWriter<C> {
    sink: ChunkSink<C>,
    framing: Framing,
}

impl<C: ChunkConsumer> ArrayWriter<C> {
    /// Creates a writer emitting chunks of `capacity` bytes into `consumer`.
    pub fn new(consumer: C, capacity: usize) -> Self {
        Self {
            sink: ChunkSink::new(consumer, capacity),
            framing: Framing::Empty,
        }
    }

    /// `true` until the first element has been written.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.framing == Framing::Empty
    }

    /// `true` once the array was finished or aborted.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.framing == Framing::Closed
    }

    /// Serializes `item` as the next element.
    ///
    /// The element is serialized in full before anything is written, so a
    /// failure leaves the output unchanged. Writes after the array was
    /// closed are ignored.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Serialize`] if `item` cannot be represented as JSON.
    pub fn write_element<T>(&mut self, item: &T) -> Result<(), Error>
    where
        T: Serialize + ?Sized,
    {
        let bytes = serde_json::to_vec(item)?;
        match self.framing {
            Framing::Empty => {
                self.sink.write_byte(b'[');
                self.framing = Framing::Open;
            }
            Framing::Open => self.sink.write_byte(b','),
            Framing::Closed => return Ok(()),
        }
        self.sink.write(&bytes);
        Ok(())
    }

    /// Writes `[]` and closes, if no element was written.
    pub fn write_empty(&mut self) {
        if self.framing == Framing::Empty {
            self.sink.write(b"[]");
            self.close();
        }
    }

    /// Writes the closing bracket (or `[]`) and flushes the last chunk.
    pub fn finish(&mut self) {
        match self.framing {
            Framing::Empty => self.write_empty(),
            Framing::Open => {
                self.sink.write_byte(b']');
                self.close();
            }
            Framing::Closed => {}
        }
    }

    /// Stops without a closing bracket and drops the unflushed chunk.
    pub fn abort(&mut self) {
        self.sink.discard();
        self.framing = Framing::Closed;
    }

    /// Chunks flushed so far.
    pub fn consumer_mut(&mut self) -> &mut C {
        self.sink.consumer_mut()
    }

    /// Returns the consumer. Unflushed bytes are dropped.
    pub fn into_inner(self) -> C {
        self.sink.into_inner()
    }

    fn close(&mut self) {
        self.sink.close();
        self.framing = Framing::Closed;
    }
}
