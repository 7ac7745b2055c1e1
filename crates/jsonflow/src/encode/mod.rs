//! Values in, chunked JSON array bytes out.

mod array;
mod sink;

use std::{
    collections::VecDeque,
    marker::PhantomData,
    sync::{
        Arc,
        atomic::{AtomicBool, AtomicU64, Ordering},
    },
};

pub use array::ArrayWriter;
use bytes::Bytes;
use parking_lot::Mutex;
use serde::Serialize;
pub use sink::{ChunkConsumer, ChunkSink};
use tracing::{debug, trace};

use crate::{
    EncoderOptions, Error,
    flow::{Publisher, Subscriber, Subscription, WorkInProgress, add_demand, take_demand},
};

/// A [`Publisher`] of the chunks of one JSON array holding every item of
/// `source`.
///
/// Items are requested one at a time, and only while downstream demand is
/// outstanding and no encoded chunk is waiting. If the source fails, the
/// error is forwarded and no closing bracket is written; on cancellation
/// nothing more is written at all.
///
/// Arbitrary precision [`Number`](crate::Number)s are written verbatim.
/// Other numbers keep their value but not their class: decoding the output
/// again yields `Int` or `Long` for integers, by range, and `BigDecimal` for
/// `Float` and `Double`.
///
/// ```
/// use futures::{StreamExt, executor::block_on};
/// use jsonflow::{encode, flow::{from_iter, into_stream}};
///
/// let chunks: Vec<_> = block_on(into_stream(encode(from_iter(1..=5)), 4).collect());
/// let bytes: Vec<u8> = chunks.into_iter().flat_map(|chunk| chunk.unwrap()).collect();
/// assert_eq!(bytes, b"[1,2,3,4,5]");
/// ```
#[derive(Debug)]
pub struct Encoder<P, T> {
    source: P,
    options: EncoderOptions,
    item: PhantomData<fn(T)>,
}

/// Encodes the items of `source` with default options.
pub fn encode<T, P>(source: P) -> Encoder<P, T>
where
    T: Serialize,
    P: Publisher<T>,
{
    Encoder::with_options(source, EncoderOptions::default())
}

impl<P, T> Encoder<P, T>
where
    T: Serialize,
    P: Publisher<T>,
{
    /// Creates an encoder with explicit options.
    pub fn with_options(source: P, options: EncoderOptions) -> Self {
        Self {
            source,
            options,
            item: PhantomData,
        }
    }

    /// Sets the chunk capacity. See [`EncoderOptions::chunk_capacity`].
    #[must_use]
    pub fn chunk_capacity(mut self, capacity: usize) -> Self {
        self.options.chunk_capacity = capacity;
        self
    }
}

impl<P, T> Publisher<Bytes> for Encoder<P, T>
where
    T: Serialize + Send + 'static,
    P: Publisher<T>,
{
    fn subscribe(self, subscriber: Arc<dyn Subscriber<Bytes>>) {
        let adapter = Arc::new(EncodeAdapter {
            downstream: subscriber.clone(),
            upstream: Mutex::new(None),
            pending: Mutex::new(VecDeque::new()),
            writer: Mutex::new(ArrayWriter::new(VecDeque::new(), self.options.chunk_capacity)),
            requested: AtomicU64::new(0),
            in_flight: AtomicBool::new(false),
            upstream_done: AtomicBool::new(false),
            upstream_error: Mutex::new(None),
            invalid_demand: AtomicBool::new(false),
            done: AtomicBool::new(false),
            wip: WorkInProgress::default(),
        });
        subscriber.on_subscribe(adapter.clone());
        self.source.subscribe(adapter);
    }
}

struct EncodeAdapter<T> {
    downstream: Arc<dyn Subscriber<Bytes>>,
    upstream: Mutex<Option<Arc<dyn Subscription>>>,
    /// Items received and not yet serialized.
    pending: Mutex<VecDeque<T>>,
    /// Only touched by the running drain pass. Flushed chunks queue up in
    /// the writer's consumer until there is demand for them.
    writer: Mutex<ArrayWriter<VecDeque<Bytes>>>,
    requested: AtomicU64,
    /// An item has been requested and not yet delivered.
    in_flight: AtomicBool,
    upstream_done: AtomicBool,
    upstream_error: Mutex<Option<Error>>,
    invalid_demand: AtomicBool,
    done: AtomicBool,
    wip: WorkInProgress,
}

impl<T: Serialize> EncodeAdapter<T> {
    fn drain(&self) {
        if !self.wip.enter() {
            return;
        }
        let mut missed = 1;
        loop {
            self.drain_pass();
            missed = self.wip.leave(missed);
            if missed == 0 {
                break;
            }
        }
    }

    fn drain_pass(&self) {
        let mut writer = self.writer.lock();
        loop {
            if self.done.load(Ordering::Acquire) {
                writer.abort();
                writer.consumer_mut().clear();
                self.pending.lock().clear();
                return;
            }
            if self.invalid_demand.swap(false, Ordering::AcqRel) {
                self.fail(Error::InvalidDemand, true);
                continue;
            }
            let upstream_error = self.upstream_error.lock().take();
            if let Some(error) = upstream_error {
                self.fail(error, false);
                continue;
            }

            if !writer.consumer_mut().is_empty() {
                if !take_demand(&self.requested) {
                    return;
                }
                if let Some(chunk) = writer.consumer_mut().pop_front() {
                    trace!(len = chunk.len(), "emitting chunk");
                    self.downstream.on_next(chunk);
                }
                continue;
            }
            if writer.is_closed() {
                self.complete();
                continue;
            }

            // Read the flag before the queue: an item delivered ahead of
            // completion must not be skipped.
            let upstream_done = self.upstream_done.load(Ordering::Acquire);
            let item = self.pending.lock().pop_front();
            if let Some(item) = item {
                if let Err(error) = writer.write_element(&item) {
                    self.fail(error, true);
                }
                continue;
            }
            if upstream_done {
                writer.finish();
                continue;
            }

            if self.requested.load(Ordering::Acquire) > 0 && !self.in_flight.swap(true, Ordering::AcqRel) {
                let upstream = self.upstream.lock().clone();
                match upstream {
                    Some(upstream) => upstream.request(1),
                    None => self.in_flight.store(false, Ordering::Release),
                }
            }
            return;
        }
    }

    fn finish(&self, cancel_upstream: bool) -> bool {
        if self.done.swap(true, Ordering::AcqRel) {
            return false;
        }
        let upstream = self.upstream.lock().take();
        if let Some(upstream) = upstream.filter(|_| cancel_upstream) {
            upstream.cancel();
        }
        true
    }

    fn fail(&self, error: Error, cancel_upstream: bool) {
        if self.finish(cancel_upstream) {
            debug!(%error, "encoding failed");
            self.downstream.on_error(error);
        }
    }

    fn complete(&self) {
        if self.finish(false) {
            debug!("encoding complete");
            self.downstream.on_complete();
        }
    }
}

impl<T: Serialize + Send> Subscriber<T> for EncodeAdapter<T> {
    fn on_subscribe(&self, subscription: Arc<dyn Subscription>) {
        if self.done.load(Ordering::Acquire) {
            subscription.cancel();
            return;
        }
        *self.upstream.lock() = Some(subscription);
        if self.done.load(Ordering::Acquire) {
            let upstream = self.upstream.lock().take();
            if let Some(upstream) = upstream {
                upstream.cancel();
            }
            return;
        }
        self.drain();
    }

    fn on_next(&self, item: T) {
        if self.done.load(Ordering::Acquire) {
            return;
        }
        self.pending.lock().push_back(item);
        self.in_flight.store(false, Ordering::Release);
        self.drain();
    }

    fn on_error(&self, error: Error) {
        *self.upstream_error.lock() = Some(error);
        self.drain();
    }

    fn on_complete(&self) {
        self.upstream_done.store(true, Ordering::Release);
        self.drain();
    }
}

impl<T: Serialize + Send> Subscription for EncodeAdapter<T> {
    fn request(&self, n: u64) {
        if n == 0 {
            self.invalid_demand.store(true, Ordering::Release);
        } else {
            add_demand(&self.requested, n);
        }
        self.drain();
    }

    fn cancel(&self) {
        if self.finish(true) {
            debug!("encoding cancelled");
        }
        self.drain();
    }
}
