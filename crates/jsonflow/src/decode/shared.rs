//! State and callbacks common to both decoding adapters.
//!
//! [`Adapter`] is subscribed upstream as a `Subscriber<Bytes>` and handed
//! downstream as the `Subscription`. Every callback records its event in
//! [`Shared`] and then asks the [`Mode`] to drain. The mode serialises drain
//! passes with its own reentrancy guard and decides when to request chunks.

use std::{
    collections::VecDeque,
    sync::{
        Arc,
        atomic::{AtomicBool, AtomicU64, Ordering},
    },
};

use bytes::Bytes;
use parking_lot::Mutex;
use tracing::{debug, trace};

use super::{DecodeState, Step};
use crate::{
    Error, Value,
    flow::{Publisher, Subscriber, Subscription, add_demand, take_demand},
};

/// What differs between the prefetching and non-prefetching adapters.
pub(super) trait Mode: Send + Sync + 'static {
    /// Runs [`Shared::drain_pass`] under this mode's reentrancy guard.
    fn drain(&self, shared: &Shared);

    /// The upstream subscription has been attached.
    fn subscribed(&self, _upstream: &Arc<dyn Subscription>) {}

    /// Upstream delivered a chunk; it is already queued.
    fn delivered(&self, _shared: &Shared, _queued: usize) {}

    /// The tokenizer needs input and no chunk is queued.
    fn starved(&self, shared: &Shared);

    /// A queued chunk has been moved into the tokenizer.
    fn consumed(&self, _shared: &Shared) {}
}

pub(super) struct Shared {
    downstream: Arc<dyn Subscriber<Value>>,
    upstream: Mutex<Option<Arc<dyn Subscription>>>,
    inbound: Mutex<VecDeque<Bytes>>,
    /// Outstanding downstream demand.
    requested: AtomicU64,
    upstream_done: AtomicBool,
    upstream_error: Mutex<Option<Error>>,
    invalid_demand: AtomicBool,
    /// Set once by whichever of completion, error or cancellation comes
    /// first; nothing is emitted afterwards.
    done: AtomicBool,
    /// Only touched by the running drain pass.
    state: Mutex<DecodeState>,
}

impl Shared {
    fn new(downstream: Arc<dyn Subscriber<Value>>, ignore_level: usize) -> Self {
        Self {
            downstream,
            upstream: Mutex::new(None),
            inbound: Mutex::new(VecDeque::new()),
            requested: AtomicU64::new(0),
            upstream_done: AtomicBool::new(false),
            upstream_error: Mutex::new(None),
            invalid_demand: AtomicBool::new(false),
            done: AtomicBool::new(false),
            state: Mutex::new(DecodeState::new(ignore_level)),
        }
    }

    pub(super) fn has_demand(&self) -> bool {
        self.requested.load(Ordering::Acquire) > 0
    }

    pub(super) fn is_done(&self) -> bool {
        self.done.load(Ordering::Acquire)
    }

    pub(super) fn is_upstream_done(&self) -> bool {
        self.upstream_done.load(Ordering::Acquire)
    }

    /// Requests `n` chunks, returning `false` if there is no upstream yet.
    pub(super) fn request_upstream(&self, n: u64) -> bool {
        let upstream = self.upstream.lock().clone();
        match upstream {
            Some(upstream) => {
                debug!(chunks = n, "requesting chunks");
                upstream.request(n);
                true
            }
            None => false,
        }
    }

    /// Marks the stream terminated. Returns `true` for the first caller.
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
            debug!(%error, "decoding failed");
            self.downstream.on_error(error);
        }
    }

    fn complete(&self) {
        if self.finish(false) {
            debug!("decoding complete");
            self.downstream.on_complete();
        }
    }

    /// Makes as much progress as demand and buffered input allow.
    pub(super) fn drain_pass<M: Mode>(&self, mode: &M) {
        let mut state = self.state.lock();
        loop {
            if self.is_done() {
                state.clear();
                self.inbound.lock().clear();
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

            if state.has_ready() {
                if !take_demand(&self.requested) {
                    return;
                }
                if let Some(value) = state.take_ready() {
                    self.downstream.on_next(value);
                }
                continue;
            }

            match state.advance() {
                Ok(Step::Value(value)) => state.park(value),
                Ok(Step::Finished) => self.complete(),
                Ok(Step::Starved) => {
                    // Read the flag before the queue: a chunk delivered
                    // ahead of completion must not be skipped.
                    let upstream_done = self.is_upstream_done();
                    let chunk = self.inbound.lock().pop_front();
                    if let Some(chunk) = chunk {
                        trace!(len = chunk.len(), "feeding chunk");
                        state.feed(&chunk);
                        mode.consumed(self);
                    } else if upstream_done {
                        state.end_of_input();
                    } else {
                        mode.starved(self);
                        return;
                    }
                }
                Err(error) => self.fail(error, true),
            }
        }
    }
}

/// Bridges an upstream chunk publisher to a downstream value subscriber.
pub(super) struct Adapter<M> {
    shared: Shared,
    mode: M,
}

impl<M: Mode> Adapter<M> {
    pub(super) fn start<P>(source: P, downstream: Arc<dyn Subscriber<Value>>, ignore_level: usize, mode: M)
    where
        P: Publisher<Bytes>,
    {
        let adapter = Arc::new(Self {
            shared: Shared::new(downstream.clone(), ignore_level),
            mode,
        });
        downstream.on_subscribe(adapter.clone());
        source.subscribe(adapter);
    }

    fn drain(&self) {
        self.mode.drain(&self.shared);
    }
}

impl<M: Mode> Subscriber<Bytes> for Adapter<M> {
    fn on_subscribe(&self, subscription: Arc<dyn Subscription>) {
        if self.shared.is_done() {
            subscription.cancel();
            return;
        }
        *self.shared.upstream.lock() = Some(subscription.clone());
        // A cancel that raced with the store above found no upstream to
        // cancel; take it back and cancel it here.
        if self.shared.is_done() {
            let upstream = self.shared.upstream.lock().take();
            if let Some(upstream) = upstream {
                upstream.cancel();
            }
            return;
        }
        self.mode.subscribed(&subscription);
        self.drain();
    }

    fn on_next(&self, chunk: Bytes) {
        if self.shared.is_done() {
            return;
        }
        let queued = {
            let mut inbound = self.shared.inbound.lock();
            inbound.push_back(chunk);
            inbound.len()
        };
        self.mode.delivered(&self.shared, queued);
        self.drain();
    }

    fn on_error(&self, error: Error) {
        *self.shared.upstream_error.lock() = Some(error);
        self.drain();
    }

    fn on_complete(&self) {
        self.shared.upstream_done.store(true, Ordering::Release);
        self.drain();
    }
}

impl<M: Mode> Subscription for Adapter<M> {
    fn request(&self, n: u64) {
        if n == 0 {
            self.shared.invalid_demand.store(true, Ordering::Release);
        } else {
            add_demand(&self.shared.requested, n);
        }
        self.drain();
    }

    fn cancel(&self) {
        if self.shared.finish(true) {
            debug!("decoding cancelled");
        }
        self.drain();
    }
}
