use std::sync::{
    Arc,
    atomic::{AtomicBool, AtomicUsize, Ordering},
};

use tracing::{debug, warn};

use super::shared::{Mode, Shared};
use crate::flow::Subscription;

/// Requests chunks in batches ahead of need.
///
/// A full batch is requested on subscription and again each time a batch
/// worth of chunks has been fed to the tokenizer. Drain passes are serialised
/// by a single compare-and-swap flag; callbacks that lose the race leave a
/// `missed` mark so the winner runs another pass.
#[derive(Debug)]
pub(super) struct Prefetching {
    batch: usize,
    draining: AtomicBool,
    missed: AtomicBool,
    consumed: AtomicUsize,
}

impl Prefetching {
    pub(super) fn new(batch: usize) -> Self {
        Self {
            batch,
            draining: AtomicBool::new(false),
            missed: AtomicBool::new(false),
            consumed: AtomicUsize::new(0),
        }
    }

    fn batch_request(&self) -> u64 {
        u64::try_from(self.batch).unwrap_or(u64::MAX)
    }
}

impl Mode for Prefetching {
    fn drain(&self, shared: &Shared) {
        self.missed.store(true, Ordering::Release);
        while self.missed.load(Ordering::Acquire) {
            if self
                .draining
                .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
                .is_err()
            {
                return;
            }
            while self.missed.swap(false, Ordering::AcqRel) {
                shared.drain_pass(self);
            }
            self.draining.store(false, Ordering::Release);
        }
    }

    fn subscribed(&self, upstream: &Arc<dyn Subscription>) {
        debug!(chunks = self.batch, "requesting first batch");
        upstream.request(self.batch_request());
    }

    fn delivered(&self, _shared: &Shared, queued: usize) {
        if queued > self.batch {
            warn!(queued, batch = self.batch, "prefetch limit exceeded");
        }
    }

    fn starved(&self, _shared: &Shared) {}

    fn consumed(&self, shared: &Shared) {
        let consumed = self.consumed.load(Ordering::Acquire) + 1;
        if consumed == self.batch {
            self.consumed.store(0, Ordering::Release);
            shared.request_upstream(self.batch_request());
        } else {
            self.consumed.store(consumed, Ordering::Release);
        }
    }
}
