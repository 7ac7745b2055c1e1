//! Demand-driven publish/subscribe protocol.
//!
//! A [`Publisher`] produces items only after its [`Subscriber`] asks for them
//! through the [`Subscription`] handed to
//! [`on_subscribe`](Subscriber::on_subscribe). Every callback takes `&self`
//! and may arrive on any thread, so implementations keep their state behind
//! atomics or locks.
//!
//! Per subscription a publisher calls `on_subscribe` once, then `on_next` at
//! most as many times as demand was requested, then at most one of
//! `on_error` or `on_complete`. Once `cancel` returns, a signal already under
//! way on another thread may still arrive; nothing follows it.

mod iter;
mod stream;

use std::sync::{
    Arc,
    atomic::{AtomicU64, AtomicUsize, Ordering},
};

pub use iter::{IterPublisher, from_iter, from_results};
pub use stream::{SubscriberStream, into_stream};

use crate::Error;

/// Demand for an unbounded number of items.
pub const UNBOUNDED: u64 = u64::MAX;

/// The link between one publisher and one subscriber.
pub trait Subscription: Send + Sync {
    /// Adds `n` to the outstanding demand. Demand saturates at
    /// [`UNBOUNDED`].
    ///
    /// `request(0)` terminates the stream with [`Error::InvalidDemand`].
    fn request(&self, n: u64);

    /// Stops delivery and releases resources. Idempotent.
    fn cancel(&self);
}

/// Receives items and the terminal signal of a stream.
pub trait Subscriber<T>: Send + Sync {
    /// Called once, before any other callback.
    fn on_subscribe(&self, subscription: Arc<dyn Subscription>);

    /// Called with each item, never more often than requested.
    fn on_next(&self, item: T);

    /// Terminal failure.
    fn on_error(&self, error: Error);

    /// Terminal success.
    fn on_complete(&self);
}

/// A single-use source of items.
pub trait Publisher<T> {
    /// Starts the stream, delivering to `subscriber`.
    fn subscribe(self, subscriber: Arc<dyn Subscriber<T>>);
}

/// Adds `n` to `demand` without overflowing.
pub(crate) fn add_demand(demand: &AtomicU64, n: u64) -> u64 {
    let previous = demand
        .fetch_update(Ordering::AcqRel, Ordering::Acquire, |current| {
            Some(current.saturating_add(n))
        })
        .unwrap_or_else(|current| current);
    previous.saturating_add(n)
}

/// Takes one unit of demand, returning `false` if there was none.
pub(crate) fn take_demand(demand: &AtomicU64) -> bool {
    demand
        .fetch_update(Ordering::AcqRel, Ordering::Acquire, |current| match current {
            0 => None,
            UNBOUNDED => Some(UNBOUNDED),
            n => Some(n - 1),
        })
        .is_ok()
}

/// Guards a drain loop with a missed-work counter.
///
/// Every caller increments the counter; only the caller that moved it from
/// zero runs the loop, re-running it until the counter drops back to zero.
#[derive(Debug, Default)]
pub(crate) struct WorkInProgress(AtomicUsize);

impl WorkInProgress {
    /// Registers work. Returns `true` if the caller must run the loop.
    pub(crate) fn enter(&self) -> bool {
        self.0.fetch_add(1, Ordering::AcqRel) == 0
    }

    /// Retires `missed` units of work, returning how many arrived meanwhile.
    pub(crate) fn leave(&self, missed: usize) -> usize {
        self.0.fetch_sub(missed, Ordering::AcqRel) - missed
    }
}
