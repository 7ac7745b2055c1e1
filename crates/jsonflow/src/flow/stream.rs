use std::{
    collections::VecDeque,
    pin::Pin,
    sync::Arc,
    task::{Context, Poll, Waker},
};

use futures::Stream;
use parking_lot::Mutex;

use super::{Publisher, Subscriber, Subscription};
use crate::Error;

/// Subscribes to `publisher` and exposes it as a [`Stream`].
///
/// The stream requests `batch` items whenever everything it asked for has
/// been yielded and it is polled again. Dropping the stream before it ends
/// cancels the subscription.
pub fn into_stream<T, P>(publisher: P, batch: usize) -> SubscriberStream<T>
where
    T: Send + 'static,
    P: Publisher<T>,
{
    let bridge = Arc::new(Bridge {
        inner: Mutex::new(Inner {
            queue: VecDeque::new(),
            terminal: None,
            finished: false,
            outstanding: 0,
            subscription: None,
            waker: None,
        }),
    });
    publisher.subscribe(bridge.clone());
    SubscriberStream {
        bridge,
        batch: u64::try_from(batch.max(1)).unwrap_or(u64::MAX),
    }
}

/// A [`Stream`] fed by a [`Publisher`]. Created by [`into_stream`].
pub struct SubscriberStream<T> {
    bridge: Arc<Bridge<T>>,
    batch: u64,
}

impl<T> core::fmt::Debug for SubscriberStream<T> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("SubscriberStream")
            .field("batch", &self.batch)
            .finish_non_exhaustive()
    }
}

struct Bridge<T> {
    inner: Mutex<Inner<T>>,
}

struct Inner<T> {
    queue: VecDeque<T>,
    terminal: Option<Result<(), Error>>,
    /// The terminal signal has been yielded.
    finished: bool,
    /// Items requested but not yet received.
    outstanding: u64,
    subscription: Option<Arc<dyn Subscription>>,
    waker: Option<Waker>,
}

impl<T> Bridge<T> {
    fn update(&self, f: impl FnOnce(&mut Inner<T>)) {
        let waker = {
            let mut inner = self.inner.lock();
            f(&mut inner);
            inner.waker.take()
        };
        if let Some(waker) = waker {
            waker.wake();
        }
    }
}

impl<T: Send> Subscriber<T> for Bridge<T> {
    fn on_subscribe(&self, subscription: Arc<dyn Subscription>) {
        self.update(|inner| inner.subscription = Some(subscription));
    }

    fn on_next(&self, item: T) {
        self.update(|inner| {
            inner.outstanding = inner.outstanding.saturating_sub(1);
            inner.queue.push_back(item);
        });
    }

    fn on_error(&self, error: Error) {
        self.update(|inner| inner.terminal = Some(Err(error)));
    }

    fn on_complete(&self) {
        self.update(|inner| inner.terminal = Some(Ok(())));
    }
}

impl<T> Stream for SubscriberStream<T> {
    type Item = Result<T, Error>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let mut inner = self.bridge.inner.lock();
        if let Some(item) = inner.queue.pop_front() {
            return Poll::Ready(Some(Ok(item)));
        }
        if inner.finished {
            return Poll::Ready(None);
        }
        if let Some(terminal) = inner.terminal.take() {
            inner.finished = true;
            inner.subscription = None;
            return Poll::Ready(terminal.err().map(Err));
        }

        inner.waker = Some(cx.waker().clone());
        let subscription = if inner.outstanding == 0 {
            inner.subscription.clone()
        } else {
            None
        };
        if subscription.is_some() {
            inner.outstanding = self.batch;
        }
        drop(inner);

        // Delivery may happen synchronously inside `request`; the lock is
        // released so `on_next` can take it, and its wake re-polls us.
        if let Some(subscription) = subscription {
            subscription.request(self.batch);
        }
        Poll::Pending
    }
}

impl<T> Drop for SubscriberStream<T> {
    fn drop(&mut self) {
        let subscription = {
            let mut inner = self.bridge.inner.lock();
            inner.queue.clear();
            if inner.finished || inner.terminal.is_some() {
                None
            } else {
                inner.subscription.take()
            }
        };
        if let Some(subscription) = subscription {
            subscription.cancel();
        }
    }
}
