//! Hand-driven publishers and recording subscribers for protocol tests.

use std::sync::{
    Arc,
    atomic::{AtomicBool, AtomicU64, Ordering},
};

use bytes::Bytes;
use parking_lot::Mutex;

use crate::{
    Error, Value,
    flow::{Publisher, Subscriber, Subscription},
};

/// A signal observed by a [`TestSubscriber`]. Errors are kept as their
/// display text so events compare with `==`.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Event<T> {
    Next(T),
    Error(String),
    Complete,
}

/// Records every callback it receives. Demand is only ever signalled by the
/// test itself, unless the subscriber was built with
/// [`requesting_on_next`](Self::requesting_on_next).
pub(crate) struct TestSubscriber<T> {
    events: Mutex<Vec<Event<T>>>,
    subscription: Mutex<Option<Arc<dyn Subscription>>>,
    request_on_next: u64,
}

impl<T> TestSubscriber<T> {
    pub(crate) fn new() -> Arc<Self> {
        Self::requesting_on_next(0)
    }

    /// A subscriber that requests `n` more items from inside every `on_next`.
    pub(crate) fn requesting_on_next(n: u64) -> Arc<Self> {
        Arc::new(Self {
            events: Mutex::new(Vec::new()),
            subscription: Mutex::new(None),
            request_on_next: n,
        })
    }

    fn subscription(&self) -> Arc<dyn Subscription> {
        self.subscription.lock().clone().expect("not subscribed")
    }

    pub(crate) fn request(&self, n: u64) {
        self.subscription().request(n);
    }

    pub(crate) fn cancel(&self) {
        self.subscription().cancel();
    }

    pub(crate) fn is_terminated(&self) -> bool {
        self.events
            .lock()
            .iter()
            .any(|event| matches!(event, Event::Error(_) | Event::Complete))
    }
}

impl<T: Clone> TestSubscriber<T> {
    pub(crate) fn events(&self) -> Vec<Event<T>> {
        self.events.lock().clone()
    }

    pub(crate) fn items(&self) -> Vec<T> {
        self.events
            .lock()
            .iter()
            .filter_map(|event| match event {
                Event::Next(item) => Some(item.clone()),
                _ => None,
            })
            .collect()
    }
}

impl TestSubscriber<Value> {
    /// Received values as compact JSON.
    pub(crate) fn rendered(&self) -> Vec<String> {
        self.items().iter().map(ToString::to_string).collect()
    }
}

impl<T: Send> Subscriber<T> for TestSubscriber<T> {
    fn on_subscribe(&self, subscription: Arc<dyn Subscription>) {
        *self.subscription.lock() = Some(subscription);
    }

    fn on_next(&self, item: T) {
        self.events.lock().push(Event::Next(item));
        if self.request_on_next > 0 {
            self.request(self.request_on_next);
        }
    }

    fn on_error(&self, error: Error) {
        self.events.lock().push(Event::Error(error.to_string()));
    }

    fn on_complete(&self) {
        self.events.lock().push(Event::Complete);
    }
}

struct ManualState<T> {
    subscriber: Mutex<Option<Arc<dyn Subscriber<T>>>>,
    requested: AtomicU64,
    cancelled: AtomicBool,
}

impl<T> Subscription for ManualState<T>
where
    T: Send,
{
    fn request(&self, n: u64) {
        crate::flow::add_demand(&self.requested, n);
    }

    fn cancel(&self) {
        self.cancelled.store(true, Ordering::Release);
    }
}

/// A publisher whose items are pushed by the test through a
/// [`ManualHandle`]. It counts demand but does not enforce it.
pub(crate) struct ManualSource<T> {
    state: Arc<ManualState<T>>,
}

/// Drives a [`ManualSource`] after it was subscribed.
pub(crate) struct ManualHandle<T> {
    state: Arc<ManualState<T>>,
}

impl ManualSource<Bytes> {
    pub(crate) fn new() -> (Self, ManualHandle<Bytes>) {
        Self::of()
    }
}

impl<T> ManualSource<T> {
    pub(crate) fn of() -> (Self, ManualHandle<T>) {
        let state = Arc::new(ManualState {
            subscriber: Mutex::new(None),
            requested: AtomicU64::new(0),
            cancelled: AtomicBool::new(false),
        });
        (Self { state: state.clone() }, ManualHandle { state })
    }
}

impl<T: Send + 'static> Publisher<T> for ManualSource<T> {
    fn subscribe(self, subscriber: Arc<dyn Subscriber<T>>) {
        *self.state.subscriber.lock() = Some(subscriber.clone());
        subscriber.on_subscribe(self.state);
    }
}

impl<T> ManualHandle<T> {
    fn subscriber(&self) -> Option<Arc<dyn Subscriber<T>>> {
        if self.cancelled() {
            return None;
        }
        self.state.subscriber.lock().clone()
    }

    /// Delivers `item`. Ignored once cancelled.
    pub(crate) fn send(&self, item: T) {
        if let Some(subscriber) = self.subscriber() {
            subscriber.on_next(item);
        }
    }

    pub(crate) fn complete(&self) {
        if let Some(subscriber) = self.subscriber() {
            subscriber.on_complete();
        }
    }

    pub(crate) fn fail(&self, error: Error) {
        if let Some(subscriber) = self.subscriber() {
            subscriber.on_error(error);
        }
    }

    /// Total demand signalled so far.
    pub(crate) fn requested(&self) -> u64 {
        self.state.requested.load(Ordering::Acquire)
    }

    pub(crate) fn cancelled(&self) -> bool {
        self.state.cancelled.load(Ordering::Acquire)
    }
}

impl ManualHandle<Bytes> {
    pub(crate) fn push(&self, chunk: &[u8]) {
        self.send(Bytes::copy_from_slice(chunk));
    }
}
