use std::{
    iter::Peekable,
    sync::{
        Arc,
        atomic::{AtomicBool, AtomicU64, Ordering},
    },
};

use parking_lot::Mutex;

use super::{Publisher, Subscriber, Subscription, WorkInProgress, add_demand, take_demand};
use crate::Error;

/// A [`Publisher`] over an iterator of results.
///
/// Items are pulled from the iterator only against outstanding demand. The
/// stream completes as soon as the iterator is exhausted, even without
/// demand, and fails on the first `Err`.
#[derive(Debug)]
pub struct IterPublisher<I> {
    iter: I,
}

/// Publishes the items of `iter`.
///
/// ```
/// use jsonflow::flow::{from_iter, into_stream};
/// use futures::{StreamExt, executor::block_on};
///
/// let items: Vec<i32> = block_on(into_stream(from_iter(1..=3), 2).map(Result::unwrap).collect());
/// assert_eq!(items, [1, 2, 3]);
/// ```
pub fn from_iter<I>(iter: I) -> IterPublisher<impl Iterator<Item = Result<I::Item, Error>>>
where
    I: IntoIterator,
{
    IterPublisher {
        iter: iter.into_iter().map(Ok),
    }
}

/// Publishes the items of `iter`, failing the stream on the first `Err`.
pub fn from_results<T, I>(iter: I) -> IterPublisher<I::IntoIter>
where
    I: IntoIterator<Item = Result<T, Error>>,
{
    IterPublisher { iter: iter.into_iter() }
}

impl<T, I> Publisher<T> for IterPublisher<I>
where
    T: Send + 'static,
    I: Iterator<Item = Result<T, Error>> + Send + 'static,
{
    fn subscribe(self, subscriber: Arc<dyn Subscriber<T>>) {
        let subscription = Arc::new(IterSubscription {
            iter: Mutex::new(Some(self.iter.peekable())),
            subscriber,
            requested: AtomicU64::new(0),
            wip: WorkInProgress::default(),
            cancelled: AtomicBool::new(false),
            invalid_demand: AtomicBool::new(false),
        });
        subscription.subscriber.on_subscribe(subscription.clone());
        subscription.drain();
    }
}

struct IterSubscription<T, I: Iterator<Item = Result<T, Error>>> {
    /// `None` once the stream has terminated or was cancelled.
    iter: Mutex<Option<Peekable<I>>>,
    subscriber: Arc<dyn Subscriber<T>>,
    requested: AtomicU64,
    wip: WorkInProgress,
    cancelled: AtomicBool,
    invalid_demand: AtomicBool,
}

impl<T, I> IterSubscription<T, I>
where
    I: Iterator<Item = Result<T, Error>>,
{
    /// Delivers items while there is demand. Reentrant calls (a subscriber
    /// requesting from inside `on_next`) are folded into the running loop.
    fn drain(&self) {
        if !self.wip.enter() {
            return;
        }
        let mut missed = 1;
        loop {
            self.emit();
            missed = self.wip.leave(missed);
            if missed == 0 {
                break;
            }
        }
    }

    fn emit(&self) {
        loop {
            if self.cancelled.load(Ordering::Acquire) {
                self.iter.lock().take();
                return;
            }
            if self.invalid_demand.swap(false, Ordering::AcqRel) {
                if self.finish() {
                    self.subscriber.on_error(Error::InvalidDemand);
                }
                return;
            }

            let exhausted = self.iter.lock().as_mut().is_none_or(|iter| iter.peek().is_none());
            if exhausted {
                if self.finish() {
                    self.subscriber.on_complete();
                }
                return;
            }
            if !take_demand(&self.requested) {
                return;
            }

            // The guard must be gone before `finish` or a subscriber callback.
            let next = self.iter.lock().as_mut().and_then(Iterator::next);
            match next {
                Some(Ok(item)) => self.subscriber.on_next(item),
                Some(Err(error)) => {
                    if self.finish() {
                        self.subscriber.on_error(error);
                    }
                    return;
                }
                None => return,
            }
        }
    }

    /// Drops the iterator, returning `true` for the first caller.
    fn finish(&self) -> bool {
        self.iter.lock().take().is_some()
    }
}

impl<T, I> Subscription for IterSubscription<T, I>
where
    T: Send,
    I: Iterator<Item = Result<T, Error>> + Send,
{
    fn request(&self, n: u64) {
        if n == 0 {
            self.invalid_demand.store(true, Ordering::Release);
        } else {
            add_demand(&self.requested, n);
        }
        self.drain();
    }

    fn cancel(&self) {
        self.cancelled.store(true, Ordering::Release);
        self.drain();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tests::support::{Event, TestSubscriber};

    #[test]
    fn delivers_only_requested_items() {
        let subscriber = TestSubscriber::<i32>::new();
        from_iter(1..=5).subscribe(subscriber.clone());
        assert!(subscriber.events().is_empty());

        subscriber.request(2);
        assert_eq!(subscriber.events(), vec![Event::Next(1), Event::Next(2)]);

        subscriber.request(10);
        assert_eq!(subscriber.items(), vec![1, 2, 3, 4, 5]);
        assert_eq!(subscriber.events().last(), Some(&Event::Complete));
    }

    #[test]
    fn empty_iterator_completes_without_demand() {
        let subscriber = TestSubscriber::<i32>::new();
        from_iter(Vec::<i32>::new()).subscribe(subscriber.clone());
        assert_eq!(subscriber.events(), vec![Event::Complete]);
    }

    #[test]
    fn error_item_terminates() {
        let subscriber = TestSubscriber::<i32>::new();
        from_results(vec![Ok(1), Err(Error::transport("boom")), Ok(3)]).subscribe(subscriber.clone());
        subscriber.request(5);
        let events = subscriber.events();
        assert_eq!(events.len(), 2);
        assert_eq!(events[0], Event::Next(1));
        assert!(matches!(&events[1], Event::Error(e) if e == "transport error: boom"));
    }

    #[test]
    fn error_item_does_not_block_the_emitting_thread() {
        let (done, finished) = std::sync::mpsc::channel();
        std::thread::spawn(move || {
            let subscriber = TestSubscriber::<i32>::requesting_on_next(1);
            from_results(vec![Ok(1), Ok(2), Err(Error::transport("lost"))]).subscribe(subscriber.clone());
            subscriber.request(1);
            let _ = done.send(subscriber.events());
        });
        let events = finished
            .recv_timeout(std::time::Duration::from_secs(10))
            .expect("emitting an error item never returned");
        assert_eq!(events.len(), 3);
        assert_eq!(&events[..2], &[Event::Next(1), Event::Next(2)]);
        assert_eq!(events[2], Event::Error("transport error: lost".into()));
    }

    #[test]
    fn request_zero_is_a_protocol_error() {
        let subscriber = TestSubscriber::<i32>::new();
        from_iter(1..=5).subscribe(subscriber.clone());
        subscriber.request(0);
        subscriber.request(3);
        assert_eq!(subscriber.events(), vec![Event::Error("demand must be positive".into())]);
    }

    #[test]
    fn cancel_stops_delivery() {
        let subscriber = TestSubscriber::<i32>::new();
        from_iter(1..).subscribe(subscriber.clone());
        subscriber.request(2);
        subscriber.cancel();
        subscriber.request(2);
        assert_eq!(subscriber.items(), vec![1, 2]);
        assert_eq!(subscriber.events().len(), 2);
    }

    #[test]
    fn reentrant_request_does_not_recurse() {
        let subscriber = TestSubscriber::<i32>::requesting_on_next(1);
        from_iter(0..100_000).subscribe(subscriber.clone());
        subscriber.request(1);
        assert_eq!(subscriber.items().len(), 100_000);
        assert_eq!(subscriber.events().last(), Some(&Event::Complete));
    }
}
