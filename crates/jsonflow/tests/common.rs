#![allow(missing_docs, dead_code)]

use std::{
    sync::{
        Arc,
        mpsc::{Receiver, Sender, channel},
    },
    thread::{self, JoinHandle},
};

use bytes::Bytes;
use jsonflow::flow::{Publisher, Subscriber, Subscription};
use parking_lot::Mutex;

/// Records of the form `{"id":N,"tags":["tN"]}`, wrapped in one array.
pub fn records(n: usize) -> String {
    let items: Vec<String> = (0..n).map(|i| format!(r#"{{"id":{i},"tags":["t{i}"]}}"#)).collect();
    format!("[{}]", items.join(", "))
}

enum Signal {
    Request(u64),
    Cancel,
}

/// A publisher that delivers its items from a dedicated thread, one per
/// unit of demand, and completes as soon as they run out.
pub struct ThreadedSource<T = Bytes> {
    items: Vec<T>,
    worker: Arc<Mutex<Option<JoinHandle<()>>>>,
}

struct ThreadedSubscription {
    signals: Mutex<Sender<Signal>>,
}

impl Subscription for ThreadedSubscription {
    fn request(&self, n: u64) {
        let _ = self.signals.lock().send(Signal::Request(n));
    }

    fn cancel(&self) {
        let _ = self.signals.lock().send(Signal::Cancel);
    }
}

impl<T> ThreadedSource<T> {
    pub fn new(items: Vec<T>) -> Self {
        Self {
            items,
            worker: Arc::default(),
        }
    }

    /// Handle to the worker, available once subscribed.
    pub fn worker(&self) -> Arc<Mutex<Option<JoinHandle<()>>>> {
        self.worker.clone()
    }
}

impl<T> Publisher<T> for ThreadedSource<T>
where
    T: Clone + Send + 'static,
{
    fn subscribe(self, subscriber: Arc<dyn Subscriber<T>>) {
        let (sender, receiver) = channel();
        subscriber.on_subscribe(Arc::new(ThreadedSubscription {
            signals: Mutex::new(sender),
        }));
        let items = self.items;
        let handle = thread::spawn(move || deliver(&items, &*subscriber, &receiver));
        *self.worker.lock() = Some(handle);
    }
}

fn deliver<T: Clone>(items: &[T], subscriber: &dyn Subscriber<T>, signals: &Receiver<Signal>) {
    let mut items = items.iter();
    let mut demand = 0u64;
    loop {
        if items.len() == 0 {
            subscriber.on_complete();
            return;
        }
        if demand == 0 {
            match signals.recv() {
                Ok(Signal::Request(n)) => demand = demand.saturating_add(n),
                Ok(Signal::Cancel) | Err(_) => return,
            }
            continue;
        }
        if let Ok(Signal::Cancel) = signals.try_recv() {
            return;
        }
        if let Some(item) = items.next() {
            demand -= 1;
            subscriber.on_next(item.clone());
        }
    }
}
