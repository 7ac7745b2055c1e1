use std::sync::atomic::{AtomicBool, Ordering};

use super::shared::{Mode, Shared};
use crate::flow::WorkInProgress;

/// Requests one chunk at a time, and only while downstream demand is
/// outstanding and the tokenizer has run dry.
///
/// Drain passes are serialised by a work-in-progress counter: every callback
/// increments it, and the caller that found it at zero keeps draining until
/// all work registered meanwhile is retired.
#[derive(Debug, Default)]
pub(super) struct NonPrefetching {
    wip: WorkInProgress,
    /// A chunk has been requested and not yet delivered.
    in_flight: AtomicBool,
}

impl Mode for NonPrefetching {
    fn drain(&self, shared: &Shared) {
        if !self.wip.enter() {
            return;
        }
        let mut missed = 1;
        loop {
            shared.drain_pass(self);
            missed = self.wip.leave(missed);
            if missed == 0 {
                break;
            }
        }
    }

    fn delivered(&self, _shared: &Shared, _queued: usize) {
        self.in_flight.store(false, Ordering::Release);
    }

    fn starved(&self, shared: &Shared) {
        if !shared.has_demand() || self.in_flight.swap(true, Ordering::AcqRel) {
            return;
        }
        if !shared.request_upstream(1) {
            self.in_flight.store(false, Ordering::Release);
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::{
        Value, decode,
        flow::Publisher,
        tests::support::{Event, ManualSource, TestSubscriber},
    };

    #[test]
    fn requests_one_chunk_per_need() {
        let (source, handle) = ManualSource::new();
        let subscriber = TestSubscriber::<Value>::new();
        decode(source).subscribe(subscriber.clone());
        assert_eq!(handle.requested(), 0);

        subscriber.request(1);
        assert_eq!(handle.requested(), 1);

        handle.push(br#"{"a":"#);
        assert_eq!(handle.requested(), 2);
        handle.push(br#"1}{"b":2}"#);
        assert_eq!(subscriber.rendered(), [r#"{"a":1}"#]);
        // The second value is parsed and parked, so no chunk is needed.
        assert_eq!(handle.requested(), 2);

        subscriber.request(1);
        assert_eq!(subscriber.rendered(), [r#"{"a":1}"#, r#"{"b":2}"#]);
        // Demand is used up, so nothing more is pulled.
        assert_eq!(handle.requested(), 2);
        subscriber.request(1);
        assert_eq!(handle.requested(), 3);

        handle.complete();
        assert_eq!(subscriber.events().last(), Some(&Event::Complete));
    }

    #[test]
    fn completes_without_demand_once_input_is_consumed() {
        let (source, handle) = ManualSource::new();
        let subscriber = TestSubscriber::<Value>::new();
        decode(source).subscribe(subscriber.clone());
        subscriber.request(1);
        handle.push(b"[1]");
        handle.complete();
        assert_eq!(subscriber.rendered(), ["[1]"]);
        assert_eq!(subscriber.events().last(), Some(&Event::Complete));
    }

    #[test]
    fn parked_value_waits_for_demand_before_completion() {
        let (source, handle) = ManualSource::new();
        let subscriber = TestSubscriber::<Value>::new();
        decode(source).subscribe(subscriber.clone());
        subscriber.request(1);
        handle.push(b"[1] [2]");
        handle.complete();
        assert_eq!(subscriber.rendered(), ["[1]"]);
        assert!(!subscriber.is_terminated());

        subscriber.request(1);
        assert_eq!(subscriber.rendered(), ["[1]", "[2]"]);
        assert!(subscriber.is_terminated());
    }
}
