#![no_main]
use std::sync::{Arc, Mutex};

use arbitrary::Arbitrary;
use jsonflow::{
    Value, decode,
    chunk_utils::split_with_seed,
    flow::{Publisher, Subscriber, Subscription, UNBOUNDED, from_iter},
};
use libfuzzer_sys::fuzz_target;

#[derive(Debug, Arbitrary)]
struct Input {
    split_seed: u64,
    prefetch: Option<u8>,
    data: Vec<u8>,
}

#[derive(Default)]
struct Collect {
    values: Mutex<Vec<Value>>,
    outcome: Mutex<Option<Result<(), String>>>,
}

impl Subscriber<Value> for Collect {
    fn on_subscribe(&self, subscription: Arc<dyn Subscription>) {
        subscription.request(UNBOUNDED);
    }

    fn on_next(&self, item: Value) {
        self.values.lock().unwrap().push(item);
    }

    fn on_error(&self, error: jsonflow::Error) {
        let previous = self.outcome.lock().unwrap().replace(Err(error.to_string()));
        assert!(previous.is_none(), "second terminal signal");
    }

    fn on_complete(&self) {
        let previous = self.outcome.lock().unwrap().replace(Ok(()));
        assert!(previous.is_none(), "second terminal signal");
    }
}

/// Integers compare by value, so `-0` and `0` agree.
fn normalize(value: serde_json::Value) -> serde_json::Value {
    use serde_json::Value as Json;
    match value {
        Json::Number(n) => n.as_i64().map_or(Json::Number(n), Json::from),
        Json::Array(items) => Json::Array(items.into_iter().map(normalize).collect()),
        Json::Object(map) => Json::Object(map.into_iter().map(|(k, v)| (k, normalize(v))).collect()),
        other => other,
    }
}

/// What `serde_json` makes of the same bytes, if it accepts them and every
/// root value is a container.
fn reference(data: &[u8]) -> Option<Vec<serde_json::Value>> {
    let values: Vec<serde_json::Value> = serde_json::Deserializer::from_slice(data)
        .into_iter()
        .collect::<Result<_, _>>()
        .ok()?;
    values
        .iter()
        .all(|value| value.is_array() || value.is_object())
        .then(|| values.into_iter().map(normalize).collect())
}

fuzz_target!(|input: Input| {
    let chunks = split_with_seed(&input.data, input.split_seed);
    let collect = Arc::new(Collect::default());
    let mut decoder = decode(from_iter(chunks));
    if let Some(batch) = input.prefetch {
        decoder = decoder.prefetch(usize::from(batch));
    }
    decoder.subscribe(collect.clone());

    let outcome = collect.outcome.lock().unwrap().clone();
    assert!(outcome.is_some(), "stream neither completed nor failed");

    if let Some(expected) = reference(&input.data) {
        assert_eq!(outcome, Some(Ok(())), "rejected input serde_json accepts");
        let values = collect.values.lock().unwrap();
        let actual: Vec<serde_json::Value> = values
            .iter()
            .map(|value| normalize(serde_json::from_str(&value.to_string()).unwrap()))
            .collect();
        assert_eq!(actual, expected);
    }
});
