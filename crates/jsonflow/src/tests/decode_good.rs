use bytes::Bytes;
use rstest::rstest;

use crate::{
    Number, Value,
    chunk_utils::split_with_seed,
    decode,
    flow::{Publisher, UNBOUNDED, from_iter},
    tests::support::{Event, TestSubscriber},
};

fn decode_str(src: &str, ignore_level: usize) -> Vec<String> {
    let chunks: Vec<Bytes> = split_with_seed(src.as_bytes(), 0x5eed);
    let subscriber = TestSubscriber::<Value>::new();
    decode(from_iter(chunks)).ignore_level(ignore_level).subscribe(subscriber.clone());
    subscriber.request(UNBOUNDED);
    assert_eq!(subscriber.events().last(), Some(&Event::Complete), "{src}");
    subscriber.rendered()
}

#[rstest]
#[case::object(r#"{"a":1}"#, &[r#"{"a":1}"#])]
#[case::whitespace(" \n\t{ }\r\n ", &["{}"])]
#[case::nested(r#"{"a" : {"b" : [ {}, [] ]}}"#, &[r#"{"a":{"b":[{},[]]}}"#])]
#[case::scalars_in_array("[true, false, null, \"x\"]", &[r#"[true,false,null,"x"]"#])]
#[case::numbers(
    "[1, -0, 2.50, -3e2, 12345678901, 123456789012345678901234567890]",
    &["[1,0,2.50,-3e2,12345678901,123456789012345678901234567890]"]
)]
#[case::escapes(r#"["é😀\t"]"#, &["[\"é😀\\t\"]"])]
#[case::concatenated(r#"[1]{"a":[]} []"#, &["[1]", r#"{"a":[]}"#, "[]"])]
#[case::empty_input("", &[])]
#[case::only_whitespace("   ", &[])]
fn decodes_documents(#[case] src: &str, #[case] expected: &[&str]) {
    assert_eq!(decode_str(src, 0), expected);
}

#[rstest]
#[case::elements(r#"[{"x":1},{"x":2}]"#, 1, &[r#"{"x":1}"#, r#"{"x":2}"#])]
#[case::whole_array(r#"[{"x":1},{"x":2}]"#, 0, &[r#"[{"x":1},{"x":2}]"#])]
#[case::two_levels("[[[1],[2]],[[3]]]", 2, &["[1]", "[2]", "[3]"])]
#[case::per_root("[[1]] [[2],[3]]", 1, &["[1]", "[2]", "[3]"])]
#[case::empty_outer("[]", 1, &[])]
#[case::deeper_than_input("[[]]", 5, &[])]
fn unwraps_ignored_levels(#[case] src: &str, #[case] ignore_level: usize, #[case] expected: &[&str]) {
    assert_eq!(decode_str(src, ignore_level), expected);
}

#[test]
fn numbers_keep_their_representation() {
    let subscriber = TestSubscriber::<Value>::new();
    let src = "[123, 1234567890123456789012345678901234567890, 0.1000]";
    decode(from_iter([Bytes::from_static(src.as_bytes())])).subscribe(subscriber.clone());
    subscriber.request(1);
    let items = subscriber.items();
    let array = items[0].as_array().unwrap();
    assert_eq!(array[0], Value::Number(Number::Int(123)));
    assert_eq!(
        array[1],
        Value::Number(Number::BigInteger("1234567890123456789012345678901234567890".into()))
    );
    assert_eq!(array[2], Value::Number(Number::BigDecimal("0.1000".into())));
    assert_eq!(serde_json::to_string(&items[0]).unwrap(), "[123,1234567890123456789012345678901234567890,0.1000]");
}

#[test]
fn insertion_order_is_preserved() {
    let rendered = decode_str(r#"{"z":1,"a":2,"m":3,"a":4}"#, 0);
    assert_eq!(rendered, [r#"{"z":1,"a":4,"m":3}"#]);
}
