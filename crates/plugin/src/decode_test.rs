use chrono::Utc;
use rmpv::Value as Mp;

use super::*;

fn mp_str(s: &str) -> Mp {
    Mp::String(s.into())
}

fn encode(values: &[Mp]) -> Vec<u8> {
    let mut buf = Vec::new();
    for value in values {
        rmpv::encode::write_value(&mut buf, value).unwrap();
    }
    buf
}

fn event_time(secs: u32, nanos: u32) -> Mp {
    let mut bytes = Vec::with_capacity(8);
    bytes.extend_from_slice(&secs.to_be_bytes());
    bytes.extend_from_slice(&nanos.to_be_bytes());
    Mp::Ext(0, bytes)
}

fn entry(ts: Mp, record: Mp) -> Mp {
    Mp::Array(vec![ts, record])
}

fn log_record(log: &str) -> Mp {
    Mp::Map(vec![(mp_str("log"), mp_str(log))])
}

// =============================================================================
// Entry decoding
// =============================================================================

#[test]
fn decodes_a_batch_of_entries_in_order() {
    let data = encode(&[
        entry(event_time(10, 0), log_record("first")),
        entry(event_time(20, 0), log_record("second")),
    ]);

    let entries = decode_entries(&data);
    assert_eq!(entries.len(), 2);
    assert_eq!(entries[0].timestamp.timestamp(), 10);
    assert_eq!(entries[1].timestamp.timestamp(), 20);

    let record = entries[0].record.as_map().unwrap();
    assert_eq!(record[0].0.as_str(), Some("log"));
    assert_eq!(record[0].1.as_bytes(), Some(&b"first"[..]));
}

#[test]
fn skips_malformed_entries_but_keeps_the_rest() {
    let data = encode(&[
        mp_str("not an entry"),
        Mp::Array(vec![event_time(1, 0)]),
        entry(event_time(2, 0), log_record("kept")),
    ]);

    let entries = decode_entries(&data);
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].timestamp.timestamp(), 2);
}

#[test]
fn truncated_payload_keeps_complete_entries() {
    let mut data = encode(&[entry(event_time(1, 0), log_record("complete"))]);
    data.extend_from_slice(&[0x91]); // array header with a missing element

    let entries = decode_entries(&data);
    assert_eq!(entries.len(), 1);
}

#[test]
fn empty_payload_decodes_to_nothing() {
    assert!(decode_entries(&[]).is_empty());
}

// =============================================================================
// Timestamp coercion
// =============================================================================

#[test]
fn event_time_extension_carries_seconds_and_nanos() {
    let ts = coerce_timestamp(&event_time(1_531_763_236, 500_000_000));
    assert_eq!(ts.timestamp(), 1_531_763_236);
    assert_eq!(ts.timestamp_subsec_nanos(), 500_000_000);
}

#[test]
fn unsigned_integers_are_seconds_since_epoch() {
    let ts = coerce_timestamp(&Mp::Integer(1_531_763_236u64.into()));
    assert_eq!(ts.timestamp(), 1_531_763_236);
}

#[test]
fn wrapped_event_time_is_unwrapped() {
    let wrapped = Mp::Array(vec![event_time(42, 0), Mp::Map(vec![])]);
    assert_eq!(coerce_timestamp(&wrapped).timestamp(), 42);
}

#[test]
fn unrecognised_timestamps_fall_back_to_the_wall_clock() {
    let before = Utc::now();
    for value in [
        mp_str("2018-07-16"),
        Mp::Nil,
        Mp::Integer((-5i64).into()),
        Mp::Ext(0, vec![1, 2, 3]),
    ] {
        let ts = coerce_timestamp(&value);
        assert!(ts >= before, "value: {value:?}");
    }
}

// =============================================================================
// Record conversion
// =============================================================================

#[test]
fn strings_and_binary_both_become_bytes() {
    assert_eq!(
        record_value(mp_str("hello")),
        logdrain_syslog::Value::Bytes(b"hello".to_vec()),
    );
    assert_eq!(
        record_value(Mp::Binary(vec![0xbd, 0xb2])),
        logdrain_syslog::Value::Bytes(vec![0xbd, 0xb2]),
    );
}

#[test]
fn map_keys_stay_strings() {
    let record = record_value(Mp::Map(vec![(
        mp_str("kubernetes"),
        Mp::Map(vec![(mp_str("namespace_name"), mp_str("kube-system"))]),
    )]));

    let entries = record.as_map().unwrap();
    assert_eq!(entries[0].0.as_str(), Some("kubernetes"));
    let nested = entries[0].1.as_map().unwrap();
    assert_eq!(nested[0].0.as_str(), Some("namespace_name"));
    assert_eq!(nested[0].1.as_bytes(), Some(&b"kube-system"[..]));
}

#[test]
fn unrepresentable_values_become_null() {
    for value in [Mp::Boolean(true), Mp::F64(1.5), Mp::Ext(9, vec![])] {
        assert_eq!(record_value(value), logdrain_syslog::Value::Null);
    }
}

#[test]
fn a_full_record_flows_through_the_message_builder() {
    let record = record_value(Mp::Map(vec![
        (mp_str("log"), mp_str("some-log")),
        (
            mp_str("kubernetes"),
            Mp::Map(vec![
                (mp_str("namespace_name"), mp_str("kube-system")),
                (mp_str("pod_name"), mp_str("etcd-minikube")),
                (mp_str("host"), mp_str("some-host")),
                (mp_str("container_name"), mp_str("etcd")),
            ]),
        ),
    ]));

    let (msg, namespace) = logdrain_syslog::build(
        &record,
        chrono::DateTime::from_timestamp(0, 0).unwrap(),
        "pod.log",
    );
    assert_eq!(namespace, "kube-system");
    let rendered = String::from_utf8(msg.render(false)).unwrap();
    assert!(rendered.contains("pod.log/kube-system/etcd-minikube/etcd"));
}
