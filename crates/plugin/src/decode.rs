//! Flush-payload decoding
//!
//! A flush hands the plugin a MessagePack stream of `[timestamp, record]`
//! entries. Records convert into the core's tagged value type; timestamps
//! coerce from the host's event-time extension, from plain integers, or
//! fall back to the wall clock.
//!
//! Decoding is forgiving: a malformed entry is skipped, a truncated
//! stream keeps everything decoded so far. Lost telemetry beats a failed
//! flush.

use chrono::{DateTime, Utc};
use logdrain_syslog::Value;
use rmpv::Value as Mp;

/// Event-time extension: type 0, 4 bytes of big-endian seconds followed
/// by 4 bytes of big-endian nanoseconds
const EVENT_TIME_EXT: i8 = 0;

/// One decoded flush entry.
#[derive(Debug)]
pub struct Entry {
    pub timestamp: DateTime<Utc>,
    pub record: Value,
}

/// Decode every `[timestamp, record]` entry in `data`.
pub fn decode_entries(mut data: &[u8]) -> Vec<Entry> {
    let mut entries = Vec::new();
    while !data.is_empty() {
        match rmpv::decode::read_value(&mut data) {
            Ok(value) => {
                if let Some(entry) = decode_entry(value) {
                    entries.push(entry);
                } else {
                    tracing::trace!("skipping malformed flush entry");
                }
            }
            Err(e) => {
                tracing::debug!(error = %e, "truncated flush payload");
                break;
            }
        }
    }
    entries
}

fn decode_entry(value: Mp) -> Option<Entry> {
    let Mp::Array(items) = value else {
        return None;
    };
    if items.len() != 2 {
        return None;
    }
    let mut items = items.into_iter();
    let timestamp = coerce_timestamp(&items.next()?);
    let record = record_value(items.next()?);
    Some(Entry { timestamp, record })
}

/// Resolve an entry's timestamp.
///
/// Event-time extensions and unsigned seconds-since-epoch are honored;
/// anything else gets the current wall clock. Hosts that wrap the
/// timestamp together with event metadata in an array are unwrapped one
/// level.
pub(crate) fn coerce_timestamp(value: &Mp) -> DateTime<Utc> {
    match value {
        Mp::Ext(EVENT_TIME_EXT, bytes) if bytes.len() >= 8 => {
            let secs = u32::from_be_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]);
            let nanos = u32::from_be_bytes([bytes[4], bytes[5], bytes[6], bytes[7]]);
            DateTime::from_timestamp(i64::from(secs), nanos).unwrap_or_else(Utc::now)
        }
        Mp::Integer(i) => i
            .as_u64()
            .and_then(|secs| i64::try_from(secs).ok())
            .and_then(|secs| DateTime::from_timestamp(secs, 0))
            .unwrap_or_else(Utc::now),
        Mp::Array(items) => match items.first() {
            Some(first) => coerce_timestamp(first),
            None => Utc::now(),
        },
        _ => Utc::now(),
    }
}

/// Convert a decoded value into the core record model.
///
/// Record values are byte-oriented: both MessagePack strings and binary
/// blobs become `Bytes`, matching how collection agents encode log
/// fields. Map keys keep their string identity so field names match.
pub(crate) fn record_value(value: Mp) -> Value {
    match value {
        Mp::Binary(bytes) => Value::Bytes(bytes),
        Mp::String(s) => Value::Bytes(s.into_bytes()),
        Mp::Integer(i) => i.as_i64().map_or(Value::Null, Value::Integer),
        Mp::Array(items) => Value::List(items.into_iter().map(record_value).collect()),
        Mp::Map(pairs) => Value::Map(
            pairs
                .into_iter()
                .map(|(k, v)| (key_value(k), record_value(v)))
                .collect(),
        ),
        _ => Value::Null,
    }
}

/// Map keys keep their string identity; everything else converts like a
/// record value and simply fails the consumer's string match.
fn key_value(value: Mp) -> Value {
    match value {
        Mp::String(s) => match s.into_str() {
            Some(key) => Value::Str(key),
            None => Value::Null,
        },
        other => record_value(other),
    }
}

#[cfg(test)]
#[path = "decode_test.rs"]
mod decode_test;
