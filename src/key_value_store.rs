//! The typed keyspace shared by every connection.
//!
//! A key holds at most one of three data types at a time. Expiry applies to
//! string entries only and is lazy: a read that observes a stale entry
//! removes it and reports the key as missing.

use std::collections::{HashMap, VecDeque};
use std::fmt;

use jiff::Timestamp;

pub type KeyValueStore = HashMap<String, Value>;

#[derive(Debug, PartialEq, Clone)]
pub struct Value {
    pub data: DataType,
    pub expiration: Option<Timestamp>,
}

impl Value {
    pub fn is_expired(&self) -> bool {
        self.expiration
            .is_some_and(|expiration| Timestamp::now() > expiration)
    }
}

#[derive(Debug, PartialEq, Clone)]
pub enum DataType {
    String(String),
    List(VecDeque<String>),
    Stream(Vec<StreamEntry>),
}

/// One stream record. Field order is the argument order of the XADD call
/// that wrote it.
#[derive(Debug, PartialEq, Clone)]
pub struct StreamEntry {
    pub id: StreamEntryId,
    pub fields: Vec<(String, String)>,
}

/// A stream entry id, ordered first by millisecond timestamp, then by
/// sequence number. `0-0` is never stored.
#[derive(Debug, PartialEq, Eq, PartialOrd, Ord, Clone, Copy)]
pub struct StreamEntryId {
    pub ms: u64,
    pub seq: u64,
}

impl StreamEntryId {
    pub const MAX: StreamEntryId = StreamEntryId {
        ms: u64::MAX,
        seq: u64::MAX,
    };

    pub fn new(ms: u64, seq: u64) -> Self {
        Self { ms, seq }
    }

    pub fn is_zero(&self) -> bool {
        self.ms == 0 && self.seq == 0
    }
}

impl fmt::Display for StreamEntryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.ms, self.seq)
    }
}

/// Removes the entry for `key` when its expiry has passed; returns whether
/// an eviction happened. Every read path calls this before looking a key up.
pub fn evict_if_expired(store: &mut KeyValueStore, key: &str) -> bool {
    match store.get(key) {
        Some(value) if value.is_expired() => {
            store.remove(key);
            true
        }
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use jiff::{SignedDuration, Timestamp};

    use super::{evict_if_expired, DataType, KeyValueStore, StreamEntryId, Value};

    #[test]
    fn test_stream_entry_id_ordering() {
        let test_cases = vec![
            ((1, 1), (1, 2), true),
            ((1, 2), (2, 0), true),
            ((2, 0), (1, 999), false),
            ((5, 5), (5, 5), false),
            ((0, 1), (1, 0), true),
        ];

        for ((ms_a, seq_a), (ms_b, seq_b), expected_less) in test_cases {
            let a = StreamEntryId::new(ms_a, seq_a);
            let b = StreamEntryId::new(ms_b, seq_b);
            assert_eq!(a < b, expected_less, "comparing {} and {}", a, b);
        }
    }

    #[test]
    fn test_stream_entry_id_display() {
        assert_eq!(StreamEntryId::new(1526919030474, 3).to_string(), "1526919030474-3");
        assert_eq!(StreamEntryId::new(0, 1).to_string(), "0-1");
    }

    #[test]
    fn test_evict_if_expired() {
        let mut store = KeyValueStore::new();
        store.insert(
            "stale".to_string(),
            Value {
                data: DataType::String("old".to_string()),
                expiration: Some(Timestamp::now() - SignedDuration::from_millis(50)),
            },
        );
        store.insert(
            "live".to_string(),
            Value {
                data: DataType::String("new".to_string()),
                expiration: Some(Timestamp::now() + SignedDuration::from_secs(60)),
            },
        );
        store.insert(
            "eternal".to_string(),
            Value {
                data: DataType::String("forever".to_string()),
                expiration: None,
            },
        );

        assert_eq!(evict_if_expired(&mut store, "stale"), true);
        assert_eq!(store.contains_key("stale"), false);
        assert_eq!(evict_if_expired(&mut store, "live"), false);
        assert_eq!(evict_if_expired(&mut store, "eternal"), false);
        assert_eq!(evict_if_expired(&mut store, "missing"), false);
        assert_eq!(store.len(), 2);
    }
}
