//! Record value model
//!
//! Log records arrive from the collection agent as heterogeneously-typed
//! maps: keys are usually strings, values are usually byte sequences, but
//! nothing is guaranteed. `Value` models that shape as a tagged variant
//! with safe downcasts, so field extraction becomes a pattern match that
//! degrades to "absent" on any type mismatch instead of failing.

/// A dynamically-typed record value.
///
/// Anything the upstream decoder cannot represent in one of these variants
/// is mapped to `Null`, which no downcast matches - unexpected shapes are
/// silently ignored downstream.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// Absent or unrepresentable value
    Null,

    /// Signed integer
    Integer(i64),

    /// Raw byte sequence (the common case for log fields)
    Bytes(Vec<u8>),

    /// UTF-8 string (the common case for map keys)
    Str(String),

    /// Ordered list
    List(Vec<Value>),

    /// Map as a pair list; keys may be any value, but only `Str` keys are
    /// recognised by consumers
    Map(Vec<(Value, Value)>),
}

impl Value {
    /// Downcast to a string slice, `None` unless this is `Str`
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Str(s) => Some(s),
            _ => None,
        }
    }

    /// Downcast to a byte slice, `None` unless this is `Bytes`
    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            Self::Bytes(b) => Some(b),
            _ => None,
        }
    }

    /// Downcast to map entries, `None` unless this is `Map`
    pub fn as_map(&self) -> Option<&[(Value, Value)]> {
        match self {
            Self::Map(entries) => Some(entries),
            _ => None,
        }
    }

    /// Downcast to an integer, `None` unless this is `Integer`
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Self::Integer(i) => Some(*i),
            _ => None,
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Self::Str(s.to_string())
    }
}

impl From<&[u8]> for Value {
    fn from(b: &[u8]) -> Self {
        Self::Bytes(b.to_vec())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn downcasts_match_only_their_variant() {
        assert_eq!(Value::Str("a".into()).as_str(), Some("a"));
        assert_eq!(Value::Bytes(b"a".to_vec()).as_str(), None);

        assert_eq!(Value::Bytes(b"a".to_vec()).as_bytes(), Some(&b"a"[..]));
        assert_eq!(Value::Str("a".into()).as_bytes(), None);

        assert!(Value::Map(vec![]).as_map().is_some());
        assert_eq!(Value::List(vec![]).as_map(), None);

        assert_eq!(Value::Integer(7).as_i64(), Some(7));
        assert_eq!(Value::Null.as_i64(), None);
    }

    #[test]
    fn map_entries_preserve_order() {
        let map = Value::Map(vec![
            (Value::from("b"), Value::from(&b"1"[..])),
            (Value::from("a"), Value::from(&b"2"[..])),
        ]);
        let entries = map.as_map().unwrap();
        assert_eq!(entries[0].0.as_str(), Some("b"));
        assert_eq!(entries[1].0.as_str(), Some("a"));
    }
}
