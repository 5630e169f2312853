//! Dynamic document value type.

use crate::timestamp::Timestamp;
use std::cmp::Ordering;

/// A dynamic document value.
///
/// Documents are maps of text keys to values. Floats are intentionally not
/// supported so that every value has exactly one encoding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Value {
    /// Null value.
    Null,
    /// Boolean value.
    Bool(bool),
    /// Signed integer.
    Integer(i64),
    /// Point in time.
    Timestamp(Timestamp),
    /// Byte string.
    Bytes(Vec<u8>),
    /// Text string (UTF-8).
    Text(String),
    /// Array of values.
    Array(Vec<Value>),
    /// Map of key-value pairs (kept in canonical key order by [`Value::map`]).
    Map(Vec<(Value, Value)>),
}

impl Value {
    /// Create a map value with sorted keys.
    pub fn map(mut pairs: Vec<(Value, Value)>) -> Self {
        pairs.sort_by(|a, b| a.0.cmp_canonical(&b.0));
        Value::Map(pairs)
    }

    /// Create a map value from text keys.
    pub fn text_map<K: Into<String>>(pairs: impl IntoIterator<Item = (K, Value)>) -> Self {
        Self::map(
            pairs
                .into_iter()
                .map(|(k, v)| (Value::Text(k.into()), v))
                .collect(),
        )
    }

    /// Compare two values in canonical encoding order.
    ///
    /// Major type first, then length-first for strings and containers.
    /// This is the order map keys are written in.
    pub fn cmp_canonical(&self, other: &Self) -> Ordering {
        let (a_type, b_type) = (self.major_type(), other.major_type());
        if a_type != b_type {
            return a_type.cmp(&b_type);
        }

        match (self, other) {
            // Non-negative integers: a longer encoding is always a larger
            // number, so numeric order is canonical order.
            (Value::Integer(a), Value::Integer(b)) if *a >= 0 => a.cmp(b),
            // Negative integers encode -1 - n, so the order flips.
            (Value::Integer(a), Value::Integer(b)) => b.cmp(a),
            (Value::Timestamp(a), Value::Timestamp(b)) => a.cmp(b),
            (Value::Bytes(a), Value::Bytes(b)) => a.len().cmp(&b.len()).then_with(|| a.cmp(b)),
            (Value::Text(a), Value::Text(b)) => a.len().cmp(&b.len()).then_with(|| a.cmp(b)),
            (Value::Array(a), Value::Array(b)) => a.len().cmp(&b.len()).then_with(|| {
                a.iter()
                    .zip(b)
                    .map(|(x, y)| x.cmp_canonical(y))
                    .find(|ord| *ord != Ordering::Equal)
                    .unwrap_or(Ordering::Equal)
            }),
            (Value::Map(a), Value::Map(b)) => a.len().cmp(&b.len()).then_with(|| {
                a.iter()
                    .zip(b)
                    .map(|((ak, av), (bk, bv))| {
                        ak.cmp_canonical(bk).then_with(|| av.cmp_canonical(bv))
                    })
                    .find(|ord| *ord != Ordering::Equal)
                    .unwrap_or(Ordering::Equal)
            }),
            // Simple values: false (20) < true (21) < null (22).
            (Value::Bool(a), Value::Bool(b)) => a.cmp(b),
            (Value::Bool(_), Value::Null) => Ordering::Less,
            (Value::Null, Value::Bool(_)) => Ordering::Greater,
            _ => Ordering::Equal,
        }
    }

    /// Compare two values by their natural meaning.
    ///
    /// Returns `None` when the values are of different kinds and have no
    /// meaningful order (a text is neither smaller nor larger than an integer).
    pub fn cmp_natural(&self, other: &Self) -> Option<Ordering> {
        match (self, other) {
            (Value::Null, Value::Null) => Some(Ordering::Equal),
            (Value::Bool(a), Value::Bool(b)) => Some(a.cmp(b)),
            (Value::Integer(a), Value::Integer(b)) => Some(a.cmp(b)),
            (Value::Timestamp(a), Value::Timestamp(b)) => Some(a.cmp(b)),
            (Value::Bytes(a), Value::Bytes(b)) => Some(a.cmp(b)),
            (Value::Text(a), Value::Text(b)) => Some(a.cmp(b)),
            (Value::Array(_), Value::Array(_)) | (Value::Map(_), Value::Map(_)) => {
                (self == other).then_some(Ordering::Equal)
            }
            _ => None,
        }
    }

    /// Total order used for sorting.
    ///
    /// Values of the same kind sort naturally; different kinds sort by kind,
    /// with null first.
    pub fn cmp_sort(&self, other: &Self) -> Ordering {
        self.cmp_natural(other)
            .unwrap_or_else(|| self.kind_rank().cmp(&other.kind_rank()))
    }

    fn kind_rank(&self) -> u8 {
        match self {
            Value::Null => 0,
            Value::Integer(_) => 1,
            Value::Text(_) => 2,
            Value::Map(_) => 3,
            Value::Array(_) => 4,
            Value::Bytes(_) => 5,
            Value::Bool(_) => 6,
            Value::Timestamp(_) => 7,
        }
    }

    fn major_type(&self) -> u8 {
        match self {
            Value::Integer(n) if *n >= 0 => 0,
            Value::Integer(_) => 1,
            Value::Bytes(_) => 2,
            Value::Text(_) => 3,
            Value::Array(_) => 4,
            Value::Map(_) => 5,
            Value::Timestamp(_) => 6,
            Value::Bool(_) | Value::Null => 7,
        }
    }

    /// Check if this value is null.
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Get this value as a boolean, if it is one.
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Get this value as an integer, if it is one.
    pub fn as_integer(&self) -> Option<i64> {
        match self {
            Value::Integer(n) => Some(*n),
            _ => None,
        }
    }

    /// Get this value as a timestamp, if it is one.
    pub fn as_timestamp(&self) -> Option<Timestamp> {
        match self {
            Value::Timestamp(t) => Some(*t),
            _ => None,
        }
    }

    /// Get this value as bytes, if it is a byte string.
    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            Value::Bytes(b) => Some(b),
            _ => None,
        }
    }

    /// Get this value as a string, if it is a text string.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Value::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Get this value as an array, if it is one.
    pub fn as_array(&self) -> Option<&[Value]> {
        match self {
            Value::Array(a) => Some(a),
            _ => None,
        }
    }

    /// Get this value as a map, if it is one.
    pub fn as_map(&self) -> Option<&[(Value, Value)]> {
        match self {
            Value::Map(m) => Some(m),
            _ => None,
        }
    }

    /// Look up a text key in this map value.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.as_map()?
            .iter()
            .find(|(k, _)| k.as_text() == Some(key))
            .map(|(_, v)| v)
    }

    /// Look up a dotted path (`"a.b.c"`) through nested maps.
    pub fn get_path(&self, path: &str) -> Option<&Value> {
        path.split('.')
            .try_fold(self, |value, segment| value.get(segment))
    }

    /// Short kind name, used in error messages.
    pub fn kind_name(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Bool(_) => "bool",
            Value::Integer(_) => "integer",
            Value::Timestamp(_) => "timestamp",
            Value::Bytes(_) => "bytes",
            Value::Text(_) => "text",
            Value::Array(_) => "array",
            Value::Map(_) => "map",
        }
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Integer(n)
    }
}

impl From<i32> for Value {
    fn from(n: i32) -> Self {
        Value::Integer(i64::from(n))
    }
}

impl From<u32> for Value {
    fn from(n: u32) -> Self {
        Value::Integer(i64::from(n))
    }
}

impl From<Timestamp> for Value {
    fn from(t: Timestamp) -> Self {
        Value::Timestamp(t)
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Text(s)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Text(s.to_string())
    }
}

impl From<Vec<u8>> for Value {
    fn from(b: Vec<u8>) -> Self {
        Value::Bytes(b)
    }
}

impl From<&[u8]> for Value {
    fn from(b: &[u8]) -> Self {
        Value::Bytes(b.to_vec())
    }
}

impl From<Vec<Value>> for Value {
    fn from(v: Vec<Value>) -> Self {
        Value::Array(v)
    }
}

impl From<()> for Value {
    fn from((): ()) -> Self {
        Value::Null
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn map_keys_are_length_first() {
        let map = Value::text_map([
            ("abc", Value::Integer(1)),
            ("b", Value::Integer(2)),
            ("a", Value::Integer(3)),
        ]);

        let keys: Vec<_> = map
            .as_map()
            .unwrap()
            .iter()
            .map(|(k, _)| k.as_text().unwrap())
            .collect();
        assert_eq!(keys, vec!["a", "b", "abc"]);
    }

    #[test]
    fn canonical_integer_ordering() {
        let mut values = vec![
            Value::Integer(-1),
            Value::Integer(0),
            Value::Integer(300),
            Value::Integer(-2),
            Value::Integer(2),
        ];
        values.sort_by(Value::cmp_canonical);

        assert_eq!(
            values,
            vec![
                Value::Integer(0),
                Value::Integer(2),
                Value::Integer(300),
                Value::Integer(-1),
                Value::Integer(-2),
            ]
        );
    }

    #[test]
    fn natural_ordering_rejects_mixed_kinds() {
        assert_eq!(
            Value::Integer(1).cmp_natural(&Value::Integer(2)),
            Some(Ordering::Less)
        );
        assert_eq!(
            Value::from("b").cmp_natural(&Value::from("abc")),
            Some(Ordering::Greater)
        );
        assert_eq!(Value::Integer(1).cmp_natural(&Value::from("1")), None);
    }

    #[test]
    fn sort_puts_null_first() {
        let mut values = vec![Value::Integer(3), Value::Null, Value::Integer(1)];
        values.sort_by(Value::cmp_sort);
        assert_eq!(values[0], Value::Null);
        assert_eq!(values[1], Value::Integer(1));
    }

    #[test]
    fn path_lookup() {
        let doc = Value::text_map([(
            "_validity",
            Value::text_map([("start", Value::Timestamp(Timestamp::from_millis(7)))]),
        )]);

        assert_eq!(
            doc.get_path("_validity.start"),
            Some(&Value::Timestamp(Timestamp::from_millis(7)))
        );
        assert_eq!(doc.get_path("_validity.end"), None);
        assert_eq!(doc.get_path("missing.start"), None);
    }

    #[test]
    fn equal_maps_built_in_any_order() {
        let a = Value::text_map([("_id", Value::Integer(1)), ("_version", Value::Integer(2))]);
        let b = Value::text_map([("_version", Value::Integer(2)), ("_id", Value::Integer(1))]);
        assert_eq!(a, b);
    }
}
