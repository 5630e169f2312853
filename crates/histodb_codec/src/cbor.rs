//! Deterministic CBOR encoding of document values.
//!
//! The wire format is plain CBOR written with `ciborium`. Determinism comes
//! from the value side: map entries are re-sorted into canonical key order
//! before writing, integers are written in their shortest form by the
//! encoder, and floats never appear. Identical values therefore always
//! produce identical bytes, which is what lets a document id double as a
//! storage key.

use crate::error::{CodecError, CodecResult};
use crate::timestamp::Timestamp;
use crate::value::Value;
use ciborium::value::{Integer, Value as Cbor};
use std::io::Cursor;

/// CBOR tag for epoch-based date/time (RFC 8949 §3.4.2).
const TAG_EPOCH_TIME: u64 = 1;

/// Encode a value to deterministic CBOR bytes.
///
/// # Errors
///
/// Returns an error if the writer fails.
pub fn to_cbor(value: &Value) -> CodecResult<Vec<u8>> {
    let mut buffer = Vec::new();
    ciborium::ser::into_writer(&to_wire(value), &mut buffer)
        .map_err(|e| CodecError::encoding_failed(format!("{e:?}")))?;
    Ok(buffer)
}

/// Decode a value from CBOR bytes.
///
/// # Errors
///
/// Returns an error if the bytes are not valid CBOR, contain trailing data,
/// or contain constructs a document cannot hold (floats, unknown tags,
/// integers outside the `i64` range).
pub fn from_cbor(bytes: &[u8]) -> CodecResult<Value> {
    let mut cursor = Cursor::new(bytes);
    let wire: Cbor = ciborium::de::from_reader(&mut cursor)
        .map_err(|e| CodecError::decoding_failed(format!("{e:?}")))?;

    let consumed = usize::try_from(cursor.position()).unwrap_or(usize::MAX);
    if consumed != bytes.len() {
        return Err(CodecError::invalid_structure(format!(
            "{} trailing bytes after value",
            bytes.len().saturating_sub(consumed)
        )));
    }

    from_wire(wire)
}

fn to_wire(value: &Value) -> Cbor {
    match value {
        Value::Null => Cbor::Null,
        Value::Bool(b) => Cbor::Bool(*b),
        Value::Integer(n) => Cbor::Integer(Integer::from(*n)),
        Value::Timestamp(t) => Cbor::Tag(
            TAG_EPOCH_TIME,
            Box::new(Cbor::Integer(Integer::from(t.as_millis()))),
        ),
        Value::Bytes(b) => Cbor::Bytes(b.clone()),
        Value::Text(s) => Cbor::Text(s.clone()),
        Value::Array(items) => Cbor::Array(items.iter().map(to_wire).collect()),
        Value::Map(pairs) => {
            let mut sorted: Vec<&(Value, Value)> = pairs.iter().collect();
            sorted.sort_by(|a, b| a.0.cmp_canonical(&b.0));
            Cbor::Map(
                sorted
                    .into_iter()
                    .map(|(k, v)| (to_wire(k), to_wire(v)))
                    .collect(),
            )
        }
    }
}

fn from_wire(wire: Cbor) -> CodecResult<Value> {
    Ok(match wire {
        Cbor::Null => Value::Null,
        Cbor::Bool(b) => Value::Bool(b),
        Cbor::Integer(n) => Value::Integer(integer(n)?),
        Cbor::Float(_) => return Err(CodecError::FloatForbidden),
        Cbor::Bytes(b) => Value::Bytes(b),
        Cbor::Text(s) => Value::Text(s),
        Cbor::Array(items) => Value::Array(
            items
                .into_iter()
                .map(from_wire)
                .collect::<CodecResult<_>>()?,
        ),
        Cbor::Map(pairs) => Value::map(
            pairs
                .into_iter()
                .map(|(k, v)| Ok((from_wire(k)?, from_wire(v)?)))
                .collect::<CodecResult<_>>()?,
        ),
        Cbor::Tag(TAG_EPOCH_TIME, inner) => match *inner {
            Cbor::Integer(n) => Value::Timestamp(Timestamp::from_millis(integer(n)?)),
            _ => {
                return Err(CodecError::invalid_structure(
                    "epoch time tag must wrap an integer",
                ))
            }
        },
        Cbor::Tag(tag, _) => return Err(CodecError::UnsupportedTag { tag }),
        _ => return Err(CodecError::invalid_structure("unknown CBOR item")),
    })
}

fn integer(n: Integer) -> CodecResult<i64> {
    i64::try_from(n).map_err(|_| CodecError::IntegerOverflow)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unsorted_map_encodes_like_sorted_map() {
        let sorted = Value::text_map([("a", Value::Integer(1)), ("bb", Value::Integer(2))]);
        let unsorted = Value::Map(vec![
            (Value::from("bb"), Value::Integer(2)),
            (Value::from("a"), Value::Integer(1)),
        ]);

        assert_eq!(to_cbor(&sorted).unwrap(), to_cbor(&unsorted).unwrap());
    }

    #[test]
    fn timestamp_uses_epoch_tag() {
        let bytes = to_cbor(&Value::Timestamp(Timestamp::from_millis(5))).unwrap();
        // tag(1) followed by unsigned(5)
        assert_eq!(bytes, vec![0xc1, 0x05]);
        assert_eq!(
            from_cbor(&bytes).unwrap(),
            Value::Timestamp(Timestamp::from_millis(5))
        );
    }

    #[test]
    fn small_integers_use_shortest_form() {
        assert_eq!(to_cbor(&Value::Integer(10)).unwrap(), vec![0x0a]);
        assert_eq!(to_cbor(&Value::Integer(-1)).unwrap(), vec![0x20]);
    }

    #[test]
    fn floats_are_rejected() {
        // half-precision 1.0
        let err = from_cbor(&[0xf9, 0x3c, 0x00]).unwrap_err();
        assert_eq!(err, CodecError::FloatForbidden);
    }

    #[test]
    fn unknown_tags_are_rejected() {
        // tag(32) "x"
        let err = from_cbor(&[0xd8, 0x20, 0x61, 0x78]).unwrap_err();
        assert_eq!(err, CodecError::UnsupportedTag { tag: 32 });
    }

    #[test]
    fn trailing_bytes_are_rejected() {
        let err = from_cbor(&[0x01, 0x02]).unwrap_err();
        assert!(matches!(err, CodecError::InvalidStructure { .. }));
    }

    #[test]
    fn oversized_unsigned_overflows() {
        let mut bytes = vec![0x1b];
        bytes.extend_from_slice(&u64::MAX.to_be_bytes());
        assert_eq!(from_cbor(&bytes).unwrap_err(), CodecError::IntegerOverflow);
    }

    #[test]
    fn truncated_input_fails() {
        assert!(from_cbor(&[0x62, b'a']).is_err());
    }
}
