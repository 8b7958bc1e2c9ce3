//! Order-preserving value encoding
//!
//! Index keys compare as raw bytes, so every value is written in a form
//! whose lexicographic byte order equals the value order:
//!
//! | Kind | Bytes |
//! |---|---|
//! | String | lower-cased UTF-8, unterminated |
//! | Int | `v ^ (1 << 63)`, big-endian (8) |
//! | UInt | big-endian (8) |
//! | Float | sign-adjusted bits, big-endian (8) |
//! | Bool | `0` / `1` (1) |
//! | Time | [`Tid::floor_of`] the millisecond (16) |
//!
//! Floats are canonicalized first: `-0.0` encodes as `0.0` and every NaN as
//! one quiet NaN, which sorts above infinity. Times before the epoch or past
//! [`MAX_TIMESTAMP_MS`](crate::tid::MAX_TIMESTAMP_MS) have no identifier and therefore no encoding.
//!
//! Strings are unterminated: the identifier at the tail of an index key is
//! fixed-width, so the value component is recovered by parsing from the end.

use crate::tid::{exact_millis_of, Tid, TID_LEN};
use crate::value::{FieldKind, FieldValue};

/// Encode a scalar value
///
/// Returns `None` for `Null` and `List`, which have no scalar encoding, and
/// for times outside the identifier range.
pub fn encode_value(value: &FieldValue) -> Option<Vec<u8>> {
    let encoded = match value {
        FieldValue::Null | FieldValue::List(_) => return None,
        FieldValue::String(s) => s.to_lowercase().into_bytes(),
        FieldValue::Int(v) => ordered_i64_bytes(*v).to_vec(),
        FieldValue::UInt(v) => v.to_be_bytes().to_vec(),
        FieldValue::Float(v) => ordered_f64_bytes(*v).to_vec(),
        FieldValue::Bool(v) => vec![u8::from(*v)],
        FieldValue::Time(t) => Tid::floor_of(exact_millis_of(*t)?).to_bytes().to_vec(),
    };
    Some(encoded)
}

/// Encode a value after coercing it to `kind`
pub fn encode_as(kind: FieldKind, value: &FieldValue) -> Option<Vec<u8>> {
    encode_value(&value.coerce(kind)?)
}

/// Decode a numeric value component produced by [`encode_value`]
///
/// Returns `None` for non-numeric kinds or malformed input.
pub fn decode_numeric(kind: FieldKind, bytes: &[u8]) -> Option<FieldValue> {
    let array: [u8; 8] = bytes.try_into().ok()?;
    match kind {
        FieldKind::Int => Some(FieldValue::Int(
            (u64::from_be_bytes(array) ^ (1u64 << 63)) as i64,
        )),
        FieldKind::UInt => Some(FieldValue::UInt(u64::from_be_bytes(array))),
        FieldKind::Float => Some(FieldValue::Float(f64_from_ordered(u64::from_be_bytes(array)))),
        _ => None,
    }
}

/// Encoded width of a kind, `None` for variable-width strings
pub fn fixed_width(kind: FieldKind) -> Option<usize> {
    match kind {
        FieldKind::String => None,
        FieldKind::Int | FieldKind::UInt | FieldKind::Float => Some(8),
        FieldKind::Bool => Some(1),
        FieldKind::Time => Some(TID_LEN),
    }
}

const fn ordered_i64_bytes(value: i64) -> [u8; 8] {
    let biased = (value as u64) ^ (1u64 << 63);
    biased.to_be_bytes()
}

fn ordered_f64_bytes(value: f64) -> [u8; 8] {
    let bits = if value.is_nan() {
        f64::NAN.to_bits()
    } else if value == 0.0 {
        0
    } else {
        value.to_bits()
    };
    let ordered = if bits & 0x8000_0000_0000_0000 == 0 {
        bits ^ 0x8000_0000_0000_0000
    } else {
        !bits
    };

    ordered.to_be_bytes()
}

fn f64_from_ordered(ordered: u64) -> f64 {
    let bits = if ordered & 0x8000_0000_0000_0000 != 0 {
        ordered ^ 0x8000_0000_0000_0000
    } else {
        !ordered
    };
    f64::from_bits(bits)
}
