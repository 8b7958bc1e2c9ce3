//! Field values
//!
//! [`FieldValue`] is the typed value a record exposes for an indexed field,
//! and the parameter type of every index query. `Null` doubles as the "nil"
//! parameter: it is rejected by exact matches and means "unbounded" for a
//! range bound.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Declared kind of an indexed field
///
/// For list fields this is the kind of each element.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FieldKind {
    /// UTF-8 text, indexed case-insensitively
    String,
    /// Signed 64-bit integer
    Int,
    /// Unsigned 64-bit integer
    UInt,
    /// 64-bit float
    Float,
    /// Boolean
    Bool,
    /// Wall-clock time (millisecond resolution in the index)
    Time,
}

impl FieldKind {
    /// Returns true for kinds QuickSum can aggregate
    pub fn is_numeric(&self) -> bool {
        matches!(self, FieldKind::Int | FieldKind::UInt | FieldKind::Float)
    }
}

impl fmt::Display for FieldKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            FieldKind::String => "string",
            FieldKind::Int => "int",
            FieldKind::UInt => "uint",
            FieldKind::Float => "float",
            FieldKind::Bool => "bool",
            FieldKind::Time => "time",
        };
        f.write_str(name)
    }
}

/// A typed field or parameter value
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub enum FieldValue {
    /// Absent value / nil parameter
    #[default]
    Null,
    /// Text
    String(String),
    /// Signed integer
    Int(i64),
    /// Unsigned integer
    UInt(u64),
    /// Float
    Float(f64),
    /// Boolean
    Bool(bool),
    /// Time
    Time(DateTime<Utc>),
    /// Several values, for element-decomposed fields
    List(Vec<FieldValue>),
}

impl FieldValue {
    /// Returns true for `Null`
    pub fn is_null(&self) -> bool {
        matches!(self, FieldValue::Null)
    }

    /// Convert to the given kind, if the conversion is lossless
    ///
    /// Integers convert to floats; non-negative signed integers convert to
    /// unsigned and unsigned values that fit convert to signed. Everything
    /// else must already have the requested kind. `Null` and `List` never
    /// coerce.
    pub fn coerce(&self, kind: FieldKind) -> Option<FieldValue> {
        match (self, kind) {
            (FieldValue::String(s), FieldKind::String) => Some(FieldValue::String(s.clone())),
            (FieldValue::Int(v), FieldKind::Int) => Some(FieldValue::Int(*v)),
            (FieldValue::Int(v), FieldKind::UInt) => u64::try_from(*v).ok().map(FieldValue::UInt),
            (FieldValue::Int(v), FieldKind::Float) => Some(FieldValue::Float(*v as f64)),
            (FieldValue::UInt(v), FieldKind::UInt) => Some(FieldValue::UInt(*v)),
            (FieldValue::UInt(v), FieldKind::Int) => i64::try_from(*v).ok().map(FieldValue::Int),
            (FieldValue::UInt(v), FieldKind::Float) => Some(FieldValue::Float(*v as f64)),
            (FieldValue::Float(v), FieldKind::Float) => Some(FieldValue::Float(*v)),
            (FieldValue::Bool(v), FieldKind::Bool) => Some(FieldValue::Bool(*v)),
            (FieldValue::Time(t), FieldKind::Time) => Some(FieldValue::Time(*t)),
            _ => None,
        }
    }

    /// Numeric view used by aggregation
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            FieldValue::Int(v) => Some(*v as f64),
            FieldValue::UInt(v) => Some(*v as f64),
            FieldValue::Float(v) => Some(*v),
            _ => None,
        }
    }
}

impl From<&str> for FieldValue {
    fn from(v: &str) -> Self {
        FieldValue::String(v.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(v: String) -> Self {
        FieldValue::String(v)
    }
}

impl From<&String> for FieldValue {
    fn from(v: &String) -> Self {
        FieldValue::String(v.clone())
    }
}

macro_rules! impl_from_signed {
    ($($t:ty),*) => {
        $(impl From<$t> for FieldValue {
            fn from(v: $t) -> Self {
                FieldValue::Int(i64::from(v))
            }
        })*
    };
}

macro_rules! impl_from_unsigned {
    ($($t:ty),*) => {
        $(impl From<$t> for FieldValue {
            fn from(v: $t) -> Self {
                FieldValue::UInt(u64::from(v))
            }
        })*
    };
}

impl_from_signed!(i8, i16, i32, i64);
impl_from_unsigned!(u8, u16, u32, u64);

impl From<f32> for FieldValue {
    fn from(v: f32) -> Self {
        FieldValue::Float(f64::from(v))
    }
}

impl From<f64> for FieldValue {
    fn from(v: f64) -> Self {
        FieldValue::Float(v)
    }
}

impl From<bool> for FieldValue {
    fn from(v: bool) -> Self {
        FieldValue::Bool(v)
    }
}

impl From<DateTime<Utc>> for FieldValue {
    fn from(v: DateTime<Utc>) -> Self {
        FieldValue::Time(v)
    }
}

impl<T: Into<FieldValue>> From<Option<T>> for FieldValue {
    fn from(v: Option<T>) -> Self {
        v.map_or(FieldValue::Null, Into::into)
    }
}

impl<T: Into<FieldValue>> From<Vec<T>> for FieldValue {
    fn from(v: Vec<T>) -> Self {
        FieldValue::List(v.into_iter().map(Into::into).collect())
    }
}
