//! Dynamic structured values
//!
//! [`Value`] is the host-facing representation exchanged at the codec
//! boundary: nested maps, ordered lists, scalars, packed numeric buffers,
//! and captured unknown fields. The shape of a value at any position is
//! determined by the field descriptor it was produced from or consumed
//! against; the codec never infers types from value shapes except to check
//! that they match the descriptor.

use std::collections::BTreeMap;

use crate::descriptor::WireKind;

/// Reserved map key under which unknown-field entries are attached
///
/// `$` cannot occur in a protobuf identifier, so this key can never collide
/// with a legal field name.
pub const UNKNOWN_FIELDS_KEY: &str = "$unknown";

/// A dynamic value produced by decode or consumed by encode
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// Explicit absence; treated as an unset field by the encoder
    Null,
    /// Boolean
    Bool(bool),
    /// Any numeric value. 64-bit integers land here only when the codec was
    /// constructed without `preserve_int64`, accepting precision loss beyond
    /// 2^53.
    Number(f64),
    /// UTF-8 string; also carries 64-bit integers as exact decimal strings
    /// when `preserve_int64` is set
    String(String),
    /// Raw byte sequence
    Bytes(Vec<u8>),
    /// Ordered list, used for repeated fields
    List(Vec<Value>),
    /// Field-name-to-value mapping, used for messages
    Map(BTreeMap<String, Value>),
    /// Packed numeric buffer, used for eligible repeated numeric fields
    Packed(PackedArray),
    /// A wire field not declared in the schema, captured verbatim
    Unknown(UnknownField),
}

impl Value {
    /// Build a map value from (key, value) pairs
    pub fn map<K, I>(entries: I) -> Value
    where
        K: Into<String>,
        I: IntoIterator<Item = (K, Value)>,
    {
        Value::Map(
            entries
                .into_iter()
                .map(|(k, v)| (k.into(), v))
                .collect(),
        )
    }

    /// Whether this is the null value
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Try to get as bool
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(v) => Some(*v),
            _ => None,
        }
    }

    /// Try to get as a number
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Number(v) => Some(*v),
            _ => None,
        }
    }

    /// Try to get as a string slice
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(v) => Some(v.as_str()),
            _ => None,
        }
    }

    /// Try to get as raw bytes
    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            Value::Bytes(v) => Some(v.as_slice()),
            _ => None,
        }
    }

    /// Try to get as a list
    pub fn as_list(&self) -> Option<&[Value]> {
        match self {
            Value::List(v) => Some(v.as_slice()),
            _ => None,
        }
    }

    /// Try to get as a map
    pub fn as_map(&self) -> Option<&BTreeMap<String, Value>> {
        match self {
            Value::Map(v) => Some(v),
            _ => None,
        }
    }

    /// Try to get as a packed numeric buffer
    pub fn as_packed(&self) -> Option<&PackedArray> {
        match self {
            Value::Packed(v) => Some(v),
            _ => None,
        }
    }

    /// Short name of this value's variant, used in mismatch diagnostics
    pub fn kind_name(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Bool(_) => "bool",
            Value::Number(_) => "number",
            Value::String(_) => "string",
            Value::Bytes(_) => "bytes",
            Value::List(_) => "list",
            Value::Map(_) => "map",
            Value::Packed(_) => "packed array",
            Value::Unknown(_) => "unknown field",
        }
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Number(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::Number(v as f64)
    }
}

impl From<u32> for Value {
    fn from(v: u32) -> Self {
        Value::Number(v as f64)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::String(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::String(v)
    }
}

impl From<Vec<u8>> for Value {
    fn from(v: Vec<u8>) -> Self {
        Value::Bytes(v)
    }
}

impl From<Vec<Value>> for Value {
    fn from(v: Vec<Value>) -> Self {
        Value::List(v)
    }
}

/// Contiguous fixed-width storage for a repeated numeric field
///
/// A pure representation choice: element-wise it carries exactly the same
/// values a boxed list would. The 64-bit variants keep native width, so this
/// form is lossless regardless of the codec's `preserve_int64` setting.
#[derive(Debug, Clone, PartialEq)]
pub enum PackedArray {
    /// int32 / sint32 / sfixed32 elements
    I32(Vec<i32>),
    /// uint32 / fixed32 elements
    U32(Vec<u32>),
    /// int64 / sint64 / sfixed64 elements
    I64(Vec<i64>),
    /// uint64 / fixed64 elements
    U64(Vec<u64>),
    /// float elements
    F32(Vec<f32>),
    /// double elements
    F64(Vec<f64>),
}

impl PackedArray {
    /// Number of elements
    pub fn len(&self) -> usize {
        match self {
            PackedArray::I32(v) => v.len(),
            PackedArray::U32(v) => v.len(),
            PackedArray::I64(v) => v.len(),
            PackedArray::U64(v) => v.len(),
            PackedArray::F32(v) => v.len(),
            PackedArray::F64(v) => v.len(),
        }
    }

    /// Whether the buffer has no elements
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Element-wise view as boxed values
    ///
    /// 64-bit elements become exact decimal strings when `preserve_int64`,
    /// mirroring how the boxed-list decode path renders them.
    pub fn to_list(&self, preserve_int64: bool) -> Vec<Value> {
        match self {
            PackedArray::I32(v) => v.iter().map(|&x| Value::Number(x as f64)).collect(),
            PackedArray::U32(v) => v.iter().map(|&x| Value::Number(x as f64)).collect(),
            PackedArray::I64(v) => v
                .iter()
                .map(|&x| {
                    if preserve_int64 {
                        Value::String(x.to_string())
                    } else {
                        Value::Number(x as f64)
                    }
                })
                .collect(),
            PackedArray::U64(v) => v
                .iter()
                .map(|&x| {
                    if preserve_int64 {
                        Value::String(x.to_string())
                    } else {
                        Value::Number(x as f64)
                    }
                })
                .collect(),
            PackedArray::F32(v) => v.iter().map(|&x| Value::Number(x as f64)).collect(),
            PackedArray::F64(v) => v.iter().map(|&x| Value::Number(x)).collect(),
        }
    }
}

/// A wire-level field present in input bytes but absent from the schema
///
/// Produced only by the unknown-preserving decode path. `bytes` holds the
/// encoded value payload without its tag; for length-delimited fields the
/// length prefix is also stripped, since `wire_kind` is enough to
/// reconstruct the framing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownField {
    /// Wire field number
    pub number: u32,
    /// Wire representation the value arrived with
    pub wire_kind: WireKind,
    /// Encoded value payload
    pub bytes: Vec<u8>,
}
