//! Schema-driven wire decoder
//!
//! Walks wire bytes against a resolved [`TypeDescriptor`], populating a
//! [`DynamicMessage`] handle, then projects the handle into a [`Value`]
//! tree. The walk is bounded two ways: a cumulative byte budget across the
//! whole decode (nested messages included) and a fixed nesting-depth
//! ceiling, so small adversarial inputs cannot expand into unbounded work.

use bytes::Buf;
use prost::encoding::{decode_key, decode_varint, WireType};

use crate::descriptor::{FieldDescriptor, FieldKind, TypeDescriptor, WireKind};
use crate::error::{Error, Result};
use crate::message::{DynamicMessage, FieldValue, Scalar};
use crate::registry::Registry;
use crate::value::{PackedArray, UnknownField, Value, UNKNOWN_FIELDS_KEY};

/// Maximum message nesting depth accepted by a decode
pub const MAX_RECURSION_DEPTH: usize = 100;

/// Per-call decoding options
#[derive(Debug, Clone, Copy)]
pub struct DecodeOptions {
    /// Cumulative ceiling on bytes consumed across the whole decode,
    /// nested sub-messages included; exceeding it fails the decode.
    /// Zero means unlimited.
    pub max_bytes: usize,
    /// Soft threshold that logs a warning once when crossed but does not
    /// abort. Zero means "same as `max_bytes`".
    pub warn_bytes: usize,
    /// Project repeated fixed-width numeric fields as packed buffers
    /// instead of boxed lists
    pub use_typed_arrays: bool,
    /// Capture wire fields absent from the schema under
    /// [`UNKNOWN_FIELDS_KEY`], per nesting level
    pub preserve_unknown: bool,
}

impl Default for DecodeOptions {
    fn default() -> Self {
        Self {
            max_bytes: 0,
            warn_bytes: 0,
            use_typed_arrays: true,
            preserve_unknown: false,
        }
    }
}

/// Cumulative byte accounting for one decode call
struct Budget {
    limit: usize,
    warn: usize,
    used: usize,
    warned: bool,
}

impl Budget {
    fn new(options: &DecodeOptions) -> Self {
        let warn = if options.warn_bytes == 0 {
            options.max_bytes
        } else {
            options.warn_bytes
        };
        Self {
            limit: options.max_bytes,
            warn,
            used: 0,
            warned: false,
        }
    }

    fn charge(&mut self, bytes: usize) -> Result<()> {
        self.used += bytes;
        if !self.warned && self.warn != 0 && self.used > self.warn {
            self.warned = true;
            log::warn!(
                "decode consumed {} bytes, past the {} byte warning threshold",
                self.used,
                self.warn
            );
        }
        if self.limit != 0 && self.used > self.limit {
            return Err(Error::MalformedMessage(format!(
                "message exceeds the {} byte limit",
                self.limit
            )));
        }
        Ok(())
    }

    /// Reject a pending length-delimited read that cannot fit the budget,
    /// before any of its bytes are consumed
    fn check_fits(&self, bytes: usize) -> Result<()> {
        if self.limit != 0 && self.used + bytes > self.limit {
            return Err(Error::MalformedMessage(format!(
                "message exceeds the {} byte limit",
                self.limit
            )));
        }
        Ok(())
    }
}

/// One decode call: a registry, the codec's int64 policy, and the options
#[derive(Debug)]
pub struct Decoder<'r> {
    registry: &'r Registry,
    preserve_int64: bool,
    options: DecodeOptions,
}

impl<'r> Decoder<'r> {
    /// Create a decoder over a built registry
    pub fn new(registry: &'r Registry, preserve_int64: bool, options: DecodeOptions) -> Self {
        Self {
            registry,
            preserve_int64,
            options,
        }
    }

    /// Decode one complete top-level message into a structured value
    pub fn decode(&self, descriptor: &'r TypeDescriptor, bytes: &[u8]) -> Result<Value> {
        let mut budget = Budget::new(&self.options);
        let mut message = DynamicMessage::new(descriptor);
        self.parse_into(&mut message, bytes, &mut budget, 0)?;
        Ok(self.project(&message))
    }

    fn parse_into(
        &self,
        message: &mut DynamicMessage<'r>,
        buf: &[u8],
        budget: &mut Budget,
        depth: usize,
    ) -> Result<()> {
        if depth > MAX_RECURSION_DEPTH {
            return Err(Error::MalformedMessage(format!(
                "message nesting exceeds {MAX_RECURSION_DEPTH} levels"
            )));
        }

        let mut cur = buf;
        while !cur.is_empty() {
            let before = cur.len();
            let (number, wire_type) = decode_key(&mut cur).map_err(malformed)?;
            budget.charge(before - cur.len())?;

            match message.descriptor().field_by_number(number) {
                Some(field) if accepts(field, wire_type) => {
                    self.parse_field(message, field, wire_type, &mut cur, budget, depth)?;
                }
                // not in the schema, or a known number with the wrong wire
                // type: both fall under wire-format unknown-field tolerance
                _ => self.parse_unknown(message, number, wire_type, &mut cur, budget)?,
            }
        }
        Ok(())
    }

    fn parse_field(
        &self,
        message: &mut DynamicMessage<'r>,
        field: &FieldDescriptor,
        wire_type: WireType,
        cur: &mut &[u8],
        budget: &mut Budget,
        depth: usize,
    ) -> Result<()> {
        if let FieldKind::Message(id) = field.kind {
            let before = cur.len();
            let body = read_len_delimited(cur)?;
            budget.charge(before - cur.len() - body.len())?;
            budget.check_fits(body.len())?;

            let mut inner = DynamicMessage::new(self.registry.message(id));
            self.parse_into(&mut inner, body, budget, depth + 1)?;
            if field.is_repeated() {
                message.push(field.number, Scalar::Message(inner));
            } else {
                message.set(field.number, FieldValue::Single(Scalar::Message(inner)));
            }
            return Ok(());
        }

        if field.is_repeated()
            && wire_type == WireType::LengthDelimited
            && field.kind.wire_kind() != WireKind::LengthDelimited
        {
            // packed run: one length-delimited payload of back-to-back values
            let before = cur.len();
            let body = read_len_delimited(cur)?;
            budget.charge(before - cur.len())?;
            let mut elements = body;
            while !elements.is_empty() {
                let scalar = read_scalar(field.kind, &mut elements)?;
                message.push(field.number, scalar);
            }
            return Ok(());
        }

        let before = cur.len();
        let scalar = read_scalar(field.kind, cur)?;
        budget.charge(before - cur.len())?;
        if field.is_repeated() {
            message.push(field.number, scalar);
        } else {
            // a singular field repeated on the wire keeps the last value
            message.set(field.number, FieldValue::Single(scalar));
        }
        Ok(())
    }

    fn parse_unknown(
        &self,
        message: &mut DynamicMessage<'r>,
        number: u32,
        wire_type: WireType,
        cur: &mut &[u8],
        budget: &mut Budget,
    ) -> Result<()> {
        let before = cur.len();
        let (wire_kind, bytes) = match wire_type {
            WireType::Varint => {
                let start = *cur;
                decode_varint(cur).map_err(malformed)?;
                (WireKind::Varint, &start[..start.len() - cur.len()])
            }
            WireType::ThirtyTwoBit => (WireKind::Fixed32, take(cur, 4)?),
            WireType::SixtyFourBit => (WireKind::Fixed64, take(cur, 8)?),
            WireType::LengthDelimited => (WireKind::LengthDelimited, read_len_delimited(cur)?),
            WireType::StartGroup | WireType::EndGroup => {
                return Err(Error::MalformedMessage(format!(
                    "legacy group wire type on field {number}"
                )))
            }
        };
        budget.charge(before - cur.len())?;

        if self.options.preserve_unknown {
            message.add_unknown(UnknownField {
                number,
                wire_kind,
                bytes: bytes.to_vec(),
            });
        }
        Ok(())
    }

    /// Project a populated handle into the structured-value representation
    fn project(&self, message: &DynamicMessage<'_>) -> Value {
        let mut map = std::collections::BTreeMap::new();
        for field in message.descriptor().fields() {
            let Some(slot) = message.get(field.number) else {
                // absent optional fields are omitted, never emitted as null
                continue;
            };
            let projected = match slot {
                FieldValue::Single(scalar) => self.project_scalar(scalar),
                FieldValue::Repeated(items) => {
                    if self.options.use_typed_arrays && field.kind.numeric() {
                        Value::Packed(pack(field.kind, items))
                    } else {
                        Value::List(items.iter().map(|s| self.project_scalar(s)).collect())
                    }
                }
            };
            map.insert(field.name.clone(), projected);
        }

        if self.options.preserve_unknown && !message.unknown_fields().is_empty() {
            map.insert(
                UNKNOWN_FIELDS_KEY.to_string(),
                Value::List(
                    message
                        .unknown_fields()
                        .iter()
                        .cloned()
                        .map(Value::Unknown)
                        .collect(),
                ),
            );
        }
        Value::Map(map)
    }

    fn project_scalar(&self, scalar: &Scalar<'_>) -> Value {
        match scalar {
            Scalar::I32(v) => Value::Number(*v as f64),
            Scalar::U32(v) => Value::Number(*v as f64),
            Scalar::F32(v) => Value::Number(*v as f64),
            Scalar::F64(v) => Value::Number(*v),
            Scalar::Bool(v) => Value::Bool(*v),
            Scalar::Enum(v) => Value::Number(*v as f64),
            Scalar::I64(v) => {
                if self.preserve_int64 {
                    Value::String(v.to_string())
                } else {
                    Value::Number(*v as f64)
                }
            }
            Scalar::U64(v) => {
                if self.preserve_int64 {
                    Value::String(v.to_string())
                } else {
                    Value::Number(*v as f64)
                }
            }
            Scalar::String(v) => Value::String(v.clone()),
            Scalar::Bytes(v) => Value::Bytes(v.clone()),
            Scalar::Message(inner) => self.project(inner),
        }
    }
}

fn malformed(err: prost::DecodeError) -> Error {
    Error::MalformedMessage(err.to_string())
}

fn take<'a>(cur: &mut &'a [u8], len: usize) -> Result<&'a [u8]> {
    if len > cur.len() {
        return Err(Error::MalformedMessage("truncated field value".to_string()));
    }
    let (head, tail) = cur.split_at(len);
    *cur = tail;
    Ok(head)
}

fn read_len_delimited<'a>(cur: &mut &'a [u8]) -> Result<&'a [u8]> {
    let len = decode_varint(cur).map_err(malformed)? as usize;
    if len > cur.len() {
        return Err(Error::MalformedMessage(
            "length-delimited field overruns the buffer".to_string(),
        ));
    }
    let (head, tail) = cur.split_at(len);
    *cur = tail;
    Ok(head)
}

/// Read one wire value of a non-message kind
fn read_scalar<'r>(kind: FieldKind, cur: &mut &[u8]) -> Result<Scalar<'r>> {
    let scalar = match kind {
        FieldKind::Int32 => Scalar::I32(decode_varint(cur).map_err(malformed)? as i32),
        FieldKind::Int64 => Scalar::I64(decode_varint(cur).map_err(malformed)? as i64),
        FieldKind::Uint32 => Scalar::U32(decode_varint(cur).map_err(malformed)? as u32),
        FieldKind::Uint64 => Scalar::U64(decode_varint(cur).map_err(malformed)?),
        FieldKind::Sint32 => {
            let raw = decode_varint(cur).map_err(malformed)? as u32;
            Scalar::I32(((raw >> 1) as i32) ^ -((raw & 1) as i32))
        }
        FieldKind::Sint64 => {
            let raw = decode_varint(cur).map_err(malformed)?;
            Scalar::I64(((raw >> 1) as i64) ^ -((raw & 1) as i64))
        }
        FieldKind::Bool => Scalar::Bool(decode_varint(cur).map_err(malformed)? != 0),
        FieldKind::Enum(_) => Scalar::Enum(decode_varint(cur).map_err(malformed)? as i32),
        FieldKind::Fixed32 => {
            take_len(cur, 4)?;
            Scalar::U32(cur.get_u32_le())
        }
        FieldKind::Sfixed32 => {
            take_len(cur, 4)?;
            Scalar::I32(cur.get_i32_le())
        }
        FieldKind::Float => {
            take_len(cur, 4)?;
            Scalar::F32(cur.get_f32_le())
        }
        FieldKind::Fixed64 => {
            take_len(cur, 8)?;
            Scalar::U64(cur.get_u64_le())
        }
        FieldKind::Sfixed64 => {
            take_len(cur, 8)?;
            Scalar::I64(cur.get_i64_le())
        }
        FieldKind::Double => {
            take_len(cur, 8)?;
            Scalar::F64(cur.get_f64_le())
        }
        FieldKind::String => {
            let bytes = read_len_delimited(cur)?;
            let text = std::str::from_utf8(bytes).map_err(|_| {
                Error::MalformedMessage("string field holds invalid UTF-8".to_string())
            })?;
            Scalar::String(text.to_string())
        }
        FieldKind::Bytes => Scalar::Bytes(read_len_delimited(cur)?.to_vec()),
        // message fields are length-framed and recursed by the caller
        FieldKind::Message(_) => unreachable!("message kinds are framed by the caller"),
    };
    Ok(scalar)
}

/// Bounds check before a fixed-width `Buf` read, which would panic short
fn take_len(cur: &&[u8], len: usize) -> Result<()> {
    if cur.len() < len {
        return Err(Error::MalformedMessage("truncated field value".to_string()));
    }
    Ok(())
}

/// Whether a field declared with this kind accepts a value of this wire type
fn accepts(field: &FieldDescriptor, wire_type: WireType) -> bool {
    let declared = field.kind.wire_kind();
    match wire_type {
        WireType::Varint => declared == WireKind::Varint,
        WireType::ThirtyTwoBit => declared == WireKind::Fixed32,
        WireType::SixtyFourBit => declared == WireKind::Fixed64,
        WireType::LengthDelimited => {
            declared == WireKind::LengthDelimited
                || (field.is_repeated() && field.kind.packable())
        }
        WireType::StartGroup | WireType::EndGroup => false,
    }
}

/// Collapse a homogeneous repeated run into its packed buffer form
fn pack(kind: FieldKind, items: &[Scalar<'_>]) -> PackedArray {
    match kind {
        FieldKind::Int32 | FieldKind::Sint32 | FieldKind::Sfixed32 => PackedArray::I32(
            items
                .iter()
                .filter_map(|s| match s {
                    Scalar::I32(v) => Some(*v),
                    _ => None,
                })
                .collect(),
        ),
        FieldKind::Uint32 | FieldKind::Fixed32 => PackedArray::U32(
            items
                .iter()
                .filter_map(|s| match s {
                    Scalar::U32(v) => Some(*v),
                    _ => None,
                })
                .collect(),
        ),
        FieldKind::Int64 | FieldKind::Sint64 | FieldKind::Sfixed64 => PackedArray::I64(
            items
                .iter()
                .filter_map(|s| match s {
                    Scalar::I64(v) => Some(*v),
                    _ => None,
                })
                .collect(),
        ),
        FieldKind::Uint64 | FieldKind::Fixed64 => PackedArray::U64(
            items
                .iter()
                .filter_map(|s| match s {
                    Scalar::U64(v) => Some(*v),
                    _ => None,
                })
                .collect(),
        ),
        FieldKind::Float => PackedArray::F32(
            items
                .iter()
                .filter_map(|s| match s {
                    Scalar::F32(v) => Some(*v),
                    _ => None,
                })
                .collect(),
        ),
        _ => PackedArray::F64(
            items
                .iter()
                .filter_map(|s| match s {
                    Scalar::F64(v) => Some(*v),
                    _ => None,
                })
                .collect(),
        ),
    }
}
