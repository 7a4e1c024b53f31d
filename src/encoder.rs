//! Structured-value to wire-format encoding
//!
//! The inverse of the decode path: walks a [`Value`] map against a resolved
//! message layout and emits canonical wire bytes. Encoding is strict where
//! decoding is tolerant: a value whose shape does not match its field's kind
//! is a [`Error::TypeMismatch`], and a missing required field anywhere in
//! the tree aborts the call with [`Error::RequiredFieldMissing`] before any
//! bytes are produced. Map keys that name no declared field are skipped, as
//! are explicit nulls and the unknown-fields key, so a decoded value round
//! trips without scrubbing.
//!
//! 64-bit integer fields accept either a number or an exact decimal string,
//! so values produced by a precision-preserving decode encode back without
//! conversion by the caller.

use bytes::BufMut;
use prost::encoding::{encode_key, encode_varint, WireType};

use crate::descriptor::{FieldDescriptor, FieldKind, TypeDescriptor, WireKind};
use crate::error::{Error, Result};
use crate::message::{DynamicMessage, FieldValue, Scalar};
use crate::registry::Registry;
use crate::value::{Value, UNKNOWN_FIELDS_KEY};

/// Reflection-driven encoder over a schema registry
#[derive(Debug, Clone, Copy)]
pub struct Encoder<'r> {
    registry: &'r Registry,
}

impl<'r> Encoder<'r> {
    /// Create an encoder over the given registry
    pub fn new(registry: &'r Registry) -> Self {
        Self { registry }
    }

    /// Encode a structured value as wire bytes of the given message type
    pub fn encode(&self, descriptor: &'r TypeDescriptor, value: &Value) -> Result<Vec<u8>> {
        let map = value.as_map().ok_or_else(|| Error::TypeMismatch {
            type_name: descriptor.name.clone(),
            field: "<root>".to_string(),
            expected: "map",
            found: value.kind_name(),
        })?;
        let message = self.populate(descriptor, map)?;
        check_required(&message)?;

        let mut buf = Vec::new();
        write_message(&message, &mut buf);
        Ok(buf)
    }

    /// Bind map entries to declared fields, coercing each value to its
    /// field's kind
    fn populate(
        &self,
        descriptor: &'r TypeDescriptor,
        map: &std::collections::BTreeMap<String, Value>,
    ) -> Result<DynamicMessage<'r>> {
        let mut message = DynamicMessage::new(descriptor);
        for (key, value) in map {
            if key == UNKNOWN_FIELDS_KEY || value.is_null() {
                continue;
            }
            // keys that name no declared field carry no wire representation
            let Some(field) = descriptor.field_by_name(key) else {
                continue;
            };

            if field.is_repeated() {
                let boxed;
                let items: &[Value] = match value {
                    Value::List(items) => items,
                    Value::Packed(packed) => {
                        boxed = packed.to_list(true);
                        &boxed
                    }
                    other => {
                        return Err(self.mismatch(descriptor, field, "list", other));
                    }
                };
                // an empty run has no wire representation, packed or not
                if items.is_empty() {
                    continue;
                }
                let mut run = Vec::with_capacity(items.len());
                for item in items {
                    run.push(self.coerce(descriptor, field, item)?);
                }
                message.set(field.number, FieldValue::Repeated(run));
            } else {
                let scalar = self.coerce(descriptor, field, value)?;
                message.set(field.number, FieldValue::Single(scalar));
            }
        }
        Ok(message)
    }

    /// Convert one boxed value into typed storage for its field
    fn coerce(
        &self,
        descriptor: &TypeDescriptor,
        field: &FieldDescriptor,
        value: &Value,
    ) -> Result<Scalar<'r>> {
        match field.kind {
            FieldKind::Int32 | FieldKind::Sint32 | FieldKind::Sfixed32 => match value {
                Value::Number(v) => Ok(Scalar::I32(*v as i32)),
                other => Err(self.mismatch(descriptor, field, "number", other)),
            },
            FieldKind::Uint32 | FieldKind::Fixed32 => match value {
                Value::Number(v) => Ok(Scalar::U32(*v as u32)),
                other => Err(self.mismatch(descriptor, field, "number", other)),
            },
            FieldKind::Int64 | FieldKind::Sint64 | FieldKind::Sfixed64 => match value {
                Value::Number(v) => Ok(Scalar::I64(*v as i64)),
                Value::String(s) => match s.parse::<i64>() {
                    Ok(v) => Ok(Scalar::I64(v)),
                    Err(_) => Err(self.mismatch(descriptor, field, "64-bit integer", value)),
                },
                other => Err(self.mismatch(descriptor, field, "number or string", other)),
            },
            FieldKind::Uint64 | FieldKind::Fixed64 => match value {
                Value::Number(v) => Ok(Scalar::U64(*v as u64)),
                Value::String(s) => match s.parse::<u64>() {
                    Ok(v) => Ok(Scalar::U64(v)),
                    Err(_) => Err(self.mismatch(descriptor, field, "64-bit integer", value)),
                },
                other => Err(self.mismatch(descriptor, field, "number or string", other)),
            },
            FieldKind::Float => match value {
                Value::Number(v) => Ok(Scalar::F32(*v as f32)),
                other => Err(self.mismatch(descriptor, field, "number", other)),
            },
            FieldKind::Double => match value {
                Value::Number(v) => Ok(Scalar::F64(*v)),
                other => Err(self.mismatch(descriptor, field, "number", other)),
            },
            FieldKind::Bool => match value {
                Value::Bool(v) => Ok(Scalar::Bool(*v)),
                other => Err(self.mismatch(descriptor, field, "bool", other)),
            },
            FieldKind::String => match value {
                Value::String(s) => Ok(Scalar::String(s.clone())),
                other => Err(self.mismatch(descriptor, field, "string", other)),
            },
            FieldKind::Bytes => match value {
                Value::Bytes(b) => Ok(Scalar::Bytes(b.clone())),
                Value::String(s) => Ok(Scalar::Bytes(s.as_bytes().to_vec())),
                other => Err(self.mismatch(descriptor, field, "bytes or string", other)),
            },
            FieldKind::Enum(_) => match value {
                Value::Number(v) => Ok(Scalar::Enum(*v as i32)),
                other => Err(self.mismatch(descriptor, field, "number", other)),
            },
            FieldKind::Message(id) => match value {
                Value::Map(map) => {
                    let nested = self.registry.message(id);
                    Ok(Scalar::Message(self.populate(nested, map)?))
                }
                other => Err(self.mismatch(descriptor, field, "map", other)),
            },
        }
    }

    fn mismatch(
        &self,
        descriptor: &TypeDescriptor,
        field: &FieldDescriptor,
        expected: &'static str,
        found: &Value,
    ) -> Error {
        Error::TypeMismatch {
            type_name: descriptor.name.clone(),
            field: field.name.clone(),
            expected,
            found: found.kind_name(),
        }
    }
}

/// Reject the tree if any required field is unset
///
/// Only messages actually present in the tree are visited; an absent
/// optional submessage is not expanded to fault its own required fields.
fn check_required(message: &DynamicMessage<'_>) -> Result<()> {
    let descriptor = message.descriptor();
    for field in descriptor.fields() {
        if field.is_required() && message.get(field.number).is_none() {
            return Err(Error::RequiredFieldMissing {
                type_name: descriptor.name.clone(),
                field: field.name.clone(),
            });
        }
    }
    for number in message.fields_present() {
        match message.get(number) {
            Some(FieldValue::Single(Scalar::Message(nested))) => check_required(nested)?,
            Some(FieldValue::Repeated(items)) => {
                for item in items {
                    if let Scalar::Message(nested) = item {
                        check_required(nested)?;
                    }
                }
            }
            _ => {}
        }
    }
    Ok(())
}

/// Serialize a populated message, fields in ascending number order
fn write_message(message: &DynamicMessage<'_>, buf: &mut Vec<u8>) {
    let descriptor = message.descriptor();
    for number in message.fields_present() {
        // populate only stores declared fields
        let Some(field) = descriptor.field_by_number(number) else {
            continue;
        };
        match message.get(number) {
            Some(FieldValue::Single(scalar)) => write_field(field, scalar, buf),
            Some(FieldValue::Repeated(items)) => {
                if field.packed {
                    let mut payload = Vec::new();
                    for item in items {
                        write_raw(field.kind, item, &mut payload);
                    }
                    encode_key(field.number, WireType::LengthDelimited, buf);
                    encode_varint(payload.len() as u64, buf);
                    buf.extend_from_slice(&payload);
                } else {
                    for item in items {
                        write_field(field, item, buf);
                    }
                }
            }
            None => {}
        }
    }
}

fn write_field(field: &FieldDescriptor, scalar: &Scalar<'_>, buf: &mut Vec<u8>) {
    if let Scalar::Message(nested) = scalar {
        let mut sub = Vec::new();
        write_message(nested, &mut sub);
        encode_key(field.number, WireType::LengthDelimited, buf);
        encode_varint(sub.len() as u64, buf);
        buf.extend_from_slice(&sub);
        return;
    }
    encode_key(field.number, wire_type(field.kind.wire_kind()), buf);
    write_raw(field.kind, scalar, buf);
}

fn wire_type(kind: WireKind) -> WireType {
    match kind {
        WireKind::Varint => WireType::Varint,
        WireKind::Fixed32 => WireType::ThirtyTwoBit,
        WireKind::Fixed64 => WireType::SixtyFourBit,
        WireKind::LengthDelimited => WireType::LengthDelimited,
    }
}

/// Emit one value payload without its key
fn write_raw(kind: FieldKind, scalar: &Scalar<'_>, buf: &mut Vec<u8>) {
    match (kind, scalar) {
        (FieldKind::Int32, Scalar::I32(v)) => encode_varint(*v as i64 as u64, buf),
        (FieldKind::Int64, Scalar::I64(v)) => encode_varint(*v as u64, buf),
        (FieldKind::Uint32, Scalar::U32(v)) => encode_varint(*v as u64, buf),
        (FieldKind::Uint64, Scalar::U64(v)) => encode_varint(*v, buf),
        (FieldKind::Sint32, Scalar::I32(v)) => {
            encode_varint(((v << 1) ^ (v >> 31)) as u32 as u64, buf)
        }
        (FieldKind::Sint64, Scalar::I64(v)) => encode_varint(((v << 1) ^ (v >> 63)) as u64, buf),
        (FieldKind::Bool, Scalar::Bool(v)) => encode_varint(*v as u64, buf),
        (FieldKind::Enum(_), Scalar::Enum(v)) => encode_varint(*v as i64 as u64, buf),
        (FieldKind::Fixed32, Scalar::U32(v)) => buf.put_u32_le(*v),
        (FieldKind::Sfixed32, Scalar::I32(v)) => buf.put_i32_le(*v),
        (FieldKind::Float, Scalar::F32(v)) => buf.put_f32_le(*v),
        (FieldKind::Fixed64, Scalar::U64(v)) => buf.put_u64_le(*v),
        (FieldKind::Sfixed64, Scalar::I64(v)) => buf.put_i64_le(*v),
        (FieldKind::Double, Scalar::F64(v)) => buf.put_f64_le(*v),
        (FieldKind::String, Scalar::String(s)) => {
            encode_varint(s.len() as u64, buf);
            buf.extend_from_slice(s.as_bytes());
        }
        (FieldKind::Bytes, Scalar::Bytes(b)) => {
            encode_varint(b.len() as u64, buf);
            buf.extend_from_slice(b);
        }
        // coerce pairs every scalar with its field's kind
        _ => unreachable!("scalar does not match field kind"),
    }
}
