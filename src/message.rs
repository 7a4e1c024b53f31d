//! Dynamic message model
//!
//! [`DynamicMessage`] is a reflective handle for "a value of some message
//! type": an empty container bound to a [`TypeDescriptor`], addressable
//! field-by-field by number. It replaces the generated per-type classes a
//! static protobuf stack would use, so the decoder and encoder never
//! special-case a concrete message type. This layer stores whatever it is
//! given; kind enforcement is the encoder's job.

use std::collections::BTreeMap;

use crate::descriptor::TypeDescriptor;
use crate::value::UnknownField;

/// Typed storage for one decoded field element
#[derive(Debug, Clone, PartialEq)]
pub enum Scalar<'r> {
    /// int32 / sint32 / sfixed32 value
    I32(i32),
    /// int64 / sint64 / sfixed64 value
    I64(i64),
    /// uint32 / fixed32 value
    U32(u32),
    /// uint64 / fixed64 value
    U64(u64),
    /// float value
    F32(f32),
    /// double value
    F64(f64),
    /// bool value
    Bool(bool),
    /// string value
    String(String),
    /// bytes value
    Bytes(Vec<u8>),
    /// enum value, by number
    Enum(i32),
    /// nested message value
    Message(DynamicMessage<'r>),
}

/// Contents of one field slot: a single value or a repeated run
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue<'r> {
    /// Singular field contents
    Single(Scalar<'r>),
    /// Repeated field contents, in wire order
    Repeated(Vec<Scalar<'r>>),
}

/// A mutable message instance bound to a type descriptor
#[derive(Debug, Clone, PartialEq)]
pub struct DynamicMessage<'r> {
    descriptor: &'r TypeDescriptor,
    fields: BTreeMap<u32, FieldValue<'r>>,
    unknown: Vec<UnknownField>,
}

impl<'r> DynamicMessage<'r> {
    /// Instantiate an empty message of the given type
    pub fn new(descriptor: &'r TypeDescriptor) -> Self {
        Self {
            descriptor,
            fields: BTreeMap::new(),
            unknown: Vec::new(),
        }
    }

    /// The descriptor this message is bound to
    pub fn descriptor(&self) -> &'r TypeDescriptor {
        self.descriptor
    }

    /// Current value of a field, or absence
    pub fn get(&self, number: u32) -> Option<&FieldValue<'r>> {
        self.fields.get(&number)
    }

    /// Set a field, replacing any previous value
    pub fn set(&mut self, number: u32, value: FieldValue<'r>) {
        self.fields.insert(number, value);
    }

    /// Append one element to a repeated field, creating the run if absent
    ///
    /// A singular value already stored under the number is replaced by a
    /// one-element run before appending.
    pub fn push(&mut self, number: u32, scalar: Scalar<'r>) {
        let mut items = match self.fields.remove(&number) {
            Some(FieldValue::Repeated(items)) => items,
            Some(FieldValue::Single(existing)) => vec![existing],
            None => Vec::new(),
        };
        items.push(scalar);
        self.fields.insert(number, FieldValue::Repeated(items));
    }

    /// Field numbers that currently hold a value, in ascending order
    pub fn fields_present(&self) -> impl Iterator<Item = u32> + '_ {
        self.fields.keys().copied()
    }

    /// Attach an unknown-field entry captured at this nesting level
    pub fn add_unknown(&mut self, field: UnknownField) {
        self.unknown.push(field);
    }

    /// Unknown-field entries captured at this nesting level
    pub fn unknown_fields(&self) -> &[UnknownField] {
        &self.unknown
    }
}
