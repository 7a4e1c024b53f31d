//! Resolved type metadata
//!
//! These are the layouts the registry produces from a descriptor set: one
//! [`TypeDescriptor`] per message type, holding [`FieldDescriptor`]s indexed
//! by field number and by field name. Field numbers are the stable wire
//! identifiers; field names only appear in the structured-value
//! representation.

use std::collections::HashMap;

use crate::error::{Error, Result};

/// Index of a message or enum type inside its registry
///
/// Message and enum fields carry a resolved `TypeId` instead of a name, so a
/// dangling type reference is a construction-time error rather than a decode
/// surprise.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TypeId(pub(crate) usize);

/// Physical wire representation of a field
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WireKind {
    /// Base-128 varint
    Varint,
    /// Four-byte little-endian value
    Fixed32,
    /// Eight-byte little-endian value
    Fixed64,
    /// Length-prefixed byte run
    LengthDelimited,
}

/// Semantic kind of a field
///
/// Decoder and encoder both match this exhaustively; adding a kind is a
/// compile-time-checked change in every conversion path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    /// Varint-encoded signed 32-bit integer
    Int32,
    /// Varint-encoded signed 64-bit integer
    Int64,
    /// Varint-encoded unsigned 32-bit integer
    Uint32,
    /// Varint-encoded unsigned 64-bit integer
    Uint64,
    /// Zigzag varint-encoded signed 32-bit integer
    Sint32,
    /// Zigzag varint-encoded signed 64-bit integer
    Sint64,
    /// Fixed-width unsigned 32-bit integer
    Fixed32,
    /// Fixed-width unsigned 64-bit integer
    Fixed64,
    /// Fixed-width signed 32-bit integer
    Sfixed32,
    /// Fixed-width signed 64-bit integer
    Sfixed64,
    /// Single-precision float
    Float,
    /// Double-precision float
    Double,
    /// Varint-encoded boolean
    Bool,
    /// UTF-8 string
    String,
    /// Raw byte sequence
    Bytes,
    /// Enum value, transported as its integer number
    Enum(TypeId),
    /// Nested message of the referenced type
    Message(TypeId),
}

impl FieldKind {
    /// Wire representation used for a singular value of this kind
    pub fn wire_kind(&self) -> WireKind {
        match self {
            FieldKind::Int32
            | FieldKind::Int64
            | FieldKind::Uint32
            | FieldKind::Uint64
            | FieldKind::Sint32
            | FieldKind::Sint64
            | FieldKind::Bool
            | FieldKind::Enum(_) => WireKind::Varint,
            FieldKind::Fixed32 | FieldKind::Sfixed32 | FieldKind::Float => WireKind::Fixed32,
            FieldKind::Fixed64 | FieldKind::Sfixed64 | FieldKind::Double => WireKind::Fixed64,
            FieldKind::String | FieldKind::Bytes | FieldKind::Message(_) => {
                WireKind::LengthDelimited
            }
        }
    }

    /// Whether repeated fields of this kind may use the packed wire encoding
    pub fn packable(&self) -> bool {
        !matches!(
            self,
            FieldKind::String | FieldKind::Bytes | FieldKind::Message(_)
        )
    }

    /// Whether this is a fixed-width numeric kind, eligible for the packed
    /// buffer representation of repeated fields
    pub fn numeric(&self) -> bool {
        matches!(
            self,
            FieldKind::Int32
                | FieldKind::Int64
                | FieldKind::Uint32
                | FieldKind::Uint64
                | FieldKind::Sint32
                | FieldKind::Sint64
                | FieldKind::Fixed32
                | FieldKind::Fixed64
                | FieldKind::Sfixed32
                | FieldKind::Sfixed64
                | FieldKind::Float
                | FieldKind::Double
        )
    }
}

/// How many values a field may carry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cardinality {
    /// At most one value; absent fields are omitted from the structured value
    Optional,
    /// Exactly one value; enforced by the encoder, never by the decoder
    Required,
    /// Zero or more values, in wire order
    Repeated,
}

/// One field of a message type
#[derive(Debug, Clone, PartialEq)]
pub struct FieldDescriptor {
    /// Field number, the stable identifier used on the wire
    pub number: u32,
    /// Field name, used only in the structured-value representation
    pub name: String,
    /// Semantic kind; exactly one per field
    pub kind: FieldKind,
    /// Optional, required, or repeated
    pub cardinality: Cardinality,
    /// Whether repeated values of this field are emitted packed
    pub packed: bool,
}

impl FieldDescriptor {
    /// Whether this field is repeated
    pub fn is_repeated(&self) -> bool {
        self.cardinality == Cardinality::Repeated
    }

    /// Whether this field is required
    pub fn is_required(&self) -> bool {
        self.cardinality == Cardinality::Required
    }
}

/// A message type: ordered fields, indexed by number and by name
#[derive(Debug, Clone, PartialEq)]
pub struct TypeDescriptor {
    /// Fully-qualified dotted name, without a leading dot
    pub name: String,
    fields: Vec<FieldDescriptor>,
    by_number: HashMap<u32, usize>,
    by_name: HashMap<String, usize>,
}

impl TypeDescriptor {
    /// Build a descriptor, rejecting duplicate field numbers or names
    pub(crate) fn new(name: String, fields: Vec<FieldDescriptor>) -> Result<Self> {
        let mut by_number = HashMap::with_capacity(fields.len());
        let mut by_name = HashMap::with_capacity(fields.len());
        for (index, field) in fields.iter().enumerate() {
            if by_number.insert(field.number, index).is_some() {
                return Err(Error::MalformedDescriptor(format!(
                    "duplicate field number {} in '{}'",
                    field.number, name
                )));
            }
            if by_name.insert(field.name.clone(), index).is_some() {
                return Err(Error::MalformedDescriptor(format!(
                    "duplicate field name '{}' in '{}'",
                    field.name, name
                )));
            }
        }
        Ok(Self {
            name,
            fields,
            by_number,
            by_name,
        })
    }

    /// Fields in declaration order
    pub fn fields(&self) -> &[FieldDescriptor] {
        &self.fields
    }

    /// Look up a field by its wire number
    pub fn field_by_number(&self, number: u32) -> Option<&FieldDescriptor> {
        self.by_number.get(&number).map(|&i| &self.fields[i])
    }

    /// Look up a field by its name
    pub fn field_by_name(&self, name: &str) -> Option<&FieldDescriptor> {
        self.by_name.get(name).map(|&i| &self.fields[i])
    }
}

/// An enum type: named integer values
#[derive(Debug, Clone, PartialEq)]
pub struct EnumDescriptor {
    /// Fully-qualified dotted name, without a leading dot
    pub name: String,
    values: Vec<(String, i32)>,
}

impl EnumDescriptor {
    pub(crate) fn new(name: String, values: Vec<(String, i32)>) -> Self {
        Self { name, values }
    }

    /// Declared (name, number) pairs in declaration order
    pub fn values(&self) -> &[(String, i32)] {
        &self.values
    }

    /// Name of the first value declared with this number, if any
    pub fn name_of(&self, number: i32) -> Option<&str> {
        self.values
            .iter()
            .find(|(_, n)| *n == number)
            .map(|(name, _)| name.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scalar_field(name: &str, number: u32, kind: FieldKind) -> FieldDescriptor {
        FieldDescriptor {
            number,
            name: name.to_string(),
            kind,
            cardinality: Cardinality::Optional,
            packed: false,
        }
    }

    #[test]
    fn test_wire_kind_mapping() {
        assert_eq!(FieldKind::Int32.wire_kind(), WireKind::Varint);
        assert_eq!(FieldKind::Sint64.wire_kind(), WireKind::Varint);
        assert_eq!(FieldKind::Bool.wire_kind(), WireKind::Varint);
        assert_eq!(FieldKind::Float.wire_kind(), WireKind::Fixed32);
        assert_eq!(FieldKind::Sfixed32.wire_kind(), WireKind::Fixed32);
        assert_eq!(FieldKind::Double.wire_kind(), WireKind::Fixed64);
        assert_eq!(FieldKind::Fixed64.wire_kind(), WireKind::Fixed64);
        assert_eq!(FieldKind::String.wire_kind(), WireKind::LengthDelimited);
        assert_eq!(
            FieldKind::Message(TypeId(0)).wire_kind(),
            WireKind::LengthDelimited
        );
    }

    #[test]
    fn test_numeric_excludes_bool_enum_and_composites() {
        assert!(FieldKind::Int64.numeric());
        assert!(FieldKind::Double.numeric());
        assert!(!FieldKind::Bool.numeric());
        assert!(!FieldKind::Enum(TypeId(0)).numeric());
        assert!(!FieldKind::String.numeric());
        assert!(!FieldKind::Message(TypeId(0)).numeric());
    }

    #[test]
    fn test_field_lookup_by_number_and_name() {
        let desc = TypeDescriptor::new(
            "geo.Point".to_string(),
            vec![
                scalar_field("x", 1, FieldKind::Int32),
                scalar_field("y", 2, FieldKind::Int32),
            ],
        )
        .unwrap();

        assert_eq!(desc.field_by_number(1).unwrap().name, "x");
        assert_eq!(desc.field_by_name("y").unwrap().number, 2);
        assert!(desc.field_by_number(3).is_none());
        assert!(desc.field_by_name("z").is_none());
    }

    #[test]
    fn test_duplicate_fields_rejected() {
        let dup_number = TypeDescriptor::new(
            "T".to_string(),
            vec![
                scalar_field("a", 1, FieldKind::Int32),
                scalar_field("b", 1, FieldKind::Int32),
            ],
        );
        assert!(matches!(dup_number, Err(Error::MalformedDescriptor(_))));

        let dup_name = TypeDescriptor::new(
            "T".to_string(),
            vec![
                scalar_field("a", 1, FieldKind::Int32),
                scalar_field("a", 2, FieldKind::Int32),
            ],
        );
        assert!(matches!(dup_name, Err(Error::MalformedDescriptor(_))));
    }

    #[test]
    fn test_enum_descriptor_name_lookup() {
        let desc = EnumDescriptor::new(
            "Color".to_string(),
            vec![("RED".to_string(), 0), ("BLUE".to_string(), 2)],
        );
        assert_eq!(desc.name_of(2), Some("BLUE"));
        assert_eq!(desc.name_of(1), None);
        assert_eq!(desc.values().len(), 2);
    }
}
