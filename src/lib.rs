//! ProtoDyn: schema-driven Protocol Buffers codec with no generated code
//!
//! This crate decodes and encodes protobuf wire bytes against schemas loaded
//! at runtime from serialized `FileDescriptorSet`s, the artifact produced by
//! `protoc --descriptor_set_out`. No types are generated; messages cross the
//! API boundary as dynamic [`Value`] trees keyed by field name.
//!
//! # Features
//!
//! - Runtime schema registry resolving nested messages and enums by
//!   fully-qualified name
//! - Exact 64-bit integers as decimal strings via `preserve_int64`
//! - Packed numeric buffers for repeated fixed-width fields
//! - Unknown-field capture for schema-evolution round trips
//! - Byte budgets and a nesting-depth ceiling against adversarial inputs
//!
//! # Example
//!
//! ```rust
//! use protodyn::{Codec, Value};
//! use prost_types::field_descriptor_proto::{Label, Type};
//! use prost_types::{DescriptorProto, FieldDescriptorProto, FileDescriptorProto,
//!     FileDescriptorSet};
//!
//! // geo.Point { required int32 x = 1; required int32 y = 2; }
//! let field = |name: &str, number: i32| FieldDescriptorProto {
//!     name: Some(name.to_string()),
//!     number: Some(number),
//!     label: Some(Label::Required as i32),
//!     r#type: Some(Type::Int32 as i32),
//!     ..Default::default()
//! };
//! let set = FileDescriptorSet {
//!     file: vec![FileDescriptorProto {
//!         name: Some("geo.proto".to_string()),
//!         package: Some("geo".to_string()),
//!         message_type: vec![DescriptorProto {
//!             name: Some("Point".to_string()),
//!             field: vec![field("x", 1), field("y", 2)],
//!             ..Default::default()
//!         }],
//!         ..Default::default()
//!     }],
//! };
//!
//! let codec = Codec::from_descriptor_set(&set, false)?;
//! assert_eq!(codec.info(), vec!["geo.Point"]);
//!
//! let value = Value::map([("x", Value::from(1i32)), ("y", Value::from(2i32))]);
//! let bytes = codec.encode("geo.Point", &value)?;
//! assert_eq!(bytes, vec![0x08, 0x01, 0x10, 0x02]);
//! assert_eq!(codec.decode("geo.Point", &bytes)?, value);
//! # Ok::<(), protodyn::Error>(())
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod codec;
pub mod decoder;
pub mod descriptor;
pub mod encoder;
pub mod error;
pub mod message;
pub mod registry;
pub mod value;

#[cfg(test)]
pub(crate) mod testutil;

// Re-export main types
pub use codec::Codec;
pub use decoder::{DecodeOptions, Decoder, MAX_RECURSION_DEPTH};
pub use descriptor::{
    Cardinality, EnumDescriptor, FieldDescriptor, FieldKind, TypeDescriptor, TypeId, WireKind,
};
pub use encoder::Encoder;
pub use error::{Error, Result};
pub use message::{DynamicMessage, FieldValue, Scalar};
pub use registry::Registry;
pub use value::{PackedArray, UnknownField, Value, UNKNOWN_FIELDS_KEY};
