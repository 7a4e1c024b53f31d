//! Shared helpers for unit tests: hand-built descriptor sets
//!
//! Descriptor sets are constructed programmatically instead of compiled from
//! .proto text, so tests exercise exactly the runtime input path.

use prost_types::field_descriptor_proto::{Label, Type};
use prost_types::{
    DescriptorProto, FieldDescriptorProto, FileDescriptorProto, FileDescriptorSet,
};

use crate::codec::Codec;

pub(crate) fn field(name: &str, number: i32, ty: Type, label: Label) -> FieldDescriptorProto {
    FieldDescriptorProto {
        name: Some(name.to_string()),
        number: Some(number),
        label: Some(label as i32),
        r#type: Some(ty as i32),
        ..Default::default()
    }
}

pub(crate) fn message_field(
    name: &str,
    number: i32,
    label: Label,
    type_name: &str,
) -> FieldDescriptorProto {
    let mut f = field(name, number, Type::Message, label);
    f.type_name = Some(type_name.to_string());
    f
}

pub(crate) fn message(name: &str, fields: Vec<FieldDescriptorProto>) -> DescriptorProto {
    DescriptorProto {
        name: Some(name.to_string()),
        field: fields,
        ..Default::default()
    }
}

pub(crate) fn file(
    name: &str,
    package: &str,
    messages: Vec<DescriptorProto>,
) -> FileDescriptorProto {
    FileDescriptorProto {
        name: Some(name.to_string()),
        package: Some(package.to_string()),
        message_type: messages,
        ..Default::default()
    }
}

pub(crate) fn set(files: Vec<FileDescriptorProto>) -> FileDescriptorSet {
    FileDescriptorSet { file: files }
}

/// `geo.Point { required int32 x = 1; required int32 y = 2; }`
pub(crate) fn point_set() -> FileDescriptorSet {
    set(vec![file(
        "geo.proto",
        "geo",
        vec![message(
            "Point",
            vec![
                field("x", 1, Type::Int32, Label::Required),
                field("y", 2, Type::Int32, Label::Required),
            ],
        )],
    )])
}

pub(crate) fn codec(descriptor_set: &FileDescriptorSet, preserve_int64: bool) -> Codec {
    Codec::from_descriptor_set(descriptor_set, preserve_int64).unwrap()
}
