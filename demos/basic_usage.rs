//! Basic usage example for ProtoDyn
//!
//! Run with: cargo run --example basic_usage

use prost_types::field_descriptor_proto::{Label, Type};
use prost_types::{
    DescriptorProto, FieldDescriptorProto, FileDescriptorProto, FileDescriptorSet,
};
use protodyn::{Codec, DecodeOptions, Error, Value, UNKNOWN_FIELDS_KEY};

fn field(name: &str, number: i32, ty: Type, label: Label) -> FieldDescriptorProto {
    FieldDescriptorProto {
        name: Some(name.to_string()),
        number: Some(number),
        label: Some(label as i32),
        r#type: Some(ty as i32),
        ..Default::default()
    }
}

/// Build the descriptor set a `protoc --descriptor_set_out` run would
/// produce for:
///
/// ```text
/// package demo;
/// message Sensor {
///   required string name    = 1;
///   optional int64  reading = 2;
///   repeated int32  samples = 3;
/// }
/// ```
fn sensor_set() -> FileDescriptorSet {
    FileDescriptorSet {
        file: vec![FileDescriptorProto {
            name: Some("demo.proto".to_string()),
            package: Some("demo".to_string()),
            message_type: vec![DescriptorProto {
                name: Some("Sensor".to_string()),
                field: vec![
                    field("name", 1, Type::String, Label::Required),
                    field("reading", 2, Type::Int64, Label::Optional),
                    field("samples", 3, Type::Int32, Label::Repeated),
                ],
                ..Default::default()
            }],
            ..Default::default()
        }],
    }
}

fn main() -> Result<(), Error> {
    println!("ProtoDyn Basic Usage Example");
    println!("============================");

    // Example 1: build a codec and list its schemas
    let codec = Codec::from_descriptor_set(&sensor_set(), true)?;
    println!("\n1. Available schemas: {:?}", codec.info());

    // Example 2: encode a structured value
    println!("\n2. Encode:");
    let value = Value::map([
        ("name", Value::from("thermo-1")),
        // 2^53 + 1: exact as a string, unreachable as a double
        ("reading", Value::from("9007199254740993")),
        (
            "samples",
            Value::List(vec![Value::from(20i32), Value::from(21i32), Value::from(19i32)]),
        ),
    ]);
    let bytes = codec.encode("demo.Sensor", &value)?;
    println!("  Encoded {} bytes: {:02x?}", bytes.len(), bytes);

    // Example 3: decode back
    println!("\n3. Decode:");
    let decoded = codec.decode("demo.Sensor", &bytes)?;
    let map = decoded.as_map().ok_or_else(|| {
        Error::MalformedMessage("decode always yields a map".to_string())
    })?;
    println!("  name    = {:?}", map["name"]);
    println!("  reading = {:?} (exact, preserve_int64)", map["reading"]);
    println!("  samples = {:?}", map["samples"]);

    // Example 4: a required field missing fails before any bytes exist
    println!("\n4. Validation:");
    let incomplete = Value::map([("reading", Value::from("1"))]);
    match codec.encode("demo.Sensor", &incomplete) {
        Err(err) => println!("  rejected as expected: {err}"),
        Ok(_) => println!("  unexpected success"),
    }

    // Example 5: fields from a newer schema revision survive a decode
    println!("\n5. Unknown fields:");
    let mut extended = bytes.clone();
    // field 9, varint 42: something a newer writer might add
    extended.extend_from_slice(&[0x48, 0x2a]);
    let kept = codec.decode_with_unknown("demo.Sensor", &extended, DecodeOptions::default())?;
    if let Some(unknown) = kept.as_map().and_then(|m| m.get(UNKNOWN_FIELDS_KEY)) {
        println!("  captured: {unknown:?}");
    }

    println!("\nDone.");
    Ok(())
}
