//! Integration tests for protodyn
//!
//! These tests drive the codec end-to-end: descriptor sets built in-process,
//! encode to wire bytes, decode back, and compatibility across schema
//! revisions.

use proptest::prelude::*;
use prost::Message as _;
use prost_types::field_descriptor_proto::{Label, Type};
use prost_types::{
    DescriptorProto, EnumDescriptorProto, EnumValueDescriptorProto, FieldDescriptorProto,
    FieldOptions, FileDescriptorProto, FileDescriptorSet,
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

fn typed_field(name: &str, number: i32, ty: Type, label: Label, type_name: &str) -> FieldDescriptorProto {
    let mut f = field(name, number, ty, label);
    f.type_name = Some(type_name.to_string());
    f
}

fn packed(mut f: FieldDescriptorProto) -> FieldDescriptorProto {
    f.options = Some(FieldOptions {
        packed: Some(true),
        ..Default::default()
    });
    f
}

/// A schema touching every scalar kind plus nested messages and an enum:
///
/// ```text
/// package shop;
/// message Order {
///   optional string   id          = 1;
///   optional int64    total_cents = 2;
///   optional uint64   sequence    = 3;
///   optional sint64   delta       = 4;
///   optional double   weight      = 5;
///   optional float    rating      = 6;
///   optional bool     express     = 7;
///   optional bytes    digest      = 8;
///   repeated int32    quantities  = 9 [packed = true];
///   repeated string   tags        = 10;
///   optional Item     first       = 11;
///   repeated Item     items       = 12;
///   optional Status   status      = 13;
///   optional fixed32  crc         = 14;
///   optional sfixed64 offset      = 15;
/// }
/// message Item { optional string sku = 1; optional uint32 count = 2; }
/// enum Status { NEW = 0; SHIPPED = 1; }
/// ```
fn shop_set() -> FileDescriptorSet {
    let order = DescriptorProto {
        name: Some("Order".to_string()),
        field: vec![
            field("id", 1, Type::String, Label::Optional),
            field("total_cents", 2, Type::Int64, Label::Optional),
            field("sequence", 3, Type::Uint64, Label::Optional),
            field("delta", 4, Type::Sint64, Label::Optional),
            field("weight", 5, Type::Double, Label::Optional),
            field("rating", 6, Type::Float, Label::Optional),
            field("express", 7, Type::Bool, Label::Optional),
            field("digest", 8, Type::Bytes, Label::Optional),
            packed(field("quantities", 9, Type::Int32, Label::Repeated)),
            field("tags", 10, Type::String, Label::Repeated),
            typed_field("first", 11, Type::Message, Label::Optional, ".shop.Item"),
            typed_field("items", 12, Type::Message, Label::Repeated, ".shop.Item"),
            typed_field("status", 13, Type::Enum, Label::Optional, ".shop.Status"),
            field("crc", 14, Type::Fixed32, Label::Optional),
            field("offset", 15, Type::Sfixed64, Label::Optional),
        ],
        ..Default::default()
    };
    let item = DescriptorProto {
        name: Some("Item".to_string()),
        field: vec![
            field("sku", 1, Type::String, Label::Optional),
            field("count", 2, Type::Uint32, Label::Optional),
        ],
        ..Default::default()
    };
    let status = EnumDescriptorProto {
        name: Some("Status".to_string()),
        value: vec![
            EnumValueDescriptorProto {
                name: Some("NEW".to_string()),
                number: Some(0),
                ..Default::default()
            },
            EnumValueDescriptorProto {
                name: Some("SHIPPED".to_string()),
                number: Some(1),
                ..Default::default()
            },
        ],
        ..Default::default()
    };
    FileDescriptorSet {
        file: vec![FileDescriptorProto {
            name: Some("shop.proto".to_string()),
            package: Some("shop".to_string()),
            message_type: vec![order, item],
            enum_type: vec![status],
            ..Default::default()
        }],
    }
}

fn shop_codec(preserve_int64: bool) -> Codec {
    Codec::from_descriptor_set(&shop_set(), preserve_int64).unwrap()
}

fn item(sku: &str, count: u32) -> Value {
    Value::map([
        ("sku", Value::from(sku)),
        ("count", Value::from(count)),
    ])
}

#[test]
fn test_order_roundtrip_1k() {
    // 1K deterministic order variations for complete roundtrip consistency
    let codec = shop_codec(true);

    for i in 0..1_000i64 {
        let mut entries = vec![
            ("id", Value::from(format!("order-{i}"))),
            ("total_cents", Value::from(((i - 500) * 1_000_003).to_string())),
            ("sequence", Value::from((u64::MAX - i as u64).to_string())),
            ("delta", Value::from((-7 * i).to_string())),
            ("weight", Value::from(i as f64 * 0.125)),
            ("express", Value::from(i % 2 == 0)),
            ("crc", Value::from(i as u32)),
            ("offset", Value::from((i64::MIN + i).to_string())),
        ];
        if i % 3 == 0 {
            entries.push((
                "quantities",
                Value::List((0..(i % 5)).map(|q| Value::from(q as i32)).collect()),
            ));
        }
        if i % 4 == 0 {
            entries.push((
                "tags",
                Value::List(vec![Value::from("rush"), Value::from(format!("lane-{}", i % 7))]),
            ));
        }
        if i % 5 == 0 {
            entries.push(("first", item("SKU-0", 1)));
            entries.push((
                "items",
                Value::List(vec![item("SKU-1", i as u32 % 100), item("SKU-2", 3)]),
            ));
        }
        let value = Value::map(entries);

        let bytes = codec.encode("shop.Order", &value).unwrap();
        let decoded = codec.decode("shop.Order", &bytes).unwrap();
        let reencoded = codec.encode("shop.Order", &decoded).unwrap();
        assert_eq!(bytes, reencoded, "order {i} did not roundtrip");

        let map = decoded.as_map().unwrap();
        assert_eq!(map["id"], Value::from(format!("order-{i}")));
        assert_eq!(map["total_cents"], Value::from(((i - 500) * 1_000_003).to_string()));
        assert_eq!(map["delta"], Value::from((-7 * i).to_string()));
        assert_eq!(map["express"], Value::from(i % 2 == 0));
        if i % 5 == 0 {
            let items = map["items"].as_list().unwrap();
            assert_eq!(items.len(), 2);
            assert_eq!(items[0].as_map().unwrap()["sku"], Value::from("SKU-1"));
        }
    }
}

#[test]
fn test_int64_precision_policy() {
    let bytes_for = |codec: &Codec| {
        codec
            .encode(
                "shop.Order",
                &Value::map([("total_cents", Value::from("9007199254740993"))]),
            )
            .unwrap()
    };

    let preserving = shop_codec(true);
    let decoded = preserving.decode("shop.Order", &bytes_for(&preserving)).unwrap();
    assert_eq!(
        decoded.as_map().unwrap()["total_cents"],
        Value::from("9007199254740993")
    );

    // 2^53 + 1 collapses to 2^53 through the lossy path
    let lossy = shop_codec(false);
    let decoded = lossy.decode("shop.Order", &bytes_for(&lossy)).unwrap();
    assert_eq!(
        decoded.as_map().unwrap()["total_cents"],
        Value::from(9007199254740992.0)
    );
}

#[test]
fn test_codec_from_descriptor_bytes() {
    let bytes = shop_set().encode_to_vec();
    let codec = Codec::new(&bytes, false).unwrap();
    assert_eq!(codec.info(), vec!["shop.Order", "shop.Item"]);
}

#[test]
fn test_schema_evolution_preserves_unknown_fields() {
    // v2 adds a field the v1 reader does not know about
    let mut v2_set = shop_set();
    v2_set.file[0].message_type[0]
        .field
        .push(field("carrier", 16, Type::String, Label::Optional));
    let v2 = Codec::from_descriptor_set(&v2_set, false).unwrap();
    let v1 = shop_codec(false);

    let bytes = v2
        .encode(
            "shop.Order",
            &Value::map([
                ("id", Value::from("order-1")),
                ("carrier", Value::from("overnight")),
            ]),
        )
        .unwrap();

    // plain decode tolerates and drops the new field
    let plain = v1.decode("shop.Order", &bytes).unwrap();
    assert_eq!(
        plain,
        Value::map([("id", Value::from("order-1"))])
    );

    // the unknown-preserving decode captures it by number
    let kept = v1
        .decode_with_unknown("shop.Order", &bytes, DecodeOptions::default())
        .unwrap();
    let unknown = kept.as_map().unwrap()[UNKNOWN_FIELDS_KEY].as_list().unwrap();
    assert_eq!(unknown.len(), 1);
    match &unknown[0] {
        Value::Unknown(entry) => {
            assert_eq!(entry.number, 16);
            assert_eq!(entry.bytes, b"overnight");
        }
        other => panic!("expected an unknown-field entry, got {other:?}"),
    }

    // re-encoding through the v1 schema keeps known fields only
    let reencoded = v1.encode("shop.Order", &kept).unwrap();
    assert_eq!(
        v2.decode("shop.Order", &reencoded).unwrap(),
        Value::map([("id", Value::from("order-1"))])
    );
}

#[test]
fn test_typed_arrays_toggle() {
    let codec = shop_codec(false);
    let bytes = codec
        .encode(
            "shop.Order",
            &Value::map([(
                "quantities",
                Value::List(vec![Value::from(1i32), Value::from(-2i32), Value::from(3i32)]),
            )]),
        )
        .unwrap();

    let typed = codec.decode("shop.Order", &bytes).unwrap();
    assert_eq!(
        typed.as_map().unwrap()["quantities"],
        Value::Packed(protodyn::PackedArray::I32(vec![1, -2, 3]))
    );

    let boxed = codec
        .decode_with(
            "shop.Order",
            &bytes,
            DecodeOptions {
                use_typed_arrays: false,
                ..Default::default()
            },
        )
        .unwrap();
    assert_eq!(
        boxed.as_map().unwrap()["quantities"],
        Value::List(vec![Value::from(1i32), Value::from(-2i32), Value::from(3i32)])
    );
}

#[test]
fn test_byte_budget_counts_nested_content() {
    let codec = shop_codec(false);
    let bytes = codec
        .encode(
            "shop.Order",
            &Value::map([
                ("id", Value::from("order-1")),
                ("first", item("SKU-9", 4)),
            ]),
        )
        .unwrap();

    let tight = DecodeOptions {
        max_bytes: bytes.len() - 1,
        ..Default::default()
    };
    assert!(matches!(
        codec.decode_with("shop.Order", &bytes, tight),
        Err(Error::MalformedMessage(_))
    ));

    let exact = DecodeOptions {
        max_bytes: bytes.len(),
        ..Default::default()
    };
    assert!(codec.decode_with("shop.Order", &bytes, exact).is_ok());
}

#[test]
fn test_truncated_input_rejected() {
    let codec = shop_codec(false);
    let mut bytes = codec
        .encode("shop.Order", &Value::map([("id", Value::from("order-1"))]))
        .unwrap();
    bytes.truncate(bytes.len() - 2);
    assert!(matches!(
        codec.decode("shop.Order", &bytes),
        Err(Error::MalformedMessage(_))
    ));
}

proptest! {
    /// Decoded values re-encode to the same bytes, and the decoded form is
    /// a fixed point of the roundtrip.
    #[test]
    fn prop_roundtrip_is_stable(
        id in "[a-z0-9]{0,12}",
        total in any::<i64>(),
        sequence in any::<u64>(),
        delta in any::<i64>(),
        weight in -1.0e9f64..1.0e9f64,
        rating in -1.0e6f32..1.0e6f32,
        express in any::<bool>(),
        digest in proptest::collection::vec(any::<u8>(), 0..32),
        quantities in proptest::collection::vec(any::<i32>(), 0..8),
        tags in proptest::collection::vec("[a-z]{1,6}", 0..4),
        count in any::<u32>(),
        crc in any::<u32>(),
        offset in any::<i64>(),
    ) {
        let codec = shop_codec(true);
        let value = Value::map([
            ("id", Value::from(id)),
            ("total_cents", Value::from(total.to_string())),
            ("sequence", Value::from(sequence.to_string())),
            ("delta", Value::from(delta.to_string())),
            ("weight", Value::from(weight)),
            ("rating", Value::from(rating as f64)),
            ("express", Value::from(express)),
            ("digest", Value::from(digest)),
            ("quantities", Value::List(quantities.into_iter().map(Value::from).collect())),
            ("tags", Value::List(tags.into_iter().map(Value::from).collect())),
            ("first", item("SKU-P", count)),
            ("status", Value::from(1.0)),
            ("crc", Value::from(crc)),
            ("offset", Value::from(offset.to_string())),
        ]);

        let bytes = codec.encode("shop.Order", &value).unwrap();
        let decoded = codec.decode("shop.Order", &bytes).unwrap();
        let reencoded = codec.encode("shop.Order", &decoded).unwrap();
        let redecoded = codec.decode("shop.Order", &reencoded).unwrap();

        prop_assert_eq!(&bytes, &reencoded);
        prop_assert_eq!(decoded, redecoded);
    }
}
