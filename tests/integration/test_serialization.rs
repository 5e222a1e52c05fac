// Copyright © 2026 Pathway

use std::sync::Arc;

use assert_matches::assert_matches;

use cogroup_engine::engine::serialization::varint::{
    read_uvarint, read_vint, read_vlong, write_uvarint, write_vint, write_vlong,
};
use cogroup_engine::engine::{
    decode_field, deserialize_tuple, encode_field, serialize_tuple, CoGroupConfig,
    ComparatorRegistry, Error, Field, FieldType, Order, Schema, SortCriteria, Tuple,
    TupleDeserializer, TupleSerializer, Value,
};

use crate::helpers::{schema, tuple, CaseInsensitive};

fn all_types() -> Arc<Schema> {
    Arc::new(schema(
        "all_types",
        &[
            ("boolean", FieldType::Boolean),
            ("int", FieldType::Int),
            ("long", FieldType::Long),
            ("vint", FieldType::VInt),
            ("vlong", FieldType::VLong),
            ("float", FieldType::Float),
            ("double", FieldType::Double),
            ("string", FieldType::String),
            ("color", FieldType::enumeration(["RED", "GREEN", "BLUE"])),
            ("bytes", FieldType::Bytes),
            ("point", FieldType::object("Point")),
        ],
    ))
}

fn assert_round_trip(tuple: &Tuple) -> eyre::Result<()> {
    let mut bytes = Vec::new();
    serialize_tuple(tuple, &mut bytes)?;
    let mut decoded = Tuple::new(tuple.schema().clone());
    let consumed = deserialize_tuple(&bytes, &mut decoded)?;
    assert_eq!(consumed, bytes.len());
    assert_eq!(&decoded, tuple);
    Ok(())
}

#[test]
fn test_round_trip_defaults() -> eyre::Result<()> {
    let tuple = Tuple::new(all_types());
    assert_eq!(tuple.get_by_name("string")?, &Value::from(""));
    assert_eq!(tuple.get_by_name("color")?, &Value::Enum(0));
    assert_round_trip(&tuple)
}

#[test]
fn test_round_trip_minimum_values() -> eyre::Result<()> {
    let tuple = Tuple::from_values(
        all_types(),
        [
            Value::Bool(false),
            Value::Int(i32::MIN),
            Value::Long(i64::MIN),
            Value::Int(i32::MIN),
            Value::Long(i64::MIN),
            Value::from(f32::MIN),
            Value::from(f64::MIN),
            Value::from(""),
            Value::Enum(0),
            Value::from(Vec::<u8>::new()),
            Value::from(Vec::<u8>::new()),
        ],
    )?;
    assert_round_trip(&tuple)
}

#[test]
fn test_round_trip_maximum_values() -> eyre::Result<()> {
    let tuple = Tuple::from_values(
        all_types(),
        [
            Value::Bool(true),
            Value::Int(i32::MAX),
            Value::Long(i64::MAX),
            Value::Int(i32::MAX),
            Value::Long(i64::MAX),
            Value::from(f32::MAX),
            Value::from(f64::INFINITY),
            Value::from("zażółć gęślą jaźń"),
            Value::Enum(2),
            Value::from(vec![0xFF_u8; 300]),
            Value::from(vec![1_u8, 2, 3]),
        ],
    )?;
    assert_round_trip(&tuple)
}

#[test]
fn test_round_trip_every_enum_value() -> eyre::Result<()> {
    let mut tuple = Tuple::new(all_types());
    for ordinal in 0..3 {
        tuple.set_by_name("color", Value::Enum(ordinal))?;
        assert_round_trip(&tuple)?;
    }
    Ok(())
}

#[test]
fn test_enum_ordinal_out_of_range() {
    let mut tuple = Tuple::new(all_types());
    let result = tuple.set_by_name("color", Value::Enum(3));
    assert_matches!(result, Err(Error::InvalidFieldValue { field, .. }) if field == "color");
}

#[test]
fn test_enum_without_variants_is_rejected() {
    let result = Schema::new(
        "palette",
        vec![
            Field::new("id", FieldType::Int),
            Field::new("color", FieldType::enumeration(Vec::<String>::new())),
        ],
    );
    assert_matches!(result, Err(Error::InvalidConfig(message)) if message.contains("\"color\""));
}

#[test]
fn test_field_encodings() -> eyre::Result<()> {
    let mut out = Vec::new();
    encode_field(&FieldType::Int, &Value::Int(1), &mut out)?;
    assert_eq!(out, [0, 0, 0, 1]);

    out.clear();
    encode_field(&FieldType::Long, &Value::Long(-2), &mut out)?;
    assert_eq!(out, [0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFE]);

    out.clear();
    encode_field(&FieldType::Boolean, &Value::Bool(true), &mut out)?;
    assert_eq!(out, [1]);

    out.clear();
    encode_field(&FieldType::String, &Value::from("héllo"), &mut out)?;
    assert_eq!(out, b"\x06h\xc3\xa9llo");

    out.clear();
    encode_field(
        &FieldType::enumeration(["A", "B"]),
        &Value::Enum(1),
        &mut out,
    )?;
    assert_eq!(out, [1]);

    let result = encode_field(&FieldType::Int, &Value::Long(1), &mut out);
    assert_matches!(result, Err(Error::TypeMismatch { expected: "int", .. }));
    Ok(())
}

#[test]
fn test_varint_sizes() -> eyre::Result<()> {
    let encoded_len = |value: u64| {
        let mut out = Vec::new();
        write_uvarint(value, &mut out);
        out.len()
    };
    assert_eq!(encoded_len(0), 1);
    assert_eq!(encoded_len(127), 1);
    assert_eq!(encoded_len(128), 2);
    assert_eq!(encoded_len(16_383), 2);
    assert_eq!(encoded_len(16_384), 3);
    assert_eq!(encoded_len(u64::MAX), 10);

    let mut out = Vec::new();
    write_uvarint(300, &mut out);
    assert_eq!(out, [0xAC, 0x02]);
    let mut pos = 0;
    assert_eq!(read_uvarint(&out, &mut pos)?, 300);
    assert_eq!(pos, 2);

    // small magnitudes stay small whatever the sign
    for (value, len) in [(0, 1), (-1, 1), (63, 1), (-64, 1), (64, 2), (i64::MIN, 10)] {
        let mut out = Vec::new();
        write_vlong(value, &mut out);
        assert_eq!(out.len(), len, "encoding of {value}");
        let mut pos = 0;
        assert_eq!(read_vlong(&out, &mut pos)?, value);
    }

    let mut out = Vec::new();
    write_vint(i32::MIN, &mut out);
    let mut pos = 0;
    assert_eq!(read_vint(&out, &mut pos)?, i32::MIN);
    Ok(())
}

#[test]
fn test_varint_errors() {
    let mut pos = 0;
    let failure = read_uvarint(&[0x80, 0x80], &mut pos).unwrap_err();
    assert_eq!(failure.offset, 0);
    assert_eq!(failure.to_string(), "truncated varint at byte offset 0");

    let mut pos = 0;
    let failure = read_uvarint(&[0xFF; 11], &mut pos).unwrap_err();
    assert_eq!(failure.offset, 0);

    let mut out = Vec::new();
    write_vlong(i64::from(i32::MAX) + 1, &mut out);
    let mut pos = 0;
    assert!(read_vint(&out, &mut pos).is_err());
}

#[test]
fn test_truncated_record_reports_offset() -> eyre::Result<()> {
    let schema = Arc::new(schema(
        "events",
        &[("id", FieldType::Int), ("name", FieldType::String)],
    ));
    let tuple = Tuple::from_values(schema.clone(), [Value::Int(5), Value::from("hello")])?;
    let mut bytes = Vec::new();
    serialize_tuple(&tuple, &mut bytes)?;
    assert_eq!(bytes.len(), 10);

    let mut decoded = Tuple::new(schema.clone());
    let result = deserialize_tuple(&bytes[..7], &mut decoded);
    assert_matches!(
        result,
        Err(Error::Decode { schema, offset: 4, .. }) if schema == "events"
    );

    let result = deserialize_tuple(&bytes[..3], &mut decoded);
    assert_matches!(result, Err(Error::Decode { offset: 0, .. }));
    Ok(())
}

#[test]
fn test_malformed_fields() {
    let result = decode_field(&FieldType::Boolean, &[2]);
    assert_matches!(result, Err(Error::Decode { offset: 0, reason, .. }) if reason.contains("boolean"));

    let result = decode_field(&FieldType::String, &[2, 0xC3, 0x28]);
    assert_matches!(result, Err(Error::Decode { reason, .. }) if reason.contains("utf-8"));

    let result = decode_field(&FieldType::enumeration(["A"]), &[1]);
    assert_matches!(result, Err(Error::Decode { .. }));

    let result = decode_field(&FieldType::Int, &[0, 0, 0, 1, 9]);
    assert_matches!(result, Err(Error::Decode { offset: 4, .. }));

    assert_matches!(decode_field(&FieldType::Int, &[0, 0, 0, 1]), Ok(Value::Int(1)));
}

fn two_sources(registry: &ComparatorRegistry, common: SortCriteria) -> eyre::Result<CoGroupConfig> {
    Ok(CoGroupConfig::builder()
        .add_source(schema(
            "users",
            &[
                ("id", FieldType::Long),
                ("country", FieldType::String),
                ("name", FieldType::String),
            ],
        ))
        .add_source(schema(
            "orders",
            &[
                ("amount", FieldType::VLong),
                ("country", FieldType::String),
                ("id", FieldType::Long),
            ],
        ))
        .group_by(["country"])
        .order_by(common)
        .build(registry)?)
}

#[test]
fn test_unified_layout() -> eyre::Result<()> {
    let config = two_sources(
        &ComparatorRegistry::new(),
        SortCriteria::new().asc("country").desc("id"),
    )?;
    let serializer = TupleSerializer::new(&config);

    let user = tuple(
        &config,
        "users",
        vec![Value::Long(7), Value::from("fr"), Value::from("ann")],
    );
    let bytes = serializer.to_bytes(&user)?;
    assert_eq!(
        bytes,
        [
            2, b'f', b'r', // country
            0, 0, 0, 0, 0, 0, 0, 7, // id
            0, // source
            3, b'a', b'n', b'n', // name
        ]
    );

    let order = tuple(
        &config,
        "orders",
        vec![Value::Long(-3), Value::from("fr"), Value::Long(7)],
    );
    let bytes = serializer.to_bytes(&order)?;
    assert_eq!(bytes, [2, b'f', b'r', 0, 0, 0, 0, 0, 0, 0, 7, 1, 5]);
    Ok(())
}

#[test]
fn test_unified_round_trip() -> eyre::Result<()> {
    let config = two_sources(
        &ComparatorRegistry::new(),
        SortCriteria::new().asc("country").desc("id"),
    )?;
    let serializer = TupleSerializer::new(&config);
    let mut deserializer = TupleDeserializer::new(&config);

    let user = tuple(
        &config,
        "users",
        vec![Value::Long(-1), Value::from(""), Value::from("bob")],
    );
    let order = tuple(
        &config,
        "orders",
        vec![Value::Long(i64::MAX), Value::from("pl"), Value::Long(0)],
    );
    for original in [&user, &order, &user] {
        let bytes = serializer.to_bytes(original)?;
        assert_eq!(deserializer.deserialize(&bytes)?, original);
    }

    let mut key = deserializer.new_common_tuple();
    deserializer.deserialize_common(&serializer.to_bytes(&order)?, &mut key)?;
    assert_eq!(key.values(), [Value::from("pl"), Value::Long(0)]);
    Ok(())
}

#[test]
fn test_unknown_source_id() -> eyre::Result<()> {
    let config = two_sources(
        &ComparatorRegistry::new(),
        SortCriteria::new().asc("country"),
    )?;
    let user = tuple(
        &config,
        "users",
        vec![Value::Long(1), Value::from("fr"), Value::from("ann")],
    );
    let mut bytes = TupleSerializer::new(&config).to_bytes(&user)?;
    assert_eq!(bytes[3], 0);
    bytes[3] = 5;
    let mut deserializer = TupleDeserializer::new(&config);
    let result = deserializer.deserialize(&bytes);
    assert_matches!(
        result,
        Err(Error::UnknownSourceId {
            source_id: 5,
            offset: 3
        })
    );
    Ok(())
}

#[test]
fn test_trailing_bytes_are_rejected() -> eyre::Result<()> {
    let config = two_sources(
        &ComparatorRegistry::new(),
        SortCriteria::new().asc("country"),
    )?;
    let user = tuple(
        &config,
        "users",
        vec![Value::Long(1), Value::from("fr"), Value::from("ann")],
    );
    let mut bytes = TupleSerializer::new(&config).to_bytes(&user)?;
    bytes.push(0);
    let mut deserializer = TupleDeserializer::new(&config);
    let result = deserializer.deserialize(&bytes);
    assert_matches!(result, Err(Error::Decode { schema, .. }) if schema == "users");
    Ok(())
}

#[test]
fn test_unregistered_schema() -> eyre::Result<()> {
    let config = two_sources(
        &ComparatorRegistry::new(),
        SortCriteria::new().asc("country"),
    )?;
    let stranger = Tuple::new(Arc::new(schema(
        "payments",
        &[("country", FieldType::String)],
    )));
    let result = TupleSerializer::new(&config).to_bytes(&stranger);
    assert_matches!(result, Err(Error::UnknownSource(name)) if name == "payments");
    Ok(())
}

#[test]
fn test_custom_comparator_field_is_length_prefixed() -> eyre::Result<()> {
    let mut registry = ComparatorRegistry::new();
    registry.register("case_insensitive", CaseInsensitive);
    let config = two_sources(
        &registry,
        SortCriteria::new().add_with_comparator("country", Order::Asc, "case_insensitive"),
    )?;
    assert!(config.layout().common_fields()[0].is_length_prefixed());

    let user = tuple(
        &config,
        "users",
        vec![Value::Long(1), Value::from("fr"), Value::from("ann")],
    );
    let bytes = TupleSerializer::new(&config).to_bytes(&user)?;
    assert_eq!(&bytes[..4], [3, 2, b'f', b'r']);
    let mut deserializer = TupleDeserializer::new(&config);
    assert_eq!(deserializer.deserialize(&bytes)?, &user);
    Ok(())
}

#[test]
fn test_single_source_has_no_source_id() -> eyre::Result<()> {
    let config = CoGroupConfig::builder()
        .add_source(schema(
            "events",
            &[("id", FieldType::VInt), ("kind", FieldType::String)],
        ))
        .group_by(["kind"])
        .order_by(SortCriteria::new().asc("kind"))
        .build(&ComparatorRegistry::new())?;
    let event = tuple(&config, "events", vec![Value::Int(-1), Value::from("x")]);
    let bytes = TupleSerializer::new(&config).to_bytes(&event)?;
    assert_eq!(bytes, [1, b'x', 1]);
    let mut deserializer = TupleDeserializer::new(&config);
    assert_eq!(deserializer.deserialize(&bytes)?, &event);
    Ok(())
}
