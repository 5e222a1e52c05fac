// Copyright © 2026 Pathway

//! Binary tuple encoding.
//!
//! Fields are written in layout order with no framing between them:
//! fixed-width big-endian for `boolean`, `int`, `long`, `float` and `double`,
//! zigzag LEB128 for `vint`/`vlong`, the LEB128 ordinal for enums and a LEB128
//! byte count followed by the raw bytes for strings, bytes and objects. A
//! field sorted with a custom comparator is additionally wrapped in a LEB128
//! length prefix, whatever its type, so that the comparator sees an opaque
//! range of known length.

pub mod varint;

use std::cmp::Ordering;
use std::str::from_utf8;

use arcstr::ArcStr;
use ordered_float::OrderedFloat;
use smallvec::SmallVec;

use self::varint::{
    read_len, read_uvarint, read_vint, read_vlong, write_uvarint, write_vint, write_vlong,
    MAX_VARINT_LEN,
};
use super::config::CoGroupConfig;
use super::error::{Error, Result};
use super::layout::{LayoutField, SourceId, SourceLayout};
use super::schema::FieldType;
use super::tuple::Tuple;
use super::value::Value;

/// Position and cause of a decoding failure, before the schema is known.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("{reason} at byte offset {offset}")]
pub struct DecodeFailure {
    pub offset: usize,
    pub reason: &'static str,
}

impl DecodeFailure {
    pub fn new(offset: usize, reason: &'static str) -> Self {
        Self { offset, reason }
    }

    pub fn in_schema(self, schema: &str) -> Error {
        Error::Decode {
            schema: schema.to_string(),
            offset: self.offset,
            reason: self.reason,
        }
    }
}

fn read_array<const N: usize>(buf: &[u8], pos: &mut usize) -> Result<[u8; N], DecodeFailure> {
    let bytes = buf
        .get(*pos..*pos + N)
        .ok_or(DecodeFailure::new(*pos, "truncated fixed-width field"))?;
    *pos += N;
    let mut array = [0; N];
    array.copy_from_slice(bytes);
    Ok(array)
}

fn read_slice<'a>(buf: &'a [u8], pos: &mut usize) -> Result<&'a [u8], DecodeFailure> {
    let len = read_len(buf, pos)?;
    let bytes = &buf[*pos..*pos + len];
    *pos += len;
    Ok(bytes)
}

fn read_bool(buf: &[u8], pos: &mut usize) -> Result<bool, DecodeFailure> {
    let start = *pos;
    match read_array::<1>(buf, pos)? {
        [0] => Ok(false),
        [1] => Ok(true),
        _ => Err(DecodeFailure::new(start, "invalid boolean byte")),
    }
}

fn read_ordinal(variants: &[String], buf: &[u8], pos: &mut usize) -> Result<u32, DecodeFailure> {
    let start = *pos;
    let ordinal = read_uvarint(buf, pos)?;
    u32::try_from(ordinal)
        .ok()
        .filter(|ordinal| (*ordinal as usize) < variants.len())
        .ok_or(DecodeFailure::new(start, "enum ordinal out of range"))
}

fn write_value(type_: &FieldType, value: &Value, out: &mut Vec<u8>) -> bool {
    match (type_, value) {
        (FieldType::Boolean, Value::Bool(b)) => out.push(u8::from(*b)),
        (FieldType::Int, Value::Int(i)) => out.extend_from_slice(&i.to_be_bytes()),
        (FieldType::Long, Value::Long(l)) => out.extend_from_slice(&l.to_be_bytes()),
        (FieldType::VInt, Value::Int(i)) => write_vint(*i, out),
        (FieldType::VLong, Value::Long(l)) => write_vlong(*l, out),
        (FieldType::Float, Value::Float(f)) => out.extend_from_slice(&f.0.to_be_bytes()),
        (FieldType::Double, Value::Double(d)) => out.extend_from_slice(&d.0.to_be_bytes()),
        (FieldType::String, Value::String(s)) => {
            write_uvarint(s.len() as u64, out);
            out.extend_from_slice(s.as_bytes());
        }
        (FieldType::Enum { variants }, Value::Enum(ordinal))
            if (*ordinal as usize) < variants.len() =>
        {
            write_uvarint(u64::from(*ordinal), out);
        }
        (FieldType::Bytes | FieldType::Object { .. }, Value::Bytes(b)) => {
            write_uvarint(b.len() as u64, out);
            out.extend_from_slice(b);
        }
        _ => return false,
    }
    true
}

/// Appends the natural encoding of `value`, which must match `type_`.
pub fn encode_field(type_: &FieldType, value: &Value, out: &mut Vec<u8>) -> Result<()> {
    if write_value(type_, value, out) {
        Ok(())
    } else {
        Err(Error::TypeMismatch {
            expected: type_.kind(),
            value: value.clone(),
        })
    }
}

fn encode_named(name: &str, type_: &FieldType, value: &Value, out: &mut Vec<u8>) -> Result<()> {
    if write_value(type_, value, out) {
        Ok(())
    } else {
        Err(Error::InvalidFieldValue {
            field: name.to_string(),
            type_: type_.to_string(),
            value: value.clone(),
        })
    }
}

pub(crate) fn read_field(
    type_: &FieldType,
    buf: &[u8],
    pos: &mut usize,
) -> Result<Value, DecodeFailure> {
    let value = match type_ {
        FieldType::Boolean => Value::Bool(read_bool(buf, pos)?),
        FieldType::Int => Value::Int(i32::from_be_bytes(read_array(buf, pos)?)),
        FieldType::Long => Value::Long(i64::from_be_bytes(read_array(buf, pos)?)),
        FieldType::VInt => Value::Int(read_vint(buf, pos)?),
        FieldType::VLong => Value::Long(read_vlong(buf, pos)?),
        FieldType::Float => Value::Float(OrderedFloat(f32::from_be_bytes(read_array(buf, pos)?))),
        FieldType::Double => {
            Value::Double(OrderedFloat(f64::from_be_bytes(read_array(buf, pos)?)))
        }
        FieldType::String => {
            let start = *pos;
            let bytes = read_slice(buf, pos)?;
            let s = from_utf8(bytes).map_err(|_| DecodeFailure::new(start, "invalid utf-8"))?;
            Value::String(ArcStr::from(s))
        }
        FieldType::Enum { variants } => Value::Enum(read_ordinal(variants, buf, pos)?),
        FieldType::Bytes | FieldType::Object { .. } => Value::Bytes(read_slice(buf, pos)?.into()),
    };
    Ok(value)
}

/// Decodes a single natural field encoding occupying the whole of `bytes`.
pub fn decode_field(type_: &FieldType, bytes: &[u8]) -> Result<Value> {
    let mut pos = 0;
    let value = read_field(type_, bytes, &mut pos).map_err(|f| f.in_schema(&type_.to_string()))?;
    if pos == bytes.len() {
        Ok(value)
    } else {
        Err(DecodeFailure::new(pos, "trailing bytes after field").in_schema(&type_.to_string()))
    }
}

/// Compares the next field of two buffers in natural order, advancing both positions.
pub(crate) fn compare_natural(
    type_: &FieldType,
    buf1: &[u8],
    pos1: &mut usize,
    buf2: &[u8],
    pos2: &mut usize,
) -> Result<Ordering, DecodeFailure> {
    let ordering = match type_ {
        FieldType::Boolean => read_bool(buf1, pos1)?.cmp(&read_bool(buf2, pos2)?),
        FieldType::Int => i32::from_be_bytes(read_array(buf1, pos1)?)
            .cmp(&i32::from_be_bytes(read_array(buf2, pos2)?)),
        FieldType::Long => i64::from_be_bytes(read_array(buf1, pos1)?)
            .cmp(&i64::from_be_bytes(read_array(buf2, pos2)?)),
        FieldType::VInt => read_vint(buf1, pos1)?.cmp(&read_vint(buf2, pos2)?),
        FieldType::VLong => read_vlong(buf1, pos1)?.cmp(&read_vlong(buf2, pos2)?),
        FieldType::Float => OrderedFloat(f32::from_be_bytes(read_array(buf1, pos1)?))
            .cmp(&OrderedFloat(f32::from_be_bytes(read_array(buf2, pos2)?))),
        FieldType::Double => OrderedFloat(f64::from_be_bytes(read_array(buf1, pos1)?))
            .cmp(&OrderedFloat(f64::from_be_bytes(read_array(buf2, pos2)?))),
        FieldType::Enum { variants } => {
            read_ordinal(variants, buf1, pos1)?.cmp(&read_ordinal(variants, buf2, pos2)?)
        }
        // UTF-8 byte order is code point order, so strings need no decoding
        FieldType::String | FieldType::Bytes | FieldType::Object { .. } => {
            read_slice(buf1, pos1)?.cmp(read_slice(buf2, pos2)?)
        }
    };
    Ok(ordering)
}

/// Encodes a layout field, wrapping it in a length prefix when it carries a custom comparator.
pub(crate) fn encode_layout_field(
    field: &LayoutField,
    value: &Value,
    out: &mut Vec<u8>,
) -> Result<()> {
    let start = out.len();
    encode_named(field.name(), field.type_(), value, out)?;
    if field.is_length_prefixed() {
        let mut prefix = SmallVec::<[u8; MAX_VARINT_LEN]>::new();
        write_uvarint((out.len() - start) as u64, &mut prefix);
        out.extend_from_slice(&prefix);
        out[start..].rotate_right(prefix.len());
    }
    Ok(())
}

pub(crate) fn read_layout_field(
    field: &LayoutField,
    buf: &[u8],
    pos: &mut usize,
) -> Result<Value, DecodeFailure> {
    if field.is_length_prefixed() {
        let start = *pos;
        let inner = read_slice(buf, pos)?;
        let mut inner_pos = 0;
        let value = read_field(field.type_(), inner, &mut inner_pos)
            .map_err(|failure| DecodeFailure::new(start + failure.offset, failure.reason))?;
        if inner_pos != inner.len() {
            return Err(DecodeFailure::new(start, "length prefix does not match field"));
        }
        Ok(value)
    } else {
        read_field(field.type_(), buf, pos)
    }
}

/// Reads the opaque range of a length-prefixed field.
pub(crate) fn read_prefixed<'a>(buf: &'a [u8], pos: &mut usize) -> Result<&'a [u8], DecodeFailure> {
    read_slice(buf, pos)
}

/// Encodes every field of `tuple` in schema order.
pub fn serialize_tuple(tuple: &Tuple, out: &mut Vec<u8>) -> Result<()> {
    for (field, value) in tuple.schema().fields().iter().zip(tuple.values()) {
        encode_named(field.name(), field.type_(), value, out)?;
    }
    Ok(())
}

/// Decodes a record written by [`serialize_tuple`] into `tuple`, returning the bytes consumed.
pub fn deserialize_tuple(bytes: &[u8], tuple: &mut Tuple) -> Result<usize> {
    let schema = tuple.schema().clone();
    let mut pos = 0;
    for (position, field) in schema.fields().iter().enumerate() {
        let value =
            read_field(field.type_(), bytes, &mut pos).map_err(|f| f.in_schema(schema.name()))?;
        tuple.set_unchecked(position, value);
    }
    Ok(pos)
}

/// Mapper-side translation: writes native tuples in the unified layout.
#[derive(Debug, Clone)]
pub struct TupleSerializer {
    config: CoGroupConfig,
}

impl TupleSerializer {
    pub fn new(config: &CoGroupConfig) -> Self {
        Self {
            config: config.clone(),
        }
    }

    pub fn serialize(&self, tuple: &Tuple, out: &mut Vec<u8>) -> Result<()> {
        let layout = self.config.layout();
        let source = layout.source_for(tuple.schema())?;
        let mapping = source.mapping();
        for (field, &native) in layout.common_fields().iter().zip(mapping.common()) {
            encode_layout_field(field, tuple.get(native)?, out)?;
        }
        if layout.is_multi_source() {
            write_uvarint(u64::from(source.id().0), out);
        }
        for (field, &native) in source.particular_fields().iter().zip(mapping.particular()) {
            encode_layout_field(field, tuple.get(native)?, out)?;
        }
        Ok(())
    }

    pub fn to_bytes(&self, tuple: &Tuple) -> Result<Vec<u8>> {
        let mut out = Vec::new();
        self.serialize(tuple, &mut out)?;
        Ok(out)
    }
}

/// Reducer-side translation: rebuilds native tuples from the unified layout.
///
/// One tuple per source is kept and overwritten on every call, so a returned
/// reference is only valid until the next record is deserialized.
#[derive(Debug, Clone)]
pub struct TupleDeserializer {
    config: CoGroupConfig,
    tuples: Vec<Tuple>,
    common: Vec<Value>,
}

impl TupleDeserializer {
    pub fn new(config: &CoGroupConfig) -> Self {
        let tuples = config
            .layout()
            .sources()
            .iter()
            .map(|source| Tuple::new(source.schema().clone()))
            .collect();
        Self {
            config: config.clone(),
            tuples,
            common: Vec::with_capacity(config.layout().common_fields().len()),
        }
    }

    /// A fresh tuple of the common schema, suitable for [`Self::deserialize_common`].
    pub fn new_common_tuple(&self) -> Tuple {
        Tuple::new(self.config.layout().common_schema().clone())
    }

    pub fn deserialize(&mut self, bytes: &[u8]) -> Result<&Tuple> {
        let layout = self.config.layout();
        let common_name = layout.common_schema().name();
        let mut pos = 0;
        self.common.clear();
        for field in layout.common_fields() {
            let value =
                read_layout_field(field, bytes, &mut pos).map_err(|f| f.in_schema(common_name))?;
            self.common.push(value);
        }
        let source = read_source(layout.sources(), bytes, &mut pos, layout.is_multi_source())?;
        let tuple = &mut self.tuples[source.id().index()];
        for (value, &native) in self.common.drain(..).zip(source.mapping().common()) {
            tuple.set_unchecked(native, value);
        }
        for (field, &native) in source.particular_fields().iter().zip(source.mapping().particular()) {
            let value = read_layout_field(field, bytes, &mut pos)
                .map_err(|f| f.in_schema(source.schema().name()))?;
            tuple.set_unchecked(native, value);
        }
        if pos != bytes.len() {
            return Err(DecodeFailure::new(pos, "trailing bytes after record")
                .in_schema(source.schema().name()));
        }
        Ok(tuple)
    }

    /// Decodes only the common fields of a record into a common-schema tuple.
    pub fn deserialize_common(&self, bytes: &[u8], into: &mut Tuple) -> Result<()> {
        let layout = self.config.layout();
        let common_schema = layout.common_schema();
        into.ensure_schema(common_schema)?;
        let mut pos = 0;
        for (position, field) in layout.common_fields().iter().enumerate() {
            let value = read_layout_field(field, bytes, &mut pos)
                .map_err(|f| f.in_schema(common_schema.name()))?;
            into.set_unchecked(position, value);
        }
        Ok(())
    }
}

pub(crate) fn read_source<'a>(
    sources: &'a [SourceLayout],
    buf: &[u8],
    pos: &mut usize,
    multi_source: bool,
) -> Result<&'a SourceLayout> {
    if !multi_source {
        return Ok(&sources[0]);
    }
    let start = *pos;
    let source_id = read_uvarint(buf, pos).map_err(|f| f.in_schema("source id"))?;
    u32::try_from(source_id)
        .ok()
        .and_then(|id| sources.get(SourceId(id).index()))
        .ok_or(Error::UnknownSourceId {
            source_id,
            offset: start,
        })
}
