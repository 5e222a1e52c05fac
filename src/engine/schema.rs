// Copyright © 2026 Pathway

use std::collections::HashMap;
use std::fmt::{self, Display};
use std::sync::Arc;

use arcstr::ArcStr;
use derivative::Derivative;
use itertools::Itertools as _;
use ordered_float::OrderedFloat;
use serde::{Deserialize, Serialize};
use xxhash_rust::xxh3::Xxh3 as Hasher;

use super::error::{Error, Result};
use super::value::{HashInto, Value};

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FieldType {
    Boolean,
    /// Fixed-width 32-bit integer.
    Int,
    /// Fixed-width 64-bit integer.
    Long,
    /// Variable-length 32-bit integer.
    VInt,
    /// Variable-length 64-bit integer.
    VLong,
    Float,
    Double,
    String,
    Enum {
        variants: Vec<String>,
    },
    Bytes,
    /// Opaque nested record, carried as its serialized bytes.
    Object {
        type_name: String,
    },
}

impl FieldType {
    pub fn enumeration<I, S>(variants: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::Enum {
            variants: variants.into_iter().map(Into::into).collect(),
        }
    }

    pub fn object(type_name: impl Into<String>) -> Self {
        Self::Object {
            type_name: type_name.into(),
        }
    }

    /// The value every slot of this type holds before it is first set.
    pub fn default_value(&self) -> Value {
        match self {
            Self::Boolean => Value::Bool(false),
            Self::Int | Self::VInt => Value::Int(0),
            Self::Long | Self::VLong => Value::Long(0),
            Self::Float => Value::Float(OrderedFloat(0.0)),
            Self::Double => Value::Double(OrderedFloat(0.0)),
            Self::String => Value::String(ArcStr::new()),
            Self::Enum { .. } => Value::Enum(0),
            Self::Bytes | Self::Object { .. } => Value::Bytes(Arc::from(&[][..])),
        }
    }

    pub fn accepts(&self, value: &Value) -> bool {
        match (self, value) {
            (Self::Boolean, Value::Bool(_))
            | (Self::Int | Self::VInt, Value::Int(_))
            | (Self::Long | Self::VLong, Value::Long(_))
            | (Self::Float, Value::Float(_))
            | (Self::Double, Value::Double(_))
            | (Self::String, Value::String(_))
            | (Self::Bytes | Self::Object { .. }, Value::Bytes(_)) => true,
            (Self::Enum { variants }, Value::Enum(ordinal)) => (*ordinal as usize) < variants.len(),
            _ => false,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Self::Boolean => "boolean",
            Self::Int => "int",
            Self::Long => "long",
            Self::VInt => "vint",
            Self::VLong => "vlong",
            Self::Float => "float",
            Self::Double => "double",
            Self::String => "string",
            Self::Enum { .. } => "enum",
            Self::Bytes => "bytes",
            Self::Object { .. } => "object",
        }
    }

    /// Number of bytes of the fixed-width encoding, `None` for variable-width types.
    pub fn fixed_width(&self) -> Option<usize> {
        match self {
            Self::Boolean => Some(1),
            Self::Int | Self::Float => Some(4),
            Self::Long | Self::Double => Some(8),
            _ => None,
        }
    }
}

impl Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Enum { variants } => write!(f, "enum({})", variants.iter().format("|")),
            Self::Object { type_name } => write!(f, "object({type_name})"),
            simple => write!(f, "{}", simple.kind()),
        }
    }
}

impl HashInto for FieldType {
    fn hash_into(&self, hasher: &mut Hasher) {
        self.to_string().hash_into(hasher);
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Field {
    name: String,
    #[serde(rename = "type")]
    type_: FieldType,
}

impl Field {
    pub fn new(name: impl Into<String>, type_: FieldType) -> Self {
        Self {
            name: name.into(),
            type_,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn type_(&self) -> &FieldType {
        &self.type_
    }
}

impl Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.name, self.type_)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct SchemaId(pub u64);

impl Display for SchemaId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:016x}", self.0)
    }
}

#[derive(Serialize, Deserialize)]
struct SchemaDef {
    name: String,
    fields: Vec<Field>,
}

/// An immutable, named and ordered list of typed fields.
///
/// Field order is fixed at creation. Equality and hashing go through the
/// [`SchemaId`], which is derived from the name and the full field list.
#[derive(Debug, Clone, Derivative, Serialize, Deserialize)]
#[derivative(PartialEq, Eq, Hash)]
#[serde(try_from = "SchemaDef", into = "SchemaDef")]
pub struct Schema {
    id: SchemaId,
    #[derivative(PartialEq = "ignore", Hash = "ignore")]
    name: String,
    #[derivative(PartialEq = "ignore", Hash = "ignore")]
    fields: Arc<[Field]>,
    #[derivative(PartialEq = "ignore", Hash = "ignore")]
    positions: HashMap<String, usize>,
}

impl Schema {
    pub fn new(name: impl Into<String>, fields: Vec<Field>) -> Result<Self> {
        let name = name.into();
        let mut positions = HashMap::with_capacity(fields.len());
        for (position, field) in fields.iter().enumerate() {
            if positions.insert(field.name.clone(), position).is_some() {
                return Err(Error::InvalidConfig(format!(
                    "field {:?} declared twice in schema {name:?}",
                    field.name
                )));
            }
            if matches!(&field.type_, FieldType::Enum { variants } if variants.is_empty()) {
                return Err(Error::InvalidConfig(format!(
                    "enum field {:?} of schema {name:?} has no variants",
                    field.name
                )));
            }
        }
        let mut hasher = Hasher::default();
        name.hash_into(&mut hasher);
        fields.len().hash_into(&mut hasher);
        for field in &fields {
            field.name.hash_into(&mut hasher);
            field.type_.hash_into(&mut hasher);
        }
        Ok(Self {
            id: SchemaId(hasher.digest()),
            name,
            fields: fields.into(),
            positions,
        })
    }

    pub fn id(&self) -> SchemaId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn fields(&self) -> &[Field] {
        &self.fields
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn field(&self, position: usize) -> Option<&Field> {
        self.fields.get(position)
    }

    pub fn position(&self, name: &str) -> Option<usize> {
        self.positions.get(name).copied()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.positions.contains_key(name)
    }

    /// Like [`Schema::position`], but a missing field is a configuration error.
    pub fn require(&self, name: &str) -> Result<usize> {
        self.position(name)
            .ok_or_else(|| Error::unknown_field(name, &self.name))
    }

    pub fn field_by_name(&self, name: &str) -> Result<&Field> {
        self.require(name).map(|position| &self.fields[position])
    }
}

impl Display for Schema {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}({})", self.name, self.fields.iter().format(", "))
    }
}

impl TryFrom<SchemaDef> for Schema {
    type Error = Error;

    fn try_from(def: SchemaDef) -> Result<Self> {
        Self::new(def.name, def.fields)
    }
}

impl From<Schema> for SchemaDef {
    fn from(schema: Schema) -> Self {
        Self {
            name: schema.name,
            fields: schema.fields.to_vec(),
        }
    }
}
