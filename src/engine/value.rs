// Copyright © 2026 Pathway

use std::fmt::{self, Display};
use std::sync::Arc;

use super::error::{Error, Result};

use arcstr::ArcStr;
use itertools::Itertools as _;
use ordered_float::OrderedFloat;
use serde::{Deserialize, Serialize};
use xxhash_rust::xxh3::Xxh3 as Hasher;

/// A single field value held by a [`Tuple`](super::Tuple) slot.
///
/// Values of the same variant are totally ordered and that order is the
/// natural order used by the comparators. Floats use [`OrderedFloat`], so
/// `-0.0 == 0.0` and all NaNs compare equal and greater than any number.
/// Both `Bytes` and `Object` fields are held as `Bytes`.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Value {
    Bool(bool),
    Int(i32),
    Long(i64),
    Float(OrderedFloat<f32>),
    Double(OrderedFloat<f64>),
    String(ArcStr),
    Enum(u32),
    Bytes(Arc<[u8]>),
}

impl Value {
    #[inline(never)]
    #[cold]
    fn type_mismatch(&self, expected: &'static str) -> Error {
        Error::TypeMismatch {
            expected,
            value: self.clone(),
        }
    }

    pub fn as_bool(&self) -> Result<bool> {
        if let Self::Bool(b) = self {
            Ok(*b)
        } else {
            Err(self.type_mismatch("bool"))
        }
    }

    pub fn as_int(&self) -> Result<i32> {
        if let Self::Int(i) = self {
            Ok(*i)
        } else {
            Err(self.type_mismatch("int"))
        }
    }

    pub fn as_long(&self) -> Result<i64> {
        if let Self::Long(l) = self {
            Ok(*l)
        } else {
            Err(self.type_mismatch("long"))
        }
    }

    pub fn as_float(&self) -> Result<f32> {
        if let Self::Float(f) = self {
            Ok(f.into_inner())
        } else {
            Err(self.type_mismatch("float"))
        }
    }

    pub fn as_double(&self) -> Result<f64> {
        if let Self::Double(d) = self {
            Ok(d.into_inner())
        } else {
            Err(self.type_mismatch("double"))
        }
    }

    pub fn as_string(&self) -> Result<&ArcStr> {
        if let Self::String(s) = self {
            Ok(s)
        } else {
            Err(self.type_mismatch("string"))
        }
    }

    pub fn as_enum(&self) -> Result<u32> {
        if let Self::Enum(ordinal) = self {
            Ok(*ordinal)
        } else {
            Err(self.type_mismatch("enum"))
        }
    }

    pub fn as_bytes(&self) -> Result<&[u8]> {
        if let Self::Bytes(b) = self {
            Ok(b)
        } else {
            Err(self.type_mismatch("bytes"))
        }
    }

    pub fn simple_type(&self) -> SimpleType {
        match self {
            Self::Bool(_) => SimpleType::Bool,
            Self::Int(_) => SimpleType::Int,
            Self::Long(_) => SimpleType::Long,
            Self::Float(_) => SimpleType::Float,
            Self::Double(_) => SimpleType::Double,
            Self::String(_) => SimpleType::String,
            Self::Enum(_) => SimpleType::Enum,
            Self::Bytes(_) => SimpleType::Bytes,
        }
    }
}

impl Display for Value {
    fn fmt(&self, fmt: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::Bool(b) => write!(fmt, "{b}"),
            Self::Int(i) => write!(fmt, "{i}"),
            Self::Long(l) => write!(fmt, "{l}"),
            Self::Float(OrderedFloat(f)) => write!(fmt, "{f:?}"),
            Self::Double(OrderedFloat(d)) => write!(fmt, "{d:?}"),
            Self::String(s) => write!(fmt, "{s:?}"),
            Self::Enum(ordinal) => write!(fmt, "#{ordinal}"),
            Self::Bytes(b) => write!(fmt, "[{:02x}]", b.iter().format("")),
        }
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Self::Bool(b)
    }
}

impl From<i32> for Value {
    fn from(i: i32) -> Self {
        Self::Int(i)
    }
}

impl From<i64> for Value {
    fn from(l: i64) -> Self {
        Self::Long(l)
    }
}

impl From<f32> for Value {
    fn from(f: f32) -> Self {
        Self::Float(OrderedFloat(f))
    }
}

impl From<f64> for Value {
    fn from(d: f64) -> Self {
        Self::Double(OrderedFloat(d))
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Self::String(s.into())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Self::String(s.into())
    }
}

impl From<ArcStr> for Value {
    fn from(s: ArcStr) -> Self {
        Self::String(s)
    }
}

impl From<&[u8]> for Value {
    fn from(b: &[u8]) -> Self {
        Self::Bytes(b.into())
    }
}

impl From<Vec<u8>> for Value {
    fn from(b: Vec<u8>) -> Self {
        Self::Bytes(b.into())
    }
}

// Please only append to this list, as the values here are used in hashing,
// so changing them will result in changed partitions
#[repr(u8)]
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum SimpleType {
    Bool,
    Int,
    Long,
    Float,
    Double,
    String,
    Enum,
    Bytes,
}

pub trait HashInto {
    fn hash_into(&self, hasher: &mut Hasher);
}

impl<T: HashInto + ?Sized> HashInto for &T {
    fn hash_into(&self, hasher: &mut Hasher) {
        (*self).hash_into(hasher);
    }
}

impl HashInto for f64 {
    fn hash_into(&self, hasher: &mut Hasher) {
        #[allow(clippy::float_cmp)]
        let raw = if self.is_nan() {
            !0
        } else if self == &0.0 {
            0 // -0.0 and 0.0 should hash to the same value
        } else {
            self.to_bits()
        };
        raw.hash_into(hasher);
    }
}

impl HashInto for f32 {
    fn hash_into(&self, hasher: &mut Hasher) {
        f64::from(*self).hash_into(hasher);
    }
}

macro_rules! impl_hash_into_int {
    ($($type:path),+) => {
        $(impl HashInto for $type {
            fn hash_into(&self, hasher: &mut Hasher) {
                hasher.update(&self.to_le_bytes());
            }
        })+
    };
}

impl_hash_into_int!(i8, i16, i32, i64);
impl_hash_into_int!(u8, u16, u32, u64);

impl HashInto for usize {
    fn hash_into(&self, hasher: &mut Hasher) {
        (*self as u64).hash_into(hasher);
    }
}

impl HashInto for bool {
    fn hash_into(&self, hasher: &mut Hasher) {
        u8::from(*self).hash_into(hasher);
    }
}

impl HashInto for str {
    fn hash_into(&self, hasher: &mut Hasher) {
        self.len().hash_into(hasher);
        hasher.update(self.as_bytes());
    }
}

impl HashInto for String {
    fn hash_into(&self, hasher: &mut Hasher) {
        self.as_str().hash_into(hasher);
    }
}

impl<T: HashInto> HashInto for [T] {
    fn hash_into(&self, hasher: &mut Hasher) {
        self.len().hash_into(hasher);
        self.iter().for_each(|x| x.hash_into(hasher));
    }
}

impl<T: HashInto> HashInto for Vec<T> {
    fn hash_into(&self, hasher: &mut Hasher) {
        self.as_slice().hash_into(hasher);
    }
}

impl HashInto for Value {
    fn hash_into(&self, hasher: &mut Hasher) {
        (self.simple_type() as u8).hash_into(hasher);
        match self {
            Self::Bool(b) => b.hash_into(hasher),
            Self::Int(i) => i.hash_into(hasher),
            Self::Long(l) => l.hash_into(hasher),
            Self::Float(f) => f.0.hash_into(hasher),
            Self::Double(d) => d.0.hash_into(hasher),
            Self::String(s) => s.as_str().hash_into(hasher),
            Self::Enum(ordinal) => ordinal.hash_into(hasher),
            Self::Bytes(b) => b.hash_into(hasher),
        }
    }
}
