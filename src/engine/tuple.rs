// Copyright © 2026 Pathway

use std::fmt::{self, Display};
use std::sync::Arc;

use itertools::Itertools as _;

use super::error::{Error, Result};
use super::schema::Schema;
use super::value::Value;

/// A reusable record bound to a single [`Schema`] for its whole lifetime.
///
/// Every slot always holds a value of its field's type: a fresh tuple is
/// filled with [`FieldType::default_value`](super::FieldType::default_value)
/// and [`Tuple::clear`] restores those defaults. Keep one instance per role
/// and overwrite it record after record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tuple {
    schema: Arc<Schema>,
    values: Vec<Value>,
}

impl Tuple {
    pub fn new(schema: Arc<Schema>) -> Self {
        let values = schema
            .fields()
            .iter()
            .map(|field| field.type_().default_value())
            .collect();
        Self { schema, values }
    }

    /// Builds a tuple from values given in schema order.
    pub fn from_values(schema: Arc<Schema>, values: impl IntoIterator<Item = Value>) -> Result<Self> {
        let mut tuple = Self::new(schema);
        let mut count = 0;
        for (position, value) in values.into_iter().enumerate() {
            tuple.set(position, value)?;
            count += 1;
        }
        if count != tuple.len() {
            return Err(Error::IndexOutOfBounds);
        }
        Ok(tuple)
    }

    pub fn schema(&self) -> &Arc<Schema> {
        &self.schema
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn values(&self) -> &[Value] {
        &self.values
    }

    pub fn get(&self, position: usize) -> Result<&Value> {
        self.values.get(position).ok_or(Error::IndexOutOfBounds)
    }

    pub fn get_by_name(&self, name: &str) -> Result<&Value> {
        let position = self.schema.require(name)?;
        Ok(&self.values[position])
    }

    pub fn set(&mut self, position: usize, value: impl Into<Value>) -> Result<()> {
        let value = value.into();
        let field = self.schema.field(position).ok_or(Error::IndexOutOfBounds)?;
        if !field.type_().accepts(&value) {
            return Err(Error::InvalidFieldValue {
                field: field.name().to_string(),
                type_: field.type_().to_string(),
                value,
            });
        }
        self.values[position] = value;
        Ok(())
    }

    pub fn set_by_name(&mut self, name: &str, value: impl Into<Value>) -> Result<()> {
        let position = self.schema.require(name)?;
        self.set(position, value)
    }

    /// Stores a value whose type was already checked by the caller.
    pub(crate) fn set_unchecked(&mut self, position: usize, value: Value) {
        debug_assert!(self.schema.fields()[position].type_().accepts(&value));
        self.values[position] = value;
    }

    pub fn clear(&mut self) {
        for (slot, field) in self.values.iter_mut().zip(self.schema.fields()) {
            *slot = field.type_().default_value();
        }
    }

    pub(crate) fn ensure_schema(&self, expected: &Schema) -> Result<()> {
        if *self.schema == *expected {
            Ok(())
        } else {
            Err(Error::SchemaMismatch {
                expected: expected.name().to_string(),
                actual: self.schema.name().to_string(),
            })
        }
    }
}

impl Display for Tuple {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}{{{}}}",
            self.schema.name(),
            self.schema
                .fields()
                .iter()
                .zip(&self.values)
                .format_with(", ", |(field, value), f| f(&format_args!(
                    "{}={value}",
                    field.name()
                )))
        )
    }
}
