// Copyright © 2026 Pathway

#![allow(clippy::module_name_repetitions)]

use std::cmp::Ordering;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::fmt::{self, Debug, Display};
use std::sync::Arc;

use itertools::Itertools as _;
use serde::{Deserialize, Serialize};

use super::error::{DynResult, Error, Result};
use super::value::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Order {
    Asc,
    Desc,
}

impl Order {
    #[inline]
    pub fn apply(self, ordering: Ordering) -> Ordering {
        match self {
            Self::Asc => ordering,
            Self::Desc => ordering.reverse(),
        }
    }
}

impl Display for Order {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Asc => write!(f, "ASC"),
            Self::Desc => write!(f, "DESC"),
        }
    }
}

/// A pluggable ordering for one field.
///
/// Implementations must be pure total orders, and both methods must agree:
/// for any two values, `compare_bytes` over their encodings has the same sign
/// as `compare_values`. The byte form receives the field's own encoding,
/// without the length prefix the engine wraps it in; use
/// [`decode_field`](super::serialization::decode_field) to read it back.
pub trait FieldComparator: Send + Sync + Debug {
    fn compare_values(&self, a: &Value, b: &Value) -> Ordering;

    fn compare_bytes(&self, a: &[u8], b: &[u8]) -> DynResult<Ordering>;
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SortElement {
    field: String,
    order: Order,
    #[serde(default)]
    comparator: Option<String>,
}

impl SortElement {
    pub fn new(field: impl Into<String>, order: Order) -> Self {
        Self {
            field: field.into(),
            order,
            comparator: None,
        }
    }

    #[must_use]
    pub fn with_comparator(mut self, name: impl Into<String>) -> Self {
        self.comparator = Some(name.into());
        self
    }

    pub fn field(&self) -> &str {
        &self.field
    }

    pub fn order(&self) -> Order {
        self.order
    }

    /// Registry name of the custom comparator, if any.
    pub fn comparator(&self) -> Option<&str> {
        self.comparator.as_deref()
    }
}

impl Display for SortElement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.field, self.order)?;
        if let Some(comparator) = &self.comparator {
            write!(f, " USING {comparator}")?;
        }
        Ok(())
    }
}

/// Ordered list of sort elements. Fields without an element are not compared.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SortCriteria {
    elements: Vec<SortElement>,
}

impl SortCriteria {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn add(mut self, field: impl Into<String>, order: Order) -> Self {
        self.elements.push(SortElement::new(field, order));
        self
    }

    #[must_use]
    pub fn asc(self, field: impl Into<String>) -> Self {
        self.add(field, Order::Asc)
    }

    #[must_use]
    pub fn desc(self, field: impl Into<String>) -> Self {
        self.add(field, Order::Desc)
    }

    #[must_use]
    pub fn add_with_comparator(
        mut self,
        field: impl Into<String>,
        order: Order,
        comparator: impl Into<String>,
    ) -> Self {
        self.elements
            .push(SortElement::new(field, order).with_comparator(comparator));
        self
    }

    pub fn elements(&self) -> &[SortElement] {
        &self.elements
    }

    pub fn len(&self) -> usize {
        self.elements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    pub fn sort_element_by_field_name(&self, name: &str) -> Option<&SortElement> {
        self.elements.iter().find(|element| element.field == name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.sort_element_by_field_name(name).is_some()
    }

    pub(crate) fn check_unique(&self, scope: &str) -> Result<()> {
        let mut seen = HashSet::with_capacity(self.elements.len());
        for element in &self.elements {
            if !seen.insert(element.field.as_str()) {
                return Err(Error::DuplicateSortField {
                    field: element.field.clone(),
                    scope: scope.to_string(),
                });
            }
        }
        Ok(())
    }
}

impl FromIterator<SortElement> for SortCriteria {
    fn from_iter<T: IntoIterator<Item = SortElement>>(iter: T) -> Self {
        Self {
            elements: iter.into_iter().collect(),
        }
    }
}

impl Display for SortCriteria {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.elements.iter().format(", "))
    }
}

/// Common criteria plus the criteria particular to each source, keyed by source name.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Sorting {
    common: SortCriteria,
    #[serde(default)]
    particular: BTreeMap<String, SortCriteria>,
}

impl Sorting {
    pub fn new(common: SortCriteria) -> Self {
        Self {
            common,
            particular: BTreeMap::new(),
        }
    }

    pub fn common(&self) -> &SortCriteria {
        &self.common
    }

    pub fn particular(&self, source: &str) -> Option<&SortCriteria> {
        self.particular.get(source)
    }

    pub fn particular_criteria(&self) -> impl Iterator<Item = (&str, &SortCriteria)> {
        self.particular
            .iter()
            .map(|(source, criteria)| (source.as_str(), criteria))
    }

    pub(crate) fn set_common(&mut self, common: SortCriteria) {
        self.common = common;
    }

    pub(crate) fn set_particular(&mut self, source: String, criteria: SortCriteria) {
        self.particular.insert(source, criteria);
    }
}

/// Named custom comparators available to a configuration.
///
/// Configurations only carry comparator names; they are resolved against the
/// registry once, when the configuration is built or loaded on a worker.
#[derive(Debug, Clone, Default)]
pub struct ComparatorRegistry {
    comparators: HashMap<String, Arc<dyn FieldComparator>>,
}

impl ComparatorRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(
        &mut self,
        name: impl Into<String>,
        comparator: impl FieldComparator + 'static,
    ) -> &mut Self {
        self.comparators.insert(name.into(), Arc::new(comparator));
        self
    }

    pub fn resolve(&self, name: &str) -> Result<Arc<dyn FieldComparator>> {
        self.comparators
            .get(name)
            .cloned()
            .ok_or_else(|| Error::UnknownComparator(name.to_string()))
    }
}
