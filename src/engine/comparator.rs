// Copyright © 2026 Pathway

#![allow(clippy::module_name_repetitions)]

use std::cmp::Ordering;

use super::config::CoGroupConfig;
use super::error::{Error, Result};
use super::layout::{LayoutField, SourceLayout};
use super::serialization::{compare_natural, read_prefixed, read_source};
use super::sorting::Order;
use super::tuple::Tuple;
use super::value::Value;

/// Per-comparison scratch: the running offset into each operand.
#[derive(Debug, Default, Clone, Copy)]
struct CompareState {
    offset1: usize,
    offset2: usize,
}

impl CompareState {
    fn reset(&mut self) {
        *self = Self::default();
    }
}

fn field_order(field: &LayoutField) -> Order {
    field.order().unwrap_or(Order::Asc)
}

/// Walks `fields` over both buffers from the current offsets, stopping at the first difference.
fn compare_encoded(
    fields: &[LayoutField],
    schema: &str,
    buf1: &[u8],
    buf2: &[u8],
    state: &mut CompareState,
) -> Result<Ordering> {
    for field in fields {
        let ordering = if let Some(comparator) = field.comparator() {
            let a = read_prefixed(buf1, &mut state.offset1).map_err(|f| f.in_schema(schema))?;
            let b = read_prefixed(buf2, &mut state.offset2).map_err(|f| f.in_schema(schema))?;
            comparator.compare_bytes(a, b).map_err(Error::Comparator)?
        } else {
            compare_natural(
                field.type_(),
                buf1,
                &mut state.offset1,
                buf2,
                &mut state.offset2,
            )
            .map_err(|f| f.in_schema(schema))?
        };
        let ordering = field_order(field).apply(ordering);
        if ordering.is_ne() {
            return Ok(ordering);
        }
    }
    Ok(Ordering::Equal)
}

fn compare_decoded(field: &LayoutField, a: &Value, b: &Value) -> Ordering {
    let ordering = match field.comparator() {
        Some(comparator) => comparator.compare_values(a, b),
        None => a.cmp(b),
    };
    field_order(field).apply(ordering)
}

/// Compares the first `fields.len()` common fields of two native tuples.
fn compare_common_objects(
    fields: &[LayoutField],
    source1: &SourceLayout,
    t1: &Tuple,
    source2: &SourceLayout,
    t2: &Tuple,
) -> Result<Ordering> {
    let natives = source1.mapping().common().iter().zip(source2.mapping().common());
    for (field, (&native1, &native2)) in fields.iter().zip(natives) {
        let ordering = compare_decoded(field, t1.get(native1)?, t2.get(native2)?);
        if ordering.is_ne() {
            return Ok(ordering);
        }
    }
    Ok(Ordering::Equal)
}

/// Total order over serialized records, used by the shuffle to sort a partition.
///
/// Common sort fields are compared first. Records that tie on all of them are
/// ordered by source id, and records of the same source by that source's
/// particular sort fields. Each worker thread owns its own instance.
#[derive(Debug, Clone)]
pub struct SortComparator {
    config: CoGroupConfig,
    state: CompareState,
}

impl SortComparator {
    pub fn new(config: &CoGroupConfig) -> Self {
        Self {
            config: config.clone(),
            state: CompareState::default(),
        }
    }

    pub fn compare(&mut self, buf1: &[u8], buf2: &[u8]) -> Result<Ordering> {
        self.state.reset();
        let layout = self.config.layout();
        let ordering = compare_encoded(
            layout.common_fields(),
            layout.common_schema().name(),
            buf1,
            buf2,
            &mut self.state,
        )?;
        if ordering.is_ne() || !layout.is_multi_source() {
            return Ok(ordering);
        }

        let source1 = read_source(layout.sources(), buf1, &mut self.state.offset1, true)?;
        let source2 = read_source(layout.sources(), buf2, &mut self.state.offset2, true)?;
        if source1.id() != source2.id() {
            return Ok(source1.id().cmp(&source2.id()));
        }
        compare_encoded(
            source1.particular_sort_fields(),
            source1.schema().name(),
            buf1,
            buf2,
            &mut self.state,
        )
    }

    /// The same order as [`Self::compare`], over native tuples.
    pub fn compare_objects(&self, t1: &Tuple, t2: &Tuple) -> Result<Ordering> {
        let layout = self.config.layout();
        let source1 = layout.source_for(t1.schema())?;
        let source2 = layout.source_for(t2.schema())?;
        let ordering = compare_common_objects(layout.common_fields(), source1, t1, source2, t2)?;
        if ordering.is_ne() || !layout.is_multi_source() {
            return Ok(ordering);
        }
        if source1.id() != source2.id() {
            return Ok(source1.id().cmp(&source2.id()));
        }

        let mapping = source1.mapping();
        for (field, &native) in source1
            .particular_sort_fields()
            .iter()
            .zip(mapping.particular())
        {
            let ordering = compare_decoded(field, t1.get(native)?, t2.get(native)?);
            if ordering.is_ne() {
                return Ok(ordering);
            }
        }
        Ok(Ordering::Equal)
    }
}

/// Delimits groups: compares only a prefix of the group-by fields.
///
/// Never looks at source ids or particular fields, so records of every source
/// sharing the group fields compare equal.
#[derive(Debug, Clone)]
pub struct GroupComparator {
    config: CoGroupConfig,
    depth: usize,
    state: CompareState,
}

impl GroupComparator {
    /// Groups by all the group-by fields.
    pub fn new(config: &CoGroupConfig) -> Self {
        Self {
            config: config.clone(),
            depth: config.group_by().len(),
            state: CompareState::default(),
        }
    }

    /// Groups by the first `depth` group-by fields.
    pub fn with_depth(config: &CoGroupConfig, depth: usize) -> Result<Self> {
        if depth == 0 || depth > config.group_by().len() {
            return Err(Error::InvalidConfig(format!(
                "group depth {depth} outside of 1..={}",
                config.group_by().len()
            )));
        }
        Ok(Self {
            depth,
            ..Self::new(config)
        })
    }

    pub fn depth(&self) -> usize {
        self.depth
    }

    fn group_fields(&self) -> &[LayoutField] {
        &self.config.layout().common_fields()[..self.depth]
    }

    pub fn compare(&mut self, buf1: &[u8], buf2: &[u8]) -> Result<Ordering> {
        self.state.reset();
        let layout = self.config.layout();
        compare_encoded(
            &layout.common_fields()[..self.depth],
            layout.common_schema().name(),
            buf1,
            buf2,
            &mut self.state,
        )
    }

    pub fn compare_objects(&self, t1: &Tuple, t2: &Tuple) -> Result<Ordering> {
        let layout = self.config.layout();
        let source1 = layout.source_for(t1.schema())?;
        let source2 = layout.source_for(t2.schema())?;
        compare_common_objects(self.group_fields(), source1, t1, source2, t2)
    }
}
