// Copyright © 2026 Pathway

use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use log::debug;
use smallvec::SmallVec;

use super::error::{Error, Result};
use super::schema::{Schema, SchemaId};

type Positions = SmallVec<[usize; 8]>;

/// Where each field of the unified view lives in one source's native record.
///
/// The unified view of a source is its common part followed by its
/// particular part. `common()[i]` is the native position of the `i`-th common
/// field and `particular()[j]` the native position of the `j`-th particular
/// field. The mapping is a pure function of the schemas involved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PositionMapping {
    common: Positions,
    particular: Positions,
}

impl PositionMapping {
    pub fn common(&self) -> &[usize] {
        &self.common
    }

    pub fn particular(&self) -> &[usize] {
        &self.particular
    }

    /// Number of fields of the unified view.
    pub fn len(&self) -> usize {
        self.common.len() + self.particular.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Native position of a common field, `None` if `unified` is not a common field.
    pub fn common_translation(&self, unified: usize) -> Option<usize> {
        self.common.get(unified).copied()
    }

    /// Native position of a particular field, `None` if `unified` is not a particular field.
    pub fn particular_translation(&self, unified: usize) -> Option<usize> {
        unified
            .checked_sub(self.common.len())
            .and_then(|index| self.particular.get(index).copied())
    }

    pub fn native_position(&self, unified: usize) -> Option<usize> {
        self.common_translation(unified)
            .or_else(|| self.particular_translation(unified))
    }
}

/// Computes how the unified view `(common, particular)` maps onto `source`.
///
/// Every common field must exist in the source with the same type, every
/// particular field must exist in the source, and every source field must be
/// covered exactly once.
pub fn compute_translation(
    common: &Schema,
    particular: &Schema,
    source: &Schema,
) -> Result<PositionMapping> {
    let mut covered = vec![false; source.len()];
    let mut translate = |unified: &Schema| -> Result<Positions> {
        unified
            .fields()
            .iter()
            .map(|field| {
                let native = source.require(field.name())?;
                let native_type = source.fields()[native].type_();
                if native_type != field.type_() {
                    return Err(Error::FieldTypeMismatch {
                        field: field.name().to_string(),
                        schema: source.name().to_string(),
                        expected: field.type_().to_string(),
                        actual: native_type.to_string(),
                    });
                }
                if std::mem::replace(&mut covered[native], true) {
                    return Err(Error::InvalidConfig(format!(
                        "field {:?} of schema {:?} is both common and particular",
                        field.name(),
                        source.name()
                    )));
                }
                Ok(native)
            })
            .collect()
    };
    let common_positions = translate(common)?;
    let particular_positions = translate(particular)?;
    if let Some(missing) = covered.iter().position(|covered| !covered) {
        return Err(Error::InvalidConfig(format!(
            "field {:?} of schema {:?} is neither common nor particular",
            source.fields()[missing].name(),
            source.name()
        )));
    }
    Ok(PositionMapping {
        common: common_positions,
        particular: particular_positions,
    })
}

type CacheKey = (SchemaId, SchemaId, SchemaId);

/// Process-wide memo of [`compute_translation`], keyed by schema identities.
#[derive(Debug, Default)]
pub struct TranslationCache {
    mappings: Mutex<HashMap<CacheKey, Arc<PositionMapping>>>,
    computations: AtomicUsize,
}

impl TranslationCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get_or_compute(
        &self,
        common: &Schema,
        particular: &Schema,
        source: &Schema,
    ) -> Result<Arc<PositionMapping>> {
        let key = (common.id(), particular.id(), source.id());
        let mut mappings = self
            .mappings
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        match mappings.entry(key) {
            Entry::Occupied(entry) => Ok(entry.get().clone()),
            Entry::Vacant(entry) => {
                debug!(
                    "computing translation of {} for unified view ({}, {})",
                    source.name(),
                    common.name(),
                    particular.name()
                );
                let mapping = Arc::new(compute_translation(common, particular, source)?);
                self.computations.fetch_add(1, Ordering::Relaxed);
                Ok(entry.insert(mapping).clone())
            }
        }
    }

    /// How many mappings were actually computed rather than served from the cache.
    pub fn computations(&self) -> usize {
        self.computations.load(Ordering::Relaxed)
    }

    pub fn len(&self) -> usize {
        self.mappings
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
