// Copyright © 2026 Pathway

#![allow(clippy::module_name_repetitions)]

use std::collections::HashSet;
use std::fs;
use std::path::Path;
use std::sync::Arc;

use itertools::Itertools as _;
use log::{info, warn};
use serde::{Deserialize, Serialize};

use super::error::{Error, Result};
use super::layout::Layout;
use super::schema::Schema;
use super::sorting::{ComparatorRegistry, SortCriteria, Sorting};
use super::translation::TranslationCache;

/// The persisted form of a configuration, as it travels to every worker.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
struct ConfigDef {
    sources: Vec<Schema>,
    group_by: Vec<String>,
    sorting: Sorting,
    #[serde(default)]
    rollup_from: Option<String>,
    #[serde(default)]
    partition_by: Option<Vec<String>>,
    #[serde(default)]
    handler: Option<String>,
}

/// Assembles a [`CoGroupConfig`] at job configuration time.
#[derive(Debug, Clone, Default)]
#[must_use]
pub struct CoGroupConfigBuilder {
    def: ConfigDef,
}

impl CoGroupConfigBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a source. Sources are numbered in registration order.
    pub fn add_source(mut self, schema: Schema) -> Self {
        self.def.sources.push(schema);
        self
    }

    pub fn group_by<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.def.group_by = fields.into_iter().map(Into::into).collect();
        self
    }

    /// Sort criteria over the common fields; the group-by fields must be its prefix.
    pub fn order_by(mut self, criteria: SortCriteria) -> Self {
        self.def.sorting.set_common(criteria);
        self
    }

    /// Criteria applied after the common ones when both records come from `source`.
    pub fn particular_order_by(mut self, source: impl Into<String>, criteria: SortCriteria) -> Self {
        self.def.sorting.set_particular(source.into(), criteria);
        self
    }

    /// Opens nested groups for every group-by field from `field` onwards.
    pub fn rollup_from(mut self, field: impl Into<String>) -> Self {
        self.def.rollup_from = Some(field.into());
        self
    }

    pub fn partition_by<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.def.partition_by = Some(fields.into_iter().map(Into::into).collect());
        self
    }

    /// Name of the processing-stage handler, resolved by each worker.
    pub fn handler(mut self, name: impl Into<String>) -> Self {
        self.def.handler = Some(name.into());
        self
    }

    pub fn build(self, registry: &ComparatorRegistry) -> Result<CoGroupConfig> {
        self.build_with_cache(registry, &TranslationCache::new())
    }

    pub fn build_with_cache(
        self,
        registry: &ComparatorRegistry,
        cache: &TranslationCache,
    ) -> Result<CoGroupConfig> {
        CoGroupConfig::validate(self.def, registry, cache)
    }
}

#[derive(Debug)]
struct Inner {
    def: ConfigDef,
    sources: Vec<Arc<Schema>>,
    layout: Layout,
    partition_fields: Vec<String>,
    min_depth: usize,
    max_depth: usize,
}

/// A validated, immutable co-grouping configuration.
///
/// Cloning is cheap; every comparator, serializer and reducer holds its own
/// clone instead of looking the configuration up globally.
#[derive(Debug, Clone)]
pub struct CoGroupConfig {
    inner: Arc<Inner>,
}

impl CoGroupConfig {
    pub fn builder() -> CoGroupConfigBuilder {
        CoGroupConfigBuilder::new()
    }

    fn validate(
        def: ConfigDef,
        registry: &ComparatorRegistry,
        cache: &TranslationCache,
    ) -> Result<Self> {
        if def.sources.is_empty() {
            return Err(Error::NoSchemas);
        }
        let mut names = HashSet::with_capacity(def.sources.len());
        for schema in &def.sources {
            if !names.insert(schema.name()) {
                return Err(Error::DuplicateSchema(schema.name().to_string()));
            }
        }

        if def.group_by.is_empty() {
            return Err(Error::MissingGroupByFields);
        }
        let common = def.sorting.common();
        common.check_unique("the common criteria")?;
        for (position, field) in def.group_by.iter().enumerate() {
            let declared = common.elements().get(position).map(|element| element.field());
            if declared != Some(field.as_str()) {
                return Err(Error::GroupByNotSorted {
                    field: field.clone(),
                    position,
                });
            }
        }

        for (source, criteria) in def.sorting.particular_criteria() {
            if !names.contains(source) {
                return Err(Error::UnknownSource(source.to_string()));
            }
            if def.sources.len() == 1 {
                return Err(Error::ParticularCriteriaWithSingleSource(source.to_string()));
            }
            criteria.check_unique(source)?;
        }

        let max_depth = def.group_by.len() - 1;
        let (min_depth, partition_fields) = match (&def.rollup_from, &def.partition_by) {
            (Some(_), Some(_)) => return Err(Error::RollupWithCustomPartition),
            (Some(rollup_from), None) => {
                let depth = def
                    .group_by
                    .iter()
                    .position(|field| field == rollup_from)
                    .ok_or_else(|| Error::RollupFieldNotGrouped(rollup_from.clone()))?;
                if depth == max_depth {
                    warn!("rollup from the last group-by field {rollup_from:?} is plain grouping");
                }
                (depth, def.group_by[..=depth].to_vec())
            }
            (None, Some(partition_by)) => {
                if partition_by.is_empty() {
                    return Err(Error::InvalidConfig(
                        "custom partition fields are empty".to_string(),
                    ));
                }
                if let Some(field) = partition_by
                    .iter()
                    .find(|field| !def.group_by.contains(field))
                {
                    return Err(Error::PartitionFieldNotGrouped(field.clone()));
                }
                (max_depth, partition_by.clone())
            }
            (None, None) => (max_depth, def.group_by.clone()),
        };

        let sources: Vec<_> = def.sources.iter().cloned().map(Arc::new).collect();
        let layout = Layout::build(&sources, &def.sorting, registry, cache)?;

        info!(
            "co-group configuration with {} source(s) [{}], grouped by [{}], sorted by [{}], depths {min_depth}..={max_depth}",
            sources.len(),
            sources.iter().map(|schema| schema.name()).format(", "),
            def.group_by.iter().format(", "),
            common,
        );

        Ok(Self {
            inner: Arc::new(Inner {
                def,
                sources,
                layout,
                partition_fields,
                min_depth,
                max_depth,
            }),
        })
    }

    pub fn sources(&self) -> &[Arc<Schema>] {
        &self.inner.sources
    }

    pub fn group_by(&self) -> &[String] {
        &self.inner.def.group_by
    }

    pub fn sorting(&self) -> &Sorting {
        &self.inner.def.sorting
    }

    pub fn rollup_from(&self) -> Option<&str> {
        self.inner.def.rollup_from.as_deref()
    }

    /// Fields hashed to choose a record's partition.
    pub fn partition_fields(&self) -> &[String] {
        &self.inner.partition_fields
    }

    pub fn handler(&self) -> Option<&str> {
        self.inner.def.handler.as_deref()
    }

    /// Index of the last partitioning group-by field.
    pub fn min_depth(&self) -> usize {
        self.inner.min_depth
    }

    /// Index of the last group-by field.
    pub fn max_depth(&self) -> usize {
        self.inner.max_depth
    }

    pub fn layout(&self) -> &Layout {
        &self.inner.layout
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(&self.inner.def)?)
    }

    pub fn from_json(json: &str, registry: &ComparatorRegistry) -> Result<Self> {
        let def: ConfigDef = serde_json::from_str(json)?;
        Self::validate(def, registry, &TranslationCache::new())
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        Ok(bincode::serialize(&self.inner.def)?)
    }

    pub fn from_bytes(bytes: &[u8], registry: &ComparatorRegistry) -> Result<Self> {
        let def: ConfigDef = bincode::deserialize(bytes)?;
        Self::validate(def, registry, &TranslationCache::new())
    }

    /// Reads a JSON configuration persisted with [`CoGroupConfig::to_json`].
    pub fn load(path: &Path, registry: &ComparatorRegistry) -> Result<Self> {
        let json = fs::read_to_string(path)?;
        let config = Self::from_json(&json, registry)?;
        info!("loaded co-group configuration from {}", path.display());
        Ok(config)
    }
}

impl PartialEq for CoGroupConfig {
    fn eq(&self, other: &Self) -> bool {
        self.inner.def == other.inner.def
    }
}

impl Eq for CoGroupConfig {}
