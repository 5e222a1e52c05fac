// Copyright © 2026 Pathway

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::path::{Path, PathBuf};

use derivative::Derivative;
use log::info;

use super::comparator::{GroupComparator, SortComparator};
use super::config::CoGroupConfig;
use super::error::{Error, Result};
use super::partitioner::TuplePartitioner;
use super::registry::{BoxedHandler, HandlerFactory, HandlerRegistry};
use super::rollup::RollupReducer;
use super::serialization::{TupleDeserializer, TupleSerializer};
use super::sorting::ComparatorRegistry;
use super::tuple::Tuple;
use crate::env::{parse_env_var_or, parse_env_var_required};

/// Per-process settings of a reduce worker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkerConfig {
    config_path: PathBuf,
    partitions: usize,
    worker_id: usize,
}

impl WorkerConfig {
    pub fn new(config_path: impl Into<PathBuf>, partitions: usize, worker_id: usize) -> Result<Self> {
        if partitions == 0 {
            return Err(Error::NeedsPartitions);
        }
        if worker_id >= partitions {
            return Err(Error::InvalidWorkerId {
                worker_id,
                partitions,
            });
        }
        Ok(Self {
            config_path: config_path.into(),
            partitions,
            worker_id,
        })
    }

    pub fn from_env() -> Result<Self> {
        let config_path: PathBuf = parse_env_var_required("COGROUP_CONFIG")?;
        let partitions = parse_env_var_or("COGROUP_PARTITIONS", 1)?;
        let worker_id = parse_env_var_or("COGROUP_WORKER_ID", 0)?;
        Self::new(config_path, partitions, worker_id)
    }

    pub fn config_path(&self) -> &Path {
        &self.config_path
    }

    pub fn partitions(&self) -> usize {
        self.partitions
    }

    pub fn worker_id(&self) -> usize {
        self.worker_id
    }
}

/// One reduce worker: the configuration loaded once at startup and the
/// factories for the per-thread instances working on it.
#[derive(Derivative)]
#[derivative(Debug)]
pub struct Worker {
    settings: WorkerConfig,
    config: CoGroupConfig,
    partitioner: TuplePartitioner,
    handler_name: String,
    #[derivative(Debug = "ignore")]
    handler_factory: HandlerFactory,
}

impl Worker {
    pub fn new(
        settings: WorkerConfig,
        config: CoGroupConfig,
        handlers: &HandlerRegistry,
    ) -> Result<Self> {
        let handler_name = config
            .handler()
            .ok_or_else(|| Error::InvalidConfig("no handler declared".to_string()))?
            .to_string();
        let handler_factory = handlers.resolve(&handler_name)?;
        let partitioner = TuplePartitioner::new(&config)?;
        info!(
            "worker {} of {} ready, handler {handler_name:?}",
            settings.worker_id(),
            settings.partitions()
        );
        Ok(Self {
            settings,
            config,
            partitioner,
            handler_name,
            handler_factory,
        })
    }

    /// Loads the persisted configuration named by `COGROUP_CONFIG`.
    pub fn from_env(comparators: &ComparatorRegistry, handlers: &HandlerRegistry) -> Result<Self> {
        let settings = WorkerConfig::from_env()?;
        let config = CoGroupConfig::load(settings.config_path(), comparators)?;
        Self::new(settings, config, handlers)
    }

    pub fn settings(&self) -> &WorkerConfig {
        &self.settings
    }

    pub fn config(&self) -> &CoGroupConfig {
        &self.config
    }

    pub fn handler_name(&self) -> &str {
        &self.handler_name
    }

    pub fn sort_comparator(&self) -> SortComparator {
        SortComparator::new(&self.config)
    }

    pub fn group_comparator(&self) -> GroupComparator {
        GroupComparator::new(&self.config)
    }

    pub fn serializer(&self) -> TupleSerializer {
        TupleSerializer::new(&self.config)
    }

    pub fn deserializer(&self) -> TupleDeserializer {
        TupleDeserializer::new(&self.config)
    }

    pub fn partition_of(&self, tuple: &Tuple) -> Result<usize> {
        self.partitioner.partition(tuple, self.settings.partitions())
    }

    /// Whether `tuple` is reduced by this worker.
    pub fn owns(&self, tuple: &Tuple) -> Result<bool> {
        Ok(self.partition_of(tuple)? == self.settings.worker_id())
    }

    pub fn reducer(&self) -> Result<RollupReducer<BoxedHandler>> {
        let handler = (self.handler_factory)(&self.config)?;
        Ok(RollupReducer::new(&self.config, handler))
    }

    /// Reduces one sorted, grouped partition with a fresh handler and returns
    /// the handler once every group is closed. A panicking handler fails the
    /// partition instead of unwinding into the caller.
    pub fn process_partition<'v, G, V>(&self, groups: G) -> Result<BoxedHandler>
    where
        G: IntoIterator<Item = (&'v [u8], V)>,
        V: IntoIterator<Item = &'v [u8]>,
    {
        let mut reducer = self.reducer()?;
        catch_unwind(AssertUnwindSafe(|| reducer.run(groups)))
            .unwrap_or_else(|payload| Err(Error::from_panic_payload(payload)))?;
        Ok(reducer.into_handler())
    }
}
