// Copyright © 2026 Pathway

use xxhash_rust::xxh3::Xxh3 as Hasher;

use super::config::CoGroupConfig;
use super::error::{Error, Result};
use super::tuple::Tuple;
use super::value::HashInto;

/// Assigns records to reduce partitions by hashing their partition fields.
///
/// Partition fields are always common, so records of every source with the
/// same partition fields land on the same worker.
#[derive(Debug, Clone)]
pub struct TuplePartitioner {
    config: CoGroupConfig,
    common_positions: Vec<usize>,
}

impl TuplePartitioner {
    pub fn new(config: &CoGroupConfig) -> Result<Self> {
        let common = config.layout().common_schema();
        let common_positions = config
            .partition_fields()
            .iter()
            .map(|field| common.require(field))
            .collect::<Result<_>>()?;
        Ok(Self {
            config: config.clone(),
            common_positions,
        })
    }

    pub fn hash(&self, tuple: &Tuple) -> Result<u64> {
        let source = self.config.layout().source_for(tuple.schema())?;
        let mapping = source.mapping();
        let mut hasher = Hasher::default();
        for &position in &self.common_positions {
            let native = mapping
                .common_translation(position)
                .ok_or(Error::IndexOutOfBounds)?;
            tuple.get(native)?.hash_into(&mut hasher);
        }
        Ok(hasher.digest())
    }

    pub fn partition(&self, tuple: &Tuple, num_partitions: usize) -> Result<usize> {
        if num_partitions == 0 {
            return Err(Error::InvalidConfig(
                "number of partitions must be positive".to_string(),
            ));
        }
        let hash = self.hash(tuple)?;
        #[allow(clippy::cast_possible_truncation)]
        Ok((hash % num_partitions as u64) as usize)
    }
}
