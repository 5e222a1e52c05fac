// Copyright © 2026 Pathway

use std::any::Any;
use std::error;
use std::io;
use std::result;

use super::value::Value;
use crate::env::Error as EnvError;

#[allow(clippy::module_name_repetitions)]
pub type DynError = Box<dyn error::Error + Send + Sync>;
pub type DynResult<T> = result::Result<T, DynError>;

#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum Error {
    #[error("no source schemas registered")]
    NoSchemas,

    #[error("schema {0:?} registered more than once")]
    DuplicateSchema(String),

    #[error("field {field:?} not present in schema {schema:?}")]
    UnknownField { field: String, schema: String },

    #[error("field {field:?} has type {actual} in schema {schema:?}, expected {expected}")]
    FieldTypeMismatch {
        field: String,
        schema: String,
        expected: String,
        actual: String,
    },

    #[error("group-by fields are not set")]
    MissingGroupByFields,

    #[error("group-by field {field:?} is not declared at position {position} of the common sort criteria")]
    GroupByNotSorted { field: String, position: usize },

    #[error("field {field:?} appears more than once in the sort criteria of {scope}")]
    DuplicateSortField { field: String, scope: String },

    #[error("unknown source {0:?}")]
    UnknownSource(String),

    #[error("no comparator registered under name {0:?}")]
    UnknownComparator(String),

    #[error("no handler registered under name {0:?}")]
    UnknownHandler(String),

    #[error("rollup field {0:?} is not a group-by field")]
    RollupFieldNotGrouped(String),

    #[error("partition field {0:?} is not a group-by field")]
    PartitionFieldNotGrouped(String),

    #[error("rollup and custom partition fields can't be used together")]
    RollupWithCustomPartition,

    #[error("particular sort criteria for {0:?} declared, but only one source is registered")]
    ParticularCriteriaWithSingleSource(String),

    #[error("field {field:?} of schema {schema:?} is common and can't be sorted as particular")]
    ParticularFieldIsCommon { field: String, schema: String },

    #[error("can't run with no partitions")]
    NeedsPartitions,

    #[error("invalid worker id {worker_id} for {partitions} partition(s)")]
    InvalidWorkerId { worker_id: usize, partitions: usize },

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("decoding {schema:?} failed at byte offset {offset}: {reason}")]
    Decode {
        schema: String,
        offset: usize,
        reason: &'static str,
    },

    #[error("unknown source id {source_id} at byte offset {offset}")]
    UnknownSourceId { source_id: u64, offset: usize },

    #[error("type mismatch: expected {expected}, got {value:?}")]
    TypeMismatch {
        expected: &'static str,
        value: Value,
    },

    #[error("value {value} is not valid for field {field:?} of type {type_}")]
    InvalidFieldValue {
        field: String,
        type_: String,
        value: Value,
    },

    #[error("tuple of schema {actual:?} used where schema {expected:?} is required")]
    SchemaMismatch { expected: String, actual: String },

    #[error("index out of bounds")]
    IndexOutOfBounds,

    #[error("consecutive group keys are equal on every group field")]
    NoDivergence,

    #[error("custom comparator failed: {0}")]
    Comparator(#[source] DynError),

    #[error("partition already finished")]
    PartitionFinished,

    #[error("handler failed: {0}")]
    Handler(#[source] DynError),

    #[error("handler panicked: {0}")]
    HandlerPanic(String),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Bincode(#[from] bincode::Error),

    #[error(transparent)]
    Io(#[from] io::Error),

    #[error(transparent)]
    Env(#[from] EnvError),
}

impl Error {
    pub fn from_panic_payload(panic_payload: Box<dyn Any + Send + 'static>) -> Self {
        let message = match panic_payload.downcast::<&'static str>() {
            Ok(message) => message.to_string(),
            Err(panic_payload) => match panic_payload.downcast::<String>() {
                Ok(message) => *message,
                Err(panic_payload) => format!("{panic_payload:?}"),
            },
        };
        Self::HandlerPanic(message)
    }

    pub fn unknown_field(field: impl Into<String>, schema: impl Into<String>) -> Self {
        Self::UnknownField {
            field: field.into(),
            schema: schema.into(),
        }
    }

    pub fn is_configuration_error(&self) -> bool {
        matches!(
            self,
            Self::NoSchemas
                | Self::DuplicateSchema(_)
                | Self::UnknownField { .. }
                | Self::FieldTypeMismatch { .. }
                | Self::MissingGroupByFields
                | Self::GroupByNotSorted { .. }
                | Self::DuplicateSortField { .. }
                | Self::UnknownSource(_)
                | Self::UnknownComparator(_)
                | Self::UnknownHandler(_)
                | Self::RollupFieldNotGrouped(_)
                | Self::PartitionFieldNotGrouped(_)
                | Self::RollupWithCustomPartition
                | Self::ParticularCriteriaWithSingleSource(_)
                | Self::ParticularFieldIsCommon { .. }
                | Self::NeedsPartitions
                | Self::InvalidWorkerId { .. }
                | Self::InvalidConfig(_)
        )
    }
}

impl From<DynError> for Error {
    fn from(value: DynError) -> Self {
        match value.downcast::<Self>() {
            Ok(this) => *this,
            Err(other) => Self::Handler(other),
        }
    }
}

pub type Result<T, E = Error> = result::Result<T, E>;
