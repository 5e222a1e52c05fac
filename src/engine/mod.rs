// too sensitive for `Arc<dyn Fn(...)>`
#![allow(clippy::type_complexity)]

pub mod error;
pub use self::error::{DynError, DynResult, Error, Result};

pub mod value;
pub use self::value::{HashInto, SimpleType, Value};

pub mod schema;
pub use self::schema::{Field, FieldType, Schema, SchemaId};

pub mod tuple;
pub use self::tuple::Tuple;

pub mod sorting;
pub use self::sorting::{
    ComparatorRegistry, FieldComparator, Order, SortCriteria, SortElement, Sorting,
};

pub mod translation;
pub use self::translation::{compute_translation, PositionMapping, TranslationCache};

pub mod layout;
pub use self::layout::{Layout, LayoutField, SourceId, SourceLayout};

pub mod config;
pub use self::config::{CoGroupConfig, CoGroupConfigBuilder};

pub mod serialization;
pub use self::serialization::{
    decode_field, deserialize_tuple, encode_field, serialize_tuple, TupleDeserializer,
    TupleSerializer,
};

pub mod comparator;
pub use self::comparator::{GroupComparator, SortComparator};

pub mod partitioner;
pub use self::partitioner::TuplePartitioner;

pub mod rollup;
pub use self::rollup::{GroupValues, RollupHandler, RollupReducer, RollupState};

pub mod registry;
pub use self::registry::{BoxedHandler, HandlerFactory, HandlerRegistry};

pub mod worker;
pub use self::worker::{Worker, WorkerConfig};
