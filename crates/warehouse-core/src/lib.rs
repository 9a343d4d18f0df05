//! warehouse-core: the storage-agnostic half of the congress warehouse.
//!
//! Pipeline stages build [`Relation`]s; the [`MergeEngine`] decides per
//! table whether to rebuild or merge and hands the result to a
//! [`Warehouse`] adapter. Rollups recompute grouped aggregates from fact
//! relations.

pub mod error;
pub mod materialization;
pub mod merge;
pub mod relation;
pub mod rollup;
pub mod store;

pub use error::{Result, WarehouseError};
pub use materialization::{
    IncrementalConfig, Materialization, OnSchemaChange, WatermarkConfig,
};
pub use merge::{
    Comparator, LoadOutcome, LoadPlan, MergeEngine, WatermarkClass, WatermarkPredicate,
};
pub use relation::{Column, ColumnType, Relation, Row, Schema, SortKey, Value};
pub use rollup::{Aggregate, GroupColumn, Rollup, NOT_INFORMED};
pub use store::{MergeStats, MemoryWarehouse, SchemaChange, Warehouse};
