//! congresso-warehouse: the transformation layer of the Congress
//! transparency warehouse.
//!
//! Raw extracts (one file per source) are cast by the [`staging`] adapters,
//! folded into dimensions and facts by [`models`], and materialized through
//! the `warehouse-core` merge engine in dependency order by [`pipeline`].
//! Amendment authorship is linked to legislators by [`entity_resolution`].

pub mod config;
pub mod entity_resolution;
pub mod error;
pub mod models;
pub mod pipeline;
pub mod raw;
pub mod staging;
pub mod telemetry;

pub use config::WarehouseConfig;
pub use error::{PipelineError, Result};
pub use pipeline::{Pipeline, RunOptions, RunReport, StepOutcome};
