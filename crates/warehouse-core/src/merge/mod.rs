//! Incremental merge engine.
//!
//! One algorithm for every table, parameterized by its
//! [`Materialization`](crate::materialization::Materialization) record:
//!
//! ```text
//!   plan:    table missing or full refresh ──► FullBuild
//!            otherwise                     ──► Incremental { column <op> max(column) | sentinel }
//!   execute: FullBuild   ──► key check ──► replace_table (atomic swap)
//!            Incremental ──► filter by watermark ──► key check
//!                        ──► reconcile schema ──► conform ──► merge_rows
//! ```
//!
//! The new relation is fully built before anything is written, so a failing
//! build leaves the previous table in place. The watermark read and the merge
//! form one logical transaction per table; concurrent runs against the same
//! table are not supported and must be serialized by the caller.

mod engine;
pub mod reconcile;
pub mod watermark;

pub use engine::{LoadOutcome, LoadPlan, MergeEngine};
pub use reconcile::plan_schema_changes;
pub use watermark::{Comparator, WatermarkClass, WatermarkPredicate};
