//! Store port.
//!
//! Every stage receives the warehouse as an explicit `&dyn Warehouse` handle;
//! nothing in the pipeline reaches for ambient global state. Adapters:
//! [`MemoryWarehouse`] here, `PgWarehouse` in `warehouse-postgres`.

mod memory;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::relation::{Column, ColumnType, Relation, Schema, Value};

pub use memory::MemoryWarehouse;

/// One column-level change applied to an existing table before a merge.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum SchemaChange {
    AddColumn(Column),
    DropColumn(String),
    AlterType {
        column: String,
        from: ColumnType,
        to: ColumnType,
    },
}

/// Row counts reported by a merge.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MergeStats {
    pub inserted: usize,
    pub updated: usize,
    /// Row count of the target after the merge.
    pub total: usize,
}

#[async_trait]
pub trait Warehouse: Send + Sync {
    /// Schema of an existing table, `None` if the table does not exist.
    async fn table_schema(&self, table: &str) -> Result<Option<Schema>>;

    /// Full contents of a table.
    async fn read_table(&self, table: &str) -> Result<Relation>;

    /// Largest non-null value of `column`, `Value::Null` for an empty table.
    async fn max_value(&self, table: &str, column: &str) -> Result<Value>;

    /// Atomically replace (or create) `table` with `relation`. Readers keep
    /// seeing the previous contents until the swap completes.
    async fn replace_table(&self, table: &str, relation: &Relation) -> Result<()>;

    async fn apply_schema_changes(&self, table: &str, changes: &[SchemaChange]) -> Result<()>;

    /// Upsert `relation` into `table` keyed by `unique_key`. Rows whose key
    /// already exists are overwritten in every column; the rest are
    /// inserted. `relation` must already match the table schema.
    async fn merge_rows(
        &self,
        table: &str,
        unique_key: &[String],
        relation: &Relation,
    ) -> Result<MergeStats>;

    async fn list_tables(&self) -> Result<Vec<String>>;

    async fn table_exists(&self, table: &str) -> Result<bool> {
        Ok(self.table_schema(table).await?.is_some())
    }
}
