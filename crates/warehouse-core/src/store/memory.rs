//! In-memory warehouse, used by tests and dry runs.

use std::collections::{BTreeMap, HashMap};

use async_trait::async_trait;
use tokio::sync::RwLock;

use super::{MergeStats, SchemaChange, Warehouse};
use crate::error::{Result, WarehouseError};
use crate::relation::{Relation, Schema, Value};

#[derive(Debug, Default)]
pub struct MemoryWarehouse {
    tables: RwLock<BTreeMap<String, Relation>>,
}

impl MemoryWarehouse {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a table directly, bypassing the pipeline.
    pub async fn insert_table(&self, relation: Relation) {
        let name = relation.name().to_string();
        self.tables.write().await.insert(name, relation);
    }
}

#[async_trait]
impl Warehouse for MemoryWarehouse {
    async fn table_schema(&self, table: &str) -> Result<Option<Schema>> {
        Ok(self
            .tables
            .read()
            .await
            .get(table)
            .map(|r| r.schema().clone()))
    }

    async fn read_table(&self, table: &str) -> Result<Relation> {
        self.tables
            .read()
            .await
            .get(table)
            .cloned()
            .ok_or_else(|| WarehouseError::TableNotFound(table.to_string()))
    }

    async fn max_value(&self, table: &str, column: &str) -> Result<Value> {
        let tables = self.tables.read().await;
        let rel = tables
            .get(table)
            .ok_or_else(|| WarehouseError::TableNotFound(table.to_string()))?;
        rel.max_of(column)
    }

    async fn replace_table(&self, table: &str, relation: &Relation) -> Result<()> {
        let stored = relation.clone().renamed(table);
        self.tables.write().await.insert(table.to_string(), stored);
        Ok(())
    }

    async fn apply_schema_changes(&self, table: &str, changes: &[SchemaChange]) -> Result<()> {
        let mut tables = self.tables.write().await;
        let rel = tables
            .get_mut(table)
            .ok_or_else(|| WarehouseError::TableNotFound(table.to_string()))?;

        // Work on a copy so a failing change leaves the table untouched.
        let mut next = rel.clone();
        for change in changes {
            apply_change(&mut next, change)?;
        }
        *rel = next;
        Ok(())
    }

    async fn merge_rows(
        &self,
        table: &str,
        unique_key: &[String],
        relation: &Relation,
    ) -> Result<MergeStats> {
        let mut tables = self.tables.write().await;
        let target = tables
            .get_mut(table)
            .ok_or_else(|| WarehouseError::TableNotFound(table.to_string()))?;

        if target.schema() != relation.schema() {
            return Err(WarehouseError::SchemaChangeRejected {
                table: table.to_string(),
                reason: "merge relation does not match target schema".to_string(),
            });
        }

        let key_idx = target.key_indexes(unique_key)?;
        let mut positions: HashMap<Vec<Value>, usize> = target
            .rows()
            .iter()
            .enumerate()
            .map(|(pos, row)| (key_idx.iter().map(|&i| row[i].clone()).collect(), pos))
            .collect();

        let mut stats = MergeStats::default();
        let rows = target.rows_mut();
        for row in relation.rows() {
            let key: Vec<Value> = key_idx.iter().map(|&i| row[i].clone()).collect();
            match positions.get(&key) {
                Some(&pos) => {
                    rows[pos] = row.clone();
                    stats.updated += 1;
                }
                None => {
                    positions.insert(key, rows.len());
                    rows.push(row.clone());
                    stats.inserted += 1;
                }
            }
        }
        stats.total = rows.len();
        Ok(stats)
    }

    async fn list_tables(&self) -> Result<Vec<String>> {
        Ok(self.tables.read().await.keys().cloned().collect())
    }
}

fn apply_change(rel: &mut Relation, change: &SchemaChange) -> Result<()> {
    let table = rel.name().to_string();
    match change {
        SchemaChange::AddColumn(column) => {
            if rel.schema().contains(&column.name) {
                return Err(WarehouseError::DuplicateColumn {
                    table,
                    column: column.name.clone(),
                });
            }
            rel.schema_mut().push(column.clone());
            for row in rel.rows_mut() {
                row.push(Value::Null);
            }
        }
        SchemaChange::DropColumn(name) => {
            let idx = rel
                .schema_mut()
                .remove(name)
                .ok_or_else(|| WarehouseError::ColumnNotFound {
                    table,
                    column: name.clone(),
                })?;
            for row in rel.rows_mut() {
                row.remove(idx);
            }
        }
        SchemaChange::AlterType { column, from, to } => {
            if !from.can_widen_to(*to) {
                return Err(WarehouseError::IncompatibleTypeChange {
                    table,
                    column: column.clone(),
                    from: *from,
                    to: *to,
                });
            }
            let idx = rel
                .schema_mut()
                .set_type(column, *to)
                .ok_or_else(|| WarehouseError::ColumnNotFound {
                    table,
                    column: column.clone(),
                })?;
            for row in rel.rows_mut() {
                row[idx] = row[idx].widen_to(*to).unwrap_or(Value::Null);
            }
        }
    }
    Ok(())
}
