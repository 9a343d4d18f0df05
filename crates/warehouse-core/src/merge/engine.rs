use tracing::{debug, info};

use super::reconcile::plan_schema_changes;
use super::watermark::WatermarkPredicate;
use crate::error::{Result, WarehouseError};
use crate::materialization::Materialization;
use crate::relation::{Relation, Value};
use crate::store::{MergeStats, SchemaChange, Warehouse};

/// Decision taken before building a table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadPlan {
    FullBuild,
    Incremental(WatermarkPredicate),
}

/// What a load did to the target table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadOutcome {
    Rebuilt {
        rows: usize,
    },
    Merged {
        predicate: WatermarkPredicate,
        candidates: usize,
        schema_changes: Vec<SchemaChange>,
        stats: MergeStats,
    },
}

pub struct MergeEngine<'a> {
    warehouse: &'a dyn Warehouse,
}

impl<'a> MergeEngine<'a> {
    pub fn new(warehouse: &'a dyn Warehouse) -> Self {
        Self { warehouse }
    }

    /// Choose between a full build and a watermark-bounded merge.
    pub async fn plan(
        &self,
        table: &str,
        config: &Materialization,
        full_refresh: bool,
    ) -> Result<LoadPlan> {
        config.validate(table)?;

        let Materialization::Incremental(cfg) = config else {
            return Ok(LoadPlan::FullBuild);
        };
        if full_refresh {
            debug!(table, "full refresh requested");
            return Ok(LoadPlan::FullBuild);
        }
        let Some(schema) = self.warehouse.table_schema(table).await? else {
            debug!(table, "target missing, first build is full");
            return Ok(LoadPlan::FullBuild);
        };

        let column = &cfg.watermark.column;
        let col = schema
            .column(column)
            .ok_or_else(|| WarehouseError::ColumnNotFound {
                table: table.to_string(),
                column: column.clone(),
            })?;
        if !cfg.watermark.strategy.accepts_type(col.ty) {
            return Err(WarehouseError::InvalidConfig(format!(
                "{table}: watermark column '{column}' has type {} which does not fit {:?}",
                col.ty, cfg.watermark.strategy
            )));
        }

        let current = self.warehouse.max_value(table, column).await?;
        let value = match current {
            Value::Null => cfg.watermark.strategy.sentinel(),
            v => v,
        };
        Ok(LoadPlan::Incremental(WatermarkPredicate {
            column: column.clone(),
            comparator: cfg.watermark.comparator(),
            value,
        }))
    }

    /// Write `built` according to `plan`. `built` is the full candidate
    /// relation; incremental plans filter it by their predicate here.
    pub async fn execute(
        &self,
        table: &str,
        config: &Materialization,
        plan: LoadPlan,
        built: Relation,
    ) -> Result<LoadOutcome> {
        let key = config.unique_key();
        match plan {
            LoadPlan::FullBuild => {
                let built = built.renamed(table);
                if !key.is_empty() {
                    built.check_unique_key(key)?;
                }
                self.warehouse.replace_table(table, &built).await?;
                info!(table, rows = built.len(), "table rebuilt");
                Ok(LoadOutcome::Rebuilt { rows: built.len() })
            }
            LoadPlan::Incremental(predicate) => {
                let Materialization::Incremental(cfg) = config else {
                    return Err(WarehouseError::InvalidConfig(format!(
                        "{table}: incremental plan for a table materialization"
                    )));
                };

                let col = built.col(&predicate.column)?;
                let batch = built
                    .renamed(table)
                    .filter(|row| predicate.admits(&row[col]));
                batch.check_unique_key(key)?;

                let existing = self
                    .warehouse
                    .table_schema(table)
                    .await?
                    .ok_or_else(|| WarehouseError::TableNotFound(table.to_string()))?;
                let changes =
                    plan_schema_changes(table, &existing, batch.schema(), cfg.on_schema_change)?;
                let target_schema = if changes.is_empty() {
                    existing
                } else {
                    info!(table, changes = changes.len(), "reconciling schema");
                    self.warehouse.apply_schema_changes(table, &changes).await?;
                    self.warehouse
                        .table_schema(table)
                        .await?
                        .ok_or_else(|| WarehouseError::TableNotFound(table.to_string()))?
                };

                let batch = batch.conform_to(&target_schema)?;
                let candidates = batch.len();
                let stats = self.warehouse.merge_rows(table, key, &batch).await?;
                info!(
                    table,
                    watermark = %predicate,
                    candidates,
                    inserted = stats.inserted,
                    updated = stats.updated,
                    total = stats.total,
                    "incremental merge"
                );
                Ok(LoadOutcome::Merged {
                    predicate,
                    candidates,
                    schema_changes: changes,
                    stats,
                })
            }
        }
    }

    /// `plan` then `execute`.
    pub async fn materialize(
        &self,
        table: &str,
        config: &Materialization,
        full_refresh: bool,
        built: Relation,
    ) -> Result<LoadOutcome> {
        let plan = self.plan(table, config, full_refresh).await?;
        self.execute(table, config, plan, built).await
    }
}
