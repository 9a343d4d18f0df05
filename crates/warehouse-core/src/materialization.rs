//! Per-table materialization records.
//!
//! These are supplied by the orchestrator (usually deserialized from
//! `config/warehouse.yaml`) and drive the one generic merge engine; no table
//! gets special-cased code paths.

use serde::{Deserialize, Serialize};

use crate::error::{Result, WarehouseError};
use crate::merge::watermark::{Comparator, WatermarkClass};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "materialized", rename_all = "snake_case")]
pub enum Materialization {
    /// Always rebuilt in full.
    Table {
        #[serde(default)]
        unique_key: Vec<String>,
    },
    /// Full build on first run, watermark-bounded merge afterwards.
    Incremental(IncrementalConfig),
}

impl Default for Materialization {
    fn default() -> Self {
        Materialization::Table {
            unique_key: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IncrementalConfig {
    pub unique_key: Vec<String>,
    pub watermark: WatermarkConfig,
    #[serde(default)]
    pub on_schema_change: OnSchemaChange,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WatermarkConfig {
    pub strategy: WatermarkClass,
    pub column: String,
    /// Overrides the strategy's comparator. Leave unset unless the table's
    /// reprocessing semantics are deliberately different from its class.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comparator: Option<Comparator>,
}

impl WatermarkConfig {
    pub fn new(strategy: WatermarkClass, column: impl Into<String>) -> Self {
        Self {
            strategy,
            column: column.into(),
            comparator: None,
        }
    }

    pub fn comparator(&self) -> Comparator {
        self.comparator
            .unwrap_or_else(|| self.strategy.default_comparator())
    }
}

/// What to do when the freshly built shape differs from the existing table.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OnSchemaChange {
    /// Add new columns, drop vanished ones, widen retyped ones.
    #[default]
    SyncAllColumns,
    /// Add new columns and widen retyped ones; keep target-only columns.
    AppendNewColumns,
    /// Refuse to load when the shape changed.
    Fail,
}

impl Materialization {
    pub fn incremental(
        unique_key: &[&str],
        watermark: WatermarkConfig,
        on_schema_change: OnSchemaChange,
    ) -> Self {
        Materialization::Incremental(IncrementalConfig {
            unique_key: unique_key.iter().map(|s| s.to_string()).collect(),
            watermark,
            on_schema_change,
        })
    }

    pub fn table(unique_key: &[&str]) -> Self {
        Materialization::Table {
            unique_key: unique_key.iter().map(|s| s.to_string()).collect(),
        }
    }

    pub fn unique_key(&self) -> &[String] {
        match self {
            Materialization::Table { unique_key } => unique_key,
            Materialization::Incremental(cfg) => &cfg.unique_key,
        }
    }

    pub fn is_incremental(&self) -> bool {
        matches!(self, Materialization::Incremental(_))
    }

    pub fn validate(&self, table: &str) -> Result<()> {
        let key = self.unique_key();
        for (i, k) in key.iter().enumerate() {
            if k.trim().is_empty() {
                return Err(WarehouseError::InvalidConfig(format!(
                    "{table}: empty unique_key column"
                )));
            }
            if key[..i].contains(k) {
                return Err(WarehouseError::InvalidConfig(format!(
                    "{table}: unique_key column '{k}' listed twice"
                )));
            }
        }
        if let Materialization::Incremental(cfg) = self {
            if cfg.unique_key.is_empty() {
                return Err(WarehouseError::InvalidConfig(format!(
                    "{table}: incremental materialization needs a unique_key"
                )));
            }
            if cfg.watermark.column.trim().is_empty() {
                return Err(WarehouseError::InvalidConfig(format!(
                    "{table}: incremental materialization needs a watermark column"
                )));
            }
        }
        Ok(())
    }
}
