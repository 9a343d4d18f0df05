//! Warehouse configuration (`config/warehouse.yaml`).
//!
//! Holds the per-table materialization records the merge engine is driven by,
//! plus run defaults. Tables missing from `models` are rebuilt in full.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use warehouse_core::Materialization;

use crate::error::Result;

pub const DEFAULT_CONFIG_PATH: &str = "config/warehouse.yaml";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WarehouseConfig {
    /// Directory holding `<source>.parquet` / `<source>.jsonl` extracts.
    #[serde(default = "default_raw_dir")]
    pub raw_dir: PathBuf,

    /// Postgres schema the tables are written to.
    #[serde(default = "default_schema")]
    pub database_schema: String,

    #[serde(default)]
    pub models: BTreeMap<String, Materialization>,
}

fn default_raw_dir() -> PathBuf {
    PathBuf::from("data/raw")
}

fn default_schema() -> String {
    "public".to_string()
}

impl Default for WarehouseConfig {
    fn default() -> Self {
        Self {
            raw_dir: default_raw_dir(),
            database_schema: default_schema(),
            models: BTreeMap::new(),
        }
    }
}

impl WarehouseConfig {
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml(&content)
    }

    pub fn from_yaml(content: &str) -> Result<Self> {
        let config: WarehouseConfig = serde_yaml::from_str(content)?;
        for (table, m) in &config.models {
            m.validate(table)?;
        }
        Ok(config)
    }

    pub fn materialization(&self, table: &str) -> Materialization {
        self.models.get(table).cloned().unwrap_or_default()
    }
}
