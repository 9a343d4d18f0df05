//! Dimension, fact and aggregate models.
//!
//! Every model is a pure function from named input relations to one output
//! relation. Whether the output replaces the target or is merged into it is
//! decided afterwards by the merge engine from the table's materialization
//! record; models always build their full candidate set.

pub mod aggregates;
pub mod dimensions;
pub mod facts;

use std::collections::BTreeMap;

use serde::Serialize;
use tracing::warn;
use warehouse_core::{Relation, WarehouseError};

use crate::error::Result;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Layer {
    Staging,
    Dimension,
    Fact,
    Aggregate,
}

impl Layer {
    pub fn as_str(self) -> &'static str {
        match self {
            Layer::Staging => "staging",
            Layer::Dimension => "dimension",
            Layer::Fact => "fact",
            Layer::Aggregate => "aggregate",
        }
    }
}

/// Input relations of one model build, by table name.
#[derive(Debug, Default)]
pub struct Inputs {
    tables: BTreeMap<String, Relation>,
}

impl Inputs {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, relation: Relation) {
        self.tables.insert(relation.name().to_string(), relation);
    }

    pub fn with(mut self, relation: Relation) -> Self {
        self.insert(relation);
        self
    }

    pub fn get(&self, table: &str) -> Result<&Relation> {
        self.tables
            .get(table)
            .ok_or_else(|| WarehouseError::TableNotFound(table.to_string()).into())
    }
}

pub type BuildFn = fn(&Inputs) -> Result<Relation>;

#[derive(Debug, Clone, Copy)]
pub struct ModelDef {
    pub name: &'static str,
    pub layer: Layer,
    pub inputs: &'static [&'static str],
    pub build: BuildFn,
}

pub fn models() -> Vec<ModelDef> {
    let mut all = dimensions::models();
    all.extend(facts::models());
    all.extend(aggregates::models());
    all
}

/// Drop rows with a null in any of `columns`, logging how many went.
pub(crate) fn retain_non_null(relation: Relation, columns: &[&str]) -> Result<Relation> {
    let idx: Vec<usize> = columns
        .iter()
        .map(|c| relation.col(c))
        .collect::<std::result::Result<_, _>>()?;
    let before = relation.len();
    let name = relation.name().to_string();
    let kept = relation.filter(|row| idx.iter().all(|&i| !row[i].is_null()));
    let dropped = before - kept.len();
    if dropped > 0 {
        warn!(table = %name, dropped, columns = ?columns, "rows with null key columns dropped");
    }
    Ok(kept)
}
