//! Staging adapters.
//!
//! One declarative adapter per raw source: which raw columns to read, what
//! to call them and how to cast them. Casting is parse-or-null, so a staged
//! table never fails on a malformed field; it just carries a null.

pub mod parse;
mod sources;

use serde_json::Value as Json;
use tracing::info;
use warehouse_core::{Column, ColumnType, Relation, Row, Schema, Value};

use crate::error::Result;
use crate::raw::RawRecord;

pub use sources::{adapter_for_table, adapters, derive_amendment_code, derive_payment_period};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CastKind {
    Text,
    Integer,
    Decimal,
    /// `1.234,56` style monetary strings.
    BrDecimal,
    Date,
    Timestamp,
    Boolean,
}

impl CastKind {
    pub fn column_type(self) -> ColumnType {
        match self {
            CastKind::Text => ColumnType::Text,
            CastKind::Integer => ColumnType::Integer,
            CastKind::Decimal | CastKind::BrDecimal => ColumnType::Decimal,
            CastKind::Date => ColumnType::Date,
            CastKind::Timestamp => ColumnType::Timestamp,
            CastKind::Boolean => ColumnType::Boolean,
        }
    }

    pub fn apply(self, v: &Json) -> Value {
        match self {
            CastKind::Text => parse::text(v),
            CastKind::Integer => parse::integer(v),
            CastKind::Decimal => parse::decimal(v),
            CastKind::BrDecimal => parse::br_decimal(v),
            CastKind::Date => parse::date(v),
            CastKind::Timestamp => parse::timestamp(v),
            CastKind::Boolean => parse::boolean(v),
        }
    }
}

/// One staged column. `sources` are tried in order; the first raw column
/// holding a non-null value wins.
#[derive(Debug, Clone)]
pub struct ColumnCast {
    pub target: &'static str,
    pub sources: Vec<&'static str>,
    pub cast: CastKind,
}

impl ColumnCast {
    pub fn new(target: &'static str, cast: CastKind) -> Self {
        Self {
            target,
            sources: vec![target],
            cast,
        }
    }

    /// Read from a differently named raw column.
    pub fn source(mut self, source: &'static str) -> Self {
        self.sources = vec![source];
        self
    }

    /// Fall back to another raw column when the previous ones are null.
    pub fn or(mut self, source: &'static str) -> Self {
        self.sources.push(source);
        self
    }

    fn extract(&self, record: &RawRecord) -> Value {
        self.sources
            .iter()
            .filter_map(|s| record.get(*s))
            .map(|raw| self.cast.apply(raw))
            .find(|v| !v.is_null())
            .unwrap_or(Value::Null)
    }
}

/// Row-level fix-up run after casting.
pub type Derivation = fn(&Schema, &mut Row);

#[derive(Debug, Clone)]
pub struct StagingAdapter {
    /// Raw source name (`<source>.parquet`).
    pub source: &'static str,
    /// Staged table name.
    pub table: &'static str,
    pub columns: Vec<ColumnCast>,
    pub derive: Option<Derivation>,
}

impl StagingAdapter {
    pub fn schema(&self) -> Schema {
        Schema::new(
            self.columns
                .iter()
                .map(|c| Column::new(c.target, c.cast.column_type()))
                .collect(),
        )
    }

    pub fn stage(&self, records: &[RawRecord]) -> Result<Relation> {
        let schema = self.schema();
        let mut rows = Vec::with_capacity(records.len());
        for record in records {
            let mut row: Row = self.columns.iter().map(|c| c.extract(record)).collect();
            if let Some(derive) = self.derive {
                derive(&schema, &mut row);
            }
            rows.push(row);
        }
        let relation = Relation::with_rows(self.table, schema, rows)?;
        info!(
            source = self.source,
            table = self.table,
            rows = relation.len(),
            "staged"
        );
        Ok(relation)
    }
}
