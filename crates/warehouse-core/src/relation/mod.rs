//! In-memory relations.
//!
//! A `Relation` is the unit every pipeline stage consumes and produces: a
//! named, typed schema plus rows. Stages are pure functions from input
//! relations to one output relation; the store only ever sees finished
//! relations.

mod schema;
mod value;

use std::cmp::Ordering;
use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::error::{Result, WarehouseError};

pub use schema::{Column, Schema};
pub use value::{ColumnType, Value};

pub type Row = Vec<Value>;

/// Sort direction and null placement for [`Relation::sort_by_keys`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SortKey {
    pub column: usize,
    pub descending: bool,
    pub nulls_last: bool,
}

impl SortKey {
    pub fn desc_nulls_last(column: usize) -> Self {
        Self {
            column,
            descending: true,
            nulls_last: true,
        }
    }

    pub fn asc(column: usize) -> Self {
        Self {
            column,
            descending: false,
            nulls_last: false,
        }
    }

    fn compare(&self, a: &Row, b: &Row) -> Ordering {
        let (x, y) = (&a[self.column], &b[self.column]);
        match (x.is_null(), y.is_null()) {
            (true, true) => Ordering::Equal,
            (true, false) if self.nulls_last => Ordering::Greater,
            (false, true) if self.nulls_last => Ordering::Less,
            _ if self.descending => y.cmp(x),
            _ => x.cmp(y),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Relation {
    name: String,
    schema: Schema,
    rows: Vec<Row>,
}

impl Relation {
    /// Empty relation with the given schema.
    pub fn new(name: impl Into<String>, schema: Schema) -> Self {
        Self {
            name: name.into(),
            schema,
            rows: Vec::new(),
        }
    }

    /// Relation with rows, validating column names and row arity.
    pub fn with_rows(name: impl Into<String>, schema: Schema, rows: Vec<Row>) -> Result<Self> {
        let mut rel = Self::new(name, schema);
        if let Some(dup) = rel.schema.first_duplicate() {
            return Err(WarehouseError::DuplicateColumn {
                table: rel.name.clone(),
                column: dup.to_string(),
            });
        }
        rel.rows.reserve(rows.len());
        for row in rows {
            rel.push(row)?;
        }
        Ok(rel)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    pub fn into_rows(self) -> Vec<Row> {
        self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn renamed(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn push(&mut self, row: Row) -> Result<()> {
        if row.len() != self.schema.len() {
            return Err(WarehouseError::ArityMismatch {
                table: self.name.clone(),
                expected: self.schema.len(),
                found: row.len(),
            });
        }
        self.rows.push(row);
        Ok(())
    }

    /// Index of a column, or `ColumnNotFound`.
    pub fn col(&self, name: &str) -> Result<usize> {
        self.schema
            .index_of(name)
            .ok_or_else(|| WarehouseError::ColumnNotFound {
                table: self.name.clone(),
                column: name.to_string(),
            })
    }

    /// Resolve several column indexes at once.
    pub fn cols<const N: usize>(&self, names: [&str; N]) -> Result<[usize; N]> {
        let mut out = [0usize; N];
        for (slot, name) in out.iter_mut().zip(names) {
            *slot = self.col(name)?;
        }
        Ok(out)
    }

    pub fn key_indexes(&self, key: &[String]) -> Result<Vec<usize>> {
        key.iter().map(|k| self.col(k)).collect()
    }

    /// Keep only rows matching the predicate.
    pub fn filter(mut self, mut pred: impl FnMut(&Row) -> bool) -> Self {
        self.rows.retain(|r| pred(r));
        self
    }

    /// Stable sort by the given keys, first key most significant.
    pub fn sort_by_keys(&mut self, keys: &[SortKey]) {
        self.rows.sort_by(|a, b| {
            keys.iter()
                .map(|k| k.compare(a, b))
                .find(|o| *o != Ordering::Equal)
                .unwrap_or(Ordering::Equal)
        });
    }

    /// Maximum non-null value of a column; `Null` when there is none.
    pub fn max_of(&self, column: &str) -> Result<Value> {
        let idx = self.col(column)?;
        Ok(self
            .rows
            .iter()
            .map(|r| &r[idx])
            .filter(|v| !v.is_null())
            .max()
            .cloned()
            .unwrap_or(Value::Null))
    }

    /// Verify that `key` identifies each row: no null component, no repeats.
    pub fn check_unique_key(&self, key: &[String]) -> Result<()> {
        let idx = self.key_indexes(key)?;
        let mut seen: HashSet<Vec<&Value>> = HashSet::with_capacity(self.rows.len());
        for row in &self.rows {
            if let Some(&i) = idx.iter().find(|&&i| row[i].is_null()) {
                return Err(WarehouseError::NullBusinessKey {
                    table: self.name.clone(),
                    column: self.schema.columns()[i].name.clone(),
                });
            }
            let k: Vec<&Value> = idx.iter().map(|&i| &row[i]).collect();
            if !seen.insert(k) {
                return Err(WarehouseError::DuplicateBusinessKey {
                    table: self.name.clone(),
                    key: render_key(key, &idx, row),
                });
            }
        }
        Ok(())
    }

    /// Reshape this relation to `target`: reorder columns, null-fill columns
    /// the target has but this relation lacks, drop columns the target lacks
    /// and widen values whose type differs.
    pub fn conform_to(&self, target: &Schema) -> Result<Relation> {
        let mapping: Vec<(Option<usize>, ColumnType)> = target
            .columns()
            .iter()
            .map(|c| (self.schema.index_of(&c.name), c.ty))
            .collect();

        for (col, (src, ty)) in target.columns().iter().zip(&mapping) {
            if let Some(i) = src {
                let from = self.schema.columns()[*i].ty;
                if !from.can_widen_to(*ty) {
                    return Err(WarehouseError::IncompatibleTypeChange {
                        table: self.name.clone(),
                        column: col.name.clone(),
                        from,
                        to: *ty,
                    });
                }
            }
        }

        let mut out = Relation::new(self.name.clone(), target.clone());
        out.rows.reserve(self.rows.len());
        for row in &self.rows {
            let mut next = Vec::with_capacity(mapping.len());
            for (src, ty) in &mapping {
                let v = match src {
                    Some(i) => row[*i].widen_to(*ty).unwrap_or(Value::Null),
                    None => Value::Null,
                };
                next.push(v);
            }
            out.rows.push(next);
        }
        Ok(out)
    }

    pub(crate) fn schema_mut(&mut self) -> &mut Schema {
        &mut self.schema
    }

    pub(crate) fn rows_mut(&mut self) -> &mut Vec<Row> {
        &mut self.rows
    }
}

/// `(a=1, b=x)` rendering of a business key, used in error messages.
pub fn render_key(names: &[String], idx: &[usize], row: &Row) -> String {
    let parts: Vec<String> = names
        .iter()
        .zip(idx)
        .map(|(n, &i)| format!("{n}={}", row[i]))
        .collect();
    format!("({})", parts.join(", "))
}
