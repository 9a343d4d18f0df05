//! Grouped pre-aggregation.
//!
//! A rollup is a pure, total recompute over its source relation: one output
//! row per distinct grouping combination, ordered by the grouping values so
//! repeated runs over unchanged input produce identical output.

use std::collections::{BTreeMap, BTreeSet};

use rust_decimal::Decimal;

use crate::error::Result;
use crate::relation::{Column, ColumnType, Relation, Schema, Value};

/// Sentinel group label for null grouping values.
pub const NOT_INFORMED: &str = "NÃO INFORMADO";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GroupColumn {
    /// Text dimension; nulls are grouped under the rollup's null label.
    Label(String),
    /// Typed dimension (year, month). Groups sort by the native value and
    /// are rendered as text, so a null lands under the null label like any
    /// text dimension.
    Key(String),
}

impl GroupColumn {
    pub fn label(name: &str) -> Self {
        GroupColumn::Label(name.to_string())
    }

    pub fn key(name: &str) -> Self {
        GroupColumn::Key(name.to_string())
    }

    fn name(&self) -> &str {
        match self {
            GroupColumn::Label(n) | GroupColumn::Key(n) => n,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Aggregate {
    Count {
        output: String,
    },
    CountDistinct {
        column: String,
        output: String,
    },
    /// Sum of non-null values; null when every input is null.
    Sum {
        column: String,
        output: String,
    },
    /// Rows whose `column` equals `equals`.
    CountIf {
        column: String,
        equals: Value,
        output: String,
    },
    /// Sum of `column` over rows whose `when` equals `equals`; zero when no
    /// row matches.
    SumIf {
        column: String,
        when: String,
        equals: Value,
        output: String,
    },
    /// True if any row has `column = true`.
    Any {
        column: String,
        output: String,
    },
}

impl Aggregate {
    fn output(&self) -> &str {
        match self {
            Aggregate::Count { output }
            | Aggregate::CountDistinct { output, .. }
            | Aggregate::Sum { output, .. }
            | Aggregate::CountIf { output, .. }
            | Aggregate::SumIf { output, .. }
            | Aggregate::Any { output, .. } => output,
        }
    }

    fn output_type(&self) -> ColumnType {
        match self {
            Aggregate::Count { .. } | Aggregate::CountDistinct { .. } | Aggregate::CountIf { .. } => {
                ColumnType::Integer
            }
            Aggregate::Sum { .. } | Aggregate::SumIf { .. } => ColumnType::Decimal,
            Aggregate::Any { .. } => ColumnType::Boolean,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Rollup {
    pub name: String,
    pub group_by: Vec<GroupColumn>,
    pub aggregates: Vec<Aggregate>,
    pub null_label: String,
}

/// Running state of one aggregate within one group.
enum Acc {
    Count(i64),
    Distinct(BTreeSet<Value>),
    Sum(Option<Decimal>),
    Bool(bool),
}

/// Aggregate with its source columns resolved to indexes.
struct Bound<'a> {
    agg: &'a Aggregate,
    column: Option<usize>,
    when: Option<usize>,
}

impl Rollup {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            group_by: Vec::new(),
            aggregates: Vec::new(),
            null_label: NOT_INFORMED.to_string(),
        }
    }

    pub fn group(mut self, column: GroupColumn) -> Self {
        self.group_by.push(column);
        self
    }

    pub fn aggregate(mut self, agg: Aggregate) -> Self {
        self.aggregates.push(agg);
        self
    }

    pub fn output_schema(&self, source: &Relation) -> Result<Schema> {
        let mut columns = Vec::with_capacity(self.group_by.len() + self.aggregates.len());
        for g in &self.group_by {
            source.col(g.name())?;
            columns.push(Column::new(g.name(), ColumnType::Text));
        }
        for a in &self.aggregates {
            columns.push(Column::new(a.output(), a.output_type()));
        }
        Ok(Schema::new(columns))
    }

    pub fn compute(&self, source: &Relation) -> Result<Relation> {
        let schema = self.output_schema(source)?;
        let group_idx: Vec<(usize, &GroupColumn)> = self
            .group_by
            .iter()
            .map(|g| Ok((source.col(g.name())?, g)))
            .collect::<Result<_>>()?;
        let bound: Vec<Bound<'_>> = self
            .aggregates
            .iter()
            .map(|agg| self.bind(source, agg))
            .collect::<Result<_>>()?;

        let mut groups: BTreeMap<Vec<Value>, Vec<Acc>> = BTreeMap::new();
        for row in source.rows() {
            let mut key = Vec::with_capacity(group_idx.len());
            for (i, g) in &group_idx {
                key.push(self.group_value(g, &row[*i]));
            }
            let accs = groups
                .entry(key)
                .or_insert_with(|| bound.iter().map(|b| init(b.agg)).collect());
            for (acc, b) in accs.iter_mut().zip(&bound) {
                update(acc, b, row);
            }
        }

        let mut out = Relation::new(self.name.clone(), schema);
        for (key, accs) in groups {
            let mut row: Vec<Value> = key.into_iter().map(|v| self.render(v)).collect();
            row.extend(accs.into_iter().map(finish));
            out.push(row)?;
        }
        Ok(out)
    }

    /// Grouping value: labels are rendered up front, keys keep their
    /// native value until output so numeric order survives.
    fn group_value(&self, g: &GroupColumn, v: &Value) -> Value {
        match g {
            GroupColumn::Label(_) => self.render(v.clone()),
            GroupColumn::Key(_) => v.clone(),
        }
    }

    fn render(&self, v: Value) -> Value {
        match v {
            Value::Null => Value::Text(self.null_label.clone()),
            Value::Text(s) => Value::Text(s),
            other => Value::Text(other.to_string()),
        }
    }

    fn bind<'a>(&self, source: &Relation, agg: &'a Aggregate) -> Result<Bound<'a>> {
        let (column, when) = match agg {
            Aggregate::Count { .. } => (None, None),
            Aggregate::CountDistinct { column, .. }
            | Aggregate::Sum { column, .. }
            | Aggregate::CountIf { column, .. }
            | Aggregate::Any { column, .. } => (Some(source.col(column)?), None),
            Aggregate::SumIf { column, when, .. } => {
                (Some(source.col(column)?), Some(source.col(when)?))
            }
        };
        Ok(Bound { agg, column, when })
    }
}

fn init(agg: &Aggregate) -> Acc {
    match agg {
        Aggregate::Count { .. } | Aggregate::CountIf { .. } => Acc::Count(0),
        Aggregate::CountDistinct { .. } => Acc::Distinct(BTreeSet::new()),
        Aggregate::Sum { .. } => Acc::Sum(None),
        Aggregate::SumIf { .. } => Acc::Sum(Some(Decimal::ZERO)),
        Aggregate::Any { .. } => Acc::Bool(false),
    }
}

fn update(acc: &mut Acc, b: &Bound<'_>, row: &[Value]) {
    let value = b.column.map(|i| &row[i]);
    match (acc, b.agg) {
        (Acc::Count(n), Aggregate::Count { .. }) => *n += 1,
        (Acc::Count(n), Aggregate::CountIf { equals, .. }) => {
            if value == Some(equals) {
                *n += 1;
            }
        }
        (Acc::Distinct(set), _) => {
            if let Some(v) = value.filter(|v| !v.is_null()) {
                set.insert(v.clone());
            }
        }
        (Acc::Sum(total), Aggregate::Sum { .. }) => {
            if let Some(d) = value.and_then(Value::as_decimal) {
                *total = Some(total.unwrap_or(Decimal::ZERO) + d);
            }
        }
        (Acc::Sum(total), Aggregate::SumIf { equals, .. }) => {
            let matched = b.when.map(|i| &row[i]) == Some(equals);
            if matched {
                if let Some(d) = value.and_then(Value::as_decimal) {
                    *total = Some(total.unwrap_or(Decimal::ZERO) + d);
                }
            }
        }
        (Acc::Bool(any), _) => {
            if value.and_then(Value::as_bool) == Some(true) {
                *any = true;
            }
        }
        _ => {}
    }
}

fn finish(acc: Acc) -> Value {
    match acc {
        Acc::Count(n) => Value::Int(n),
        Acc::Distinct(set) => Value::Int(set.len() as i64),
        Acc::Sum(total) => total.map(Value::Decimal).unwrap_or(Value::Null),
        Acc::Bool(b) => Value::Bool(b),
    }
}
