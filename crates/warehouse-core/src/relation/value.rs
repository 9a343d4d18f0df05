//! Scalar values and column types.
//!
//! `Value` equality is structural (`Int(1) != Decimal(1)`), while ordering is
//! semantic: integers and decimals compare numerically, dates and timestamps
//! compare chronologically, and `Null` sorts below everything. Ties between
//! semantically-equal values of different variants are broken by variant so
//! that `Ord` stays consistent with `Eq`.

use std::cmp::Ordering;
use std::fmt;

use chrono::{NaiveDate, NaiveDateTime};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Logical column type of a relation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ColumnType {
    Boolean,
    Integer,
    Decimal,
    Text,
    Date,
    Timestamp,
}

impl ColumnType {
    /// Whether existing values of `self` can be losslessly re-expressed as `to`.
    ///
    /// `Integer -> Decimal`, `Date -> Timestamp` and anything `-> Text` widen;
    /// every other change is incompatible.
    pub fn can_widen_to(self, to: ColumnType) -> bool {
        self == to
            || to == ColumnType::Text
            || matches!(
                (self, to),
                (ColumnType::Integer, ColumnType::Decimal)
                    | (ColumnType::Date, ColumnType::Timestamp)
            )
    }

    pub fn sql_name(self) -> &'static str {
        match self {
            ColumnType::Boolean => "BOOLEAN",
            ColumnType::Integer => "BIGINT",
            ColumnType::Decimal => "NUMERIC",
            ColumnType::Text => "TEXT",
            ColumnType::Date => "DATE",
            ColumnType::Timestamp => "TIMESTAMP",
        }
    }
}

impl fmt::Display for ColumnType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.sql_name())
    }
}

/// A single cell.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Value {
    Null,
    Bool(bool),
    Int(i64),
    Decimal(Decimal),
    Text(String),
    Date(NaiveDate),
    Timestamp(NaiveDateTime),
}

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// The column type this value belongs to; `None` for `Null`.
    pub fn column_type(&self) -> Option<ColumnType> {
        match self {
            Value::Null => None,
            Value::Bool(_) => Some(ColumnType::Boolean),
            Value::Int(_) => Some(ColumnType::Integer),
            Value::Decimal(_) => Some(ColumnType::Decimal),
            Value::Text(_) => Some(ColumnType::Text),
            Value::Date(_) => Some(ColumnType::Date),
            Value::Timestamp(_) => Some(ColumnType::Timestamp),
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Value::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            Value::Int(i) => Some(*i),
            _ => None,
        }
    }

    /// Numeric view: integers are promoted to decimals.
    pub fn as_decimal(&self) -> Option<Decimal> {
        match self {
            Value::Decimal(d) => Some(*d),
            Value::Int(i) => Some(Decimal::from(*i)),
            _ => None,
        }
    }

    pub fn as_date(&self) -> Option<NaiveDate> {
        match self {
            Value::Date(d) => Some(*d),
            Value::Timestamp(ts) => Some(ts.date()),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Re-express this value as `to`, following the widening lattice of
    /// [`ColumnType::can_widen_to`]. Returns `None` when the conversion is not
    /// a widening. `Null` converts to every type.
    pub fn widen_to(&self, to: ColumnType) -> Option<Value> {
        let from = match self.column_type() {
            None => return Some(Value::Null),
            Some(t) => t,
        };
        if from == to {
            return Some(self.clone());
        }
        if !from.can_widen_to(to) {
            return None;
        }
        match (self, to) {
            (Value::Int(i), ColumnType::Decimal) => Some(Value::Decimal(Decimal::from(*i))),
            (Value::Date(d), ColumnType::Timestamp) => {
                Some(Value::Timestamp(d.and_hms_opt(0, 0, 0)?))
            }
            (v, ColumnType::Text) => Some(Value::Text(v.to_string())),
            _ => None,
        }
    }

    fn rank(&self) -> u8 {
        match self {
            Value::Null => 0,
            Value::Bool(_) => 1,
            Value::Int(_) | Value::Decimal(_) => 2,
            Value::Text(_) => 3,
            Value::Date(_) | Value::Timestamp(_) => 4,
        }
    }

    fn variant_tiebreak(&self) -> u8 {
        match self {
            Value::Int(_) | Value::Date(_) => 0,
            _ => 1,
        }
    }

    /// Order by meaning only: `Int(3)` and `Decimal(3.0)` compare equal, as
    /// do a date and its midnight timestamp. `Ord` adds a variant tiebreak
    /// on top of this so that it stays total.
    pub fn cmp_semantic(&self, other: &Self) -> Ordering {
        let by_rank = self.rank().cmp(&other.rank());
        if by_rank != Ordering::Equal {
            return by_rank;
        }
        match (self, other) {
            (Value::Null, Value::Null) => Ordering::Equal,
            (Value::Bool(a), Value::Bool(b)) => a.cmp(b),
            (Value::Int(a), Value::Int(b)) => a.cmp(b),
            (Value::Text(a), Value::Text(b)) => a.cmp(b),
            (Value::Date(a), Value::Date(b)) => a.cmp(b),
            (Value::Timestamp(a), Value::Timestamp(b)) => a.cmp(b),
            (Value::Date(a), Value::Timestamp(b)) => a.and_time(chrono::NaiveTime::MIN).cmp(b),
            (Value::Timestamp(a), Value::Date(b)) => a.cmp(&b.and_time(chrono::NaiveTime::MIN)),
            (a, b) => match (a.as_decimal(), b.as_decimal()) {
                (Some(x), Some(y)) => x.cmp(&y),
                _ => Ordering::Equal,
            },
        }
    }
}

impl Ord for Value {
    fn cmp(&self, other: &Self) -> Ordering {
        self.cmp_semantic(other)
            .then_with(|| self.variant_tiebreak().cmp(&other.variant_tiebreak()))
    }
}

impl PartialOrd for Value {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => f.write_str("NULL"),
            Value::Bool(b) => write!(f, "{b}"),
            Value::Int(i) => write!(f, "{i}"),
            Value::Decimal(d) => write!(f, "{d}"),
            Value::Text(s) => f.write_str(s),
            Value::Date(d) => write!(f, "{}", d.format("%Y-%m-%d")),
            Value::Timestamp(ts) => write!(f, "{}", ts.format("%Y-%m-%dT%H:%M:%S")),
        }
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Int(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::Int(i64::from(v))
    }
}

impl From<Decimal> for Value {
    fn from(v: Decimal) -> Self {
        Value::Decimal(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Text(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::Text(v)
    }
}

impl From<NaiveDate> for Value {
    fn from(v: NaiveDate) -> Self {
        Value::Date(v)
    }
}

impl From<NaiveDateTime> for Value {
    fn from(v: NaiveDateTime) -> Self {
        Value::Timestamp(v)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map(Into::into).unwrap_or(Value::Null)
    }
}
