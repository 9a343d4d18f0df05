//! Watermark classes and predicates.
//!
//! | class               | comparator | sentinel     |
//! |---------------------|------------|--------------|
//! | `auto_increment_id` | `>`        | `0`          |
//! | `event_date`        | `>`        | `1900-01-01` |
//! | `year_bucket`       | `>=`       | `0`          |
//!
//! Year buckets use `>=` because a source year keeps receiving corrections
//! until it closes; the boundary year is always reprocessed.

use std::fmt;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::relation::{ColumnType, Value};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WatermarkClass {
    AutoIncrementId,
    EventDate,
    YearBucket,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Comparator {
    Gt,
    Gte,
}

impl fmt::Display for Comparator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Comparator::Gt => ">",
            Comparator::Gte => ">=",
        })
    }
}

impl WatermarkClass {
    pub fn default_comparator(self) -> Comparator {
        match self {
            WatermarkClass::AutoIncrementId | WatermarkClass::EventDate => Comparator::Gt,
            WatermarkClass::YearBucket => Comparator::Gte,
        }
    }

    /// Watermark used when the target table holds no rows yet.
    pub fn sentinel(self) -> Value {
        match self {
            WatermarkClass::AutoIncrementId | WatermarkClass::YearBucket => Value::Int(0),
            WatermarkClass::EventDate => {
                Value::Date(NaiveDate::from_ymd_opt(1900, 1, 1).unwrap_or_default())
            }
        }
    }

    /// Integer columns may have been widened to decimal, and dates to
    /// timestamps, by schema reconciliation; both still order correctly.
    pub fn accepts_type(self, ty: ColumnType) -> bool {
        match self {
            WatermarkClass::AutoIncrementId | WatermarkClass::YearBucket => {
                matches!(ty, ColumnType::Integer | ColumnType::Decimal)
            }
            WatermarkClass::EventDate => matches!(ty, ColumnType::Date | ColumnType::Timestamp),
        }
    }
}

/// `column <op> value`, evaluated against upstream rows.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WatermarkPredicate {
    pub column: String,
    pub comparator: Comparator,
    pub value: Value,
}

impl WatermarkPredicate {
    /// SQL semantics: a null watermark column never passes. An integer
    /// year equals the same year stored as a decimal.
    pub fn admits(&self, v: &Value) -> bool {
        if v.is_null() {
            return false;
        }
        let ord = v.cmp_semantic(&self.value);
        match self.comparator {
            Comparator::Gt => ord == std::cmp::Ordering::Greater,
            Comparator::Gte => ord != std::cmp::Ordering::Less,
        }
    }
}

impl fmt::Display for WatermarkPredicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} {}", self.column, self.comparator, self.value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pred(class: WatermarkClass, value: Value) -> WatermarkPredicate {
        WatermarkPredicate {
            column: "c".into(),
            comparator: class.default_comparator(),
            value,
        }
    }

    #[test]
    fn year_bucket_reprocesses_boundary_year() {
        let p = pred(WatermarkClass::YearBucket, Value::Int(2023));
        assert!(p.admits(&Value::Int(2023)));
        assert!(p.admits(&Value::Int(2024)));
        assert!(!p.admits(&Value::Int(2022)));
    }

    #[test]
    fn ids_and_dates_are_strict() {
        let p = pred(WatermarkClass::AutoIncrementId, Value::Int(41));
        assert!(!p.admits(&Value::Int(41)));
        assert!(p.admits(&Value::Int(42)));

        let day = NaiveDate::from_ymd_opt(2024, 5, 2).unwrap();
        let p = pred(WatermarkClass::EventDate, Value::Date(day));
        assert!(!p.admits(&Value::Date(day)));
        assert!(p.admits(&Value::Date(day.succ_opt().unwrap())));
    }

    #[test]
    fn widened_columns_are_accepted() {
        use rust_decimal::Decimal;

        assert!(WatermarkClass::YearBucket.accepts_type(ColumnType::Decimal));
        assert!(WatermarkClass::AutoIncrementId.accepts_type(ColumnType::Decimal));
        assert!(WatermarkClass::EventDate.accepts_type(ColumnType::Timestamp));
        assert!(!WatermarkClass::YearBucket.accepts_type(ColumnType::Text));
        assert!(!WatermarkClass::EventDate.accepts_type(ColumnType::Integer));

        let p = pred(WatermarkClass::YearBucket, Value::Decimal(Decimal::from(2023)));
        assert!(p.admits(&Value::Int(2023)));
        assert!(!p.admits(&Value::Int(2022)));
        let p = pred(WatermarkClass::AutoIncrementId, Value::Decimal(Decimal::from(41)));
        assert!(!p.admits(&Value::Int(41)));
        assert!(p.admits(&Value::Int(42)));
    }

    #[test]
    fn nulls_never_pass() {
        let p = pred(WatermarkClass::YearBucket, WatermarkClass::YearBucket.sentinel());
        assert!(!p.admits(&Value::Null));
    }

    #[test]
    fn event_date_sentinel_admits_any_real_date() {
        let p = pred(WatermarkClass::EventDate, WatermarkClass::EventDate.sentinel());
        assert!(p.admits(&Value::Date(NaiveDate::from_ymd_opt(1990, 1, 1).unwrap())));
        assert_eq!(p.to_string(), "c > 1900-01-01");
    }
}
