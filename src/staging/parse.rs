//! Parse-or-null conversions from untyped raw values.
//!
//! None of these fail: anything unparseable becomes `Value::Null`.

use std::str::FromStr;

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use rust_decimal::Decimal;
use serde_json::Value as Json;
use warehouse_core::Value;

const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%d/%m/%Y"];
const TIMESTAMP_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S%.f",
    "%d/%m/%Y %H:%M:%S",
];

/// Trimmed text; empty strings are null. Numbers and booleans keep their
/// JSON rendering.
pub fn text(v: &Json) -> Value {
    match v {
        Json::Null => Value::Null,
        Json::String(s) => trimmed(s).map(Value::from).unwrap_or(Value::Null),
        Json::Number(n) => Value::Text(n.to_string()),
        Json::Bool(b) => Value::Text(b.to_string()),
        other => Value::Text(other.to_string()),
    }
}

pub fn integer(v: &Json) -> Value {
    let parsed = match v {
        Json::Number(n) => n.as_i64().or_else(|| {
            n.as_f64()
                .filter(|f| f.fract() == 0.0 && f.abs() < i64::MAX as f64)
                .map(|f| f as i64)
        }),
        Json::String(s) => trimmed(s).and_then(|s| s.parse::<i64>().ok()),
        Json::Bool(b) => Some(i64::from(*b)),
        _ => None,
    };
    parsed.map(Value::Int).unwrap_or(Value::Null)
}

/// Plain decimal notation (`1234.56`); JSON numbers are taken exactly as
/// rendered.
pub fn decimal(v: &Json) -> Value {
    let parsed = match v {
        Json::Number(n) => decimal_str(&n.to_string()),
        Json::String(s) => trimmed(s).and_then(decimal_str),
        _ => None,
    };
    parsed.map(Value::Decimal).unwrap_or(Value::Null)
}

/// Brazilian-formatted decimal (`1.234,56`). JSON numbers are already
/// native and are parsed as plain decimals.
pub fn br_decimal(v: &Json) -> Value {
    let parsed = match v {
        Json::Number(n) => decimal_str(&n.to_string()),
        Json::String(s) => trimmed(s).and_then(br_decimal_str),
        _ => None,
    };
    parsed.map(Value::Decimal).unwrap_or(Value::Null)
}

pub fn date(v: &Json) -> Value {
    match v {
        Json::String(s) => trimmed(s)
            .and_then(date_str)
            .map(Value::Date)
            .unwrap_or(Value::Null),
        _ => Value::Null,
    }
}

pub fn timestamp(v: &Json) -> Value {
    match v {
        Json::String(s) => trimmed(s)
            .and_then(timestamp_str)
            .map(Value::Timestamp)
            .unwrap_or(Value::Null),
        _ => Value::Null,
    }
}

pub fn boolean(v: &Json) -> Value {
    let parsed = match v {
        Json::Bool(b) => Some(*b),
        Json::Number(n) => match n.as_i64() {
            Some(1) => Some(true),
            Some(0) => Some(false),
            _ => None,
        },
        Json::String(s) => trimmed(s).and_then(bool_str),
        _ => None,
    };
    parsed.map(Value::Bool).unwrap_or(Value::Null)
}

// ── String parsers ───────────────────────────────────────────

fn trimmed(s: &str) -> Option<&str> {
    let t = s.trim();
    (!t.is_empty()).then_some(t)
}

pub fn decimal_str(s: &str) -> Option<Decimal> {
    Decimal::from_str(s)
        .or_else(|_| Decimal::from_scientific(s))
        .ok()
}

/// Drop `.` thousands separators, then use `,` as the decimal point.
pub fn br_decimal_str(s: &str) -> Option<Decimal> {
    let canonical = s.replace('.', "").replace(',', ".");
    Decimal::from_str(canonical.trim()).ok()
}

/// ISO date, Brazilian `DD/MM/YYYY`, or the date part of an ISO timestamp.
pub fn date_str(s: &str) -> Option<NaiveDate> {
    DATE_FORMATS
        .iter()
        .find_map(|f| NaiveDate::parse_from_str(s, f).ok())
        .or_else(|| {
            s.get(..10)
                .filter(|_| s.len() > 10)
                .and_then(|prefix| NaiveDate::parse_from_str(prefix, "%Y-%m-%d").ok())
        })
}

pub fn timestamp_str(s: &str) -> Option<NaiveDateTime> {
    TIMESTAMP_FORMATS
        .iter()
        .find_map(|f| NaiveDateTime::parse_from_str(s, f).ok())
        .or_else(|| DateTime::parse_from_rfc3339(s).ok().map(|d| d.naive_utc()))
        .or_else(|| date_str(s).and_then(|d| d.and_hms_opt(0, 0, 0)))
}

pub fn bool_str(s: &str) -> Option<bool> {
    match s.to_lowercase().as_str() {
        "true" | "t" | "s" | "sim" | "1" | "y" | "yes" => Some(true),
        "false" | "f" | "n" | "não" | "nao" | "0" | "no" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn dec(s: &str) -> Value {
        Value::Decimal(s.parse().unwrap())
    }

    #[test]
    fn br_decimal_strips_thousands_and_swaps_comma() {
        assert_eq!(br_decimal(&json!("1.234.567,89")), dec("1234567.89"));
        assert_eq!(br_decimal(&json!(" 12,5 ")), dec("12.5"));
        assert_eq!(br_decimal(&json!("-0,01")), dec("-0.01"));
        assert_eq!(br_decimal(&json!(1500.25)), dec("1500.25"));
    }

    #[test]
    fn br_decimal_is_parse_or_null() {
        assert_eq!(br_decimal(&json!("R$ 10,00")), Value::Null);
        assert_eq!(br_decimal(&json!("")), Value::Null);
        assert_eq!(br_decimal(&json!(null)), Value::Null);
        assert_eq!(br_decimal(&json!([1])), Value::Null);
    }

    #[test]
    fn dates_accept_iso_brazilian_and_timestamp_prefix() {
        let expected = Value::Date(NaiveDate::from_ymd_opt(2024, 3, 5).unwrap());
        assert_eq!(date(&json!("2024-03-05")), expected);
        assert_eq!(date(&json!("05/03/2024")), expected);
        assert_eq!(date(&json!("2024-03-05T10:20:30")), expected);
        assert_eq!(date(&json!("2024-13-05")), Value::Null);
        assert_eq!(date(&json!(20240305)), Value::Null);
    }

    #[test]
    fn timestamps() {
        let t = NaiveDate::from_ymd_opt(2024, 3, 5)
            .unwrap()
            .and_hms_opt(10, 20, 30)
            .unwrap();
        assert_eq!(timestamp(&json!("2024-03-05T10:20:30")), Value::Timestamp(t));
        assert_eq!(timestamp(&json!("2024-03-05 10:20:30.000")), Value::Timestamp(t));
        assert_eq!(
            timestamp(&json!("2024-03-05T13:20:30+03:00")),
            Value::Timestamp(t)
        );
    }

    #[test]
    fn booleans() {
        assert_eq!(boolean(&json!("S")), Value::Bool(true));
        assert_eq!(boolean(&json!("Não")), Value::Bool(false));
        assert_eq!(boolean(&json!(1)), Value::Bool(true));
        assert_eq!(boolean(&json!("talvez")), Value::Null);
    }

    #[test]
    fn text_trims_and_nulls_empty() {
        assert_eq!(text(&json!("  Senado  ")), Value::Text("Senado".into()));
        assert_eq!(text(&json!("   ")), Value::Null);
        assert_eq!(text(&json!(5012)), Value::Text("5012".into()));
    }

    #[test]
    fn integers() {
        assert_eq!(integer(&json!("2024")), Value::Int(2024));
        assert_eq!(integer(&json!(2024.0)), Value::Int(2024));
        assert_eq!(integer(&json!(2024.5)), Value::Null);
        assert_eq!(integer(&json!("dois")), Value::Null);
    }
}
