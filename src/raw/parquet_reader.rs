//! Parquet extracts via the parquet-rs row API.

use std::fs::File;
use std::path::Path;

use chrono::{DateTime, NaiveDate};
use parquet::file::reader::FileReader;
use parquet::file::serialized_reader::SerializedFileReader;
use parquet::record::Field;
use rust_decimal::Decimal;
use serde_json::{Number, Value as Json};

use super::RawRecord;
use crate::error::Result;

pub fn read_parquet(path: &Path) -> Result<Vec<RawRecord>> {
    let reader = SerializedFileReader::new(File::open(path)?)?;
    let rows = reader.metadata().file_metadata().num_rows();
    let mut records = Vec::with_capacity(usize::try_from(rows).unwrap_or_default());
    for row in reader.get_row_iter(None)? {
        let row = row?;
        let record: RawRecord = row
            .get_column_iter()
            .map(|(name, field)| (name.clone(), field_to_json(field)))
            .collect();
        records.push(record);
    }
    Ok(records)
}

/// Convert one parquet field to an untyped value. Temporal logical types
/// become ISO strings. Decimals become JSON numbers: text in extracts is
/// Brazilian-formatted, so a plain `1234.56` string would lose its point.
fn field_to_json(field: &Field) -> Json {
    match field {
        Field::Null => Json::Null,
        Field::Bool(v) => Json::Bool(*v),
        Field::Byte(v) => Json::from(*v),
        Field::Short(v) => Json::from(*v),
        Field::Int(v) => Json::from(*v),
        Field::Long(v) => Json::from(*v),
        Field::UByte(v) => Json::from(*v),
        Field::UShort(v) => Json::from(*v),
        Field::UInt(v) => Json::from(*v),
        Field::ULong(v) => Json::from(*v),
        Field::Float16(v) => float(v.to_f64()),
        Field::Float(v) => float(f64::from(*v)),
        Field::Double(v) => float(*v),
        Field::Str(v) => Json::String(v.clone()),
        Field::Bytes(v) => match v.as_utf8() {
            Ok(s) => Json::String(s.to_string()),
            Err(_) => Json::Null,
        },
        Field::Date(days) => NaiveDate::from_ymd_opt(1970, 1, 1)
            .and_then(|epoch| epoch.checked_add_signed(chrono::Duration::days(i64::from(*days))))
            .map(|d| Json::String(d.format("%Y-%m-%d").to_string()))
            .unwrap_or(Json::Null),
        Field::TimestampMillis(ms) => timestamp(DateTime::from_timestamp_millis(*ms)),
        Field::TimestampMicros(us) => timestamp(DateTime::from_timestamp_micros(*us)),
        Field::Decimal(d) => {
            let unscaled = decimal_bytes_to_i128(d.data());
            u32::try_from(d.scale())
                .ok()
                .and_then(|scale| Decimal::try_from_i128_with_scale(unscaled, scale).ok())
                .and_then(|dec| dec.to_string().parse::<Number>().ok())
                .map(Json::Number)
                .unwrap_or(Json::Null)
        }
        // nested groups, lists and maps
        _ => Json::String(field.to_string()),
    }
}

fn float(v: f64) -> Json {
    Number::from_f64(v).map(Json::Number).unwrap_or(Json::Null)
}

fn timestamp(ts: Option<DateTime<chrono::Utc>>) -> Json {
    ts.map(|t| Json::String(t.naive_utc().format("%Y-%m-%dT%H:%M:%S").to_string()))
        .unwrap_or(Json::Null)
}

/// Big-endian two's complement bytes to i128, sign-extended.
fn decimal_bytes_to_i128(bytes: &[u8]) -> i128 {
    if bytes.is_empty() {
        return 0;
    }
    let bytes = if bytes.len() > 16 {
        &bytes[bytes.len() - 16..]
    } else {
        bytes
    };
    let fill = if bytes[0] & 0x80 != 0 { 0xFF } else { 0x00 };
    let mut buf = [fill; 16];
    buf[16 - bytes.len()..].copy_from_slice(bytes);
    i128::from_be_bytes(buf)
}
