//! SQL text helpers.

use warehouse_core::{ColumnType, Schema};

/// Double-quote an identifier.
pub(crate) fn ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

/// Map an `information_schema.columns.data_type` to the warehouse type.
pub(crate) fn column_type_from_pg(data_type: &str) -> ColumnType {
    match data_type {
        "boolean" => ColumnType::Boolean,
        "smallint" | "integer" | "bigint" => ColumnType::Integer,
        "numeric" | "real" | "double precision" => ColumnType::Decimal,
        "date" => ColumnType::Date,
        "timestamp without time zone" | "timestamp with time zone" => ColumnType::Timestamp,
        _ => ColumnType::Text,
    }
}

/// Column list with casts so every value decodes as the canonical Rust type
/// of its warehouse type (an `integer` column still reads as `i64`).
pub(crate) fn select_list(schema: &Schema) -> String {
    schema
        .columns()
        .iter()
        .map(|c| format!("{}::{}", ident(&c.name), c.ty.sql_name()))
        .collect::<Vec<_>>()
        .join(", ")
}
