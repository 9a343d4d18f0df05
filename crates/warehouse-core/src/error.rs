use thiserror::Error;

use crate::relation::ColumnType;

pub type Result<T> = std::result::Result<T, WarehouseError>;

#[derive(Debug, Error)]
pub enum WarehouseError {
    #[error("table not found: {0}")]
    TableNotFound(String),

    #[error("column '{column}' not found in {table}")]
    ColumnNotFound { table: String, column: String },

    #[error("duplicate column '{column}' in schema of {table}")]
    DuplicateColumn { table: String, column: String },

    #[error("row arity mismatch in {table}: expected {expected} values, found {found}")]
    ArityMismatch {
        table: String,
        expected: usize,
        found: usize,
    },

    #[error("duplicate business key in {table}: {key}")]
    DuplicateBusinessKey { table: String, key: String },

    #[error("null business key column '{column}' in {table}")]
    NullBusinessKey { table: String, column: String },

    #[error("incompatible type change on {table}.{column}: {from} -> {to}")]
    IncompatibleTypeChange {
        table: String,
        column: String,
        from: ColumnType,
        to: ColumnType,
    },

    #[error("schema change rejected for {table}: {reason}")]
    SchemaChangeRejected { table: String, reason: String },

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("store: {0}")]
    Store(#[from] anyhow::Error),
}

impl WarehouseError {
    /// True for failures that leave the target table untouched and only
    /// concern the data handed to a single build.
    pub fn is_data_error(&self) -> bool {
        matches!(
            self,
            Self::DuplicateBusinessKey { .. }
                | Self::NullBusinessKey { .. }
                | Self::ArityMismatch { .. }
        )
    }
}
