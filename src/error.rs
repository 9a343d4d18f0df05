use std::path::PathBuf;

use thiserror::Error;
use warehouse_core::WarehouseError;

pub type Result<T> = std::result::Result<T, PipelineError>;

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error(transparent)]
    Warehouse(#[from] WarehouseError),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("yaml error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("json error in {path}:{line}: {source}")]
    Json {
        path: PathBuf,
        line: usize,
        source: serde_json::Error,
    },

    #[error("parquet error: {0}")]
    Parquet(#[from] parquet::errors::ParquetError),

    #[error("source unavailable: {0}")]
    SourceUnavailable(String),

    #[error("unknown stage: {0}")]
    UnknownStage(String),

    #[error("dependency cycle between stages: {0}")]
    DependencyCycle(String),
}

impl PipelineError {
    /// Errors that only concern the current stage's input data, as opposed
    /// to configuration or store failures.
    pub fn is_data_error(&self) -> bool {
        match self {
            PipelineError::Warehouse(e) => e.is_data_error(),
            PipelineError::Json { .. }
            | PipelineError::Parquet(_)
            | PipelineError::SourceUnavailable(_) => true,
            _ => false,
        }
    }
}
