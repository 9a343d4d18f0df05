//! Raw extracts.
//!
//! The extraction layer drops one flat file per source domain into a raw
//! directory. Records are read untyped (JSON values keyed by column name);
//! typing happens in [`crate::staging`].

mod jsonl;
mod parquet_reader;

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::error::Result;

pub use self::jsonl::read_jsonl;
pub use self::parquet_reader::read_parquet;

/// One raw record: source column name to untyped value.
pub type RawRecord = serde_json::Map<String, serde_json::Value>;

pub trait RawSource: Send + Sync {
    /// All records of `source`, or `None` when the source has no extract.
    fn load(&self, source: &str) -> Result<Option<Vec<RawRecord>>>;
}

/// Reads `<root>/<source>.parquet`, falling back to `<root>/<source>.jsonl`.
#[derive(Debug, Clone)]
pub struct DirectorySource {
    root: PathBuf,
}

impl DirectorySource {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

impl RawSource for DirectorySource {
    fn load(&self, source: &str) -> Result<Option<Vec<RawRecord>>> {
        let parquet = self.root.join(format!("{source}.parquet"));
        if parquet.is_file() {
            debug!(source, path = %parquet.display(), "reading parquet extract");
            return read_parquet(&parquet).map(Some);
        }
        let jsonl = self.root.join(format!("{source}.jsonl"));
        if jsonl.is_file() {
            debug!(source, path = %jsonl.display(), "reading jsonl extract");
            return read_jsonl(&jsonl).map(Some);
        }
        Ok(None)
    }
}

/// Fixed records per source, for tests and embedding.
#[derive(Debug, Clone, Default)]
pub struct InMemorySource {
    sources: BTreeMap<String, Vec<RawRecord>>,
}

impl InMemorySource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, source: &str, records: Vec<RawRecord>) -> Self {
        self.sources.insert(source.to_string(), records);
        self
    }

    /// Build records from `serde_json::json!` objects; non-objects are skipped.
    pub fn with_json(self, source: &str, values: Vec<serde_json::Value>) -> Self {
        let records = values
            .into_iter()
            .filter_map(|v| match v {
                serde_json::Value::Object(map) => Some(map),
                _ => None,
            })
            .collect();
        self.with(source, records)
    }
}

impl RawSource for InMemorySource {
    fn load(&self, source: &str) -> Result<Option<Vec<RawRecord>>> {
        Ok(self.sources.get(source).cloned())
    }
}
