use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use super::RawRecord;
use crate::error::{PipelineError, Result};

/// Read newline-delimited JSON objects. Blank lines are ignored.
pub fn read_jsonl(path: &Path) -> Result<Vec<RawRecord>> {
    let reader = BufReader::new(File::open(path)?);
    let mut records = Vec::new();
    for (i, line) in reader.lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        let record: RawRecord =
            serde_json::from_str(&line).map_err(|source| PipelineError::Json {
                path: path.to_path_buf(),
                line: i + 1,
                source,
            })?;
        records.push(record);
    }
    Ok(records)
}
