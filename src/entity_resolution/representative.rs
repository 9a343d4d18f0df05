//! Representative-row selection.
//!
//! Several raw rows can describe the same logical entity (one amendment
//! appears on every one of its expense documents; one deputy once per
//! legislature). Exactly one row per entity is kept: the first under a total
//! ordering that ends in a unique tiebreak column, so the choice never
//! depends on input order.

use tracing::warn;
use warehouse_core::{Relation, SortKey};

use crate::error::Result;

/// Ordering used to pick the representative within each group.
#[derive(Debug, Clone)]
pub struct Precedence {
    /// `(column, descending)`, most significant first. Nulls always sort last.
    pub keys: Vec<(String, bool)>,
}

impl Precedence {
    pub fn latest_first(columns: &[&str]) -> Self {
        Self {
            keys: columns.iter().map(|c| (c.to_string(), true)).collect(),
        }
    }
}

/// One row per distinct non-null `group` value, ordered by that value.
/// Rows with a null group value are dropped.
pub fn select_representatives(
    relation: &Relation,
    group: &str,
    precedence: &Precedence,
) -> Result<Relation> {
    let g = relation.col(group)?;
    let mut keys = vec![SortKey::asc(g)];
    for (column, descending) in &precedence.keys {
        let idx = relation.col(column)?;
        keys.push(SortKey {
            column: idx,
            descending: *descending,
            nulls_last: true,
        });
    }

    let mut sorted = relation.clone();
    sorted.sort_by_keys(&keys);

    let mut out = Relation::new(relation.name(), relation.schema().clone());
    let mut dropped = 0usize;
    let mut last_group = None;
    for row in sorted.into_rows() {
        if row[g].is_null() {
            dropped += 1;
            continue;
        }
        if last_group.as_ref() == Some(&row[g]) {
            continue;
        }
        last_group = Some(row[g].clone());
        out.push(row)?;
    }
    if dropped > 0 {
        warn!(
            table = relation.name(),
            column = group,
            dropped,
            "rows without an entity key ignored"
        );
    }
    Ok(out)
}
