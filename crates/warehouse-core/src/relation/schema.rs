use serde::{Deserialize, Serialize};

use super::ColumnType;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Column {
    pub name: String,
    pub ty: ColumnType,
}

impl Column {
    pub fn new(name: impl Into<String>, ty: ColumnType) -> Self {
        Self {
            name: name.into(),
            ty,
        }
    }
}

/// Ordered column list of a relation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Schema {
    columns: Vec<Column>,
}

impl Schema {
    pub fn new(columns: Vec<Column>) -> Self {
        Self { columns }
    }

    pub fn from_pairs(pairs: &[(&str, ColumnType)]) -> Self {
        Self::new(
            pairs
                .iter()
                .map(|(name, ty)| Column::new(*name, *ty))
                .collect(),
        )
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c.name == name)
    }

    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name == name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.index_of(name).is_some()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.columns.iter().map(|c| c.name.as_str())
    }

    /// First column name that appears more than once, if any.
    pub fn first_duplicate(&self) -> Option<&str> {
        self.columns.iter().enumerate().find_map(|(i, c)| {
            self.columns[..i]
                .iter()
                .any(|prev| prev.name == c.name)
                .then_some(c.name.as_str())
        })
    }

    pub(crate) fn push(&mut self, column: Column) {
        self.columns.push(column);
    }

    pub(crate) fn remove(&mut self, name: &str) -> Option<usize> {
        let idx = self.index_of(name)?;
        self.columns.remove(idx);
        Some(idx)
    }

    pub(crate) fn set_type(&mut self, name: &str, ty: ColumnType) -> Option<usize> {
        let idx = self.index_of(name)?;
        self.columns[idx].ty = ty;
        Some(idx)
    }
}
