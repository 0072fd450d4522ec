use std::ops::Index;

use crate::types::SqlValue;

/// A single decoded result row.
///
/// Rows are immutable ordered tuples of values, never the mutable native
/// row object handed back by the bridge. This guarantees positional access
/// and prevents downstream aliasing bugs.
#[derive(Debug, Clone, PartialEq)]
pub struct Row {
    values: Vec<SqlValue>,
}

impl Row {
    pub fn new(values: Vec<SqlValue>) -> Self {
        Self { values }
    }

    /// Gets a value by zero-based column position.
    pub fn get(&self, index: usize) -> Option<&SqlValue> {
        self.values.get(index)
    }

    /// Returns the number of columns in this row.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Returns true if this row has no columns.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn values(&self) -> &[SqlValue] {
        &self.values
    }

    pub fn into_values(self) -> Vec<SqlValue> {
        self.values
    }
}

impl Index<usize> for Row {
    type Output = SqlValue;

    fn index(&self, index: usize) -> &SqlValue {
        &self.values[index]
    }
}

impl IntoIterator for Row {
    type Item = SqlValue;
    type IntoIter = std::vec::IntoIter<SqlValue>;

    fn into_iter(self) -> Self::IntoIter {
        self.values.into_iter()
    }
}

impl From<Vec<SqlValue>> for Row {
    fn from(values: Vec<SqlValue>) -> Self {
        Row::new(values)
    }
}

/// Describes one column of an open result set, in the shape the execution
/// framework expects from a cursor `description`.
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnDescription {
    pub name: String,
    pub type_name: String,
    pub nullable: bool,
}

impl ColumnDescription {
    pub fn new(name: impl Into<String>, type_name: impl Into<String>, nullable: bool) -> Self {
        Self {
            name: name.into(),
            type_name: type_name.into(),
            nullable,
        }
    }
}
