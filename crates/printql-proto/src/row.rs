//! Raw rows handed over by the row source.

use crate::value::Value;
use serde::{Deserialize, Serialize};

/// One fixed-width row of raw column values, in the column order requested
/// by the selection's layout.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Row {
    columns: Vec<Value>,
}

impl Row {
    /// Create a row from its column values.
    pub fn new(columns: Vec<Value>) -> Self {
        Self { columns }
    }

    /// Get a column by index.
    pub fn get(&self, index: usize) -> Option<&Value> {
        self.columns.get(index)
    }

    /// Number of columns in the row.
    pub fn len(&self) -> usize {
        self.columns.len()
    }

    /// Check if the row has no columns.
    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    /// All column values.
    pub fn columns(&self) -> &[Value] {
        &self.columns
    }
}

impl From<Vec<Value>> for Row {
    fn from(columns: Vec<Value>) -> Self {
        Self::new(columns)
    }
}

impl FromIterator<Value> for Row {
    fn from_iter<I: IntoIterator<Item = Value>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}
