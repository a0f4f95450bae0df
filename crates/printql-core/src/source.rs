//! Row sources: where raw rows come from.

use crate::error::Result;
use crate::selection::ColumnLayout;
use printql_proto::Row;

/// Executes the tabular query implied by a column layout.
///
/// Row `i` column `j` must carry `layout.columns()[j]`. Missing trailing
/// columns are read as null.
pub trait RowSource {
    /// Fetch all rows.
    fn fetch(&mut self, layout: &ColumnLayout) -> Result<Vec<Row>>;
}

/// Pre-fetched rows, handed out once.
impl RowSource for Vec<Row> {
    fn fetch(&mut self, _layout: &ColumnLayout) -> Result<Vec<Row>> {
        Ok(std::mem::take(self))
    }
}
