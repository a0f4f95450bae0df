//! Join paths and the column layout the row source must deliver.

use printql_proto::TypeId;
use std::collections::HashMap;
use std::fmt;

/// Index of a join path within its selection. The root path is always 0.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PathId(pub usize);

impl PathId {
    /// The base path every output starts from.
    pub const ROOT: PathId = PathId(0);

    /// Check if this is the base path.
    pub fn is_root(&self) -> bool {
        *self == Self::ROOT
    }
}

impl fmt::Display for PathId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Columns identifying the record reached at a join path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IdentityColumns {
    /// Column carrying the numeric id.
    pub id: usize,
    /// Column carrying the concrete type, present when the declared type has subtypes.
    pub type_column: Option<usize>,
    /// Type declared by the schema for this path.
    pub declared: TypeId,
}

/// A distinct join path of a selection.
#[derive(Debug, Clone)]
pub struct JoinPath {
    /// Path key, e.g. `linkfrom[Position#Invoice].linkto[Product]`; empty for the root.
    pub key: String,
    /// Enclosing path; `None` for the root.
    pub parent: Option<PathId>,
    /// Type reached at this path.
    pub type_id: TypeId,
    /// Whether reaching this path fans one parent out into many rows.
    pub squashable: bool,
    /// Whether identities at this path take part in access checks.
    pub access_checked: bool,
    /// Identity columns of this path.
    pub identity: IdentityColumns,
}

/// What a column carries.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ColumnKind {
    /// Numeric id of the record at the path.
    Id,
    /// Concrete type (id or name) of the record at the path.
    Type,
    /// Value of the named attribute of the record at the path.
    Attribute(String),
}

/// One column of the tabular query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnSpec {
    /// Path the column belongs to.
    pub path: PathId,
    /// Key of that path.
    pub path_key: String,
    /// Name of the type the column is read from.
    pub type_name: String,
    /// Column content.
    pub kind: ColumnKind,
}

/// Ordered column layout; row `i` column `j` must carry `columns()[j]`.
#[derive(Debug, Clone, Default)]
pub struct ColumnLayout {
    columns: Vec<ColumnSpec>,
    attributes: HashMap<(PathId, String), usize>,
}

impl ColumnLayout {
    /// Create an empty layout.
    pub fn new() -> Self {
        Self::default()
    }

    /// All columns in row order.
    pub fn columns(&self) -> &[ColumnSpec] {
        &self.columns
    }

    /// Number of columns.
    pub fn len(&self) -> usize {
        self.columns.len()
    }

    /// Check if the layout has no columns.
    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    /// Column of an attribute read at a path, if one was allocated.
    pub fn attribute_column(&self, path: PathId, attribute: &str) -> Option<usize> {
        self.attributes.get(&(path, attribute.to_string())).copied()
    }

    pub(crate) fn push(
        &mut self,
        path: PathId,
        path_key: &str,
        type_name: &str,
        kind: ColumnKind,
    ) -> usize {
        let index = self.columns.len();
        self.columns.push(ColumnSpec {
            path,
            path_key: path_key.to_string(),
            type_name: type_name.to_string(),
            kind,
        });
        index
    }

    /// Column for an attribute at a path, allocated on first use.
    pub(crate) fn attribute(
        &mut self,
        path: PathId,
        path_key: &str,
        type_name: &str,
        attribute: &str,
    ) -> usize {
        if let Some(&index) = self.attributes.get(&(path, attribute.to_string())) {
            return index;
        }
        let index = self.push(
            path,
            path_key,
            type_name,
            ColumnKind::Attribute(attribute.to_string()),
        );
        self.attributes.insert((path, attribute.to_string()), index);
        index
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_attribute_columns_are_shared() {
        let mut layout = ColumnLayout::new();
        let id = layout.push(PathId::ROOT, "", "Invoice", ColumnKind::Id);
        let name = layout.attribute(PathId::ROOT, "", "Invoice", "Name");
        let again = layout.attribute(PathId::ROOT, "", "Invoice", "Name");
        let other_path = layout.attribute(PathId(1), "linkto[Customer]", "Customer", "Name");

        assert_eq!(id, 0);
        assert_eq!(name, 1);
        assert_eq!(again, 1);
        assert_eq!(other_path, 2);
        assert_eq!(layout.len(), 3);
        assert_eq!(layout.attribute_column(PathId::ROOT, "Name"), Some(1));
        assert_eq!(layout.attribute_column(PathId::ROOT, "Date"), None);
        assert_eq!(
            layout.columns()[2].kind,
            ColumnKind::Attribute("Name".to_string())
        );
    }

    #[test]
    fn test_root_path() {
        assert!(PathId::ROOT.is_root());
        assert!(!PathId(3).is_root());
        assert_eq!(PathId(3).to_string(), "#3");
    }
}
