//! Selections: the structural analysis of one print statement.
//!
//! A [`Selection`] is built once from a statement and the schema. It owns one
//! [`Select`] per requested output, one identity select per join path, and
//! the [`ColumnLayout`] the row source has to deliver. Raw rows are then fed
//! in with [`Selection::add_object`] and regrouped by [`Selection::squash`].

mod layout;
mod planner;

pub use layout::{ColumnKind, ColumnLayout, ColumnSpec, IdentityColumns, JoinPath, PathId};

use crate::catalog::Schema;
use crate::config::SelectionBudget;
use crate::error::{Error, Result};
use crate::exec::ProgramRegistry;
use crate::select::{read_identity, Select};
use planner::Planner;
use printql_proto::{PhraseKind, PrintStatement, Row, TypeId};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, instrument, warn};

/// A phrase bound to the selects of its sub-expressions.
#[derive(Debug, Clone)]
pub struct PhraseBinding {
    /// Alias the phrase is read by.
    pub alias: String,
    /// Template or message key.
    pub kind: PhraseKind,
    /// Sub-expression aliases and the index of their select.
    pub selects: Vec<(String, usize)>,
}

/// The resolved output of a print statement.
#[derive(Debug)]
pub struct Selection {
    pub(crate) schema: Arc<Schema>,
    pub(crate) base_type: TypeId,
    pub(crate) paths: Vec<JoinPath>,
    pub(crate) path_index: HashMap<String, PathId>,
    pub(crate) layout: ColumnLayout,
    /// Requested outputs first, then phrase sub-expressions.
    pub(crate) selects: Vec<Select>,
    pub(crate) output_count: usize,
    /// One identity select per join path, indexed by `PathId`.
    pub(crate) instance_selects: Vec<Select>,
    pub(crate) phrases: Vec<PhraseBinding>,
    pub(crate) budget: SelectionBudget,
    pub(crate) raw_rows: usize,
    pub(crate) squashed: bool,
}

impl Selection {
    /// Build a selection with no exec programs and the default budget.
    pub fn build(statement: &PrintStatement, schema: &Arc<Schema>) -> Result<Self> {
        Self::build_with(
            statement,
            schema,
            &ProgramRegistry::default(),
            SelectionBudget::default(),
        )
    }

    /// Build a selection resolving exec steps against `registry`.
    #[instrument(skip_all, fields(types = ?statement.types, outputs = statement.outputs.len()))]
    pub fn build_with(
        statement: &PrintStatement,
        schema: &Arc<Schema>,
        registry: &ProgramRegistry,
        budget: SelectionBudget,
    ) -> Result<Self> {
        statement.validate()?;
        let base_type = Planner::base_type(schema, &statement.types)?;

        let mut planner = Planner::new(schema, registry, &budget, base_type);
        let mut selects = Vec::with_capacity(statement.outputs.len());
        for output in &statement.outputs {
            selects.push(planner.plan_output(output)?);
        }
        let output_count = selects.len();

        let mut phrases = Vec::with_capacity(statement.phrases.len());
        for phrase in &statement.phrases {
            let mut bound = Vec::with_capacity(phrase.expressions.len());
            for expression in &phrase.expressions {
                let alias = expression.key();
                bound.push((alias, selects.len()));
                selects.push(planner.plan_output(expression)?);
            }
            phrases.push(PhraseBinding {
                alias: phrase.alias.clone(),
                kind: phrase.kind.clone(),
                selects: bound,
            });
        }

        let Planner {
            paths,
            path_index,
            layout,
            instance_selects,
            ..
        } = planner;

        debug!(
            base_type = %schema.name(base_type),
            outputs = output_count,
            phrases = phrases.len(),
            paths = paths.len(),
            columns = layout.len(),
            "selection built"
        );

        Ok(Self {
            schema: Arc::clone(schema),
            base_type,
            paths,
            path_index,
            layout,
            selects,
            output_count,
            instance_selects,
            phrases,
            budget,
            raw_rows: 0,
            squashed: false,
        })
    }

    /// The schema the selection was built against.
    pub fn schema(&self) -> &Arc<Schema> {
        &self.schema
    }

    /// Common base type of the statement.
    pub fn base_type(&self) -> TypeId {
        self.base_type
    }

    /// Columns every raw row must carry, in order.
    pub fn layout(&self) -> &ColumnLayout {
        &self.layout
    }

    /// All join paths; index 0 is the root.
    pub fn paths(&self) -> &[JoinPath] {
        &self.paths
    }

    /// A join path.
    pub fn path(&self, id: PathId) -> Option<&JoinPath> {
        self.paths.get(id.0)
    }

    /// Look up a join path by key (`""` for the root).
    pub fn path_by_key(&self, key: &str) -> Option<PathId> {
        self.path_index.get(key).copied()
    }

    /// The requested outputs, in request order.
    pub fn outputs(&self) -> &[Select] {
        &self.selects[..self.output_count]
    }

    /// Find an output by alias or rendered expression.
    pub fn find_output(&self, key: &str) -> Option<usize> {
        self.outputs()
            .iter()
            .position(|s| s.alias() == Some(key))
            .or_else(|| self.outputs().iter().position(|s| s.key() == key))
    }

    /// Phrases layered on the outputs.
    pub fn phrases(&self) -> &[PhraseBinding] {
        &self.phrases
    }

    /// Identity select of a join path.
    pub fn instance_select(&self, path: PathId) -> Option<&Select> {
        self.instance_selects.get(path.0)
    }

    /// Identity select of the root path.
    pub fn root_select(&self) -> &Select {
        &self.instance_selects[PathId::ROOT.0]
    }

    /// Number of raw rows ingested.
    pub fn raw_rows(&self) -> usize {
        self.raw_rows
    }

    /// Number of rows in the root identity select: logical rows once squashed.
    pub fn row_count(&self) -> usize {
        self.root_select().len()
    }

    /// Check if the buffers were regrouped.
    pub fn is_squashed(&self) -> bool {
        self.squashed
    }

    /// Check if any select crosses a one-to-many step.
    pub fn is_multi_valued(&self) -> bool {
        self.selects.iter().any(Select::is_multi_valued)
    }

    /// Ingest one raw row into every select.
    ///
    /// Rows without a root identity carry no base record and are skipped.
    pub fn add_object(&mut self, row: &Row) -> Result<()> {
        if self.squashed {
            return Err(Error::RowSource(
                "rows added after the selection was squashed".to_string(),
            ));
        }
        let root = self.paths[PathId::ROOT.0].identity;
        if read_identity(row, &root, &self.schema).is_none() {
            warn!(row = self.raw_rows, "row without base identity skipped");
            return Ok(());
        }
        if self.raw_rows >= self.budget.max_rows {
            return Err(Error::BudgetExceeded(format!(
                "more than {} raw rows",
                self.budget.max_rows
            )));
        }
        self.raw_rows += 1;

        let schema = Arc::clone(&self.schema);
        for select in self.instance_selects.iter_mut().chain(self.selects.iter_mut()) {
            select.add_object(row, &schema)?;
        }
        Ok(())
    }

    /// Ingest many raw rows.
    pub fn add_rows<'r>(&mut self, rows: impl IntoIterator<Item = &'r Row>) -> Result<()> {
        for row in rows {
            self.add_object(row)?;
        }
        Ok(())
    }

    /// Regroup fanned-out raw rows into logical rows. Idempotent.
    pub fn squash(&mut self) {
        crate::squash::squash(self);
    }

    /// Squashable paths from the root down to `path`, root side first.
    pub fn levels(&self, path: PathId) -> Vec<PathId> {
        self.ancestry(path)
            .into_iter()
            .filter(|p| self.paths[p.0].squashable)
            .collect()
    }

    /// Access-checked paths below the root down to `path`, root side first.
    pub fn checked_paths(&self, path: PathId) -> Vec<PathId> {
        self.ancestry(path)
            .into_iter()
            .filter(|p| !p.is_root() && self.paths[p.0].access_checked)
            .collect()
    }

    /// `path` and its ancestors, root first.
    fn ancestry(&self, path: PathId) -> Vec<PathId> {
        let mut chain = Vec::new();
        let mut current = Some(path);
        while let Some(id) = current {
            chain.push(id);
            current = self.paths.get(id.0).and_then(|p| p.parent);
        }
        chain.reverse();
        chain
    }

    pub(crate) fn all_selects_mut(&mut self) -> impl Iterator<Item = &mut Select> {
        self.instance_selects.iter_mut().chain(self.selects.iter_mut())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{AttributeDef, ScalarType, TypeDef};
    use crate::exec::ExecError;
    use printql_proto::{OutputExpr, PhraseDef, Step, Value};

    fn schema() -> Arc<Schema> {
        Arc::new(
            Schema::builder()
                .with_type(
                    TypeDef::new("Document")
                        .with_id(1)
                        .with_attribute(AttributeDef::scalar("Name", ScalarType::String))
                        .with_classification("Approval"),
                )
                .with_type(TypeDef::new("Invoice").with_id(2).with_parent("Document"))
                .with_type(TypeDef::new("Receipt").with_id(3).with_parent("Document"))
                .with_type(
                    TypeDef::new("Customer")
                        .with_id(4)
                        .with_attribute(AttributeDef::scalar("Name", ScalarType::String)),
                )
                .with_type(
                    TypeDef::new("Position")
                        .with_id(5)
                        .with_attribute(AttributeDef::link_to("Invoice", "Invoice"))
                        .with_attribute(AttributeDef::link_to("Customer", "Customer"))
                        .with_attribute(AttributeDef::scalar("Amount", ScalarType::Int64)),
                )
                .with_type(
                    TypeDef::classification("Approval", "Document")
                        .with_id(6)
                        .with_attribute(AttributeDef::scalar("Approver", ScalarType::String)),
                )
                .build()
                .unwrap(),
        )
    }

    fn amounts() -> OutputExpr {
        OutputExpr::new(vec![
            Step::link_from("Position", "Invoice"),
            Step::attribute("Amount"),
        ])
    }

    #[test]
    fn test_build_paths_and_layout() {
        let statement = PrintStatement::for_type("Invoice")
            .select(OutputExpr::attribute("Name"))
            .select(amounts().with_alias("amounts"));
        let selection = Selection::build(&statement, &schema()).unwrap();

        assert_eq!(selection.base_type(), TypeId(2));
        assert_eq!(selection.paths().len(), 2);
        assert_eq!(selection.path_by_key(""), Some(PathId::ROOT));
        let positions = selection.path_by_key("linkfrom[Position#Invoice]").unwrap();
        assert!(selection.paths()[positions.0].squashable);

        // Invoice has no subtypes, so no type column at the root
        let kinds: Vec<_> = selection
            .layout()
            .columns()
            .iter()
            .map(|c| (c.path, c.kind.clone()))
            .collect();
        assert_eq!(
            kinds,
            vec![
                (PathId::ROOT, ColumnKind::Id),
                (PathId::ROOT, ColumnKind::Attribute("Name".into())),
                (positions, ColumnKind::Id),
                (positions, ColumnKind::Attribute("Amount".into())),
            ]
        );
        assert_eq!(selection.find_output("amounts"), Some(1));
        assert_eq!(selection.find_output("attribute[Name]"), Some(0));
        assert!(selection.outputs()[1].is_multi_valued());
        assert_eq!(selection.levels(positions), vec![positions]);
        assert_eq!(selection.checked_paths(positions), vec![positions]);
    }

    #[test]
    fn test_common_base_type() {
        let statement =
            PrintStatement::new(["Invoice", "Receipt"]).select(OutputExpr::attribute("Name"));
        let selection = Selection::build(&statement, &schema()).unwrap();
        assert_eq!(selection.base_type(), TypeId(1));
        // Document has subtypes: the root reads a type column
        assert_eq!(selection.layout().columns()[1].kind, ColumnKind::Type);
        assert_eq!(selection.paths()[0].identity.type_column, Some(1));
    }

    #[test]
    fn test_no_common_type() {
        let statement =
            PrintStatement::new(["Invoice", "Customer"]).select(OutputExpr::attribute("Name"));
        let err = Selection::build(&statement, &schema()).unwrap_err();
        assert!(matches!(err, Error::NoCommonType(_)));

        let statement = PrintStatement::new(Vec::<String>::new());
        assert!(matches!(
            Selection::build(&statement, &schema()).unwrap_err(),
            Error::NoCommonType(_)
        ));
    }

    #[test]
    fn test_schema_mismatch() {
        let statement = PrintStatement::for_type("Invoice").select(OutputExpr::attribute("Nmae"));
        let err = Selection::build(&statement, &schema()).unwrap_err();
        assert!(matches!(err, Error::SchemaMismatch { .. }));

        let statement = PrintStatement::for_type("Nope").select(OutputExpr::attribute("Name"));
        assert!(matches!(
            Selection::build(&statement, &schema()).unwrap_err(),
            Error::SchemaMismatch { .. }
        ));

        // Customer is not what Position.Invoice points at
        let statement = PrintStatement::for_type("Customer").select(amounts());
        assert!(matches!(
            Selection::build(&statement, &schema()).unwrap_err(),
            Error::SchemaMismatch { .. }
        ));

        let statement = PrintStatement::for_type("Customer")
            .select(OutputExpr::new(vec![Step::classification("Approval")]));
        assert!(matches!(
            Selection::build(&statement, &schema()).unwrap_err(),
            Error::SchemaMismatch { .. }
        ));
    }

    #[test]
    fn test_shared_paths() {
        let statement = PrintStatement::for_type("Invoice")
            .select(amounts())
            .select(OutputExpr::new(vec![
                Step::link_from("Position", "Invoice"),
                Step::link_to("Customer"),
                Step::attribute("Name"),
            ]))
            .select(OutputExpr::new(vec![
                Step::link_from("Position", "Invoice"),
                Step::link_to("Customer"),
            ]));
        let selection = Selection::build(&statement, &schema()).unwrap();

        assert_eq!(selection.paths().len(), 3);
        let customer = selection
            .path_by_key("linkfrom[Position#Invoice].linkto[Customer]")
            .unwrap();
        let positions = selection.path_by_key("linkfrom[Position#Invoice]").unwrap();
        assert_eq!(selection.paths()[customer.0].parent, Some(positions));
        assert!(!selection.paths()[customer.0].squashable);
        assert_eq!(selection.levels(customer), vec![positions]);
        assert_eq!(selection.checked_paths(customer), vec![positions, customer]);

        // A traversal at the end of a chain yields the instance
        assert!(selection.outputs()[2].is_instance());
        assert_eq!(selection.outputs()[1].path(), customer);
    }

    #[test]
    fn test_classification_path() {
        let statement = PrintStatement::for_type("Invoice").select(OutputExpr::new(vec![
            Step::classification("Approval"),
            Step::attribute("Approver"),
        ]));
        let selection = Selection::build(&statement, &schema()).unwrap();
        let class = selection.path_by_key("class[Approval]").unwrap();
        assert!(selection.paths()[class.0].squashable);
        assert!(selection.outputs()[0].is_multi_valued());
    }

    #[test]
    fn test_depth_budget() {
        let statement = PrintStatement::for_type("Invoice").select(OutputExpr::new(vec![
            Step::link_from("Position", "Invoice"),
            Step::link_to("Customer"),
        ]));
        let err = Selection::build_with(
            &statement,
            &schema(),
            &ProgramRegistry::default(),
            SelectionBudget::new(100, 1),
        )
        .unwrap_err();
        assert!(matches!(err, Error::BudgetExceeded(_)));
    }

    #[test]
    fn test_row_budget() {
        let statement = PrintStatement::for_type("Invoice").select(OutputExpr::attribute("Name"));
        let mut selection = Selection::build_with(
            &statement,
            &schema(),
            &ProgramRegistry::default(),
            SelectionBudget::new(1, 8),
        )
        .unwrap();
        let row = Row::new(vec![Value::Int64(1), Value::from("a")]);
        selection.add_object(&row).unwrap();
        assert!(matches!(
            selection.add_object(&row).unwrap_err(),
            Error::BudgetExceeded(_)
        ));
    }

    #[test]
    fn test_unknown_program() {
        let statement = PrintStatement::for_type("Invoice").select(
            OutputExpr::attribute("Name").then(Step::exec("missing", Vec::new())),
        );
        let err = Selection::build(&statement, &schema()).unwrap_err();
        assert!(matches!(err, Error::UnknownProgram(name) if name == "missing"));

        let registry = ProgramRegistry::new().with_program(
            "upper",
            |v: &Value, _: &[String]| -> std::result::Result<Value, ExecError> {
                Ok(Value::String(v.to_string().to_uppercase()))
            },
        );
        let statement = PrintStatement::for_type("Invoice").select(
            OutputExpr::attribute("Name").then(Step::exec("upper", Vec::new())),
        );
        assert!(
            Selection::build_with(&statement, &schema(), &registry, SelectionBudget::default())
                .is_ok()
        );
    }

    #[test]
    fn test_ingest_skips_rows_without_base() {
        let statement = PrintStatement::for_type("Invoice").select(OutputExpr::attribute("Name"));
        let mut selection = Selection::build(&statement, &schema()).unwrap();
        let rows = vec![
            Row::new(vec![Value::Int64(1), Value::from("a")]),
            Row::new(vec![Value::Null, Value::from("orphan")]),
            Row::new(Vec::new()),
        ];
        selection.add_rows(&rows).unwrap();
        assert_eq!(selection.raw_rows(), 1);
        assert_eq!(selection.row_count(), 1);
        assert_eq!(selection.outputs()[0].len(), 1);
    }

    #[test]
    fn test_phrase_selects() {
        let statement = PrintStatement::for_type("Invoice")
            .select(OutputExpr::attribute("Name"))
            .with_phrase(
                PhraseDef::template("title", "$<name> ($<oid>)")
                    .with_expression(OutputExpr::attribute("Name").with_alias("name"))
                    .with_expression(OutputExpr::new(vec![Step::Oid]).with_alias("oid")),
            );
        let selection = Selection::build(&statement, &schema()).unwrap();
        assert_eq!(selection.outputs().len(), 1);
        assert_eq!(selection.selects.len(), 3);
        let phrase = &selection.phrases()[0];
        assert_eq!(phrase.alias, "title");
        assert_eq!(
            phrase.selects,
            vec![("name".to_string(), 1), ("oid".to_string(), 2)]
        );
    }
}
