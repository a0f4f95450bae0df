//! The evaluator: a cursor over the access-filtered logical rows of a selection.
//!
//! The first call to [`next`](Evaluator::next), [`count`](Evaluator::count),
//! [`get`](Evaluator::get) or [`attribute`](Evaluator::attribute) initializes
//! the evaluator: the selection is squashed, every identity on an
//! access-checked path is registered with [`Access`], and all cursors are
//! rewound. Base rows the caller may not see are skipped by `next`.
//!
//! A failing access service is fatal: the error is returned by that call and
//! by every later one, and the cursor never resumes.

mod mask;
mod row_map;

pub use row_map::RowMap;

use crate::access::{Access, AccessCheck};
use crate::catalog::AttributeDef;
use crate::config::EvaluatorConfig;
use crate::error::{Error, Result};
use crate::phrase::{MessageFormatter, PhraseHelper};
use crate::select::Slot;
use crate::selection::{PathId, Selection};
use crate::source::RowSource;
use printql_proto::{Identity, PhraseKind, Value};
use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, instrument};

/// Addresses an output by position or by alias.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutputRef {
    /// Position in request order.
    Index(usize),
    /// Alias, rendered expression, or phrase alias.
    Alias(String),
}

impl From<usize> for OutputRef {
    fn from(index: usize) -> Self {
        OutputRef::Index(index)
    }
}

impl From<&str> for OutputRef {
    fn from(alias: &str) -> Self {
        OutputRef::Alias(alias.to_string())
    }
}

impl From<String> for OutputRef {
    fn from(alias: String) -> Self {
        OutputRef::Alias(alias)
    }
}

/// What an output reference resolved to.
enum Target {
    Output(usize),
    Phrase(usize),
}

/// Cursor over one executed statement.
pub struct Evaluator {
    selection: Selection,
    service: Option<Arc<dyn AccessCheck>>,
    access: Access,
    config: EvaluatorConfig,
    phrases: PhraseHelper,
    initialized: bool,
}

impl Evaluator {
    /// Create an evaluator checking access with `service`.
    pub fn new(selection: Selection, service: Arc<dyn AccessCheck>, config: EvaluatorConfig) -> Self {
        Self {
            selection,
            service: Some(service),
            access: Access::allow_all(),
            config,
            phrases: PhraseHelper::default(),
            initialized: false,
        }
    }

    /// Create an evaluator that never checks access.
    pub fn privileged(selection: Selection) -> Self {
        Self {
            selection,
            service: None,
            access: Access::allow_all(),
            config: EvaluatorConfig::privileged(),
            phrases: PhraseHelper::default(),
            initialized: false,
        }
    }

    /// Fetch the selection's rows from `source`, ingest them, and wrap the result.
    pub fn execute(
        mut selection: Selection,
        source: &mut dyn RowSource,
        service: Arc<dyn AccessCheck>,
        config: EvaluatorConfig,
    ) -> Result<Self> {
        let rows = source.fetch(selection.layout())?;
        selection.add_rows(&rows)?;
        Ok(Self::new(selection, service, config))
    }

    /// Use `formatter` for message phrases.
    pub fn with_formatter(mut self, formatter: Arc<dyn MessageFormatter>) -> Self {
        self.phrases = PhraseHelper::new(formatter);
        self
    }

    /// The underlying selection.
    pub fn selection(&self) -> &Selection {
        &self.selection
    }

    /// The configuration.
    pub fn config(&self) -> &EvaluatorConfig {
        &self.config
    }

    /// Check if the evaluator was initialized.
    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    #[instrument(skip(self), fields(raw_rows = self.selection.raw_rows()))]
    fn init(&mut self) -> Result<()> {
        if self.initialized {
            return Ok(());
        }
        self.selection.squash();

        self.access = match (&self.service, self.config.enforce_access) {
            (Some(service), true) => {
                let candidates = self.candidates();
                debug!(candidates = candidates.len(), "access candidates collected");
                Access::build(self.config.access_kind, Arc::clone(service), candidates)
            }
            _ => Access::allow_all(),
        };

        for select in self.selection.all_selects_mut() {
            select.reset();
        }
        self.initialized = true;
        debug!(logical_rows = self.selection.row_count(), "evaluator initialized");
        Ok(())
    }

    /// Initialize, then refuse to go on once the access service failed.
    fn ready(&mut self) -> Result<()> {
        self.init()?;
        match self.access.failure() {
            Some(failure) => Err(failure.clone().into()),
            None => Ok(()),
        }
    }

    /// Every distinct identity on an access-checked path, across all logical rows.
    fn candidates(&self) -> HashSet<Identity> {
        fn flatten(slot: &Slot, out: &mut HashSet<Identity>) {
            match slot {
                Slot::Group(members) => members.iter().for_each(|m| flatten(m, out)),
                other => out.extend(other.identity()),
            }
        }

        let mut out = HashSet::new();
        for (index, path) in self.selection.paths().iter().enumerate() {
            if !path.access_checked {
                continue;
            }
            if let Some(select) = self.selection.instance_select(PathId(index)) {
                select.buffer().iter().for_each(|slot| flatten(slot, &mut out));
            }
        }
        out
    }

    /// Advance to the next logical row whose base record is visible.
    pub fn next(&mut self) -> Result<bool> {
        self.ready()?;
        loop {
            let mut more = false;
            for (index, select) in self.selection.all_selects_mut().enumerate() {
                let advanced = select.next();
                if index == 0 {
                    more = advanced;
                }
            }
            if !more {
                debug!("cursor exhausted");
                return Ok(false);
            }
            let base = self
                .selection
                .root_select()
                .current_slot()
                .and_then(Slot::identity);
            if let Some(base) = base {
                if self.access.has_access(&base)? {
                    return Ok(true);
                }
            }
        }
    }

    /// Number of logical rows, including rows `next` will skip.
    pub fn count(&mut self) -> Result<u64> {
        self.ready()?;
        Ok(self.selection.row_count() as u64)
    }

    /// Value of an output or phrase at the current row.
    pub fn get(&mut self, output: impl Into<OutputRef>) -> Result<Value> {
        self.ready()?;
        let target = self.resolve(&output.into())?;
        let row = self.current_row()?;
        match target {
            Target::Output(index) => self.value_at(index, row),
            Target::Phrase(index) => self.phrase_at(index, row),
        }
    }

    /// Attribute read by an output; `None` for non-attribute outputs and phrases.
    pub fn attribute(&mut self, output: impl Into<OutputRef>) -> Result<Option<&AttributeDef>> {
        self.ready()?;
        match self.resolve(&output.into())? {
            Target::Output(index) => Ok(self.selection.selects[index].attribute()),
            Target::Phrase(_) => Ok(None),
        }
    }

    /// Rewind the cursor before the first row.
    pub fn reset(&mut self) {
        for select in self.selection.all_selects_mut() {
            select.reset();
        }
    }

    /// Drive the cursor to the end, collecting every remaining row.
    pub fn to_row_maps(&mut self) -> Result<Vec<RowMap>> {
        let mut rows = Vec::new();
        while self.next()? {
            let row = self.current_row()?;
            let mut fields =
                Vec::with_capacity(self.selection.output_count + self.selection.phrases.len());
            for index in 0..self.selection.output_count {
                let key = self.selection.selects[index].key().to_string();
                fields.push((key, self.value_at(index, row)?));
            }
            for index in 0..self.selection.phrases.len() {
                let alias = self.selection.phrases[index].alias.clone();
                fields.push((alias, self.phrase_at(index, row)?));
            }
            rows.push(RowMap::new(fields));
        }
        Ok(rows)
    }

    /// Like [`to_row_maps`](Self::to_row_maps), values only.
    pub fn to_object_list(&mut self) -> Result<Vec<Vec<Value>>> {
        Ok(self
            .to_row_maps()?
            .into_iter()
            .map(RowMap::into_values)
            .collect())
    }

    fn resolve(&self, output: &OutputRef) -> Result<Target> {
        match output {
            OutputRef::Index(index) if *index < self.selection.output_count => {
                Ok(Target::Output(*index))
            }
            OutputRef::Index(index) => Err(Error::UnknownOutput(index.to_string())),
            OutputRef::Alias(alias) => {
                if let Some(index) = self.selection.find_output(alias) {
                    return Ok(Target::Output(index));
                }
                self.selection
                    .phrases
                    .iter()
                    .position(|p| &p.alias == alias)
                    .map(Target::Phrase)
                    .ok_or_else(|| Error::UnknownOutput(alias.clone()))
            }
        }
    }

    fn current_row(&self) -> Result<usize> {
        let root = self.selection.root_select();
        root.position()
            .filter(|&row| row < root.len())
            .ok_or(Error::NoCurrentRow)
    }

    fn value_at(&mut self, index: usize, row: usize) -> Result<Value> {
        let select = &self.selection.selects[index];
        mask::read(
            &self.selection,
            &mut self.access,
            select,
            row,
            &self.config.default_join_separator,
        )
    }

    fn phrase_at(&mut self, index: usize, row: usize) -> Result<Value> {
        let binding = self.selection.phrases[index].clone();
        let mut values = Vec::with_capacity(binding.selects.len());
        for (alias, select) in &binding.selects {
            values.push((alias.clone(), self.value_at(*select, row)?));
        }
        let text = match &binding.kind {
            PhraseKind::Template(template) => self.phrases.render_template(template, &values),
            PhraseKind::Message(key) => self.phrases.render_message(key, &values)?,
        };
        Ok(Value::String(text))
    }
}

impl fmt::Debug for Evaluator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Evaluator")
            .field("selection", &self.selection)
            .field("checked", &self.service.is_some())
            .field("access", &self.access)
            .field("config", &self.config)
            .field("initialized", &self.initialized)
            .finish()
    }
}
