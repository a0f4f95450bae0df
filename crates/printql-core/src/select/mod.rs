//! Selects: one requested output with its element chain, value buffer and cursor.

mod decode;
mod element;
mod slot;

pub use decode::{convert, RowDecodeWarning};
pub use element::Element;
pub use slot::{Deferred, Slot};

pub(crate) use decode::read_identity;

use crate::catalog::{AttributeDef, Schema};
use crate::error::Result;
use crate::selection::PathId;
use printql_proto::{Row, Value};

/// One output expression bound to a selection.
///
/// The buffer holds one slot per ingested raw row until the selection is
/// squashed, then one slot per logical row.
#[derive(Debug)]
pub struct Select {
    key: String,
    alias: Option<String>,
    elements: Vec<Element>,
    attribute: Option<AttributeDef>,
    path: PathId,
    buffer: Vec<Slot>,
    cursor: Option<usize>,
}

impl Select {
    /// Create a select over a resolved chain.
    pub fn new(
        key: impl Into<String>,
        alias: Option<String>,
        elements: Vec<Element>,
        attribute: Option<AttributeDef>,
    ) -> Self {
        let path = elements
            .iter()
            .rev()
            .find_map(Element::path)
            .unwrap_or(PathId::ROOT);
        Self {
            key: key.into(),
            alias,
            elements,
            attribute,
            path,
            buffer: Vec::new(),
            cursor: None,
        }
    }

    /// Name the select is addressed by: alias or rendered expression.
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Alias, if one was given.
    pub fn alias(&self) -> Option<&str> {
        self.alias.as_deref()
    }

    /// The element chain.
    pub fn elements(&self) -> &[Element] {
        &self.elements
    }

    /// Attribute the select reads, if its last value-producing step is one.
    pub fn attribute(&self) -> Option<&AttributeDef> {
        self.attribute.as_ref()
    }

    /// Deepest join path of the chain.
    pub fn path(&self) -> PathId {
        self.path
    }

    /// Evaluate the chain on one raw row and append the result.
    pub fn add_object(&mut self, row: &Row, schema: &Schema) -> Result<()> {
        let slot = self
            .elements
            .iter()
            .fold(Slot::null(), |input, element| element.extract(row, input, schema));
        self.buffer.push(slot);
        Ok(())
    }

    /// Advance the cursor; false once past the last slot.
    pub fn next(&mut self) -> bool {
        let next = self.cursor.map_or(0, |c| c + 1);
        if next < self.buffer.len() {
            self.cursor = Some(next);
            true
        } else {
            self.cursor = Some(self.buffer.len());
            false
        }
    }

    /// Move the cursor before the first slot.
    pub fn reset(&mut self) {
        self.cursor = None;
    }

    /// Cursor position, if started.
    pub fn position(&self) -> Option<usize> {
        self.cursor
    }

    /// Slot under the cursor.
    pub fn current_slot(&self) -> Option<&Slot> {
        self.cursor.and_then(|c| self.buffer.get(c))
    }

    /// Value under the cursor, computing deferred values.
    pub fn current(&self) -> Option<Value> {
        self.current_slot().map(Slot::resolve)
    }

    /// Number of buffered slots.
    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    /// Check if nothing was buffered.
    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    /// All buffered slots.
    pub fn buffer(&self) -> &[Slot] {
        &self.buffer
    }

    /// Terminal aggregator, if any.
    pub fn aggregator(&self) -> Option<&Element> {
        self.elements.last().filter(|e| e.is_aggregator())
    }

    /// Check if the chain crosses a one-to-many step.
    pub fn is_multi_valued(&self) -> bool {
        self.elements.iter().any(Element::is_squashable)
    }

    /// Check if the chain ends (before any aggregator) in an instance.
    pub fn is_instance(&self) -> bool {
        matches!(
            self.elements.iter().rev().find(|e| !e.is_aggregator()),
            Some(Element::Instance { .. })
        )
    }

    pub(crate) fn take_buffer(&mut self) -> Vec<Slot> {
        self.cursor = None;
        std::mem::take(&mut self.buffer)
    }

    pub(crate) fn replace_buffer(&mut self, buffer: Vec<Slot>) {
        self.cursor = None;
        self.buffer = buffer;
    }
}
