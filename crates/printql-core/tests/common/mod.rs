//! Shared fixtures: an invoicing schema and an in-memory row source.

#![allow(dead_code)]

use printql_core::catalog::{AttributeDef, ScalarType, Schema, TypeDef};
use printql_core::proto::{Identity, Row, TypeId, Value};
use printql_core::selection::{ColumnKind, ColumnLayout};
use printql_core::{Result, RowSource};
use std::collections::HashMap;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

pub const DOCUMENT: TypeId = TypeId(1);
pub const INVOICE: TypeId = TypeId(2);
pub const RECEIPT: TypeId = TypeId(3);
pub const CUSTOMER: TypeId = TypeId(4);
pub const POSITION: TypeId = TypeId(5);
pub const PRODUCT: TypeId = TypeId(6);
pub const DELIVERY: TypeId = TypeId(7);
pub const APPROVAL: TypeId = TypeId(8);
pub const NOTE: TypeId = TypeId(9);

pub const POSITIONS: &str = "linkfrom[Position#Invoice]";
pub const DELIVERIES: &str = "linkfrom[Position#Invoice].linkfrom[Delivery#Position]";
pub const APPROVALS: &str = "class[Approval]";
pub const CUSTOMER_LINK: &str = "linkto[Customer]";
pub const NOTES: &str = "attributeset[Notes]";

/// Route engine logs to the test output; filtered by `RUST_LOG`.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

pub fn schema() -> Arc<Schema> {
    Arc::new(
        Schema::builder()
            .with_type(
                TypeDef::new("Document")
                    .with_id(DOCUMENT.0)
                    .with_attribute(AttributeDef::scalar("Name", ScalarType::String))
                    .with_classification("Approval"),
            )
            .with_type(
                TypeDef::new("Invoice")
                    .with_id(INVOICE.0)
                    .with_parent("Document")
                    .with_attribute(AttributeDef::link_to("Customer", "Customer"))
                    .with_attribute(AttributeDef::link_from("Positions", "Position", "Invoice"))
                    .with_attribute(AttributeDef::attribute_set("Notes", "Note")),
            )
            .with_type(TypeDef::new("Receipt").with_id(RECEIPT.0).with_parent("Document"))
            .with_type(
                TypeDef::new("Customer")
                    .with_id(CUSTOMER.0)
                    .with_attribute(AttributeDef::scalar("Name", ScalarType::String)),
            )
            .with_type(
                TypeDef::new("Position")
                    .with_id(POSITION.0)
                    .with_attribute(AttributeDef::link_to("Invoice", "Invoice"))
                    .with_attribute(AttributeDef::link_to("Product", "Product"))
                    .with_attribute(AttributeDef::scalar("Amount", ScalarType::Int64))
                    .with_attribute(AttributeDef::scalar("Booked", ScalarType::Timestamp)),
            )
            .with_type(
                TypeDef::new("Product")
                    .with_id(PRODUCT.0)
                    .with_attribute(AttributeDef::scalar("Name", ScalarType::String)),
            )
            .with_type(
                TypeDef::new("Delivery")
                    .with_id(DELIVERY.0)
                    .with_attribute(AttributeDef::link_to("Position", "Position"))
                    .with_attribute(AttributeDef::scalar("Qty", ScalarType::Int64)),
            )
            .with_type(
                TypeDef::classification("Approval", "Document")
                    .with_id(APPROVAL.0)
                    .with_attribute(AttributeDef::scalar("Approver", ScalarType::String)),
            )
            .with_type(
                TypeDef::new("Note")
                    .with_id(NOTE.0)
                    .with_attribute(AttributeDef::scalar("Text", ScalarType::String)),
            )
            .build()
            .expect("fixture schema"),
    )
}

pub fn id(type_id: TypeId, id: u64) -> Identity {
    Identity::new(type_id, id)
}

/// Records by id; ids are unique across types.
#[derive(Debug, Default, Clone)]
pub struct Store {
    records: HashMap<u64, (String, HashMap<String, Value>)>,
}

impl Store {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, id: u64, type_name: &str, attributes: &[(&str, Value)]) -> Self {
        let attributes = attributes
            .iter()
            .map(|(name, value)| (name.to_string(), value.clone()))
            .collect();
        self.records.insert(id, (type_name.to_string(), attributes));
        self
    }

    /// Render joined rows: each raw row names the record id reached at each path key.
    pub fn rows(&self, layout: &ColumnLayout, joined: &[Vec<(&str, u64)>]) -> Vec<Row> {
        joined
            .iter()
            .map(|paths| {
                layout
                    .columns()
                    .iter()
                    .map(|column| {
                        let record = paths
                            .iter()
                            .find(|(key, _)| *key == column.path_key)
                            .map(|(_, id)| *id);
                        let Some(record) = record else {
                            return Value::Null;
                        };
                        match &column.kind {
                            ColumnKind::Id => Value::Int64(record as i64),
                            ColumnKind::Type => self
                                .records
                                .get(&record)
                                .map(|(type_name, _)| Value::String(type_name.clone()))
                                .unwrap_or(Value::Null),
                            ColumnKind::Attribute(name) => self
                                .records
                                .get(&record)
                                .and_then(|(_, attributes)| attributes.get(name))
                                .cloned()
                                .unwrap_or(Value::Null),
                        }
                    })
                    .collect()
            })
            .collect()
    }
}

/// Row source answering from a store and a fixed join result.
pub struct JoinedSource {
    pub store: Store,
    pub joined: Vec<Vec<(&'static str, u64)>>,
    pub fetches: usize,
}

impl JoinedSource {
    pub fn new(store: Store, joined: Vec<Vec<(&'static str, u64)>>) -> Self {
        Self {
            store,
            joined,
            fetches: 0,
        }
    }
}

impl RowSource for JoinedSource {
    fn fetch(&mut self, layout: &ColumnLayout) -> Result<Vec<Row>> {
        self.fetches += 1;
        Ok(self.store.rows(layout, &self.joined))
    }
}

/// Three invoices; the first has three positions, the second one, the third none.
pub fn invoicing() -> Store {
    Store::new()
        .with(1, "Invoice", &[("Name", Value::from("INV-1")), ("Customer", Value::Int64(50))])
        .with(2, "Invoice", &[("Name", Value::from("INV-2")), ("Customer", Value::Int64(51))])
        .with(3, "Invoice", &[("Name", Value::from("INV-3"))])
        .with(50, "Customer", &[("Name", Value::from("ACME"))])
        .with(51, "Customer", &[("Name", Value::from("Globex"))])
        .with(10, "Position", &[("Amount", Value::Int64(10)), ("Booked", Value::Timestamp(0))])
        .with(11, "Position", &[("Amount", Value::Int64(20)), ("Booked", Value::Timestamp(86_400_000_000))])
        .with(12, "Position", &[("Amount", Value::Int64(30))])
        .with(13, "Position", &[("Amount", Value::Int64(5))])
        .with(30, "Delivery", &[("Qty", Value::Int64(1))])
        .with(31, "Delivery", &[("Qty", Value::Int64(2))])
        .with(32, "Delivery", &[("Qty", Value::Int64(3))])
        .with(40, "Approval", &[("Approver", Value::from("ann"))])
        .with(41, "Approval", &[("Approver", Value::from("bob"))])
        .with(60, "Note", &[("Text", Value::from("paid"))])
}

/// Join result of invoices with their positions.
pub fn invoice_positions() -> Vec<Vec<(&'static str, u64)>> {
    vec![
        vec![("", 1), (CUSTOMER_LINK, 50), (POSITIONS, 10)],
        vec![("", 1), (CUSTOMER_LINK, 50), (POSITIONS, 11)],
        vec![("", 1), (CUSTOMER_LINK, 50), (POSITIONS, 12)],
        vec![("", 2), (CUSTOMER_LINK, 51), (POSITIONS, 13)],
        vec![("", 3)],
    ]
}
