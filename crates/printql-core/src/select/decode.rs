//! Conversion of raw column values into typed values.

use crate::catalog::{ScalarType, Schema};
use crate::selection::IdentityColumns;
use chrono::{DateTime, NaiveDate};
use printql_proto::{Identity, Row, TypeId, Value};
use std::fmt;
use tracing::warn;

/// A column that could not be converted to its declared kind.
///
/// Never returned as an error: the value becomes null and the row still
/// contributes to the result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RowDecodeWarning {
    /// Column index in the raw row.
    pub column: usize,
    /// Kind the column was declared as.
    pub expected: String,
    /// What was found instead.
    pub found: String,
}

impl RowDecodeWarning {
    fn new(column: usize, expected: impl Into<String>, found: impl Into<String>) -> Self {
        Self {
            column,
            expected: expected.into(),
            found: found.into(),
        }
    }

    /// Log the warning.
    pub fn log(&self) {
        warn!(
            column = self.column,
            expected = %self.expected,
            found = %self.found,
            "row decode warning, value treated as null"
        );
    }
}

impl fmt::Display for RowDecodeWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "column {}: expected {}, found {}",
            self.column, self.expected, self.found
        )
    }
}

fn column(row: &Row, index: usize) -> Result<&Value, RowDecodeWarning> {
    row.get(index)
        .ok_or_else(|| RowDecodeWarning::new(index, "column", "missing column"))
}

/// Read and convert an attribute column; decode problems are logged and yield null.
pub(crate) fn read_scalar(row: &Row, index: usize, scalar: ScalarType) -> Value {
    match column(row, index).and_then(|raw| {
        convert(raw, scalar).map_err(|found| RowDecodeWarning::new(index, format!("{:?}", scalar), found))
    }) {
        Ok(value) => value,
        Err(warning) => {
            warning.log();
            Value::Null
        }
    }
}

/// Read the identity at a path; `None` when the row has no record there.
pub(crate) fn read_identity(
    row: &Row,
    columns: &IdentityColumns,
    schema: &Schema,
) -> Option<Identity> {
    match decode_identity(row, columns, schema) {
        Ok(identity) => identity,
        Err(warning) => {
            warning.log();
            None
        }
    }
}

fn decode_identity(
    row: &Row,
    columns: &IdentityColumns,
    schema: &Schema,
) -> Result<Option<Identity>, RowDecodeWarning> {
    let id = match column(row, columns.id)? {
        Value::Null => return Ok(None),
        Value::Int64(id) if *id >= 0 => *id as u64,
        Value::String(s) => s
            .trim()
            .parse::<u64>()
            .map_err(|_| RowDecodeWarning::new(columns.id, "id", format!("'{}'", s)))?,
        other => return Err(RowDecodeWarning::new(columns.id, "id", other.kind_name())),
    };

    let type_id = match columns.type_column {
        None => columns.declared,
        Some(index) => match column(row, index)? {
            Value::Null => columns.declared,
            Value::Int64(raw) => {
                let type_id = u32::try_from(*raw)
                    .map(TypeId)
                    .map_err(|_| RowDecodeWarning::new(index, "type id", raw.to_string()))?;
                if schema.get(type_id).is_none() {
                    return Err(RowDecodeWarning::new(index, "type id", raw.to_string()));
                }
                type_id
            }
            Value::String(name) => schema
                .resolve(name)
                .ok_or_else(|| RowDecodeWarning::new(index, "type name", format!("'{}'", name)))?,
            other => return Err(RowDecodeWarning::new(index, "type", other.kind_name())),
        },
    };

    Ok(Some(Identity::new(type_id, id)))
}

/// Convert a raw value into the given scalar kind.
///
/// Returns a description of the offending value on failure.
pub fn convert(raw: &Value, scalar: ScalarType) -> Result<Value, String> {
    let fail = || format!("{} {}", raw.kind_name(), raw);
    if raw.is_null() {
        return Ok(Value::Null);
    }
    match scalar {
        ScalarType::Bool => match raw {
            Value::Bool(b) => Ok(Value::Bool(*b)),
            Value::Int64(0) => Ok(Value::Bool(false)),
            Value::Int64(1) => Ok(Value::Bool(true)),
            Value::String(s) => match s.trim().to_ascii_lowercase().as_str() {
                "true" | "1" => Ok(Value::Bool(true)),
                "false" | "0" => Ok(Value::Bool(false)),
                _ => Err(fail()),
            },
            _ => Err(fail()),
        },
        ScalarType::Int64 => match raw {
            Value::Int64(i) => Ok(Value::Int64(*i)),
            Value::Float64(f) if f.fract() == 0.0 && f.is_finite() => Ok(Value::Int64(*f as i64)),
            Value::String(s) => s.trim().parse().map(Value::Int64).map_err(|_| fail()),
            _ => Err(fail()),
        },
        ScalarType::Float64 => match raw {
            Value::Float64(f) => Ok(Value::Float64(*f)),
            Value::Int64(i) => Ok(Value::Float64(*i as f64)),
            Value::String(s) => s.trim().parse().map(Value::Float64).map_err(|_| fail()),
            _ => Err(fail()),
        },
        ScalarType::Decimal { scale } => {
            let value = match raw {
                Value::Float64(f) => *f,
                Value::Int64(i) => *i as f64,
                Value::String(s) => s.trim().parse::<f64>().map_err(|_| fail())?,
                _ => return Err(fail()),
            };
            let factor = 10f64.powi(scale as i32);
            Ok(Value::Float64((value * factor).round() / factor))
        }
        ScalarType::String => match raw {
            Value::String(s) => Ok(Value::String(s.clone())),
            Value::Bool(_) | Value::Int64(_) | Value::Float64(_) | Value::Timestamp(_) => {
                Ok(Value::String(raw.to_string()))
            }
            _ => Err(fail()),
        },
        ScalarType::Timestamp => match raw {
            Value::Timestamp(t) | Value::Int64(t) => Ok(Value::Timestamp(*t)),
            Value::String(s) => parse_timestamp(s.trim()).map(Value::Timestamp).ok_or_else(fail),
            _ => Err(fail()),
        },
    }
}

fn parse_timestamp(text: &str) -> Option<i64> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(text) {
        return Some(dt.timestamp_micros());
    }
    NaiveDate::parse_from_str(text, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|dt| dt.and_utc().timestamp_micros())
}
