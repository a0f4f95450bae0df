//! Value formatting for `format` steps.
//!
//! Pattern kinds, checked in order:
//! - `{}` anywhere: the value's text is substituted (`"{} EUR"`).
//! - timestamps: a strftime pattern (`"%Y-%m-%d"`).
//! - numbers: a decimal pattern of zeros (`"0"`, `"0.00"`).
//!
//! Anything else renders the value as plain text.

use chrono::format::{Item, StrftimeItems};
use chrono::DateTime;
use once_cell::sync::Lazy;
use printql_proto::Value;
use regex::Regex;
use std::fmt::Write;

static DECIMAL_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^0(?:\.(0+))?$").expect("decimal pattern regex"));

/// Format a value with a pattern. Null stays null; lists are formatted per member.
pub fn apply(pattern: &str, value: &Value) -> Value {
    match value {
        Value::Null => Value::Null,
        Value::List(items) => Value::List(items.iter().map(|v| apply(pattern, v)).collect()),
        _ if pattern.contains("{}") => Value::String(pattern.replace("{}", &value.to_string())),
        Value::Timestamp(micros) => match format_timestamp(pattern, *micros) {
            Some(text) => Value::String(text),
            None => Value::String(value.to_string()),
        },
        Value::Int64(i) => format_number(pattern, *i as f64)
            .map(Value::String)
            .unwrap_or_else(|| Value::String(i.to_string())),
        Value::Float64(f) => format_number(pattern, *f)
            .map(Value::String)
            .unwrap_or_else(|| Value::String(f.to_string())),
        other => Value::String(other.to_string()),
    }
}

fn format_timestamp(pattern: &str, micros: i64) -> Option<String> {
    let timestamp = DateTime::from_timestamp_micros(micros)?;
    let items: Vec<Item<'_>> = StrftimeItems::new(pattern).collect();
    if items.iter().any(|item| matches!(item, Item::Error)) {
        return None;
    }
    let mut out = String::new();
    write!(out, "{}", timestamp.format_with_items(items.into_iter())).ok()?;
    Some(out)
}

fn format_number(pattern: &str, value: f64) -> Option<String> {
    let captures = DECIMAL_PATTERN.captures(pattern)?;
    let decimals = captures.get(1).map(|m| m.as_str().len()).unwrap_or(0);
    Some(format!("{:.*}", decimals, value))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timestamp_pattern() {
        let ts = Value::Timestamp(1_704_067_200_000_000);
        assert_eq!(apply("%Y-%m-%d", &ts), Value::from("2024-01-01"));
        assert_eq!(apply("%d.%m.%Y %H:%M", &ts), Value::from("01.01.2024 00:00"));
        // invalid strftime falls back to the raw value
        assert_eq!(apply("%Q", &ts), Value::from("1704067200000000"));
    }

    #[test]
    fn test_decimal_pattern() {
        assert_eq!(apply("0.00", &Value::Float64(3.14159)), Value::from("3.14"));
        assert_eq!(apply("0.0", &Value::Int64(10)), Value::from("10.0"));
        assert_eq!(apply("0", &Value::Float64(2.6)), Value::from("3"));
        assert_eq!(apply("abc", &Value::Int64(7)), Value::from("7"));
    }

    #[test]
    fn test_substitution() {
        assert_eq!(apply("{} EUR", &Value::Int64(10)), Value::from("10 EUR"));
        assert_eq!(apply("[{}]", &Value::from("x")), Value::from("[x]"));
    }

    #[test]
    fn test_null_and_lists() {
        assert_eq!(apply("0.00", &Value::Null), Value::Null);
        assert_eq!(
            apply("0.0", &Value::List(vec![Value::Int64(1), Value::Null])),
            Value::List(vec![Value::from("1.0"), Value::Null])
        );
    }
}
