//! `--filter key=value` parsing
//!
//! Values are typed loosely: booleans, `null`, integers, decimals,
//! `YYYY-MM-DD` dates and UUIDs are recognized; anything else is text.
//! Quote a value (`title='42'`) to force text.

use std::str::FromStr;

use anyhow::{bail, Result};
use chrono::NaiveDate;
use coursectl_store::{FilterSet, ScalarValue};
use rust_decimal::Decimal;
use uuid::Uuid;

pub fn parse_value(raw: &str) -> ScalarValue {
    if let Some(inner) = unquote(raw) {
        return ScalarValue::Text(inner.to_string());
    }
    match raw {
        "null" | "NULL" => return ScalarValue::Null,
        "true" => return ScalarValue::Bool(true),
        "false" => return ScalarValue::Bool(false),
        _ => {}
    }
    if let Ok(v) = raw.parse::<i64>() {
        return ScalarValue::Int(v);
    }
    if raw.contains('.') {
        if let Ok(v) = Decimal::from_str(raw) {
            return ScalarValue::Decimal(v);
        }
    }
    if let Ok(v) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        return ScalarValue::Date(v);
    }
    if let Ok(v) = Uuid::parse_str(raw) {
        return ScalarValue::Uuid(v);
    }
    ScalarValue::Text(raw.to_string())
}

fn unquote(raw: &str) -> Option<&str> {
    ['\'', '"'].iter().find_map(|&q| {
        raw.strip_prefix(q)
            .and_then(|rest| rest.strip_suffix(q))
    })
}

/// Build a filter set from `key=value` pairs, in the order given.
pub fn parse_filters(pairs: &[String]) -> Result<FilterSet> {
    let mut filters = FilterSet::new();
    for pair in pairs {
        let Some((name, raw)) = pair.split_once('=') else {
            bail!("filter '{}' must look like name=value", pair);
        };
        filters.insert(name.trim(), parse_value(raw.trim()))?;
    }
    Ok(filters)
}
