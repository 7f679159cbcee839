//! Untyped scalar values and schema-less rows
//!
//! Paged procedures project whatever columns they like. Each column is
//! decoded by its PostgreSQL type name into a `ScalarValue`, and a row
//! becomes a `Record` that keeps the projection's column order.

use std::fmt;

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use indexmap::IndexMap;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::Serialize;
use sqlx::postgres::PgRow;
use sqlx::{Column, Row, TypeInfo, ValueRef};
use uuid::Uuid;

/// A single column value or filter value
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ScalarValue {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Decimal(Decimal),
    Text(String),
    Uuid(Uuid),
    Date(NaiveDate),
    Timestamp(NaiveDateTime),
    TimestampTz(DateTime<Utc>),
}

impl ScalarValue {
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Integer view of the value; decimals qualify when they are whole.
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Self::Int(v) => Some(*v),
            Self::Decimal(d) if d.fract().is_zero() => d.to_i64(),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s),
            _ => None,
        }
    }
}

impl fmt::Display for ScalarValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => write!(f, "NULL"),
            Self::Bool(v) => write!(f, "{}", v),
            Self::Int(v) => write!(f, "{}", v),
            Self::Float(v) => write!(f, "{}", v),
            Self::Decimal(v) => write!(f, "{}", v),
            Self::Text(v) => write!(f, "{}", v),
            Self::Uuid(v) => write!(f, "{}", v),
            Self::Date(v) => write!(f, "{}", v),
            Self::Timestamp(v) => write!(f, "{}", v),
            Self::TimestampTz(v) => write!(f, "{}", v.to_rfc3339()),
        }
    }
}

macro_rules! scalar_from {
    ($($ty:ty => $variant:ident),* $(,)?) => {
        $(
            impl From<$ty> for ScalarValue {
                fn from(v: $ty) -> Self {
                    Self::$variant(v.into())
                }
            }
        )*
    };
}

scalar_from! {
    bool => Bool,
    i32 => Int,
    i64 => Int,
    f64 => Float,
    Decimal => Decimal,
    String => Text,
    &str => Text,
    Uuid => Uuid,
    NaiveDate => Date,
    NaiveDateTime => Timestamp,
    DateTime<Utc> => TimestampTz,
}

impl<T: Into<ScalarValue>> From<Option<T>> for ScalarValue {
    fn from(v: Option<T>) -> Self {
        v.map_or(Self::Null, Into::into)
    }
}

/// One materialized row: column name to value, in projection order.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct Record(IndexMap<String, ScalarValue>);

impl Record {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a column. A repeated column name keeps its first position and
    /// takes the later value.
    pub fn insert(&mut self, column: impl Into<String>, value: ScalarValue) {
        self.0.insert(column.into(), value);
    }

    pub fn get(&self, column: &str) -> Option<&ScalarValue> {
        self.0.get(column)
    }

    pub fn columns(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &ScalarValue)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Decode every column of a row without knowing its shape up front.
    pub(crate) fn from_row(row: &PgRow) -> Result<Self, sqlx::Error> {
        let mut record = Self(IndexMap::with_capacity(row.len()));
        for column in row.columns() {
            let value = decode_column(row, column.ordinal())?;
            record.insert(column.name(), value);
        }
        Ok(record)
    }
}

impl FromIterator<(String, ScalarValue)> for Record {
    fn from_iter<I: IntoIterator<Item = (String, ScalarValue)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// Decode one column by its declared type.
///
/// # Errors
///
/// `ColumnDecode` for types with no scalar mapping (arrays, json, ...).
pub(crate) fn decode_column(row: &PgRow, index: usize) -> Result<ScalarValue, sqlx::Error> {
    let raw = row.try_get_raw(index)?;
    if raw.is_null() {
        return Ok(ScalarValue::Null);
    }
    let type_name = raw.type_info().name().to_owned();

    let value = match type_name.as_str() {
        "BOOL" => ScalarValue::Bool(row.try_get(index)?),
        "INT2" => ScalarValue::Int(row.try_get::<i16, _>(index)?.into()),
        "INT4" => ScalarValue::Int(row.try_get::<i32, _>(index)?.into()),
        "INT8" => ScalarValue::Int(row.try_get(index)?),
        "FLOAT4" => ScalarValue::Float(row.try_get::<f32, _>(index)?.into()),
        "FLOAT8" => ScalarValue::Float(row.try_get(index)?),
        "NUMERIC" => ScalarValue::Decimal(row.try_get(index)?),
        "TEXT" | "VARCHAR" | "BPCHAR" | "NAME" => ScalarValue::Text(row.try_get(index)?),
        "UUID" => ScalarValue::Uuid(row.try_get(index)?),
        "DATE" => ScalarValue::Date(row.try_get(index)?),
        "TIMESTAMP" => ScalarValue::Timestamp(row.try_get(index)?),
        "TIMESTAMPTZ" => ScalarValue::TimestampTz(row.try_get(index)?),
        other => {
            let column = row
                .columns()
                .get(index)
                .map(|c| c.name().to_owned())
                .unwrap_or_else(|| index.to_string());
            return Err(sqlx::Error::ColumnDecode {
                index: column,
                source: format!("unsupported column type {}", other).into(),
            });
        }
    };
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn record_keeps_projection_order() {
        let mut record = Record::new();
        record.insert("title", "Intro to Go".into());
        record.insert("courseId", ScalarValue::Uuid(Uuid::nil()));
        record.insert("price", ScalarValue::Decimal(Decimal::from_str("49.99").unwrap()));

        let columns: Vec<&str> = record.columns().collect();
        assert_eq!(columns, vec!["title", "courseId", "price"]);

        // Repeated name keeps its slot, takes the new value
        record.insert("title", "Advanced Go".into());
        let columns: Vec<&str> = record.columns().collect();
        assert_eq!(columns, vec!["title", "courseId", "price"]);
        assert_eq!(record.get("title").and_then(|v| v.as_str()), Some("Advanced Go"));
    }

    #[test]
    fn record_serializes_as_ordered_object() {
        let record: Record = vec![
            ("zeta".to_string(), ScalarValue::Int(1)),
            ("alpha".to_string(), ScalarValue::Null),
            (
                "published".to_string(),
                ScalarValue::Date(NaiveDate::from_ymd_opt(2024, 1, 1).unwrap()),
            ),
        ]
        .into_iter()
        .collect();

        let json = serde_json::to_string(&record).unwrap();
        assert_eq!(json, r#"{"zeta":1,"alpha":null,"published":"2024-01-01"}"#);
    }

    #[test]
    fn integer_views() {
        assert_eq!(ScalarValue::Int(42).as_i64(), Some(42));
        assert_eq!(
            ScalarValue::Decimal(Decimal::from_str("7").unwrap()).as_i64(),
            Some(7)
        );
        assert_eq!(
            ScalarValue::Decimal(Decimal::from_str("7.00").unwrap()).as_i64(),
            Some(7)
        );
        assert_eq!(
            ScalarValue::Decimal(Decimal::from_str("7.5").unwrap()).as_i64(),
            None
        );
        assert_eq!(ScalarValue::Text("7".into()).as_i64(), None);
    }

    #[test]
    fn option_maps_to_null() {
        let none: Option<i64> = None;
        assert!(ScalarValue::from(none).is_null());
        assert_eq!(ScalarValue::from(Some(3_i64)), ScalarValue::Int(3));
    }
}
