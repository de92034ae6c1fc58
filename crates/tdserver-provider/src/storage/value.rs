//! Literal values carried by SQL constant expressions.

use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, NaiveTime};
use rust_decimal::Decimal;
use uuid::Uuid;

use crate::metadata::ClrType;

/// Constant value inside a SQL expression.
#[derive(Debug, Clone, PartialEq)]
pub enum SqlValue {
    Null,
    Bool(bool),
    /// Any integer width; the expression's type says which.
    Int(i64),
    F32(f32),
    F64(f64),
    Decimal(Decimal),
    Text(String),
    Bytes(Vec<u8>),
    Uuid(Uuid),
    DateTime(NaiveDateTime),
    DateTimeOffset(DateTime<FixedOffset>),
    Date(NaiveDate),
    Time(NaiveTime),
}

impl SqlValue {
    pub fn is_null(&self) -> bool {
        matches!(self, SqlValue::Null)
    }

    /// Natural type of the value, used when no type is given explicitly.
    pub fn clr_type(&self) -> Option<ClrType> {
        let t = match self {
            SqlValue::Null => return None,
            SqlValue::Bool(_) => ClrType::Bool,
            SqlValue::Int(_) => ClrType::Int32,
            SqlValue::F32(_) => ClrType::Single,
            SqlValue::F64(_) => ClrType::Double,
            SqlValue::Decimal(_) => ClrType::Decimal,
            SqlValue::Text(_) => ClrType::String,
            SqlValue::Bytes(_) => ClrType::Bytes,
            SqlValue::Uuid(_) => ClrType::Guid,
            SqlValue::DateTime(_) | SqlValue::Date(_) => ClrType::DateTime,
            SqlValue::DateTimeOffset(_) => ClrType::DateTimeOffset,
            SqlValue::Time(_) => ClrType::TimeSpan,
        };
        Some(t)
    }

    /// Numeric value as a double, for range checks on amounts.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            SqlValue::Int(i) => Some(*i as f64),
            SqlValue::F32(f) => Some(*f as f64),
            SqlValue::F64(f) => Some(*f),
            SqlValue::Decimal(d) => d.to_string().parse().ok(),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            SqlValue::Int(i) => Some(*i),
            _ => None,
        }
    }

    /// Character length for text, byte length for binary.
    pub fn length(&self) -> Option<usize> {
        match self {
            SqlValue::Text(s) => Some(s.chars().count()),
            SqlValue::Bytes(b) => Some(b.len()),
            _ => None,
        }
    }
}

impl From<bool> for SqlValue {
    fn from(v: bool) -> Self {
        SqlValue::Bool(v)
    }
}

impl From<i32> for SqlValue {
    fn from(v: i32) -> Self {
        SqlValue::Int(v as i64)
    }
}

impl From<i64> for SqlValue {
    fn from(v: i64) -> Self {
        SqlValue::Int(v)
    }
}

impl From<f64> for SqlValue {
    fn from(v: f64) -> Self {
        SqlValue::F64(v)
    }
}

impl From<Decimal> for SqlValue {
    fn from(v: Decimal) -> Self {
        SqlValue::Decimal(v)
    }
}

impl From<&str> for SqlValue {
    fn from(v: &str) -> Self {
        SqlValue::Text(v.to_string())
    }
}

impl From<String> for SqlValue {
    fn from(v: String) -> Self {
        SqlValue::Text(v)
    }
}

impl From<Vec<u8>> for SqlValue {
    fn from(v: Vec<u8>) -> Self {
        SqlValue::Bytes(v)
    }
}

impl From<Uuid> for SqlValue {
    fn from(v: Uuid) -> Self {
        SqlValue::Uuid(v)
    }
}

impl From<NaiveDateTime> for SqlValue {
    fn from(v: NaiveDateTime) -> Self {
        SqlValue::DateTime(v)
    }
}

impl From<DateTime<FixedOffset>> for SqlValue {
    fn from(v: DateTime<FixedOffset>) -> Self {
        SqlValue::DateTimeOffset(v)
    }
}
