//! Bindable parameter values.
//!
//! [`Value`] is the closed set of values a query can bind: anything handed to
//! `where_`, `where_in`, `insert` or `update` is converted into one of these
//! variants before it reaches an executor. Nested structures (JSON arrays and
//! objects) are stringified rather than passed through opaquely.

use crate::error::{BoxError, DbError, DbResult};
use bytes::BytesMut;
use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;
use std::fmt;
use tokio_postgres::types::{IsNull, ToSql, Type};

/// A single bound parameter or decoded column value.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Value {
    #[default]
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
    Bytes(Vec<u8>),
    Date(NaiveDate),
    Timestamp(NaiveDateTime),
    TimestampTz(DateTime<Utc>),
    /// Exact numeric (PostgreSQL NUMERIC).
    Decimal(Decimal),
}

impl Value {
    /// Returns `true` for [`Value::Null`].
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Short type label, used in decode error messages.
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Bool(_) => "bool",
            Value::Int(_) => "int",
            Value::Float(_) => "float",
            Value::Text(_) => "text",
            Value::Bytes(_) => "bytes",
            Value::Date(_) => "date",
            Value::Timestamp(_) => "timestamp",
            Value::TimestampTz(_) => "timestamptz",
            Value::Decimal(_) => "decimal",
        }
    }

    /// Convert a JSON value. Arrays and objects become their JSON text.
    pub fn from_json(value: serde_json::Value) -> Self {
        match value {
            serde_json::Value::Null => Value::Null,
            serde_json::Value::Bool(b) => Value::Bool(b),
            serde_json::Value::Number(n) => match n.as_i64() {
                Some(i) => Value::Int(i),
                None => match n.as_f64() {
                    Some(f) => Value::Float(f),
                    None => Value::Text(n.to_string()),
                },
            },
            serde_json::Value::String(s) => Value::Text(s),
            nested @ (serde_json::Value::Array(_) | serde_json::Value::Object(_)) => {
                Value::Text(nested.to_string())
            }
        }
    }

    /// Convert into a JSON value.
    ///
    /// Bytes become an array of numbers, dates RFC 3339 text, decimals their
    /// exact string form.
    pub fn to_json(&self) -> serde_json::Value {
        match self {
            Value::Null => serde_json::Value::Null,
            Value::Bool(b) => serde_json::Value::Bool(*b),
            Value::Int(i) => serde_json::Value::from(*i),
            Value::Float(f) => serde_json::Number::from_f64(*f)
                .map(serde_json::Value::Number)
                .unwrap_or(serde_json::Value::Null),
            Value::Text(s) => serde_json::Value::String(s.clone()),
            Value::Bytes(b) => serde_json::Value::from(b.clone()),
            Value::Date(d) => serde_json::Value::String(d.to_string()),
            Value::Timestamp(ts) => serde_json::Value::String(ts.format("%Y-%m-%dT%H:%M:%S%.f").to_string()),
            Value::TimestampTz(ts) => serde_json::Value::String(ts.to_rfc3339()),
            Value::Decimal(d) => serde_json::Value::String(d.to_string()),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => f.write_str("NULL"),
            Value::Bool(b) => write!(f, "{b}"),
            Value::Int(i) => write!(f, "{i}"),
            Value::Float(x) => write!(f, "{x}"),
            Value::Text(s) => write!(f, "'{s}'"),
            Value::Bytes(b) => write!(f, "<{} bytes>", b.len()),
            Value::Date(d) => write!(f, "{d}"),
            Value::Timestamp(ts) => write!(f, "{ts}"),
            Value::TimestampTz(ts) => write!(f, "{ts}"),
            Value::Decimal(d) => write!(f, "{d}"),
        }
    }
}

macro_rules! impl_from_int {
    ($($t:ty),*) => {
        $(
            impl From<$t> for Value {
                fn from(v: $t) -> Self {
                    Value::Int(i64::from(v))
                }
            }
        )*
    };
}

impl_from_int!(i8, i16, i32, i64, u8, u16, u32);

impl TryFrom<u64> for Value {
    type Error = DbError;

    fn try_from(v: u64) -> DbResult<Self> {
        i64::try_from(v)
            .map(Value::Int)
            .map_err(|_| DbError::invalid(format!("{v} does not fit in a signed 64-bit integer")))
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl From<f32> for Value {
    fn from(v: f32) -> Self {
        Value::Float(f64::from(v))
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Float(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Text(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::Text(v)
    }
}

impl From<&String> for Value {
    fn from(v: &String) -> Self {
        Value::Text(v.clone())
    }
}

impl From<Vec<u8>> for Value {
    fn from(v: Vec<u8>) -> Self {
        Value::Bytes(v)
    }
}

impl From<&[u8]> for Value {
    fn from(v: &[u8]) -> Self {
        Value::Bytes(v.to_vec())
    }
}

impl From<NaiveDate> for Value {
    fn from(v: NaiveDate) -> Self {
        Value::Date(v)
    }
}

impl From<NaiveDateTime> for Value {
    fn from(v: NaiveDateTime) -> Self {
        Value::Timestamp(v)
    }
}

impl From<DateTime<Utc>> for Value {
    fn from(v: DateTime<Utc>) -> Self {
        Value::TimestampTz(v)
    }
}

impl From<Decimal> for Value {
    fn from(v: Decimal) -> Self {
        Value::Decimal(v)
    }
}

impl From<uuid::Uuid> for Value {
    fn from(v: uuid::Uuid) -> Self {
        Value::Text(v.to_string())
    }
}

impl From<serde_json::Value> for Value {
    fn from(v: serde_json::Value) -> Self {
        Value::from_json(v)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map_or(Value::Null, Into::into)
    }
}

// ─── ToSql ──────────────────────────────────────────────────────────────────
//
// Placeholders carry no type information, so the server infers a parameter
// type from context (`age > $1` binds INT4 when `age` is INT4). Each variant
// is converted to the inferred type when the conversion is exact, and
// rejected otherwise. Never write one type's binary layout for another.

fn mismatch(value: &Value, ty: &Type) -> BoxError {
    format!("cannot bind {} value as postgres type {}", value.type_name(), ty).into()
}

/// Encode `v` only if its own `ToSql` accepts `ty`.
fn encode<T: ToSql>(v: T, value: &Value, ty: &Type, out: &mut BytesMut) -> Result<IsNull, BoxError> {
    if T::accepts(ty) {
        v.to_sql(ty, out)
    } else {
        Err(mismatch(value, ty))
    }
}

fn is_text(ty: &Type) -> bool {
    <&str as ToSql>::accepts(ty)
}

fn parse_date(s: &str) -> Result<NaiveDate, BoxError> {
    Ok(NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d")?)
}

fn parse_timestamp(s: &str) -> Result<NaiveDateTime, BoxError> {
    let s = s.trim();
    for fmt in ["%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S%.f"] {
        if let Ok(ts) = NaiveDateTime::parse_from_str(s, fmt) {
            return Ok(ts);
        }
    }
    Ok(parse_date(s)?.and_time(NaiveTime::MIN))
}

/// RFC 3339 text keeps its offset; text without one is read as UTC.
fn parse_timestamptz(s: &str) -> Result<DateTime<Utc>, BoxError> {
    match DateTime::parse_from_rfc3339(s.trim()) {
        Ok(ts) => Ok(ts.with_timezone(&Utc)),
        Err(_) => Ok(parse_timestamp(s)?.and_utc()),
    }
}

impl ToSql for Value {
    fn to_sql(&self, ty: &Type, out: &mut BytesMut) -> Result<IsNull, BoxError> {
        match self {
            Value::Null => Ok(IsNull::Yes),
            Value::Bool(b) if is_text(ty) => b.to_string().as_str().to_sql(ty, out),
            Value::Bool(b) => encode(*b, self, ty, out),
            Value::Int(i) => match *ty {
                Type::INT2 => i16::try_from(*i)?.to_sql(ty, out),
                Type::INT4 => i32::try_from(*i)?.to_sql(ty, out),
                Type::INT8 => i.to_sql(ty, out),
                Type::OID => u32::try_from(*i)?.to_sql(ty, out),
                Type::FLOAT4 => (*i as f32).to_sql(ty, out),
                Type::FLOAT8 => (*i as f64).to_sql(ty, out),
                Type::NUMERIC => Decimal::from(*i).to_sql(ty, out),
                _ if is_text(ty) => i.to_string().as_str().to_sql(ty, out),
                _ => Err(mismatch(self, ty)),
            },
            Value::Float(x) => match *ty {
                Type::FLOAT4 => (*x as f32).to_sql(ty, out),
                Type::FLOAT8 => x.to_sql(ty, out),
                Type::NUMERIC => Decimal::try_from(*x)?.to_sql(ty, out),
                Type::INT2 | Type::INT4 | Type::INT8 | Type::OID => {
                    if x.fract() != 0.0 || !x.is_finite() || x.abs() >= i64::MAX as f64 {
                        return Err(format!("{x} is not an integer; cannot bind as {ty}").into());
                    }
                    Value::Int(*x as i64).to_sql(ty, out)
                }
                _ if is_text(ty) => x.to_string().as_str().to_sql(ty, out),
                _ => Err(mismatch(self, ty)),
            },
            Value::Text(s) => match *ty {
                Type::UUID => uuid::Uuid::parse_str(s.trim())?.to_sql(ty, out),
                Type::JSON | Type::JSONB => {
                    serde_json::from_str::<serde_json::Value>(s)?.to_sql(ty, out)
                }
                Type::NUMERIC => s.trim().parse::<Decimal>()?.to_sql(ty, out),
                Type::DATE => parse_date(s)?.to_sql(ty, out),
                Type::TIMESTAMP => parse_timestamp(s)?.to_sql(ty, out),
                Type::TIMESTAMPTZ => parse_timestamptz(s)?.to_sql(ty, out),
                Type::INT2 | Type::INT4 | Type::INT8 | Type::OID => {
                    Value::Int(s.trim().parse::<i64>()?).to_sql(ty, out)
                }
                Type::FLOAT4 | Type::FLOAT8 => Value::Float(s.trim().parse::<f64>()?).to_sql(ty, out),
                _ => encode(s.as_str(), self, ty, out),
            },
            Value::Bytes(b) => encode(b.as_slice(), self, ty, out),
            Value::Date(d) => match *ty {
                Type::TIMESTAMP => d.and_time(NaiveTime::MIN).to_sql(ty, out),
                Type::TIMESTAMPTZ => d.and_time(NaiveTime::MIN).and_utc().to_sql(ty, out),
                _ if is_text(ty) => d.to_string().as_str().to_sql(ty, out),
                _ => encode(*d, self, ty, out),
            },
            Value::Timestamp(ts) => match *ty {
                Type::TIMESTAMPTZ => ts.and_utc().to_sql(ty, out),
                _ if is_text(ty) => ts.to_string().as_str().to_sql(ty, out),
                _ => encode(*ts, self, ty, out),
            },
            Value::TimestampTz(ts) => match *ty {
                Type::TIMESTAMP => ts.naive_utc().to_sql(ty, out),
                _ if is_text(ty) => ts.to_rfc3339().as_str().to_sql(ty, out),
                _ => encode(*ts, self, ty, out),
            },
            Value::Decimal(d) => match *ty {
                Type::INT2 | Type::INT4 | Type::INT8 | Type::OID => {
                    if !d.fract().is_zero() {
                        return Err(format!("{d} is not an integer; cannot bind as {ty}").into());
                    }
                    match d.to_i64() {
                        Some(i) => Value::Int(i).to_sql(ty, out),
                        None => Err(mismatch(self, ty)),
                    }
                }
                Type::FLOAT4 | Type::FLOAT8 => match d.to_f64() {
                    Some(x) => Value::Float(x).to_sql(ty, out),
                    None => Err(mismatch(self, ty)),
                },
                _ if is_text(ty) => d.to_string().as_str().to_sql(ty, out),
                _ => encode(*d, self, ty, out),
            },
        }
    }

    fn accepts(_ty: &Type) -> bool {
        true
    }

    tokio_postgres::types::to_sql_checked!();
}
