use std::fmt;
use std::sync::Arc;

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use rust_decimal::Decimal;
use uuid::Uuid;

/// A large-object handle returned by the native bridge. The driver hands
/// these back for blob columns instead of plain byte arrays; callers drain
/// them through [`SqlValue::into_bytes`] or the blob converter.
pub trait BlobObject: Send + Sync {
    /// Total size of the blob in bytes.
    fn blob_size(&self) -> usize;

    /// Read `len` bytes starting at the 1-based position `pos`.
    fn get_bytes(&self, pos: usize, len: usize) -> Vec<u8>;
}

/// Represents a SQL parameter or result value in a bridge-agnostic way.
/// The bridge is responsible for converting these to its native types.
#[derive(Clone)]
pub enum SqlValue {
    Null,
    Text(String),
    Bytes(Vec<u8>),
    Int32(i32),
    Int64(i64),
    Float64(f64),
    Bool(bool),
    Decimal(Decimal),
    Date(NaiveDate),
    Time(NaiveTime),
    DateTime(NaiveDateTime),
    Uuid(Uuid),
    Blob(Arc<dyn BlobObject>),
}

impl SqlValue {
    /// Drain this value into a plain byte vector. `Bytes` passes through;
    /// a native blob handle is read out in full.
    pub fn into_bytes(self) -> Option<Vec<u8>> {
        match self {
            SqlValue::Bytes(b) => Some(b),
            SqlValue::Blob(blob) => Some(blob.get_bytes(1, blob.blob_size())),
            _ => None,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, SqlValue::Null)
    }
}

impl fmt::Debug for SqlValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SqlValue::Null => write!(f, "Null"),
            SqlValue::Text(s) => write!(f, "Text({:?})", s),
            SqlValue::Bytes(b) => write!(f, "Bytes({} bytes)", b.len()),
            SqlValue::Int32(i) => write!(f, "Int32({})", i),
            SqlValue::Int64(i) => write!(f, "Int64({})", i),
            SqlValue::Float64(v) => write!(f, "Float64({})", v),
            SqlValue::Bool(b) => write!(f, "Bool({})", b),
            SqlValue::Decimal(d) => write!(f, "Decimal({})", d),
            SqlValue::Date(d) => write!(f, "Date({})", d),
            SqlValue::Time(t) => write!(f, "Time({})", t),
            SqlValue::DateTime(dt) => write!(f, "DateTime({})", dt),
            SqlValue::Uuid(u) => write!(f, "Uuid({})", u),
            SqlValue::Blob(b) => write!(f, "Blob({} bytes)", b.blob_size()),
        }
    }
}

impl PartialEq for SqlValue {
    fn eq(&self, other: &Self) -> bool {
        use SqlValue::*;
        match (self, other) {
            (Null, Null) => true,
            (Text(a), Text(b)) => a == b,
            (Bytes(a), Bytes(b)) => a == b,
            (Int32(a), Int32(b)) => a == b,
            (Int64(a), Int64(b)) => a == b,
            (Float64(a), Float64(b)) => a == b,
            (Bool(a), Bool(b)) => a == b,
            (Decimal(a), Decimal(b)) => a == b,
            (Date(a), Date(b)) => a == b,
            (Time(a), Time(b)) => a == b,
            (DateTime(a), DateTime(b)) => a == b,
            (Uuid(a), Uuid(b)) => a == b,
            (Blob(a), Blob(b)) => {
                a.blob_size() == b.blob_size()
                    && a.get_bytes(1, a.blob_size()) == b.get_bytes(1, b.blob_size())
            }
            _ => false,
        }
    }
}

impl fmt::Display for SqlValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SqlValue::Null => write!(f, "NULL"),
            SqlValue::Text(s) => write!(f, "{}", s),
            SqlValue::Bytes(b) => write!(f, "<{} bytes>", b.len()),
            SqlValue::Int32(i) => write!(f, "{}", i),
            SqlValue::Int64(i) => write!(f, "{}", i),
            SqlValue::Float64(v) => write!(f, "{}", v),
            SqlValue::Bool(b) => write!(f, "{}", b),
            SqlValue::Decimal(d) => write!(f, "{}", d),
            SqlValue::Date(d) => write!(f, "{}", d),
            SqlValue::Time(t) => write!(f, "{}", t),
            SqlValue::DateTime(dt) => write!(f, "{}", dt),
            SqlValue::Uuid(u) => write!(f, "{}", u),
            SqlValue::Blob(b) => write!(f, "<blob {} bytes>", b.blob_size()),
        }
    }
}

impl From<&str> for SqlValue {
    fn from(value: &str) -> Self {
        SqlValue::Text(value.to_string())
    }
}

impl From<String> for SqlValue {
    fn from(value: String) -> Self {
        SqlValue::Text(value)
    }
}

impl From<Vec<u8>> for SqlValue {
    fn from(value: Vec<u8>) -> Self {
        SqlValue::Bytes(value)
    }
}

impl From<i32> for SqlValue {
    fn from(value: i32) -> Self {
        SqlValue::Int32(value)
    }
}

impl From<i64> for SqlValue {
    fn from(value: i64) -> Self {
        SqlValue::Int64(value)
    }
}

impl From<f64> for SqlValue {
    fn from(value: f64) -> Self {
        SqlValue::Float64(value)
    }
}

impl From<bool> for SqlValue {
    fn from(value: bool) -> Self {
        SqlValue::Bool(value)
    }
}

impl<T: Into<SqlValue>> From<Option<T>> for SqlValue {
    fn from(value: Option<T>) -> Self {
        match value {
            Some(v) => v.into(),
            None => SqlValue::Null,
        }
    }
}
