//! Value conversion between the native bridge's type system and the
//! execution framework's semantic field types.

use std::collections::HashMap;

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use encoding_rs::Encoding;
use rust_decimal::Decimal;
use uuid::Uuid;

use crate::error::{IfxError, Result};
use crate::types::SqlValue;

/// Decode bytes trying multiple encodings before giving up.
///
/// Encodings are tried in configured order; the first clean decode wins.
pub fn decode_with_fallback(value: &[u8], encodings: &[String]) -> Result<String> {
    for label in encodings {
        let Some(encoding) = Encoding::for_label(label.as_bytes()) else {
            continue;
        };
        let (decoded, _, had_errors) = encoding.decode(value);
        if !had_errors {
            return Ok(decoded.into_owned());
        }
    }
    Err(IfxError::conversion(
        "text",
        format!("unable to decode {} bytes with any configured encoding", value.len()),
    ))
}

/// The driver double-escapes newline characters on the way out of the
/// database; convert the two-byte `\n` sequence back to a real newline.
pub fn unescape_newlines(raw: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(raw.len());
    let mut i = 0;
    while i < raw.len() {
        if raw[i] == b'\\' && raw.get(i + 1) == Some(&b'n') {
            out.push(b'\n');
            i += 2;
        } else {
            out.push(raw[i]);
            i += 1;
        }
    }
    out
}

/// Map a boolean onto the char(1) representation used by legacy schemas.
/// `true` stores as `'Y'`, `false` as `'N'`; a missing value is only legal
/// for nullable fields.
pub fn boolean_to_char(value: Option<bool>, nullable: bool) -> Result<Option<char>> {
    match value {
        Some(true) => Ok(Some('Y')),
        Some(false) => Ok(Some('N')),
        None if nullable => Ok(None),
        None => Err(IfxError::conversion(
            "char",
            "null is not a valid value for a non-nullable boolean field",
        )),
    }
}

/// Inverse of [`boolean_to_char`]: `'Y'` reads as true, anything else as
/// false, and a missing value stays missing for nullable fields.
pub fn char_to_boolean(value: Option<&str>, nullable: bool) -> Option<bool> {
    match value {
        None if nullable => None,
        None => Some(false),
        Some(v) => Some(v == "Y"),
    }
}

/// Drain a blob result value to a plain byte vector. Plain byte values
/// pass through unchanged; native blob handles are read out in full.
pub fn blob_to_bytes(value: SqlValue) -> Result<Vec<u8>> {
    value
        .clone()
        .into_bytes()
        .ok_or_else(|| IfxError::conversion("bytes", format!("not a binary value: {:?}", value)))
}

/// Semantic field types with database-specific result conversion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FieldKind {
    Boolean,
    NullBoolean,
    Date,
    Time,
    DateTime,
    Decimal,
    TrimChar,
    Uuid,
}

/// Per-field details a converter may need.
#[derive(Debug, Clone, Copy, Default)]
pub struct FieldMeta {
    pub nullable: bool,
    pub max_digits: Option<u32>,
    pub decimal_places: Option<u32>,
}

pub type Converter = fn(&SqlValue, &FieldMeta) -> Result<SqlValue>;

/// Converters keyed by semantic field type, consulted per result column
/// during row materialization. Populated once at operations-layer
/// initialization and read-only afterwards.
#[derive(Default)]
pub struct ConversionRegistry {
    converters: HashMap<FieldKind, Converter>,
}

impl ConversionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_converter(mut self, kind: FieldKind, converter: Converter) -> Self {
        self.converters.insert(kind, converter);
        self
    }

    pub fn get(&self, kind: FieldKind) -> Option<Converter> {
        self.converters.get(&kind).copied()
    }

    /// Convert a raw column value for the given field type. Field types
    /// without a registered converter pass the value through unchanged.
    pub fn convert(&self, kind: FieldKind, value: &SqlValue, meta: &FieldMeta) -> Result<SqlValue> {
        match self.get(kind) {
            Some(converter) => converter(value, meta),
            None => Ok(value.clone()),
        }
    }
}

fn value_as_int(value: &SqlValue) -> Option<i64> {
    match value {
        SqlValue::Int32(i) => Some(i64::from(*i)),
        SqlValue::Int64(i) => Some(*i),
        SqlValue::Bool(b) => Some(i64::from(*b)),
        _ => None,
    }
}

/// `1` reads as true, `0` as false; anything else is only legal for a
/// nullable field.
pub fn convert_boolean(value: &SqlValue, meta: &FieldMeta) -> Result<SqlValue> {
    match value_as_int(value) {
        Some(1) => Ok(SqlValue::Bool(true)),
        Some(0) => Ok(SqlValue::Bool(false)),
        _ if meta.nullable => Ok(SqlValue::Null),
        _ => Err(IfxError::conversion(
            "bool",
            format!("unexpected boolean column value: {:?}", value),
        )),
    }
}

pub fn convert_null_boolean(value: &SqlValue, _meta: &FieldMeta) -> Result<SqlValue> {
    Ok(match value_as_int(value) {
        Some(1) => SqlValue::Bool(true),
        Some(0) => SqlValue::Bool(false),
        _ => SqlValue::Null,
    })
}

/// Reformat to the field's declared scale, then parse to an exact decimal.
pub fn convert_decimal(value: &SqlValue, meta: &FieldMeta) -> Result<SqlValue> {
    let parsed = match value {
        SqlValue::Null => return Ok(SqlValue::Null),
        SqlValue::Decimal(d) => *d,
        SqlValue::Int32(i) => Decimal::from(*i),
        SqlValue::Int64(i) => Decimal::from(*i),
        SqlValue::Float64(f) => Decimal::try_from(*f)
            .map_err(|e| IfxError::conversion("decimal", e.to_string()))?,
        SqlValue::Text(s) => s
            .trim()
            .parse::<Decimal>()
            .map_err(|e| IfxError::conversion("decimal", e.to_string()))?,
        other => {
            return Err(IfxError::conversion(
                "decimal",
                format!("unexpected decimal column value: {:?}", other),
            ))
        }
    };
    let scaled = match meta.decimal_places {
        Some(places) => parsed.round_dp(places),
        None => parsed,
    };
    Ok(SqlValue::Decimal(scaled))
}

/// Parse from text if the bridge did not already return a structured date.
pub fn convert_date(value: &SqlValue, _meta: &FieldMeta) -> Result<SqlValue> {
    match value {
        SqlValue::Null => Ok(SqlValue::Null),
        SqlValue::Date(_) => Ok(value.clone()),
        SqlValue::DateTime(dt) => Ok(SqlValue::Date(dt.date())),
        SqlValue::Text(s) => NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d")
            .map(SqlValue::Date)
            .map_err(|e| IfxError::conversion("date", e.to_string())),
        other => Err(IfxError::conversion(
            "date",
            format!("unexpected date column value: {:?}", other),
        )),
    }
}

pub fn convert_time(value: &SqlValue, _meta: &FieldMeta) -> Result<SqlValue> {
    match value {
        SqlValue::Null => Ok(SqlValue::Null),
        SqlValue::Time(_) => Ok(value.clone()),
        SqlValue::Text(s) => NaiveTime::parse_from_str(s.trim(), "%H:%M:%S%.f")
            .map(SqlValue::Time)
            .map_err(|e| IfxError::conversion("time", e.to_string())),
        other => Err(IfxError::conversion(
            "time",
            format!("unexpected time column value: {:?}", other),
        )),
    }
}

pub fn convert_datetime(value: &SqlValue, _meta: &FieldMeta) -> Result<SqlValue> {
    match value {
        SqlValue::Null => Ok(SqlValue::Null),
        SqlValue::DateTime(_) => Ok(value.clone()),
        SqlValue::Text(s) => NaiveDateTime::parse_from_str(s.trim(), "%Y-%m-%d %H:%M:%S%.f")
            .map(SqlValue::DateTime)
            .map_err(|e| IfxError::conversion("datetime", e.to_string())),
        other => Err(IfxError::conversion(
            "datetime",
            format!("unexpected datetime column value: {:?}", other),
        )),
    }
}

/// CHAR columns come back space-padded to their declared width; drop the
/// trailing whitespace.
pub fn convert_trim_char(value: &SqlValue, _meta: &FieldMeta) -> Result<SqlValue> {
    match value {
        SqlValue::Null => Ok(SqlValue::Null),
        SqlValue::Text(s) => Ok(SqlValue::Text(s.trim_end().to_string())),
        other => Ok(other.clone()),
    }
}

/// Parse the canonical text form, with or without hyphens (the schema
/// stores UUIDs as char(32)).
pub fn convert_uuid(value: &SqlValue, _meta: &FieldMeta) -> Result<SqlValue> {
    match value {
        SqlValue::Null => Ok(SqlValue::Null),
        SqlValue::Uuid(_) => Ok(value.clone()),
        SqlValue::Text(s) => Uuid::parse_str(s.trim())
            .map(SqlValue::Uuid)
            .map_err(|e| IfxError::conversion("uuid", e.to_string())),
        other => Err(IfxError::conversion(
            "uuid",
            format!("unexpected uuid column value: {:?}", other),
        )),
    }
}
