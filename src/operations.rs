//! Dialect-specific SQL fragments and result converters consumed by the
//! query-compilation layer above this core.

use chrono::{DateTime, FixedOffset, NaiveDate, NaiveTime, Utc};
use indexmap::IndexMap;

use crate::convert::{
    convert_boolean, convert_date, convert_datetime, convert_decimal, convert_null_boolean,
    convert_time, convert_trim_char, convert_uuid, ConversionRegistry, FieldKind,
};
use crate::cursor::Cursor;
use crate::error::{IfxError, Result};
use crate::types::SqlValue;

/// Cast target for char fields without a declared length; the dialect has
/// no TEXT equivalent.
pub const CAST_CHAR_FIELD_WITHOUT_MAX_LENGTH: &str = "LVARCHAR";

const LAST_INSERT_ID_SQL: &str =
    "SELECT DBINFO('sqlca.sqlerrd1') FROM SYSTABLES WHERE TABID=1";

/// Semantic lookups supported by the dialect.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Lookup {
    Exact,
    IExact,
    Contains,
    IContains,
    Gt,
    Gte,
    Lt,
    Lte,
    StartsWith,
    EndsWith,
    IStartsWith,
    IEndsWith,
    Regex,
    IRegex,
}

impl Lookup {
    pub const ALL: [Lookup; 14] = [
        Lookup::Exact,
        Lookup::IExact,
        Lookup::Contains,
        Lookup::IContains,
        Lookup::Gt,
        Lookup::Gte,
        Lookup::Lt,
        Lookup::Lte,
        Lookup::StartsWith,
        Lookup::EndsWith,
        Lookup::IStartsWith,
        Lookup::IEndsWith,
        Lookup::Regex,
        Lookup::IRegex,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Lookup::Exact => "exact",
            Lookup::IExact => "iexact",
            Lookup::Contains => "contains",
            Lookup::IContains => "icontains",
            Lookup::Gt => "gt",
            Lookup::Gte => "gte",
            Lookup::Lt => "lt",
            Lookup::Lte => "lte",
            Lookup::StartsWith => "startswith",
            Lookup::EndsWith => "endswith",
            Lookup::IStartsWith => "istartswith",
            Lookup::IEndsWith => "iendswith",
            Lookup::Regex => "regex",
            Lookup::IRegex => "iregex",
        }
    }

    fn base_operator(self) -> &'static str {
        match self {
            Lookup::Exact => "= %s",
            Lookup::IExact => "= LOWER(%s)",
            Lookup::Contains => "LIKE %s ESCAPE '\\'",
            Lookup::IContains => "LIKE LOWER(%s) ESCAPE '\\'",
            Lookup::Gt => "> %s",
            Lookup::Gte => ">= %s",
            Lookup::Lt => "< %s",
            Lookup::Lte => "<= %s",
            Lookup::StartsWith => "LIKE %s ESCAPE '\\'",
            Lookup::EndsWith => "LIKE %s ESCAPE '\\'",
            Lookup::IStartsWith => "LIKE LOWER(%s) ESCAPE '\\'",
            Lookup::IEndsWith => "LIKE LOWER(%s) ESCAPE '\\'",
            // The engine has no regex operator; LIKE is the closest
            // approximation the dialect offers.
            Lookup::Regex => "LIKE %s",
            Lookup::IRegex => "LIKE %s",
        }
    }
}

/// Build the lookup-operator table, applying the collation override to
/// every LIKE-based operator. Computed once per dialect instance, never
/// patched afterwards.
pub fn build_operator_table(collation: Option<&str>) -> IndexMap<Lookup, String> {
    Lookup::ALL
        .iter()
        .map(|&lookup| {
            let sql = lookup.base_operator();
            let sql = match collation {
                Some(name) if sql.starts_with("LIKE ") => format!("{} COLLATE {}", sql, name),
                _ => sql.to_string(),
            };
            (lookup, sql)
        })
        .collect()
}

/// Escape LIKE special characters (`\`, `%`, `_`) on the database side,
/// for pattern lookups whose right-hand side is an expression rather than
/// a literal.
pub fn pattern_escape(expr: &str) -> String {
    format!(
        r"REPLACE(REPLACE(REPLACE({}, '\', '\\'), '%', '\%'), '_', '\_')",
        expr
    )
}

/// Concatenation-based pattern templates for lookups against expression
/// right-hand sides. Returns None for lookups that are not pattern-based.
pub fn pattern_lookup_sql(lookup: Lookup, rhs: &str) -> Option<String> {
    let sql = match lookup {
        Lookup::Contains => format!("LIKE '%' ESCAPE '\\' || {} || '%'", rhs),
        Lookup::IContains => format!("LIKE '%' ESCAPE '\\' || UPPER({}) || '%'", rhs),
        Lookup::StartsWith => format!("LIKE {} ESCAPE '\\' || '%'", rhs),
        Lookup::IStartsWith => format!("LIKE UPPER({}) ESCAPE '\\' || '%'", rhs),
        Lookup::EndsWith => format!("LIKE '%' ESCAPE '\\' || {}", rhs),
        Lookup::IEndsWith => format!("LIKE '%' ESCAPE '\\' || UPPER({})", rhs),
        _ => return None,
    };
    Some(sql)
}

/// Cast applied to the left-hand side of case-insensitive lookups.
pub fn lookup_cast(lookup: Lookup) -> &'static str {
    match lookup {
        Lookup::IExact | Lookup::IContains | Lookup::IStartsWith | Lookup::IEndsWith => {
            "LOWER(CAST(%s as lvarchar))"
        }
        _ => "%s",
    }
}

pub fn start_transaction_sql() -> &'static str {
    "BEGIN WORK"
}

pub fn end_transaction_sql() -> &'static str {
    "COMMIT WORK"
}

pub fn savepoint_create_sql(name: &str) -> String {
    format!("SAVEPOINT {}", name)
}

pub fn savepoint_release_sql(name: &str) -> String {
    format!("RELEASE SAVEPOINT {}", name)
}

/// Map a semantic date unit to the dialect's extraction function.
/// Unsupported units fail rather than producing malformed SQL.
pub fn date_extract_sql(unit: &str, expr: &str) -> Result<String> {
    let function = match unit {
        "week_day" => "WEEKDAY",
        "month" => "MONTH",
        "day" => "DAY",
        other => return Err(IfxError::UnsupportedDateUnit(other.to_string())),
    };
    Ok(format!("{}({})", function, expr))
}

pub fn fulltext_search_sql(field_name: &str) -> String {
    format!("LIKE '%{}%'", field_name)
}

/// The engine knows only the pooled aggregate names.
pub fn normalize_aggregate_name(function: &str) -> &str {
    match function {
        "STDDEV_POP" | "STDDEV_SAMP" => "STDDEV",
        "VAR_POP" | "VAR_SAMP" => "VARIANCE",
        other => other,
    }
}

/// The dialect needs no identifier quoting.
pub fn quote_name(name: &str) -> &str {
    name
}

/// Stateless aside from the operator table, the converter registry and an
/// optional session timezone for datetime adaptation.
pub struct DatabaseOperations {
    operators: IndexMap<Lookup, String>,
    registry: ConversionRegistry,
    /// Session zone for timezone-aware mode; None operates on naive
    /// timestamps.
    timezone: Option<FixedOffset>,
}

impl DatabaseOperations {
    pub fn new(collation: Option<&str>, timezone: Option<FixedOffset>) -> Self {
        Self {
            operators: build_operator_table(collation),
            registry: default_registry(),
            timezone,
        }
    }

    pub fn operator_sql(&self, lookup: Lookup) -> &str {
        &self.operators[&lookup]
    }

    pub fn operators(&self) -> &IndexMap<Lookup, String> {
        &self.operators
    }

    pub fn converters(&self) -> &ConversionRegistry {
        &self.registry
    }

    /// The most recent generated sequence value for the current session,
    /// or None when the catalog has no row.
    pub fn last_insert_id(&self, cursor: &mut Cursor) -> Result<Option<i64>> {
        cursor.execute(LAST_INSERT_ID_SQL, &[])?;
        let Some(row) = cursor.fetch_one()? else {
            return Ok(None);
        };
        let value = match row.get(0) {
            Some(SqlValue::Int32(i)) => i64::from(*i),
            Some(SqlValue::Int64(i)) => *i,
            Some(SqlValue::Text(s)) => s.trim().parse::<i64>().map_err(|e| {
                IfxError::conversion("i64", format!("last insert id {:?}: {}", s, e))
            })?,
            Some(other) => {
                return Err(IfxError::conversion(
                    "i64",
                    format!("last insert id column: {:?}", other),
                ))
            }
            None => return Ok(None),
        };
        Ok(Some(value))
    }

    /// Format a timestamp for the dialect's `datetime year to fraction(5)`
    /// columns. In timezone-aware mode the value is first made naive in
    /// the session zone. The database supports only five fractional
    /// digits, so the sixth is truncated.
    pub fn adapt_datetime_value(&self, value: DateTime<Utc>) -> String {
        let naive = match self.timezone {
            Some(tz) => value.with_timezone(&tz).naive_local(),
            None => value.naive_utc(),
        };
        let mut formatted = naive.format("%Y-%m-%d %H:%M:%S%.6f").to_string();
        formatted.truncate(formatted.len() - 1);
        formatted
    }

    pub fn adapt_date_value(&self, value: NaiveDate) -> String {
        value.format("%d/%m/%Y").to_string()
    }

    pub fn adapt_time_value(&self, value: NaiveTime) -> NaiveTime {
        value
    }

    /// One DELETE per table, in input order. Cascade and sequence-reset
    /// requests are ignored; sequences are not reset by this dialect.
    pub fn sql_flush(
        &self,
        tables: &[&str],
        _reset_sequences: bool,
        _allow_cascade: bool,
    ) -> Vec<String> {
        tables
            .iter()
            .map(|table| format!("DELETE FROM {};", quote_name(table)))
            .collect()
    }

    /// Reconstruct the last executed statement with placeholder markers
    /// substituted by stringified parameter values. Diagnostics only,
    /// never executed. A `?` inside a single-quoted run is literal text,
    /// not a placeholder.
    pub fn format_executed_query(&self, sql: &str, params: &[SqlValue]) -> String {
        let mut out = String::with_capacity(sql.len());
        let mut params = params.iter();
        let mut in_string = false;
        for ch in sql.chars() {
            match ch {
                '\'' => {
                    in_string = !in_string;
                    out.push(ch);
                }
                '?' if !in_string => match params.next() {
                    Some(value) => out.push_str(&value.to_string()),
                    None => out.push(ch),
                },
                _ => out.push(ch),
            }
        }
        out
    }
}

impl Default for DatabaseOperations {
    fn default() -> Self {
        Self::new(None, None)
    }
}

fn default_registry() -> ConversionRegistry {
    ConversionRegistry::new()
        .with_converter(FieldKind::Boolean, convert_boolean)
        .with_converter(FieldKind::NullBoolean, convert_null_boolean)
        .with_converter(FieldKind::Decimal, convert_decimal)
        .with_converter(FieldKind::Date, convert_date)
        .with_converter(FieldKind::Time, convert_time)
        .with_converter(FieldKind::DateTime, convert_datetime)
        .with_converter(FieldKind::TrimChar, convert_trim_char)
        .with_converter(FieldKind::Uuid, convert_uuid)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_sql_flush_ignores_cascade_and_reset() {
        let ops = DatabaseOperations::default();
        let sql = ops.sql_flush(&["orders", "customers"], true, true);
        assert_eq!(
            sql,
            vec![
                "DELETE FROM orders;".to_string(),
                "DELETE FROM customers;".to_string(),
            ]
        );
    }

    #[test]
    fn test_date_extract_sql() {
        assert_eq!(
            date_extract_sql("month", "order_date").unwrap(),
            "MONTH(order_date)"
        );
        assert_eq!(
            date_extract_sql("week_day", "order_date").unwrap(),
            "WEEKDAY(order_date)"
        );
        assert_eq!(date_extract_sql("day", "order_date").unwrap(), "DAY(order_date)");

        match date_extract_sql("quarter", "order_date") {
            Err(IfxError::UnsupportedDateUnit(unit)) => assert_eq!(unit, "quarter"),
            other => panic!("expected UnsupportedDateUnit, got {:?}", other),
        }
    }

    #[test]
    fn test_operator_table_without_collation() {
        let ops = build_operator_table(None);
        assert_eq!(ops[&Lookup::Exact], "= %s");
        assert_eq!(ops[&Lookup::Contains], "LIKE %s ESCAPE '\\'");
        assert_eq!(ops[&Lookup::IExact], "= LOWER(%s)");
    }

    #[test]
    fn test_collation_applies_to_like_operators_only() {
        let ops = build_operator_table(Some("irish_ci"));
        assert_eq!(ops[&Lookup::Contains], "LIKE %s ESCAPE '\\' COLLATE irish_ci");
        assert_eq!(ops[&Lookup::Regex], "LIKE %s COLLATE irish_ci");
        assert_eq!(ops[&Lookup::Exact], "= %s");
        assert_eq!(ops[&Lookup::IExact], "= LOWER(%s)");
        assert_eq!(ops[&Lookup::Gt], "> %s");
    }

    #[test]
    fn test_lookup_cast() {
        assert_eq!(lookup_cast(Lookup::IExact), "LOWER(CAST(%s as lvarchar))");
        assert_eq!(lookup_cast(Lookup::IContains), "LOWER(CAST(%s as lvarchar))");
        assert_eq!(lookup_cast(Lookup::Exact), "%s");
        assert_eq!(lookup_cast(Lookup::Gt), "%s");
    }

    #[test]
    fn test_pattern_escape() {
        assert_eq!(
            pattern_escape("col"),
            r"REPLACE(REPLACE(REPLACE(col, '\', '\\'), '%', '\%'), '_', '\_')"
        );
    }

    #[test]
    fn test_pattern_lookup_sql() {
        assert_eq!(
            pattern_lookup_sql(Lookup::StartsWith, "T1.name").unwrap(),
            "LIKE T1.name ESCAPE '\\' || '%'"
        );
        assert_eq!(
            pattern_lookup_sql(Lookup::IContains, "T1.name").unwrap(),
            "LIKE '%' ESCAPE '\\' || UPPER(T1.name) || '%'"
        );
        assert!(pattern_lookup_sql(Lookup::Exact, "T1.name").is_none());
    }

    #[test]
    fn test_transaction_fragments() {
        assert_eq!(start_transaction_sql(), "BEGIN WORK");
        assert_eq!(end_transaction_sql(), "COMMIT WORK");
        assert_eq!(savepoint_create_sql("sp1"), "SAVEPOINT sp1");
        assert_eq!(savepoint_release_sql("sp1"), "RELEASE SAVEPOINT sp1");
    }

    #[test]
    fn test_adapt_datetime_truncates_to_five_fraction_digits() {
        let ops = DatabaseOperations::default();
        let value = Utc.with_ymd_and_hms(2016, 5, 23, 12, 26, 56).unwrap()
            + chrono::Duration::microseconds(111909);
        assert_eq!(ops.adapt_datetime_value(value), "2016-05-23 12:26:56.11190");
    }

    #[test]
    fn test_adapt_datetime_converts_to_session_zone() {
        let tz = FixedOffset::east_opt(2 * 3600).unwrap();
        let ops = DatabaseOperations::new(None, Some(tz));
        let value = Utc.with_ymd_and_hms(2016, 5, 23, 22, 0, 0).unwrap();
        assert!(ops.adapt_datetime_value(value).starts_with("2016-05-24 00:00:00"));
    }

    #[test]
    fn test_adapt_date_value() {
        let ops = DatabaseOperations::default();
        let date = NaiveDate::from_ymd_opt(2016, 5, 23).unwrap();
        assert_eq!(ops.adapt_date_value(date), "23/05/2016");
    }

    #[test]
    fn test_format_executed_query() {
        let ops = DatabaseOperations::default();
        let formatted = ops.format_executed_query(
            "SELECT * FROM t WHERE id = ? AND name = ?",
            &[SqlValue::Int32(7), SqlValue::Text("John".into())],
        );
        assert_eq!(formatted, "SELECT * FROM t WHERE id = 7 AND name = John");
    }

    #[test]
    fn test_format_executed_query_with_missing_params() {
        let ops = DatabaseOperations::default();
        let formatted = ops.format_executed_query("SELECT ? , ?", &[SqlValue::Int32(1)]);
        assert_eq!(formatted, "SELECT 1 , ?");
    }

    #[test]
    fn test_format_executed_query_ignores_quoted_question_marks() {
        let ops = DatabaseOperations::default();
        let formatted = ops.format_executed_query(
            "SELECT * FROM t WHERE q = 'why?' AND id = ?",
            &[SqlValue::Int32(3)],
        );
        assert_eq!(formatted, "SELECT * FROM t WHERE q = 'why?' AND id = 3");

        // Doubled quotes escape a quote inside the literal.
        let formatted = ops.format_executed_query(
            "SELECT * FROM t WHERE q = 'it''s?' AND id = ?",
            &[SqlValue::Int32(3)],
        );
        assert_eq!(formatted, "SELECT * FROM t WHERE q = 'it''s?' AND id = 3");
    }

    #[test]
    fn test_normalize_aggregate_name() {
        assert_eq!(normalize_aggregate_name("STDDEV_POP"), "STDDEV");
        assert_eq!(normalize_aggregate_name("VAR_SAMP"), "VARIANCE");
        assert_eq!(normalize_aggregate_name("SUM"), "SUM");
    }

    #[test]
    fn test_default_registry_trims_char_fields() {
        let ops = DatabaseOperations::default();
        let out = ops
            .converters()
            .convert(
                FieldKind::TrimChar,
                &SqlValue::Text("code  ".into()),
                &crate::convert::FieldMeta::default(),
            )
            .unwrap();
        assert_eq!(out, SqlValue::Text("code".to_string()));
    }

    #[test]
    fn test_fulltext_search_sql() {
        assert_eq!(fulltext_search_sql("title"), "LIKE '%title%'");
    }
}
