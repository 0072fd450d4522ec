use encoding_rs::Encoding;

use crate::bridge::NativeCursor;
use crate::error::{IfxError, Result};
use crate::types::{ColumnDescription, Row, SqlValue};

/// A wrapper around the native cursor that takes into account some DB-API
/// particularities of the bridge and some common driver quirks.
///
/// The adapter normalizes outgoing statements and parameters, decodes
/// result rows, and records the last executed statement for diagnostics.
pub struct Cursor {
    active: bool,
    native: Box<dyn NativeCursor>,
    driver_charset: Option<&'static Encoding>,
    last_sql: String,
    last_params: Vec<SqlValue>,
}

impl Cursor {
    pub fn new(native: Box<dyn NativeCursor>, driver_charset: Option<&'static Encoding>) -> Self {
        Self {
            active: true,
            native,
            driver_charset,
            last_sql: String::new(),
            last_params: Vec::new(),
        }
    }

    /// Statement text as last handed to `execute`, for diagnostics.
    pub fn last_sql(&self) -> &str {
        &self.last_sql
    }

    /// Normalized parameters of the last executed statement.
    pub fn last_params(&self) -> &[SqlValue] {
        &self.last_params
    }

    pub fn rowcount(&self) -> i64 {
        self.native.rowcount()
    }

    pub fn description(&self) -> Vec<ColumnDescription> {
        self.native.description()
    }

    /// The driver does not uniformly support the application's native text
    /// encoding, so statements are re-encoded through the driver charset
    /// when one is configured; unrepresentable characters are replaced
    /// before they reach the driver.
    fn format_sql(&self, sql: &str) -> String {
        match self.driver_charset {
            Some(encoding) => {
                let (encoded, _, _) = encoding.encode(sql);
                let (decoded, _, _) = encoding.decode(&encoded);
                decoded.into_owned()
            }
            None => sql.to_string(),
        }
    }

    fn format_params(&self, params: &[SqlValue]) -> Vec<SqlValue> {
        params
            .iter()
            .map(|p| match p {
                SqlValue::Text(s) => match self.driver_charset {
                    Some(encoding) => {
                        let (encoded, _, _) = encoding.encode(s);
                        SqlValue::Bytes(encoded.into_owned())
                    }
                    None => p.clone(),
                },
                SqlValue::Bytes(_) => p.clone(),
                SqlValue::Bool(b) => SqlValue::Int32(i32::from(*b)),
                other => other.clone(),
            })
            .collect()
    }

    fn format_row(&self, row: Vec<SqlValue>) -> Row {
        let Some(encoding) = self.driver_charset else {
            return Row::new(row);
        };
        let values = row
            .into_iter()
            .map(|value| match value {
                SqlValue::Bytes(bytes) => {
                    let (decoded, _, _) = encoding.decode(&bytes);
                    SqlValue::Text(decoded.into_owned())
                }
                other => other,
            })
            .collect();
        Row::new(values)
    }

    pub fn execute(&mut self, sql: &str, params: &[SqlValue]) -> Result<()> {
        self.last_sql = sql.to_string();
        let formatted_sql = self.format_sql(sql);
        let formatted_params = self.format_params(params);
        self.last_params = formatted_params.clone();
        self.native
            .execute(&formatted_sql, &formatted_params)
            .map_err(|e| IfxError::query(e.to_string(), sql, &formatted_params))
    }

    /// Batch execution. An empty parameter-row sequence is a no-op and
    /// never reaches the native batch call.
    pub fn execute_many(&mut self, sql: &str, param_rows: &[Vec<SqlValue>]) -> Result<()> {
        if param_rows.is_empty() {
            return Ok(());
        }
        self.last_sql = sql.to_string();
        let formatted_sql = self.format_sql(sql);
        let formatted_rows: Vec<Vec<SqlValue>> = param_rows
            .iter()
            .map(|row| self.format_params(row))
            .collect();
        self.last_params = formatted_rows[0].clone();
        self.native
            .execute_many(&formatted_sql, &formatted_rows)
            .map_err(|e| IfxError::query(e.to_string(), sql, &self.last_params))
    }

    pub fn fetch_one(&mut self) -> Result<Option<Row>> {
        Ok(self.native.fetch_one()?.map(|row| self.format_row(row)))
    }

    pub fn fetch_many(&mut self, size: usize) -> Result<Vec<Row>> {
        let rows = self.native.fetch_many(size)?;
        Ok(rows.into_iter().map(|row| self.format_row(row)).collect())
    }

    pub fn fetch_all(&mut self) -> Result<Vec<Row>> {
        let rows = self.native.fetch_all()?;
        Ok(rows.into_iter().map(|row| self.format_row(row)).collect())
    }

    /// Idempotent; closing twice is a no-op.
    pub fn close(&mut self) -> Result<()> {
        if self.active {
            self.active = false;
            self.native.close()?;
        }
        Ok(())
    }

    pub fn is_active(&self) -> bool {
        self.active
    }
}

/// Lazy, finite, non-restartable iteration over decoded rows.
impl Iterator for Cursor {
    type Item = Result<Row>;

    fn next(&mut self) -> Option<Self::Item> {
        if !self.active {
            return None;
        }
        self.fetch_one().transpose()
    }
}
