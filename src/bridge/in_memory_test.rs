use std::collections::VecDeque;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use crate::bridge::{Credentials, NativeBridge, NativeConnection, NativeCursor};
use crate::error::{IfxError, Result};
use crate::types::{ColumnDescription, SqlValue};

/// A recorded statement execution for verification.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedQuery {
    pub sql: String,
    pub params: Vec<SqlValue>,
}

/// One queued result set.
#[derive(Debug, Clone, Default)]
struct QueuedResponse {
    columns: Vec<ColumnDescription>,
    rows: Vec<Vec<SqlValue>>,
}

#[derive(Default)]
struct Shared {
    responses: Mutex<VecDeque<QueuedResponse>>,
    recorded_queries: Mutex<Vec<RecordedQuery>>,
    fail_next_execute: Mutex<Option<String>>,
    fail_connect: Mutex<Option<String>>,
    fail_cursor_open: Mutex<Option<String>>,
    fail_cursor_close: Mutex<Option<String>>,
    connect_count: AtomicUsize,
    attach_count: AtomicUsize,
    batch_count: AtomicUsize,
}

/// An in-memory native bridge for testing.
///
/// Allows configuring queued result sets, injecting failures at each stage
/// of the native contract, and verifying executed statements.
///
/// # Example
/// ```
/// use ifxrs::bridge::{InMemoryBridge, InMemoryResponseBuilder};
/// use ifxrs::types::SqlValue;
///
/// let bridge = InMemoryBridge::new().with_response(
///     InMemoryResponseBuilder::new()
///         .columns(&["id", "name"])
///         .row(vec![SqlValue::Int32(1), SqlValue::Text("Alice".into())])
///         .build(),
/// );
/// ```
#[derive(Clone)]
pub struct InMemoryBridge {
    shared: Arc<Shared>,
}

impl InMemoryBridge {
    pub fn new() -> Self {
        Self {
            shared: Arc::new(Shared::default()),
        }
    }

    /// Queue a result set to be returned by the next executed statement.
    /// Responses are consumed in FIFO order; an exhausted queue yields
    /// empty result sets.
    pub fn with_response(self, response: (Vec<ColumnDescription>, Vec<Vec<SqlValue>>)) -> Self {
        self.shared.responses.lock().unwrap().push_back(QueuedResponse {
            columns: response.0,
            rows: response.1,
        });
        self
    }

    pub fn with_responses(
        self,
        responses: impl IntoIterator<Item = (Vec<ColumnDescription>, Vec<Vec<SqlValue>>)>,
    ) -> Self {
        {
            let mut queue = self.shared.responses.lock().unwrap();
            for (columns, rows) in responses {
                queue.push_back(QueuedResponse { columns, rows });
            }
        }
        self
    }

    /// Make the next `execute` call fail with the given message.
    pub fn fail_next_execute(&self, message: &str) {
        *self.shared.fail_next_execute.lock().unwrap() = Some(message.to_string());
    }

    /// Make every `connect` call fail with the given message.
    pub fn fail_connect(&self, message: &str) {
        *self.shared.fail_connect.lock().unwrap() = Some(message.to_string());
    }

    /// Make every cursor-open call fail with the given message.
    pub fn fail_cursor_open(&self, message: &str) {
        *self.shared.fail_cursor_open.lock().unwrap() = Some(message.to_string());
    }

    /// Make every cursor-close call fail with the given message.
    pub fn fail_cursor_close(&self, message: &str) {
        *self.shared.fail_cursor_close.lock().unwrap() = Some(message.to_string());
    }

    /// Get all recorded statements that have been executed.
    pub fn recorded_queries(&self) -> Vec<RecordedQuery> {
        self.shared.recorded_queries.lock().unwrap().clone()
    }

    /// Get the last recorded statement, if any.
    pub fn last_query(&self) -> Option<RecordedQuery> {
        self.shared.recorded_queries.lock().unwrap().last().cloned()
    }

    pub fn connect_count(&self) -> usize {
        self.shared.connect_count.load(Ordering::SeqCst)
    }

    pub fn attach_count(&self) -> usize {
        self.shared.attach_count.load(Ordering::SeqCst)
    }

    /// Number of native batch-execute calls that reached the bridge.
    pub fn batch_count(&self) -> usize {
        self.shared.batch_count.load(Ordering::SeqCst)
    }

    /// Assert that the last statement matches the expected SQL and parameters.
    pub fn assert_last_query(&self, expected_sql: &str, expected_params: &[SqlValue]) {
        let last = self.last_query().expect("No queries were recorded");
        assert_eq!(
            last.sql, expected_sql,
            "SQL mismatch.\nExpected: {}\nActual: {}",
            expected_sql, last.sql
        );
        assert_eq!(
            last.params, expected_params,
            "Parameters mismatch.\nExpected: {:?}\nActual: {:?}",
            expected_params, last.params
        );
    }

    /// Assert that exactly n statements were executed.
    pub fn assert_query_count(&self, expected: usize) {
        let actual = self.shared.recorded_queries.lock().unwrap().len();
        assert_eq!(
            actual, expected,
            "Query count mismatch. Expected: {}, Actual: {}",
            expected, actual
        );
    }

    /// Count recorded statements whose SQL equals `sql`.
    pub fn count_queries_matching(&self, sql: &str) -> usize {
        self.shared
            .recorded_queries
            .lock()
            .unwrap()
            .iter()
            .filter(|q| q.sql == sql)
            .count()
    }
}

impl Default for InMemoryBridge {
    fn default() -> Self {
        Self::new()
    }
}

impl NativeBridge for InMemoryBridge {
    fn connect(
        &self,
        _driver_class: &str,
        _url: &str,
        _credentials: &Credentials,
        _jars: &[&Path],
    ) -> Result<Box<dyn NativeConnection>> {
        if let Some(message) = self.shared.fail_connect.lock().unwrap().clone() {
            return Err(IfxError::ConnectionFailed(message));
        }
        self.shared.connect_count.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(InMemoryConnection {
            shared: Arc::clone(&self.shared),
        }))
    }

    fn attach_current_thread(&self) -> Result<()> {
        self.shared.attach_count.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

struct InMemoryConnection {
    shared: Arc<Shared>,
}

impl NativeConnection for InMemoryConnection {
    fn cursor(&self) -> Result<Box<dyn NativeCursor>> {
        if let Some(message) = self.shared.fail_cursor_open.lock().unwrap().clone() {
            return Err(IfxError::ConnectionFailed(message));
        }
        Ok(Box::new(InMemoryCursor {
            shared: Arc::clone(&self.shared),
            pending: VecDeque::new(),
            description: Vec::new(),
            rowcount: -1,
            closed: false,
        }))
    }

    fn set_max_write(&self, _bytes: usize) -> Result<()> {
        Ok(())
    }

    fn set_autocommit(&self, _autocommit: bool) -> Result<()> {
        Ok(())
    }

    fn close(&self) -> Result<()> {
        Ok(())
    }
}

struct InMemoryCursor {
    shared: Arc<Shared>,
    pending: VecDeque<Vec<SqlValue>>,
    description: Vec<ColumnDescription>,
    rowcount: i64,
    closed: bool,
}

impl InMemoryCursor {
    fn take_response(&mut self) {
        let response = self
            .shared
            .responses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_default();
        self.rowcount = response.rows.len() as i64;
        self.description = response.columns;
        self.pending = response.rows.into();
    }
}

impl NativeCursor for InMemoryCursor {
    fn execute(&mut self, sql: &str, params: &[SqlValue]) -> Result<()> {
        if self.closed {
            return Err(IfxError::ConnectionFailed("cursor is closed".to_string()));
        }
        if let Some(message) = self.shared.fail_next_execute.lock().unwrap().take() {
            return Err(IfxError::ConnectionFailed(message));
        }
        self.shared
            .recorded_queries
            .lock()
            .unwrap()
            .push(RecordedQuery {
                sql: sql.to_string(),
                params: params.to_vec(),
            });
        self.take_response();
        Ok(())
    }

    fn execute_many(&mut self, sql: &str, param_rows: &[Vec<SqlValue>]) -> Result<()> {
        self.shared.batch_count.fetch_add(1, Ordering::SeqCst);
        let mut recorded = self.shared.recorded_queries.lock().unwrap();
        for params in param_rows {
            recorded.push(RecordedQuery {
                sql: sql.to_string(),
                params: params.clone(),
            });
        }
        drop(recorded);
        self.take_response();
        Ok(())
    }

    fn fetch_one(&mut self) -> Result<Option<Vec<SqlValue>>> {
        Ok(self.pending.pop_front())
    }

    fn fetch_many(&mut self, size: usize) -> Result<Vec<Vec<SqlValue>>> {
        let take = size.min(self.pending.len());
        Ok(self.pending.drain(..take).collect())
    }

    fn fetch_all(&mut self) -> Result<Vec<Vec<SqlValue>>> {
        Ok(self.pending.drain(..).collect())
    }

    fn rowcount(&self) -> i64 {
        self.rowcount
    }

    fn description(&self) -> Vec<ColumnDescription> {
        self.description.clone()
    }

    fn close(&mut self) -> Result<()> {
        if let Some(message) = self.shared.fail_cursor_close.lock().unwrap().clone() {
            return Err(IfxError::ConnectionFailed(message));
        }
        self.closed = true;
        Ok(())
    }
}

/// Builder for creating test result sets easily.
pub struct InMemoryResponseBuilder {
    columns: Vec<ColumnDescription>,
    rows: Vec<Vec<SqlValue>>,
}

impl InMemoryResponseBuilder {
    pub fn new() -> Self {
        Self {
            columns: Vec::new(),
            rows: Vec::new(),
        }
    }

    /// Set the column names for the result set.
    pub fn columns(mut self, cols: &[&str]) -> Self {
        self.columns = cols
            .iter()
            .map(|name| ColumnDescription::new(*name, "lvarchar", true))
            .collect();
        self
    }

    /// Add a row of values.
    pub fn row(mut self, values: Vec<SqlValue>) -> Self {
        self.rows.push(values);
        self
    }

    pub fn build(self) -> (Vec<ColumnDescription>, Vec<Vec<SqlValue>>) {
        (self.columns, self.rows)
    }
}

impl Default for InMemoryResponseBuilder {
    fn default() -> Self {
        Self::new()
    }
}
