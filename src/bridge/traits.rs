use std::path::Path;

use crate::error::Result;
use crate::types::{ColumnDescription, SqlValue};

/// Credentials handed to the native connect call.
#[derive(Debug, Clone)]
pub struct Credentials {
    pub user: String,
    pub password: String,
}

/// Trait for the native JDBC-style bridge.
///
/// The bridge is responsible for:
/// - Starting (or reusing) the shared driver runtime
/// - Attaching calling threads to that runtime
/// - Opening native connections from a connection URL
///
/// All calls are blocking; any timeout must be imposed by the caller.
pub trait NativeBridge: Send + Sync {
    /// Open a native connection. `driver_class` names the JDBC driver
    /// entry point and `jars` lists the driver artifacts on disk.
    fn connect(
        &self,
        driver_class: &str,
        url: &str,
        credentials: &Credentials,
        jars: &[&Path],
    ) -> Result<Box<dyn NativeConnection>>;

    /// Attach the calling thread to the shared driver runtime. Must be
    /// idempotent; the connection manager guards it one-time-per-thread.
    fn attach_current_thread(&self) -> Result<()> {
        Ok(())
    }

    /// Detach the calling thread from the shared driver runtime.
    fn detach_current_thread(&self) {}
}

/// A live native connection owned by the connection manager.
pub trait NativeConnection: Send + Sync {
    /// Open a native cursor on this connection.
    fn cursor(&self) -> Result<Box<dyn NativeCursor>>;

    /// Cap the write size for large character/binary columns.
    fn set_max_write(&self, bytes: usize) -> Result<()>;

    fn set_autocommit(&self, autocommit: bool) -> Result<()>;

    fn close(&self) -> Result<()>;
}

/// The explicit native cursor interface.
///
/// This lists every operation the execution layer actually needs, by
/// composition over the native cursor reference; there is no dynamic
/// fall-through to unknown driver members.
pub trait NativeCursor: Send {
    fn execute(&mut self, sql: &str, params: &[SqlValue]) -> Result<()>;

    fn execute_many(&mut self, sql: &str, param_rows: &[Vec<SqlValue>]) -> Result<()>;

    fn fetch_one(&mut self) -> Result<Option<Vec<SqlValue>>>;

    fn fetch_many(&mut self, size: usize) -> Result<Vec<Vec<SqlValue>>>;

    fn fetch_all(&mut self) -> Result<Vec<Vec<SqlValue>>>;

    fn rowcount(&self) -> i64;

    fn description(&self) -> Vec<ColumnDescription>;

    fn close(&mut self) -> Result<()>;
}
