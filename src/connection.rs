use std::sync::Arc;
use std::time::Instant;

use encoding_rs::Encoding;
use tracing::{debug, info};

use crate::bridge::{NativeBridge, NativeConnection};
use crate::config::{ConnectionParameters, DRIVER_CLASS, MAX_WRITE_SIZE};
use crate::convert::{decode_with_fallback, unescape_newlines};
use crate::cursor::Cursor;
use crate::error::{IfxError, Result};
use crate::operations;
use crate::runtime::BridgeRuntime;

/// Session isolation levels, each issued as a literal control statement.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IsolationLevel {
    DirtyRead,
    CommittedRead,
    RepeatableRead,
    CommittedReadRetainUpdateLocks,
}

impl IsolationLevel {
    pub fn sql(self) -> &'static str {
        match self {
            IsolationLevel::DirtyRead => "set isolation to dirty read;",
            IsolationLevel::CommittedRead => "set isolation to committed read;",
            IsolationLevel::RepeatableRead => "set isolation to repeatable read;",
            IsolationLevel::CommittedReadRetainUpdateLocks => {
                "set isolation to committed read retain update locks;"
            }
        }
    }
}

/// Owns the connection parameters and at most one live native connection.
///
/// The connection is established lazily on first use and validated on a
/// timer at the start of each unit of work. Transactions are controlled by
/// explicit statements; the bridge's own commit/rollback primitives are
/// never used.
pub struct Connection {
    bridge: Arc<dyn NativeBridge>,
    runtime: Arc<BridgeRuntime>,
    params: ConnectionParameters,
    handle: Option<Box<dyn NativeConnection>>,
    last_validation: Option<Instant>,
    driver_charset: Option<&'static Encoding>,
    autocommit: bool,
}

impl Connection {
    pub fn new(
        bridge: Arc<dyn NativeBridge>,
        runtime: Arc<BridgeRuntime>,
        params: ConnectionParameters,
    ) -> Result<Self> {
        let driver_charset = match &params.options.driver_charset {
            Some(label) => Some(Encoding::for_label(label.as_bytes()).ok_or_else(|| {
                IfxError::Configuration(format!("unknown driver charset: {}", label))
            })?),
            None => None,
        };
        let autocommit = params.autocommit;
        Ok(Self {
            bridge,
            runtime,
            params,
            handle: None,
            last_validation: None,
            driver_charset,
            autocommit,
        })
    }

    pub fn parameters(&self) -> &ConnectionParameters {
        &self.params
    }

    pub fn is_open(&self) -> bool {
        self.handle.is_some()
    }

    /// Establish the native connection if it is not already open.
    ///
    /// Attaches the calling thread to the shared bridge runtime first,
    /// then applies the write-size ceiling, autocommit flag and any
    /// configured lock-mode wait.
    pub fn connect(&mut self) -> Result<()> {
        if self.handle.is_some() {
            return Ok(());
        }

        let url = self.params.build_url();
        debug!(url = %url, "opening informix connection");

        let bridge = Arc::clone(&self.bridge);
        self.runtime
            .attach_current_thread(|| bridge.attach_current_thread())?;

        let jars: Vec<&std::path::Path> =
            self.params.drivers.iter().map(|p| p.as_path()).collect();
        let handle =
            self.bridge
                .connect(DRIVER_CLASS, &url, &self.params.credentials(), &jars)?;

        handle.set_max_write(MAX_WRITE_SIZE)?;
        handle.set_autocommit(self.autocommit)?;
        self.handle = Some(handle);

        if let Some(wait) = self.params.options.lock_mode_wait {
            self.set_lock_mode(wait)?;
        }
        Ok(())
    }

    /// Open a cursor, connecting first if needed.
    pub fn cursor(&mut self) -> Result<Cursor> {
        self.connect()?;
        debug!("creating informix cursor");
        let handle = self.handle.as_ref().ok_or_else(|| {
            IfxError::ConnectionFailed("connection is not open".to_string())
        })?;
        Ok(Cursor::new(handle.cursor()?, self.driver_charset))
    }

    fn execute_statement(&mut self, sql: &str) -> Result<()> {
        let mut cursor = self.cursor()?;
        cursor.execute(sql, &[])?;
        cursor.close()
    }

    /// Liveness check: open a cursor, run the probe statement, close the
    /// cursor. Any failure at any step reduces to `false`; nothing is ever
    /// raised past this boundary.
    ///
    /// The cursor is closed explicitly rather than left to be collected,
    /// and a failed close also counts as unusable.
    pub fn is_usable(&mut self) -> bool {
        let Some(handle) = self.handle.as_ref() else {
            return false;
        };

        let mut native = match handle.cursor() {
            Ok(cursor) => cursor,
            Err(exc) => {
                info!("error creating cursor: {}", exc);
                return false;
            }
        };

        let usable = match native.execute(&self.params.options.validation_query, &[]) {
            Ok(()) => true,
            Err(exc) => {
                info!("error executing query: {}", exc);
                false
            }
        };

        match native.close() {
            Ok(()) => usable,
            Err(exc) => {
                info!("error closing cursor: {}", exc);
                false
            }
        }
    }

    /// Validation entry point, invoked by the surrounding framework at the
    /// start of each unit of work.
    ///
    /// Probes at most once per validation interval; an unusable connection
    /// is closed so the next use reconnects. Idempotent and side-effect
    /// free beyond connection teardown.
    pub fn begin_unit_of_work(&mut self) {
        if !self.params.options.validate_connection {
            return;
        }
        if let Some(last) = self.last_validation {
            if last.elapsed() < self.params.options.validation_interval {
                return;
            }
        }
        self.last_validation = Some(Instant::now());

        if self.handle.is_some() && !self.is_usable() {
            if let Err(exc) = self.close() {
                info!("error closing unusable connection: {}", exc);
            }
        }
    }

    /// Set the session lock-mode wait policy.
    ///
    /// `0` does not wait and errors out on a lock conflict, `-1` waits
    /// until the lock is released and a positive value waits that many
    /// seconds.
    pub fn set_lock_mode(&mut self, wait: i32) -> Result<()> {
        let sql = match wait {
            0 => "SET LOCK MODE TO NOT WAIT".to_string(),
            -1 => "SET LOCK MODE TO WAIT".to_string(),
            n => format!("SET LOCK MODE TO WAIT {}", n),
        };
        self.execute_statement(&sql)
    }

    pub fn set_isolation_level(&mut self, level: IsolationLevel) -> Result<()> {
        self.execute_statement(level.sql())
    }

    pub fn set_autocommit(&mut self, autocommit: bool) -> Result<()> {
        self.autocommit = autocommit;
        if let Some(handle) = self.handle.as_ref() {
            handle.set_autocommit(autocommit)?;
        }
        Ok(())
    }

    /// The dialect requires explicit statement-based transaction control;
    /// a no-op when no connection is open.
    pub fn commit(&mut self) -> Result<()> {
        if self.handle.is_none() {
            return Ok(());
        }
        self.execute_statement("COMMIT WORK")
    }

    pub fn rollback(&mut self) -> Result<()> {
        if self.handle.is_none() {
            return Ok(());
        }
        self.execute_statement("ROLLBACK WORK")
    }

    /// Start a transaction explicitly while in autocommit mode.
    pub fn start_transaction_under_autocommit(&mut self) -> Result<()> {
        self.execute_statement(operations::start_transaction_sql())
    }

    /// Constraint checking is deferred by default; force immediate
    /// evaluation, then restore deferred mode.
    pub fn check_constraints(&mut self) -> Result<()> {
        self.execute_statement("SET CONSTRAINTS ALL IMMEDIATE")?;
        self.execute_statement("SET CONSTRAINTS ALL DEFERRED")
    }

    /// Decode a raw driver value: undo the driver's double-escaped
    /// newlines, then try each configured fallback encoding in order.
    pub fn output_converter(&self, raw: &[u8]) -> Result<String> {
        decode_with_fallback(&unescape_newlines(raw), &self.params.options.encodings)
    }

    /// Close the native connection. The closed handle is gone for good; a
    /// later use establishes a fresh one.
    pub fn close(&mut self) -> Result<()> {
        if let Some(handle) = self.handle.take() {
            handle.close()?;
        }
        Ok(())
    }

    /// Terminate the shared bridge runtime according to its configured
    /// shutdown strategy.
    pub fn shutdown(&self) -> Result<()> {
        self.runtime.shutdown()
    }
}
