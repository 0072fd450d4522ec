//! ifxrs - A connection and cursor adaptation layer for driving Informix
//! over a JDBC-style native bridge.
//!
//! The crate hides driver-specific quirks from a generic SQL-execution
//! framework: connection lifecycle with periodic liveness validation,
//! statement-based transaction control, parameter/result marshalling and
//! dialect translation for lookups, casts and bulk flushes.
//!
//! # Example
//! ```ignore
//! use std::sync::Arc;
//! use ifxrs::{
//!     BridgeRuntime, Connection, ConnectionParameters, Settings, ShutdownStrategy,
//! };
//!
//! let settings = Settings {
//!     host: "db.example.com".into(),
//!     port: 9088,
//!     name: Some("stores".into()),
//!     server: Some("ol_informix".into()),
//!     user: Some("informix".into()),
//!     password: Some("secret".into()),
//!     drivers: Some(vec!["/opt/informix/jdbc.jar".into()]),
//!     ..Settings::default()
//! };
//!
//! let params = ConnectionParameters::from_settings(&settings)?;
//! let runtime = BridgeRuntime::new(ShutdownStrategy::Noop);
//! let mut conn = Connection::new(bridge, runtime, params)?;
//!
//! conn.begin_unit_of_work();
//! let mut cursor = conn.cursor()?;
//! cursor.execute("SELECT id, name FROM customers WHERE id = ?", &[1.into()])?;
//! let row = cursor.fetch_one()?;
//! conn.commit()?;
//! ```

pub mod bridge;
pub mod config;
pub mod convert;
pub mod cursor;
pub mod error;
pub mod operations;
pub mod runtime;
pub mod types;

mod connection;

// Re-export main types for convenient access
pub use config::{ConnectionOptions, ConnectionParameters, ParameterValue, Settings};
pub use connection::{Connection, IsolationLevel};
pub use cursor::Cursor;
pub use error::{IfxError, Result};
pub use operations::{DatabaseOperations, Lookup};
pub use runtime::{BridgeRuntime, ShutdownStrategy};
pub use types::{ColumnDescription, Row, SqlValue};
