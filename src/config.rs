use std::path::PathBuf;
use std::time::Duration;

use indexmap::IndexMap;
use percent_encoding::{utf8_percent_encode, AsciiSet, CONTROLS};

use crate::bridge::Credentials;
use crate::error::{IfxError, Result};

/// JDBC entry point for the Informix driver.
pub const DRIVER_CLASS: &str = "com.informix.jdbc.IfxDriver";

/// Maximum write size applied to every new connection, in bytes.
///
/// This is what the database internally supports for its largest character
/// column (LONGVARCHAR is capped at 32000); anything bigger must be split
/// over multiple fields. Schema-defined lengths are unaffected.
pub const MAX_WRITE_SIZE: usize = 32000;

/// Characters escaped in extra connection-string parameter values.
const PARAM_VALUE_SET: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b';')
    .add(b'=')
    .add(b'&')
    .add(b'%')
    .add(b'#');

/// An extra connection-string parameter value. Lists are comma-joined in
/// the generated URL.
#[derive(Debug, Clone, PartialEq)]
pub enum ParameterValue {
    Single(String),
    List(Vec<String>),
}

impl ParameterValue {
    fn encoded(&self) -> String {
        match self {
            ParameterValue::Single(v) => utf8_percent_encode(v, PARAM_VALUE_SET).to_string(),
            ParameterValue::List(values) => values
                .iter()
                .map(|v| utf8_percent_encode(v, PARAM_VALUE_SET).to_string())
                .collect::<Vec<_>>()
                .join(","),
        }
    }
}

impl From<&str> for ParameterValue {
    fn from(value: &str) -> Self {
        ParameterValue::Single(value.to_string())
    }
}

impl From<Vec<&str>> for ParameterValue {
    fn from(values: Vec<&str>) -> Self {
        ParameterValue::List(values.iter().map(|v| v.to_string()).collect())
    }
}

/// Tunables below the required connection settings.
#[derive(Debug, Clone)]
pub struct ConnectionOptions {
    /// Session lock-mode wait policy, applied right after connect.
    /// `0` fails fast on a lock conflict, `-1` blocks indefinitely and a
    /// positive value blocks for that many seconds.
    pub lock_mode_wait: Option<i32>,
    /// Probe the connection at the start of a unit of work.
    pub validate_connection: bool,
    /// Minimum time between liveness probes.
    pub validation_interval: Duration,
    /// Statement issued by the liveness probe.
    pub validation_query: String,
    /// Fallback encodings tried, in order, when decoding text results.
    pub encodings: Vec<String>,
    /// Collation appended to every LIKE-based lookup operator.
    pub collation: Option<String>,
    /// Charset used to re-encode statements and text parameters when the
    /// driver does not handle UTF-8 itself.
    pub driver_charset: Option<String>,
}

impl Default for ConnectionOptions {
    fn default() -> Self {
        Self {
            lock_mode_wait: None,
            validate_connection: false,
            validation_interval: Duration::from_secs(300),
            validation_query: "SELECT 1 FROM sysmaster:sysdual".to_string(),
            encodings: vec![
                "utf-8".to_string(),
                "cp1252".to_string(),
                "iso-8859-1".to_string(),
            ],
            collation: None,
            driver_charset: None,
        }
    }
}

/// External configuration surface, as consumed from the surrounding
/// framework's settings. Required fields are optional here so validation
/// can name the first one missing.
#[derive(Debug, Clone, Default)]
pub struct Settings {
    pub host: String,
    pub port: u16,
    pub name: Option<String>,
    pub server: Option<String>,
    pub user: Option<String>,
    pub password: Option<String>,
    pub drivers: Option<Vec<PathBuf>>,
    /// Pre-built connection string; when present, the individual
    /// host/server settings are not required.
    pub dsn: Option<String>,
    pub parameters: IndexMap<String, ParameterValue>,
    pub autocommit: Option<bool>,
    pub options: ConnectionOptions,
}

/// Validated connection parameters, ready for a native connect call.
#[derive(Debug, Clone)]
pub struct ConnectionParameters {
    pub host: String,
    pub port: u16,
    pub name: String,
    pub server: String,
    pub user: String,
    pub password: String,
    pub drivers: Vec<PathBuf>,
    pub dsn: Option<String>,
    pub parameters: IndexMap<String, ParameterValue>,
    pub autocommit: bool,
    pub options: ConnectionOptions,
}

impl ConnectionParameters {
    /// Validate external settings into connection parameters.
    ///
    /// Fails naming the first missing required key. Driver artifacts must
    /// exist on disk before any native connect call is attempted.
    pub fn from_settings(settings: &Settings) -> Result<Self> {
        if settings.dsn.is_none() {
            if settings.name.is_none() {
                return Err(IfxError::MissingSetting("NAME"));
            }
            if settings.server.is_none() {
                return Err(IfxError::MissingSetting("SERVER"));
            }
            if settings.user.is_none() {
                return Err(IfxError::MissingSetting("USER"));
            }
            if settings.password.is_none() {
                return Err(IfxError::MissingSetting("PASSWORD"));
            }
            if settings.drivers.is_none() {
                return Err(IfxError::MissingSetting("DRIVERS"));
            }
        }

        let drivers = settings.drivers.clone().unwrap_or_default();
        for driver in &drivers {
            if !driver.exists() {
                return Err(IfxError::DriverNotFound(driver.clone()));
            }
        }

        Ok(Self {
            host: settings.host.clone(),
            port: settings.port,
            name: settings.name.clone().unwrap_or_default(),
            server: settings.server.clone().unwrap_or_default(),
            user: settings.user.clone().unwrap_or_default(),
            password: settings.password.clone().unwrap_or_default(),
            drivers,
            dsn: settings.dsn.clone(),
            parameters: settings.parameters.clone(),
            autocommit: settings.autocommit.unwrap_or(false),
            options: settings.options.clone(),
        })
    }

    /// Build the JDBC connection URL. Extra parameters keep their
    /// configured order, keys are upper-cased and list values comma-joined.
    pub fn build_url(&self) -> String {
        if let Some(dsn) = &self.dsn {
            return dsn.clone();
        }

        let mut url = format!(
            "jdbc:informix-sqli://{}:{}/{}:INFORMIXSERVER={}",
            self.host, self.port, self.name, self.server
        );
        for (key, value) in &self.parameters {
            url.push(';');
            url.push_str(&key.to_uppercase());
            url.push('=');
            url.push_str(&value.encoded());
        }
        url
    }

    pub fn credentials(&self) -> Credentials {
        Credentials {
            user: self.user.clone(),
            password: self.password.clone(),
        }
    }
}
