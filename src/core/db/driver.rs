/// Driver Seam Module
///
/// The client never talks to a driver crate directly. A [`Connector`] opens
/// physical connections for a [`DbConfig`], and each connection is a
/// [`Backend`]: the live handle plus the cursor state bound to it.

use crate::config::{DbConfig, DriverKind};
use crate::core::db::value::{Record, Value};
use crate::core::Result;
use std::fmt;

/// A failure reported by the underlying driver, before it is classified
/// into a [`DbError`](crate::core::DbError).
#[derive(Debug, Clone, PartialEq)]
pub struct DriverError {
    /// Server or library error code, when the driver provides one
    pub code: Option<i32>,
    /// Driver-provided description
    pub message: String,
    /// Whether the driver gave up waiting on the server
    pub timed_out: bool,
}

impl DriverError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            code: None,
            message: message.into(),
            timed_out: false,
        }
    }

    pub fn with_code(code: i32, message: impl Into<String>) -> Self {
        Self {
            code: Some(code),
            ..Self::new(message)
        }
    }

    pub fn timeout(message: impl Into<String>) -> Self {
        Self {
            timed_out: true,
            ..Self::new(message)
        }
    }
}

impl fmt::Display for DriverError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.code {
            Some(code) => write!(f, "driver error {}: {}", code, self.message),
            None => write!(f, "driver error: {}", self.message),
        }
    }
}

impl std::error::Error for DriverError {}

pub type DriverResult<T> = std::result::Result<T, DriverError>;

/// Outcome of one executed statement.
#[derive(Debug, Clone, PartialEq)]
pub struct StatementOutput {
    /// Affected rows for writes, matched rows for row-returning statements
    pub row_count: u64,
    /// The result set, present only for row-returning statements
    pub rows: Option<Vec<Record>>,
}

impl StatementOutput {
    pub fn affected(row_count: u64) -> Self {
        Self {
            row_count,
            rows: None,
        }
    }

    pub fn rows(rows: Vec<Record>) -> Self {
        Self {
            row_count: rows.len() as u64,
            rows: Some(rows),
        }
    }
}

/// One live physical connection.
///
/// Implementations are blocking and used by a single caller at a time.
pub trait Backend: Send {
    /// Lightweight round-trip used to detect a dead connection.
    fn ping(&mut self) -> DriverResult<()>;

    /// Executes one statement with positional `?` parameters.
    fn execute(&mut self, sql: &str, params: &[Value]) -> DriverResult<StatementOutput>;

    /// Executes one parameterized statement once per row, returning the
    /// total affected row count.
    fn execute_batch(&mut self, sql: &str, rows: &[Vec<Value>]) -> DriverResult<u64>;

    fn set_autocommit(&mut self, enabled: bool) -> DriverResult<()>;

    fn is_autocommit(&self) -> bool;

    fn commit(&mut self) -> DriverResult<()>;

    fn rollback(&mut self) -> DriverResult<()>;

    /// Closes the connection. Callers treat failure as best-effort.
    fn close(self: Box<Self>) -> DriverResult<()>;
}

/// Opens physical connections for a configuration.
pub trait Connector: Send {
    fn connect(&self, config: &DbConfig) -> DriverResult<Box<dyn Backend>>;
}

/// Returns the connector for the configured driver.
pub fn connector_for(kind: DriverKind) -> Result<Box<dyn Connector>> {
    match kind {
        DriverKind::Sqlite => Ok(Box::new(crate::core::db::sqlite::SqliteConnector)),
        #[cfg(feature = "mysql")]
        DriverKind::Mysql => Ok(Box::new(crate::core::db::mysql::MySqlConnector)),
        #[cfg(not(feature = "mysql"))]
        DriverKind::Mysql => Err(crate::core::DbError::Config(
            "MySQL support is not compiled in; rebuild with the `mysql` feature".to_string(),
        )),
    }
}
