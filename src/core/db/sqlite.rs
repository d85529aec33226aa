/// SQLite backend built on rusqlite.
///
/// The configured `database` is the file path (`:memory:` for an in-memory
/// database). Network settings are ignored and SQLite text is always UTF-8,
/// so `charset` is only checked for plausibility.

use crate::config::DbConfig;
use crate::core::db::driver::{Backend, Connector, DriverError, DriverResult, StatementOutput};
use crate::core::db::value::{Record, Value};
use rusqlite::types::{ToSqlOutput, Value as SqlValue, ValueRef};
use rusqlite::{params_from_iter, Connection, ErrorCode, ToSql};
use tracing::{debug, warn};

impl From<rusqlite::Error> for DriverError {
    fn from(err: rusqlite::Error) -> Self {
        match &err {
            rusqlite::Error::SqliteFailure(failure, _) if failure.code == ErrorCode::DatabaseBusy => {
                DriverError {
                    code: Some(failure.extended_code),
                    message: err.to_string(),
                    timed_out: true,
                }
            }
            rusqlite::Error::SqliteFailure(failure, _) => {
                DriverError::with_code(failure.extended_code, err.to_string())
            }
            _ => DriverError::new(err.to_string()),
        }
    }
}

impl ToSql for Value {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(match self {
            Value::Null => ToSqlOutput::Owned(SqlValue::Null),
            Value::Bool(b) => ToSqlOutput::Owned(SqlValue::Integer(i64::from(*b))),
            Value::Int(n) => ToSqlOutput::Owned(SqlValue::Integer(*n)),
            Value::UInt(n) => {
                let n = i64::try_from(*n)
                    .map_err(|e| rusqlite::Error::ToSqlConversionFailure(Box::new(e)))?;
                ToSqlOutput::Owned(SqlValue::Integer(n))
            }
            Value::Float(f) => ToSqlOutput::Owned(SqlValue::Real(*f)),
            Value::Text(s) => ToSqlOutput::Borrowed(ValueRef::Text(s.as_bytes())),
            Value::Bytes(b) => ToSqlOutput::Borrowed(ValueRef::Blob(b)),
            Value::Date(d) => ToSqlOutput::Owned(SqlValue::Text(d.format("%Y-%m-%d").to_string())),
            Value::DateTime(dt) => ToSqlOutput::Owned(SqlValue::Text(
                dt.format("%Y-%m-%d %H:%M:%S%.f").to_string(),
            )),
        })
    }
}

fn from_value_ref(value: ValueRef<'_>) -> Value {
    match value {
        ValueRef::Null => Value::Null,
        ValueRef::Integer(i) => Value::Int(i),
        ValueRef::Real(f) => Value::Float(f),
        ValueRef::Text(t) => Value::Text(String::from_utf8_lossy(t).into_owned()),
        ValueRef::Blob(b) => Value::Bytes(b.to_vec()),
    }
}

/// Opens [`SqliteBackend`] connections.
#[derive(Debug, Default, Clone, Copy)]
pub struct SqliteConnector;

impl Connector for SqliteConnector {
    fn connect(&self, config: &DbConfig) -> DriverResult<Box<dyn Backend>> {
        Ok(Box::new(SqliteBackend::open(config)?))
    }
}

/// A rusqlite connection behind the [`Backend`] seam.
#[derive(Debug)]
pub struct SqliteBackend {
    conn: Connection,
}

impl SqliteBackend {
    pub fn open(config: &DbConfig) -> DriverResult<Self> {
        debug!(path = %config.database, "opening sqlite database");
        let conn = if config.database == ":memory:" {
            Connection::open_in_memory()?
        } else {
            Connection::open(&config.database)?
        };

        if !config.charset.to_ascii_lowercase().starts_with("utf8") {
            warn!(charset = %config.charset, "sqlite stores text as UTF-8; charset setting ignored");
        }

        if let Some(timeout) = config.read_timeout() {
            conn.busy_timeout(timeout)?;
        }
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;

        Ok(Self { conn })
    }
}

impl Backend for SqliteBackend {
    fn ping(&mut self) -> DriverResult<()> {
        self.conn.query_row("SELECT 1", [], |_| Ok(()))?;
        Ok(())
    }

    fn execute(&mut self, sql: &str, params: &[Value]) -> DriverResult<StatementOutput> {
        let mut stmt = self.conn.prepare(sql)?;
        let column_count = stmt.column_count();

        if column_count == 0 {
            let affected = stmt.execute(params_from_iter(params.iter()))?;
            return Ok(StatementOutput::affected(affected as u64));
        }

        let columns: Vec<String> = stmt.column_names().into_iter().map(String::from).collect();
        let mut rows = stmt.query(params_from_iter(params.iter()))?;
        let mut records = Vec::new();
        while let Some(row) = rows.next()? {
            let mut values = Vec::with_capacity(column_count);
            for i in 0..column_count {
                values.push(from_value_ref(row.get_ref(i)?));
            }
            records.push(Record::new(columns.clone(), values));
        }
        Ok(StatementOutput::rows(records))
    }

    fn execute_batch(&mut self, sql: &str, rows: &[Vec<Value>]) -> DriverResult<u64> {
        let mut stmt = self.conn.prepare(sql)?;
        let mut total = 0u64;
        for row in rows {
            total += stmt.execute(params_from_iter(row.iter()))? as u64;
        }
        Ok(total)
    }

    fn set_autocommit(&mut self, enabled: bool) -> DriverResult<()> {
        // SQLite has no autocommit switch: an open BEGIN is "autocommit off".
        match (enabled, self.conn.is_autocommit()) {
            (false, true) => self.conn.execute_batch("BEGIN")?,
            (true, false) => self.conn.execute_batch("COMMIT")?,
            _ => {}
        }
        Ok(())
    }

    fn is_autocommit(&self) -> bool {
        self.conn.is_autocommit()
    }

    fn commit(&mut self) -> DriverResult<()> {
        if !self.conn.is_autocommit() {
            self.conn.execute_batch("COMMIT")?;
        }
        Ok(())
    }

    fn rollback(&mut self) -> DriverResult<()> {
        if !self.conn.is_autocommit() {
            self.conn.execute_batch("ROLLBACK")?;
        }
        Ok(())
    }

    fn close(self: Box<Self>) -> DriverResult<()> {
        self.conn.close().map_err(|(_, err)| err.into())
    }
}
