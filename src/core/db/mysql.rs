/// MySQL backend built on the synchronous `mysql` driver.
///
/// Connection options map one to one onto [`DbConfig`]; the charset is
/// applied with `SET NAMES` on every new connection and autocommit is
/// forced on.

use crate::config::DbConfig;
use crate::core::db::driver::{Backend, Connector, DriverError, DriverResult, StatementOutput};
use crate::core::db::value::{Record, Value};
use chrono::{Datelike, NaiveDate, NaiveDateTime, NaiveTime, Timelike};
use mysql::prelude::{Protocol, Queryable};
use mysql::{Conn, OptsBuilder, Params, QueryResult, Row};
use std::io::ErrorKind;
use tracing::debug;

impl From<mysql::Error> for DriverError {
    fn from(err: mysql::Error) -> Self {
        match err {
            mysql::Error::MySqlError(e) => DriverError::with_code(i32::from(e.code), e.message),
            mysql::Error::IoError(e)
                if matches!(e.kind(), ErrorKind::TimedOut | ErrorKind::WouldBlock) =>
            {
                DriverError::timeout(e.to_string())
            }
            other => DriverError::new(other.to_string()),
        }
    }
}

/// Convert a client value to a MySQL parameter
fn value_to_mysql(value: &Value) -> mysql::Value {
    match value {
        Value::Null => mysql::Value::NULL,
        Value::Bool(b) => mysql::Value::Int(i64::from(*b)),
        Value::Int(n) => mysql::Value::Int(*n),
        Value::UInt(n) => mysql::Value::UInt(*n),
        Value::Float(f) => mysql::Value::Double(*f),
        Value::Text(s) => mysql::Value::Bytes(s.as_bytes().to_vec()),
        Value::Bytes(b) => mysql::Value::Bytes(b.clone()),
        Value::Date(d) => {
            mysql::Value::Date(d.year() as u16, d.month() as u8, d.day() as u8, 0, 0, 0, 0)
        }
        Value::DateTime(dt) => mysql::Value::Date(
            dt.year() as u16,
            dt.month() as u8,
            dt.day() as u8,
            dt.hour() as u8,
            dt.minute() as u8,
            dt.second() as u8,
            dt.nanosecond() / 1000,
        ),
    }
}

/// Convert a MySQL value to a client value
fn mysql_to_value(value: mysql::Value) -> Value {
    match value {
        mysql::Value::NULL => Value::Null,
        mysql::Value::Bytes(b) => match String::from_utf8(b) {
            Ok(s) => Value::Text(s),
            Err(e) => Value::Bytes(e.into_bytes()),
        },
        mysql::Value::Int(n) => Value::Int(n),
        mysql::Value::UInt(n) => Value::UInt(n),
        mysql::Value::Float(f) => Value::Float(f64::from(f)),
        mysql::Value::Double(d) => Value::Float(d),
        mysql::Value::Date(year, month, day, hour, min, sec, micro) => {
            let date = NaiveDate::from_ymd_opt(i32::from(year), u32::from(month), u32::from(day));
            let time = NaiveTime::from_hms_micro_opt(
                u32::from(hour),
                u32::from(min),
                u32::from(sec),
                micro,
            );
            match (date, time) {
                (Some(date), Some(_)) if hour == 0 && min == 0 && sec == 0 && micro == 0 => {
                    Value::Date(date)
                }
                (Some(date), Some(time)) => Value::DateTime(NaiveDateTime::new(date, time)),
                // Zero dates ('0000-00-00') have no chrono representation
                _ => Value::Null,
            }
        }
        mysql::Value::Time(neg, days, hour, min, sec, micro) => {
            let hours = days * 24 + u32::from(hour);
            let sign = if neg { "-" } else { "" };
            Value::Text(format!("{sign}{hours:02}:{min:02}:{sec:02}.{micro:06}"))
        }
    }
}

fn into_record(row: Row) -> Record {
    let columns: Vec<String> = row
        .columns_ref()
        .iter()
        .map(|c| c.name_str().to_string())
        .collect();
    let values = (0..row.len())
        .map(|i| mysql_to_value(row.get(i).unwrap_or(mysql::Value::NULL)))
        .collect();
    Record::new(columns, values)
}

/// Drains the first result set. A statement that produced no column
/// definitions is a write; anything else is a result set, possibly empty.
fn collect_output<T: Protocol>(
    mut result: QueryResult<'_, '_, '_, T>,
) -> DriverResult<StatementOutput> {
    if result.columns().as_ref().is_empty() {
        return Ok(StatementOutput::affected(result.affected_rows()));
    }
    let records = result
        .by_ref()
        .map(|row| row.map(into_record))
        .collect::<mysql::Result<Vec<_>>>()?;
    Ok(StatementOutput::rows(records))
}

/// Opens [`MySqlBackend`] connections.
#[derive(Debug, Default, Clone, Copy)]
pub struct MySqlConnector;

impl Connector for MySqlConnector {
    fn connect(&self, config: &DbConfig) -> DriverResult<Box<dyn Backend>> {
        Ok(Box::new(MySqlBackend::open(config)?))
    }
}

/// A `mysql::Conn` behind the [`Backend`] seam.
pub struct MySqlBackend {
    conn: Conn,
    autocommit: bool,
}

impl MySqlBackend {
    pub fn open(config: &DbConfig) -> DriverResult<Self> {
        debug!(
            host = %config.host,
            port = config.port,
            user = %config.user,
            database = %config.database,
            "connecting to mysql"
        );
        let opts = OptsBuilder::new()
            .ip_or_hostname(Some(config.host.clone()))
            .tcp_port(config.port)
            .user(Some(config.user.clone()))
            .pass(Some(config.password.clone()))
            .db_name(Some(config.database.clone()))
            .init(vec![
                format!("SET NAMES {}", config.charset),
                "SET autocommit = 1".to_string(),
            ])
            .tcp_connect_timeout(config.connect_timeout())
            .read_timeout(config.read_timeout())
            .write_timeout(config.write_timeout());

        let conn = Conn::new(opts)?;
        Ok(Self {
            conn,
            autocommit: true,
        })
    }
}

impl Backend for MySqlBackend {
    fn ping(&mut self) -> DriverResult<()> {
        self.conn.ping()?;
        Ok(())
    }

    fn execute(&mut self, sql: &str, params: &[Value]) -> DriverResult<StatementOutput> {
        // Raw text goes over the text protocol; only bound statements are prepared.
        if params.is_empty() {
            collect_output(self.conn.query_iter(sql)?)
        } else {
            let params = Params::Positional(params.iter().map(value_to_mysql).collect());
            collect_output(self.conn.exec_iter(sql, params)?)
        }
    }

    fn execute_batch(&mut self, sql: &str, rows: &[Vec<Value>]) -> DriverResult<u64> {
        let stmt = self.conn.prep(sql)?;
        let mut total = 0u64;
        for row in rows {
            let params = Params::Positional(row.iter().map(value_to_mysql).collect());
            self.conn.exec_drop(&stmt, params)?;
            total += self.conn.affected_rows();
        }
        Ok(total)
    }

    fn set_autocommit(&mut self, enabled: bool) -> DriverResult<()> {
        let sql = if enabled {
            "SET autocommit = 1"
        } else {
            "SET autocommit = 0"
        };
        self.conn.query_drop(sql)?;
        self.autocommit = enabled;
        Ok(())
    }

    fn is_autocommit(&self) -> bool {
        self.autocommit
    }

    fn commit(&mut self) -> DriverResult<()> {
        self.conn.query_drop("COMMIT")?;
        Ok(())
    }

    fn rollback(&mut self) -> DriverResult<()> {
        self.conn.query_drop("ROLLBACK")?;
        Ok(())
    }

    fn close(self: Box<Self>) -> DriverResult<()> {
        // Dropping the handle sends COM_QUIT when the socket is still usable.
        drop(self);
        Ok(())
    }
}
