/// # Test Utilities Module
///
/// Fixtures shared by the unit and integration tests:
/// - `TempDatabase`: an isolated SQLite file that survives reconnects
/// - `FaultyConnector`: a SQLite connector whose connections can be killed,
///   made to fail on close, or refused, and which records every statement
///   that reaches the driver
use crate::config::DbConfig;
use crate::core::db::driver::{
    Backend, Connector, DriverError, DriverResult, StatementOutput,
};
use crate::core::db::sqlite::SqliteConnector;
use crate::core::db::{DatabaseClient, Value};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tempfile::TempDir;

/// A throwaway database file; removed when dropped.
pub struct TempDatabase {
    dir: TempDir,
}

impl TempDatabase {
    pub fn new() -> Self {
        TempDatabase {
            dir: tempfile::tempdir().unwrap(),
        }
    }

    pub fn config(&self) -> DbConfig {
        DbConfig::sqlite(self.dir.path().join("test.db").to_string_lossy().into_owned())
    }
}

/// Opens a client on `db` through the regular SQLite driver.
pub fn sqlite_client(db: &TempDatabase) -> DatabaseClient {
    DatabaseClient::connect(db.config()).unwrap()
}

/// Switches shared by a [`FaultyConnector`] and every backend it opened.
#[derive(Debug, Default)]
pub struct Faults {
    /// Bumped by `kill`; backends opened before the bump are dead
    generation: AtomicUsize,
    fail_close: AtomicBool,
    refuse: AtomicBool,
    connects: AtomicUsize,
    statements: Mutex<Vec<String>>,
}

impl Faults {
    /// Severs every connection opened so far.
    pub fn kill(&self) {
        self.generation.fetch_add(1, Ordering::SeqCst);
    }

    pub fn fail_close(&self) {
        self.fail_close.store(true, Ordering::SeqCst);
    }

    pub fn refuse_connections(&self) {
        self.refuse.store(true, Ordering::SeqCst);
    }

    pub fn connects(&self) -> usize {
        self.connects.load(Ordering::SeqCst)
    }

    /// SQL text of every statement that reached the driver, in order.
    pub fn statements(&self) -> Vec<String> {
        self.statements.lock().unwrap().clone()
    }
}

pub struct FaultyConnector {
    inner: SqliteConnector,
    faults: Arc<Faults>,
}

impl FaultyConnector {
    pub fn new() -> (Self, Arc<Faults>) {
        let faults = Arc::new(Faults::default());
        (
            FaultyConnector {
                inner: SqliteConnector,
                faults: Arc::clone(&faults),
            },
            faults,
        )
    }
}

impl Connector for FaultyConnector {
    fn connect(&self, config: &DbConfig) -> DriverResult<Box<dyn Backend>> {
        if self.faults.refuse.load(Ordering::SeqCst) {
            return Err(DriverError::with_code(2003, "Can't connect to server"));
        }
        let inner = self.inner.connect(config)?;
        self.faults.connects.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(FaultyBackend {
            inner,
            generation: self.faults.generation.load(Ordering::SeqCst),
            faults: Arc::clone(&self.faults),
        }))
    }
}

struct FaultyBackend {
    inner: Box<dyn Backend>,
    generation: usize,
    faults: Arc<Faults>,
}

impl FaultyBackend {
    fn check(&self) -> DriverResult<()> {
        if self.generation != self.faults.generation.load(Ordering::SeqCst) {
            return Err(DriverError::with_code(2006, "MySQL server has gone away"));
        }
        Ok(())
    }
}

impl Backend for FaultyBackend {
    fn ping(&mut self) -> DriverResult<()> {
        self.check()?;
        self.inner.ping()
    }

    fn execute(&mut self, sql: &str, params: &[Value]) -> DriverResult<StatementOutput> {
        self.check()?;
        self.faults.statements.lock().unwrap().push(sql.to_string());
        self.inner.execute(sql, params)
    }

    fn execute_batch(&mut self, sql: &str, rows: &[Vec<Value>]) -> DriverResult<u64> {
        self.check()?;
        self.faults.statements.lock().unwrap().push(sql.to_string());
        self.inner.execute_batch(sql, rows)
    }

    fn set_autocommit(&mut self, enabled: bool) -> DriverResult<()> {
        self.check()?;
        self.inner.set_autocommit(enabled)
    }

    fn is_autocommit(&self) -> bool {
        self.inner.is_autocommit()
    }

    fn commit(&mut self) -> DriverResult<()> {
        self.check()?;
        self.inner.commit()
    }

    fn rollback(&mut self) -> DriverResult<()> {
        self.check()?;
        self.inner.rollback()
    }

    fn close(self: Box<Self>) -> DriverResult<()> {
        if self.faults.fail_close.load(Ordering::SeqCst) {
            return Err(DriverError::new("connection reset by peer"));
        }
        self.inner.close()
    }
}

/// Opens a client on `db` through a [`FaultyConnector`].
pub fn faulty_client(db: &TempDatabase) -> (DatabaseClient, Arc<Faults>) {
    let (connector, faults) = FaultyConnector::new();
    let client = DatabaseClient::with_connector(db.config(), Box::new(connector)).unwrap();
    (client, faults)
}
