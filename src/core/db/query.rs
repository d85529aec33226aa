/// Query Execution Module
///
/// Statement execution for [`DatabaseClient`]: raw SQL, bound statements,
/// result fetching, and the structured builder calls that funnel into them.

use crate::core::db::builder::{self, BatchStatement, Statement};
use crate::core::db::connection::DatabaseClient;
use crate::core::db::value::{Record, Value};
use crate::core::{DbError, Result};
use tracing::debug;

impl DatabaseClient {
    /// Executes a SQL statement after checking the connection is alive.
    ///
    /// # Returns
    ///
    /// The number of affected rows for writes, or the number of matched
    /// rows for row-returning statements; those rows are kept for
    /// [`DatabaseClient::fetch_all`].
    ///
    /// # Errors
    ///
    /// Returns `DbError::Query` with the SQL attached if the server
    /// rejects the statement, `DbError::Timeout` if the driver timed out,
    /// and `DbError::TransactionLost` while a lost transaction is
    /// unacknowledged.
    pub fn execute(&mut self, sql: &str) -> Result<u64> {
        self.execute_with(sql, &[])
    }

    /// Executes a SQL statement with positional `?` parameters.
    pub fn execute_with(&mut self, sql: &str, params: &[Value]) -> Result<u64> {
        self.ensure_usable()?;
        self.pending = None;
        debug!(sql, params = params.len(), "executing statement");
        let output = self
            .backend_mut()?
            .execute(sql, params)
            .map_err(|e| DbError::statement(e, sql))?;
        self.pending = output.rows;
        Ok(output.row_count)
    }

    /// Returns the rows of the last executed row-returning statement.
    ///
    /// `Ok(None)` means the statement matched no rows. The result set is
    /// consumed; it is never re-executed.
    ///
    /// # Errors
    ///
    /// `DbError::State` if no result set is pending.
    pub fn fetch_all(&mut self) -> Result<Option<Vec<Record>>> {
        let rows = self
            .pending
            .take()
            .ok_or_else(|| DbError::State("no result set to fetch".to_string()))?;
        Ok(if rows.is_empty() { None } else { Some(rows) })
    }

    /// Whether a result set is waiting for [`DatabaseClient::fetch_all`].
    pub fn has_pending_results(&self) -> bool {
        self.pending.is_some()
    }

    /// Runs a row-returning statement and fetches its rows.
    ///
    /// ```no_run
    /// # fn demo(db: &mut relinkdb::core::db::DatabaseClient) -> relinkdb::core::Result<()> {
    /// let adults = db.select("SELECT * FROM user WHERE age > 20")?;
    /// # Ok(()) }
    /// ```
    pub fn select(&mut self, sql: &str) -> Result<Option<Vec<Record>>> {
        self.execute(sql)?;
        if !self.has_pending_results() {
            return Err(DbError::Query {
                message: "statement does not return rows".to_string(),
                sql: sql.to_string(),
            });
        }
        self.fetch_all()
    }

    /// Runs a raw `INSERT`, returning the number of inserted rows.
    pub fn insert(&mut self, sql: &str) -> Result<u64> {
        self.execute(sql)
    }

    /// Runs a raw `UPDATE`, returning the number of changed rows.
    pub fn update(&mut self, sql: &str) -> Result<u64> {
        self.execute(sql)
    }

    /// Runs a raw `DELETE`, returning the number of deleted rows.
    pub fn delete(&mut self, sql: &str) -> Result<u64> {
        self.execute(sql)
    }

    fn execute_statement(&mut self, stmt: &Statement) -> Result<u64> {
        self.execute_with(&stmt.sql, &stmt.params)
    }

    /// `SELECT * FROM <table> WHERE <clause>`; no clause selects every row.
    pub fn select_by_condition(
        &mut self,
        table: &str,
        where_clause: Option<&str>,
    ) -> Result<Option<Vec<Record>>> {
        let stmt = builder::select_by_condition(table, where_clause)?;
        self.execute_statement(&stmt)?;
        self.fetch_all()
    }

    /// Inserts one row from `(column, value)` pairs.
    ///
    /// ```no_run
    /// # fn demo(db: &mut relinkdb::core::db::DatabaseClient) -> relinkdb::core::Result<()> {
    /// db.insert_by_fields("user", [("name", "HanJunwei")])?;
    /// # Ok(()) }
    /// ```
    pub fn insert_by_fields<I, K, V>(&mut self, table: &str, fields: I) -> Result<u64>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<Value>,
    {
        let stmt = builder::insert_by_fields(table, fields)?;
        self.execute_statement(&stmt)
    }

    /// Inserts many rows with one prepared statement.
    ///
    /// Every row must have exactly `field_names.len()` values; otherwise a
    /// `DbError::Validation` is returned and nothing is sent.
    pub fn insert_many<S: AsRef<str>>(
        &mut self,
        table: &str,
        field_names: &[S],
        rows: Vec<Vec<Value>>,
    ) -> Result<u64> {
        let batch = builder::insert_many(table, field_names, rows)?;
        self.execute_batch(&batch)
    }

    fn execute_batch(&mut self, batch: &BatchStatement) -> Result<u64> {
        if batch.rows.is_empty() {
            return Ok(0);
        }
        self.ensure_usable()?;
        self.pending = None;
        debug!(sql = %batch.sql, rows = batch.rows.len(), "executing batch");
        self.backend_mut()?
            .execute_batch(&batch.sql, &batch.rows)
            .map_err(|e| DbError::statement(e, &batch.sql))
    }

    /// `UPDATE <table> SET ... WHERE <clause>`; no clause updates every row.
    pub fn update_by_condition<I, K, V>(
        &mut self,
        table: &str,
        fields: I,
        where_clause: Option<&str>,
    ) -> Result<u64>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<Value>,
    {
        let stmt = builder::update_by_condition(table, fields, where_clause)?;
        self.execute_statement(&stmt)
    }

    /// `DELETE FROM <table> WHERE <clause>`; no clause deletes every row.
    pub fn delete_by_condition(&mut self, table: &str, where_clause: Option<&str>) -> Result<u64> {
        let stmt = builder::delete_by_condition(table, where_clause)?;
        self.execute_statement(&stmt)
    }
}
