/// Query Builders
///
/// Pure functions turning a table name plus structured input into SQL. No
/// I/O happens here. Values never appear in the SQL text: they are carried
/// alongside as positional `?` parameters. Identifiers are quoted with
/// backticks, which both MySQL and SQLite accept. WHERE clauses are taken
/// verbatim and an absent clause becomes the literal `true`.

use crate::core::db::value::Value;
use crate::core::{DbError, Result};

/// Predicate used when no WHERE clause is given.
pub const ALWAYS_TRUE: &str = "true";

/// SQL text plus the parameters bound to its placeholders.
#[derive(Debug, Clone, PartialEq)]
pub struct Statement {
    pub sql: String,
    pub params: Vec<Value>,
}

/// One parameterized statement to be run once per row.
#[derive(Debug, Clone, PartialEq)]
pub struct BatchStatement {
    pub sql: String,
    pub rows: Vec<Vec<Value>>,
}

/// Quotes an identifier, splitting `schema.table` into its parts.
pub fn quote_identifier(name: &str) -> Result<String> {
    if name.is_empty() {
        return Err(DbError::Validation("identifier must not be empty".to_string()));
    }
    name.split('.')
        .map(|part| {
            if part.is_empty() || part.contains('\0') {
                Err(DbError::Validation(format!("invalid identifier '{name}'")))
            } else {
                Ok(format!("`{}`", part.replace('`', "``")))
            }
        })
        .collect::<Result<Vec<_>>>()
        .map(|parts| parts.join("."))
}

fn where_or_true(where_clause: Option<&str>) -> &str {
    match where_clause {
        Some(clause) if !clause.trim().is_empty() => clause,
        _ => ALWAYS_TRUE,
    }
}

fn placeholders(count: usize) -> String {
    vec!["?"; count].join(", ")
}

fn split_fields<I, K, V>(fields: I) -> Result<(Vec<String>, Vec<Value>)>
where
    I: IntoIterator<Item = (K, V)>,
    K: AsRef<str>,
    V: Into<Value>,
{
    let mut columns = Vec::new();
    let mut values = Vec::new();
    for (column, value) in fields {
        columns.push(quote_identifier(column.as_ref())?);
        values.push(value.into());
    }
    if columns.is_empty() {
        return Err(DbError::Validation("at least one field is required".to_string()));
    }
    Ok((columns, values))
}

pub fn select_by_condition(table: &str, where_clause: Option<&str>) -> Result<Statement> {
    Ok(Statement {
        sql: format!(
            "SELECT * FROM {} WHERE {}",
            quote_identifier(table)?,
            where_or_true(where_clause)
        ),
        params: Vec::new(),
    })
}

pub fn insert_by_fields<I, K, V>(table: &str, fields: I) -> Result<Statement>
where
    I: IntoIterator<Item = (K, V)>,
    K: AsRef<str>,
    V: Into<Value>,
{
    let table = quote_identifier(table)?;
    let (columns, params) = split_fields(fields)?;
    Ok(Statement {
        sql: format!(
            "INSERT INTO {} ({}) VALUES ({})",
            table,
            columns.join(", "),
            placeholders(params.len())
        ),
        params,
    })
}

/// Builds one INSERT for many rows.
///
/// Every row is checked against `field_names` before anything is returned,
/// so an arity mismatch anywhere in the batch rejects the whole batch.
pub fn insert_many<S: AsRef<str>>(
    table: &str,
    field_names: &[S],
    rows: Vec<Vec<Value>>,
) -> Result<BatchStatement> {
    let table = quote_identifier(table)?;
    if field_names.is_empty() {
        return Err(DbError::Validation("at least one field is required".to_string()));
    }
    let columns = field_names
        .iter()
        .map(|f| quote_identifier(f.as_ref()))
        .collect::<Result<Vec<_>>>()?;

    if let Some((index, row)) = rows
        .iter()
        .enumerate()
        .find(|(_, row)| row.len() != columns.len())
    {
        return Err(DbError::Validation(format!(
            "all rows must have {} fields, row {} has {}",
            columns.len(),
            index,
            row.len()
        )));
    }

    Ok(BatchStatement {
        sql: format!(
            "INSERT INTO {} ({}) VALUES ({})",
            table,
            columns.join(", "),
            placeholders(columns.len())
        ),
        rows,
    })
}

pub fn update_by_condition<I, K, V>(
    table: &str,
    fields: I,
    where_clause: Option<&str>,
) -> Result<Statement>
where
    I: IntoIterator<Item = (K, V)>,
    K: AsRef<str>,
    V: Into<Value>,
{
    let table = quote_identifier(table)?;
    let (columns, params) = split_fields(fields)?;
    let assignments: Vec<String> = columns.iter().map(|c| format!("{c} = ?")).collect();
    Ok(Statement {
        sql: format!(
            "UPDATE {} SET {} WHERE {}",
            table,
            assignments.join(", "),
            where_or_true(where_clause)
        ),
        params,
    })
}

pub fn delete_by_condition(table: &str, where_clause: Option<&str>) -> Result<Statement> {
    Ok(Statement {
        sql: format!(
            "DELETE FROM {} WHERE {}",
            quote_identifier(table)?,
            where_or_true(where_clause)
        ),
        params: Vec::new(),
    })
}
