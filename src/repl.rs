use crate::core::db::DatabaseClient;
use crate::core::Result;
use std::io::{BufRead, Write};

/// Represents a parsed shell command.
#[derive(Debug, PartialEq)]
pub enum Command {
    Begin,
    Commit,
    Rollback,
    Reconnect,
    Select {
        table: String,
        where_clause: Option<String>,
    },
    Delete {
        table: String,
        where_clause: Option<String>,
    },
    Help,
    Quit,
    Sql(String),
    Unknown(String),
}

const HELP: &str = "\
:begin                   start a transaction
:commit                  commit the open transaction
:rollback                roll back the open transaction
:reconnect               replace the database connection
:select <table> [where]  select rows from a table
:delete <table> [where]  delete rows from a table
:help                    show this help
:quit                    exit
anything else is executed as SQL";

/// Parses a user input string into a corresponding `Command`.
///
/// If the input starts with a colon (`:`), it is interpreted as a command.
/// Otherwise, it is treated as SQL.
pub fn parse_command(input: &str) -> Command {
    let input = input.trim();
    let Some(trimmed) = input.strip_prefix(':') else {
        return Command::Sql(input.trim_end_matches(';').to_string());
    };
    let (name, rest) = match trimmed.split_once(char::is_whitespace) {
        Some((name, rest)) => (name, rest.trim()),
        None => (trimmed, ""),
    };
    match name {
        "begin" => Command::Begin,
        "commit" => Command::Commit,
        "rollback" => Command::Rollback,
        "reconnect" => Command::Reconnect,
        "select" | "delete" => {
            let (table, where_clause) = match rest.split_once(char::is_whitespace) {
                Some((table, clause)) => (table, Some(clause.trim().to_string())),
                None => (rest, None),
            };
            if table.is_empty() {
                return Command::Unknown(input.to_string());
            }
            let table = table.to_string();
            if name == "select" {
                Command::Select {
                    table,
                    where_clause,
                }
            } else {
                Command::Delete {
                    table,
                    where_clause,
                }
            }
        }
        "help" => Command::Help,
        "quit" | "q" => Command::Quit,
        _ => Command::Unknown(input.to_string()),
    }
}

/// Runs one parsed command, writing its outcome to `out`.
fn run_command<W: Write>(client: &mut DatabaseClient, command: Command, out: &mut W) -> Result<()> {
    match command {
        Command::Begin => {
            client.begin()?;
            writeln!(out, "transaction started")?;
        }
        Command::Commit => {
            client.commit()?;
            writeln!(out, "committed")?;
        }
        Command::Rollback => {
            client.rollback()?;
            writeln!(out, "rolled back")?;
        }
        Command::Reconnect => {
            client.reconnect()?;
            writeln!(out, "reconnected")?;
        }
        Command::Select {
            table,
            where_clause,
        } => {
            let rows = client.select_by_condition(&table, where_clause.as_deref())?;
            print_rows(rows, out)?;
        }
        Command::Delete {
            table,
            where_clause,
        } => {
            let count = client.delete_by_condition(&table, where_clause.as_deref())?;
            writeln!(out, "{count} row(s) affected")?;
        }
        Command::Help => writeln!(out, "{HELP}")?,
        Command::Sql(sql) => {
            let count = client.execute(&sql)?;
            if client.has_pending_results() {
                print_rows(client.fetch_all()?, out)?;
            } else {
                writeln!(out, "{count} row(s) affected")?;
            }
        }
        Command::Unknown(input) => writeln!(out, "unknown command: {input} (try :help)")?,
        Command::Quit => {}
    }
    Ok(())
}

fn print_rows<W: Write>(rows: Option<Vec<crate::core::db::Record>>, out: &mut W) -> Result<()> {
    match rows {
        Some(rows) => {
            for row in &rows {
                writeln!(out, "{}", serde_json::to_string(row)?)?;
            }
        }
        None => writeln!(out, "(no results)")?,
    }
    Ok(())
}

/// Runs a line-oriented shell until `:quit` or end of input.
///
/// Failed commands are reported and the shell keeps going.
pub fn run_repl<R: BufRead, W: Write>(client: &mut DatabaseClient, input: R, mut out: W) -> Result<()> {
    for line in input.lines() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        let command = parse_command(&line);
        if command == Command::Quit {
            break;
        }
        if let Err(e) = run_command(client, command, &mut out) {
            writeln!(out, "error: {e}")?;
        }
        out.flush()?;
    }
    Ok(())
}
