//! SQLite export
//!
//! Records are appended to a table of `TEXT` columns. The table is created
//! on first use and widened with `ALTER TABLE` when records carry fields it
//! does not have yet.

use crate::output::csv::header;
use crate::output::traits::{ExportError, ExportReport, ExportResult};
use crate::state::Record;
use rusqlite::{params_from_iter, Connection};
use std::path::Path;

/// Quotes an identifier for use in SQL text
fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

/// Returns the column names of `table`, empty if it does not exist
fn existing_columns(conn: &Connection, table: &str) -> ExportResult<Vec<String>> {
    let mut stmt = conn.prepare(&format!("PRAGMA table_info({})", quote_ident(table)))?;
    let columns = stmt
        .query_map([], |row| row.get::<_, String>(1))?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(columns)
}

/// Creates `table` or adds the columns it is missing
fn ensure_table(conn: &Connection, table: &str, columns: &[String]) -> ExportResult<()> {
    let existing = existing_columns(conn, table)?;

    if existing.is_empty() {
        let definitions = columns
            .iter()
            .map(|c| format!("{} TEXT", quote_ident(c)))
            .collect::<Vec<_>>()
            .join(", ");
        conn.execute_batch(&format!(
            "CREATE TABLE IF NOT EXISTS {} ({});",
            quote_ident(table),
            definitions
        ))?;
        tracing::debug!("Created table {} with {} columns", table, columns.len());
        return Ok(());
    }

    for column in columns {
        if existing.iter().any(|e| e.eq_ignore_ascii_case(column)) {
            continue;
        }
        conn.execute_batch(&format!(
            "ALTER TABLE {} ADD COLUMN {} TEXT;",
            quote_ident(table),
            quote_ident(column)
        ))?;
        tracing::debug!("Added column {} to table {}", column, table);
    }

    Ok(())
}

/// Appends `records` to `table` in the database at `path`
pub fn export(path: &Path, table: &str, records: &[Record]) -> ExportResult<ExportReport> {
    let columns = header(records);
    if columns.is_empty() {
        return Err(ExportError::Schema(
            "records carry no fields to store".to_string(),
        ));
    }

    let mut conn = Connection::open(path)?;
    ensure_table(&conn, table, &columns)?;

    let sql = format!(
        "INSERT INTO {} ({}) VALUES ({})",
        quote_ident(table),
        columns
            .iter()
            .map(|c| quote_ident(c))
            .collect::<Vec<_>>()
            .join(", "),
        (1..=columns.len())
            .map(|i| format!("?{}", i))
            .collect::<Vec<_>>()
            .join(", ")
    );

    let tx = conn.transaction()?;
    {
        let mut stmt = tx.prepare(&sql)?;
        for record in records {
            let values = columns
                .iter()
                .map(|column| record.get(column).flatten());
            stmt.execute(params_from_iter(values))?;
        }
    }
    tx.commit()?;

    Ok(ExportReport {
        destination: path.to_path_buf(),
        records: records.len(),
    })
}
