//! CSV encoding of records
//!
//! RFC 4180 style: comma separated, CRLF line endings, fields quoted only
//! when they contain a comma, a double quote or a line break.

use crate::state::Record;

/// Column names: every field name, in the order first seen
pub fn header(records: &[Record]) -> Vec<String> {
    let mut columns: Vec<String> = Vec::new();
    for record in records {
        for (name, _) in record.fields() {
            if !columns.iter().any(|c| c == name) {
                columns.push(name.to_string());
            }
        }
    }
    columns
}

/// Encodes the records as a complete CSV document with a header row
pub fn encode(records: &[Record]) -> String {
    let columns = header(records);
    let mut out = String::new();

    write_row(&mut out, columns.iter().map(String::as_str));
    for record in records {
        write_row(
            &mut out,
            columns
                .iter()
                .map(|column| record.get(column).flatten().unwrap_or("")),
        );
    }

    out
}

fn write_row<'a>(out: &mut String, cells: impl Iterator<Item = &'a str>) {
    for (i, cell) in cells.enumerate() {
        if i > 0 {
            out.push(',');
        }
        push_cell(out, cell);
    }
    out.push_str("\r\n");
}

fn push_cell(out: &mut String, cell: &str) {
    let needs_quotes = cell.contains([',', '"', '\n', '\r']);
    if !needs_quotes {
        out.push_str(cell);
        return;
    }

    out.push('"');
    for c in cell.chars() {
        if c == '"' {
            out.push('"');
        }
        out.push(c);
    }
    out.push('"');
}
