//! JSON encoding of records

use crate::state::Record;

/// Encodes the records as a pretty-printed JSON array
///
/// Absent values become `null`; each object keeps its field order.
pub fn encode(records: &[Record]) -> Result<String, serde_json::Error> {
    let mut out = serde_json::to_string_pretty(records)?;
    out.push('\n');
    Ok(out)
}
