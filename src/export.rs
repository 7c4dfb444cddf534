use chrono::Local;
use serde_json::Value;

use crate::models::{ColumnDefinition, Row};

/// Which rows an export covers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportScope {
    /// The full unfiltered row set.
    AllRows,
    /// The current filtered and sorted view.
    CurrentView,
}

/// Serializes rows to CSV text. The output starts with a UTF-8 byte-order
/// mark so spreadsheet applications pick up the encoding, then a header
/// line of column labels, then one line per row.
pub fn to_csv<'a>(
    columns: &[ColumnDefinition],
    visible: &[String],
    rows: impl Iterator<Item = &'a Row>,
) -> String {
    let visible_defs: Vec<&ColumnDefinition> = visible
        .iter()
        .filter_map(|key| columns.iter().find(|c| &c.key == key))
        .collect();

    let mut lines = Vec::new();
    lines.push(
        visible_defs
            .iter()
            .map(|c| escape_cell(&c.label))
            .collect::<Vec<_>>()
            .join(","),
    );
    for row in rows {
        lines.push(
            visible_defs
                .iter()
                .map(|c| escape_cell(&cell_to_csv(row.get(c.key.as_str()))))
                .collect::<Vec<_>>()
                .join(","),
        );
    }

    format!("\u{feff}{}", lines.join("\n"))
}

/// Missing/null cells export empty, booleans as Yes/No, everything else
/// via string coercion.
fn cell_to_csv(value: Option<&Value>) -> String {
    match value {
        None | Some(Value::Null) => String::new(),
        Some(Value::Bool(true)) => "Yes".to_string(),
        Some(Value::Bool(false)) => "No".to_string(),
        Some(Value::String(s)) => s.clone(),
        Some(Value::Number(n)) => n.to_string(),
        Some(other) => other.to_string(),
    }
}

/// Wraps a cell in quotes when it contains a comma, quote, or newline,
/// doubling internal quotes.
fn escape_cell(cell: &str) -> String {
    if cell.contains(',') || cell.contains('"') || cell.contains('\n') {
        format!("\"{}\"", cell.replace('"', "\"\""))
    } else {
        cell.to_string()
    }
}

/// `{base}_{YYYY-MM-DD_HH-MM-SS}.csv` from local wall-clock time.
pub fn suggested_filename(base: &str) -> String {
    format!("{}_{}.csv", base, Local::now().format("%Y-%m-%d_%H-%M-%S"))
}
