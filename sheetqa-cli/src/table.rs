//! Plain-text table rendering for previews and results.
//!
//! Column widths are computed from the content; everything is left-aligned
//! text, which reads fine for the small previews this tool shows.

use sheetqa_core::{Dataset, query::Value};

/// Render a dataset as an aligned text table with a header rule.
pub fn render_dataset(dataset: &Dataset) -> String {
    let mut columns: Vec<Vec<String>> = dataset
        .columns()
        .iter()
        .map(|name| vec![name.clone()])
        .collect();
    for row in dataset.rows() {
        for (col, cell) in columns.iter_mut().zip(row) {
            col.push(cell.to_string());
        }
    }
    render_columns(&columns)
}

/// Render a non-scalar value (column or grouped series) as a table.
pub fn render_value(value: &Value) -> String {
    match value {
        Value::Column { name, values } => {
            let mut col = vec![name.clone()];
            col.extend(values.iter().map(|v| v.to_string()));
            render_columns(&[col])
        }
        Value::Series { name, entries } => {
            let mut keys = vec![name.clone()];
            let mut counts = vec![String::new()];
            for (key, number) in entries {
                keys.push(key.clone());
                counts.push(Value::Number(*number).to_string());
            }
            render_columns(&[keys, counts])
        }
        other => other.to_string(),
    }
}

/// Lay out pre-stringified columns, first entry of each being the header.
fn render_columns(columns: &[Vec<String>]) -> String {
    let widths: Vec<usize> = columns
        .iter()
        .map(|col| col.iter().map(|s| s.chars().count()).max().unwrap_or(0))
        .collect();
    let height = columns.iter().map(|c| c.len()).max().unwrap_or(0);

    let mut out = String::new();
    for row in 0..height {
        let mut line = String::new();
        for (col, width) in columns.iter().zip(&widths) {
            let cell = col.get(row).map(String::as_str).unwrap_or("");
            line.push_str(&format!("{:<width$}  ", cell, width = *width));
        }
        out.push_str(line.trim_end());
        out.push('\n');
        if row == 0 {
            let rule: Vec<String> = widths.iter().map(|w| "-".repeat(*w)).collect();
            out.push_str(rule.join("  ").trim_end());
            out.push('\n');
        }
    }
    out
}
