//! CSV rendering of result rows.

use crate::models::request::Row;
use serde_json::Value;

/// Render rows as CSV lines: a header from the first row, then one line per row.
pub fn render_rows(rows: &[Row]) -> Vec<String> {
    let Some(first) = rows.first() else {
        return Vec::new();
    };

    let mut lines = Vec::with_capacity(rows.len() + 1);
    lines.push(first.columns().map(escape_field).collect::<Vec<_>>().join(","));
    for row in rows {
        lines.push(
            row.values()
                .map(|value| escape_field(&format_value(value)))
                .collect::<Vec<_>>()
                .join(","),
        );
    }
    lines
}

fn format_value(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Quote a field if it contains a separator, quote or newline.
fn escape_field(field: &str) -> String {
    if field.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", field.replace('"', "\"\""))
    } else {
        field.to_string()
    }
}
