//! Output formatting utilities for CLI commands

use anyhow::Result;
use chrono::{DateTime, Utc};
use comfy_table::{presets::UTF8_FULL_CONDENSED, Cell, Color, ContentArrangement, Table};
use formstead_schema::{Constraint, FieldDescriptor};
use serde::Serialize;

/// Print a value as pretty JSON on stdout.
pub fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Print a table with headers
pub fn print_table(headers: &[&str], rows: Vec<Vec<String>>) {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL_CONDENSED)
        .set_content_arrangement(ContentArrangement::Dynamic);

    let header_cells: Vec<Cell> = headers
        .iter()
        .map(|h| Cell::new(h).fg(Color::Cyan))
        .collect();
    table.set_header(header_cells);

    for row in rows {
        table.add_row(row);
    }

    println!("{}", table);
}

pub fn format_timestamp(ts: &DateTime<Utc>) -> String {
    ts.format("%Y-%m-%d %H:%M:%S").to_string()
}

/// One-line rendering of a field's constraints, e.g. `required, interval[0, 150]`.
pub fn format_constraints(field: &FieldDescriptor) -> String {
    if field.constraints.is_empty() {
        return "-".to_string();
    }
    field
        .constraints
        .iter()
        .map(|c| match c {
            Constraint::Interval { min, max } => {
                format!("interval[{}, {}]", min.to_json(), max.to_json())
            }
            other => other.name().to_string(),
        })
        .collect::<Vec<_>>()
        .join(", ")
}

/// Print the field list of one instance.
pub fn print_fields(fields: &[FieldDescriptor]) {
    let rows = fields
        .iter()
        .map(|f| {
            vec![
                f.name.clone(),
                f.field_type.to_string(),
                format_constraints(f),
            ]
        })
        .collect();
    print_table(&["FIELD", "TYPE", "CONSTRAINTS"], rows);
}
