use crate::crosstab::PivotTable;
use crate::error::Result;
use crate::patterns::CorrelationMatrix;
use crate::util::format_number;
use serde::Serialize;
use tabled::{builder::Builder, settings::Style, Table, Tabled};

/// Render the first `max_rows` rows as a markdown table.
pub fn preview_table_rows<T>(rows: &[T], max_rows: usize) -> String
where
    T: Tabled + Clone,
{
    if rows.is_empty() {
        return "(no rows)".to_string();
    }
    Table::new(rows.iter().take(max_rows).cloned())
        .with(Style::markdown())
        .to_string()
}

pub fn render_pivot(pivot: &PivotTable) -> String {
    let mut builder = Builder::default();
    let mut header = vec![String::new()];
    header.extend(pivot.col_keys.iter().map(|k| k.to_string()));
    builder.push_record(header);
    for (key, row) in pivot.row_keys.iter().zip(&pivot.cells) {
        let mut record = vec![key.to_string()];
        record.extend(row.iter().map(|v| format_number(*v, 2)));
        builder.push_record(record);
    }
    builder.build().with(Style::markdown()).to_string()
}

pub fn render_correlation(matrix: &CorrelationMatrix) -> String {
    let mut builder = Builder::default();
    let mut header = vec![String::new()];
    header.extend(matrix.measures.iter().map(|m| m.name().to_string()));
    builder.push_record(header);
    for (m, row) in matrix.measures.iter().zip(&matrix.values) {
        let mut record = vec![m.name().to_string()];
        record.extend(row.iter().map(|v| format_number(*v, 3)));
        builder.push_record(record);
    }
    builder.build().with(Style::markdown()).to_string()
}

pub fn to_json<T: Serialize>(value: &T) -> Result<String> {
    Ok(serde_json::to_string_pretty(value)?)
}
