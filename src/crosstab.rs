use crate::error::{AnalysisError, Result};
use crate::types::{Dimension, EnrichedTable, GroupKey, Measure};
use serde::Serialize;
use std::cmp::Ordering;
use std::collections::HashMap;

/// Dense two-dimensional sum of a measure. Every observed row key is paired
/// with every observed column key; combinations with no rows hold 0.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PivotTable {
    pub row_dimension: Dimension,
    pub col_dimension: Dimension,
    pub measure: Measure,
    pub row_keys: Vec<GroupKey>,
    pub col_keys: Vec<GroupKey>,
    /// `cells[r][c]` is the sum for `row_keys[r]` x `col_keys[c]`.
    pub cells: Vec<Vec<f64>>,
}

impl PivotTable {
    pub fn get(&self, row: &GroupKey, col: &GroupKey) -> Option<f64> {
        let r = self.row_keys.iter().position(|k| k == row)?;
        let c = self.col_keys.iter().position(|k| k == col)?;
        Some(self.cells[r][c])
    }

    pub fn row_totals(&self) -> Vec<f64> {
        self.cells.iter().map(|row| row.iter().sum()).collect()
    }

    pub fn col_totals(&self) -> Vec<f64> {
        (0..self.col_keys.len())
            .map(|c| self.cells.iter().map(|row| row[c]).sum())
            .collect()
    }

    pub fn grand_total(&self) -> f64 {
        self.row_totals().iter().sum()
    }

    /// Same table with rows reordered by row total, descending. Ties keep
    /// their first-seen order.
    pub fn sorted_by_row_total(&self) -> PivotTable {
        let totals = self.row_totals();
        let mut order: Vec<usize> = (0..self.row_keys.len()).collect();
        order.sort_by(|&a, &b| totals[b].partial_cmp(&totals[a]).unwrap_or(Ordering::Equal));
        PivotTable {
            row_dimension: self.row_dimension,
            col_dimension: self.col_dimension,
            measure: self.measure,
            row_keys: order.iter().map(|&i| self.row_keys[i].clone()).collect(),
            col_keys: self.col_keys.clone(),
            cells: order.iter().map(|&i| self.cells[i].clone()).collect(),
        }
    }

    /// Same table with columns in the dimension's natural order.
    pub fn with_sorted_columns(&self) -> PivotTable {
        let mut order: Vec<usize> = (0..self.col_keys.len()).collect();
        order.sort_by(|&a, &b| self.col_keys[a].cmp(&self.col_keys[b]));
        PivotTable {
            row_dimension: self.row_dimension,
            col_dimension: self.col_dimension,
            measure: self.measure,
            row_keys: self.row_keys.clone(),
            col_keys: order.iter().map(|&i| self.col_keys[i].clone()).collect(),
            cells: self
                .cells
                .iter()
                .map(|row| order.iter().map(|&i| row[i]).collect())
                .collect(),
        }
    }
}

/// Build a dense cross-tabulation of `measure` summed over
/// `row_dim` x `col_dim`. Keys appear in first-seen order.
pub fn cross_tab(
    table: &EnrichedTable,
    row_dim: Dimension,
    col_dim: Dimension,
    measure: Measure,
) -> Result<PivotTable> {
    if table.is_empty() {
        return Err(AnalysisError::EmptyGroup(format!(
            "cross-tab {:?} x {:?}",
            row_dim, col_dim
        )));
    }

    let mut row_keys: Vec<GroupKey> = Vec::new();
    let mut col_keys: Vec<GroupKey> = Vec::new();
    let mut row_index: HashMap<GroupKey, usize> = HashMap::new();
    let mut col_index: HashMap<GroupKey, usize> = HashMap::new();
    let mut sums: HashMap<(usize, usize), f64> = HashMap::new();

    for record in table.rows() {
        let r = *row_index.entry(record.key(row_dim)).or_insert_with_key(|k| {
            row_keys.push(k.clone());
            row_keys.len() - 1
        });
        let c = *col_index.entry(record.key(col_dim)).or_insert_with_key(|k| {
            col_keys.push(k.clone());
            col_keys.len() - 1
        });
        *sums.entry((r, c)).or_insert(0.0) += record.measure(measure);
    }

    let cells = (0..row_keys.len())
        .map(|r| {
            (0..col_keys.len())
                .map(|c| sums.get(&(r, c)).copied().unwrap_or(0.0))
                .collect()
        })
        .collect();

    Ok(PivotTable {
        row_dimension: row_dim,
        col_dimension: col_dim,
        measure,
        row_keys,
        col_keys,
        cells,
    })
}
