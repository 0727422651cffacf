use crate::error::{AnalysisError, Result};
use crate::types::{EnrichedRecord, EnrichedTable, Measure};
use crate::util::{average, sum_units};
use chrono::NaiveDate;
use serde::Serialize;
use std::collections::{BTreeMap, HashSet};

/// Headline business metrics over the whole enriched table.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GeneralMetrics {
    pub total_sales: usize,
    pub total_units: u64,
    pub total_revenue: f64,
    pub total_profit: f64,
    pub average_ticket: f64,
    pub average_quantity: f64,
    pub average_price: f64,
    pub average_margin: f64,
    /// Sales per day that had at least one sale.
    pub sales_per_active_day: f64,
    /// Mean revenue over days that had at least one sale.
    pub revenue_per_active_day: f64,
    pub distinct_products: usize,
    pub distinct_regions: usize,
    /// Total profit as a percentage of total revenue.
    pub profitability: f64,
    pub period_start: NaiveDate,
    pub period_end: NaiveDate,
}

pub fn general_metrics(table: &EnrichedTable) -> Result<GeneralMetrics> {
    let (period_start, period_end) = table
        .date_range()
        .ok_or_else(|| AnalysisError::EmptyGroup("general metrics".to_string()))?;
    let rows = table.rows();

    let revenue = table.column(Measure::Revenue);
    let total_revenue: f64 = revenue.iter().sum();
    let total_profit: f64 = rows.iter().map(|r| r.profit).sum();

    let mut per_day: BTreeMap<NaiveDate, f64> = BTreeMap::new();
    for r in rows {
        *per_day.entry(r.date).or_insert(0.0) += r.revenue;
    }
    let daily_totals: Vec<f64> = per_day.values().copied().collect();

    let total_units = sum_units(rows.iter().map(|r| r.quantity))
        .ok_or_else(|| AnalysisError::Overflow("general metrics".to_string()))?;

    let products: HashSet<&str> = rows.iter().map(|r| r.product.as_str()).collect();
    let regions: HashSet<&str> = rows.iter().map(|r| r.region.as_str()).collect();

    Ok(GeneralMetrics {
        total_sales: rows.len(),
        total_units,
        total_revenue,
        total_profit,
        average_ticket: average(&revenue),
        average_quantity: average(&table.column(Measure::Quantity)),
        average_price: average(&table.column(Measure::Price)),
        average_margin: average(&table.column(Measure::MarginPercent)),
        sales_per_active_day: rows.len() as f64 / per_day.len() as f64,
        revenue_per_active_day: average(&daily_totals),
        distinct_products: products.len(),
        distinct_regions: regions.len(),
        profitability: if total_revenue == 0.0 {
            0.0
        } else {
            total_profit / total_revenue * 100.0
        },
        period_start,
        period_end,
    })
}

/// The single highest-revenue sale; the earliest row wins ties.
pub fn best_sale(table: &EnrichedTable) -> Option<&EnrichedRecord> {
    table.rows().iter().fold(None, |best, r| match best {
        Some(b) if b.revenue >= r.revenue => Some(b),
        _ => Some(r),
    })
}
