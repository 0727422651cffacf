use crate::error::{AnalysisError, Result};
use crate::types::{
    Dimension, EnrichedRecord, EnrichedTable, GroupKey, Measure, ProductSummaryRow,
    RegionSummaryRow,
};
use crate::util::{average, round_to, sample_std};
use serde::Serialize;
use std::cmp::Ordering;
use std::collections::{BTreeMap, HashMap, HashSet};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MeasureStats {
    pub measure: Measure,
    pub sum: f64,
    pub mean: f64,
    /// Sample standard deviation; 0 for a single observation.
    pub std: f64,
    pub min: f64,
    pub max: f64,
}

impl MeasureStats {
    fn from_values(measure: Measure, values: &[f64]) -> Self {
        let sum: f64 = values.iter().sum();
        Self {
            measure,
            sum,
            mean: average(values),
            std: sample_std(values),
            min: values.iter().copied().fold(f64::INFINITY, f64::min),
            max: values.iter().copied().fold(f64::NEG_INFINITY, f64::max),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AggregateRow {
    pub key: GroupKey,
    pub count: usize,
    pub stats: Vec<MeasureStats>,
}

impl AggregateRow {
    pub fn stat(&self, measure: Measure) -> Option<&MeasureStats> {
        self.stats.iter().find(|s| s.measure == measure)
    }

    pub fn sum(&self, measure: Measure) -> f64 {
        self.stat(measure).map_or(0.0, |s| s.sum)
    }

    pub fn mean(&self, measure: Measure) -> f64 {
        self.stat(measure).map_or(0.0, |s| s.mean)
    }
}

/// Group `table` by `dimension` and compute statistics for each measure.
///
/// One row per distinct key present. Rows are ordered by the sum of the first
/// measure, descending, with ties in the key's natural order. With no
/// measures, rows are ordered by count instead.
pub fn aggregate(
    table: &EnrichedTable,
    dimension: Dimension,
    measures: &[Measure],
) -> Result<Vec<AggregateRow>> {
    if table.is_empty() {
        return Err(AnalysisError::EmptyGroup(format!("group by {:?}", dimension)));
    }

    let mut groups: BTreeMap<GroupKey, Vec<usize>> = BTreeMap::new();
    for (i, row) in table.rows().iter().enumerate() {
        groups.entry(row.key(dimension)).or_default().push(i);
    }

    let mut rows: Vec<AggregateRow> = groups
        .into_iter()
        .map(|(key, members)| {
            let stats = measures
                .iter()
                .map(|&m| {
                    let values: Vec<f64> = members
                        .iter()
                        .map(|&i| table.rows()[i].measure(m))
                        .collect();
                    MeasureStats::from_values(m, &values)
                })
                .collect();
            AggregateRow {
                key,
                count: members.len(),
                stats,
            }
        })
        .collect();

    // Stable sort keeps the BTreeMap's natural key order among ties.
    match measures.first() {
        Some(&primary) => rows.sort_by(|a, b| {
            b.sum(primary)
                .partial_cmp(&a.sum(primary))
                .unwrap_or(Ordering::Equal)
        }),
        None => rows.sort_by(|a, b| b.count.cmp(&a.count)),
    }
    log::debug!("grouped {} rows into {} {:?} groups", table.len(), rows.len(), dimension);
    Ok(rows)
}

/// Exact unit totals per label, summed as integers rather than through the
/// `f64` measure stats.
fn units_by<'a, F>(
    table: &'a EnrichedTable,
    what: &str,
    label: F,
) -> Result<HashMap<&'a str, u64>>
where
    F: Fn(&'a EnrichedRecord) -> &'a str,
{
    let mut units: HashMap<&str, u64> = HashMap::new();
    for r in table.rows() {
        let total = units.entry(label(r)).or_insert(0);
        *total = total
            .checked_add(r.quantity)
            .ok_or_else(|| AnalysisError::Overflow(format!("{} '{}'", what, label(r))))?;
    }
    Ok(units)
}

/// Per-product summary ordered by total revenue, descending.
pub fn product_summary(table: &EnrichedTable) -> Result<Vec<ProductSummaryRow>> {
    let rows = aggregate(
        table,
        Dimension::Product,
        &[
            Measure::Revenue,
            Measure::Quantity,
            Measure::Profit,
            Measure::Price,
            Measure::MarginPercent,
        ],
    )?;
    let units = units_by(table, "product", |r| r.product.as_str())?;
    Ok(rows
        .into_iter()
        .map(|row| {
            let price_std = row.stat(Measure::Price).map_or(0.0, |s| s.std);
            let product = row.key.to_string();
            ProductSummaryRow {
                total_quantity: units.get(product.as_str()).copied().unwrap_or(0),
                product,
                mean_quantity: row.mean(Measure::Quantity),
                sales_count: row.count,
                total_revenue: row.sum(Measure::Revenue),
                mean_revenue: row.mean(Measure::Revenue),
                total_profit: row.sum(Measure::Profit),
                mean_profit: row.mean(Measure::Profit),
                mean_price: row.mean(Measure::Price),
                price_std,
                mean_margin: row.mean(Measure::MarginPercent),
            }
        })
        .collect())
}

/// Per-region summary ordered by total revenue, descending, with each
/// region's share of total revenue in percent (one decimal).
pub fn region_summary(table: &EnrichedTable) -> Result<Vec<RegionSummaryRow>> {
    let rows = aggregate(
        table,
        Dimension::Region,
        &[Measure::Revenue, Measure::Profit],
    )?;

    let units = units_by(table, "region", |r| r.region.as_str())?;
    let mut products: HashMap<&str, HashSet<&str>> = HashMap::new();
    for r in table.rows() {
        products
            .entry(r.region.as_str())
            .or_default()
            .insert(r.product.as_str());
    }
    let grand_total: f64 = rows.iter().map(|r| r.sum(Measure::Revenue)).sum();

    Ok(rows
        .into_iter()
        .map(|row| {
            let region = row.key.to_string();
            let total_revenue = row.sum(Measure::Revenue);
            let market_share = if grand_total == 0.0 {
                0.0
            } else {
                round_to(total_revenue / grand_total * 100.0, 1)
            };
            RegionSummaryRow {
                distinct_products: products.get(region.as_str()).map_or(0, |s| s.len()),
                region: region.clone(),
                total_revenue,
                mean_revenue: row.mean(Measure::Revenue),
                sales_count: row.count,
                total_profit: row.sum(Measure::Profit),
                mean_profit: row.mean(Measure::Profit),
                total_quantity: units.get(region.as_str()).copied().unwrap_or(0),
                market_share,
            }
        })
        .collect())
}
