// Cleaning and feature derivation.
//
// Turns the raw table into the enriched table: one output row per surviving
// input row, in surviving input order.
use crate::config::{AnalysisConfig, MarginModel};
use crate::error::Result;
use crate::types::{EnrichedRecord, EnrichedTable, OrderValueCategory, PriceCategory, RawTransaction};
use chrono::{Datelike, NaiveDate};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::Serialize;
use std::cmp::Ordering;
use std::collections::{HashMap, HashSet};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CleaningReport {
    pub raw_rows: usize,
    pub duplicates_removed: usize,
    pub incomplete_removed: usize,
    pub enriched_rows: usize,
}

type DedupKey = (
    Option<NaiveDate>,
    Option<String>,
    Option<String>,
    Option<u64>,
    Option<u64>,
);

fn dedup_key(row: &RawTransaction) -> DedupKey {
    (
        row.date,
        row.product.clone(),
        row.region.clone(),
        // `+ 0.0` folds -0.0 into 0.0 so both compare equal.
        row.price.map(|p| (p + 0.0).to_bits()),
        row.quantity,
    )
}

struct Complete<'a> {
    date: NaiveDate,
    product: &'a str,
    region: &'a str,
    price: f64,
    quantity: u64,
}

/// Clean the raw table and derive every computed column.
///
/// The raw rows are only read; the result is a new table.
pub fn enrich(
    raw: &[RawTransaction],
    config: &AnalysisConfig,
) -> Result<(EnrichedTable, CleaningReport)> {
    config.validate()?;

    let mut seen: HashSet<DedupKey> = HashSet::with_capacity(raw.len());
    let unique: Vec<&RawTransaction> = raw.iter().filter(|r| seen.insert(dedup_key(r))).collect();
    let duplicates_removed = raw.len() - unique.len();

    let complete: Vec<Complete<'_>> = unique
        .iter()
        .filter_map(|r| {
            Some(Complete {
                date: r.date?,
                product: r.product.as_deref()?,
                region: r.region.as_deref()?,
                price: r.price?,
                quantity: r.quantity?,
            })
        })
        .collect();
    let incomplete_removed = unique.len() - complete.len();
    log::debug!(
        "cleaning: {} duplicates removed, {} incomplete rows dropped",
        duplicates_removed,
        incomplete_removed
    );

    let revenues: Vec<f64> = complete.iter().map(|c| c.price * c.quantity as f64).collect();
    let moving_averages = trailing_means(&complete, &revenues, config.moving_average_window);
    let margins = margin_draws(complete.len(), &config.margin);

    let rows: Vec<EnrichedRecord> = complete
        .iter()
        .enumerate()
        .map(|(i, c)| {
            let revenue = revenues[i];
            let margin_percent = margins[i];
            let cost = c.price * (1.0 - margin_percent / 100.0);
            let iso = c.date.iso_week();
            EnrichedRecord {
                date: c.date,
                product: c.product.to_string(),
                region: c.region.to_string(),
                price: c.price,
                quantity: c.quantity,
                revenue,
                revenue_ma7: moving_averages[i],
                weekday: c.date.weekday(),
                month: c.date.month(),
                iso_year: iso.year(),
                week_number: iso.week(),
                price_category: PriceCategory::from_price(c.price),
                order_value_category: OrderValueCategory::from_revenue(revenue),
                margin_percent,
                cost,
                profit: revenue - cost * c.quantity as f64,
            }
        })
        .collect();

    let report = CleaningReport {
        raw_rows: raw.len(),
        duplicates_removed,
        incomplete_removed,
        enriched_rows: rows.len(),
    };
    log::info!(
        "cleaning kept {} of {} rows",
        report.enriched_rows,
        report.raw_rows
    );
    Ok((EnrichedTable::new(rows), report))
}

/// Trailing mean of revenue within each product, over rows ordered by date.
///
/// Ties on date are broken by the remaining fields, which are unique after
/// dedup, so the result does not depend on input order.
fn trailing_means(rows: &[Complete<'_>], revenues: &[f64], window: usize) -> Vec<f64> {
    let mut order: Vec<usize> = (0..rows.len()).collect();
    order.sort_by(|&a, &b| {
        let (ra, rb) = (&rows[a], &rows[b]);
        ra.product
            .cmp(rb.product)
            .then(ra.date.cmp(&rb.date))
            .then(ra.region.cmp(rb.region))
            .then(ra.price.partial_cmp(&rb.price).unwrap_or(Ordering::Equal))
            .then(ra.quantity.cmp(&rb.quantity))
    });

    let mut by_product: HashMap<&str, Vec<usize>> = HashMap::new();
    for &i in &order {
        by_product.entry(rows[i].product).or_default().push(i);
    }

    let mut out = vec![0.0; rows.len()];
    for partition in by_product.values() {
        for (pos, &i) in partition.iter().enumerate() {
            let start = (pos + 1).saturating_sub(window);
            let slice = &partition[start..=pos];
            let sum: f64 = slice.iter().map(|&j| revenues[j]).sum();
            out[i] = sum / slice.len() as f64;
        }
    }
    out
}

/// One margin value per row, drawn in row order.
fn margin_draws(n: usize, model: &MarginModel) -> Vec<f64> {
    match *model {
        MarginModel::Simulated { seed, low, high } => {
            let mut rng = StdRng::seed_from_u64(seed);
            (0..n).map(|_| rng.gen_range(low..high)).collect()
        }
        MarginModel::Fixed { percent } => vec![percent; n],
    }
}
