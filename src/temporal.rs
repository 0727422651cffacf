// Temporal analysis: gap-filled daily series, growth rates and weekday
// profile.
use crate::aggregate::aggregate;
use crate::error::{AnalysisError, Result};
use crate::types::{
    DailyRow, Dimension, EnrichedTable, GroupKey, Measure, WeekdayRow, WeeklyRow, WEEKDAYS,
};
use crate::util::{average, mean_pct_change};
use serde::Serialize;
use std::collections::BTreeMap;

/// One row per calendar day from the first to the last sale, inclusive.
/// Days without sales are present with all-zero totals.
pub fn daily_series(table: &EnrichedTable) -> Result<Vec<DailyRow>> {
    let (start, end) = table
        .date_range()
        .ok_or_else(|| AnalysisError::EmptyGroup("daily series".to_string()))?;

    let mut by_day: BTreeMap<_, DailyRow> = BTreeMap::new();
    for r in table.rows() {
        let day = by_day.entry(r.date).or_insert_with(|| zero_day(r.date));
        day.revenue += r.revenue;
        day.quantity = day
            .quantity
            .checked_add(r.quantity)
            .ok_or_else(|| AnalysisError::Overflow(format!("daily series on {}", r.date)))?;
        day.profit += r.profit;
    }

    let series: Vec<DailyRow> = start
        .iter_days()
        .take_while(|d| *d <= end)
        .map(|d| by_day.remove(&d).unwrap_or_else(|| zero_day(d)))
        .collect();
    log::debug!(
        "daily series spans {} days, {} with sales",
        series.len(),
        series.iter().filter(|d| d.revenue != 0.0 || d.quantity != 0).count()
    );
    Ok(series)
}

fn zero_day(date: chrono::NaiveDate) -> DailyRow {
    DailyRow {
        date,
        revenue: 0.0,
        quantity: 0,
        profit: 0.0,
    }
}

/// Mean day-over-day revenue change in percent. Steps from a zero-revenue
/// day are skipped; `None` when no step remains.
pub fn day_over_day_growth(daily: &[DailyRow]) -> Option<f64> {
    let revenue: Vec<f64> = daily.iter().map(|d| d.revenue).collect();
    let growth = mean_pct_change(&revenue);
    if growth.is_none() {
        log::warn!("day-over-day growth undefined: no step with a non-zero base");
    }
    growth
}

/// Revenue per ISO week, in calendar order.
pub fn weekly_revenue(table: &EnrichedTable) -> Result<Vec<WeeklyRow>> {
    let mut rows: Vec<WeeklyRow> = aggregate(table, Dimension::Week, &[Measure::Revenue])?
        .into_iter()
        .filter_map(|row| match row.key {
            GroupKey::Week { year, week } => Some(WeeklyRow {
                iso_year: year,
                week,
                revenue: row.sum(Measure::Revenue),
            }),
            _ => None,
        })
        .collect();
    rows.sort_by_key(|w| (w.iso_year, w.week));
    Ok(rows)
}

/// Mean week-over-week revenue change in percent, same skip policy as
/// [`day_over_day_growth`]. Weeks are taken as given: an ISO week without
/// sales is absent from [`weekly_revenue`] and is skipped, not zero-filled.
pub fn week_over_week_growth(weekly: &[WeeklyRow]) -> Option<f64> {
    let revenue: Vec<f64> = weekly.iter().map(|w| w.revenue).collect();
    let growth = mean_pct_change(&revenue);
    if growth.is_none() {
        log::warn!("week-over-week growth undefined: fewer than two usable weeks");
    }
    growth
}

/// Revenue per weekday in Monday..Sunday order. Always seven rows; weekdays
/// without sales have zero totals, zero mean and zero count.
pub fn weekday_aggregate(table: &EnrichedTable) -> Vec<WeekdayRow> {
    let mut revenue: [Vec<f64>; 7] = Default::default();
    for r in table.rows() {
        revenue[r.weekday.num_days_from_monday() as usize].push(r.revenue);
    }
    WEEKDAYS
        .iter()
        .zip(revenue.iter())
        .map(|(&weekday, values)| WeekdayRow {
            weekday,
            total_revenue: values.iter().sum(),
            mean_revenue: average(values),
            sales_count: values.len(),
        })
        .collect()
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TemporalSummary {
    pub daily: Vec<DailyRow>,
    pub weekday: Vec<WeekdayRow>,
    pub day_over_day_growth: Option<f64>,
    pub mean_daily_revenue: f64,
    pub best_day: DailyRow,
    pub worst_day: DailyRow,
}

pub fn temporal_summary(table: &EnrichedTable) -> Result<TemporalSummary> {
    let daily = daily_series(table)?;
    // Non-empty: the range always covers at least one day. Earliest wins ties.
    let mut best = &daily[0];
    let mut worst = &daily[0];
    for day in &daily[1..] {
        if day.revenue > best.revenue {
            best = day;
        }
        if day.revenue < worst.revenue {
            worst = day;
        }
    }
    let revenue: Vec<f64> = daily.iter().map(|d| d.revenue).collect();
    Ok(TemporalSummary {
        day_over_day_growth: day_over_day_growth(&daily),
        mean_daily_revenue: average(&revenue),
        best_day: best.clone(),
        worst_day: worst.clone(),
        weekday: weekday_aggregate(table),
        daily,
    })
}

/// The weekday with the highest total revenue; earliest in the week wins ties.
pub fn best_weekday(rows: &[WeekdayRow]) -> Option<&WeekdayRow> {
    rows.iter()
        .filter(|r| r.sales_count > 0)
        .fold(None, |best: Option<&WeekdayRow>, r| match best {
            Some(b) if b.total_revenue >= r.total_revenue => Some(b),
            _ => Some(r),
        })
}
