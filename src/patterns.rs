use crate::aggregate::aggregate;
use crate::error::{AnalysisError, Result};
use crate::temporal::{week_over_week_growth, weekly_revenue};
use crate::types::{Dimension, EnrichedRecord, EnrichedTable, Measure, RankedValue, WeeklyRow};
use crate::util::{pearson, quantile};
use serde::Serialize;
use std::cmp::Ordering;

/// Measures included in the correlation matrix, in matrix order.
pub const CORRELATION_MEASURES: [Measure; 4] = [
    Measure::Price,
    Measure::Quantity,
    Measure::Revenue,
    Measure::Profit,
];

fn ranked_means(
    table: &EnrichedTable,
    dimension: Dimension,
    measure: Measure,
) -> Result<Vec<RankedValue>> {
    let mut rows = aggregate(table, dimension, &[measure])?;
    rows.sort_by(|a, b| {
        b.mean(measure)
            .partial_cmp(&a.mean(measure))
            .unwrap_or(Ordering::Equal)
            .then_with(|| a.key.cmp(&b.key))
    });
    Ok(rows
        .into_iter()
        .map(|row| RankedValue {
            value: row.mean(measure),
            label: row.key.to_string(),
        })
        .collect())
}

/// Mean revenue per sale for each product, highest first.
pub fn ticket_by_product(table: &EnrichedTable) -> Result<Vec<RankedValue>> {
    ranked_means(table, Dimension::Product, Measure::Revenue)
}

/// Mean margin percent per region, highest first.
pub fn margin_by_region(table: &EnrichedTable) -> Result<Vec<RankedValue>> {
    ranked_means(table, Dimension::Region, Measure::MarginPercent)
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OutlierReport {
    pub q1: f64,
    pub q3: f64,
    pub iqr: f64,
    pub lower_fence: f64,
    pub upper_fence: f64,
    pub rows: Vec<EnrichedRecord>,
    pub count: usize,
}

/// Tukey fence on revenue: rows strictly outside
/// `[Q1 - k * IQR, Q3 + k * IQR]` are outliers. Rows are reported, never
/// removed from the table.
pub fn detect_outliers(table: &EnrichedTable, multiplier: f64) -> Result<OutlierReport> {
    let revenue = table.column(Measure::Revenue);
    let (q1, q3) = match (quantile(&revenue, 0.25), quantile(&revenue, 0.75)) {
        (Some(q1), Some(q3)) => (q1, q3),
        _ => return Err(AnalysisError::EmptyGroup("outlier detection".to_string())),
    };
    let iqr = q3 - q1;
    let lower_fence = q1 - multiplier * iqr;
    let upper_fence = q3 + multiplier * iqr;

    let rows: Vec<EnrichedRecord> = table
        .rows()
        .iter()
        .filter(|r| r.revenue < lower_fence || r.revenue > upper_fence)
        .cloned()
        .collect();
    if !rows.is_empty() {
        log::info!(
            "{} revenue outliers outside [{:.2}, {:.2}]",
            rows.len(),
            lower_fence,
            upper_fence
        );
    }
    Ok(OutlierReport {
        q1,
        q3,
        iqr,
        lower_fence,
        upper_fence,
        count: rows.len(),
        rows,
    })
}

/// Symmetric Pearson correlation matrix. A measure with zero variance has
/// `NaN` across its row and column, diagonal included.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CorrelationMatrix {
    pub measures: Vec<Measure>,
    pub values: Vec<Vec<f64>>,
}

impl CorrelationMatrix {
    pub fn get(&self, a: Measure, b: Measure) -> Option<f64> {
        let i = self.measures.iter().position(|m| *m == a)?;
        let j = self.measures.iter().position(|m| *m == b)?;
        Some(self.values[i][j])
    }
}

pub fn correlation_matrix(table: &EnrichedTable, measures: &[Measure]) -> CorrelationMatrix {
    let columns: Vec<Vec<f64>> = measures.iter().map(|&m| table.column(m)).collect();
    let constant: Vec<bool> = columns
        .iter()
        .map(|c| c.windows(2).all(|w| w[0] == w[1]))
        .collect();
    for (m, _) in measures.iter().zip(&constant).filter(|(_, c)| **c) {
        log::warn!("correlation undefined for '{}': zero variance", m.name());
    }

    let n = measures.len();
    let mut values = vec![vec![f64::NAN; n]; n];
    for i in 0..n {
        if constant[i] {
            continue;
        }
        values[i][i] = 1.0;
        for j in (i + 1)..n {
            if constant[j] {
                continue;
            }
            let r = pearson(&columns[i], &columns[j]);
            values[i][j] = r;
            values[j][i] = r;
        }
    }
    CorrelationMatrix {
        measures: measures.to_vec(),
        values,
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PatternReport {
    pub ticket_by_product: Vec<RankedValue>,
    pub margin_by_region: Vec<RankedValue>,
    pub weekly_revenue: Vec<WeeklyRow>,
    pub week_over_week_growth: Option<f64>,
    pub outliers: OutlierReport,
    pub correlation: CorrelationMatrix,
}

pub fn identify_patterns(table: &EnrichedTable, iqr_multiplier: f64) -> Result<PatternReport> {
    let weekly = weekly_revenue(table)?;
    Ok(PatternReport {
        ticket_by_product: ticket_by_product(table)?,
        margin_by_region: margin_by_region(table)?,
        week_over_week_growth: week_over_week_growth(&weekly),
        weekly_revenue: weekly,
        outliers: detect_outliers(table, iqr_multiplier)?,
        correlation: correlation_matrix(table, &CORRELATION_MEASURES),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{AnalysisConfig, MarginModel};
    use crate::features::enrich;
    use crate::types::RawTransaction;
    use chrono::NaiveDate;

    fn table_with_revenues(revenues: &[f64]) -> EnrichedTable {
        let raw: Vec<RawTransaction> = revenues
            .iter()
            .enumerate()
            .map(|(i, &rev)| {
                let date = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap() + chrono::Days::new(i as u64);
                RawTransaction::complete(date, "A", "North", rev, 1)
            })
            .collect();
        enrich(&raw, &AnalysisConfig::default()).unwrap().0
    }

    #[test]
    fn single_extreme_value_is_flagged() {
        let t = table_with_revenues(&[10.0, 10.0, 10.0, 10.0, 1000.0]);
        let report = detect_outliers(&t, 1.5).unwrap();
        assert_eq!(report.q1, 10.0);
        assert_eq!(report.q3, 10.0);
        assert_eq!(report.iqr, 0.0);
        assert_eq!(report.count, 1);
        assert_eq!(report.rows[0].revenue, 1000.0);
    }

    #[test]
    fn equal_values_have_no_outliers() {
        let t = table_with_revenues(&[42.0; 6]);
        let report = detect_outliers(&t, 1.5).unwrap();
        assert_eq!(report.count, 0);
        assert!(report.rows.is_empty());
    }

    #[test]
    fn outliers_stay_in_table() {
        let t = table_with_revenues(&[10.0, 12.0, 11.0, 13.0, 500.0]);
        let before = t.len();
        let report = detect_outliers(&t, 1.5).unwrap();
        assert_eq!(report.count, 1);
        assert_eq!(t.len(), before);
    }

    #[test]
    fn correlation_is_symmetric_with_unit_diagonal() {
        let d = |day| NaiveDate::from_ymd_opt(2024, 2, day).unwrap();
        let raw = vec![
            RawTransaction::complete(d(1), "A", "North", 10.0, 5),
            RawTransaction::complete(d(2), "B", "South", 40.0, 2),
            RawTransaction::complete(d(3), "C", "East", 25.0, 7),
            RawTransaction::complete(d(4), "A", "West", 80.0, 1),
            RawTransaction::complete(d(5), "B", "North", 15.0, 3),
        ];
        let t = enrich(&raw, &AnalysisConfig::default()).unwrap().0;
        let m = correlation_matrix(&t, &CORRELATION_MEASURES);
        for i in 0..4 {
            assert_eq!(m.values[i][i], 1.0);
            for j in 0..4 {
                assert!((m.values[i][j] - m.values[j][i]).abs() < 1e-12);
                assert!(m.values[i][j].abs() <= 1.0);
            }
        }
    }

    #[test]
    fn constant_column_correlates_as_nan() {
        // Every row has quantity 1.
        let t = table_with_revenues(&[10.0, 20.0, 30.0]);
        let m = correlation_matrix(&t, &CORRELATION_MEASURES);
        assert!(m.get(Measure::Quantity, Measure::Price).unwrap().is_nan());
        assert!(m.get(Measure::Quantity, Measure::Quantity).unwrap().is_nan());
        assert!((m.get(Measure::Price, Measure::Revenue).unwrap() - 1.0).abs() < 1e-12);
    }

    #[test]
    fn ticket_and_margin_rankings() {
        let d = |day| NaiveDate::from_ymd_opt(2024, 2, day).unwrap();
        let raw = vec![
            RawTransaction::complete(d(1), "A", "North", 10.0, 1),
            RawTransaction::complete(d(2), "A", "North", 30.0, 1),
            RawTransaction::complete(d(3), "B", "South", 25.0, 1),
        ];
        let config = AnalysisConfig {
            margin: MarginModel::Fixed { percent: 30.0 },
            ..AnalysisConfig::default()
        };
        let t = enrich(&raw, &config).unwrap().0;
        let tickets = ticket_by_product(&t).unwrap();
        assert_eq!(tickets[0].label, "B");
        assert_eq!(tickets[0].value, 25.0);
        assert_eq!(tickets[1].value, 20.0);
        let margins = margin_by_region(&t).unwrap();
        assert_eq!(margins.len(), 2);
        assert!(margins.iter().all(|m| m.value == 30.0));
        // Equal means keep lexical order.
        assert_eq!(margins[0].label, "North");
    }

    #[test]
    fn empty_table_cannot_be_scanned() {
        assert!(matches!(
            detect_outliers(&EnrichedTable::default(), 1.5),
            Err(AnalysisError::EmptyGroup(_))
        ));
    }
}
