use crate::patterns::OutlierReport;
use crate::temporal::best_weekday;
use crate::types::{weekday_name, ProductSummaryRow, RegionSummaryRow, WeekdayRow};
use crate::util::{format_int, format_money, format_number};
use serde::Serialize;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum InsightKind {
    TopProduct,
    BottomProduct,
    LeadingRegion,
    BestWeekday,
    Outliers,
}

/// A short finding: what it is about and the metric behind it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Insight {
    pub kind: InsightKind,
    pub label: String,
    pub metric: f64,
}

impl fmt::Display for Insight {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind {
            InsightKind::TopProduct => write!(
                f,
                "Top product by revenue: {} ({})",
                self.label,
                format_money(self.metric)
            ),
            InsightKind::BottomProduct => write!(
                f,
                "Bottom product by revenue: {} ({})",
                self.label,
                format_money(self.metric)
            ),
            InsightKind::LeadingRegion => write!(
                f,
                "Leading region: {} ({}% of total revenue)",
                self.label,
                format_number(self.metric, 1)
            ),
            InsightKind::BestWeekday => write!(f, "Best day for sales: {}", self.label),
            InsightKind::Outliers => write!(
                f,
                "{} atypical sales detected",
                format_int(self.metric as u64)
            ),
        }
    }
}

/// Collect insights in a fixed order: top and bottom product, leading region,
/// best weekday, then outliers when any were found.
///
/// `products` and `regions` are expected in descending revenue order, as
/// produced by the aggregation module.
pub fn collect_insights(
    products: &[ProductSummaryRow],
    regions: &[RegionSummaryRow],
    weekdays: &[WeekdayRow],
    outliers: &OutlierReport,
) -> Vec<Insight> {
    let mut insights = Vec::new();
    if let (Some(top), Some(bottom)) = (products.first(), products.last()) {
        insights.push(Insight {
            kind: InsightKind::TopProduct,
            label: top.product.clone(),
            metric: top.total_revenue,
        });
        insights.push(Insight {
            kind: InsightKind::BottomProduct,
            label: bottom.product.clone(),
            metric: bottom.total_revenue,
        });
    }
    if let Some(lead) = regions.first() {
        insights.push(Insight {
            kind: InsightKind::LeadingRegion,
            label: lead.region.clone(),
            metric: lead.market_share,
        });
    }
    if let Some(best) = best_weekday(weekdays) {
        insights.push(Insight {
            kind: InsightKind::BestWeekday,
            label: weekday_name(best.weekday).to_string(),
            metric: best.total_revenue,
        });
    }
    if outliers.count > 0 {
        insights.push(Insight {
            kind: InsightKind::Outliers,
            label: "revenue".to_string(),
            metric: outliers.count as f64,
        });
    }
    insights
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregate::{product_summary, region_summary};
    use crate::config::AnalysisConfig;
    use crate::features::enrich;
    use crate::patterns::detect_outliers;
    use crate::temporal::weekday_aggregate;
    use crate::types::RawTransaction;
    use chrono::NaiveDate;

    #[test]
    fn insights_arrive_in_order() {
        let d = |day| NaiveDate::from_ymd_opt(2024, 1, day).unwrap();
        let raw = vec![
            RawTransaction::complete(d(1), "A", "North", 10.0, 1),
            RawTransaction::complete(d(2), "A", "North", 10.0, 1),
            RawTransaction::complete(d(3), "B", "South", 10.0, 1),
            RawTransaction::complete(d(4), "A", "North", 10.0, 1),
            RawTransaction::complete(d(5), "C", "North", 150.0, 10),
        ];
        let table = enrich(&raw, &AnalysisConfig::default()).unwrap().0;
        let insights = collect_insights(
            &product_summary(&table).unwrap(),
            &region_summary(&table).unwrap(),
            &weekday_aggregate(&table),
            &detect_outliers(&table, 1.5).unwrap(),
        );
        let kinds: Vec<InsightKind> = insights.iter().map(|i| i.kind).collect();
        assert_eq!(
            kinds,
            vec![
                InsightKind::TopProduct,
                InsightKind::BottomProduct,
                InsightKind::LeadingRegion,
                InsightKind::BestWeekday,
                InsightKind::Outliers,
            ]
        );
        assert_eq!(insights[0].label, "C");
        assert_eq!(insights[1].label, "B");
        assert_eq!(insights[2].to_string(), "Leading region: North (99.4% of total revenue)");
        // 2024-01-05 is a Friday.
        assert_eq!(insights[3].to_string(), "Best day for sales: Friday");
        assert_eq!(insights[4].to_string(), "1 atypical sales detected");
    }

    #[test]
    fn no_outlier_insight_when_none_found() {
        let outliers = OutlierReport {
            q1: 1.0,
            q3: 1.0,
            iqr: 0.0,
            lower_fence: 1.0,
            upper_fence: 1.0,
            rows: Vec::new(),
            count: 0,
        };
        assert!(collect_insights(&[], &[], &[], &outliers).is_empty());
    }
}
