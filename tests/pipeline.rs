use chrono::{NaiveDate, Weekday};
use sales_insights::aggregate::aggregate;
use sales_insights::crosstab::cross_tab;
use sales_insights::loader::load_transactions_from_reader;
use sales_insights::patterns::{correlation_matrix, CORRELATION_MEASURES};
use sales_insights::temporal::daily_series;
use sales_insights::{
    analyze, analyze_file, prepare, AnalysisConfig, AnalysisError, Dimension, GroupKey, Measure,
    Stage,
};
use std::io::Write;

// ---------------------------------------------------------------------------
// Test data fixtures
// ---------------------------------------------------------------------------

const SALES_CSV: &str = "\
date,product,region,price,quantity
2024-03-04,Laptop,North,180.00,3
2024-03-04,Mouse,South,25.50,10
2024-03-04,Mouse,South,25.50,10
2024-03-05,Keyboard,East,60.00,4
2024-03-06,Laptop,South,175.00,2
2024-03-06,Monitor,North,140.00,1
2024-03-08,Mouse,East,22.00,6
2024-03-09,Keyboard,North,55.00,,
2024-03-11,Monitor,West,130.00,5
2024-03-12,Laptop,East,190.00,1
2024-03-14,Mouse,North,24.00,40
2024-03-15,Keyboard,South,65.00,2
2024-03-17,Laptop,West,185.00,4
";

fn write_csv(contents: &str) -> tempfile::NamedTempFile {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(contents.as_bytes()).unwrap();
    file
}

fn date(day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 3, day).unwrap()
}

// ---------------------------------------------------------------------------
// End to end
// ---------------------------------------------------------------------------

#[test]
fn full_run_over_csv_file() {
    let file = write_csv(SALES_CSV);
    let run = analyze_file(file.path(), &AnalysisConfig::default()).unwrap();

    assert_eq!(run.cleaning.raw_rows, 13);
    assert_eq!(run.cleaning.duplicates_removed, 1);
    assert_eq!(run.cleaning.incomplete_removed, 1);
    assert_eq!(run.table.len(), 11);

    for row in run.table.rows() {
        assert_eq!(row.revenue, row.price * row.quantity as f64);
    }

    let report = &run.report;
    assert_eq!(report.metrics.total_sales, 11);
    assert_eq!(report.products[0].product, "Laptop");
    assert_eq!(report.regions.len(), 4);
    let share: f64 = report.regions.iter().map(|r| r.market_share).sum();
    assert!((share - 100.0).abs() < 0.3);

    // 2024-03-04 .. 2024-03-17 inclusive.
    assert_eq!(report.temporal.daily.len(), 14);
    assert_eq!(report.temporal.weekday.len(), 7);
    assert_eq!(report.temporal.weekday[0].weekday, Weekday::Mon);

    let total: f64 = run.table.column(Measure::Revenue).iter().sum();
    assert!((report.product_by_region.grand_total() - total).abs() < 1e-9);
    assert!((report.region_by_price_category.grand_total() - total).abs() < 1e-9);

    assert!(!report.insights.is_empty());
    assert_eq!(report.insights[0].label, "Laptop");
}

#[test]
fn failures_name_their_stage() {
    let missing = analyze_file("/no/such/dir/sales.csv", &AnalysisConfig::default()).unwrap_err();
    assert_eq!(missing.stage, Stage::Load);
    assert!(missing.to_string().starts_with("load stage failed"));

    let schema = write_csv("date,product,price\n2024-01-01,A,1\n");
    let err = analyze_file(schema.path(), &AnalysisConfig::default()).unwrap_err();
    assert!(matches!(err.source, AnalysisError::Schema { .. }));

    let bad = write_csv("date,product,region,price,quantity\n2024-01-01,A,N,abc,1\n");
    let err = analyze_file(bad.path(), &AnalysisConfig::default()).unwrap_err();
    assert_eq!(err.stage, Stage::Load);
    assert!(matches!(err.source, AnalysisError::Parse { .. }));

    let huge = "date,product,region,price,quantity\n\
                2024-01-01,A,North,1,18446744073709551615\n\
                2024-01-02,A,North,1,1\n";
    let raw = load_transactions_from_reader(huge.as_bytes()).unwrap();
    let (table, _) = prepare(&raw, &AnalysisConfig::default()).unwrap();
    let err = analyze(&table, &AnalysisConfig::default()).unwrap_err();
    assert_eq!(err.stage, Stage::Aggregate);
    assert!(matches!(err.source, AnalysisError::Overflow(_)));
}

#[test]
fn iso_timestamps_load_as_calendar_dates() {
    let csv = "date,product,region,price,quantity\n\
               2024-01-02T13:45:00Z,A,North,10,1\n\
               2024-01-02 13:45:00.123,B,North,10,1\n\
               2024-01-02T23:30:00+02:00,C,South,10,1\n\
               2024-01-03T08:00:00.5-03:00,A,South,10,1\n";
    let raw = load_transactions_from_reader(csv.as_bytes()).unwrap();
    assert_eq!(raw.len(), 4);
    let (table, _) = prepare(&raw, &AnalysisConfig::default()).unwrap();
    let daily = daily_series(&table).unwrap();
    assert_eq!(daily.len(), 2);
    assert_eq!(daily[0].date, NaiveDate::from_ymd_opt(2024, 1, 2).unwrap());
    assert_eq!(daily[0].quantity, 3);
    assert_eq!(daily[1].quantity, 1);
}

// ---------------------------------------------------------------------------
// Properties
// ---------------------------------------------------------------------------

#[test]
fn worked_example_from_three_rows() {
    let csv = "date,product,region,price,quantity\n\
               2024-01-01,A,North,100,2\n\
               2024-01-01,A,North,100,2\n\
               2024-01-02,B,South,50,1\n";
    let raw = load_transactions_from_reader(csv.as_bytes()).unwrap();
    let (table, _) = prepare(&raw, &AnalysisConfig::default()).unwrap();
    assert_eq!(table.len(), 2);
    assert_eq!(table.column(Measure::Revenue), vec![200.0, 50.0]);

    let products = aggregate(&table, Dimension::Product, &[Measure::Revenue]).unwrap();
    let a = products
        .iter()
        .find(|r| r.key == GroupKey::Label("A".to_string()))
        .unwrap();
    assert_eq!(a.count, 1);
    assert_eq!(a.sum(Measure::Revenue), 200.0);

    let daily = daily_series(&table).unwrap();
    assert_eq!(daily.len(), 2);
    assert!(daily.iter().all(|d| d.revenue > 0.0));
}

#[test]
fn derivation_preserves_rows_and_is_order_independent_for_moving_average() {
    let raw = load_transactions_from_reader(SALES_CSV.as_bytes()).unwrap();
    let (table, cleaning) = prepare(&raw, &AnalysisConfig::default()).unwrap();
    assert_eq!(
        table.len(),
        cleaning.raw_rows - cleaning.duplicates_removed - cleaning.incomplete_removed
    );

    let mut shuffled = raw.clone();
    shuffled.rotate_left(5);
    let (other, _) = prepare(&shuffled, &AnalysisConfig::default()).unwrap();
    for row in other.rows() {
        let same = table
            .rows()
            .iter()
            .find(|r| r.date == row.date && r.product == row.product && r.region == row.region)
            .unwrap();
        assert_eq!(same.revenue_ma7, row.revenue_ma7);
    }
}

#[test]
fn gap_days_have_zero_revenue() {
    let raw = load_transactions_from_reader(SALES_CSV.as_bytes()).unwrap();
    let (table, _) = prepare(&raw, &AnalysisConfig::default()).unwrap();
    let daily = daily_series(&table).unwrap();
    let (start, end) = table.date_range().unwrap();
    assert_eq!(daily.len() as i64, (end - start).num_days() + 1);
    let gap = daily.iter().find(|d| d.date == date(7)).unwrap();
    assert_eq!(gap.revenue, 0.0);
}

#[test]
fn cross_tab_is_dense() {
    let raw = load_transactions_from_reader(SALES_CSV.as_bytes()).unwrap();
    let (table, _) = prepare(&raw, &AnalysisConfig::default()).unwrap();
    let pivot = cross_tab(&table, Dimension::Product, Dimension::Region, Measure::Quantity).unwrap();
    assert_eq!(pivot.row_keys.len(), 4);
    assert_eq!(pivot.col_keys.len(), 4);
    assert!(pivot.cells.iter().all(|r| r.len() == 4));
    let total: f64 = table.column(Measure::Quantity).iter().sum();
    assert_eq!(pivot.grand_total(), total);
}

#[test]
fn correlation_diagonal_and_symmetry() {
    let raw = load_transactions_from_reader(SALES_CSV.as_bytes()).unwrap();
    let (table, _) = prepare(&raw, &AnalysisConfig::default()).unwrap();
    let m = correlation_matrix(&table, &CORRELATION_MEASURES);
    for i in 0..m.measures.len() {
        assert_eq!(m.values[i][i], 1.0);
        for j in 0..m.measures.len() {
            assert!((m.values[i][j] - m.values[j][i]).abs() < 1e-12);
        }
    }
}

#[test]
fn outliers_are_reported_not_removed() {
    let raw = load_transactions_from_reader(SALES_CSV.as_bytes()).unwrap();
    let (table, _) = prepare(&raw, &AnalysisConfig::default()).unwrap();
    let report = analyze(&table, &AnalysisConfig::default()).unwrap();
    let counted: usize = report.products.iter().map(|p| p.sales_count).sum();
    assert_eq!(counted, table.len());
    assert_eq!(report.patterns.outliers.count, report.patterns.outliers.rows.len());
}
