// Orchestration: run every analysis over one immutable enriched table and
// gather the results into a single report-input struct.
use crate::aggregate::{product_summary, region_summary};
use crate::config::AnalysisConfig;
use crate::crosstab::{cross_tab, PivotTable};
use crate::error::{PipelineError, Stage, StageExt};
use crate::features::{enrich, CleaningReport};
use crate::insights::{collect_insights, Insight};
use crate::loader::load_transactions;
use crate::metrics::{best_sale, general_metrics, GeneralMetrics};
use crate::patterns::{identify_patterns, PatternReport};
use crate::temporal::{temporal_summary, TemporalSummary};
use crate::types::{
    Dimension, EnrichedRecord, EnrichedTable, Measure, ProductSummaryRow, RawTransaction,
    RegionSummaryRow,
};
use serde::Serialize;
use std::path::Path;

/// Everything the reporting side needs, computed in one pass.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnalysisReport {
    pub metrics: GeneralMetrics,
    pub best_sale: Option<EnrichedRecord>,
    pub products: Vec<ProductSummaryRow>,
    pub regions: Vec<RegionSummaryRow>,
    /// Product x region revenue, rows by total descending.
    pub product_by_region: PivotTable,
    /// Region x price category revenue, rows by total descending and
    /// categories in bin order.
    pub region_by_price_category: PivotTable,
    pub temporal: TemporalSummary,
    pub patterns: PatternReport,
    pub insights: Vec<Insight>,
}

/// A loaded, cleaned and analysed data set.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnalysisRun {
    pub cleaning: CleaningReport,
    pub table: EnrichedTable,
    pub report: AnalysisReport,
}

pub fn prepare(
    raw: &[RawTransaction],
    config: &AnalysisConfig,
) -> Result<(EnrichedTable, CleaningReport), PipelineError> {
    enrich(raw, config).at(Stage::Clean)
}

pub fn analyze(
    table: &EnrichedTable,
    config: &AnalysisConfig,
) -> Result<AnalysisReport, PipelineError> {
    let metrics = general_metrics(table).at(Stage::Aggregate)?;
    let products = product_summary(table).at(Stage::Aggregate)?;
    let regions = region_summary(table).at(Stage::Aggregate)?;

    let product_by_region = cross_tab(
        table,
        Dimension::Product,
        Dimension::Region,
        Measure::Revenue,
    )
    .at(Stage::CrossTab)?
    .sorted_by_row_total();
    let region_by_price_category = cross_tab(
        table,
        Dimension::Region,
        Dimension::PriceCategory,
        Measure::Revenue,
    )
    .at(Stage::CrossTab)?
    .sorted_by_row_total()
    .with_sorted_columns();

    let temporal = temporal_summary(table).at(Stage::Temporal)?;
    let patterns = identify_patterns(table, config.iqr_multiplier).at(Stage::Patterns)?;

    let insights = collect_insights(&products, &regions, &temporal.weekday, &patterns.outliers);
    log::info!(
        "analysis complete: {} products, {} regions, {} insights",
        products.len(),
        regions.len(),
        insights.len()
    );

    Ok(AnalysisReport {
        best_sale: best_sale(table).cloned(),
        metrics,
        products,
        regions,
        product_by_region,
        region_by_price_category,
        temporal,
        patterns,
        insights,
    })
}

/// Load, clean and analyse the CSV at `path`. Nothing is produced unless
/// every stage succeeds.
pub fn analyze_file<P: AsRef<Path>>(
    path: P,
    config: &AnalysisConfig,
) -> Result<AnalysisRun, PipelineError> {
    let raw = load_transactions(path).at(Stage::Load)?;
    let (table, cleaning) = prepare(&raw, config)?;
    let report = analyze(&table, config)?;
    Ok(AnalysisRun {
        cleaning,
        table,
        report,
    })
}
