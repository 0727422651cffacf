//! Sales transaction analytics.
//!
//! Loads a flat table of sales (`date, product, region, price, quantity`),
//! cleans it, derives revenue/profit/calendar/bin features and computes
//! grouped summaries, cross-tabs, temporal trends, outliers and
//! correlations. Rendering and file export are left to the caller.
pub mod aggregate;
pub mod config;
pub mod crosstab;
pub mod error;
pub mod features;
pub mod insights;
pub mod loader;
pub mod metrics;
pub mod output;
pub mod patterns;
pub mod pipeline;
pub mod temporal;
pub mod types;
pub mod util;

pub use config::{AnalysisConfig, MarginModel};
pub use error::{AnalysisError, PipelineError, Stage};
pub use pipeline::{analyze, analyze_file, prepare, AnalysisReport, AnalysisRun};
pub use types::{Dimension, EnrichedRecord, EnrichedTable, GroupKey, Measure, RawTransaction};
