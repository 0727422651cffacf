use std::fmt;
use thiserror::Error;

/// Failures raised by the individual analysis components.
#[derive(Error, Debug)]
pub enum AnalysisError {
    #[error("source not found: {path}")]
    SourceNotFound { path: String },

    #[error("missing required columns: {}", .missing.join(", "))]
    Schema { missing: Vec<String> },

    #[error("line {line}, column '{column}': cannot parse '{value}' ({reason})")]
    Parse {
        line: u64,
        column: String,
        value: String,
        reason: String,
    },

    #[error("cannot aggregate an empty table: {0}")]
    EmptyGroup(String),

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("unit total overflows: {0}")]
    Overflow(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, AnalysisError>;

/// Pipeline stage a failure originated from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Load,
    Clean,
    Aggregate,
    CrossTab,
    Temporal,
    Patterns,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Load => "load",
            Stage::Clean => "clean",
            Stage::Aggregate => "aggregate",
            Stage::CrossTab => "cross-tab",
            Stage::Temporal => "temporal",
            Stage::Patterns => "patterns",
        };
        f.write_str(name)
    }
}

/// An [`AnalysisError`] tagged with the stage that produced it.
#[derive(Error, Debug)]
#[error("{stage} stage failed: {source}")]
pub struct PipelineError {
    pub stage: Stage,
    #[source]
    pub source: AnalysisError,
}

impl PipelineError {
    pub fn new(stage: Stage, source: AnalysisError) -> Self {
        Self { stage, source }
    }
}

/// Attach a stage to a component result.
pub trait StageExt<T> {
    fn at(self, stage: Stage) -> std::result::Result<T, PipelineError>;
}

impl<T> StageExt<T> for Result<T> {
    fn at(self, stage: Stage) -> std::result::Result<T, PipelineError> {
        self.map_err(|e| PipelineError::new(stage, e))
    }
}
