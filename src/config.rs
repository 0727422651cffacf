// Analysis configuration.
//
// Every field has a default matching the stock analysis, so an empty JSON
// object (or no config file at all) reproduces it.
use crate::error::{AnalysisError, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// How `margin_percent` is produced for each enriched row.
///
/// The input carries no cost data, so margin is always synthetic. `Simulated`
/// draws one uniform value per surviving row in row order, which makes the
/// result depend on the order rows arrive in. `Fixed` removes that dependency.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum MarginModel {
    Simulated { seed: u64, low: f64, high: f64 },
    Fixed { percent: f64 },
}

impl Default for MarginModel {
    fn default() -> Self {
        MarginModel::Simulated {
            seed: 42,
            low: 20.0,
            high: 60.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    pub moving_average_window: usize,
    pub iqr_multiplier: f64,
    pub margin: MarginModel,
    pub top_n_preview: usize,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            moving_average_window: 7,
            iqr_multiplier: 1.5,
            margin: MarginModel::default(),
            top_n_preview: 5,
        }
    }
}

impl AnalysisConfig {
    pub fn from_json_str(s: &str) -> Result<Self> {
        let config: AnalysisConfig =
            serde_json::from_str(s).map_err(|e| AnalysisError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(AnalysisError::SourceNotFound {
                path: path.display().to_string(),
            });
        }
        let s = std::fs::read_to_string(path)?;
        Self::from_json_str(&s)
    }

    pub fn validate(&self) -> Result<()> {
        if self.moving_average_window == 0 {
            return Err(AnalysisError::Config(
                "moving_average_window must be at least 1".to_string(),
            ));
        }
        if !self.iqr_multiplier.is_finite() || self.iqr_multiplier < 0.0 {
            return Err(AnalysisError::Config(format!(
                "iqr_multiplier must be a non-negative number, got {}",
                self.iqr_multiplier
            )));
        }
        match self.margin {
            MarginModel::Simulated { low, high, .. } => {
                if !(low.is_finite() && high.is_finite()) || low < 0.0 || high > 100.0 || low >= high
                {
                    return Err(AnalysisError::Config(format!(
                        "simulated margin range must satisfy 0 <= low < high <= 100, got [{}, {})",
                        low, high
                    )));
                }
            }
            MarginModel::Fixed { percent } => {
                if !percent.is_finite() || !(0.0..=100.0).contains(&percent) {
                    return Err(AnalysisError::Config(format!(
                        "fixed margin must be within [0, 100], got {}",
                        percent
                    )));
                }
            }
        }
        Ok(())
    }
}
