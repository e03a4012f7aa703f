//! End-to-end analysis runner.

use std::time::Instant;

use causalimpact_core::{CausalImpact, ImpactError, OutputFormat, SummaryTable};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::{AnalysisConfig, ConfigError, RunId};
use crate::loader::{load_csv, LoadError};

/// Artifact schema version; bumped when the exported layout changes.
pub const SCHEMA_VERSION: u32 = 1;

/// Errors from a full run.
#[derive(Debug, Error)]
pub enum RunError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Load(#[from] LoadError),

    #[error(transparent)]
    Impact(#[from] ImpactError),
}

/// Everything a run produces, ready for printing and export.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisOutcome {
    pub schema_version: u32,
    pub run_id: RunId,
    pub alpha: f64,
    pub p_value: f64,
    /// `p_value < alpha`.
    pub significant: bool,
    pub summary: SummaryTable,
    pub summary_text: String,
    pub report_text: String,
    pub inferences: causalimpact_core::InferenceTable,
    pub elapsed_secs: f64,
}

/// Load the data, run the analysis, and render both outputs.
pub fn run_analysis(config: &AnalysisConfig) -> Result<AnalysisOutcome, RunError> {
    let started = Instant::now();

    let data = load_csv(&config.data)?;
    let (pre_period, post_period) = config.periods()?;
    let impact = CausalImpact::run(data, pre_period, post_period, config.impact_config())?;

    let digits = config.display.digits;
    let p_value = impact.p_value()?;
    let outcome = AnalysisOutcome {
        schema_version: SCHEMA_VERSION,
        run_id: config.run_id(),
        alpha: config.inference.alpha,
        p_value,
        significant: p_value < config.inference.alpha,
        summary: *impact.summary_data()?,
        summary_text: impact.summary(OutputFormat::Summary, digits)?,
        report_text: impact.summary(OutputFormat::Report, digits)?,
        inferences: impact.inferences()?.clone(),
        elapsed_secs: started.elapsed().as_secs_f64(),
    };
    Ok(outcome)
}
