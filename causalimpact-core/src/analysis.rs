//! Top-level causal impact analysis.
//!
//! Ties the pipeline together: validate periods, standardize the pre-period
//! data, fit the reference model (or accept an injected one), rebuild the
//! post-period simulation model through the adapter, drive the engine, and
//! derive the summary. Results come back in the original scale of the
//! response.

use serde::{Deserialize, Serialize};

use crate::engine::{InferenceEngine, RunInputs};
use crate::error::ImpactError;
use crate::model::local_level::LocalLevelModel;
use crate::model::StructuralModel;
use crate::plot::{build_figure, FigureConfig, FigureSpec};
use crate::series::{AnalysisData, Period};
use crate::standardize::{apply, column_moments, standardize, unstandardize};
use crate::summary::{OutputFormat, Summarizer};
use crate::table::{InferenceTable, SummaryTable};

/// Analysis settings; the defaults match the usual 1000-draw, 95% setup.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ImpactConfig {
    pub n_simulations: usize,
    pub alpha: f64,
    pub standardize: bool,
    pub seed: u64,
}

impl Default for ImpactConfig {
    fn default() -> Self {
        Self {
            n_simulations: 1000,
            alpha: 0.05,
            standardize: true,
            seed: 42,
        }
    }
}

/// A completed analysis: the engine results plus the summary layer.
#[derive(Debug)]
pub struct CausalImpact {
    data: AnalysisData,
    pre_period: Period,
    post_period: Period,
    post_start: usize,
    config: ImpactConfig,
    engine: InferenceEngine,
    summarizer: Summarizer,
}

impl CausalImpact {
    /// Run the full pipeline with the built-in local-level reference model.
    pub fn run(
        data: AnalysisData,
        pre_period: Period,
        post_period: Period,
        config: ImpactConfig,
    ) -> Result<Self, ImpactError> {
        let (pre, _post) = data.resolve_periods(&pre_period, &post_period)?;

        let model = if config.standardize {
            let mut pre_columns = vec![data.y()[pre.clone()].to_vec()];
            if let Some(covariates) = data.covariate_slice(&pre) {
                pre_columns.extend(covariates);
            }
            let (normed, _) = standardize(&pre_columns)?;
            let mut normed = normed.into_iter();
            let endog = normed.next().ok_or(ImpactError::TooFewRows { rows: 0 })?;
            let exog: Vec<Vec<f64>> = normed.collect();
            let exog = if exog.is_empty() { None } else { Some(exog) };
            LocalLevelModel::fitted(endog, exog)?
        } else {
            let endog = data.y()[pre.clone()].to_vec();
            LocalLevelModel::fitted(endog, data.covariate_slice(&pre))?
        };

        Self::run_with_model(data, pre_period, post_period, config, Box::new(model))
    }

    /// Run the pipeline with a caller-supplied fitted model.
    ///
    /// When `config.standardize` is set, the model is expected to have been
    /// fitted on the standardized pre-period data (see
    /// [`crate::standardize::standardize`]); the engine maps results back to
    /// the original scale using the pre-period moments.
    pub fn run_with_model(
        data: AnalysisData,
        pre_period: Period,
        post_period: Period,
        config: ImpactConfig,
        model: Box<dyn StructuralModel>,
    ) -> Result<Self, ImpactError> {
        if config.n_simulations == 0 {
            return Err(ImpactError::ZeroSimulations);
        }
        if !(config.alpha > 0.0 && config.alpha < 1.0) {
            return Err(ImpactError::AlphaOutOfRange {
                alpha: config.alpha,
            });
        }
        let (pre, post) = data.resolve_periods(&pre_period, &post_period)?;

        let pre_actual = &data.y()[pre.clone()];
        let post_actual = &data.y()[post.clone()];

        // Moments come from the pre period and are applied to the post
        // period, so the post data is expressed in the units the model was
        // fitted in.
        let (scale, post_endog, post_exog) = if config.standardize {
            let y_moments = column_moments(pre_actual);
            let post_endog = apply(post_actual, y_moments);
            let post_exog = match (data.covariate_slice(&pre), data.covariate_slice(&post)) {
                (Some(pre_cols), Some(post_cols)) => Some(
                    pre_cols
                        .iter()
                        .zip(post_cols)
                        .map(|(pre_col, post_col)| apply(&post_col, column_moments(pre_col)))
                        .collect::<Vec<_>>(),
                ),
                _ => None,
            };
            (Some(y_moments), post_endog, post_exog)
        } else {
            (None, post_actual.to_vec(), data.covariate_slice(&post))
        };

        let fitted_model_scale = model.fitted_values()?;
        let fitted_pre = match scale {
            Some(moments) => unstandardize(&fitted_model_scale, moments),
            None => fitted_model_scale,
        };

        // Table index covers exactly pre ∪ post.
        let mut index = data.index()[pre.clone()].to_vec();
        index.extend_from_slice(&data.index()[post.clone()]);

        let mut engine = InferenceEngine::new(config.n_simulations)?.with_seed(config.seed);
        engine.run(RunInputs {
            reference_model: &*model,
            post_endog: &post_endog,
            post_exog: post_exog.as_deref(),
            index: &index,
            pre_actual,
            post_actual,
            fitted_pre: &fitted_pre,
            alpha: config.alpha,
            scale,
        })?;

        let post_start = pre.len();
        let table = engine.inferences()?;
        let summary_table =
            SummaryTable::from_inferences(table, post_start..index.len(), post_actual)?;
        let p_value = engine.p_value()?;

        let mut summarizer = Summarizer::new(config.alpha)?;
        summarizer.set_summary_data(summary_table)?;
        summarizer.set_p_value(p_value)?;

        Ok(Self {
            data,
            pre_period,
            post_period,
            post_start,
            config,
            engine,
            summarizer,
        })
    }

    pub fn data(&self) -> &AnalysisData {
        &self.data
    }

    pub fn pre_period(&self) -> Period {
        self.pre_period
    }

    pub fn post_period(&self) -> Period {
        self.post_period
    }

    pub fn config(&self) -> &ImpactConfig {
        &self.config
    }

    /// One-sided tail-area probability of the observed total effect.
    pub fn p_value(&self) -> Result<f64, ImpactError> {
        self.engine.p_value()
    }

    /// The per-timestep inference table.
    pub fn inferences(&self) -> Result<&InferenceTable, ImpactError> {
        self.engine.inferences()
    }

    /// The stored simulation ensemble, in original response units.
    pub fn simulations(&self) -> Result<&crate::ensemble::SimulationEnsemble, ImpactError> {
        self.engine.ensemble()
    }

    /// Lower/upper percentile pair implied by alpha.
    pub fn lower_upper_percentile(&self) -> Result<(f64, f64), ImpactError> {
        self.engine.lower_upper_percentile()
    }

    /// Post-period summary aggregates.
    pub fn summary_data(&self) -> Result<&SummaryTable, ImpactError> {
        self.summarizer
            .summary_data()
            .ok_or(ImpactError::SummaryNotReady)
    }

    /// Render the numeric summary or the narrative report.
    pub fn summary(&self, format: OutputFormat, digits: usize) -> Result<String, ImpactError> {
        self.summarizer.summary(format, digits)
    }

    /// Convenience for the narrative report.
    pub fn report(&self, digits: usize) -> Result<String, ImpactError> {
        self.summary(OutputFormat::Report, digits)
    }

    /// Build the figure description for the requested panels.
    pub fn plot(&self, config: &FigureConfig) -> Result<FigureSpec, ImpactError> {
        let table = self.engine.inferences()?;
        build_figure(table, &self.data, self.post_start, config)
    }
}
