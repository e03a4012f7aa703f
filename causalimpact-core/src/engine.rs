//! Posterior inference engine.
//!
//! A single run walks a fixed state machine:
//! `Empty → ModelBound → Simulated → Assembled`. Each operation requires
//! the prior state; results (`p_value`, `inferences`) are write-once and
//! only readable once assembled. A failed step leaves the engine in its
//! last valid state — recovery is a fresh engine, not a retry.

use crate::ensemble::SimulationEnsemble;
use crate::error::ImpactError;
use crate::lock::Locked;
use crate::model::adapter::rebuild_model;
use crate::model::{ModelError, StructuralModel};
use crate::series::TimePoint;
use crate::standardize::Moments;
use crate::table::{InferenceTable, TableColumns};

/// Engine lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum EngineState {
    Empty,
    ModelBound,
    Simulated,
    Assembled,
}

impl EngineState {
    pub fn as_str(&self) -> &'static str {
        match self {
            EngineState::Empty => "Empty",
            EngineState::ModelBound => "ModelBound",
            EngineState::Simulated => "Simulated",
            EngineState::Assembled => "Assembled",
        }
    }
}

/// Everything one `run` consumes.
///
/// `post_endog`/`post_exog` are in the model's scale (standardized when the
/// pipeline standardizes); `pre_actual`/`post_actual`/`fitted_pre` are in
/// the original scale. `scale` maps simulated draws back to the original
/// scale before the ensemble is stored.
#[derive(Debug, Clone, Copy)]
pub struct RunInputs<'a> {
    pub reference_model: &'a dyn StructuralModel,
    pub post_endog: &'a [f64],
    pub post_exog: Option<&'a [Vec<f64>]>,
    pub index: &'a [TimePoint],
    pub pre_actual: &'a [f64],
    pub post_actual: &'a [f64],
    pub fitted_pre: &'a [f64],
    pub alpha: f64,
    pub scale: Option<Moments>,
}

/// Runs posterior simulation and assembles the inference table.
#[derive(Debug)]
pub struct InferenceEngine {
    n_simulations: usize,
    seed: u64,
    state: EngineState,
    post_model: Option<Box<dyn StructuralModel>>,
    ensemble: Option<SimulationEnsemble>,
    percentiles: Option<(f64, f64)>,
    p_value: Locked<f64>,
    inferences: Locked<InferenceTable>,
}

impl InferenceEngine {
    /// `n_simulations` must be positive.
    pub fn new(n_simulations: usize) -> Result<Self, ImpactError> {
        if n_simulations == 0 {
            return Err(ImpactError::ZeroSimulations);
        }
        Ok(Self {
            n_simulations,
            seed: 42,
            state: EngineState::Empty,
            post_model: None,
            ensemble: None,
            percentiles: None,
            p_value: Locked::new("p_value"),
            inferences: Locked::new("inferences"),
        })
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    pub fn n_simulations(&self) -> usize {
        self.n_simulations
    }

    pub fn state(&self) -> EngineState {
        self.state
    }

    /// Lower/upper percentile pair derived from alpha; available once
    /// assembled.
    pub fn lower_upper_percentile(&self) -> Result<(f64, f64), ImpactError> {
        self.require_reached(EngineState::Assembled, "lower_upper_percentile")?;
        self.percentiles.ok_or(ImpactError::InvalidState {
            operation: "lower_upper_percentile",
            required: EngineState::Assembled.as_str(),
            actual: self.state.as_str(),
        })
    }

    /// Attach the post-period simulation model. `Empty → ModelBound`.
    pub fn bind_model(&mut self, post_model: Box<dyn StructuralModel>) -> Result<(), ImpactError> {
        self.require_exact(EngineState::Empty, "bind_model")?;
        self.post_model = Some(post_model);
        self.state = EngineState::ModelBound;
        Ok(())
    }

    /// Draw the simulation ensemble. `ModelBound → Simulated`.
    ///
    /// When `scale` is given the draws are mapped back to the original
    /// scale before the ensemble is stored; the stored ensemble is
    /// immutable afterwards.
    pub fn simulate(&mut self, scale: Option<Moments>) -> Result<(), ImpactError> {
        self.require_exact(EngineState::ModelBound, "simulate")?;
        let model = self.post_model.as_deref().ok_or(ImpactError::InvalidState {
            operation: "simulate",
            required: EngineState::ModelBound.as_str(),
            actual: self.state.as_str(),
        })?;
        let ensemble = model.simulate(self.n_simulations, self.seed)?;
        if ensemble.n_draws() != self.n_simulations {
            return Err(ImpactError::Model(ModelError::WrongDrawCount {
                requested: self.n_simulations,
                produced: ensemble.n_draws(),
            }));
        }
        let ensemble = match scale {
            Some(moments) => ensemble.map_values(|v| v * moments.std + moments.mean),
            None => ensemble,
        };
        self.ensemble = Some(ensemble);
        self.state = EngineState::Simulated;
        Ok(())
    }

    /// The stored ensemble; available once simulated.
    pub fn ensemble(&self) -> Result<&SimulationEnsemble, ImpactError> {
        self.require_reached(EngineState::Simulated, "ensemble")?;
        self.ensemble.as_ref().ok_or(ImpactError::InvalidState {
            operation: "ensemble",
            required: EngineState::Simulated.as_str(),
            actual: self.state.as_str(),
        })
    }

    /// Build the inference table and the p-value. `Simulated → Assembled`.
    pub fn assemble(
        &mut self,
        index: &[TimePoint],
        pre_actual: &[f64],
        post_actual: &[f64],
        fitted_pre: &[f64],
        alpha: f64,
    ) -> Result<(), ImpactError> {
        self.require_exact(EngineState::Simulated, "assemble")?;
        if !(alpha > 0.0 && alpha < 1.0) {
            return Err(ImpactError::AlphaOutOfRange { alpha });
        }
        if fitted_pre.len() != pre_actual.len() {
            return Err(ImpactError::ColumnLengthMismatch {
                name: "fitted_pre".into(),
                len: fitted_pre.len(),
                expected: pre_actual.len(),
            });
        }
        if index.len() != pre_actual.len() + post_actual.len() {
            return Err(ImpactError::ColumnLengthMismatch {
                name: "index".into(),
                len: index.len(),
                expected: pre_actual.len() + post_actual.len(),
            });
        }
        let ensemble = self.ensemble.as_ref().ok_or(ImpactError::InvalidState {
            operation: "assemble",
            required: EngineState::Simulated.as_str(),
            actual: self.state.as_str(),
        })?;
        if ensemble.horizon() != post_actual.len() {
            return Err(ImpactError::ColumnLengthMismatch {
                name: "post_actual".into(),
                len: post_actual.len(),
                expected: ensemble.horizon(),
            });
        }

        let lower_pct = alpha / 2.0 * 100.0;
        let upper_pct = (1.0 - alpha / 2.0) * 100.0;

        let post_preds = ensemble.column_means();
        let post_lower = ensemble.column_percentiles(lower_pct);
        let post_upper = ensemble.column_percentiles(upper_pct);

        let n_pre = pre_actual.len();
        let n_post = post_actual.len();
        let total = n_pre + n_post;

        // Predictions: in-sample fitted values over the pre period carry no
        // band; simulated means and percentile bands over the post period.
        let mut preds = Vec::with_capacity(total);
        let mut preds_lower = Vec::with_capacity(total);
        let mut preds_upper = Vec::with_capacity(total);
        preds.extend_from_slice(fitted_pre);
        preds_lower.extend_from_slice(fitted_pre);
        preds_upper.extend_from_slice(fitted_pre);
        preds.extend_from_slice(&post_preds);
        preds_lower.extend_from_slice(&post_lower);
        preds_upper.extend_from_slice(&post_upper);

        // Effect = actual − prediction, so the bounds swap.
        let actual = pre_actual.iter().chain(post_actual);
        let mut point_effects = Vec::with_capacity(total);
        let mut point_effects_lower = Vec::with_capacity(total);
        let mut point_effects_upper = Vec::with_capacity(total);
        for (t, y) in actual.enumerate() {
            point_effects.push(y - preds[t]);
            point_effects_lower.push(y - preds_upper[t]);
            point_effects_upper.push(y - preds_lower[t]);
        }

        // Cumulative columns restart at the post-period start and come from
        // the per-draw cumulative distribution, not from summing pointwise
        // bounds. Pre-period cells stay NaN.
        let cumulative = ensemble.cumulative_rows();
        let cum_pred_lower = cumulative.column_percentiles(lower_pct);
        let cum_pred_upper = cumulative.column_percentiles(upper_pct);

        let nan_prefix = vec![f64::NAN; n_pre];
        let mut post_cum_y = nan_prefix.clone();
        let mut post_cum_pred = nan_prefix.clone();
        let mut post_cum_pred_lower = nan_prefix.clone();
        let mut post_cum_pred_upper = nan_prefix.clone();
        let mut post_cum_effects = nan_prefix.clone();
        let mut post_cum_effects_lower = nan_prefix.clone();
        let mut post_cum_effects_upper = nan_prefix;

        let mut cum_actual = 0.0;
        let mut cum_pred = 0.0;
        for t in 0..n_post {
            cum_actual += post_actual[t];
            cum_pred += post_preds[t];
            post_cum_y.push(cum_actual);
            post_cum_pred.push(cum_pred);
            post_cum_pred_lower.push(cum_pred_lower[t]);
            post_cum_pred_upper.push(cum_pred_upper[t]);
            post_cum_effects.push(cum_actual - cum_pred);
            post_cum_effects_lower.push(cum_actual - cum_pred_upper[t]);
            post_cum_effects_upper.push(cum_actual - cum_pred_lower[t]);
        }

        let table = InferenceTable::new(
            index.to_vec(),
            TableColumns {
                preds,
                preds_lower,
                preds_upper,
                point_effects,
                point_effects_lower,
                point_effects_upper,
                post_cum_y,
                post_cum_pred,
                post_cum_pred_lower,
                post_cum_pred_upper,
                post_cum_effects,
                post_cum_effects_lower,
                post_cum_effects_upper,
            },
        )?;

        let observed_total: f64 = post_actual.iter().sum();
        let predicted_total: f64 = post_preds.iter().sum();
        let p = tail_probability(&ensemble.row_sums(), observed_total, predicted_total);

        self.set_inferences(table)?;
        self.set_p_value(p)?;
        self.percentiles = Some((lower_pct, upper_pct));
        self.state = EngineState::Assembled;
        Ok(())
    }

    /// Full run: adapter rebuild, simulation, assembly.
    pub fn run(&mut self, inputs: RunInputs<'_>) -> Result<(), ImpactError> {
        let post_model = rebuild_model(
            inputs.reference_model,
            inputs.post_endog,
            inputs.post_exog,
        )?;
        self.bind_model(post_model)?;
        self.simulate(inputs.scale)?;
        self.assemble(
            inputs.index,
            inputs.pre_actual,
            inputs.post_actual,
            inputs.fitted_pre,
            inputs.alpha,
        )
    }

    /// One-sided tail-area probability; readable once assembled.
    pub fn p_value(&self) -> Result<f64, ImpactError> {
        self.require_reached(EngineState::Assembled, "p_value")?;
        self.p_value.get().copied().ok_or(ImpactError::InvalidState {
            operation: "p_value",
            required: EngineState::Assembled.as_str(),
            actual: self.state.as_str(),
        })
    }

    /// The assembled inference table.
    pub fn inferences(&self) -> Result<&InferenceTable, ImpactError> {
        self.require_reached(EngineState::Assembled, "inferences")?;
        self.inferences.get().ok_or(ImpactError::InvalidState {
            operation: "inferences",
            required: EngineState::Assembled.as_str(),
            actual: self.state.as_str(),
        })
    }

    /// Write-once setter: rejects values outside [0, 1], locks after the
    /// first valid write.
    pub fn set_p_value(&mut self, value: f64) -> Result<(), ImpactError> {
        if !(0.0..=1.0).contains(&value) {
            return Err(ImpactError::ProbabilityOutOfRange { value });
        }
        self.p_value.set(value)
    }

    /// Write-once setter: rejects structurally invalid tables, locks after
    /// the first valid write.
    pub fn set_inferences(&mut self, table: InferenceTable) -> Result<(), ImpactError> {
        table.validate()?;
        self.inferences.set(table)
    }

    fn require_exact(
        &self,
        expected: EngineState,
        operation: &'static str,
    ) -> Result<(), ImpactError> {
        if self.state == expected {
            Ok(())
        } else {
            Err(ImpactError::InvalidState {
                operation,
                required: expected.as_str(),
                actual: self.state.as_str(),
            })
        }
    }

    fn require_reached(
        &self,
        minimum: EngineState,
        operation: &'static str,
    ) -> Result<(), ImpactError> {
        if self.state >= minimum {
            Ok(())
        } else {
            Err(ImpactError::InvalidState {
                operation,
                required: minimum.as_str(),
                actual: self.state.as_str(),
            })
        }
    }
}

/// Fraction of simulated totals at least as extreme as the observed total,
/// in the direction opposite the observed effect. Ties count as extreme; a
/// zero effect uses the positive tail.
fn tail_probability(simulated_totals: &[f64], observed: f64, predicted: f64) -> f64 {
    let n = simulated_totals.len() as f64;
    let extreme = if observed >= predicted {
        simulated_totals.iter().filter(|&&s| s >= observed).count()
    } else {
        simulated_totals.iter().filter(|&&s| s <= observed).count()
    };
    extreme as f64 / n
}
