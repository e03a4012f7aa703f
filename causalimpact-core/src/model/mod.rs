//! Structural time-series model interface.
//!
//! The model fitter is an injected dependency: the engine only needs the
//! configuration accessors, the in-sample predictions, and the simulation
//! primitive, so the whole collaborator is a narrow trait. General
//! state-space estimation (Kalman smoothing, maximum-likelihood fitting)
//! stays outside this crate; [`local_level::LocalLevelModel`] is the
//! built-in reference implementation used by the default pipeline.

pub mod adapter;
pub mod local_level;

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::ensemble::SimulationEnsemble;

/// One frequency-domain seasonal component.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FreqSeasonal {
    pub period: f64,
    pub harmonics: usize,
}

/// Full structural configuration of a fitted model.
///
/// Cycle bounds are stored as *frequencies* in radians, the form the fitted
/// model reports them in; [`adapter::definition_from_spec`] converts them to
/// period bounds when a new model is constructed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelSpec {
    pub level: bool,
    pub trend: bool,
    pub seasonal: Option<usize>,
    pub freq_seasonal: Vec<FreqSeasonal>,
    pub cycle: bool,
    pub damped_cycle: bool,
    pub ar_order: usize,
    pub irregular: bool,
    pub stochastic_level: bool,
    pub stochastic_trend: bool,
    pub stochastic_seasonal: bool,
    pub stochastic_freq_seasonal: Vec<bool>,
    pub stochastic_cycle: bool,
    /// (lower, upper) cycle frequency bounds in radians.
    pub cycle_frequency_bounds: Option<(f64, f64)>,
}

impl ModelSpec {
    /// Stochastic level plus observation noise, no other components.
    pub fn local_level() -> Self {
        Self {
            level: true,
            trend: false,
            seasonal: None,
            freq_seasonal: Vec::new(),
            cycle: false,
            damped_cycle: false,
            ar_order: 0,
            irregular: true,
            stochastic_level: true,
            stochastic_trend: false,
            stochastic_seasonal: false,
            stochastic_freq_seasonal: Vec::new(),
            stochastic_cycle: false,
            cycle_frequency_bounds: None,
        }
    }
}

/// A [`ModelSpec`] ready for constructing a fresh model: identical structure,
/// with cycle bounds expressed as *periods* instead of frequencies. The upper
/// period bound is `f64::INFINITY` when the lower frequency bound was zero.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelDefinition {
    pub level: bool,
    pub trend: bool,
    pub seasonal: Option<usize>,
    pub freq_seasonal: Vec<FreqSeasonal>,
    pub cycle: bool,
    pub damped_cycle: bool,
    pub ar_order: usize,
    pub irregular: bool,
    pub stochastic_level: bool,
    pub stochastic_trend: bool,
    pub stochastic_seasonal: bool,
    pub stochastic_freq_seasonal: Vec<bool>,
    pub stochastic_cycle: bool,
    /// (lower, upper) cycle period bounds; upper may be infinite.
    pub cycle_period_bounds: Option<(f64, f64)>,
}

/// Errors from model construction, fitting, and simulation.
#[derive(Debug, Error)]
pub enum ModelError {
    #[error("model has not been fitted")]
    NotFitted,

    #[error("endog has {endog} rows but an exog column has {exog}")]
    DimensionMismatch { endog: usize, exog: usize },

    #[error("model requires at least {required} observations, got {actual}")]
    TooShort { required: usize, actual: usize },

    #[error("model definition requests an unsupported component: {component}")]
    UnsupportedComponent { component: &'static str },

    #[error("cycle frequency bounds ({lower}, {upper}) are not valid")]
    BadCycleBounds { lower: f64, upper: f64 },

    #[error("covariate count changed: reference has {reference}, rebuild got {rebuilt}")]
    CovariateCountMismatch { reference: usize, rebuilt: usize },

    #[error("regression design matrix is singular")]
    SingularDesign,

    #[error("at least one simulation draw is required")]
    NoDraws,

    #[error("requested {requested} simulation draws but the model produced {produced}")]
    WrongDrawCount { requested: usize, produced: usize },

    #[error("simulation draw {row} has {len} values, expected {expected}")]
    RaggedDraws {
        row: usize,
        len: usize,
        expected: usize,
    },

    #[error("estimated variance {value} is not usable for simulation")]
    BadVariance { value: f64 },
}

/// The opaque fitted model the engine works against.
///
/// Implementations own their data and parameter estimates. `rebuild`
/// constructs a sibling bound to new endog/exog while keeping the structure
/// and the estimates from this fit intact; the returned model is a container
/// for simulation, not a re-estimated fit.
pub trait StructuralModel: fmt::Debug + Send + Sync {
    /// Full structural configuration of this model.
    fn spec(&self) -> ModelSpec;

    /// Number of observations the model is bound to.
    fn nobs(&self) -> usize;

    /// One-step-ahead in-sample predictions from the fit.
    fn fitted_values(&self) -> Result<Vec<f64>, ModelError>;

    /// Draw `n_draws` independent simulated response paths over this model's
    /// own data horizon, conditioned on its exog and parameter estimates.
    /// Draw-level randomness is derived from `seed` so results are
    /// reproducible.
    fn simulate(&self, n_draws: usize, seed: u64) -> Result<SimulationEnsemble, ModelError>;

    /// Construct a model with the given structure bound to new data, sharing
    /// this model's parameter estimates.
    fn rebuild(
        &self,
        definition: &ModelDefinition,
        endog: &[f64],
        exog: Option<&[Vec<f64>]>,
    ) -> Result<Box<dyn StructuralModel>, ModelError>;
}
