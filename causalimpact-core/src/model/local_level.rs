//! Reference structural model: stochastic level + static regression.
//!
//! The default pipeline needs a concrete fitted model without dragging in a
//! general state-space estimator. This one is deliberately small:
//!
//! - regression coefficients come from ordinary least squares (intercept
//!   absorbed into the initial level),
//! - the two variances come from moments of the differenced regression
//!   residuals: `Var(Δr) = 2σ²_obs + σ²_level` and
//!   `Cov(Δr_t, Δr_{t+1}) = -σ²_obs`,
//! - one-step-ahead fitted values use the steady-state filter gain for the
//!   local-level model,
//! - simulation walks the level forward from the last filtered estimate
//!   with Gaussian innovations and adds regression and observation noise.
//!
//! Draw-level seeds are derived with BLAKE3 from the run seed and the draw
//! index, so parallel and serial simulation produce identical ensembles.

use rand::rngs::StdRng;
use rand::SeedableRng;
use rand_distr::{Distribution, Normal};
use rayon::prelude::*;

use crate::ensemble::SimulationEnsemble;
use crate::model::{ModelDefinition, ModelError, ModelSpec, StructuralModel};

/// Lower bound applied to both estimated variances.
const VARIANCE_FLOOR: f64 = 1e-12;

#[derive(Debug, Clone, PartialEq)]
struct FittedParams {
    /// Regression slope per covariate column.
    beta: Vec<f64>,
    obs_var: f64,
    level_var: f64,
    /// Steady-state filter gain.
    gain: f64,
    /// Filtered level after the last in-sample observation.
    last_level: f64,
    /// One-step-ahead in-sample predictions.
    fitted: Vec<f64>,
}

/// Local-level model with optional static regression on covariates.
#[derive(Debug, Clone)]
pub struct LocalLevelModel {
    endog: Vec<f64>,
    exog: Option<Vec<Vec<f64>>>,
    params: Option<FittedParams>,
}

impl LocalLevelModel {
    /// Bind data without fitting. Covariate columns must match `endog`.
    pub fn new(endog: Vec<f64>, exog: Option<Vec<Vec<f64>>>) -> Result<Self, ModelError> {
        if endog.is_empty() {
            return Err(ModelError::TooShort {
                required: 1,
                actual: 0,
            });
        }
        if let Some(columns) = &exog {
            for column in columns {
                if column.len() != endog.len() {
                    return Err(ModelError::DimensionMismatch {
                        endog: endog.len(),
                        exog: column.len(),
                    });
                }
            }
        }
        Ok(Self {
            endog,
            exog,
            params: None,
        })
    }

    /// Convenience: bind and fit in one step.
    pub fn fitted(endog: Vec<f64>, exog: Option<Vec<Vec<f64>>>) -> Result<Self, ModelError> {
        let mut model = Self::new(endog, exog)?;
        model.fit()?;
        Ok(model)
    }

    pub fn is_fitted(&self) -> bool {
        self.params.is_some()
    }

    /// Estimate regression coefficients, variances, gain, and fitted values.
    pub fn fit(&mut self) -> Result<(), ModelError> {
        let n = self.endog.len();
        if n < 3 {
            return Err(ModelError::TooShort {
                required: 3,
                actual: n,
            });
        }

        let k = self.exog.as_ref().map_or(0, Vec::len);
        let coefficients = self.ols_with_intercept(k)?;
        let level0 = coefficients[0];
        let beta = coefficients[1..].to_vec();

        // Residuals keep the level path: r_t = y_t - x_t'β
        let residuals: Vec<f64> = (0..n)
            .map(|t| self.endog[t] - self.regression_part(&beta, t))
            .collect();

        let diffs: Vec<f64> = residuals.windows(2).map(|w| w[1] - w[0]).collect();
        let (obs_var, level_var) = moment_variances(&diffs);

        let q = level_var / obs_var;
        let p = (q + (q * q + 4.0 * q).sqrt()) / 2.0;
        let gain = p / (p + 1.0);

        // One-step-ahead predictions: OLS prior at t = 0, filtered afterwards.
        let mut level = level0;
        let mut fitted = Vec::with_capacity(n);
        for t in 0..n {
            fitted.push(level + self.regression_part(&beta, t));
            level += gain * (residuals[t] - level);
        }

        self.params = Some(FittedParams {
            beta,
            obs_var,
            level_var,
            gain,
            last_level: level,
            fitted,
        });
        Ok(())
    }

    /// Steady-state filter gain, exposed for diagnostics.
    pub fn gain(&self) -> Result<f64, ModelError> {
        self.params
            .as_ref()
            .map(|p| p.gain)
            .ok_or(ModelError::NotFitted)
    }

    fn regression_part(&self, beta: &[f64], t: usize) -> f64 {
        match &self.exog {
            Some(columns) => columns
                .iter()
                .zip(beta)
                .map(|(column, coefficient)| column[t] * coefficient)
                .sum(),
            None => 0.0,
        }
    }

    /// OLS of `endog` on `[1, exog...]` via the normal equations.
    fn ols_with_intercept(&self, k: usize) -> Result<Vec<f64>, ModelError> {
        let n = self.endog.len();
        let dim = k + 1;
        let mut xtx = vec![vec![0.0; dim]; dim];
        let mut xty = vec![0.0; dim];
        let mut row = vec![0.0; dim];
        for t in 0..n {
            row[0] = 1.0;
            if let Some(columns) = &self.exog {
                for (slot, column) in row[1..].iter_mut().zip(columns) {
                    *slot = column[t];
                }
            }
            for i in 0..dim {
                xty[i] += row[i] * self.endog[t];
                for j in 0..dim {
                    xtx[i][j] += row[i] * row[j];
                }
            }
        }
        solve(xtx, xty)
    }
}

/// Variance estimates from differenced residuals, floored to stay positive.
fn moment_variances(diffs: &[f64]) -> (f64, f64) {
    let m = diffs.len() as f64;
    let mean = diffs.iter().sum::<f64>() / m;
    let variance = diffs.iter().map(|d| (d - mean).powi(2)).sum::<f64>() / m;
    let autocov: f64 = diffs
        .windows(2)
        .map(|w| (w[0] - mean) * (w[1] - mean))
        .sum::<f64>()
        / (m - 1.0);
    let obs_var = (-autocov).max(VARIANCE_FLOOR);
    let level_var = (variance - 2.0 * obs_var).max(VARIANCE_FLOOR);
    (obs_var, level_var)
}

/// Gaussian elimination with partial pivoting on the normal equations.
fn solve(mut a: Vec<Vec<f64>>, mut b: Vec<f64>) -> Result<Vec<f64>, ModelError> {
    let dim = b.len();
    for col in 0..dim {
        let pivot_row = (col..dim)
            .max_by(|&i, &j| {
                a[i][col]
                    .abs()
                    .partial_cmp(&a[j][col].abs())
                    .unwrap_or(std::cmp::Ordering::Equal)
            })
            .ok_or(ModelError::SingularDesign)?;
        if a[pivot_row][col].abs() < 1e-12 {
            return Err(ModelError::SingularDesign);
        }
        a.swap(col, pivot_row);
        b.swap(col, pivot_row);
        for row in col + 1..dim {
            let factor = a[row][col] / a[col][col];
            for k in col..dim {
                a[row][k] -= factor * a[col][k];
            }
            b[row] -= factor * b[col];
        }
    }
    let mut x = vec![0.0; dim];
    for row in (0..dim).rev() {
        let trailing: f64 = (row + 1..dim).map(|k| a[row][k] * x[k]).sum();
        x[row] = (b[row] - trailing) / a[row][row];
    }
    Ok(x)
}

/// Per-draw sub-seed, independent of draw scheduling order.
fn draw_seed(seed: u64, draw: usize) -> u64 {
    let mut hasher = blake3::Hasher::new();
    hasher.update(&seed.to_le_bytes());
    hasher.update(&(draw as u64).to_le_bytes());
    let hash = hasher.finalize();
    let mut bytes = [0u8; 8];
    bytes.copy_from_slice(&hash.as_bytes()[..8]);
    u64::from_le_bytes(bytes)
}

impl StructuralModel for LocalLevelModel {
    fn spec(&self) -> ModelSpec {
        ModelSpec::local_level()
    }

    fn nobs(&self) -> usize {
        self.endog.len()
    }

    fn fitted_values(&self) -> Result<Vec<f64>, ModelError> {
        self.params
            .as_ref()
            .map(|p| p.fitted.clone())
            .ok_or(ModelError::NotFitted)
    }

    fn simulate(&self, n_draws: usize, seed: u64) -> Result<SimulationEnsemble, ModelError> {
        let params = self.params.as_ref().ok_or(ModelError::NotFitted)?;
        if n_draws == 0 {
            return Err(ModelError::NoDraws);
        }
        let horizon = self.endog.len();
        let level_noise = Normal::new(0.0, params.level_var.sqrt()).map_err(|_| {
            ModelError::BadVariance {
                value: params.level_var,
            }
        })?;
        let obs_noise = Normal::new(0.0, params.obs_var.sqrt()).map_err(|_| {
            ModelError::BadVariance {
                value: params.obs_var,
            }
        })?;

        let rows: Vec<Vec<f64>> = (0..n_draws)
            .into_par_iter()
            .map(|draw| {
                let mut rng = StdRng::seed_from_u64(draw_seed(seed, draw));
                let mut level = params.last_level;
                let mut row = Vec::with_capacity(horizon);
                for t in 0..horizon {
                    level += level_noise.sample(&mut rng);
                    let value = level
                        + self.regression_part(&params.beta, t)
                        + obs_noise.sample(&mut rng);
                    row.push(value);
                }
                row
            })
            .collect();
        SimulationEnsemble::from_rows(rows)
    }

    fn rebuild(
        &self,
        definition: &ModelDefinition,
        endog: &[f64],
        exog: Option<&[Vec<f64>]>,
    ) -> Result<Box<dyn StructuralModel>, ModelError> {
        if definition.trend {
            return Err(ModelError::UnsupportedComponent { component: "trend" });
        }
        if definition.seasonal.is_some() {
            return Err(ModelError::UnsupportedComponent {
                component: "seasonal",
            });
        }
        if !definition.freq_seasonal.is_empty() {
            return Err(ModelError::UnsupportedComponent {
                component: "freq_seasonal",
            });
        }
        if definition.cycle {
            return Err(ModelError::UnsupportedComponent { component: "cycle" });
        }
        if definition.ar_order > 0 {
            return Err(ModelError::UnsupportedComponent {
                component: "autoregressive",
            });
        }
        let params = self.params.as_ref().ok_or(ModelError::NotFitted)?;
        let rebuilt_covariates = exog.map_or(0, <[Vec<f64>]>::len);
        if params.beta.len() != rebuilt_covariates {
            return Err(ModelError::CovariateCountMismatch {
                reference: params.beta.len(),
                rebuilt: rebuilt_covariates,
            });
        }
        let mut model = LocalLevelModel::new(endog.to_vec(), exog.map(<[Vec<f64>]>::to_vec))?;
        model.params = Some(params.clone());
        Ok(Box::new(model))
    }
}
