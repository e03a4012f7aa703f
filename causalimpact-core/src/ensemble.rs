//! The posterior simulation ensemble.
//!
//! One row per stochastic draw of the counterfactual response over the post
//! period, immutable once produced. Aggregations here are the only way the
//! engine reads the draws: per-timestep means and percentiles for the
//! prediction bands, per-row cumulative sums for the cumulative bands, and
//! row totals for the tail-area p-value.

use crate::model::ModelError;

/// `(n_draws × horizon)` matrix of simulated response paths, row-major.
#[derive(Debug, Clone, PartialEq)]
pub struct SimulationEnsemble {
    n_draws: usize,
    horizon: usize,
    values: Vec<f64>,
}

impl SimulationEnsemble {
    /// Build from per-draw rows; rows must be non-empty and equal length.
    pub fn from_rows(rows: Vec<Vec<f64>>) -> Result<Self, ModelError> {
        let first = rows.first().ok_or(ModelError::NoDraws)?;
        let horizon = first.len();
        let n_draws = rows.len();
        let mut values = Vec::with_capacity(n_draws * horizon);
        for (row_idx, row) in rows.iter().enumerate() {
            if row.len() != horizon {
                return Err(ModelError::RaggedDraws {
                    row: row_idx,
                    len: row.len(),
                    expected: horizon,
                });
            }
            values.extend_from_slice(row);
        }
        Ok(Self {
            n_draws,
            horizon,
            values,
        })
    }

    pub fn n_draws(&self) -> usize {
        self.n_draws
    }

    pub fn horizon(&self) -> usize {
        self.horizon
    }

    /// `(n_draws, horizon)`.
    pub fn shape(&self) -> (usize, usize) {
        (self.n_draws, self.horizon)
    }

    pub fn row(&self, draw: usize) -> &[f64] {
        &self.values[draw * self.horizon..(draw + 1) * self.horizon]
    }

    pub fn rows(&self) -> impl Iterator<Item = &[f64]> {
        self.values.chunks_exact(self.horizon)
    }

    /// Consume and transform every value; used to map a model-scale ensemble
    /// back to the original scale before it is stored.
    pub fn map_values(self, f: impl Fn(f64) -> f64) -> Self {
        Self {
            n_draws: self.n_draws,
            horizon: self.horizon,
            values: self.values.into_iter().map(f).collect(),
        }
    }

    /// Mean across draws at each timestep.
    pub fn column_means(&self) -> Vec<f64> {
        let mut means = vec![0.0; self.horizon];
        for row in self.rows() {
            for (acc, v) in means.iter_mut().zip(row) {
                *acc += v;
            }
        }
        let n = self.n_draws as f64;
        for acc in &mut means {
            *acc /= n;
        }
        means
    }

    /// Percentile across draws at each timestep, linear interpolation.
    pub fn column_percentiles(&self, pct: f64) -> Vec<f64> {
        (0..self.horizon)
            .map(|t| {
                let mut column: Vec<f64> = self.rows().map(|row| row[t]).collect();
                column.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
                percentile_sorted(&column, pct)
            })
            .collect()
    }

    /// A new ensemble whose rows are the running sums of this one's rows.
    pub fn cumulative_rows(&self) -> Self {
        let mut values = Vec::with_capacity(self.values.len());
        for row in self.rows() {
            let mut acc = 0.0;
            for v in row {
                acc += v;
                values.push(acc);
            }
        }
        Self {
            n_draws: self.n_draws,
            horizon: self.horizon,
            values,
        }
    }

    /// Total simulated response per draw.
    pub fn row_sums(&self) -> Vec<f64> {
        self.rows().map(|row| row.iter().sum()).collect()
    }
}

/// Percentile of a sorted slice using linear interpolation.
pub(crate) fn percentile_sorted(sorted: &[f64], p: f64) -> f64 {
    let n = sorted.len();
    if n == 0 {
        return 0.0;
    }
    if n == 1 {
        return sorted[0];
    }
    let rank = (p / 100.0) * (n - 1) as f64;
    let lo = rank.floor() as usize;
    let hi = (lo + 1).min(n - 1);
    let frac = rank - lo as f64;
    sorted[lo] * (1.0 - frac) + sorted[hi] * frac
}
