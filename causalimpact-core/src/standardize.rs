//! Column-wise standardization and its exact inverse.
//!
//! Moments use the population standard deviation (divisor `n`). Missing
//! values (NaN) are skipped when computing moments and pass through the
//! transform unchanged. A column with zero or undefined spread gets
//! `std = 1` so the transform never divides by zero, which also keeps the
//! round-trip exact for constant columns.

use serde::{Deserialize, Serialize};

use crate::error::ImpactError;

/// Mean and standard deviation used to (de-)normalize one column.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Moments {
    pub mean: f64,
    pub std: f64,
}

impl Moments {
    /// Identity transform.
    pub fn unit() -> Self {
        Self { mean: 0.0, std: 1.0 }
    }
}

/// NaN-skipping column moments; an all-NaN column yields the unit moments.
pub fn column_moments(values: &[f64]) -> Moments {
    let finite: Vec<f64> = values.iter().copied().filter(|v| !v.is_nan()).collect();
    if finite.is_empty() {
        return Moments::unit();
    }
    let n = finite.len() as f64;
    let mean = finite.iter().sum::<f64>() / n;
    let variance = finite.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;
    let std = variance.sqrt();
    let std = if std > 0.0 && std.is_finite() { std } else { 1.0 };
    Moments { mean, std }
}

/// Standardize every column to zero mean and unit variance.
///
/// Requires at least 2 rows: a single observation has no defined spread.
/// Returns the transformed columns together with the per-column moments
/// needed to invert the transform.
pub fn standardize(columns: &[Vec<f64>]) -> Result<(Vec<Vec<f64>>, Vec<Moments>), ImpactError> {
    let rows = columns.first().map_or(0, Vec::len);
    if rows < 2 {
        return Err(ImpactError::TooFewRows { rows });
    }
    for (position, column) in columns.iter().enumerate() {
        if column.len() != rows {
            return Err(ImpactError::ColumnLengthMismatch {
                name: format!("column {position}"),
                len: column.len(),
                expected: rows,
            });
        }
    }

    let moments: Vec<Moments> = columns.iter().map(|c| column_moments(c)).collect();
    let transformed = columns
        .iter()
        .zip(&moments)
        .map(|(column, m)| apply(column, *m))
        .collect();
    Ok((transformed, moments))
}

/// `(v - mean) / std` elementwise; NaN passes through.
pub fn apply(values: &[f64], moments: Moments) -> Vec<f64> {
    values
        .iter()
        .map(|v| (v - moments.mean) / moments.std)
        .collect()
}

/// Exact inverse of [`apply`]: `v * std + mean`.
pub fn unstandardize(values: &[f64], moments: Moments) -> Vec<f64> {
    values
        .iter()
        .map(|v| v * moments.std + moments.mean)
        .collect()
}
