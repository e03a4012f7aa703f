//! Rebuilds a fitted model around new data.
//!
//! The post-period simulation model must share the pre-period fit's exact
//! structure. The one non-trivial translation is the cycle bounds: fitted
//! models report *frequency* bounds in radians, while a fresh model is
//! specified with *period* bounds. `period = 2π / frequency`, and a zero
//! lower frequency bound maps to an unbounded upper period.

use std::f64::consts::PI;

use crate::model::{ModelDefinition, ModelError, ModelSpec, StructuralModel};

/// Convert `(lower, upper)` frequency bounds (radians) to period bounds.
pub fn cycle_period_bounds(frequency_bounds: (f64, f64)) -> Result<(f64, f64), ModelError> {
    let (lower_freq, upper_freq) = frequency_bounds;
    if !(lower_freq >= 0.0 && upper_freq > 0.0 && lower_freq <= upper_freq) {
        return Err(ModelError::BadCycleBounds {
            lower: lower_freq,
            upper: upper_freq,
        });
    }
    let lower_period = 2.0 * PI / upper_freq;
    let upper_period = if lower_freq > 0.0 {
        2.0 * PI / lower_freq
    } else {
        f64::INFINITY
    };
    Ok((lower_period, upper_period))
}

/// Translate a fitted model's spec into the definition a fresh model is
/// constructed from.
pub fn definition_from_spec(spec: &ModelSpec) -> Result<ModelDefinition, ModelError> {
    let cycle_period_bounds = match spec.cycle_frequency_bounds {
        Some(bounds) => Some(cycle_period_bounds(bounds)?),
        None => None,
    };
    Ok(ModelDefinition {
        level: spec.level,
        trend: spec.trend,
        seasonal: spec.seasonal,
        freq_seasonal: spec.freq_seasonal.clone(),
        cycle: spec.cycle,
        damped_cycle: spec.damped_cycle,
        ar_order: spec.ar_order,
        irregular: spec.irregular,
        stochastic_level: spec.stochastic_level,
        stochastic_trend: spec.stochastic_trend,
        stochastic_seasonal: spec.stochastic_seasonal,
        stochastic_freq_seasonal: spec.stochastic_freq_seasonal.clone(),
        stochastic_cycle: spec.stochastic_cycle,
        cycle_period_bounds,
    })
}

/// Build a simulation model bound to `endog`/`exog` with the reference
/// model's structure and parameter estimates. The reference is never mutated.
pub fn rebuild_model(
    reference: &dyn StructuralModel,
    endog: &[f64],
    exog: Option<&[Vec<f64>]>,
) -> Result<Box<dyn StructuralModel>, ModelError> {
    let definition = definition_from_spec(&reference.spec())?;
    reference.rebuild(&definition, endog, exog)
}
