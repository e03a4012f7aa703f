//! End-to-end analysis on seeded synthetic series.
//!
//! The response tracks an AR(1)-driven covariate with a bounded wobble on
//! top; a step of known sign is injected at the intervention point. The
//! counterfactual should flag the injected steps as significant and stay
//! quiet when no step is present.

use causalimpact_core::{
    AnalysisData, CausalImpact, Column, Covariate, ErrorKind, FigureConfig, ImpactConfig,
    OutputFormat, Period,
};
use rand::rngs::StdRng;
use rand::SeedableRng;
use rand_distr::{Distribution, Normal};

const PRE_END: usize = 69;
const POST_START: usize = 70;
const N: usize = 100;

/// Covariate: AR(1) around 100 (seeded). Response: 1.2 × covariate plus a
/// small deterministic wobble, with `step` added from the intervention on.
fn synthetic(seed: u64, step: f64) -> AnalysisData {
    let mut rng = StdRng::seed_from_u64(seed);
    let shock = Normal::new(0.0, 1.0).unwrap();
    let mut carry = 0.0;
    let mut x = Vec::with_capacity(N);
    for _ in 0..N {
        carry = 0.9 * carry + shock.sample(&mut rng);
        x.push(100.0 + carry);
    }
    let y: Vec<f64> = x
        .iter()
        .enumerate()
        .map(|(t, v)| {
            let wobble = 0.3 * (t as f64 * 2.1).sin();
            let shift = if t >= POST_START { step } else { 0.0 };
            1.2 * v + wobble + shift
        })
        .collect();
    AnalysisData::from_steps(
        y,
        vec![Covariate {
            name: "x".into(),
            values: x,
        }],
    )
    .unwrap()
}

fn run(data: AnalysisData, standardize: bool) -> CausalImpact {
    CausalImpact::run(
        data,
        Period::steps(0, PRE_END as i64).unwrap(),
        Period::steps(POST_START as i64, (N - 1) as i64).unwrap(),
        ImpactConfig {
            n_simulations: 1000,
            standardize,
            ..ImpactConfig::default()
        },
    )
    .unwrap()
}

#[test]
fn positive_step_is_significant() {
    let ci = run(synthetic(1, 1.0), true);
    assert!(ci.p_value().unwrap() < 0.05, "p = {}", ci.p_value().unwrap());
    assert!(ci.summary_data().unwrap().average.abs_effect > 0.0);
}

#[test]
fn positive_step_without_standardization() {
    let ci = run(synthetic(1, 1.0), false);
    assert!(ci.p_value().unwrap() < 0.05);
}

#[test]
fn negative_step_is_significant() {
    let ci = run(synthetic(1, -1.0), true);
    assert!(ci.p_value().unwrap() < 0.05);
    assert!(ci.summary_data().unwrap().average.abs_effect < 0.0);
}

#[test]
fn negative_step_without_standardization() {
    let ci = run(synthetic(1, -1.0), false);
    assert!(ci.p_value().unwrap() < 0.05);
}

#[test]
fn no_step_is_not_significant() {
    let ci = run(synthetic(1, 0.0), true);
    assert!(ci.p_value().unwrap() > 0.05, "p = {}", ci.p_value().unwrap());
}

#[test]
fn ensemble_has_simulations_by_post_length_shape() {
    let ci = run(synthetic(1, 0.0), true);
    assert_eq!(ci.simulations().unwrap().shape(), (1000, N - POST_START));
}

#[test]
fn default_alpha_gives_central_95_percent_band() {
    let ci = run(synthetic(1, 0.0), true);
    assert_eq!(ci.lower_upper_percentile().unwrap(), (2.5, 97.5));
}

#[test]
fn predictions_recover_counterfactual_level() {
    // with no step, post predictions should sit near the observed values
    let ci = run(synthetic(1, 0.0), true);
    let table = ci.inferences().unwrap();
    let preds = &table.column(Column::Preds)[POST_START..];
    let actual = &ci.data().y()[POST_START..];
    for (p, a) in preds.iter().zip(actual) {
        assert!((p - a).abs() < 2.0, "pred {p} far from actual {a}");
    }
}

#[test]
fn final_cumulative_effect_equals_point_effect_sum() {
    let ci = run(synthetic(3, 1.0), true);
    let table = ci.inferences().unwrap();
    let point_sum: f64 = table.column(Column::PointEffects)[POST_START..].iter().sum();
    let last_cum = *table
        .column(Column::PostCumEffects)
        .last()
        .expect("non-empty table");
    assert!(
        (point_sum - last_cum).abs() < 1e-8,
        "sum {point_sum} vs cumulative {last_cum}"
    );
}

#[test]
fn pre_period_cumulative_cells_are_undefined() {
    let ci = run(synthetic(1, 1.0), true);
    let table = ci.inferences().unwrap();
    for column in [
        Column::PostCumY,
        Column::PostCumPred,
        Column::PostCumEffects,
        Column::PostCumEffectsLower,
        Column::PostCumEffectsUpper,
    ] {
        assert!(table.column(column)[..POST_START].iter().all(|v| v.is_nan()));
        assert!(table.column(column)[POST_START..].iter().all(|v| !v.is_nan()));
    }
}

#[test]
fn cumulative_bounds_are_not_naive_sums_of_pointwise_bounds() {
    let ci = run(synthetic(1, 0.0), true);
    let table = ci.inferences().unwrap();
    let naive_lower: f64 = table.column(Column::PredsLower)[POST_START..].iter().sum();
    let simulated_lower = *table
        .column(Column::PostCumPredLower)
        .last()
        .expect("non-empty table");
    // summing pointwise lower bounds piles up the per-step tail; the
    // simulation-based cumulative bound must be well inside it
    assert!(
        simulated_lower - naive_lower > 1.0,
        "naive {naive_lower} vs simulated {simulated_lower}"
    );
}

#[test]
fn pre_period_band_collapses_onto_fitted_values() {
    let ci = run(synthetic(1, 1.0), true);
    let table = ci.inferences().unwrap();
    let preds = &table.column(Column::Preds)[..POST_START];
    let lower = &table.column(Column::PredsLower)[..POST_START];
    let upper = &table.column(Column::PredsUpper)[..POST_START];
    assert_eq!(preds, lower);
    assert_eq!(preds, upper);
}

#[test]
fn works_without_covariates() {
    // level-only model: flat series with a large step
    let y: Vec<f64> = (0..60)
        .map(|t| {
            let wobble = 0.2 * (t as f64 * 1.3).sin();
            if t >= 40 { 30.0 + wobble } else { 20.0 + wobble }
        })
        .collect();
    let data = AnalysisData::from_steps(y, vec![]).unwrap();
    let ci = CausalImpact::run(
        data,
        Period::steps(0, 39).unwrap(),
        Period::steps(40, 59).unwrap(),
        ImpactConfig {
            n_simulations: 500,
            ..ImpactConfig::default()
        },
    )
    .unwrap();
    assert!(ci.p_value().unwrap() < 0.05);
}

#[test]
fn report_mentions_significance_for_injected_step() {
    let ci = run(synthetic(1, 1.0), true);
    let report = ci.summary(OutputFormat::Report, 2).unwrap();
    assert!(report.contains("an increase"));
    assert!(report.contains("statistically significant"));
}

#[test]
fn figure_spec_spans_requested_panels() {
    let ci = run(synthetic(1, 1.0), true);
    let figure = ci.plot(&FigureConfig::default()).unwrap();
    assert_eq!(figure.panels.len(), 3);
    // the pointwise panel band always exists
    assert!(figure.panels[1].band.is_some());
}

#[test]
fn unknown_panel_name_rejected_with_full_enumeration() {
    let err = "test".parse::<causalimpact_core::Panel>().unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidInput);
    assert_eq!(
        err.to_string(),
        "\"test\" is not a valid panel. Valid panels are: \
         \"original\", \"pointwise\", \"cumulative\"."
    );
}

#[test]
fn same_seed_reproduces_results_exactly() {
    let a = run(synthetic(1, 1.0), true);
    let b = run(synthetic(1, 1.0), true);
    assert_eq!(a.p_value().unwrap(), b.p_value().unwrap());
    // NaN cells rule out whole-table equality; compare the defined columns
    for column in [Column::Preds, Column::PredsLower, Column::PredsUpper] {
        assert_eq!(
            a.inferences().unwrap().column(column),
            b.inferences().unwrap().column(column)
        );
    }
}
