//! Inference and summary tables.
//!
//! The inference table replaces a labeled dataframe with an explicit
//! struct-of-arrays: a closed column set indexed by every time point in
//! pre ∪ post. Cumulative columns are only defined over the post period;
//! their pre-period cells hold NaN (cumulative effect is meaningless before
//! the intervention).

use std::ops::Range;

use serde::{Deserialize, Serialize};

use crate::error::ImpactError;
use crate::series::TimePoint;

/// The closed set of inference-table columns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Column {
    Preds,
    PredsLower,
    PredsUpper,
    PointEffects,
    PointEffectsLower,
    PointEffectsUpper,
    PostCumY,
    PostCumPred,
    PostCumPredLower,
    PostCumPredUpper,
    PostCumEffects,
    PostCumEffectsLower,
    PostCumEffectsUpper,
}

impl Column {
    pub const ALL: [Column; 13] = [
        Column::Preds,
        Column::PredsLower,
        Column::PredsUpper,
        Column::PointEffects,
        Column::PointEffectsLower,
        Column::PointEffectsUpper,
        Column::PostCumY,
        Column::PostCumPred,
        Column::PostCumPredLower,
        Column::PostCumPredUpper,
        Column::PostCumEffects,
        Column::PostCumEffectsLower,
        Column::PostCumEffectsUpper,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Column::Preds => "preds",
            Column::PredsLower => "preds_lower",
            Column::PredsUpper => "preds_upper",
            Column::PointEffects => "point_effects",
            Column::PointEffectsLower => "point_effects_lower",
            Column::PointEffectsUpper => "point_effects_upper",
            Column::PostCumY => "post_cum_y",
            Column::PostCumPred => "post_cum_pred",
            Column::PostCumPredLower => "post_cum_pred_lower",
            Column::PostCumPredUpper => "post_cum_pred_upper",
            Column::PostCumEffects => "post_cum_effects",
            Column::PostCumEffectsLower => "post_cum_effects_lower",
            Column::PostCumEffectsUpper => "post_cum_effects_upper",
        }
    }

    pub fn parse(name: &str) -> Option<Column> {
        Column::ALL.iter().copied().find(|c| c.as_str() == name)
    }
}

/// NaN cells (undefined pre-period cumulative values) serialize as `null`
/// so the table survives a JSON round-trip.
mod nan_as_null {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    pub fn serialize<S: Serializer>(values: &[f64], serializer: S) -> Result<S::Ok, S::Error> {
        let cells: Vec<Option<f64>> = values
            .iter()
            .map(|v| if v.is_nan() { None } else { Some(*v) })
            .collect();
        cells.serialize(serializer)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<f64>, D::Error> {
        let cells = Vec::<Option<f64>>::deserialize(deserializer)?;
        Ok(cells
            .into_iter()
            .map(|cell| cell.unwrap_or(f64::NAN))
            .collect())
    }
}

/// Column data for [`InferenceTable::new`], one vector per column.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TableColumns {
    #[serde(with = "nan_as_null")]
    pub preds: Vec<f64>,
    #[serde(with = "nan_as_null")]
    pub preds_lower: Vec<f64>,
    #[serde(with = "nan_as_null")]
    pub preds_upper: Vec<f64>,
    #[serde(with = "nan_as_null")]
    pub point_effects: Vec<f64>,
    #[serde(with = "nan_as_null")]
    pub point_effects_lower: Vec<f64>,
    #[serde(with = "nan_as_null")]
    pub point_effects_upper: Vec<f64>,
    #[serde(with = "nan_as_null")]
    pub post_cum_y: Vec<f64>,
    #[serde(with = "nan_as_null")]
    pub post_cum_pred: Vec<f64>,
    #[serde(with = "nan_as_null")]
    pub post_cum_pred_lower: Vec<f64>,
    #[serde(with = "nan_as_null")]
    pub post_cum_pred_upper: Vec<f64>,
    #[serde(with = "nan_as_null")]
    pub post_cum_effects: Vec<f64>,
    #[serde(with = "nan_as_null")]
    pub post_cum_effects_lower: Vec<f64>,
    #[serde(with = "nan_as_null")]
    pub post_cum_effects_upper: Vec<f64>,
}

/// Per-timestep inference results over pre ∪ post. Read-only once built.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InferenceTable {
    index: Vec<TimePoint>,
    columns: TableColumns,
}

impl InferenceTable {
    /// Validates that the table is non-empty and every column matches the
    /// index length.
    pub fn new(index: Vec<TimePoint>, columns: TableColumns) -> Result<Self, ImpactError> {
        let table = Self { index, columns };
        table.validate()?;
        Ok(table)
    }

    pub fn validate(&self) -> Result<(), ImpactError> {
        if self.index.is_empty() {
            return Err(ImpactError::MalformedTable);
        }
        let expected = self.index.len();
        if Column::ALL.iter().any(|c| self.column(*c).len() != expected) {
            return Err(ImpactError::MalformedTable);
        }
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    pub fn index(&self) -> &[TimePoint] {
        &self.index
    }

    pub fn column(&self, column: Column) -> &[f64] {
        match column {
            Column::Preds => &self.columns.preds,
            Column::PredsLower => &self.columns.preds_lower,
            Column::PredsUpper => &self.columns.preds_upper,
            Column::PointEffects => &self.columns.point_effects,
            Column::PointEffectsLower => &self.columns.point_effects_lower,
            Column::PointEffectsUpper => &self.columns.point_effects_upper,
            Column::PostCumY => &self.columns.post_cum_y,
            Column::PostCumPred => &self.columns.post_cum_pred,
            Column::PostCumPredLower => &self.columns.post_cum_pred_lower,
            Column::PostCumPredUpper => &self.columns.post_cum_pred_upper,
            Column::PostCumEffects => &self.columns.post_cum_effects,
            Column::PostCumEffectsLower => &self.columns.post_cum_effects_lower,
            Column::PostCumEffectsUpper => &self.columns.post_cum_effects_upper,
        }
    }

    pub fn column_by_name(&self, name: &str) -> Option<&[f64]> {
        Column::parse(name).map(|c| self.column(c))
    }
}

/// One summary column: post-period aggregates of actual, predicted, and
/// effect values with their credible bounds.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EffectStats {
    pub actual: f64,
    pub predicted: f64,
    pub predicted_lower: f64,
    pub predicted_upper: f64,
    pub abs_effect: f64,
    pub abs_effect_lower: f64,
    pub abs_effect_upper: f64,
    pub rel_effect: f64,
    pub rel_effect_lower: f64,
    pub rel_effect_upper: f64,
}

/// Average and cumulative post-period summaries, derived once from the
/// inference table.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SummaryTable {
    pub average: EffectStats,
    pub cumulative: EffectStats,
}

impl SummaryTable {
    pub const ROWS: [&'static str; 10] = [
        "actual",
        "predicted",
        "predicted_lower",
        "predicted_upper",
        "abs_effect",
        "abs_effect_lower",
        "abs_effect_upper",
        "rel_effect",
        "rel_effect_lower",
        "rel_effect_upper",
    ];

    /// Derive the summary from the inference table, the post-period rows of
    /// the table, and the observed post-period response.
    ///
    /// Average bounds are means of the pointwise bounds; cumulative bounds
    /// are the final simulation-based cumulative bounds, so they are never
    /// naive sums of the pointwise bounds.
    pub fn from_inferences(
        table: &InferenceTable,
        post: Range<usize>,
        post_actual: &[f64],
    ) -> Result<Self, ImpactError> {
        if post.start >= post.end || post.end > table.len() {
            return Err(ImpactError::MalformedTable);
        }
        if post_actual.len() != post.end - post.start {
            return Err(ImpactError::ColumnLengthMismatch {
                name: "post_actual".into(),
                len: post_actual.len(),
                expected: post.end - post.start,
            });
        }

        let mean = |values: &[f64]| values.iter().sum::<f64>() / values.len() as f64;
        let post_slice = |column: Column| &table.column(column)[post.clone()];

        let preds = post_slice(Column::Preds);
        let preds_lower = post_slice(Column::PredsLower);
        let preds_upper = post_slice(Column::PredsUpper);
        let last = post.end - post.start - 1;

        let actual_avg = mean(post_actual);
        let predicted_avg = mean(preds);
        let predicted_avg_lower = mean(preds_lower);
        let predicted_avg_upper = mean(preds_upper);

        let actual_sum: f64 = post_actual.iter().sum();
        let predicted_sum: f64 = preds.iter().sum();
        let predicted_sum_lower = post_slice(Column::PostCumPredLower)[last];
        let predicted_sum_upper = post_slice(Column::PostCumPredUpper)[last];

        let average = effect_stats(
            actual_avg,
            predicted_avg,
            predicted_avg_lower,
            predicted_avg_upper,
        );
        let cumulative = effect_stats(
            actual_sum,
            predicted_sum,
            predicted_sum_lower,
            predicted_sum_upper,
        );
        Ok(Self {
            average,
            cumulative,
        })
    }

    /// `(average, cumulative)` for a named row.
    pub fn row(&self, name: &str) -> Option<(f64, f64)> {
        let pick = |stats: &EffectStats| match name {
            "actual" => Some(stats.actual),
            "predicted" => Some(stats.predicted),
            "predicted_lower" => Some(stats.predicted_lower),
            "predicted_upper" => Some(stats.predicted_upper),
            "abs_effect" => Some(stats.abs_effect),
            "abs_effect_lower" => Some(stats.abs_effect_lower),
            "abs_effect_upper" => Some(stats.abs_effect_upper),
            "rel_effect" => Some(stats.rel_effect),
            "rel_effect_lower" => Some(stats.rel_effect_lower),
            "rel_effect_upper" => Some(stats.rel_effect_upper),
            _ => None,
        };
        Some((pick(&self.average)?, pick(&self.cumulative)?))
    }
}

/// Effect = actual − prediction, so the effect bounds pair with the opposite
/// prediction bound.
fn effect_stats(actual: f64, predicted: f64, predicted_lower: f64, predicted_upper: f64) -> EffectStats {
    let abs_effect = actual - predicted;
    let abs_effect_lower = actual - predicted_upper;
    let abs_effect_upper = actual - predicted_lower;
    EffectStats {
        actual,
        predicted,
        predicted_lower,
        predicted_upper,
        abs_effect,
        abs_effect_lower,
        abs_effect_upper,
        rel_effect: abs_effect / predicted,
        rel_effect_lower: abs_effect_lower / predicted,
        rel_effect_upper: abs_effect_upper / predicted,
    }
}
