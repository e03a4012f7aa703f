//! Time-indexed input data: time points, periods, and the observed series.

use std::fmt;
use std::ops::Range;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::error::ImpactError;

/// A single position in a series index: an integer step or a calendar date.
///
/// A given index uses exactly one of the two kinds; mixing them is rejected
/// at construction time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum TimePoint {
    Step(i64),
    Date(NaiveDate),
}

impl TimePoint {
    pub fn same_kind(&self, other: &TimePoint) -> bool {
        matches!(
            (self, other),
            (TimePoint::Step(_), TimePoint::Step(_)) | (TimePoint::Date(_), TimePoint::Date(_))
        )
    }
}

impl fmt::Display for TimePoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TimePoint::Step(step) => write!(f, "{step}"),
            TimePoint::Date(date) => write!(f, "{date}"),
        }
    }
}

/// Closed range of time points delimiting the pre- or post-intervention window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Period {
    pub start: TimePoint,
    pub end: TimePoint,
}

impl Period {
    pub fn new(start: TimePoint, end: TimePoint) -> Result<Self, ImpactError> {
        if !start.same_kind(&end) {
            return Err(ImpactError::MixedIndexKinds);
        }
        if start > end {
            return Err(ImpactError::InvertedPeriod {
                start: start.to_string(),
                end: end.to_string(),
            });
        }
        Ok(Self { start, end })
    }

    pub fn steps(start: i64, end: i64) -> Result<Self, ImpactError> {
        Self::new(TimePoint::Step(start), TimePoint::Step(end))
    }

    pub fn dates(start: NaiveDate, end: NaiveDate) -> Result<Self, ImpactError> {
        Self::new(TimePoint::Date(start), TimePoint::Date(end))
    }
}

/// A named control series aligned with the response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Covariate {
    pub name: String,
    pub values: Vec<f64>,
}

/// The observed input: a shared index, the response `y`, and zero or more
/// covariate columns. Immutable for the duration of a run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisData {
    index: Vec<TimePoint>,
    y: Vec<f64>,
    covariates: Vec<Covariate>,
}

impl AnalysisData {
    /// Validates index monotonicity, kind consistency, and column lengths.
    pub fn new(
        index: Vec<TimePoint>,
        y: Vec<f64>,
        covariates: Vec<Covariate>,
    ) -> Result<Self, ImpactError> {
        if y.len() != index.len() {
            return Err(ImpactError::ColumnLengthMismatch {
                name: "y".into(),
                len: y.len(),
                expected: index.len(),
            });
        }
        for covariate in &covariates {
            if covariate.values.len() != index.len() {
                return Err(ImpactError::ColumnLengthMismatch {
                    name: covariate.name.clone(),
                    len: covariate.values.len(),
                    expected: index.len(),
                });
            }
        }
        if let Some(first) = index.first() {
            if index.iter().any(|point| !point.same_kind(first)) {
                return Err(ImpactError::MixedIndexKinds);
            }
        }
        for (position, pair) in index.windows(2).enumerate() {
            if pair[0] >= pair[1] {
                return Err(ImpactError::NonIncreasingIndex {
                    position: position + 1,
                });
            }
        }
        Ok(Self {
            index,
            y,
            covariates,
        })
    }

    /// Builds step-indexed data counting from zero.
    pub fn from_steps(y: Vec<f64>, covariates: Vec<Covariate>) -> Result<Self, ImpactError> {
        let index = (0..y.len() as i64).map(TimePoint::Step).collect();
        Self::new(index, y, covariates)
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

    pub fn y(&self) -> &[f64] {
        &self.y
    }

    pub fn covariates(&self) -> &[Covariate] {
        &self.covariates
    }

    /// Position of `point` in the index, if present.
    pub fn position_of(&self, point: &TimePoint) -> Option<usize> {
        self.index.binary_search(point).ok()
    }

    /// Resolve a period to a half-open index range.
    pub fn resolve_period(&self, period: &Period) -> Result<Range<usize>, ImpactError> {
        let start = self
            .position_of(&period.start)
            .ok_or_else(|| ImpactError::PointNotInIndex {
                point: period.start.to_string(),
            })?;
        let end = self
            .position_of(&period.end)
            .ok_or_else(|| ImpactError::PointNotInIndex {
                point: period.end.to_string(),
            })?;
        Ok(start..end + 1)
    }

    /// Resolve both periods and check they do not overlap.
    pub fn resolve_periods(
        &self,
        pre: &Period,
        post: &Period,
    ) -> Result<(Range<usize>, Range<usize>), ImpactError> {
        let pre_range = self.resolve_period(pre)?;
        let post_range = self.resolve_period(post)?;
        if pre_range.end > post_range.start {
            return Err(ImpactError::OverlappingPeriods);
        }
        Ok((pre_range, post_range))
    }

    /// Covariate values restricted to `range`, one inner vector per column.
    /// `None` when there are no covariates.
    pub fn covariate_slice(&self, range: &Range<usize>) -> Option<Vec<Vec<f64>>> {
        if self.covariates.is_empty() {
            return None;
        }
        Some(
            self.covariates
                .iter()
                .map(|covariate| covariate.values[range.clone()].to_vec())
                .collect(),
        )
    }
}
