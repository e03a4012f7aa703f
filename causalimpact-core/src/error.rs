//! Crate-wide error type and the three-kind taxonomy.
//!
//! Every failure is one of three kinds: a malformed argument
//! (`InvalidInput`), an operation invoked before its prerequisite state
//! (`InvalidState`), or a second write to a write-once result field
//! (`AttributeLocked`). Variants stay structured so messages carry the
//! offending values; `kind()` collapses them for callers that only care
//! about the class of failure.

use thiserror::Error;

use crate::model::ModelError;

/// Classification of an [`ImpactError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Malformed or out-of-domain argument.
    InvalidInput,
    /// Operation invoked before its prerequisite state was reached.
    InvalidState,
    /// Attempt to overwrite a write-once result field.
    AttributeLocked,
}

/// Errors raised by the analysis pipeline.
#[derive(Debug, Error)]
pub enum ImpactError {
    #[error("input must have at least 2 rows, got {rows}")]
    TooFewRows { rows: usize },

    #[error("n_simulations must be positive")]
    ZeroSimulations,

    #[error("alpha must lie in (0, 1), got {alpha}")]
    AlphaOutOfRange { alpha: f64 },

    #[error("probability {value} lies outside [0, 1]")]
    ProbabilityOutOfRange { value: f64 },

    #[error("series index must be strictly increasing at position {position}")]
    NonIncreasingIndex { position: usize },

    #[error("series index mixes step and date time points")]
    MixedIndexKinds,

    #[error("column \"{name}\" has {len} values, expected {expected}")]
    ColumnLengthMismatch {
        name: String,
        len: usize,
        expected: usize,
    },

    #[error("time point {point} is not in the series index")]
    PointNotInIndex { point: String },

    #[error("period start {start} is after period end {end}")]
    InvertedPeriod { start: String, end: String },

    #[error("pre-period must end before the post-period starts")]
    OverlappingPeriods,

    #[error("inference table is empty or has ragged columns")]
    MalformedTable,

    #[error(
        "\"{name}\" is not a valid panel. Valid panels are: \
         \"original\", \"pointwise\", \"cumulative\"."
    )]
    UnknownPanel { name: String },

    #[error(
        "\"{name}\" is not a valid output format. Valid formats are: \
         \"summary\", \"report\"."
    )]
    UnknownOutputFormat { name: String },

    #[error("at least one panel must be requested")]
    NoPanels,

    #[error("{attribute} is already set")]
    AttributeLocked { attribute: &'static str },

    #[error("{operation} requires engine state {required}, but the engine is in state {actual}")]
    InvalidState {
        operation: &'static str,
        required: &'static str,
        actual: &'static str,
    },

    #[error("summary requires summary data and p-value to be set")]
    SummaryNotReady,

    #[error(transparent)]
    Model(#[from] ModelError),
}

impl ImpactError {
    /// Collapse the structured variant into its taxonomy kind.
    pub fn kind(&self) -> ErrorKind {
        match self {
            ImpactError::AttributeLocked { .. } => ErrorKind::AttributeLocked,
            ImpactError::InvalidState { .. } | ImpactError::SummaryNotReady => {
                ErrorKind::InvalidState
            }
            _ => ErrorKind::InvalidInput,
        }
    }
}
