//! CausalImpact Core — posterior inference over an intervention's effect.
//!
//! Estimates what a time series would have looked like without an
//! intervention by simulating a structural model fitted on pre-intervention
//! data, then compares the counterfactual against what was observed:
//! - Domain types (time points, periods, observed data)
//! - Standardizer with exact inverse
//! - Structural-model trait, adapter, and the local-level reference model
//! - Inference engine: simulation ensemble, inference table, p-value
//! - Summary formatter (numeric table + narrative report)
//! - Backend-agnostic figure descriptions

pub mod analysis;
pub mod engine;
pub mod ensemble;
pub mod error;
pub mod lock;
pub mod model;
pub mod plot;
pub mod series;
pub mod standardize;
pub mod summary;
pub mod table;

pub use analysis::{CausalImpact, ImpactConfig};
pub use engine::{EngineState, InferenceEngine, RunInputs};
pub use ensemble::SimulationEnsemble;
pub use error::{ErrorKind, ImpactError};
pub use lock::Locked;
pub use model::adapter::{cycle_period_bounds, definition_from_spec, rebuild_model};
pub use model::local_level::LocalLevelModel;
pub use model::{FreqSeasonal, ModelDefinition, ModelError, ModelSpec, StructuralModel};
pub use plot::{build_figure, FigureConfig, FigureSpec, Panel};
pub use series::{AnalysisData, Covariate, Period, TimePoint};
pub use standardize::{standardize, unstandardize, Moments};
pub use summary::{OutputFormat, Summarizer};
pub use table::{Column, EffectStats, InferenceTable, SummaryTable, TableColumns};

#[cfg(test)]
mod send_sync_checks {
    use super::*;

    fn assert_send<T: Send>() {}
    fn assert_sync<T: Sync>() {}

    #[test]
    fn domain_types_are_send_sync() {
        assert_send::<TimePoint>();
        assert_sync::<TimePoint>();
        assert_send::<Period>();
        assert_sync::<Period>();
        assert_send::<AnalysisData>();
        assert_sync::<AnalysisData>();
    }

    #[test]
    fn result_types_are_send_sync() {
        assert_send::<SimulationEnsemble>();
        assert_sync::<SimulationEnsemble>();
        assert_send::<InferenceTable>();
        assert_sync::<InferenceTable>();
        assert_send::<SummaryTable>();
        assert_sync::<SummaryTable>();
    }

    #[test]
    fn engine_and_analysis_are_send_sync() {
        assert_send::<InferenceEngine>();
        assert_sync::<InferenceEngine>();
        assert_send::<CausalImpact>();
        assert_sync::<CausalImpact>();
        assert_send::<ImpactConfig>();
        assert_sync::<ImpactConfig>();
    }

    #[test]
    fn model_types_are_send_sync() {
        assert_send::<LocalLevelModel>();
        assert_sync::<LocalLevelModel>();
        assert_send::<ModelSpec>();
        assert_sync::<ModelSpec>();
        assert_send::<Box<dyn StructuralModel>>();
        assert_sync::<Box<dyn StructuralModel>>();
    }
}
