//! CausalImpact Runner — configuration, data loading, and artifact export.
//!
//! Builds on `causalimpact-core` to provide:
//! - Serializable analysis configuration (TOML) with content-hash run IDs
//! - CSV loading for step- and date-indexed observation files
//! - A single-call `run_analysis` producing printable and exportable output
//! - Artifact export: JSON result, inference CSV, rendered summary/report

pub mod config;
pub mod export;
pub mod loader;
pub mod runner;

pub use config::{
    AnalysisConfig, ConfigError, DataConfig, DisplayConfig, InferenceConfig, PeriodsConfig, RunId,
};
pub use export::{export_inferences_csv, export_json, import_json, save_artifacts};
pub use loader::{load_csv, load_csv_from, LoadError};
pub use runner::{run_analysis, AnalysisOutcome, RunError, SCHEMA_VERSION};
