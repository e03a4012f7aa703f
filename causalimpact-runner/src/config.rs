//! Serializable analysis configuration.

use std::path::{Path, PathBuf};

use causalimpact_core::{ImpactConfig, Period, TimePoint};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Unique identifier for an analysis run (content-addressable hash).
pub type RunId = String;

/// Everything needed to reproduce one analysis: the data source, the
/// period boundaries, and the inference settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisConfig {
    pub data: DataConfig,
    pub periods: PeriodsConfig,
    #[serde(default)]
    pub inference: InferenceConfig,
    #[serde(default)]
    pub display: DisplayConfig,
}

/// Where the observations come from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataConfig {
    /// CSV file with a header row.
    pub path: PathBuf,

    /// Index column; when absent rows are numbered from zero.
    #[serde(default)]
    pub index_column: Option<String>,

    /// Response column.
    pub response_column: String,

    /// Covariate columns; empty means every remaining column.
    #[serde(default)]
    pub covariate_columns: Vec<String>,
}

/// Pre/post boundaries as they appear in the index column: integers for
/// step indices, `YYYY-MM-DD` for dates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PeriodsConfig {
    pub pre_start: String,
    pub pre_end: String,
    pub post_start: String,
    pub post_end: String,
}

/// Inference settings; defaults mirror [`ImpactConfig::default`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InferenceConfig {
    #[serde(default = "default_n_simulations")]
    pub n_simulations: usize,
    #[serde(default = "default_alpha")]
    pub alpha: f64,
    #[serde(default = "default_standardize")]
    pub standardize: bool,
    #[serde(default = "default_seed")]
    pub seed: u64,
}

fn default_n_simulations() -> usize {
    1000
}

fn default_alpha() -> f64 {
    0.05
}

fn default_standardize() -> bool {
    true
}

fn default_seed() -> u64 {
    42
}

impl Default for InferenceConfig {
    fn default() -> Self {
        Self {
            n_simulations: default_n_simulations(),
            alpha: default_alpha(),
            standardize: default_standardize(),
            seed: default_seed(),
        }
    }
}

/// Display settings for rendered text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DisplayConfig {
    #[serde(default = "default_digits")]
    pub digits: usize,
}

fn default_digits() -> usize {
    2
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            digits: default_digits(),
        }
    }
}

/// Errors from reading or interpreting a configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("\"{value}\" is neither an integer step nor a YYYY-MM-DD date")]
    BadTimePoint { value: String },

    #[error(transparent)]
    Impact(#[from] causalimpact_core::ImpactError),
}

/// Parse an index value: integer step first, ISO date second.
pub fn parse_time_point(value: &str) -> Result<TimePoint, ConfigError> {
    if let Ok(step) = value.trim().parse::<i64>() {
        return Ok(TimePoint::Step(step));
    }
    if let Ok(date) = value.trim().parse::<NaiveDate>() {
        return Ok(TimePoint::Date(date));
    }
    Err(ConfigError::BadTimePoint {
        value: value.into(),
    })
}

impl AnalysisConfig {
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(text)?)
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&text)
    }

    /// Pre and post periods parsed from the configured boundaries.
    pub fn periods(&self) -> Result<(Period, Period), ConfigError> {
        let pre = Period::new(
            parse_time_point(&self.periods.pre_start)?,
            parse_time_point(&self.periods.pre_end)?,
        )?;
        let post = Period::new(
            parse_time_point(&self.periods.post_start)?,
            parse_time_point(&self.periods.post_end)?,
        )?;
        Ok((pre, post))
    }

    pub fn impact_config(&self) -> ImpactConfig {
        ImpactConfig {
            n_simulations: self.inference.n_simulations,
            alpha: self.inference.alpha,
            standardize: self.inference.standardize,
            seed: self.inference.seed,
        }
    }

    /// Deterministic content hash; identical configs share a RunId.
    pub fn run_id(&self) -> RunId {
        let json = serde_json::to_string(self).expect("AnalysisConfig serialization failed");
        blake3::hash(json.as_bytes()).to_hex().to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"
[data]
path = "observations.csv"
response_column = "y"
covariate_columns = ["x1", "x2"]

[periods]
pre_start = "0"
pre_end = "69"
post_start = "70"
post_end = "99"

[inference]
n_simulations = 500
alpha = 0.1
"#;

    #[test]
    fn parses_toml_with_defaults() {
        let config = AnalysisConfig::from_toml_str(SAMPLE).unwrap();
        assert_eq!(config.data.response_column, "y");
        assert_eq!(config.data.covariate_columns, vec!["x1", "x2"]);
        assert!(config.data.index_column.is_none());
        assert_eq!(config.inference.n_simulations, 500);
        assert!((config.inference.alpha - 0.1).abs() < 1e-12);
        // unspecified knobs fall back to defaults
        assert!(config.inference.standardize);
        assert_eq!(config.inference.seed, 42);
        assert_eq!(config.display.digits, 2);
    }

    #[test]
    fn periods_parse_as_steps() {
        let config = AnalysisConfig::from_toml_str(SAMPLE).unwrap();
        let (pre, post) = config.periods().unwrap();
        assert_eq!(pre.start, TimePoint::Step(0));
        assert_eq!(post.end, TimePoint::Step(99));
    }

    #[test]
    fn date_boundaries_parse() {
        assert_eq!(
            parse_time_point("2024-03-01").unwrap(),
            TimePoint::Date(NaiveDate::from_ymd_opt(2024, 3, 1).unwrap())
        );
        assert!(matches!(
            parse_time_point("next tuesday"),
            Err(ConfigError::BadTimePoint { .. })
        ));
    }

    #[test]
    fn run_id_is_deterministic_and_content_sensitive() {
        let a = AnalysisConfig::from_toml_str(SAMPLE).unwrap();
        let b = AnalysisConfig::from_toml_str(SAMPLE).unwrap();
        assert_eq!(a.run_id(), b.run_id());

        let mut c = AnalysisConfig::from_toml_str(SAMPLE).unwrap();
        c.inference.seed = 43;
        assert_ne!(a.run_id(), c.run_id());
    }

    #[test]
    fn config_round_trips_through_toml() {
        let config = AnalysisConfig::from_toml_str(SAMPLE).unwrap();
        let text = toml::to_string(&config).unwrap();
        let back = AnalysisConfig::from_toml_str(&text).unwrap();
        assert_eq!(back, config);
    }
}
