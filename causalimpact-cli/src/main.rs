//! CausalImpact CLI — run analyses and re-render saved results.
//!
//! Commands:
//! - `run` — execute an analysis from a TOML config file or from a CSV
//!   path plus command-line flags; prints the summary or report and
//!   optionally writes artifacts
//! - `report` — re-render the report from a saved `result.json`

use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use causalimpact_runner::{
    import_json, run_analysis, save_artifacts, AnalysisConfig, DataConfig, DisplayConfig,
    InferenceConfig, PeriodsConfig,
};
use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(
    name = "causalimpact",
    about = "Causal impact analysis — counterfactual inference for time series"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Execute an analysis from a TOML config file or CSV + flags.
    Run {
        /// Path to a TOML config file.
        #[arg(long)]
        config: Option<PathBuf>,

        /// CSV data file (alternative to --config).
        #[arg(long)]
        data: Option<PathBuf>,

        /// Index column name; rows are numbered from zero when omitted.
        #[arg(long)]
        index_column: Option<String>,

        /// Response column name.
        #[arg(long, default_value = "y")]
        response: String,

        /// Covariate column names; all remaining columns when omitted.
        #[arg(long)]
        covariates: Vec<String>,

        /// Pre-period as start:end (steps or YYYY-MM-DD dates).
        #[arg(long)]
        pre: Option<String>,

        /// Post-period as start:end.
        #[arg(long)]
        post: Option<String>,

        /// Two-sided credible-interval tail mass.
        #[arg(long, default_value_t = 0.05)]
        alpha: f64,

        /// Number of posterior simulation draws.
        #[arg(long, default_value_t = 1000)]
        sims: usize,

        /// RNG seed.
        #[arg(long, default_value_t = 42)]
        seed: u64,

        /// Skip standardizing inputs before fitting.
        #[arg(long, default_value_t = false)]
        no_standardize: bool,

        /// Decimal places in rendered numbers.
        #[arg(long, default_value_t = 2)]
        digits: usize,

        /// Output mode: summary or report.
        #[arg(long, default_value = "summary")]
        output: String,

        /// Directory for result artifacts; nothing is written when omitted.
        #[arg(long)]
        output_dir: Option<PathBuf>,
    },
    /// Re-render the report from a saved result.json.
    Report {
        /// Path to a result.json produced by `run`.
        artifact: PathBuf,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    match cli.command {
        Commands::Run {
            config,
            data,
            index_column,
            response,
            covariates,
            pre,
            post,
            alpha,
            sims,
            seed,
            no_standardize,
            digits,
            output,
            output_dir,
        } => {
            let config = match (config, data) {
                (Some(path), None) => AnalysisConfig::load(&path)
                    .with_context(|| format!("failed to load config {}", path.display()))?,
                (None, Some(data_path)) => flag_config(
                    data_path,
                    index_column,
                    response,
                    covariates,
                    pre,
                    post,
                    alpha,
                    sims,
                    seed,
                    no_standardize,
                    digits,
                )?,
                (Some(_), Some(_)) => bail!("--config and --data are mutually exclusive"),
                (None, None) => bail!("one of --config or --data is required"),
            };

            // reject unknown output modes before spending time on the run
            let format: causalimpact_core::OutputFormat = output.parse()?;

            let outcome = run_analysis(&config)?;
            match format {
                causalimpact_core::OutputFormat::Summary => println!("{}", outcome.summary_text),
                causalimpact_core::OutputFormat::Report => println!("{}", outcome.report_text),
            }

            if let Some(dir) = output_dir {
                let written = save_artifacts(&outcome, &dir)?;
                eprintln!("wrote {} artifacts to {}", written.len(), dir.display());
            }
            Ok(())
        }
        Commands::Report { artifact } => {
            let json = std::fs::read_to_string(&artifact)
                .with_context(|| format!("failed to read {}", artifact.display()))?;
            let outcome = import_json(&json)?;
            println!("{}", outcome.report_text);
            Ok(())
        }
    }
}

#[allow(clippy::too_many_arguments)]
fn flag_config(
    data: PathBuf,
    index_column: Option<String>,
    response: String,
    covariates: Vec<String>,
    pre: Option<String>,
    post: Option<String>,
    alpha: f64,
    sims: usize,
    seed: u64,
    no_standardize: bool,
    digits: usize,
) -> Result<AnalysisConfig> {
    let (pre_start, pre_end) = split_period(pre.as_deref(), "--pre")?;
    let (post_start, post_end) = split_period(post.as_deref(), "--post")?;
    Ok(AnalysisConfig {
        data: DataConfig {
            path: data,
            index_column,
            response_column: response,
            covariate_columns: covariates,
        },
        periods: PeriodsConfig {
            pre_start,
            pre_end,
            post_start,
            post_end,
        },
        inference: InferenceConfig {
            n_simulations: sims,
            alpha,
            standardize: !no_standardize,
            seed,
        },
        display: DisplayConfig { digits },
    })
}

/// Split a `start:end` period argument.
fn split_period(value: Option<&str>, flag: &str) -> Result<(String, String)> {
    let value = match value {
        Some(v) => v,
        None => bail!("{flag} is required with --data"),
    };
    match value.split_once(':') {
        Some((start, end)) if !start.is_empty() && !end.is_empty() => {
            Ok((start.to_string(), end.to_string()))
        }
        _ => bail!("{flag} must look like start:end, got \"{value}\""),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn period_argument_splits() {
        let (start, end) = split_period(Some("0:69"), "--pre").unwrap();
        assert_eq!(start, "0");
        assert_eq!(end, "69");
        let (start, end) = split_period(Some("2024-01-01:2024-03-01"), "--post").unwrap();
        assert_eq!(start, "2024-01-01");
        assert_eq!(end, "2024-03-01");
    }

    #[test]
    fn malformed_period_argument_rejected() {
        assert!(split_period(Some("0-69"), "--pre").is_err());
        assert!(split_period(Some(":69"), "--pre").is_err());
        assert!(split_period(None, "--pre").is_err());
    }

    #[test]
    fn flag_config_fills_inference_settings() {
        let config = flag_config(
            PathBuf::from("data.csv"),
            Some("t".into()),
            "y".into(),
            vec!["x".into()],
            Some("0:69".into()),
            Some("70:99".into()),
            0.1,
            500,
            7,
            true,
            3,
        )
        .unwrap();
        assert_eq!(config.inference.n_simulations, 500);
        assert!(!config.inference.standardize);
        assert_eq!(config.display.digits, 3);
        assert_eq!(config.periods.post_end, "99");
    }
}
