//! Artifact export — JSON result, inference CSV, and rendered texts.
//!
//! All persisted artifacts carry a `schema_version` field; unknown versions
//! are rejected on load.

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use causalimpact_core::{Column, InferenceTable};

use crate::runner::{AnalysisOutcome, SCHEMA_VERSION};

// ─── JSON export ────────────────────────────────────────────────────

/// Serialize an `AnalysisOutcome` to pretty JSON.
pub fn export_json(outcome: &AnalysisOutcome) -> Result<String> {
    serde_json::to_string_pretty(outcome).context("failed to serialize AnalysisOutcome to JSON")
}

/// Deserialize an `AnalysisOutcome`, rejecting unknown schema versions.
pub fn import_json(json: &str) -> Result<AnalysisOutcome> {
    let outcome: AnalysisOutcome =
        serde_json::from_str(json).context("failed to deserialize AnalysisOutcome from JSON")?;
    if outcome.schema_version > SCHEMA_VERSION {
        bail!(
            "unsupported schema version {} (max supported: {})",
            outcome.schema_version,
            SCHEMA_VERSION
        );
    }
    Ok(outcome)
}

// ─── CSV export ─────────────────────────────────────────────────────

/// Export the inference table as CSV: the index plus every column, in the
/// table's declared order. NaN cells (pre-period cumulative rows) export as
/// empty fields.
pub fn export_inferences_csv(table: &InferenceTable) -> Result<String> {
    let mut writer = csv::Writer::from_writer(vec![]);

    let mut header = vec!["index"];
    header.extend(Column::ALL.iter().map(Column::as_str));
    writer.write_record(&header)?;

    for (position, point) in table.index().iter().enumerate() {
        let mut record = vec![point.to_string()];
        for column in Column::ALL {
            let value = table.column(column)[position];
            record.push(if value.is_nan() {
                String::new()
            } else {
                format!("{value:.6}")
            });
        }
        writer.write_record(&record)?;
    }

    let bytes = writer.into_inner().context("failed to flush CSV writer")?;
    String::from_utf8(bytes).context("CSV output is not valid UTF-8")
}

// ─── Artifact bundle ────────────────────────────────────────────────

/// Write `result.json`, `inferences.csv`, `summary.txt`, and `report.txt`
/// into `dir`, returning the created paths.
pub fn save_artifacts(outcome: &AnalysisOutcome, dir: &Path) -> Result<Vec<PathBuf>> {
    std::fs::create_dir_all(dir)
        .with_context(|| format!("failed to create output directory {}", dir.display()))?;

    let mut written = Vec::with_capacity(4);
    let mut write = |name: &str, content: String| -> Result<()> {
        let path = dir.join(name);
        std::fs::write(&path, content)
            .with_context(|| format!("failed to write {}", path.display()))?;
        written.push(path);
        Ok(())
    };

    write("result.json", export_json(outcome)?)?;
    write("inferences.csv", export_inferences_csv(&outcome.inferences)?)?;
    write("summary.txt", outcome.summary_text.clone())?;
    write("report.txt", outcome.report_text.clone())?;
    Ok(written)
}
