//! CSV → [`AnalysisData`] loading.
//!
//! Accepts integer- or date-indexed files. Empty cells become NaN (the
//! standardizer skips them); anything else that fails to parse is an error
//! with the offending row and column named.

use std::path::{Path, PathBuf};

use causalimpact_core::{AnalysisData, Covariate, ImpactError, TimePoint};
use chrono::NaiveDate;
use thiserror::Error;

use crate::config::DataConfig;

/// Errors from loading observation files.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("failed to open {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to read CSV record: {0}")]
    Csv(#[from] csv::Error),

    #[error("column \"{name}\" not found in {path}")]
    MissingColumn { name: String, path: PathBuf },

    #[error("row {row}, column \"{column}\": cannot parse \"{value}\" as a number")]
    BadNumber {
        row: usize,
        column: String,
        value: String,
    },

    #[error("row {row}: cannot parse index value \"{value}\" as a step or date")]
    BadIndex { row: usize, value: String },

    #[error("no data rows in {path}")]
    Empty { path: PathBuf },

    #[error(transparent)]
    Impact(#[from] ImpactError),
}

/// Load the configured columns from a CSV file.
pub fn load_csv(config: &DataConfig) -> Result<AnalysisData, LoadError> {
    load_csv_from(&config.path, config)
}

/// Same as [`load_csv`] with an explicit path (used by tests and the CLI
/// when the path comes from the command line).
pub fn load_csv_from(path: &Path, config: &DataConfig) -> Result<AnalysisData, LoadError> {
    let text = std::fs::read_to_string(path).map_err(|source| LoadError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let mut reader = csv::Reader::from_reader(text.as_bytes());

    let headers: Vec<String> = reader
        .headers()?
        .iter()
        .map(|h| h.trim().to_string())
        .collect();

    let find = |name: &str| -> Result<usize, LoadError> {
        headers
            .iter()
            .position(|h| h == name)
            .ok_or_else(|| LoadError::MissingColumn {
                name: name.into(),
                path: path.to_path_buf(),
            })
    };

    let index_position = config
        .index_column
        .as_deref()
        .map(|name| find(name))
        .transpose()?;
    let response_position = find(&config.response_column)?;

    let covariate_names: Vec<String> = if config.covariate_columns.is_empty() {
        headers
            .iter()
            .enumerate()
            .filter(|(i, _)| Some(*i) != index_position && *i != response_position)
            .map(|(_, h)| h.clone())
            .collect()
    } else {
        config.covariate_columns.clone()
    };
    let covariate_positions: Vec<usize> = covariate_names
        .iter()
        .map(|name| find(name))
        .collect::<Result<_, _>>()?;

    let mut raw_index: Vec<String> = Vec::new();
    let mut y: Vec<f64> = Vec::new();
    let mut covariate_values: Vec<Vec<f64>> = vec![Vec::new(); covariate_positions.len()];

    for (row, record) in reader.records().enumerate() {
        let record = record?;
        if let Some(position) = index_position {
            raw_index.push(record.get(position).unwrap_or("").trim().to_string());
        }
        y.push(parse_cell(&record, response_position, row, &headers)?);
        for (slot, position) in covariate_values.iter_mut().zip(&covariate_positions) {
            slot.push(parse_cell(&record, *position, row, &headers)?);
        }
    }

    if y.is_empty() {
        return Err(LoadError::Empty {
            path: path.to_path_buf(),
        });
    }

    let index = match index_position {
        Some(_) => parse_index(&raw_index)?,
        None => (0..y.len() as i64).map(TimePoint::Step).collect(),
    };

    let covariates = covariate_names
        .into_iter()
        .zip(covariate_values)
        .map(|(name, values)| Covariate { name, values })
        .collect();

    Ok(AnalysisData::new(index, y, covariates)?)
}

fn parse_cell(
    record: &csv::StringRecord,
    position: usize,
    row: usize,
    headers: &[String],
) -> Result<f64, LoadError> {
    let raw = record.get(position).unwrap_or("").trim();
    if raw.is_empty() {
        return Ok(f64::NAN);
    }
    raw.parse::<f64>().map_err(|_| LoadError::BadNumber {
        row,
        column: headers
            .get(position)
            .cloned()
            .unwrap_or_else(|| position.to_string()),
        value: raw.into(),
    })
}

/// All-steps first, all-dates second; a mix fails on the first offender.
fn parse_index(raw: &[String]) -> Result<Vec<TimePoint>, LoadError> {
    if raw.iter().all(|v| v.parse::<i64>().is_ok()) {
        return Ok(raw
            .iter()
            .filter_map(|v| v.parse::<i64>().ok().map(TimePoint::Step))
            .collect());
    }
    raw.iter()
        .enumerate()
        .map(|(row, value)| {
            value
                .parse::<NaiveDate>()
                .map(TimePoint::Date)
                .map_err(|_| LoadError::BadIndex {
                    row,
                    value: value.clone(),
                })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_csv(content: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file
    }

    fn data_config(index: Option<&str>, covariates: &[&str]) -> DataConfig {
        DataConfig {
            path: PathBuf::new(),
            index_column: index.map(String::from),
            response_column: "y".into(),
            covariate_columns: covariates.iter().map(|s| s.to_string()).collect(),
        }
    }

    #[test]
    fn loads_step_indexed_file() {
        let file = write_csv("t,y,x\n0,1.0,0.5\n1,2.0,1.5\n2,3.0,2.5\n");
        let data = load_csv_from(file.path(), &data_config(Some("t"), &["x"])).unwrap();
        assert_eq!(data.len(), 3);
        assert_eq!(data.index()[2], TimePoint::Step(2));
        assert_eq!(data.y(), &[1.0, 2.0, 3.0]);
        assert_eq!(data.covariates()[0].values, vec![0.5, 1.5, 2.5]);
    }

    #[test]
    fn loads_date_indexed_file() {
        let file = write_csv("date,y\n2024-01-01,1.0\n2024-01-02,2.0\n");
        let data = load_csv_from(file.path(), &data_config(Some("date"), &[])).unwrap();
        assert_eq!(
            data.index()[0],
            TimePoint::Date(NaiveDate::from_ymd_opt(2024, 1, 1).unwrap())
        );
    }

    #[test]
    fn missing_index_column_numbers_rows() {
        let file = write_csv("y,x\n1.0,0.5\n2.0,1.5\n");
        let data = load_csv_from(file.path(), &data_config(None, &["x"])).unwrap();
        assert_eq!(data.index()[1], TimePoint::Step(1));
    }

    #[test]
    fn empty_covariate_list_takes_all_remaining_columns() {
        let file = write_csv("t,y,x1,x2\n0,1.0,0.5,9.0\n1,2.0,1.5,8.0\n");
        let data = load_csv_from(file.path(), &data_config(Some("t"), &[])).unwrap();
        let names: Vec<&str> = data.covariates().iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["x1", "x2"]);
    }

    #[test]
    fn empty_cells_become_nan() {
        let file = write_csv("t,y,x\n0,1.0,\n1,2.0,1.5\n");
        let data = load_csv_from(file.path(), &data_config(Some("t"), &["x"])).unwrap();
        assert!(data.covariates()[0].values[0].is_nan());
    }

    #[test]
    fn missing_column_is_reported() {
        let file = write_csv("t,y\n0,1.0\n");
        let err = load_csv_from(file.path(), &data_config(Some("t"), &["x"])).unwrap_err();
        assert!(matches!(err, LoadError::MissingColumn { .. }));
        assert!(err.to_string().contains("\"x\""));
    }

    #[test]
    fn unparsable_number_is_reported_with_position() {
        let file = write_csv("t,y\n0,1.0\n1,not-a-number\n");
        let err = load_csv_from(file.path(), &data_config(Some("t"), &[])).unwrap_err();
        match err {
            LoadError::BadNumber { row, column, value } => {
                assert_eq!(row, 1);
                assert_eq!(column, "y");
                assert_eq!(value, "not-a-number");
            }
            other => panic!("expected BadNumber, got {other:?}"),
        }
    }

    #[test]
    fn empty_file_is_rejected() {
        let file = write_csv("t,y\n");
        let err = load_csv_from(file.path(), &data_config(Some("t"), &[])).unwrap_err();
        assert!(matches!(err, LoadError::Empty { .. }));
    }

    #[test]
    fn unsorted_index_surfaces_core_validation() {
        let file = write_csv("t,y\n5,1.0\n3,2.0\n");
        let err = load_csv_from(file.path(), &data_config(Some("t"), &[])).unwrap_err();
        assert!(matches!(err, LoadError::Impact(_)));
    }
}
