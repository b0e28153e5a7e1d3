//! The bundled Iris dataset (150 rows, 4 features, 3 classes).
//!
//! Stored as CSV with a `n_samples,n_features,<class names...>` header line,
//! followed by `f1,f2,f3,f4,label` rows.

use super::Dataset;
use crate::error::{MlError, MlResult};
use ndarray::{Array1, Array2};

const IRIS_CSV: &str = include_str!("iris.csv");

pub const IRIS_FEATURE_NAMES: [&str; 4] = [
    "sepal length (cm)",
    "sepal width (cm)",
    "petal length (cm)",
    "petal width (cm)",
];

/// Load the bundled Iris dataset.
pub fn load_iris() -> MlResult<Dataset> {
    parse_labelled_csv("iris", IRIS_CSV, &IRIS_FEATURE_NAMES)
}

/// Parse the bundled CSV format.
///
/// The header record is shorter than the data records, so the reader runs in
/// flexible mode and every data record's width is checked here.
pub(crate) fn parse_labelled_csv(
    name: &str,
    content: &str,
    feature_names: &[&str],
) -> MlResult<Dataset> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(content.as_bytes());
    let mut records = reader.records();

    let header = records
        .next()
        .ok_or_else(|| MlError::dataset(format!("{name}: empty file")))?
        .map_err(|e| csv_error(name, e))?;
    let n_samples = parse_header_count(name, header.get(0), "n_samples")?;
    let n_features = parse_header_count(name, header.get(1), "n_features")?;
    let target_names: Vec<String> = header.iter().skip(2).map(str::to_string).collect();
    if target_names.is_empty() {
        return Err(MlError::dataset(format!("{name}: header lists no classes")));
    }
    if !feature_names.is_empty() && feature_names.len() != n_features {
        return Err(MlError::dataset(format!(
            "{name}: header says {n_features} features, expected {}",
            feature_names.len()
        )));
    }

    let mut values = Vec::with_capacity(n_samples * n_features);
    let mut targets = Vec::with_capacity(n_samples);
    for record in records {
        let record = record.map_err(|e| csv_error(name, e))?;
        let line = record.position().map_or(0, |p| p.line());
        if record.len() != n_features + 1 {
            return Err(MlError::dataset(format!(
                "{name}: line {line} has {} fields, expected {}",
                record.len(),
                n_features + 1
            )));
        }
        for raw in record.iter().take(n_features) {
            let value: f64 = raw.parse().map_err(|_| {
                MlError::dataset(format!("{name}: line {line}: bad value '{raw}'"))
            })?;
            values.push(value);
        }
        let raw_label = &record[n_features];
        let label: usize = raw_label.parse().map_err(|_| {
            MlError::dataset(format!("{name}: line {line}: bad label '{raw_label}'"))
        })?;
        targets.push(label);
    }

    if targets.len() != n_samples {
        return Err(MlError::dataset(format!(
            "{name}: header says {n_samples} rows, found {}",
            targets.len()
        )));
    }

    let features = Array2::from_shape_vec((n_samples, n_features), values)
        .map_err(|e| MlError::dataset(format!("{name}: {e}")))?;
    Dataset::new(
        name,
        features,
        Array1::from(targets),
        feature_names.iter().map(|s| s.to_string()).collect(),
        target_names,
    )
}

fn parse_header_count(name: &str, field: Option<&str>, what: &str) -> MlResult<usize> {
    field
        .and_then(|f| f.parse().ok())
        .ok_or_else(|| MlError::dataset(format!("{name}: header is missing {what}")))
}

fn csv_error(name: &str, err: csv::Error) -> MlError {
    MlError::dataset(format!("{name}: {err}"))
}
