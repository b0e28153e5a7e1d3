//! Evaluation artifacts: a confusion-matrix CSV and a plain-text accuracy
//! summary, written locally and then copied into the run.

use crate::error::MlResult;
use crate::metrics::{accuracy_score, confusion_matrix};
use ferrotrack_core::ActiveRun;
use ferrotrack_core::persistence::atomic_write;
use ndarray::Array1;
use std::path::{Path, PathBuf};

pub const CONFUSION_MATRIX_FILE: &str = "confusion_matrix.csv";
pub const METRICS_FILE: &str = "metrics.txt";

/// Paths of the written evaluation files.
#[derive(Debug, Clone, PartialEq)]
pub struct EvaluationFiles {
    pub confusion_matrix: PathBuf,
    pub metrics: PathBuf,
    pub accuracy: f64,
}

impl EvaluationFiles {
    pub fn paths(&self) -> [&Path; 2] {
        [self.confusion_matrix.as_path(), self.metrics.as_path()]
    }
}

/// Write `confusion_matrix.csv` and `metrics.txt` into `dir`, creating it
/// if needed. Existing files are overwritten.
pub fn write_evaluation_artifacts(
    dir: &Path,
    y_true: &Array1<usize>,
    y_pred: &Array1<usize>,
) -> MlResult<EvaluationFiles> {
    let matrix = confusion_matrix(y_true, y_pred)?;
    let accuracy = accuracy_score(y_true, y_pred)?;

    let cm_path = dir.join(CONFUSION_MATRIX_FILE);
    atomic_write(&cm_path, matrix.to_csv()?.as_bytes())?;

    let metrics_path = dir.join(METRICS_FILE);
    atomic_write(&metrics_path, format!("accuracy: {accuracy:.4}\n").as_bytes())?;

    tracing::debug!(dir = %dir.display(), accuracy, "Wrote evaluation artifacts");
    Ok(EvaluationFiles {
        confusion_matrix: cm_path,
        metrics: metrics_path,
        accuracy,
    })
}

/// Write the evaluation files and log both at the run's artifact root.
pub fn log_evaluation_artifacts(
    run: &ActiveRun<'_>,
    dir: &Path,
    y_true: &Array1<usize>,
    y_pred: &Array1<usize>,
) -> MlResult<EvaluationFiles> {
    let files = write_evaluation_artifacts(dir, y_true, y_pred)?;
    for path in files.paths() {
        run.log_artifact(path, None)?;
    }
    tracing::info!(run_id = run.id(), "Logged evaluation artifacts");
    Ok(files)
}
