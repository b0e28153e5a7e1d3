//! The end-to-end training job.
//!
//! Loads Iris, splits it, fits the scaler + logistic-regression pipeline,
//! evaluates on the held-out rows and records everything in one tracked run.

use crate::artifacts::log_evaluation_artifacts;
use crate::config::MlConfig;
use crate::data::{Dataset, Split, SplitOptions, load_iris, train_test_split};
use crate::error::MlResult;
use crate::linear::FitSummary;
use crate::metrics::{ConfusionMatrix, confusion_matrix};
use crate::model_store::{DEFAULT_ARTIFACT_PATH, log_model};
use crate::pipeline::{Pipeline, build_model};
use ferrotrack_core::{ActiveRun, Tracker};
use serde::Serialize;
use std::path::{Path, PathBuf};

pub const ACCURACY_METRIC: &str = "accuracy";
pub const TAG_DATASET_NAME: &str = "dataset.name";
pub const TAG_DATASET_DIGEST: &str = "dataset.digest";

/// Summary of a completed job.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrainingReport {
    pub experiment_id: String,
    pub run_id: String,
    pub run_name: String,
    pub accuracy: f64,
    pub confusion_matrix: ConfusionMatrix,
    pub train_rows: usize,
    pub test_rows: usize,
    pub iterations: usize,
    pub converged: bool,
    /// Local directory holding the evaluation files.
    pub artifacts_dir: PathBuf,
    /// Directory of the logged model inside the tracking store.
    pub model_dir: PathBuf,
}

/// One configured execution of the training flow.
#[derive(Debug, Clone)]
pub struct TrainingJob {
    config: MlConfig,
    workspace: PathBuf,
}

struct Evaluation {
    fit: FitSummary,
    accuracy: f64,
    confusion_matrix: ConfusionMatrix,
    artifacts_dir: PathBuf,
    model_dir: PathBuf,
}

impl TrainingJob {
    /// `workspace` anchors the relative tracking URI and artifact directory.
    pub fn new(config: MlConfig, workspace: impl Into<PathBuf>) -> Self {
        Self {
            config,
            workspace: workspace.into(),
        }
    }

    pub fn config(&self) -> &MlConfig {
        &self.config
    }

    pub fn workspace(&self) -> &Path {
        &self.workspace
    }

    /// Resolved local directory for the evaluation files.
    pub fn artifacts_dir(&self) -> PathBuf {
        self.workspace.join(&self.config.artifacts.dir)
    }

    /// Run the job. A failure after the run is created ends it as `FAILED`
    /// and returns the error that caused it.
    pub fn run(&self) -> MlResult<TrainingReport> {
        self.config.validate()?;
        let cfg = &self.config;

        let tracker = Tracker::open(&cfg.tracking.uri, &self.workspace)?;
        let experiment = tracker.set_experiment(&cfg.tracking.experiment_name)?;
        tracing::info!(
            experiment_id = %experiment.experiment_id,
            experiment = %experiment.name,
            store = %tracker.store().root().display(),
            "Using experiment"
        );

        let dataset = load_iris()?;
        let split = train_test_split(&dataset, &SplitOptions::from(&cfg.split))?;
        let mut model = build_model(&cfg.model);

        let run = tracker.start_run(&experiment, cfg.tracking.run_name.as_deref())?;
        tracing::info!(run_id = run.id(), run_name = %run.info().run_name, "Started run");

        let outcome = self.execute(&run, &dataset, &split, &mut model);
        let evaluation = match outcome {
            Ok(evaluation) => evaluation,
            Err(e) => {
                tracing::error!(run_id = run.id(), error = %e, "Training failed");
                if let Err(end_err) = run.fail() {
                    tracing::warn!(error = %end_err, "Could not mark run as failed");
                }
                return Err(e);
            }
        };
        let info = run.finish()?;

        Ok(TrainingReport {
            experiment_id: info.experiment_id,
            run_id: info.run_id,
            run_name: info.run_name,
            accuracy: evaluation.accuracy,
            confusion_matrix: evaluation.confusion_matrix,
            train_rows: split.train_rows(),
            test_rows: split.test_rows(),
            iterations: evaluation.fit.iterations,
            converged: evaluation.fit.converged,
            artifacts_dir: evaluation.artifacts_dir,
            model_dir: evaluation.model_dir,
        })
    }

    fn execute(
        &self,
        run: &ActiveRun<'_>,
        dataset: &Dataset,
        split: &Split,
        model: &mut Pipeline,
    ) -> MlResult<Evaluation> {
        let cfg = &self.config;
        run.log_params(model.params(&cfg.split))?;
        run.set_tag(TAG_DATASET_NAME, &dataset.name)?;
        run.set_tag(TAG_DATASET_DIGEST, &dataset.digest())?;

        let fit = model.fit(&split.x_train, &split.y_train)?;
        let y_pred = model.predict(&split.x_test)?;

        let artifacts_dir = self.artifacts_dir();
        let files = log_evaluation_artifacts(run, &artifacts_dir, &split.y_test, &y_pred)?;
        run.log_metric(ACCURACY_METRIC, files.accuracy)?;
        let confusion_matrix = confusion_matrix(&split.y_test, &y_pred)?;

        let logged = log_model(run, model, DEFAULT_ARTIFACT_PATH)?;
        tracing::info!(
            accuracy = files.accuracy,
            iterations = fit.iterations,
            converged = fit.converged,
            "Evaluated model"
        );
        Ok(Evaluation {
            fit,
            accuracy: files.accuracy,
            confusion_matrix,
            artifacts_dir,
            model_dir: logged.model_dir,
        })
    }
}
