//! Configuration for the training job.
//!
//! Loaded through `ferrotrack_core::config` layering, so every field can be
//! overridden from `ferrotrack.toml` or `FERROTRACK_<SECTION>__<FIELD>`.

use crate::error::{MlError, MlResult};
use crate::linear::Solver;
use ferrotrack_core::config::{TrackingConfig, load_config};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Top-level job configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MlConfig {
    /// Tracking store and experiment selection.
    #[serde(default)]
    pub tracking: TrackingConfig,
    /// Train/test split parameters.
    #[serde(default)]
    pub split: SplitConfig,
    /// Classifier hyperparameters.
    #[serde(default)]
    pub model: ModelConfig,
    /// Local evaluation artifact output.
    #[serde(default)]
    pub artifacts: ArtifactConfig,
}

/// Train/test split parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SplitConfig {
    /// Fraction of rows held out for evaluation, in (0, 1).
    #[serde(default = "default_test_size")]
    pub test_size: f64,
    /// Seed for the split shuffle.
    #[serde(default = "default_random_state")]
    pub random_state: u64,
    /// Preserve class proportions in both halves.
    #[serde(default = "default_true")]
    pub stratify: bool,
}

impl Default for SplitConfig {
    fn default() -> Self {
        Self {
            test_size: default_test_size(),
            random_state: default_random_state(),
            stratify: true,
        }
    }
}

fn default_test_size() -> f64 {
    0.2
}

fn default_random_state() -> u64 {
    42
}

fn default_true() -> bool {
    true
}

/// Logistic-regression hyperparameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelConfig {
    /// Inverse regularisation strength.
    #[serde(default = "default_c")]
    pub c: f64,
    #[serde(default)]
    pub solver: Solver,
    #[serde(default = "default_max_iter")]
    pub max_iter: usize,
    /// Gradient tolerance for convergence.
    #[serde(default = "default_tol")]
    pub tol: f64,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            c: default_c(),
            solver: Solver::default(),
            max_iter: default_max_iter(),
            tol: default_tol(),
        }
    }
}

fn default_c() -> f64 {
    1.0
}

fn default_max_iter() -> usize {
    200
}

fn default_tol() -> f64 {
    1e-4
}

/// Where the evaluation files are written before being logged.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArtifactConfig {
    /// Output directory, relative to the workspace unless absolute.
    #[serde(default = "default_artifact_dir")]
    pub dir: PathBuf,
}

impl Default for ArtifactConfig {
    fn default() -> Self {
        Self {
            dir: default_artifact_dir(),
        }
    }
}

fn default_artifact_dir() -> PathBuf {
    PathBuf::from("artifacts")
}

impl MlConfig {
    /// Load from the layered sources and validate.
    pub fn load(workspace: Option<&Path>, config_file: Option<&Path>) -> MlResult<Self> {
        let config: Self = load_config(workspace, config_file)?;
        config.validate()?;
        Ok(config)
    }

    /// Reject values the job cannot run with.
    pub fn validate(&self) -> MlResult<()> {
        let split = &self.split;
        if !(split.test_size > 0.0 && split.test_size < 1.0) {
            return Err(MlError::config(format!(
                "split.test_size must be in (0, 1), got {}",
                split.test_size
            )));
        }
        let model = &self.model;
        if !(model.c > 0.0 && model.c.is_finite()) {
            return Err(MlError::config(format!(
                "model.c must be a positive number, got {}",
                model.c
            )));
        }
        if model.max_iter == 0 {
            return Err(MlError::config("model.max_iter must be at least 1"));
        }
        if !(model.tol > 0.0 && model.tol.is_finite()) {
            return Err(MlError::config(format!(
                "model.tol must be a positive number, got {}",
                model.tol
            )));
        }
        if self.tracking.experiment_name.trim().is_empty() {
            return Err(MlError::config("tracking.experiment_name must not be empty"));
        }
        Ok(())
    }
}
