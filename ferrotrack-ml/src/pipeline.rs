//! The two-step model: standardisation followed by logistic regression.

use crate::config::{ModelConfig, SplitConfig};
use crate::error::{MlError, MlResult};
use crate::linear::{Classifier, FitSummary, LogisticRegression};
use crate::preprocessing::{StandardScaler, Transformer};
use ndarray::{Array1, Array2};
use serde::{Deserialize, Serialize};

pub const SCALER_STEP: &str = "scaler";
pub const CLASSIFIER_STEP: &str = "logreg";

/// A fitted (or unfitted) scaler + classifier chain.
///
/// Fitting learns the scaler on the training rows and trains the classifier
/// on their scaled values; prediction applies the same scaling first.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Pipeline {
    pub scaler: StandardScaler,
    pub logreg: LogisticRegression,
}

/// Build an unfitted pipeline from configured hyperparameters.
pub fn build_model(config: &ModelConfig) -> Pipeline {
    Pipeline {
        scaler: StandardScaler::new(),
        logreg: LogisticRegression::new()
            .with_c(config.c)
            .with_solver(config.solver)
            .with_max_iter(config.max_iter)
            .with_tol(config.tol),
    }
}

impl Pipeline {
    pub fn step_names(&self) -> [&'static str; 2] {
        [SCALER_STEP, CLASSIFIER_STEP]
    }

    pub fn fit(&mut self, x: &Array2<f64>, y: &Array1<usize>) -> MlResult<FitSummary> {
        let scaled = self.scaler.fit_transform(x)?;
        let summary = self.logreg.fit(&scaled, y)?;
        tracing::info!(
            iterations = summary.iterations,
            converged = summary.converged,
            loss = summary.final_loss,
            "Fitted pipeline"
        );
        Ok(summary)
    }

    pub fn predict(&self, x: &Array2<f64>) -> MlResult<Array1<usize>> {
        self.ensure_fitted()?;
        let scaled = self.scaler.transform(x)?;
        self.logreg.predict(&scaled)
    }

    pub fn predict_proba(&self, x: &Array2<f64>) -> MlResult<Array2<f64>> {
        self.ensure_fitted()?;
        let scaled = self.scaler.transform(x)?;
        self.logreg.predict_proba(&scaled)
    }

    pub fn is_fitted(&self) -> bool {
        self.scaler.is_fitted() && self.logreg.is_fitted()
    }

    /// The run's tracking params: the split that produced the training rows,
    /// then the classifier hyperparameters keyed `model_<name>`.
    pub fn params(&self, split: &SplitConfig) -> Vec<(&'static str, String)> {
        vec![
            ("test_size", format_float(split.test_size)),
            ("random_state", split.random_state.to_string()),
            ("model_C", format_float(self.logreg.c)),
            ("model_solver", self.logreg.solver.to_string()),
            ("model_max_iter", self.logreg.max_iter.to_string()),
        ]
    }

    fn ensure_fitted(&self) -> MlResult<()> {
        if self.is_fitted() {
            Ok(())
        } else {
            Err(MlError::model("pipeline is not fitted"))
        }
    }
}

/// Render a float param the way it is stored in the tracking store: always
/// with a decimal point, so `1.0` stays `"1.0"` rather than `"1"`.
pub fn format_float(value: f64) -> String {
    format!("{value:?}")
}
