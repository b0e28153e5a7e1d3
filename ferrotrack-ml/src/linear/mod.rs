//! Linear classifiers and their optimiser.

pub mod lbfgs;
pub mod logistic;

pub use lbfgs::{LbfgsOptions, LbfgsReport, Objective, minimize};
pub use logistic::LogisticRegression;

use crate::error::MlResult;
use ndarray::{Array1, Array2};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Optimiser used to fit a linear model.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Solver {
    /// Limited-memory BFGS with backtracking line search.
    #[default]
    Lbfgs,
}

impl Solver {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Lbfgs => "lbfgs",
        }
    }
}

impl fmt::Display for Solver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of a classifier fit.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FitSummary {
    /// Optimiser iterations taken.
    pub iterations: usize,
    /// Whether a stopping tolerance was met before `max_iter`.
    pub converged: bool,
    /// Objective value at the returned parameters.
    pub final_loss: f64,
}

/// A supervised classifier over integer class labels.
pub trait Classifier {
    fn fit(&mut self, x: &Array2<f64>, y: &Array1<usize>) -> MlResult<FitSummary>;

    fn predict(&self, x: &Array2<f64>) -> MlResult<Array1<usize>>;

    fn is_fitted(&self) -> bool;
}
