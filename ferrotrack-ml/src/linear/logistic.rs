//! Multinomial logistic regression with L2 regularisation.
//!
//! Minimises the mean cross-entropy of a softmax over `K` linear scores plus
//! `||W||^2 / (2 C n)`. Intercepts are not penalised. Parameters start at
//! zero, so identical data always yields an identical model.

use super::lbfgs::{LbfgsOptions, Objective, minimize};
use super::{Classifier, FitSummary, Solver};
use crate::error::{MlError, MlResult};
use ndarray::{Array1, Array2, Axis, s};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogisticRegression {
    /// Inverse regularisation strength.
    pub c: f64,
    pub solver: Solver,
    pub max_iter: usize,
    pub tol: f64,
    classes: Vec<usize>,
    /// `(n_classes, n_features)`
    coef: Option<Array2<f64>>,
    intercept: Option<Array1<f64>>,
    n_iter: usize,
    converged: bool,
}

impl Default for LogisticRegression {
    fn default() -> Self {
        Self {
            c: 1.0,
            solver: Solver::Lbfgs,
            max_iter: 100,
            tol: 1e-4,
            classes: Vec::new(),
            coef: None,
            intercept: None,
            n_iter: 0,
            converged: false,
        }
    }
}

impl LogisticRegression {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_c(mut self, c: f64) -> Self {
        self.c = c;
        self
    }

    pub fn with_solver(mut self, solver: Solver) -> Self {
        self.solver = solver;
        self
    }

    pub fn with_max_iter(mut self, max_iter: usize) -> Self {
        self.max_iter = max_iter;
        self
    }

    pub fn with_tol(mut self, tol: f64) -> Self {
        self.tol = tol;
        self
    }

    /// Distinct labels seen during fit, ascending.
    pub fn classes(&self) -> &[usize] {
        &self.classes
    }

    pub fn coef(&self) -> Option<&Array2<f64>> {
        self.coef.as_ref()
    }

    pub fn intercept(&self) -> Option<&Array1<f64>> {
        self.intercept.as_ref()
    }

    pub fn n_iter(&self) -> usize {
        self.n_iter
    }

    pub fn converged(&self) -> bool {
        self.converged
    }

    /// Linear scores, one column per class.
    pub fn decision_function(&self, x: &Array2<f64>) -> MlResult<Array2<f64>> {
        let (Some(coef), Some(intercept)) = (&self.coef, &self.intercept) else {
            return Err(MlError::model("LogisticRegression is not fitted"));
        };
        if x.ncols() != coef.ncols() {
            return Err(MlError::model(format!(
                "model fitted on {} features, got {}",
                coef.ncols(),
                x.ncols()
            )));
        }
        Ok(x.dot(&coef.t()) + intercept)
    }

    /// Class probabilities; each row sums to 1.
    pub fn predict_proba(&self, x: &Array2<f64>) -> MlResult<Array2<f64>> {
        let mut scores = self.decision_function(x)?;
        for mut row in scores.rows_mut() {
            let lse = log_sum_exp(row.iter().copied());
            row.mapv_inplace(|z| (z - lse).exp());
        }
        Ok(scores)
    }

    fn check_hyperparameters(&self) -> MlResult<()> {
        if !(self.c > 0.0 && self.c.is_finite()) {
            return Err(MlError::invalid_input(format!("C must be positive, got {}", self.c)));
        }
        if self.max_iter == 0 {
            return Err(MlError::invalid_input("max_iter must be at least 1"));
        }
        if !(self.tol > 0.0) {
            return Err(MlError::invalid_input(format!("tol must be positive, got {}", self.tol)));
        }
        Ok(())
    }
}

impl Classifier for LogisticRegression {
    fn fit(&mut self, x: &Array2<f64>, y: &Array1<usize>) -> MlResult<FitSummary> {
        self.check_hyperparameters()?;
        if x.nrows() != y.len() {
            return Err(MlError::invalid_input(format!(
                "{} rows but {} labels",
                x.nrows(),
                y.len()
            )));
        }
        if x.nrows() == 0 || x.ncols() == 0 {
            return Err(MlError::invalid_input("cannot fit on an empty matrix"));
        }
        if x.iter().any(|v| !v.is_finite()) {
            return Err(MlError::invalid_input("features contain NaN or infinity"));
        }

        let mut classes: Vec<usize> = y.to_vec();
        classes.sort_unstable();
        classes.dedup();
        if classes.len() < 2 {
            return Err(MlError::invalid_input(format!(
                "need at least 2 classes to fit, got {}",
                classes.len()
            )));
        }
        let encoded: Vec<usize> = y
            .iter()
            .map(|label| classes.binary_search(label).unwrap_or_default())
            .collect();

        let n_classes = classes.len();
        let n_features = x.ncols();
        let loss = SoftmaxLoss {
            x,
            y: &encoded,
            n_classes,
            c: self.c,
        };
        let options = LbfgsOptions {
            max_iter: self.max_iter,
            gtol: self.tol,
            ..LbfgsOptions::default()
        };
        let report = match self.solver {
            Solver::Lbfgs => minimize(
                &loss,
                Array1::zeros(n_classes * (n_features + 1)),
                &options,
            )?,
        };

        let params = loss.unpack(&report.x)?;
        self.coef = Some(params.slice(s![.., ..n_features]).to_owned());
        self.intercept = Some(params.column(n_features).to_owned());
        self.classes = classes;
        self.n_iter = report.iterations;
        self.converged = report.converged();

        if !self.converged {
            tracing::warn!(
                max_iter = self.max_iter,
                grad_max = report.grad_max,
                "LogisticRegression did not converge; consider raising max_iter"
            );
        }
        Ok(FitSummary {
            iterations: report.iterations,
            converged: self.converged,
            final_loss: report.value,
        })
    }

    /// Highest-scoring class per row; ties go to the lowest class.
    fn predict(&self, x: &Array2<f64>) -> MlResult<Array1<usize>> {
        let scores = self.decision_function(x)?;
        Ok(scores
            .axis_iter(Axis(0))
            .map(|row| {
                let mut best = 0;
                for (k, &v) in row.iter().enumerate() {
                    if v > row[best] {
                        best = k;
                    }
                }
                self.classes[best]
            })
            .collect())
    }

    fn is_fitted(&self) -> bool {
        self.coef.is_some() && self.intercept.is_some()
    }
}

/// Regularised multinomial cross-entropy over a flat parameter vector laid
/// out as `n_classes` rows of `[coef..., intercept]`.
struct SoftmaxLoss<'a> {
    x: &'a Array2<f64>,
    y: &'a [usize],
    n_classes: usize,
    c: f64,
}

impl SoftmaxLoss<'_> {
    fn unpack(&self, w: &Array1<f64>) -> MlResult<Array2<f64>> {
        Array2::from_shape_vec((self.n_classes, self.x.ncols() + 1), w.to_vec())
            .map_err(|e| MlError::training(format!("parameter shape: {e}")))
    }
}

impl Objective for SoftmaxLoss<'_> {
    fn evaluate(&self, w: &Array1<f64>) -> MlResult<(f64, Array1<f64>)> {
        let n = self.x.nrows() as f64;
        let d = self.x.ncols();
        let params = self.unpack(w)?;
        let coef = params.slice(s![.., ..d]);
        let intercept = params.column(d);

        let mut residual = self.x.dot(&coef.t()) + &intercept;
        let mut loss = 0.0;
        for (mut row, &label) in residual.rows_mut().into_iter().zip(self.y) {
            let lse = log_sum_exp(row.iter().copied());
            loss += lse - row[label];
            row.mapv_inplace(|z| (z - lse).exp());
            row[label] -= 1.0;
        }

        let penalty = 1.0 / (self.c * n);
        let coef_sq: f64 = coef.iter().map(|v| v * v).sum();
        let value = loss / n + 0.5 * penalty * coef_sq;

        let mut grad = Array2::<f64>::zeros(params.dim());
        let grad_coef = residual.t().dot(self.x) / n + &coef * penalty;
        grad.slice_mut(s![.., ..d]).assign(&grad_coef);
        grad.column_mut(d).assign(&(residual.sum_axis(Axis(0)) / n));
        Ok((value, grad.iter().copied().collect()))
    }
}

fn log_sum_exp(values: impl Iterator<Item = f64> + Clone) -> f64 {
    let max = values.clone().fold(f64::NEG_INFINITY, f64::max);
    if !max.is_finite() {
        return max;
    }
    max + values.map(|v| (v - max).exp()).sum::<f64>().ln()
}
