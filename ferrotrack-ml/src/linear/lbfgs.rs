//! Limited-memory BFGS minimisation.
//!
//! Two-loop recursion over the last `history` curvature pairs, followed by a
//! backtracking line search on the Armijo condition. The first step is
//! scaled by `1 / ||g||`; later steps use the usual `s.y / y.y` scaling.
//! Pairs with `s.y <= 1e-10` are skipped so the implicit Hessian stays
//! positive definite.

use crate::error::{MlError, MlResult};
use ndarray::Array1;
use std::collections::VecDeque;

const ARMIJO_C1: f64 = 1e-4;
const MIN_CURVATURE: f64 = 1e-10;
const MIN_STEP: f64 = 1e-12;

/// A differentiable function to minimise.
pub trait Objective {
    /// Value and gradient at `x`.
    fn evaluate(&self, x: &Array1<f64>) -> MlResult<(f64, Array1<f64>)>;
}

/// Stopping criteria and memory size.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LbfgsOptions {
    pub max_iter: usize,
    /// Stop once the largest absolute gradient component is at most this.
    pub gtol: f64,
    /// Stop once the relative decrease of the objective is at most this.
    pub ftol: f64,
    pub history: usize,
    pub max_line_search: usize,
}

impl Default for LbfgsOptions {
    fn default() -> Self {
        Self {
            max_iter: 100,
            gtol: 1e-4,
            ftol: 2.220446049250313e-09,
            history: 10,
            max_line_search: 40,
        }
    }
}

/// Why the optimiser stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Termination {
    GradientTolerance,
    RelativeReduction,
    MaxIterations,
    LineSearchFailed,
}

#[derive(Debug, Clone, PartialEq)]
pub struct LbfgsReport {
    pub x: Array1<f64>,
    pub value: f64,
    pub iterations: usize,
    pub termination: Termination,
    /// Largest absolute gradient component at `x`.
    pub grad_max: f64,
}

impl LbfgsReport {
    pub fn converged(&self) -> bool {
        matches!(
            self.termination,
            Termination::GradientTolerance | Termination::RelativeReduction
        )
    }
}

struct Pair {
    s: Array1<f64>,
    y: Array1<f64>,
    rho: f64,
}

/// Minimise `objective` starting from `x0`.
pub fn minimize<O: Objective + ?Sized>(
    objective: &O,
    x0: Array1<f64>,
    options: &LbfgsOptions,
) -> MlResult<LbfgsReport> {
    let mut x = x0;
    let (mut f, mut g) = checked_eval(objective, &x)?;
    let mut history: VecDeque<Pair> = VecDeque::with_capacity(options.history);
    let mut iterations = 0;

    let termination = loop {
        if max_abs(&g) <= options.gtol {
            break Termination::GradientTolerance;
        }
        if iterations >= options.max_iter {
            break Termination::MaxIterations;
        }

        let mut direction = search_direction(&g, &history);
        let mut slope = g.dot(&direction);
        if slope >= 0.0 {
            tracing::debug!(iteration = iterations, "Not a descent direction, resetting history");
            history.clear();
            direction = -&g;
            slope = g.dot(&direction);
        }

        let Some((x_next, f_next, g_next)) =
            line_search(objective, &x, f, &direction, slope, options.max_line_search)?
        else {
            tracing::warn!(iteration = iterations, "Line search failed to decrease objective");
            break Termination::LineSearchFailed;
        };
        iterations += 1;

        let s = &x_next - &x;
        let y = &g_next - &g;
        let sy = s.dot(&y);
        if sy > MIN_CURVATURE {
            if history.len() == options.history {
                history.pop_front();
            }
            history.push_back(Pair { s, y, rho: 1.0 / sy });
        }

        let reduction = (f - f_next) / f.abs().max(f_next.abs()).max(1.0);
        x = x_next;
        f = f_next;
        g = g_next;
        if reduction <= options.ftol {
            break Termination::RelativeReduction;
        }
    };

    let grad_max = max_abs(&g);
    tracing::debug!(iterations, value = f, grad_max, ?termination, "L-BFGS finished");
    Ok(LbfgsReport {
        x,
        value: f,
        iterations,
        termination,
        grad_max,
    })
}

fn search_direction(g: &Array1<f64>, history: &VecDeque<Pair>) -> Array1<f64> {
    let mut q = g.clone();
    let mut alphas = Vec::with_capacity(history.len());
    for pair in history.iter().rev() {
        let alpha = pair.rho * pair.s.dot(&q);
        q.scaled_add(-alpha, &pair.y);
        alphas.push(alpha);
    }

    let gamma = match history.back() {
        Some(last) => last.s.dot(&last.y) / last.y.dot(&last.y),
        None => 1.0 / g.dot(g).sqrt(),
    };
    let mut r = q * gamma;

    for (pair, alpha) in history.iter().zip(alphas.iter().rev()) {
        let beta = pair.rho * pair.y.dot(&r);
        r.scaled_add(alpha - beta, &pair.s);
    }
    -r
}

type Step = (Array1<f64>, f64, Array1<f64>);

fn line_search<O: Objective + ?Sized>(
    objective: &O,
    x: &Array1<f64>,
    f: f64,
    direction: &Array1<f64>,
    slope: f64,
    max_steps: usize,
) -> MlResult<Option<Step>> {
    let mut t = 1.0;
    for _ in 0..max_steps {
        let mut candidate = x.clone();
        candidate.scaled_add(t, direction);
        let (f_new, g_new) = objective.evaluate(&candidate)?;
        if f_new.is_finite() && f_new <= f + ARMIJO_C1 * t * slope {
            if g_new.iter().any(|v| !v.is_finite()) {
                return Err(MlError::training("gradient became non-finite"));
            }
            return Ok(Some((candidate, f_new, g_new)));
        }
        t *= 0.5;
        if t < MIN_STEP {
            break;
        }
    }
    Ok(None)
}

fn checked_eval<O: Objective + ?Sized>(
    objective: &O,
    x: &Array1<f64>,
) -> MlResult<(f64, Array1<f64>)> {
    let (f, g) = objective.evaluate(x)?;
    if !f.is_finite() || g.iter().any(|v| !v.is_finite()) {
        return Err(MlError::training("objective is not finite at the starting point"));
    }
    Ok((f, g))
}

fn max_abs(v: &Array1<f64>) -> f64 {
    v.iter().fold(0.0, |acc, x| acc.max(x.abs()))
}
