//! Feature preprocessing.

use crate::error::{MlError, MlResult};
use ndarray::{Array1, Array2, Axis};
use serde::{Deserialize, Serialize};

/// A fit-then-apply feature transformation.
pub trait Transformer {
    /// Learn the transformation's parameters from `x`.
    fn fit(&mut self, x: &Array2<f64>) -> MlResult<()>;

    /// Apply the learned transformation.
    fn transform(&self, x: &Array2<f64>) -> MlResult<Array2<f64>>;

    fn fit_transform(&mut self, x: &Array2<f64>) -> MlResult<Array2<f64>> {
        self.fit(x)?;
        self.transform(x)
    }

    fn is_fitted(&self) -> bool;
}

/// Per-feature standardisation to zero mean and unit variance.
///
/// Uses the population standard deviation. Constant columns keep a scale of
/// 1 so they map to zero instead of dividing by zero.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StandardScaler {
    mean: Option<Array1<f64>>,
    scale: Option<Array1<f64>>,
}

impl StandardScaler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn mean(&self) -> Option<&Array1<f64>> {
        self.mean.as_ref()
    }

    pub fn scale(&self) -> Option<&Array1<f64>> {
        self.scale.as_ref()
    }
}

impl Transformer for StandardScaler {
    fn fit(&mut self, x: &Array2<f64>) -> MlResult<()> {
        if x.nrows() == 0 {
            return Err(MlError::invalid_input("cannot fit scaler on zero rows"));
        }
        if x.iter().any(|v| !v.is_finite()) {
            return Err(MlError::invalid_input("scaler input contains NaN or infinity"));
        }
        let mean = x
            .mean_axis(Axis(0))
            .ok_or_else(|| MlError::invalid_input("cannot fit scaler on zero rows"))?;
        let mut scale = x.std_axis(Axis(0), 0.0);
        for (s, m) in scale.iter_mut().zip(mean.iter()) {
            if *s <= 10.0 * f64::EPSILON * m.abs().max(1.0) {
                *s = 1.0;
            }
        }
        self.mean = Some(mean);
        self.scale = Some(scale);
        Ok(())
    }

    fn transform(&self, x: &Array2<f64>) -> MlResult<Array2<f64>> {
        let (Some(mean), Some(scale)) = (&self.mean, &self.scale) else {
            return Err(MlError::model("StandardScaler is not fitted"));
        };
        if x.ncols() != mean.len() {
            return Err(MlError::model(format!(
                "scaler fitted on {} features, got {}",
                mean.len(),
                x.ncols()
            )));
        }
        let mut out = x.to_owned();
        for mut row in out.rows_mut() {
            row -= mean;
            row /= scale;
        }
        Ok(out)
    }

    fn is_fitted(&self) -> bool {
        self.mean.is_some() && self.scale.is_some()
    }
}
