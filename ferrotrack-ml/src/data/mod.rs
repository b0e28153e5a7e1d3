//! Datasets and train/test splitting.

pub mod iris;
pub mod split;

pub use iris::load_iris;
pub use split::{Split, SplitOptions, prepare_data, train_test_split};

use crate::error::{MlError, MlResult};
use ndarray::{Array1, Array2, Axis};
use sha2::{Digest, Sha256};

/// An in-memory labelled tabular dataset.
#[derive(Debug, Clone, PartialEq)]
pub struct Dataset {
    pub name: String,
    pub features: Array2<f64>,
    pub targets: Array1<usize>,
    pub feature_names: Vec<String>,
    pub target_names: Vec<String>,
}

impl Dataset {
    /// Build a dataset, checking that shapes and label ranges agree.
    pub fn new(
        name: impl Into<String>,
        features: Array2<f64>,
        targets: Array1<usize>,
        feature_names: Vec<String>,
        target_names: Vec<String>,
    ) -> MlResult<Self> {
        if features.nrows() != targets.len() {
            return Err(MlError::dataset(format!(
                "{} feature rows but {} targets",
                features.nrows(),
                targets.len()
            )));
        }
        if !feature_names.is_empty() && feature_names.len() != features.ncols() {
            return Err(MlError::dataset(format!(
                "{} feature names for {} columns",
                feature_names.len(),
                features.ncols()
            )));
        }
        if let Some(bad) = targets.iter().find(|&&t| t >= target_names.len()) {
            return Err(MlError::dataset(format!(
                "label {bad} out of range for {} classes",
                target_names.len()
            )));
        }
        Ok(Self {
            name: name.into(),
            features,
            targets,
            feature_names,
            target_names,
        })
    }

    pub fn n_samples(&self) -> usize {
        self.features.nrows()
    }

    pub fn n_features(&self) -> usize {
        self.features.ncols()
    }

    pub fn n_classes(&self) -> usize {
        self.target_names.len()
    }

    /// Number of rows per class label, indexed by label.
    pub fn class_counts(&self) -> Vec<usize> {
        class_counts(&self.targets, self.n_classes())
    }

    /// Rows at `indices`, in that order.
    pub fn select(&self, indices: &[usize]) -> (Array2<f64>, Array1<usize>) {
        (
            self.features.select(Axis(0), indices),
            self.targets.select(Axis(0), indices),
        )
    }

    /// SHA-256 over the feature values and labels, for lineage tags.
    pub fn digest(&self) -> String {
        let mut hasher = Sha256::new();
        for value in self.features.iter() {
            hasher.update(value.to_le_bytes());
        }
        for target in self.targets.iter() {
            hasher.update((*target as u64).to_le_bytes());
        }
        format!("{:x}", hasher.finalize())
    }
}

/// Count labels in `0..n_classes`; labels beyond are grown into.
pub fn class_counts(labels: &Array1<usize>, n_classes: usize) -> Vec<usize> {
    let mut counts = vec![0; n_classes];
    for &label in labels {
        if label >= counts.len() {
            counts.resize(label + 1, 0);
        }
        counts[label] += 1;
    }
    counts
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    fn tiny() -> Dataset {
        Dataset::new(
            "tiny",
            array![[0.0, 1.0], [2.0, 3.0], [4.0, 5.0]],
            array![0, 1, 1],
            vec!["a".into(), "b".into()],
            vec!["neg".into(), "pos".into()],
        )
        .unwrap()
    }

    #[test]
    fn test_shape_mismatch_rejected() {
        let err = Dataset::new(
            "bad",
            array![[0.0], [1.0]],
            array![0],
            Vec::new(),
            vec!["x".into()],
        )
        .unwrap_err();
        assert!(matches!(err, MlError::Dataset(_)));
    }

    #[test]
    fn test_label_out_of_range_rejected() {
        let err = Dataset::new("bad", array![[0.0]], array![3], Vec::new(), vec!["x".into()]);
        assert!(err.is_err());
    }

    #[test]
    fn test_select_and_counts() {
        let ds = tiny();
        assert_eq!(ds.class_counts(), vec![1, 2]);
        let (x, y) = ds.select(&[2, 0]);
        assert_eq!(x, array![[4.0, 5.0], [0.0, 1.0]]);
        assert_eq!(y, array![1, 0]);
    }

    #[test]
    fn test_digest_is_stable_and_content_sensitive() {
        let a = tiny();
        let mut b = tiny();
        assert_eq!(a.digest(), b.digest());
        assert_eq!(a.digest().len(), 64);
        b.features[[0, 0]] = 0.5;
        assert_ne!(a.digest(), b.digest());
    }
}
