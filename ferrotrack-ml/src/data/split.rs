//! Seeded train/test splitting, optionally stratified by class.
//!
//! The test partition takes `ceil(test_size * n)` rows. With stratification,
//! per-class allocations come from a largest-remainder apportionment whose
//! ties are broken by the seeded RNG, so every class keeps close to its
//! overall proportion in both halves.

use super::{Dataset, load_iris};
use crate::config::SplitConfig;
use crate::error::{MlError, MlResult};
use ndarray::{Array1, Array2};
use rand::SeedableRng;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;

/// Parameters for [`train_test_split`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SplitOptions {
    pub test_size: f64,
    pub random_state: u64,
    pub stratify: bool,
}

impl Default for SplitOptions {
    fn default() -> Self {
        Self {
            test_size: 0.2,
            random_state: 42,
            stratify: true,
        }
    }
}

impl From<&SplitConfig> for SplitOptions {
    fn from(config: &SplitConfig) -> Self {
        Self {
            test_size: config.test_size,
            random_state: config.random_state,
            stratify: config.stratify,
        }
    }
}

/// The two partitions plus the dataset row indices they were drawn from.
#[derive(Debug, Clone, PartialEq)]
pub struct Split {
    pub x_train: Array2<f64>,
    pub x_test: Array2<f64>,
    pub y_train: Array1<usize>,
    pub y_test: Array1<usize>,
    pub train_indices: Vec<usize>,
    pub test_indices: Vec<usize>,
}

impl Split {
    pub fn train_rows(&self) -> usize {
        self.train_indices.len()
    }

    pub fn test_rows(&self) -> usize {
        self.test_indices.len()
    }
}

/// Load Iris and split it with stratification.
pub fn prepare_data(test_size: f64, random_state: u64) -> MlResult<Split> {
    let iris = load_iris()?;
    train_test_split(
        &iris,
        &SplitOptions {
            test_size,
            random_state,
            stratify: true,
        },
    )
}

/// Partition `dataset` into disjoint train and test sets.
///
/// Identical inputs and seed always produce identical partitions.
pub fn train_test_split(dataset: &Dataset, options: &SplitOptions) -> MlResult<Split> {
    let n = dataset.n_samples();
    if !(options.test_size > 0.0 && options.test_size < 1.0) {
        return Err(MlError::invalid_input(format!(
            "test_size must be in (0, 1), got {}",
            options.test_size
        )));
    }
    let n_test = (options.test_size * n as f64).ceil() as usize;
    let n_train = n.saturating_sub(n_test);
    if n_test == 0 || n_train == 0 {
        return Err(MlError::invalid_input(format!(
            "test_size {} leaves an empty partition for {n} rows",
            options.test_size
        )));
    }

    let mut rng = StdRng::seed_from_u64(options.random_state);
    let (mut train, mut test) = if options.stratify {
        stratified_indices(dataset, n_train, n_test, &mut rng)?
    } else {
        let mut order: Vec<usize> = (0..n).collect();
        order.shuffle(&mut rng);
        let train = order.split_off(n_test);
        (train, order)
    };
    train.shuffle(&mut rng);
    test.shuffle(&mut rng);

    let (x_train, y_train) = dataset.select(&train);
    let (x_test, y_test) = dataset.select(&test);
    tracing::debug!(
        train_rows = train.len(),
        test_rows = test.len(),
        stratify = options.stratify,
        "Split dataset"
    );
    Ok(Split {
        x_train,
        x_test,
        y_train,
        y_test,
        train_indices: train,
        test_indices: test,
    })
}

fn stratified_indices(
    dataset: &Dataset,
    n_train: usize,
    n_test: usize,
    rng: &mut StdRng,
) -> MlResult<(Vec<usize>, Vec<usize>)> {
    let counts = dataset.class_counts();
    let present: Vec<usize> = (0..counts.len()).filter(|&c| counts[c] > 0).collect();
    let class_sizes: Vec<usize> = present.iter().map(|&c| counts[c]).collect();

    if let Some(pos) = class_sizes.iter().position(|&size| size < 2) {
        return Err(MlError::invalid_input(format!(
            "class {} has {} member(s); stratified splitting needs at least 2",
            present[pos], class_sizes[pos]
        )));
    }
    if n_test < present.len() || n_train < present.len() {
        return Err(MlError::invalid_input(format!(
            "train ({n_train}) and test ({n_test}) sizes must each be at least the number of classes ({})",
            present.len()
        )));
    }

    let train_alloc = apportion(&class_sizes, n_train, rng);
    let remaining: Vec<usize> = class_sizes
        .iter()
        .zip(&train_alloc)
        .map(|(size, taken)| size - taken)
        .collect();
    let test_alloc = apportion(&remaining, n_test, rng);

    let mut train = Vec::with_capacity(n_train);
    let mut test = Vec::with_capacity(n_test);
    for (slot, &class) in present.iter().enumerate() {
        let mut members: Vec<usize> = dataset
            .targets
            .iter()
            .enumerate()
            .filter(|&(_, &label)| label == class)
            .map(|(i, _)| i)
            .collect();
        members.shuffle(rng);
        let (n_tr, n_te) = (train_alloc[slot], test_alloc[slot]);
        train.extend_from_slice(&members[..n_tr]);
        test.extend_from_slice(&members[n_tr..n_tr + n_te]);
    }
    Ok((train, test))
}

/// Split `n_draws` across `counts` proportionally, never exceeding a count.
///
/// Floors first, then hands out the shortfall by descending fractional
/// remainder; classes sharing a remainder are visited in random order.
fn apportion(counts: &[usize], n_draws: usize, rng: &mut StdRng) -> Vec<usize> {
    let total: usize = counts.iter().sum();
    if total == 0 {
        return vec![0; counts.len()];
    }
    let continuous: Vec<f64> = counts
        .iter()
        .map(|&c| c as f64 * n_draws as f64 / total as f64)
        .collect();
    let mut alloc: Vec<usize> = continuous.iter().map(|v| v.floor() as usize).collect();
    let mut need = n_draws.saturating_sub(alloc.iter().sum());
    if need == 0 {
        return alloc;
    }

    let remainders: Vec<f64> = continuous
        .iter()
        .zip(&alloc)
        .map(|(v, &a)| v - a as f64)
        .collect();
    let mut levels = remainders.clone();
    levels.sort_by(|a, b| b.total_cmp(a));
    levels.dedup();

    for level in levels {
        let mut candidates: Vec<usize> = (0..counts.len())
            .filter(|&i| remainders[i] == level && alloc[i] < counts[i])
            .collect();
        candidates.shuffle(rng);
        for i in candidates.into_iter().take(need) {
            alloc[i] += 1;
            need -= 1;
        }
        if need == 0 {
            break;
        }
    }
    alloc
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::class_counts;
    use ndarray::array;
    use std::collections::HashSet;

    #[test]
    fn test_iris_stratified_sizes() {
        let split = prepare_data(0.2, 42).unwrap();
        assert_eq!(split.train_rows(), 120);
        assert_eq!(split.test_rows(), 30);
        assert_eq!(class_counts(&split.y_test, 3), vec![10, 10, 10]);
        assert_eq!(class_counts(&split.y_train, 3), vec![40, 40, 40]);
        assert_eq!(split.x_train.dim(), (120, 4));
        assert_eq!(split.x_test.dim(), (30, 4));
    }

    #[test]
    fn test_partitions_are_disjoint_and_cover() {
        let split = prepare_data(0.25, 7).unwrap();
        let train: HashSet<_> = split.train_indices.iter().copied().collect();
        let test: HashSet<_> = split.test_indices.iter().copied().collect();
        assert!(train.is_disjoint(&test));
        assert_eq!(train.len() + test.len(), 150);
        // ceil(0.25 * 150)
        assert_eq!(test.len(), 38);
    }

    #[test]
    fn test_same_seed_same_split() {
        let a = prepare_data(0.2, 42).unwrap();
        let b = prepare_data(0.2, 42).unwrap();
        assert_eq!(a.train_indices, b.train_indices);
        assert_eq!(a.test_indices, b.test_indices);

        let c = prepare_data(0.2, 43).unwrap();
        assert_ne!(a.test_indices, c.test_indices);
    }

    #[test]
    fn test_rows_follow_indices() {
        let iris = load_iris().unwrap();
        let split = train_test_split(&iris, &SplitOptions::default()).unwrap();
        for (row, &idx) in split.test_indices.iter().enumerate() {
            assert_eq!(split.x_test.row(row), iris.features.row(idx));
            assert_eq!(split.y_test[row], iris.targets[idx]);
        }
    }

    #[test]
    fn test_unstratified_split() {
        let iris = load_iris().unwrap();
        let options = SplitOptions {
            stratify: false,
            ..SplitOptions::default()
        };
        let split = train_test_split(&iris, &options).unwrap();
        assert_eq!(split.test_rows(), 30);
        assert_eq!(split.train_rows(), 120);
    }

    #[test]
    fn test_singleton_class_rejected() {
        let ds = Dataset::new(
            "lonely",
            array![[0.0], [1.0], [2.0], [3.0]],
            array![0, 0, 0, 1],
            Vec::new(),
            vec!["a".into(), "b".into()],
        )
        .unwrap();
        let err = train_test_split(&ds, &SplitOptions::default()).unwrap_err();
        assert!(matches!(err, MlError::InvalidInput(_)));
    }

    #[test]
    fn test_too_few_test_rows_for_classes() {
        let ds = Dataset::new(
            "three",
            array![[0.0], [1.0], [2.0], [3.0], [4.0], [5.0]],
            array![0, 0, 1, 1, 2, 2],
            Vec::new(),
            vec!["a".into(), "b".into(), "c".into()],
        )
        .unwrap();
        let options = SplitOptions {
            test_size: 0.2,
            ..SplitOptions::default()
        };
        assert!(train_test_split(&ds, &options).is_err());
    }

    #[test]
    fn test_bad_test_size_rejected() {
        let iris = load_iris().unwrap();
        for test_size in [0.0, 1.0, -0.5, f64::NAN] {
            let options = SplitOptions {
                test_size,
                ..SplitOptions::default()
            };
            assert!(train_test_split(&iris, &options).is_err(), "{test_size}");
        }
    }

    #[test]
    fn test_apportion_sums_and_bounds() {
        let mut rng = StdRng::seed_from_u64(0);
        let alloc = apportion(&[5, 3, 2], 4, &mut rng);
        assert_eq!(alloc.iter().sum::<usize>(), 4);
        assert_eq!(alloc[0], 2);
        for (a, c) in alloc.iter().zip([5, 3, 2]) {
            assert!(*a <= c);
        }
    }
}
