//! Property-based tests for classification metrics and splitting.

use ndarray::Array1;
use proptest::prelude::*;

use ferrotrack_ml::data::class_counts;
use ferrotrack_ml::{SplitOptions, accuracy_score, confusion_matrix, load_iris, train_test_split};

fn label_pairs() -> impl Strategy<Value = (Vec<usize>, Vec<usize>)> {
    (1usize..60).prop_flat_map(|n| {
        (
            prop::collection::vec(0usize..5, n),
            prop::collection::vec(0usize..5, n),
        )
    })
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn accuracy_is_a_fraction((y_true, y_pred) in label_pairs()) {
        let acc = accuracy_score(&Array1::from(y_true), &Array1::from(y_pred)).unwrap();
        prop_assert!((0.0..=1.0).contains(&acc));
    }

    #[test]
    fn confusion_rows_count_true_labels((y_true, y_pred) in label_pairs()) {
        let y_true = Array1::from(y_true);
        let y_pred = Array1::from(y_pred);
        let cm = confusion_matrix(&y_true, &y_pred).unwrap();

        prop_assert_eq!(cm.counts.nrows(), cm.counts.ncols());
        prop_assert_eq!(cm.total(), y_true.len() as u64);
        for (row, label) in cm.labels.iter().enumerate() {
            let expected = y_true.iter().filter(|&&t| t == *label).count() as u64;
            prop_assert_eq!(cm.counts.row(row).sum(), expected);
        }
    }

    #[test]
    fn confusion_diagonal_agrees_with_accuracy((y_true, y_pred) in label_pairs()) {
        let y_true = Array1::from(y_true);
        let y_pred = Array1::from(y_pred);
        let cm = confusion_matrix(&y_true, &y_pred).unwrap();
        let acc = accuracy_score(&y_true, &y_pred).unwrap();
        prop_assert!((cm.accuracy() - acc).abs() < 1e-12);
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(16))]

    #[test]
    fn stratified_split_keeps_class_balance(seed in any::<u64>(), test_size in 0.1f64..0.5) {
        let iris = load_iris().unwrap();
        let options = SplitOptions { test_size, random_state: seed, stratify: true };
        let split = train_test_split(&iris, &options).unwrap();

        let expected_test = (test_size * 150.0).ceil() as usize;
        prop_assert_eq!(split.test_rows(), expected_test);
        prop_assert_eq!(split.train_rows() + split.test_rows(), 150);

        // Each class gets its proportional share, give or take one row.
        let share = expected_test as f64 / 3.0;
        for count in class_counts(&split.y_test, 3) {
            prop_assert!((count as f64 - share).abs() < 1.0 + 1e-9, "count {} vs share {}", count, share);
        }
    }
}
