//! Classification metrics.

use crate::error::{MlError, MlResult};
use ndarray::{Array1, Array2};
use serde::{Deserialize, Serialize};

/// Fraction of positions where `y_pred` equals `y_true`.
pub fn accuracy_score(y_true: &Array1<usize>, y_pred: &Array1<usize>) -> MlResult<f64> {
    check_lengths(y_true, y_pred)?;
    let correct = y_true
        .iter()
        .zip(y_pred.iter())
        .filter(|(t, p)| t == p)
        .count();
    Ok(correct as f64 / y_true.len() as f64)
}

/// Counts of (true label, predicted label) pairs.
///
/// Rows are true labels and columns predicted labels, both in the order of
/// `labels`, which is the sorted union of labels seen in either input.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfusionMatrix {
    pub labels: Vec<usize>,
    pub counts: Array2<u64>,
}

impl ConfusionMatrix {
    pub fn n_labels(&self) -> usize {
        self.labels.len()
    }

    pub fn total(&self) -> u64 {
        self.counts.sum()
    }

    /// Correct predictions (the diagonal sum).
    pub fn correct(&self) -> u64 {
        self.counts.diag().sum()
    }

    /// Number of samples per true label.
    pub fn support(&self) -> Vec<u64> {
        self.counts.rows().into_iter().map(|r| r.sum()).collect()
    }

    pub fn accuracy(&self) -> f64 {
        match self.total() {
            0 => 0.0,
            total => self.correct() as f64 / total as f64,
        }
    }

    /// Comma-separated integers, one line per true label, no header.
    pub fn to_csv(&self) -> MlResult<String> {
        let mut writer = csv::WriterBuilder::new()
            .has_headers(false)
            .from_writer(Vec::new());
        for row in self.counts.rows() {
            writer.write_record(row.iter().map(u64::to_string))?;
        }
        let bytes = writer.into_inner().map_err(|e| MlError::Io(e.into_error()))?;
        String::from_utf8(bytes).map_err(|e| MlError::model(format!("confusion matrix CSV: {e}")))
    }
}

/// Tabulate predictions against ground truth.
pub fn confusion_matrix(
    y_true: &Array1<usize>,
    y_pred: &Array1<usize>,
) -> MlResult<ConfusionMatrix> {
    check_lengths(y_true, y_pred)?;
    let mut labels: Vec<usize> = y_true.iter().chain(y_pred.iter()).copied().collect();
    labels.sort_unstable();
    labels.dedup();

    let mut counts = Array2::<u64>::zeros((labels.len(), labels.len()));
    for (t, p) in y_true.iter().zip(y_pred.iter()) {
        if let (Ok(row), Ok(col)) = (labels.binary_search(t), labels.binary_search(p)) {
            counts[[row, col]] += 1;
        }
    }
    Ok(ConfusionMatrix { labels, counts })
}

fn check_lengths(y_true: &Array1<usize>, y_pred: &Array1<usize>) -> MlResult<()> {
    if y_true.len() != y_pred.len() {
        return Err(MlError::invalid_input(format!(
            "y_true has {} labels but y_pred has {}",
            y_true.len(),
            y_pred.len()
        )));
    }
    if y_true.is_empty() {
        return Err(MlError::invalid_input("cannot score empty label arrays"));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_accuracy() {
        let y_true = array![0, 1, 2, 2];
        let y_pred = array![0, 2, 2, 2];
        assert_eq!(accuracy_score(&y_true, &y_pred).unwrap(), 0.75);
        assert_eq!(accuracy_score(&y_true, &y_true).unwrap(), 1.0);
    }

    #[test]
    fn test_confusion_matrix_layout() {
        let y_true = array![0, 0, 1, 2, 2, 2];
        let y_pred = array![0, 1, 1, 2, 2, 0];
        let cm = confusion_matrix(&y_true, &y_pred).unwrap();
        assert_eq!(cm.labels, vec![0, 1, 2]);
        assert_eq!(cm.counts, array![[1, 1, 0], [0, 1, 0], [1, 0, 2]]);
        assert_eq!(cm.total(), 6);
        assert_eq!(cm.correct(), 4);
        assert_eq!(cm.support(), vec![2, 1, 3]);
        assert_eq!(cm.to_csv().unwrap(), "1,1,0\n0,1,0\n1,0,2\n");
        assert!((cm.accuracy() - accuracy_score(&y_true, &y_pred).unwrap()).abs() < 1e-15);
    }

    #[test]
    fn test_labels_are_union_of_both_inputs() {
        let y_true = array![1, 1];
        let y_pred = array![1, 4];
        let cm = confusion_matrix(&y_true, &y_pred).unwrap();
        assert_eq!(cm.labels, vec![1, 4]);
        assert_eq!(cm.counts, array![[1, 1], [0, 0]]);
    }

    #[test]
    fn test_length_mismatch_and_empty() {
        assert!(matches!(
            accuracy_score(&array![0, 1], &array![0]),
            Err(MlError::InvalidInput(_))
        ));
        let empty: Array1<usize> = Array1::from(Vec::new());
        assert!(confusion_matrix(&empty, &empty).is_err());
    }
}
