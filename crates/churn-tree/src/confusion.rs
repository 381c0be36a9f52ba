//! Confusion matrix and per-class classification metrics.

use crate::error::TreeError;

/// A confusion matrix for classification.
///
/// Entry `matrix[true_class][predicted_class]` counts how many samples
/// with true label `true_class` were predicted as `predicted_class`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfusionMatrix {
    matrix: Vec<Vec<usize>>,
    n_classes: usize,
}

/// Per-class precision, recall, and F1 score.
#[derive(Debug, Clone, serde::Serialize)]
pub struct ClassMetrics {
    /// The class index.
    pub class: usize,
    /// Precision: TP / (TP + FP). 0.0 if no predictions for this class.
    pub precision: f64,
    /// Recall: TP / (TP + FN). 0.0 if no true samples for this class.
    pub recall: f64,
    /// F1: 2 * precision * recall / (precision + recall). 0.0 if both are zero.
    pub f1: f64,
    /// Number of true samples in this class.
    pub support: usize,
}

impl ConfusionMatrix {
    /// Build a confusion matrix from true and predicted labels.
    ///
    /// # Errors
    ///
    /// | Variant | Condition |
    /// |---|---|
    /// | [`TreeError::EmptyDataset`] | Zero labels provided |
    /// | [`TreeError::LabelCountMismatch`] | Slices differ in length |
    /// | [`TreeError::ClassOutOfRange`] | A label is `>= n_classes` |
    pub fn from_labels(
        true_labels: &[usize],
        predicted: &[usize],
        n_classes: usize,
    ) -> Result<Self, TreeError> {
        if true_labels.is_empty() {
            return Err(TreeError::EmptyDataset);
        }
        if true_labels.len() != predicted.len() {
            return Err(TreeError::LabelCountMismatch {
                samples: true_labels.len(),
                labels: predicted.len(),
            });
        }
        let mut matrix = vec![vec![0usize; n_classes]; n_classes];
        for (&t, &p) in true_labels.iter().zip(predicted) {
            if let Some(class) = [t, p].into_iter().find(|&c| c >= n_classes) {
                return Err(TreeError::ClassOutOfRange { class, n_classes });
            }
            matrix[t][p] += 1;
        }
        Ok(Self { matrix, n_classes })
    }

    /// Overall accuracy: proportion of correct predictions.
    #[must_use]
    pub fn accuracy(&self) -> f64 {
        let correct: usize = (0..self.n_classes).map(|i| self.matrix[i][i]).sum();
        let total = self.total();
        if total == 0 {
            0.0
        } else {
            correct as f64 / total as f64
        }
    }

    /// Number of samples counted in the matrix.
    #[must_use]
    pub fn total(&self) -> usize {
        self.matrix.iter().flat_map(|row| row.iter()).sum()
    }

    /// Per-class precision, recall, F1, and support.
    ///
    /// Column sums give each class's predicted count, row sums its support.
    #[must_use]
    pub fn class_metrics(&self) -> Vec<ClassMetrics> {
        let ratio = |num: usize, den: usize| if den == 0 { 0.0 } else { num as f64 / den as f64 };
        (0..self.n_classes)
            .map(|c| {
                let tp = self.matrix[c][c];
                let predicted: usize = self.matrix.iter().map(|row| row[c]).sum();
                let support: usize = self.matrix[c].iter().sum();
                let precision = ratio(tp, predicted);
                let recall = ratio(tp, support);
                let f1 = if precision + recall > 0.0 {
                    2.0 * precision * recall / (precision + recall)
                } else {
                    0.0
                };
                ClassMetrics {
                    class: c,
                    precision,
                    recall,
                    f1,
                    support,
                }
            })
            .collect()
    }

    /// Return the underlying matrix rows.
    #[must_use]
    pub fn as_rows(&self) -> &[Vec<usize>] {
        &self.matrix
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn perfect_predictions() {
        let labels = vec![0, 0, 1, 1];
        let cm = ConfusionMatrix::from_labels(&labels, &labels, 2).unwrap();
        assert!((cm.accuracy() - 1.0).abs() < f64::EPSILON);
        for m in cm.class_metrics() {
            assert!((m.f1 - 1.0).abs() < f64::EPSILON);
        }
    }

    #[test]
    fn known_binary_matrix() {
        // true:  0 0 0 0 1 1 1 1
        // pred:  0 0 0 1 1 1 0 1
        let true_labels = vec![0, 0, 0, 0, 1, 1, 1, 1];
        let predicted = vec![0, 0, 0, 1, 1, 1, 0, 1];
        let cm = ConfusionMatrix::from_labels(&true_labels, &predicted, 2).unwrap();
        assert_eq!(cm.as_rows(), &[vec![3, 1], vec![1, 3]]);
        assert_eq!(cm.total(), 8);
        assert!((cm.accuracy() - 0.75).abs() < 1e-10);

        let metrics = cm.class_metrics();
        assert!((metrics[1].precision - 0.75).abs() < 1e-10);
        assert!((metrics[1].recall - 0.75).abs() < 1e-10);
        assert_eq!(metrics[1].support, 4);
    }

    #[test]
    fn empty_labels_error() {
        let err = ConfusionMatrix::from_labels(&[], &[], 2).unwrap_err();
        assert!(matches!(err, TreeError::EmptyDataset));
    }

    #[test]
    fn out_of_range_class_error() {
        let err = ConfusionMatrix::from_labels(&[0, 1], &[0, 2], 2).unwrap_err();
        assert!(matches!(err, TreeError::ClassOutOfRange { class: 2, n_classes: 2 }));
    }

    #[test]
    fn zero_support_class_metrics() {
        let labels = vec![0, 0];
        let cm = ConfusionMatrix::from_labels(&labels, &labels, 2).unwrap();
        let metrics = cm.class_metrics();
        assert_eq!(metrics[1].support, 0);
        assert_eq!(metrics[1].recall, 0.0);
        assert_eq!(metrics[1].precision, 0.0);
    }

    #[test]
    fn minority_class_metrics() {
        // Five stayers, two churners; one of each is misclassified.
        let true_labels = vec![0, 0, 0, 0, 0, 1, 1];
        let predicted = vec![0, 0, 0, 0, 1, 1, 0];
        let metrics = ConfusionMatrix::from_labels(&true_labels, &predicted, 2)
            .unwrap()
            .class_metrics();
        assert!((metrics[0].precision - 0.8).abs() < 1e-10);
        assert!((metrics[0].recall - 0.8).abs() < 1e-10);
        assert!((metrics[1].f1 - 0.5).abs() < 1e-10);
        assert_eq!(metrics[1].support, 2);
    }
}
