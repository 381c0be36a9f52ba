use rand::Rng;

use crate::node::{FeatureIndex, Impurity};

/// Criterion for measuring the quality of a split.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum SplitCriterion {
    /// Gini impurity: 1 - Σ(p_i²)
    Gini,
    /// Information entropy: -Σ(p_i · ln(p_i))
    Entropy,
}

impl SplitCriterion {
    /// Compute the impurity of a node from its class counts.
    ///
    /// Returns [`Impurity::new(0.0)`] when `n_samples` is zero (pure node).
    ///
    /// For `Gini`: `1 - Σ(p_i²)` where `p_i = count_i / n_samples`.
    /// For `Entropy`: `-Σ(p_i · ln(p_i))` summed only over classes where `p_i > 0`.
    #[must_use]
    pub fn impurity(&self, class_counts: &[usize], n_samples: usize) -> Impurity {
        if n_samples == 0 {
            return Impurity::new(0.0);
        }
        let n = n_samples as f64;
        let value = match self {
            SplitCriterion::Gini => {
                let sum_sq: f64 = class_counts
                    .iter()
                    .map(|&c| {
                        let p = c as f64 / n;
                        p * p
                    })
                    .sum();
                1.0 - sum_sq
            }
            SplitCriterion::Entropy => {
                -class_counts
                    .iter()
                    .filter(|&&c| c > 0)
                    .map(|&c| {
                        let p = c as f64 / n;
                        p * p.ln()
                    })
                    .sum::<f64>()
            }
        };
        Impurity::new(value)
    }

    /// Short lowercase name, as shown in tree drawings.
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            SplitCriterion::Gini => "gini",
            SplitCriterion::Entropy => "entropy",
        }
    }
}

/// Result of finding the best split for a node.
#[derive(Debug, Clone)]
pub(crate) struct SplitResult {
    /// Feature used for the split.
    pub(crate) feature: FeatureIndex,
    /// Threshold value.
    pub(crate) threshold: f64,
    /// Weighted impurity decrease from this split (MDI formula).
    pub(crate) impurity_decrease: f64,
    /// Sample indices going to the left child.
    pub(crate) left_indices: Vec<usize>,
    /// Sample indices going to the right child.
    pub(crate) right_indices: Vec<usize>,
}

/// Find the best split among a random subset of features.
///
/// For each of `max_features` randomly chosen features, sorts the
/// `(value, label)` pairs, scans left-to-right with incremental
/// class count updates, and tracks the globally best split by
/// weighted impurity decrease. With `max_features == n_features` every
/// feature is scanned and the shuffle only decides which of several
/// equally good splits wins.
///
/// Returns `None` when no valid split exists (all values identical,
/// or split would violate `min_samples_leaf`).
///
/// `features` is column-major: `features[feature_idx][sample_idx]`.
#[allow(clippy::too_many_arguments)]
pub(crate) fn find_best_split(
    features: &[Vec<f64>],
    labels: &[usize],
    sample_indices: &[usize],
    parent_counts: &[usize],
    criterion: SplitCriterion,
    max_features: usize,
    min_samples_leaf: usize,
    rng: &mut impl Rng,
) -> Option<SplitResult> {
    let n_features = features.len();
    let n_samples = sample_indices.len();
    let n_classes = parent_counts.len();

    if n_samples < 2 || n_features == 0 {
        return None;
    }

    let parent_impurity = criterion.impurity(parent_counts, n_samples);

    // Partial Fisher-Yates: shuffle only the first `max_features` positions.
    let mut feature_order: Vec<usize> = (0..n_features).collect();
    let take = max_features.min(n_features);
    for i in 0..take {
        let j = rng.gen_range(i..n_features);
        feature_order.swap(i, j);
    }

    let mut best_decrease = f64::NEG_INFINITY;
    let mut best: Option<(FeatureIndex, f64)> = None;

    for &feat_idx in &feature_order[..take] {
        let feat_col = &features[feat_idx];

        let mut sorted: Vec<(f64, usize)> = sample_indices
            .iter()
            .map(|&si| (feat_col[si], si))
            .collect();
        sorted.sort_unstable_by(|a, b| a.0.total_cmp(&b.0).then(a.1.cmp(&b.1)));

        // Incremental scan: left grows from empty, right shrinks from full.
        let mut left_counts = vec![0usize; n_classes];
        let mut right_counts = parent_counts.to_vec();

        for i in 0..(n_samples - 1) {
            let (val_i, si) = sorted[i];
            let class_i = labels[si];
            left_counts[class_i] += 1;
            right_counts[class_i] -= 1;

            let n_left = i + 1;
            let n_right = n_samples - n_left;

            // No boundary between equal values.
            let val_next = sorted[i + 1].0;
            if val_i == val_next {
                continue;
            }

            if n_left < min_samples_leaf || n_right < min_samples_leaf {
                continue;
            }

            let left_impurity = criterion.impurity(&left_counts, n_left);
            let right_impurity = criterion.impurity(&right_counts, n_right);

            // MDI formula (matches scikit-learn).
            let decrease = (n_samples as f64) * parent_impurity.value()
                - (n_left as f64) * left_impurity.value()
                - (n_right as f64) * right_impurity.value();

            if decrease > best_decrease {
                best_decrease = decrease;
                let mut threshold = val_i + (val_next - val_i) / 2.0;
                // Midpoint can round up to val_next for adjacent floats.
                if threshold >= val_next {
                    threshold = val_i;
                }
                best = Some((FeatureIndex::new(feat_idx), threshold));
            }
        }
    }

    let (best_feature, threshold) = best?;

    let feat_col = &features[best_feature.index()];
    let (left_indices, right_indices): (Vec<usize>, Vec<usize>) = sample_indices
        .iter()
        .copied()
        .partition(|&si| feat_col[si] <= threshold);

    Some(SplitResult {
        feature: best_feature,
        threshold,
        impurity_decrease: best_decrease,
        left_indices,
        right_indices,
    })
}
