use std::fmt;

/// Zero-based feature column index.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash,
    serde::Serialize, serde::Deserialize,
)]
pub struct FeatureIndex(usize);

impl FeatureIndex {
    /// Create a new feature index from a zero-based column position.
    pub(crate) fn new(index: usize) -> Self {
        Self(index)
    }

    /// Return the zero-based feature column index.
    #[must_use]
    pub fn index(self) -> usize {
        self.0
    }
}

impl fmt::Display for FeatureIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Index into a `Vec<Node>` arena, identifying a specific node in a decision tree.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash,
    serde::Serialize, serde::Deserialize,
)]
pub struct NodeIndex(usize);

impl NodeIndex {
    /// Create a new node index from a zero-based arena position.
    pub(crate) fn new(index: usize) -> Self {
        Self(index)
    }

    /// Return the zero-based arena index.
    #[must_use]
    pub fn index(self) -> usize {
        self.0
    }
}

impl fmt::Display for NodeIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Criterion-agnostic impurity value (Gini or Entropy).
#[derive(
    Debug, Clone, Copy, PartialEq, PartialOrd,
    serde::Serialize, serde::Deserialize,
)]
pub struct Impurity(f64);

impl Impurity {
    /// Create a new impurity value.
    pub(crate) fn new(value: f64) -> Self {
        Self(value)
    }

    /// Return the raw impurity value.
    #[must_use]
    pub fn value(self) -> f64 {
        self.0
    }
}

impl fmt::Display for Impurity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.6}", self.0)
    }
}

/// A node in a decision tree arena.
///
/// Trees are stored as `Vec<Node>` where children are referenced by
/// [`NodeIndex`] rather than pointers. Both variants keep the training
/// class counts that reached them so the tree can be drawn without the
/// training data.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub enum Node {
    /// An interior split node.
    Split {
        /// Feature used for the split.
        feature: FeatureIndex,
        /// Threshold value: samples with feature <= threshold go left.
        threshold: f64,
        /// Index of the left child node.
        left: NodeIndex,
        /// Index of the right child node.
        right: NodeIndex,
        /// Impurity at this node before splitting.
        impurity: Impurity,
        /// Number of training samples that reached this node.
        n_samples: usize,
        /// Weighted decrease in impurity from this split.
        impurity_decrease: f64,
        /// Training samples per class at this node.
        class_counts: Vec<usize>,
    },
    /// A terminal leaf node.
    Leaf {
        /// Predicted class (argmax of distribution).
        prediction: usize,
        /// Normalized class probability distribution.
        distribution: Vec<f64>,
        /// Training samples per class in this leaf.
        class_counts: Vec<usize>,
        /// Impurity at this leaf.
        impurity: Impurity,
        /// Number of training samples in this leaf.
        n_samples: usize,
    },
}

impl Node {
    /// Return the impurity at this node (before splitting for interior nodes).
    #[must_use]
    pub fn impurity(&self) -> Impurity {
        match self {
            Node::Split { impurity, .. } | Node::Leaf { impurity, .. } => *impurity,
        }
    }

    /// Return the number of training samples that reached this node.
    #[must_use]
    pub fn n_samples(&self) -> usize {
        match self {
            Node::Split { n_samples, .. } | Node::Leaf { n_samples, .. } => *n_samples,
        }
    }

    /// Return the training class counts at this node.
    #[must_use]
    pub fn class_counts(&self) -> &[usize] {
        match self {
            Node::Split { class_counts, .. } | Node::Leaf { class_counts, .. } => class_counts,
        }
    }

    /// Return the majority class at this node; ties go to the lowest class.
    #[must_use]
    pub fn majority_class(&self) -> usize {
        majority(self.class_counts())
    }

    /// Return `true` if this node is a leaf.
    #[must_use]
    pub fn is_leaf(&self) -> bool {
        matches!(self, Node::Leaf { .. })
    }
}

/// Argmax of class counts, preferring the lowest class index on ties.
pub(crate) fn majority(class_counts: &[usize]) -> usize {
    let mut best = 0usize;
    for (class, &count) in class_counts.iter().enumerate() {
        if count > class_counts[best] {
            best = class;
        }
    }
    best
}

#[cfg(test)]
mod tests {
    use super::{FeatureIndex, Impurity, Node, NodeIndex, majority};

    #[test]
    fn feature_index_roundtrip() {
        let fi = FeatureIndex::new(7);
        assert_eq!(fi.index(), 7);
        assert_eq!(format!("{fi}"), "7");
    }

    #[test]
    fn node_index_ordering() {
        let a = NodeIndex::new(10);
        let b = NodeIndex::new(20);
        assert!(a < b);
    }

    #[test]
    fn impurity_display() {
        let imp = Impurity::new(0.333333);
        assert_eq!(format!("{imp}"), "0.333333");
    }

    fn make_leaf() -> Node {
        Node::Leaf {
            prediction: 1,
            distribution: vec![0.2, 0.8],
            class_counts: vec![2, 8],
            impurity: Impurity::new(0.32),
            n_samples: 10,
        }
    }

    fn make_split() -> Node {
        Node::Split {
            feature: FeatureIndex::new(2),
            threshold: 3.5,
            left: NodeIndex::new(1),
            right: NodeIndex::new(2),
            impurity: Impurity::new(0.48),
            n_samples: 20,
            impurity_decrease: 0.16,
            class_counts: vec![12, 8],
        }
    }

    #[test]
    fn leaf_is_leaf() {
        assert!(make_leaf().is_leaf());
        assert!(!make_split().is_leaf());
    }

    #[test]
    fn n_samples_and_impurity() {
        assert_eq!(make_leaf().n_samples(), 10);
        assert_eq!(make_split().n_samples(), 20);
        assert!((make_split().impurity().value() - 0.48).abs() < f64::EPSILON);
    }

    #[test]
    fn majority_class_of_nodes() {
        assert_eq!(make_leaf().majority_class(), 1);
        assert_eq!(make_split().majority_class(), 0);
    }

    #[test]
    fn majority_ties_go_to_lowest_class() {
        assert_eq!(majority(&[3, 3]), 0);
        assert_eq!(majority(&[1, 4, 4]), 1);
        assert_eq!(majority(&[]), 0);
    }
}
