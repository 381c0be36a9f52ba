use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use tracing::{debug, instrument};

use crate::{
    TreeError,
    node::{Node, NodeIndex, majority},
    split::{SplitCriterion, find_best_split},
};

/// Configuration for a single CART decision tree.
///
/// Construct via [`DecisionTreeConfig::new`], then chain `with_*` methods.
///
/// # Defaults
///
/// | Parameter           | Default               |
/// |---------------------|-----------------------|
/// | `criterion`         | `Gini`                |
/// | `max_depth`         | `None` (unlimited)    |
/// | `min_samples_split` | 2                     |
/// | `min_samples_leaf`  | 1                     |
/// | `max_features`      | `None` (all features) |
/// | `n_classes`         | `None` (max label + 1)|
/// | `seed`              | 42                    |
#[derive(Debug, Clone)]
pub struct DecisionTreeConfig {
    pub(crate) criterion: SplitCriterion,
    pub(crate) max_depth: Option<usize>,
    pub(crate) min_samples_split: usize,
    pub(crate) min_samples_leaf: usize,
    pub(crate) max_features: Option<usize>,
    pub(crate) n_classes: Option<usize>,
    pub(crate) seed: u64,
}

impl DecisionTreeConfig {
    /// Create a new config with default values.
    #[must_use]
    pub fn new() -> Self {
        Self {
            criterion: SplitCriterion::Gini,
            max_depth: None,
            min_samples_split: 2,
            min_samples_leaf: 1,
            max_features: None,
            n_classes: None,
            seed: 42,
        }
    }

    /// Set the split quality criterion.
    #[must_use]
    pub fn with_criterion(mut self, criterion: SplitCriterion) -> Self {
        self.criterion = criterion;
        self
    }

    /// Set the maximum tree depth.
    ///
    /// `None` means grow until all leaves are pure or stopping conditions
    /// are met. `Some(d)` limits depth to `d` levels (root is depth 0).
    #[must_use]
    pub fn with_max_depth(mut self, max_depth: Option<usize>) -> Self {
        self.max_depth = max_depth;
        self
    }

    /// Set the minimum number of samples required to attempt a split.
    #[must_use]
    pub fn with_min_samples_split(mut self, min_samples_split: usize) -> Self {
        self.min_samples_split = min_samples_split;
        self
    }

    /// Set the minimum number of samples required in each leaf after a split.
    #[must_use]
    pub fn with_min_samples_leaf(mut self, min_samples_leaf: usize) -> Self {
        self.min_samples_leaf = min_samples_leaf;
        self
    }

    /// Set the maximum number of features to consider at each split.
    ///
    /// `None` means consider all features.
    #[must_use]
    pub fn with_max_features(mut self, max_features: Option<usize>) -> Self {
        self.max_features = max_features;
        self
    }

    /// Fix the number of classes instead of inferring it from the labels.
    ///
    /// Needed when a training subset may lack the highest class.
    #[must_use]
    pub fn with_n_classes(mut self, n_classes: Option<usize>) -> Self {
        self.n_classes = n_classes;
        self
    }

    /// Set the random seed for reproducibility.
    #[must_use]
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    // --- Getters ---

    /// Return the split criterion.
    #[must_use]
    pub fn criterion(&self) -> SplitCriterion {
        self.criterion
    }

    /// Return the maximum depth limit, if any.
    #[must_use]
    pub fn max_depth(&self) -> Option<usize> {
        self.max_depth
    }

    /// Return the minimum samples required to split a node.
    #[must_use]
    pub fn min_samples_split(&self) -> usize {
        self.min_samples_split
    }

    /// Return the minimum samples required in each leaf.
    #[must_use]
    pub fn min_samples_leaf(&self) -> usize {
        self.min_samples_leaf
    }

    /// Return the maximum features to consider per split, if set.
    #[must_use]
    pub fn max_features(&self) -> Option<usize> {
        self.max_features
    }

    /// Return the fixed class count, if set.
    #[must_use]
    pub fn n_classes(&self) -> Option<usize> {
        self.n_classes
    }

    /// Return the random seed.
    #[must_use]
    pub fn seed(&self) -> u64 {
        self.seed
    }

    /// Train a decision tree on the provided row-major dataset.
    ///
    /// `features[sample_idx][feature_idx]`, row-major.
    /// `labels[sample_idx]`: zero-based class labels.
    ///
    /// # Errors
    ///
    /// | Variant                                | When                                            |
    /// |----------------------------------------|-------------------------------------------------|
    /// | [`TreeError::EmptyDataset`]            | `features` is empty                             |
    /// | [`TreeError::ZeroFeatures`]            | rows have zero feature columns                  |
    /// | [`TreeError::LabelCountMismatch`]      | `labels.len() != features.len()`                |
    /// | [`TreeError::FeatureCountMismatch`]    | rows have inconsistent lengths                  |
    /// | [`TreeError::NonFiniteValue`]          | any value is NaN or infinite                    |
    /// | [`TreeError::ClassOutOfRange`]         | a label is `>= n_classes` when it is fixed      |
    /// | [`TreeError::InvalidMaxFeatures`]      | `max_features` resolves outside [1, n_features] |
    /// | [`TreeError::InvalidMaxDepth`]         | `max_depth` is `Some(0)`                        |
    /// | [`TreeError::InvalidMinSamplesSplit`]  | `min_samples_split` < 2                         |
    /// | [`TreeError::InvalidMinSamplesLeaf`]   | `min_samples_leaf` < 1                          |
    #[instrument(skip(self, features, labels), fields(n_samples = features.len()))]
    pub fn fit(&self, features: &[Vec<f64>], labels: &[usize]) -> Result<DecisionTree, TreeError> {
        // --- Validate inputs ---
        if features.is_empty() {
            return Err(TreeError::EmptyDataset);
        }

        let n_samples = features.len();
        let n_features = features[0].len();

        if n_features == 0 {
            return Err(TreeError::ZeroFeatures);
        }

        if labels.len() != n_samples {
            return Err(TreeError::LabelCountMismatch {
                samples: n_samples,
                labels: labels.len(),
            });
        }

        for (sample_index, row) in features.iter().enumerate() {
            if row.len() != n_features {
                return Err(TreeError::FeatureCountMismatch {
                    expected: n_features,
                    got: row.len(),
                    sample_index,
                });
            }
            for (feature_index, &val) in row.iter().enumerate() {
                if !val.is_finite() {
                    return Err(TreeError::NonFiniteValue {
                        sample_index,
                        feature_index,
                    });
                }
            }
        }

        // --- Validate config ---
        if let Some(d) = self.max_depth
            && d == 0
        {
            return Err(TreeError::InvalidMaxDepth { max_depth: 0 });
        }

        if self.min_samples_split < 2 {
            return Err(TreeError::InvalidMinSamplesSplit {
                min_samples_split: self.min_samples_split,
            });
        }

        if self.min_samples_leaf < 1 {
            return Err(TreeError::InvalidMinSamplesLeaf {
                min_samples_leaf: self.min_samples_leaf,
            });
        }

        let max_features = self.max_features.unwrap_or(n_features);
        if max_features == 0 || max_features > n_features {
            return Err(TreeError::InvalidMaxFeatures {
                max_features,
                n_features,
            });
        }

        // --- Derived values ---
        let observed_classes = labels.iter().max().copied().unwrap_or(0) + 1;
        let n_classes = match self.n_classes {
            Some(n) if observed_classes > n => {
                return Err(TreeError::ClassOutOfRange {
                    class: observed_classes - 1,
                    n_classes: n,
                });
            }
            Some(n) => n,
            None => observed_classes,
        };

        debug!(
            n_samples = n_samples,
            n_features = n_features,
            n_classes = n_classes,
            max_features = max_features,
            "fitting decision tree"
        );

        // Column-major layout for find_best_split.
        let col_features: Vec<Vec<f64>> = (0..n_features)
            .map(|feat_idx| features.iter().map(|row| row[feat_idx]).collect())
            .collect();

        let sample_indices: Vec<usize> = (0..n_samples).collect();
        let mut builder = TreeBuilder {
            col_features: &col_features,
            labels,
            n_classes,
            max_features,
            config: self,
            rng: ChaCha8Rng::seed_from_u64(self.seed),
            arena: Vec::new(),
        };
        let root = builder.build(&sample_indices, 0);
        let arena = builder.arena;

        debug!(
            root_index = root.index(),
            n_nodes = arena.len(),
            "decision tree built"
        );

        Ok(DecisionTree {
            nodes: arena,
            n_features,
            n_classes,
            criterion: self.criterion,
        })
    }
}

impl Default for DecisionTreeConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// Mutable state for the recursive arena build.
struct TreeBuilder<'a> {
    col_features: &'a [Vec<f64>],
    labels: &'a [usize],
    n_classes: usize,
    max_features: usize,
    config: &'a DecisionTreeConfig,
    rng: ChaCha8Rng,
    arena: Vec<Node>,
}

impl TreeBuilder<'_> {
    /// Recursively build the subtree for `sample_indices` at `depth`.
    ///
    /// Returns the [`NodeIndex`] of the node just created in the arena.
    fn build(&mut self, sample_indices: &[usize], depth: usize) -> NodeIndex {
        let n_samples = sample_indices.len();

        let mut class_counts = vec![0usize; self.n_classes];
        for &si in sample_indices {
            class_counts[self.labels[si]] += 1;
        }

        let impurity = self.config.criterion.impurity(&class_counts, n_samples);

        let depth_exceeded = self
            .config
            .max_depth
            .is_some_and(|max_d| depth >= max_d);
        let too_few = n_samples < self.config.min_samples_split;
        let pure = impurity.value() <= 0.0;

        let split = if too_few || pure || depth_exceeded {
            None
        } else {
            find_best_split(
                self.col_features,
                self.labels,
                sample_indices,
                &class_counts,
                self.config.criterion,
                self.max_features,
                self.config.min_samples_leaf,
                &mut self.rng,
            )
        };

        let Some(split) = split else {
            let total = n_samples.max(1) as f64;
            let distribution: Vec<f64> = class_counts.iter().map(|&c| c as f64 / total).collect();
            let idx = self.arena.len();
            self.arena.push(Node::Leaf {
                prediction: majority(&class_counts),
                distribution,
                class_counts,
                impurity,
                n_samples,
            });
            return NodeIndex::new(idx);
        };

        // Arena pattern: reserve index, recurse, then overwrite with the split.
        let node_idx = self.arena.len();
        self.arena.push(Node::Leaf {
            prediction: 0,
            distribution: Vec::new(),
            class_counts: Vec::new(),
            impurity,
            n_samples,
        });

        let left = self.build(&split.left_indices, depth + 1);
        let right = self.build(&split.right_indices, depth + 1);

        self.arena[node_idx] = Node::Split {
            feature: split.feature,
            threshold: split.threshold,
            left,
            right,
            impurity,
            n_samples,
            impurity_decrease: split.impurity_decrease,
            class_counts,
        };

        NodeIndex::new(node_idx)
    }
}

/// A fitted CART decision tree.
///
/// Stored as an arena-based `Vec<Node>` with index references; the root
/// is always at index 0 and children always follow their parent.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct DecisionTree {
    pub(crate) nodes: Vec<Node>,
    pub(crate) n_features: usize,
    pub(crate) n_classes: usize,
    pub(crate) criterion: SplitCriterion,
}

impl DecisionTree {
    /// Predict the class label for a single sample.
    ///
    /// Traverses from the root (index 0): at each `Split`, goes left when
    /// `sample[feature] <= threshold`, right otherwise.
    ///
    /// # Errors
    ///
    /// Returns [`TreeError::PredictionFeatureMismatch`] when `sample.len() != n_features`.
    pub fn predict(&self, sample: &[f64]) -> Result<usize, TreeError> {
        match self.leaf(sample)? {
            Node::Leaf { prediction, .. } => Ok(*prediction),
            Node::Split { .. } => unreachable!("traverse always ends at a leaf"),
        }
    }

    /// Return the class probability distribution for a single sample.
    ///
    /// The returned `Vec` has length `n_classes`, summing to 1.0.
    ///
    /// # Errors
    ///
    /// Returns [`TreeError::PredictionFeatureMismatch`] when `sample.len() != n_features`.
    pub fn predict_proba(&self, sample: &[f64]) -> Result<Vec<f64>, TreeError> {
        match self.leaf(sample)? {
            Node::Leaf { distribution, .. } => Ok(distribution.clone()),
            Node::Split { .. } => unreachable!("traverse always ends at a leaf"),
        }
    }

    /// Predict class labels for a batch of samples.
    ///
    /// # Errors
    ///
    /// Returns [`TreeError::PredictionFeatureMismatch`] if any sample has the wrong feature count.
    pub fn predict_batch(&self, features: &[Vec<f64>]) -> Result<Vec<usize>, TreeError> {
        features.iter().map(|sample| self.predict(sample)).collect()
    }

    /// Compute Mean Decrease in Impurity (MDI) feature importances.
    ///
    /// For each `Split` node, the `impurity_decrease` is accumulated by
    /// feature index, then the totals are normalized so they sum to 1.0.
    /// Returns a `Vec` of length `n_features`; all zeros when the tree is
    /// a single leaf.
    #[must_use]
    pub fn feature_importances(&self) -> Vec<f64> {
        let mut totals = vec![0.0f64; self.n_features];
        for node in &self.nodes {
            if let Node::Split {
                feature,
                impurity_decrease,
                ..
            } = node
            {
                totals[feature.index()] += impurity_decrease;
            }
        }
        let sum: f64 = totals.iter().sum();
        if sum > 0.0 {
            totals.iter_mut().for_each(|v| *v /= sum);
        }
        totals
    }

    /// Return the node arena. The root is at index 0.
    #[must_use]
    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    /// Return the index of the root node.
    #[must_use]
    pub fn root(&self) -> NodeIndex {
        NodeIndex::new(0)
    }

    /// Return the node at `index`.
    #[must_use]
    pub fn node(&self, index: NodeIndex) -> &Node {
        &self.nodes[index.index()]
    }

    /// Return the number of features the tree was trained on.
    #[must_use]
    pub fn n_features(&self) -> usize {
        self.n_features
    }

    /// Return the number of classes.
    #[must_use]
    pub fn n_classes(&self) -> usize {
        self.n_classes
    }

    /// Return the criterion the tree was grown with.
    #[must_use]
    pub fn criterion(&self) -> SplitCriterion {
        self.criterion
    }

    /// Return the total number of nodes in the tree (both splits and leaves).
    #[must_use]
    pub fn n_nodes(&self) -> usize {
        self.nodes.len()
    }

    /// Return the number of leaf nodes.
    #[must_use]
    pub fn n_leaves(&self) -> usize {
        self.nodes.iter().filter(|n| n.is_leaf()).count()
    }

    /// Return the maximum depth of the tree.
    ///
    /// A single-node tree (just a root leaf) has depth 0.
    #[must_use]
    pub fn depth(&self) -> usize {
        if self.nodes.is_empty() {
            return 0;
        }

        // BFS: (node_index, current_depth)
        let mut max_depth = 0usize;
        let mut queue = std::collections::VecDeque::new();
        queue.push_back((0usize, 0usize));

        while let Some((node_idx, d)) = queue.pop_front() {
            match &self.nodes[node_idx] {
                Node::Leaf { .. } => max_depth = max_depth.max(d),
                Node::Split { left, right, .. } => {
                    queue.push_back((left.index(), d + 1));
                    queue.push_back((right.index(), d + 1));
                }
            }
        }

        max_depth
    }

    /// Check the arena layout of a tree that did not come from [`DecisionTreeConfig::fit`].
    ///
    /// Every child index must point past its parent and inside the arena,
    /// every node except the root must be referenced exactly once, split
    /// features must be below `n_features`, and per-class vectors must have
    /// length `n_classes`. A tree that passes cannot panic or loop in
    /// traversal.
    ///
    /// # Errors
    ///
    /// | Variant                          | Condition                               |
    /// |----------------------------------|-----------------------------------------|
    /// | [`TreeError::EmptyTree`]         | the arena is empty                      |
    /// | [`TreeError::MalformedNode`]     | any of the layout rules above is broken |
    pub fn validate(&self) -> Result<(), TreeError> {
        if self.nodes.is_empty() {
            return Err(TreeError::EmptyTree);
        }
        let malformed = |node: usize, reason: String| TreeError::MalformedNode { node, reason };

        let mut parents = vec![0usize; self.nodes.len()];
        for (i, node) in self.nodes.iter().enumerate() {
            if node.class_counts().len() != self.n_classes {
                return Err(malformed(
                    i,
                    format!(
                        "{} class counts for {} classes",
                        node.class_counts().len(),
                        self.n_classes
                    ),
                ));
            }
            match node {
                Node::Split {
                    feature,
                    threshold,
                    left,
                    right,
                    ..
                } => {
                    if feature.index() >= self.n_features {
                        return Err(malformed(
                            i,
                            format!(
                                "feature {feature} is out of range for {} features",
                                self.n_features
                            ),
                        ));
                    }
                    if !threshold.is_finite() {
                        return Err(malformed(i, format!("threshold {threshold} is not finite")));
                    }
                    for child in [left, right] {
                        let c = child.index();
                        if c <= i || c >= self.nodes.len() {
                            return Err(malformed(
                                i,
                                format!("child {c} is outside {}..{}", i + 1, self.nodes.len()),
                            ));
                        }
                        parents[c] += 1;
                    }
                }
                Node::Leaf {
                    prediction,
                    distribution,
                    ..
                } => {
                    if distribution.len() != self.n_classes {
                        return Err(malformed(
                            i,
                            format!(
                                "distribution has {} entries for {} classes",
                                distribution.len(),
                                self.n_classes
                            ),
                        ));
                    }
                    if *prediction >= self.n_classes {
                        return Err(malformed(
                            i,
                            format!(
                                "prediction {prediction} is out of range for {} classes",
                                self.n_classes
                            ),
                        ));
                    }
                }
            }
        }

        if let Some((i, &count)) = parents
            .iter()
            .enumerate()
            .skip(1)
            .find(|&(_, &count)| count != 1)
        {
            return Err(malformed(i, format!("referenced by {count} parents")));
        }
        Ok(())
    }

    fn leaf(&self, sample: &[f64]) -> Result<&Node, TreeError> {
        if sample.len() != self.n_features {
            return Err(TreeError::PredictionFeatureMismatch {
                expected: self.n_features,
                got: sample.len(),
            });
        }
        let mut idx = 0usize;
        loop {
            match &self.nodes[idx] {
                leaf @ Node::Leaf { .. } => return Ok(leaf),
                Node::Split {
                    feature,
                    threshold,
                    left,
                    right,
                    ..
                } => {
                    idx = if sample[feature.index()] <= *threshold {
                        left.index()
                    } else {
                        right.index()
                    };
                }
            }
        }
    }
}
