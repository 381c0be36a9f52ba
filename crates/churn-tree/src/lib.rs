//! CART decision tree classification: fit, predict, evaluate.
//!
//! Provides a hand-rolled CART classifier with Gini/Entropy split criteria,
//! seeded feature ordering for reproducible ties, mean-decrease-in-impurity
//! feature importance, and confusion-matrix metrics. Fitted trees are
//! serde-serializable arenas of [`Node`]s.

mod confusion;
mod error;
mod importance;
mod node;
mod split;
mod tree;

pub use confusion::{ClassMetrics, ConfusionMatrix};
pub use error::TreeError;
pub use importance::{RankedFeature, rank_importances};
pub use node::{FeatureIndex, Impurity, Node, NodeIndex};
pub use split::SplitCriterion;
pub use tree::{DecisionTree, DecisionTreeConfig};
