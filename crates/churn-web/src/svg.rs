//! SVG drawing of a fitted decision tree.
//!
//! Leaves are placed left to right in in-order sequence; every split sits
//! centred over its two children, one row per depth level.

use churn_data::ChurnLabel;
use churn_tree::{DecisionTree, Node, NodeIndex};
use maud::html;

const NODE_WIDTH: f64 = 190.0;
const NODE_HEIGHT: f64 = 96.0;
const COLUMN_GAP: f64 = 20.0;
const ROW_GAP: f64 = 56.0;
const MARGIN: f64 = 16.0;
const LINE_HEIGHT: f64 = 16.0;

/// Fill colours per class: green for "not churn", red for "churn".
const CLASS_COLOURS: [&str; 2] = ["#2e7d32", "#c62828"];

/// Grid position of one node.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NodePosition {
    /// Horizontal slot, in leaf widths from the left edge.
    pub slot: f64,
    /// Depth from the root.
    pub depth: usize,
}

/// Compute a position for every node, indexed like [`DecisionTree::nodes`].
#[must_use]
pub fn layout(tree: &DecisionTree) -> Vec<NodePosition> {
    let mut positions = vec![NodePosition { slot: 0.0, depth: 0 }; tree.n_nodes()];
    if tree.n_nodes() > 0 {
        let mut next_leaf = 0usize;
        place(tree, tree.root(), 0, &mut next_leaf, &mut positions);
    }
    positions
}

fn place(
    tree: &DecisionTree,
    index: NodeIndex,
    depth: usize,
    next_leaf: &mut usize,
    positions: &mut [NodePosition],
) -> f64 {
    let slot = match tree.node(index) {
        Node::Leaf { .. } => {
            let slot = *next_leaf as f64;
            *next_leaf += 1;
            slot
        }
        Node::Split { left, right, .. } => {
            let l = place(tree, *left, depth + 1, next_leaf, positions);
            let r = place(tree, *right, depth + 1, next_leaf, positions);
            (l + r) / 2.0
        }
    };
    positions[index.index()] = NodePosition { slot, depth };
    slot
}

/// Opacity in [0, 1] from how dominant the majority class is.
///
/// 0 for a uniform distribution, 1 for a pure node.
#[must_use]
pub fn purity(class_counts: &[usize]) -> f64 {
    let total: usize = class_counts.iter().sum();
    let k = class_counts.len();
    if total == 0 || k < 2 {
        return 1.0;
    }
    let max = class_counts.iter().copied().max().unwrap_or(0) as f64 / total as f64;
    let floor = 1.0 / k as f64;
    ((max - floor) / (1.0 - floor)).clamp(0.0, 1.0)
}

/// Format a threshold with at most three decimals and no trailing zeros.
fn format_threshold(value: f64) -> String {
    let text = format!("{value:.3}");
    let text = text.trim_end_matches('0').trim_end_matches('.');
    if text.is_empty() || text == "-" {
        "0".to_string()
    } else {
        text.to_string()
    }
}

/// Text lines drawn inside a node box.
fn node_lines(node: &Node, feature_labels: &[String], criterion: &str) -> Vec<String> {
    let mut lines = Vec::with_capacity(5);
    if let Node::Split {
        feature, threshold, ..
    } = node
    {
        let name = feature_labels
            .get(feature.index())
            .cloned()
            .unwrap_or_else(|| format!("x[{}]", feature.index()));
        lines.push(format!("{name} <= {}", format_threshold(*threshold)));
    }
    lines.push(format!("{criterion} = {:.3}", node.impurity().value()));
    lines.push(format!("samples = {}", node.n_samples()));
    let counts: Vec<String> = node.class_counts().iter().map(usize::to_string).collect();
    lines.push(format!("value = [{}]", counts.join(", ")));
    lines.push(format!(
        "class = {}",
        ChurnLabel::from_class(node.majority_class())
    ));
    lines
}

/// Render the whole tree as a standalone SVG document.
///
/// `feature_labels` names features by index in split conditions.
#[must_use]
pub fn render_tree_svg(tree: &DecisionTree, feature_labels: &[String]) -> String {
    let positions = layout(tree);
    let n_slots = tree.n_leaves().max(1) as f64;
    let width = 2.0 * MARGIN + n_slots * NODE_WIDTH + (n_slots - 1.0) * COLUMN_GAP;
    let rows = tree.depth() as f64 + 1.0;
    let height = 2.0 * MARGIN + rows * NODE_HEIGHT + (rows - 1.0) * ROW_GAP;

    let x_of = |p: &NodePosition| MARGIN + p.slot * (NODE_WIDTH + COLUMN_GAP);
    let y_of = |p: &NodePosition| MARGIN + p.depth as f64 * (NODE_HEIGHT + ROW_GAP);

    let mut edges: Vec<(&NodePosition, &NodePosition)> = Vec::new();
    for (i, node) in tree.nodes().iter().enumerate() {
        if let Node::Split { left, right, .. } = node {
            edges.push((&positions[i], &positions[left.index()]));
            edges.push((&positions[i], &positions[right.index()]));
        }
    }

    let criterion = tree.criterion().name();

    let markup = html! {
        svg xmlns="http://www.w3.org/2000/svg" width=(width) height=(height)
            viewBox=(format!("0 0 {width} {height}"))
            font-family="Helvetica, Arial, sans-serif" font-size="12"
        {
            @for &(from, to) in &edges {
                line x1=(x_of(from) + NODE_WIDTH / 2.0) y1=(y_of(from) + NODE_HEIGHT)
                    x2=(x_of(to) + NODE_WIDTH / 2.0) y2=(y_of(to))
                    stroke="#555" stroke-width="1.2" {}
            }
            @for (i, node) in tree.nodes().iter().enumerate() {
                @let pos = &positions[i];
                @let (x, y) = (x_of(pos), y_of(pos));
                @let colour = CLASS_COLOURS[node.majority_class().min(CLASS_COLOURS.len() - 1)];
                @let lines = node_lines(node, feature_labels, criterion);
                @let top = y + (NODE_HEIGHT - lines.len() as f64 * LINE_HEIGHT) / 2.0
                    + LINE_HEIGHT * 0.75;
                g class="node" data-node=(i) {
                    rect x=(x) y=(y) width=(NODE_WIDTH) height=(NODE_HEIGHT) rx="6"
                        fill=(colour) fill-opacity=(format!("{:.3}", purity(node.class_counts())))
                        stroke="#333" {}
                    @for (j, row) in lines.iter().enumerate() {
                        text x=(x + NODE_WIDTH / 2.0) y=(top + j as f64 * LINE_HEIGHT)
                            text-anchor="middle" { (row) }
                    }
                }
            }
        }
    };
    markup.into_string()
}
