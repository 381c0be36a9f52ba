//! Shared, immutable model state for request handlers.

use std::sync::Arc;

use churn_data::ChurnModel;
use tracing::debug;

use crate::svg::render_tree_svg;

struct Loaded {
    model: ChurnModel,
    tree_svg: String,
}

/// Cheaply clonable handle to a loaded model and its pre-rendered tree.
///
/// Read-only after construction, so handlers share it without locks.
#[derive(Clone)]
pub struct ModelHandle(Arc<Loaded>);

impl ModelHandle {
    /// Wrap a model, rendering its tree drawing once.
    #[must_use]
    pub fn new(model: ChurnModel) -> Self {
        let tree_svg = render_tree_svg(model.tree(), &model.schema().labels());
        debug!(svg_bytes = tree_svg.len(), "tree drawing cached");
        Self(Arc::new(Loaded { model, tree_svg }))
    }

    /// Return the model.
    #[must_use]
    pub fn model(&self) -> &ChurnModel {
        &self.0.model
    }

    /// Return the cached SVG drawing of the tree.
    #[must_use]
    pub fn tree_svg(&self) -> &str {
        &self.0.tree_svg
    }
}
