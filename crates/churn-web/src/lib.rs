//! Web predictor for churn models: input form, verdicts, and tree drawing.
//!
//! A loaded [`churn_data::ChurnModel`] is wrapped in a [`ModelHandle`] and
//! passed to an axum [`router`] as state. Pages are rendered with maud; the
//! tree drawing is a standalone SVG rendered once per handle.

mod config;
mod error;
mod handle;
mod routes;
mod server;
mod svg;
mod views;

pub use config::ServerConfig;
pub use error::WebError;
pub use handle::ModelHandle;
pub use routes::router;
pub use server::serve;
pub use svg::{NodePosition, layout, purity, render_tree_svg};
