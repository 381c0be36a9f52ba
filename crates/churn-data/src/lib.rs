//! Dataset loading, preprocessing, training, and model persistence for churn.
//!
//! The pipeline reads the telecom churn CSV against a [`FeatureSchema`],
//! imputes gaps, encodes categorical columns, splits off a seeded holdout,
//! fits a CART tree, and packages everything a predictor needs into a
//! [`ChurnModel`] artifact.

mod artifact;
mod domain;
mod encode;
mod error;
mod impute;
mod reader;
mod schema;
mod split;
mod trainer;
mod writer;

pub use artifact::{ChurnLabel, ChurnModel, Prediction};
pub use domain::{Column, ColumnFill, CompleteTable, EncodedDataset, RawTable};
pub use encode::{CategoryEncoder, encode};
pub use error::{DataError, FieldError, InputError};
pub use impute::{impute, median, mode};
pub use reader::ChurnReader;
pub use schema::{ChoiceOption, FeatureSchema, FieldKind, FieldSpec};
pub use split::{TrainTestSplit, train_test_split};
pub use trainer::{TrainerConfig, TrainingOutcome, TrainingReport};
pub use writer::ReportWriter;
