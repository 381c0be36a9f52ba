//! End-to-end training pipeline: read, impute, encode, split, fit, evaluate.

use std::path::Path;

use churn_tree::{
    ClassMetrics, ConfusionMatrix, DecisionTreeConfig, RankedFeature, SplitCriterion,
    rank_importances,
};
use serde::Serialize;
use tracing::{info, instrument};

use crate::artifact::ChurnModel;
use crate::domain::ColumnFill;
use crate::encode::encode;
use crate::error::DataError;
use crate::impute::impute;
use crate::reader::ChurnReader;
use crate::schema::FeatureSchema;
use crate::split::train_test_split;

/// Configuration for a training run.
///
/// Construct via [`TrainerConfig::new`], then chain `with_*` methods.
///
/// # Defaults
///
/// | Parameter           | Default                 |
/// |---------------------|-------------------------|
/// | `schema`            | [`FeatureSchema::churn`] |
/// | `test_fraction`     | 0.3                     |
/// | `seed`              | 42                      |
/// | `max_depth`         | `Some(10)`              |
/// | `criterion`         | `Gini`                  |
/// | `min_samples_split` | 2                       |
/// | `min_samples_leaf`  | 1                       |
#[derive(Debug, Clone)]
pub struct TrainerConfig {
    schema: FeatureSchema,
    test_fraction: f64,
    seed: u64,
    max_depth: Option<usize>,
    criterion: SplitCriterion,
    min_samples_split: usize,
    min_samples_leaf: usize,
}

impl TrainerConfig {
    /// Create a configuration with the churn schema and default parameters.
    #[must_use]
    pub fn new() -> Self {
        Self {
            schema: FeatureSchema::churn(),
            test_fraction: 0.3,
            seed: 42,
            max_depth: Some(10),
            criterion: SplitCriterion::Gini,
            min_samples_split: 2,
            min_samples_leaf: 1,
        }
    }

    /// Set the feature schema.
    #[must_use]
    pub fn with_schema(mut self, schema: FeatureSchema) -> Self {
        self.schema = schema;
        self
    }

    /// Set the holdout fraction. Validated when training starts.
    #[must_use]
    pub fn with_test_fraction(mut self, test_fraction: f64) -> Self {
        self.test_fraction = test_fraction;
        self
    }

    /// Set the seed used for both the split and the tree.
    #[must_use]
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Set the maximum tree depth (`None` = unlimited).
    #[must_use]
    pub fn with_max_depth(mut self, max_depth: Option<usize>) -> Self {
        self.max_depth = max_depth;
        self
    }

    /// Set the impurity criterion.
    #[must_use]
    pub fn with_criterion(mut self, criterion: SplitCriterion) -> Self {
        self.criterion = criterion;
        self
    }

    /// Set the minimum number of samples needed to split a node.
    #[must_use]
    pub fn with_min_samples_split(mut self, min_samples_split: usize) -> Self {
        self.min_samples_split = min_samples_split;
        self
    }

    /// Set the minimum number of samples in each leaf.
    #[must_use]
    pub fn with_min_samples_leaf(mut self, min_samples_leaf: usize) -> Self {
        self.min_samples_leaf = min_samples_leaf;
        self
    }

    /// Return the feature schema.
    #[must_use]
    pub fn schema(&self) -> &FeatureSchema {
        &self.schema
    }

    /// Return the holdout fraction.
    #[must_use]
    pub fn test_fraction(&self) -> f64 {
        self.test_fraction
    }

    /// Return the seed.
    #[must_use]
    pub fn seed(&self) -> u64 {
        self.seed
    }

    fn tree_config(&self) -> DecisionTreeConfig {
        DecisionTreeConfig::new()
            .with_criterion(self.criterion)
            .with_max_depth(self.max_depth)
            .with_min_samples_split(self.min_samples_split)
            .with_min_samples_leaf(self.min_samples_leaf)
            .with_n_classes(Some(2))
            .with_seed(self.seed)
    }

    /// Run the full pipeline on the CSV at `path`.
    ///
    /// Nothing is written to disk; persist the returned model with
    /// [`ChurnModel::save`].
    ///
    /// # Errors
    ///
    /// Any [`DataError`] from reading, imputation, encoding, splitting, or
    /// fitting. A missing column stops the run before any fitting happens.
    #[instrument(skip(self), fields(path = %path.display(), seed = self.seed))]
    pub fn train(&self, path: &Path) -> Result<TrainingOutcome, DataError> {
        let raw = ChurnReader::new(path).read(&self.schema)?;
        let table = impute(&raw, &self.schema)?;
        let categorical_columns: Vec<String> = table
            .columns
            .iter()
            .zip(self.schema.fields())
            .filter(|(c, _)| c.is_categorical())
            .map(|(_, f)| f.column.clone())
            .collect();
        let (dataset, encoders) = encode(&table)?;

        let split = train_test_split(dataset.n_rows(), self.test_fraction, self.seed)?;
        let (train_x, train_y) = dataset.select(&split.train);
        let (test_x, test_y) = dataset.select(&split.test);
        info!(n_train = train_y.len(), n_test = test_y.len(), "split dataset");

        let tree = self.tree_config().fit(&train_x, &train_y)?;
        info!(
            n_nodes = tree.n_nodes(),
            n_leaves = tree.n_leaves(),
            depth = tree.depth(),
            "tree fitted"
        );

        let predicted = tree.predict_batch(&test_x)?;
        let confusion = ConfusionMatrix::from_labels(&test_y, &predicted, 2)?;
        let accuracy = confusion.accuracy();
        info!(accuracy = %format!("{accuracy:.2}"), "holdout evaluation");

        let importances = rank_importances(&tree.feature_importances(), &self.schema.column_names());

        let report = TrainingReport {
            data_path: path.display().to_string(),
            n_rows: dataset.n_rows(),
            n_train: train_y.len(),
            n_test: test_y.len(),
            accuracy,
            confusion: confusion.as_rows().to_vec(),
            class_metrics: confusion.class_metrics(),
            importances,
            imputed: table.fills,
            categorical_columns,
            n_nodes: tree.n_nodes(),
            n_leaves: tree.n_leaves(),
            depth: tree.depth(),
            criterion: self.criterion.name().to_string(),
            max_depth: self.max_depth,
            seed: self.seed,
        };

        let model = ChurnModel::new(
            self.schema.clone(),
            encoders,
            tree,
            accuracy,
            report.n_train,
            report.n_test,
        )?;

        Ok(TrainingOutcome { model, report })
    }
}

impl Default for TrainerConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// Summary of a training run, serialized for the CLI and report files.
#[derive(Debug, Clone, Serialize)]
pub struct TrainingReport {
    /// Input CSV path.
    pub data_path: String,
    /// Total data rows.
    pub n_rows: usize,
    /// Rows used for fitting.
    pub n_train: usize,
    /// Holdout rows.
    pub n_test: usize,
    /// Holdout accuracy.
    pub accuracy: f64,
    /// Holdout confusion matrix, `confusion[true][predicted]`.
    pub confusion: Vec<Vec<usize>>,
    /// Per-class precision, recall, and F1 on the holdout.
    pub class_metrics: Vec<ClassMetrics>,
    /// Mean-decrease-in-impurity importances, most important first.
    pub importances: Vec<RankedFeature>,
    /// Columns that had missing cells and what filled them.
    pub imputed: Vec<ColumnFill>,
    /// Feature columns treated as categorical.
    pub categorical_columns: Vec<String>,
    /// Tree node count.
    pub n_nodes: usize,
    /// Tree leaf count.
    pub n_leaves: usize,
    /// Tree depth.
    pub depth: usize,
    /// Impurity criterion name.
    pub criterion: String,
    /// Depth limit used.
    pub max_depth: Option<usize>,
    /// Seed used for split and fit.
    pub seed: u64,
}

/// A trained model and the report describing how it was trained.
#[derive(Debug, Clone)]
pub struct TrainingOutcome {
    /// The fitted model, ready to save.
    pub model: ChurnModel,
    /// Training summary.
    pub report: TrainingReport,
}

#[cfg(test)]
mod tests {
    use std::fmt::Write as _;
    use std::io::Write;

    use tempfile::NamedTempFile;

    use super::*;

    fn tiny_schema() -> FeatureSchema {
        let churn = FeatureSchema::churn();
        FeatureSchema::new(vec![churn.fields()[1].clone(), churn.fields()[11].clone()], "Churn")
            .unwrap()
    }

    fn write_rows(n: usize) -> NamedTempFile {
        let mut csv = String::from("Complains,Age,Churn\n");
        for i in 0..n {
            let complains = i % 3 == 0;
            writeln!(csv, "{},{},{}", u8::from(complains), 20 + i % 40, u8::from(complains)).unwrap();
        }
        let mut f = NamedTempFile::new().unwrap();
        f.write_all(csv.as_bytes()).unwrap();
        f.flush().unwrap();
        f
    }

    #[test]
    fn defaults() {
        let config = TrainerConfig::new();
        assert_eq!(config.schema().len(), 13);
        assert!((config.test_fraction() - 0.3).abs() < f64::EPSILON);
        assert_eq!(config.seed(), 42);
        assert_eq!(config.tree_config().max_depth(), Some(10));
    }

    #[test]
    fn learns_separable_rule() {
        let f = write_rows(60);
        let outcome = TrainerConfig::new()
            .with_schema(tiny_schema())
            .train(f.path())
            .unwrap();
        assert_eq!(outcome.report.n_test, 18);
        assert_eq!(outcome.report.n_train, 42);
        assert!((outcome.report.accuracy - 1.0).abs() < f64::EPSILON);
        assert_eq!(outcome.report.importances[0].name, "Complains");
        assert!(outcome.report.imputed.is_empty());
        assert_eq!(outcome.model.predict(&[1.0, 30.0]).unwrap().prediction, 1);
    }

    #[test]
    fn invalid_fraction_surfaces() {
        let f = write_rows(10);
        let err = TrainerConfig::new()
            .with_schema(tiny_schema())
            .with_test_fraction(1.5)
            .train(f.path())
            .unwrap_err();
        assert!(matches!(err, DataError::InvalidTestFraction { .. }));
    }
}
