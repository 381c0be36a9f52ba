//! The trained churn model and its bincode artifact.

use std::fmt;
use std::path::Path;

use churn_tree::DecisionTree;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument};

use crate::encode::CategoryEncoder;
use crate::error::{DataError, FieldError};
use crate::schema::FeatureSchema;

/// Current binary format version.
const FORMAT_VERSION: u32 = 1;

/// Versioned envelope for the serialized model.
#[derive(Serialize, Deserialize)]
struct ModelEnvelope {
    /// Format version for compatibility checking.
    format_version: u32,
    /// Number of features the model was trained on.
    n_features: usize,
    /// Feature column names, for inspection without decoding the model.
    feature_names: Vec<String>,
    /// The serialized model.
    model: ChurnModel,
}

/// Binary churn verdict.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ChurnLabel {
    /// Class 1.
    #[serde(rename = "churn")]
    Churn,
    /// Class 0.
    #[serde(rename = "not churn")]
    NotChurn,
}

impl ChurnLabel {
    /// Map a class index to its verdict. Any nonzero class is churn.
    #[must_use]
    pub fn from_class(class: usize) -> Self {
        if class == 0 { Self::NotChurn } else { Self::Churn }
    }
}

impl fmt::Display for ChurnLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Churn => f.write_str("churn"),
            Self::NotChurn => f.write_str("not churn"),
        }
    }
}

/// Outcome of one prediction.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Prediction {
    /// Predicted class, 0 or 1.
    pub prediction: usize,
    /// Verdict for the predicted class.
    pub label: ChurnLabel,
    /// Leaf probability of the predicted class.
    pub probability: f64,
    /// Leaf class distribution.
    #[serde(skip)]
    pub distribution: Vec<f64>,
}

/// A fitted tree together with the schema and encoders needed to feed it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChurnModel {
    schema: FeatureSchema,
    encoders: Vec<Option<CategoryEncoder>>,
    tree: DecisionTree,
    holdout_accuracy: f64,
    n_train: usize,
    n_test: usize,
}

impl ChurnModel {
    /// Assemble a model from its parts.
    ///
    /// # Errors
    ///
    /// Returns [`DataError::SchemaMismatch`] when the schema, encoders, and
    /// tree disagree on the feature count, or the tree is not binary, and
    /// [`DataError::Tree`] when the tree's node arena is malformed.
    pub fn new(
        schema: FeatureSchema,
        encoders: Vec<Option<CategoryEncoder>>,
        tree: DecisionTree,
        holdout_accuracy: f64,
        n_train: usize,
        n_test: usize,
    ) -> Result<Self, DataError> {
        if encoders.len() != schema.len() || tree.n_features() != schema.len() {
            return Err(DataError::SchemaMismatch {
                reason: format!(
                    "schema has {} features, encoders {}, tree {}",
                    schema.len(),
                    encoders.len(),
                    tree.n_features()
                ),
            });
        }
        if tree.n_classes() != 2 {
            return Err(DataError::SchemaMismatch {
                reason: format!("expected a binary tree, got {} classes", tree.n_classes()),
            });
        }
        tree.validate()?;
        Ok(Self {
            schema,
            encoders,
            tree,
            holdout_accuracy,
            n_train,
            n_test,
        })
    }

    /// Return the feature schema.
    #[must_use]
    pub fn schema(&self) -> &FeatureSchema {
        &self.schema
    }

    /// Return the per-feature encoders (`None` for numeric features).
    #[must_use]
    pub fn encoders(&self) -> &[Option<CategoryEncoder>] {
        &self.encoders
    }

    /// Return the fitted tree.
    #[must_use]
    pub fn tree(&self) -> &DecisionTree {
        &self.tree
    }

    /// Return the holdout accuracy measured at training time.
    #[must_use]
    pub fn holdout_accuracy(&self) -> f64 {
        self.holdout_accuracy
    }

    /// Return the number of training rows.
    #[must_use]
    pub fn n_train(&self) -> usize {
        self.n_train
    }

    /// Return the number of holdout rows.
    #[must_use]
    pub fn n_test(&self) -> usize {
        self.n_test
    }

    /// Validate raw inputs (schema order) and turn them into a feature vector.
    ///
    /// `None` or a position past the end of `raw` counts as missing. Every
    /// field is checked, so all problems are reported at once.
    ///
    /// # Errors
    ///
    /// Returns one [`FieldError`] per rejected field.
    pub fn encode_inputs<S: AsRef<str>>(
        &self,
        raw: &[Option<S>],
    ) -> Result<Vec<f64>, Vec<FieldError>> {
        let mut values = Vec::with_capacity(self.schema.len());
        let mut errors = Vec::new();

        for (index, (field, encoder)) in self.schema.fields().iter().zip(&self.encoders).enumerate()
        {
            let input = raw.get(index).and_then(Option::as_ref).map_or("", |s| s.as_ref());
            let parsed = match encoder {
                Some(encoder) if !input.trim().is_empty() => encoder.code(input),
                _ => field.parse_value(input),
            };
            match parsed {
                Ok(v) => values.push(v),
                Err(error) => errors.push(FieldError {
                    index,
                    column: field.column.clone(),
                    error,
                }),
            }
        }

        if errors.is_empty() {
            Ok(values)
        } else {
            Err(errors)
        }
    }

    /// Predict one encoded feature vector.
    ///
    /// # Errors
    ///
    /// Returns [`DataError::Tree`] when the vector has the wrong length or a
    /// non-finite value.
    pub fn predict(&self, features: &[f64]) -> Result<Prediction, DataError> {
        let distribution = self.tree.predict_proba(features)?;
        let prediction = self.tree.predict(features)?;
        Ok(Prediction {
            prediction,
            label: ChurnLabel::from_class(prediction),
            probability: distribution.get(prediction).copied().unwrap_or_default(),
            distribution,
        })
    }

    /// Save the model to a binary file, overwriting any existing file.
    ///
    /// # Errors
    ///
    /// | Variant | Condition |
    /// |---|---|
    /// | [`DataError::SerializeModel`] | bincode encoding failed |
    /// | [`DataError::WriteModel`] | file write failed |
    #[instrument(skip(self), fields(path = %path.as_ref().display()))]
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), DataError> {
        let path = path.as_ref();

        let envelope = ModelEnvelope {
            format_version: FORMAT_VERSION,
            n_features: self.schema.len(),
            feature_names: self.schema.column_names(),
            model: self.clone(),
        };

        let bytes =
            bincode::serialize(&envelope).map_err(|e| DataError::SerializeModel { source: e })?;

        std::fs::write(path, &bytes).map_err(|e| DataError::WriteModel {
            path: path.to_path_buf(),
            source: e,
        })?;

        info!(
            size_bytes = bytes.len(),
            n_nodes = self.tree.n_nodes(),
            "model saved"
        );

        Ok(())
    }

    /// Load a model from a binary file.
    ///
    /// # Errors
    ///
    /// | Variant | Condition |
    /// |---|---|
    /// | [`DataError::ReadModel`] | file read failed |
    /// | [`DataError::DeserializeModel`] | bincode decoding failed |
    /// | [`DataError::IncompatibleModelVersion`] | format version mismatch |
    /// | [`DataError::CorruptModel`] | decoded tree has a malformed node arena |
    /// | [`DataError::SchemaMismatch`] | decoded parts disagree |
    #[instrument(fields(path = %path.as_ref().display()))]
    pub fn load(path: impl AsRef<Path>) -> Result<Self, DataError> {
        let path = path.as_ref();

        let bytes = std::fs::read(path).map_err(|e| DataError::ReadModel {
            path: path.to_path_buf(),
            source: e,
        })?;

        // The version leads the envelope, so check it before decoding the rest.
        let found: u32 =
            bincode::deserialize(&bytes).map_err(|e| DataError::DeserializeModel {
                path: path.to_path_buf(),
                source: e,
            })?;
        if found != FORMAT_VERSION {
            return Err(DataError::IncompatibleModelVersion {
                expected: FORMAT_VERSION,
                found,
                path: path.to_path_buf(),
            });
        }

        let envelope: ModelEnvelope =
            bincode::deserialize(&bytes).map_err(|e| DataError::DeserializeModel {
                path: path.to_path_buf(),
                source: e,
            })?;

        debug!(
            n_features = envelope.n_features,
            feature_names = ?envelope.feature_names,
            "model loaded"
        );

        let m = envelope.model;
        m.tree.validate().map_err(|e| DataError::CorruptModel {
            path: path.to_path_buf(),
            source: e,
        })?;
        Self::new(m.schema, m.encoders, m.tree, m.holdout_accuracy, m.n_train, m.n_test)
    }
}

#[cfg(test)]
mod tests {
    use churn_tree::DecisionTreeConfig;
    use tempfile::TempDir;

    use super::*;
    use crate::error::InputError;

    fn two_feature_schema() -> FeatureSchema {
        let churn = FeatureSchema::churn();
        FeatureSchema::new(vec![churn.fields()[1].clone(), churn.fields()[11].clone()], "Churn")
            .unwrap()
    }

    /// Complains (0/1) and Age; churn exactly when a complaint was made.
    fn simple_model() -> ChurnModel {
        let features = vec![
            vec![0.0, 30.0],
            vec![0.0, 40.0],
            vec![0.0, 25.0],
            vec![1.0, 30.0],
            vec![1.0, 45.0],
            vec![1.0, 20.0],
        ];
        let labels = vec![0, 0, 0, 1, 1, 1];
        let tree = DecisionTreeConfig::new()
            .with_n_classes(Some(2))
            .fit(&features, &labels)
            .unwrap();
        ChurnModel::new(two_feature_schema(), vec![None, None], tree, 1.0, 6, 0).unwrap()
    }

    #[test]
    fn predicts_verdicts() {
        let model = simple_model();
        let p = model.predict(&[1.0, 33.0]).unwrap();
        assert_eq!(p.prediction, 1);
        assert_eq!(p.label, ChurnLabel::Churn);
        assert!((p.probability - 1.0).abs() < 1e-12);
        assert_eq!(model.predict(&[0.0, 33.0]).unwrap().label.to_string(), "not churn");
    }

    #[test]
    fn wrong_length_is_tree_error() {
        let err = simple_model().predict(&[1.0]).unwrap_err();
        assert!(matches!(err, DataError::Tree(_)));
    }

    #[test]
    fn encode_inputs_collects_every_error() {
        let model = simple_model();
        let errors = model.encode_inputs(&[Some("2"), Some("-3")]).unwrap_err();
        assert_eq!(errors.len(), 2);
        assert_eq!(errors[0].index, 0);
        assert!(matches!(errors[0].error, InputError::NotAnOption { .. }));
        assert_eq!(errors[1].column, "Age");
        assert!(matches!(errors[1].error, InputError::Negative { .. }));

        let errors = model.encode_inputs::<&str>(&[Some("1")]).unwrap_err();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].error, InputError::Missing);

        assert_eq!(model.encode_inputs(&[Some("1"), Some(" 30 ")]).unwrap(), vec![1.0, 30.0]);
    }

    #[test]
    fn encoder_applied_for_categorical_field() {
        let base = simple_model();
        let schema = FeatureSchema::new(
            base.schema().fields().to_vec(),
            "Churn",
        )
        .unwrap();
        let model = ChurnModel::new(
            schema,
            vec![Some(CategoryEncoder::fit(&["no", "yes"])), None],
            base.tree().clone(),
            1.0,
            6,
            0,
        )
        .unwrap();
        assert_eq!(model.encode_inputs(&[Some("yes"), Some("30")]).unwrap(), vec![1.0, 30.0]);
        let errors = model.encode_inputs(&[Some("maybe"), Some("30")]).unwrap_err();
        assert_eq!(
            errors[0].error,
            InputError::UnknownCategory { value: "maybe".into() }
        );
    }

    #[test]
    fn mismatched_parts_rejected() {
        let model = simple_model();
        let err = ChurnModel::new(
            FeatureSchema::churn(),
            vec![None; 13],
            model.tree().clone(),
            1.0,
            6,
            0,
        )
        .unwrap_err();
        assert!(matches!(err, DataError::SchemaMismatch { .. }));
    }

    #[test]
    fn round_trip_identical_predictions() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("model.bin");
        let model = simple_model();
        model.save(&path).unwrap();
        let loaded = ChurnModel::load(&path).unwrap();
        assert_eq!(loaded, model);
        for sample in [[0.0, 18.0], [1.0, 60.0]] {
            assert_eq!(loaded.predict(&sample).unwrap(), model.predict(&sample).unwrap());
        }
    }

    #[test]
    fn save_overwrites() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("model.bin");
        std::fs::write(&path, b"stale").unwrap();
        simple_model().save(&path).unwrap();
        assert!(ChurnModel::load(&path).is_ok());
    }

    #[test]
    fn load_nonexistent_file() {
        let err = ChurnModel::load("/nonexistent/model.bin").unwrap_err();
        assert!(matches!(err, DataError::ReadModel { .. }));
    }

    #[test]
    fn load_corrupt_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("corrupt.bin");
        std::fs::write(&path, [1, 0, 0, 0, 0xFF, 0xFE]).unwrap();
        let err = ChurnModel::load(&path).unwrap_err();
        assert!(matches!(err, DataError::DeserializeModel { .. }));
    }

    #[test]
    fn load_wrong_version() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("v99.bin");
        simple_model().save(&path).unwrap();
        let mut bytes = std::fs::read(&path).unwrap();
        bytes[..4].copy_from_slice(&99u32.to_le_bytes());
        std::fs::write(&path, &bytes).unwrap();
        let err = ChurnModel::load(&path).unwrap_err();
        assert!(matches!(
            err,
            DataError::IncompatibleModelVersion {
                expected: 1,
                found: 99,
                ..
            }
        ));
    }

    /// The simple model's tree with the root's left child pointing past the arena.
    fn dangling_child_tree() -> DecisionTree {
        let mut value = serde_json::to_value(simple_model().tree()).unwrap();
        value["nodes"][0]["Split"]["left"] = serde_json::json!(5000);
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn new_rejects_malformed_tree() {
        let err = ChurnModel::new(
            two_feature_schema(),
            vec![None, None],
            dangling_child_tree(),
            1.0,
            6,
            0,
        )
        .unwrap_err();
        assert!(matches!(
            err,
            DataError::Tree(churn_tree::TreeError::MalformedNode { node: 0, .. })
        ));
    }

    #[test]
    fn load_rejects_decodable_but_malformed_tree() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("dangling.bin");
        let corrupt = ChurnModel {
            tree: dangling_child_tree(),
            ..simple_model()
        };
        corrupt.save(&path).unwrap();

        let err = ChurnModel::load(&path).unwrap_err();
        assert!(matches!(
            err,
            DataError::CorruptModel {
                source: churn_tree::TreeError::MalformedNode { node: 0, .. },
                ..
            }
        ));
    }
}
