//! The ordered, typed feature schema shared by training and prediction.
//!
//! The schema is the single source of truth for which CSV columns feed the
//! model, in which order, and what values the prediction form accepts. It is
//! stored inside the model artifact, so a predictor always presents features
//! in exactly the order the tree was trained on.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::error::{DataError, InputError};

/// One permitted value of a [`FieldKind::Choice`] field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChoiceOption {
    /// Numeric value fed to the model.
    pub value: i64,
    /// Human-readable label shown in the form.
    pub label: String,
}

impl ChoiceOption {
    fn new(value: i64, label: &str) -> Self {
        Self {
            value,
            label: label.to_string(),
        }
    }
}

/// How a feature's raw input is validated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum FieldKind {
    /// Non-negative whole number.
    Count,
    /// Non-negative real number.
    Amount,
    /// One of a small enumerated set of integer codes.
    Choice(Vec<ChoiceOption>),
}

/// A single feature column.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldSpec {
    /// Exact CSV header name.
    pub column: String,
    /// Label shown in the form and in tree drawings.
    pub label: String,
    /// Input validation rule.
    pub kind: FieldKind,
    /// Placeholder or help text for the form.
    pub hint: String,
}

impl FieldSpec {
    fn count(column: &str, label: &str, hint: &str) -> Self {
        Self {
            column: column.to_string(),
            label: label.to_string(),
            kind: FieldKind::Count,
            hint: hint.to_string(),
        }
    }

    fn amount(column: &str, label: &str, hint: &str) -> Self {
        Self {
            column: column.to_string(),
            label: label.to_string(),
            kind: FieldKind::Amount,
            hint: hint.to_string(),
        }
    }

    fn choice(column: &str, label: &str, hint: &str, options: Vec<ChoiceOption>) -> Self {
        Self {
            column: column.to_string(),
            label: label.to_string(),
            kind: FieldKind::Choice(options),
            hint: hint.to_string(),
        }
    }

    /// Parse and validate a raw numeric input for this field.
    ///
    /// Whitespace is trimmed; an empty string counts as missing.
    ///
    /// # Errors
    ///
    /// | Variant | Condition |
    /// |---|---|
    /// | [`InputError::Missing`] | empty input |
    /// | [`InputError::NotANumber`] | not a finite number |
    /// | [`InputError::Negative`] | below zero |
    /// | [`InputError::NotInteger`] | fractional value for a `Count` |
    /// | [`InputError::NotAnOption`] | value outside a `Choice` set |
    pub fn parse_value(&self, raw: &str) -> Result<f64, InputError> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(InputError::Missing);
        }
        let value: f64 = trimmed
            .parse()
            .ok()
            .filter(|v: &f64| v.is_finite())
            .ok_or_else(|| InputError::NotANumber {
                raw: trimmed.to_string(),
            })?;

        match &self.kind {
            FieldKind::Count | FieldKind::Amount if value < 0.0 => {
                Err(InputError::Negative { value })
            }
            FieldKind::Count if value.fract() != 0.0 => Err(InputError::NotInteger { value }),
            FieldKind::Count | FieldKind::Amount => Ok(value),
            FieldKind::Choice(options) => {
                if options.iter().any(|o| o.value as f64 == value) {
                    Ok(value)
                } else {
                    Err(InputError::NotAnOption {
                        value,
                        allowed: options.iter().map(|o| o.value).collect(),
                    })
                }
            }
        }
    }
}

/// Ordered list of feature fields plus the label column.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeatureSchema {
    fields: Vec<FieldSpec>,
    target: String,
}

impl FeatureSchema {
    /// Build a schema from fields and a label column name.
    ///
    /// # Errors
    ///
    /// Returns [`DataError::InvalidSchema`] when there are no fields, a
    /// column name is empty or repeated, or the label column is also a
    /// feature.
    pub fn new(fields: Vec<FieldSpec>, target: impl Into<String>) -> Result<Self, DataError> {
        let target = target.into();
        if fields.is_empty() {
            return Err(DataError::InvalidSchema {
                reason: "no feature fields".to_string(),
            });
        }
        let mut seen = HashSet::new();
        for field in &fields {
            if field.column.is_empty() {
                return Err(DataError::InvalidSchema {
                    reason: "empty column name".to_string(),
                });
            }
            if !seen.insert(field.column.as_str()) {
                return Err(DataError::InvalidSchema {
                    reason: format!("column \"{}\" listed twice", field.column),
                });
            }
        }
        if target.is_empty() || seen.contains(target.as_str()) {
            return Err(DataError::InvalidSchema {
                reason: format!("label column \"{target}\" is empty or also a feature"),
            });
        }
        Ok(Self { fields, target })
    }

    /// The telecom churn schema: 13 usage features and the `Churn` label.
    ///
    /// Column names match the dataset header exactly, including the double
    /// spaces in three of them.
    #[must_use]
    pub fn churn() -> Self {
        let fields = vec![
            FieldSpec::count("Call  Failure", "Call Failure", "Number of failed calls"),
            FieldSpec::choice(
                "Complains",
                "Complains",
                "Whether the customer has complained",
                vec![
                    ChoiceOption::new(0, "0 (no complaint)"),
                    ChoiceOption::new(1, "1 (complaint)"),
                ],
            ),
            FieldSpec::count(
                "Subscription  Length",
                "Subscription Length (months)",
                "Total months of subscription",
            ),
            FieldSpec::count(
                "Charge  Amount",
                "Charge Amount (0-9)",
                "0 = lowest charge, 9 = highest charge",
            ),
            FieldSpec::count("Seconds of Use", "Seconds of Use", "Total seconds of calls"),
            FieldSpec::count("Frequency of use", "Frequency of Use", "Total number of calls"),
            FieldSpec::count("Frequency of SMS", "Frequency of SMS", "Total number of text messages"),
            FieldSpec::count(
                "Distinct Called Numbers",
                "Distinct Called Numbers",
                "Total number of distinct phone numbers called",
            ),
            FieldSpec::choice(
                "Age Group",
                "Age Group",
                "1 = youngest, 5 = oldest",
                (1..=5).map(|g| ChoiceOption::new(g, &g.to_string())).collect(),
            ),
            FieldSpec::choice(
                "Tariff Plan",
                "Tariff Plan",
                "Billing plan",
                vec![
                    ChoiceOption::new(1, "1 (pay as you go)"),
                    ChoiceOption::new(2, "2 (contractual)"),
                ],
            ),
            FieldSpec::choice(
                "Status",
                "Status",
                "Customer status",
                vec![
                    ChoiceOption::new(1, "1 (active)"),
                    ChoiceOption::new(2, "2 (non-active)"),
                ],
            ),
            FieldSpec::count("Age", "Age (years)", "Customer age in years"),
            FieldSpec::amount("Customer Value", "Customer Value", "Calculated value of the customer"),
        ];
        Self {
            fields,
            target: "Churn".to_string(),
        }
    }

    /// Return the feature fields in model order.
    #[must_use]
    pub fn fields(&self) -> &[FieldSpec] {
        &self.fields
    }

    /// Return the number of features.
    #[must_use]
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Return `true` if the schema has no features. Never true for a built schema.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Return the label column name.
    #[must_use]
    pub fn target(&self) -> &str {
        &self.target
    }

    /// Return the feature column names in model order.
    #[must_use]
    pub fn column_names(&self) -> Vec<String> {
        self.fields.iter().map(|f| f.column.clone()).collect()
    }

    /// Return the display labels in model order.
    #[must_use]
    pub fn labels(&self) -> Vec<String> {
        self.fields.iter().map(|f| f.label.clone()).collect()
    }

    /// Every column the CSV must contain: features in order, then the label.
    pub fn required_columns(&self) -> impl Iterator<Item = &str> {
        self.fields
            .iter()
            .map(|f| f.column.as_str())
            .chain(std::iter::once(self.target.as_str()))
    }
}

impl Default for FeatureSchema {
    fn default() -> Self {
        Self::churn()
    }
}
