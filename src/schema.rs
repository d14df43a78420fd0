//! Declared feature schema.
//!
//! The schema is the single source of truth for which dataset columns become
//! features, in which order, and whether each is numeric or categorical.
//! Its feature order is recorded in the bundle as the model's column order.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;

pub const STUDY_HOURS: &str = "Study Hours per Week";
pub const ATTENDANCE_RATE: &str = "Attendance Rate";
pub const PREVIOUS_GRADES: &str = "Previous Grades";
pub const EXTRACURRICULAR: &str = "Participation in Extracurricular Activities";
pub const PARENT_EDUCATION: &str = "Parent Education Level";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FeatureKind {
    Numeric,
    Categorical,
}

/// One declared feature column.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureSpec {
    pub name: String,
    pub kind: FeatureKind,
    /// Inclusive lower bound, numeric features only.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min: Option<f64>,
    /// Inclusive upper bound, numeric features only.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max: Option<f64>,
}

impl FeatureSpec {
    pub fn numeric(name: &str, min: f64, max: f64) -> Self {
        Self {
            name: name.to_string(),
            kind: FeatureKind::Numeric,
            min: Some(min),
            max: Some(max),
        }
    }

    pub fn categorical(name: &str) -> Self {
        Self {
            name: name.to_string(),
            kind: FeatureKind::Categorical,
            min: None,
            max: None,
        }
    }

    pub fn is_categorical(&self) -> bool {
        self.kind == FeatureKind::Categorical
    }

    /// Whether `value` lies inside the declared range. Unbounded sides always pass.
    pub fn in_range(&self, value: f64) -> bool {
        if !value.is_finite() {
            return false;
        }
        self.min.is_none_or(|min| value >= min) && self.max.is_none_or(|max| value <= max)
    }
}

/// Dataset layout: identifier, label and the ordered feature columns.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Schema {
    pub id_column: String,
    pub label_column: String,
    pub positive_label: String,
    pub negative_label: String,
    pub features: Vec<FeatureSpec>,
}

impl Default for Schema {
    fn default() -> Self {
        Self {
            id_column: "Student ID".to_string(),
            label_column: "Passed".to_string(),
            positive_label: "Yes".to_string(),
            negative_label: "No".to_string(),
            features: vec![
                FeatureSpec::numeric(STUDY_HOURS, 0.0, 168.0),
                FeatureSpec::numeric(ATTENDANCE_RATE, 0.0, 100.0),
                FeatureSpec::numeric(PREVIOUS_GRADES, 0.0, 100.0),
                FeatureSpec::categorical(EXTRACURRICULAR),
                FeatureSpec::categorical(PARENT_EDUCATION),
            ],
        }
    }
}

impl Schema {
    /// Feature column names in model order.
    pub fn columns(&self) -> Vec<String> {
        self.features.iter().map(|f| f.name.clone()).collect()
    }

    /// Names of the categorical features, in model order.
    pub fn categorical_columns(&self) -> Vec<String> {
        self.features
            .iter()
            .filter(|f| f.is_categorical())
            .map(|f| f.name.clone())
            .collect()
    }

    pub fn feature(&self, name: &str) -> Option<&FeatureSpec> {
        self.features.iter().find(|f| f.name == name)
    }

    /// Checks the schema for internal consistency.
    pub fn validate(&self) -> Result<(), String> {
        if self.features.is_empty() {
            return Err("no feature columns declared".to_string());
        }
        if self.positive_label == self.negative_label {
            return Err(format!(
                "positive and negative labels are both `{}`",
                self.positive_label
            ));
        }
        let mut seen = HashSet::new();
        for feature in &self.features {
            if feature.name == self.id_column || feature.name == self.label_column {
                return Err(format!(
                    "`{}` cannot be both a feature and the id/label column",
                    feature.name
                ));
            }
            if !seen.insert(feature.name.as_str()) {
                return Err(format!("feature `{}` declared twice", feature.name));
            }
            match feature.kind {
                FeatureKind::Categorical if feature.min.is_some() || feature.max.is_some() => {
                    return Err(format!(
                        "categorical feature `{}` cannot declare a range",
                        feature.name
                    ));
                }
                FeatureKind::Numeric => {
                    if let (Some(min), Some(max)) = (feature.min, feature.max) {
                        if min > max {
                            return Err(format!(
                                "feature `{}` has min {min} above max {max}",
                                feature.name
                            ));
                        }
                    }
                }
                _ => {}
            }
        }
        Ok(())
    }
}
