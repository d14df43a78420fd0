use crate::bundle::ModelBundle;
use crate::config::NumericFallback;
use crate::error::{BundleError, PredictError};
use crate::schema::FeatureKind;
use ndarray::{Array1, Array2, Axis};
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::hash::BuildHasher;
use std::path::Path;
use tracing::{debug, warn};

/// Binary outcome surfaced to callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Pass,
    Fail,
}

impl Outcome {
    /// Maps the classifier's raw label; anything but 0/1 breaks the model contract.
    pub fn from_label(label: usize) -> Result<Self, PredictError> {
        match label {
            1 => Ok(Outcome::Pass),
            0 => Ok(Outcome::Fail),
            other => Err(PredictError::ClassifierContract(other)),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Outcome::Pass => "Pass",
            Outcome::Fail => "Fail",
        }
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A raw request: field values looked up by column name.
pub trait Record {
    fn field(&self, name: &str) -> Option<&str>;
}

impl<S: BuildHasher> Record for HashMap<String, String, S> {
    fn field(&self, name: &str) -> Option<&str> {
        self.get(name).map(String::as_str)
    }
}

impl Record for BTreeMap<String, String> {
    fn field(&self, name: &str) -> Option<&str> {
        self.get(name).map(String::as_str)
    }
}

impl Record for [(&str, &str)] {
    fn field(&self, name: &str) -> Option<&str> {
        self.iter().find(|(key, _)| *key == name).map(|(_, value)| *value)
    }
}

/// Immutable prediction service built once from a loaded bundle.
///
/// Holds no per-request state, so one instance can be shared across threads.
pub struct Predictor {
    bundle: ModelBundle,
    fallback: NumericFallback,
}

impl Predictor {
    pub fn new(bundle: ModelBundle, fallback: NumericFallback) -> Self {
        Self { bundle, fallback }
    }

    /// Loads the bundle at `path`. Any failure here should stop the process from serving.
    pub fn load(path: &Path, fallback: NumericFallback) -> Result<Self, BundleError> {
        ModelBundle::load_from_file(path).map(|bundle| Self::new(bundle, fallback))
    }

    pub fn bundle(&self) -> &ModelBundle {
        &self.bundle
    }

    pub fn columns(&self) -> &[String] {
        self.bundle.columns()
    }

    pub fn fallback(&self) -> NumericFallback {
        self.fallback
    }

    /// Builds the single-row feature vector in bundle column order.
    pub fn encode<R: Record + ?Sized>(&self, record: &R) -> Result<Array2<f64>, PredictError> {
        let schema = self.bundle.schema();
        let mut row = Vec::with_capacity(schema.features.len());

        for feature in &schema.features {
            let raw = record
                .field(&feature.name)
                .ok_or_else(|| PredictError::MissingColumn(feature.name.clone()))?;
            let value = match feature.kind {
                FeatureKind::Categorical => {
                    let encoder = self
                        .bundle
                        .label_encoder(&feature.name)
                        .ok_or_else(|| PredictError::MissingColumn(feature.name.clone()))?;
                    // Cells are trimmed when the encoder is fit.
                    let code = encoder.transform(raw.trim()).ok_or_else(|| {
                        PredictError::UnknownCategory {
                            column: feature.name.clone(),
                            value: raw.to_string(),
                        }
                    })?;
                    code as f64
                }
                FeatureKind::Numeric => match raw.trim().parse::<f64>() {
                    Ok(value) if feature.in_range(value) => value,
                    _ => self.fill_numeric(&feature.name, raw)?,
                },
            };
            row.push(value);
        }

        Ok(Array1::from_vec(row).insert_axis(Axis(0)))
    }

    fn fill_numeric(&self, column: &str, raw: &str) -> Result<f64, PredictError> {
        let filled = match self.fallback {
            NumericFallback::Zero => 0.0,
            NumericFallback::Mean => self.bundle.numeric_mean(column).unwrap_or(0.0),
            NumericFallback::Reject => {
                return Err(PredictError::InvalidNumeric {
                    column: column.to_string(),
                    value: raw.to_string(),
                });
            }
        };
        warn!("Unusable value `{raw}` for `{column}`, filling with {filled}");
        Ok(filled)
    }

    /// Encodes `record` and asks the classifier for a label.
    pub fn predict<R: Record + ?Sized>(&self, record: &R) -> Result<Outcome, PredictError> {
        let features = self.encode(record)?;
        let labels = self.bundle.model().predict(&features);
        let label = labels
            .get(0)
            .copied()
            .ok_or(PredictError::ClassifierContract(usize::MAX))?;
        let outcome = Outcome::from_label(label)?;
        debug!("Predicted {outcome} for {:?}", features.row(0).to_vec());
        Ok(outcome)
    }
}
