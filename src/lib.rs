//! # student_predictor 🎓
//!
//! Predict whether a student passes from five attributes, using a classifier
//! trained offline on a CSV dataset.
//!
//! The trainer fits one categorical encoder per categorical column and a
//! classifier, then writes everything the serving side needs into a single
//! [`ModelBundle`]. The [`Predictor`] loads that bundle once and encodes every
//! request exactly the way the training rows were encoded: same category codes,
//! same column order.
//!
//! ## Features
//! - Declared feature schema (numeric with valid range, or categorical)
//! - Dense, sorted categorical encoding with strict rejection of unseen values
//! - Random forest over [`linfa-trees`](https://crates.io/crates/linfa-trees), or Gaussian naive Bayes
//! - Bundle persistence with `rmp-serde` (MessagePack), replaced atomically
//! - Axum HTTP front-end with an HTML form and a JSON endpoint
//! - Benchmarkable with [Criterion](https://crates.io/crates/criterion)
//!
//! ## Example
//! ```rust,no_run
//! use std::collections::HashMap;
//! use std::path::Path;
//! use student_predictor::{NumericFallback, Predictor, Schema, Trainer, TrainingConfig};
//!
//! let trainer = Trainer::new(Schema::default(), TrainingConfig::default()).unwrap();
//! let (bundle, report) = trainer
//!     .train_from_csv(Path::new("student_performance_prediction.csv"))
//!     .unwrap();
//! bundle.save_to_file(Path::new("model.msgpack")).unwrap();
//! println!("Held-out accuracy: {:?}", report.accuracy);
//!
//! let predictor = Predictor::load(Path::new("model.msgpack"), NumericFallback::Zero).unwrap();
//! let record: HashMap<String, String> = [
//!     ("Study Hours per Week", "15"),
//!     ("Attendance Rate", "90"),
//!     ("Previous Grades", "85"),
//!     ("Participation in Extracurricular Activities", "Yes"),
//!     ("Parent Education Level", "Bachelor"),
//! ]
//! .into_iter()
//! .map(|(k, v)| (k.to_string(), v.to_string()))
//! .collect();
//! println!("{}", predictor.predict(&record).unwrap());
//! ```

pub mod bundle;
pub mod classifier;
pub mod config;
pub mod dataset;
pub mod encoder;
pub mod error;
pub mod predictor;
pub mod preprocess;
pub mod schema;
pub mod server;
pub mod trainer;

#[cfg(test)]
mod test_support;

pub use bundle::ModelBundle;
pub use classifier::{Classifier, ClassifierKind, ForestParams};
pub use config::{Config, NumericFallback, ServingConfig, TrainingConfig};
pub use encoder::LabelEncoder;
pub use error::{BundleError, ConfigError, PredictError, TrainError};
pub use predictor::{Outcome, Predictor, Record};
pub use schema::{FeatureKind, FeatureSpec, Schema};
pub use trainer::{TrainReport, Trainer};
