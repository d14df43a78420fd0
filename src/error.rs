use std::path::PathBuf;

/// Fatal errors raised while building a bundle from a dataset.
#[derive(Debug, thiserror::Error)]
pub enum TrainError {
    #[error("Failed to read dataset {path}: {source}")]
    Csv { path: PathBuf, source: csv::Error },
    #[error("Dataset is missing required column `{0}`")]
    MissingColumn(String),
    #[error("No rows left after keeping labels `{positive}`/`{negative}`")]
    NoLabeledRows { positive: String, negative: String },
    #[error("Categorical column `{0}` contains only missing values")]
    EmptyCategorical(String),
    #[error("Numeric column `{0}` contains no usable values")]
    EmptyNumeric(String),
    #[error("Invalid schema: {0}")]
    Schema(String),
    #[error("Classifier training failed: {0}")]
    Fit(String),
}

/// Errors raised while persisting or loading a model bundle.
#[derive(Debug, thiserror::Error)]
pub enum BundleError {
    #[error("Failed to access bundle {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Failed to encode bundle: {0}")]
    Encode(#[from] rmp_serde::encode::Error),
    #[error("Failed to decode bundle {path}: {source}")]
    Decode {
        path: PathBuf,
        source: rmp_serde::decode::Error,
    },
    #[error("Inconsistent bundle: {0}")]
    Inconsistent(String),
}

/// Per-request failures. None of these should take the server down.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum PredictError {
    #[error("Missing required field `{0}`")]
    MissingColumn(String),
    #[error("Value `{value}` for `{column}` was never seen during training")]
    UnknownCategory { column: String, value: String },
    #[error("Value `{value}` for `{column}` is not a usable number")]
    InvalidNumeric { column: String, value: String },
    #[error("Classifier returned label {0}, expected 0 or 1")]
    ClassifierContract(usize),
}

/// Errors raised while reading the TOML configuration file.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Failed to parse config {path}: {source}")]
    ParseToml {
        path: PathBuf,
        source: toml::de::Error,
    },
    #[error("Invalid schema in {path}: {reason}")]
    Schema { path: PathBuf, reason: String },
}
