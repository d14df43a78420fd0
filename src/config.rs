//! TOML configuration shared by the `train`, `serve` and `predict` commands.
//!
//! ```toml
//! [training]
//! test_ratio = 0.2
//! seed = 42
//! classifier = "random_forest"
//!
//! [training.forest]
//! n_trees = 100
//!
//! [serving]
//! address = "127.0.0.1:5000"
//! missing_numeric = "zero"
//!
//! [[schema.features]]
//! name = "Study Hours per Week"
//! kind = "numeric"
//! min = 0.0
//! max = 168.0
//! ```

use crate::classifier::{ClassifierKind, ForestParams};
use crate::error::ConfigError;
use crate::schema::Schema;
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::Path;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub schema: Schema,
    pub training: TrainingConfig,
    pub serving: ServingConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrainingConfig {
    /// Share of labeled rows held out for the accuracy report.
    pub test_ratio: f64,
    pub seed: u64,
    pub classifier: ClassifierKind,
    pub forest: ForestParams,
}

impl Default for TrainingConfig {
    fn default() -> Self {
        Self {
            test_ratio: 0.2,
            seed: 42,
            classifier: ClassifierKind::default(),
            forest: ForestParams::default(),
        }
    }
}

/// What to do with a numeric request value that is unparseable or outside its declared range.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum NumericFallback {
    /// Substitute 0.0.
    #[default]
    Zero,
    /// Substitute the column mean recorded at training time.
    Mean,
    /// Reject the request.
    Reject,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServingConfig {
    pub address: SocketAddr,
    pub missing_numeric: NumericFallback,
}

impl Default for ServingConfig {
    fn default() -> Self {
        Self {
            address: SocketAddr::from(([127, 0, 0, 1], 5000)),
            missing_numeric: NumericFallback::default(),
        }
    }
}

impl Config {
    /// Reads and validates a config file. Sections left out keep their defaults.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let config: Config = toml::from_str(&text).map_err(|source| ConfigError::ParseToml {
            path: path.to_path_buf(),
            source,
        })?;
        config
            .schema
            .validate()
            .map_err(|reason| ConfigError::Schema {
                path: path.to_path_buf(),
                reason,
            })?;
        Ok(config)
    }

    /// Loads `path` if given, otherwise returns the defaults.
    pub fn load_or_default(path: Option<&Path>) -> Result<Self, ConfigError> {
        match path {
            Some(path) => Self::load(path),
            None => Ok(Self::default()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::FeatureKind;
    use std::io::Write;

    fn write_config(text: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(text.as_bytes()).unwrap();
        file
    }

    #[test]
    fn empty_file_gives_defaults() {
        let file = write_config("");
        assert_eq!(Config::load(file.path()).unwrap(), Config::default());
    }

    #[test]
    fn partial_sections_keep_other_defaults() {
        let file = write_config(
            "[training]\nseed = 7\nclassifier = \"gaussian_nb\"\n\n[serving]\nmissing_numeric = \"mean\"\n",
        );
        let config = Config::load(file.path()).unwrap();
        assert_eq!(config.training.seed, 7);
        assert_eq!(config.training.test_ratio, 0.2);
        assert_eq!(config.training.classifier, ClassifierKind::GaussianNb);
        assert_eq!(config.serving.missing_numeric, NumericFallback::Mean);
        assert_eq!(config.serving.address.port(), 5000);
        assert_eq!(config.schema, Schema::default());
    }

    #[test]
    fn schema_features_can_be_replaced() {
        let file = write_config(
            "[[schema.features]]\nname = \"Hours\"\nkind = \"numeric\"\nmax = 24.0\n\n\
             [[schema.features]]\nname = \"Club\"\nkind = \"categorical\"\n",
        );
        let config = Config::load(file.path()).unwrap();
        assert_eq!(config.schema.columns(), vec!["Hours", "Club"]);
        assert_eq!(config.schema.features[0].kind, FeatureKind::Numeric);
        assert_eq!(config.schema.features[0].min, None);
        assert_eq!(config.schema.label_column, "Passed");
    }

    #[test]
    fn invalid_schema_is_rejected() {
        let file = write_config(
            "[[schema.features]]\nname = \"Club\"\nkind = \"categorical\"\nmin = 1.0\n",
        );
        assert!(matches!(
            Config::load(file.path()),
            Err(ConfigError::Schema { .. })
        ));
    }

    #[test]
    fn missing_file_is_an_error() {
        let err = Config::load(Path::new("/nonexistent/student_predictor.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::Read { .. }));
        assert_eq!(Config::load_or_default(None).unwrap(), Config::default());
    }
}
