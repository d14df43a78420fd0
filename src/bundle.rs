use crate::classifier::Classifier;
use crate::encoder::LabelEncoder;
use crate::error::BundleError;
use crate::schema::{FeatureKind, Schema};
use rmp_serde::{decode::from_read, encode::write_named};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::ffi::OsString;
use std::fs::{self, File};
use std::io::{BufReader, BufWriter};
use std::path::{Path, PathBuf};
use tracing::info;

/// Everything the predictor needs to encode a record exactly as the trainer did.
///
/// A bundle is never modified after training. Retraining writes a new file
/// that replaces the old one in a single rename.
#[derive(Serialize, Deserialize)]
pub struct ModelBundle {
    model: Classifier,
    columns: Vec<String>,
    categorical_cols: Vec<String>,
    label_encoders: BTreeMap<String, LabelEncoder>,
    schema: Schema,
    numeric_means: BTreeMap<String, f64>,
}

impl ModelBundle {
    pub(crate) fn new(
        model: Classifier,
        schema: Schema,
        label_encoders: BTreeMap<String, LabelEncoder>,
        numeric_means: BTreeMap<String, f64>,
    ) -> Result<Self, BundleError> {
        let bundle = Self {
            model,
            columns: schema.columns(),
            categorical_cols: schema.categorical_columns(),
            label_encoders,
            schema,
            numeric_means,
        };
        bundle.validate()?;
        Ok(bundle)
    }

    pub fn model(&self) -> &Classifier {
        &self.model
    }

    /// Feature column order the model was trained with.
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn categorical_cols(&self) -> &[String] {
        &self.categorical_cols
    }

    pub fn label_encoder(&self, column: &str) -> Option<&LabelEncoder> {
        self.label_encoders.get(column)
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    pub fn numeric_mean(&self, column: &str) -> Option<f64> {
        self.numeric_means.get(column).copied()
    }

    /// Checks that every field agrees with the others.
    pub fn validate(&self) -> Result<(), BundleError> {
        let fail = |reason: String| Err(BundleError::Inconsistent(reason));

        if self.columns.is_empty() {
            return fail("no feature columns".to_string());
        }
        if self.columns != self.schema.columns() {
            return fail("column order differs from the recorded schema".to_string());
        }
        if self.categorical_cols != self.schema.categorical_columns() {
            return fail("categorical columns differ from the recorded schema".to_string());
        }
        for feature in &self.schema.features {
            match feature.kind {
                FeatureKind::Categorical => match self.label_encoders.get(&feature.name) {
                    Some(encoder) if encoder.is_well_formed() => {}
                    Some(_) => return fail(format!("encoder for `{}` is malformed", feature.name)),
                    None => return fail(format!("no encoder for `{}`", feature.name)),
                },
                FeatureKind::Numeric => {
                    if !self.numeric_means.contains_key(&feature.name) {
                        return fail(format!("no training mean for `{}`", feature.name));
                    }
                }
            }
        }
        if let Some(extra) = self
            .label_encoders
            .keys()
            .find(|name| !self.categorical_cols.contains(name))
        {
            return fail(format!("encoder for undeclared column `{extra}`"));
        }
        if let Some(width) = self.model.n_features() {
            if width != self.columns.len() {
                return fail(format!(
                    "model expects {width} features but {} columns are recorded",
                    self.columns.len()
                ));
            }
        }
        Ok(())
    }

    /// Writes the bundle as MessagePack next to `path`, then renames it into place.
    pub fn save_to_file(&self, path: &Path) -> Result<(), BundleError> {
        let tmp = temp_path(path);
        let io_err = |path: &Path| {
            let path = path.to_path_buf();
            move |source: std::io::Error| BundleError::Io { path, source }
        };

        let result = (|| -> Result<(), BundleError> {
            let file = File::create(&tmp).map_err(io_err(&tmp))?;
            let mut writer = BufWriter::new(file);
            write_named(&mut writer, self)?;
            let file = writer
                .into_inner()
                .map_err(|e| io_err(&tmp)(e.into_error()))?;
            file.sync_all().map_err(io_err(&tmp))?;
            fs::rename(&tmp, path).map_err(io_err(path))
        })();

        if result.is_err() {
            let _ = fs::remove_file(&tmp);
        } else {
            info!("Saved model bundle to {:?}", path);
        }
        result
    }

    /// Loads and validates a bundle written by [`ModelBundle::save_to_file`].
    pub fn load_from_file(path: &Path) -> Result<Self, BundleError> {
        let file = File::open(path).map_err(|source| BundleError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let bundle: Self =
            from_read(BufReader::new(file)).map_err(|source| BundleError::Decode {
                path: path.to_path_buf(),
                source,
            })?;
        bundle.validate()?;
        info!(
            "Loaded model bundle from {:?} ({} columns, {:?})",
            path,
            bundle.columns.len(),
            bundle.model.kind()
        );
        Ok(bundle)
    }
}

fn temp_path(path: &Path) -> PathBuf {
    let mut name = OsString::from(path.as_os_str());
    name.push(".tmp");
    PathBuf::from(name)
}
