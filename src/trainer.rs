use crate::bundle::ModelBundle;
use crate::classifier::Classifier;
use crate::config::TrainingConfig;
use crate::dataset::{self, LabeledData, train_test_split};
use crate::error::TrainError;
use crate::preprocess::prepare;
use crate::schema::Schema;
use ndarray::Axis;
use std::path::Path;
use tracing::info;

/// Summary of one training run.
#[derive(Debug, Clone, PartialEq)]
pub struct TrainReport {
    pub labeled_rows: usize,
    pub dropped_rows: usize,
    pub train_rows: usize,
    pub test_rows: usize,
    /// Accuracy on the held-out rows, `None` when nothing was held out.
    pub accuracy: Option<f64>,
}

/// Offline trainer: dataset in, bundle out.
pub struct Trainer {
    schema: Schema,
    config: TrainingConfig,
}

impl Trainer {
    pub fn new(schema: Schema, config: TrainingConfig) -> Result<Self, TrainError> {
        schema.validate().map_err(TrainError::Schema)?;
        if !(0.0..1.0).contains(&config.test_ratio) {
            return Err(TrainError::Schema(format!(
                "test ratio {} must be in [0, 1)",
                config.test_ratio
            )));
        }
        Ok(Self { schema, config })
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    pub fn train_from_csv(&self, path: &Path) -> Result<(ModelBundle, TrainReport), TrainError> {
        let data = dataset::read_csv(path, &self.schema)?;
        self.train(&data)
    }

    /// Encodes `data`, fits the classifier on the training split and bundles the result.
    ///
    /// Encoders and numeric means come from every labeled row, before the split,
    /// so the bundled encoders are exactly the ones that produced the training codes.
    pub fn train(&self, data: &LabeledData) -> Result<(ModelBundle, TrainReport), TrainError> {
        if data.is_empty() {
            return Err(TrainError::NoLabeledRows {
                positive: self.schema.positive_label.clone(),
                negative: self.schema.negative_label.clone(),
            });
        }
        let prepared = prepare(data, &self.schema)?;

        let split = train_test_split(data.len(), self.config.test_ratio, self.config.seed);
        let x_train = prepared.records.select(Axis(0), &split.train);
        let y_train = prepared.labels.select(Axis(0), &split.train);
        let x_test = prepared.records.select(Axis(0), &split.test);
        let y_test = prepared.labels.select(Axis(0), &split.test);

        info!(
            "Fitting {:?} on {} rows ({} held out)",
            self.config.classifier,
            split.train.len(),
            split.test.len()
        );
        let model = Classifier::fit(
            self.config.classifier,
            &x_train,
            &y_train,
            &self.config.forest,
            self.config.seed,
        )?;

        let accuracy = model.accuracy(&x_test, &y_test);
        match accuracy {
            Some(acc) => info!("Held-out accuracy: {:.2}%", acc * 100.0),
            None => info!("No rows held out, skipping evaluation"),
        }

        let bundle = ModelBundle::new(
            model,
            self.schema.clone(),
            prepared.label_encoders,
            prepared.numeric_means,
        )
        .map_err(|e| TrainError::Fit(e.to_string()))?;

        let report = TrainReport {
            labeled_rows: data.len(),
            dropped_rows: data.dropped_rows,
            train_rows: split.train.len(),
            test_rows: split.test.len(),
            accuracy,
        };
        Ok((bundle, report))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classifier::ClassifierKind;
    use crate::dataset::from_reader;

    const HEADER: &str = "Student ID,Study Hours per Week,Attendance Rate,Previous Grades,Participation in Extracurricular Activities,Parent Education Level,Passed\n";

    fn data(body: &str) -> LabeledData {
        from_reader(format!("{HEADER}{body}").as_bytes(), &Schema::default()).unwrap()
    }

    #[test]
    fn report_counts_rows() {
        let trainer = Trainer::new(Schema::default(), TrainingConfig::default()).unwrap();
        let (_, report) = trainer
            .train(&data(
                "S1,20,95,90,Yes,Master,Yes\n\
                 S2,2,40,30,No,High School,No\n\
                 S3,18,90,85,Yes,Bachelor,Yes\n\
                 S4,3,50,35,No,Associate,No\n\
                 S5,1,30,40,Yes,High School,\n",
            ))
            .unwrap();
        assert_eq!(report.labeled_rows, 4);
        assert_eq!(report.dropped_rows, 1);
        assert_eq!(report.test_rows, 1);
        assert_eq!(report.train_rows, 3);
        assert!(report.accuracy.is_some());
    }

    #[test]
    fn bundle_columns_follow_schema() {
        let config = TrainingConfig {
            classifier: ClassifierKind::GaussianNb,
            test_ratio: 0.0,
            ..TrainingConfig::default()
        };
        let trainer = Trainer::new(Schema::default(), config).unwrap();
        let (bundle, report) = trainer
            .train(&data(
                "S1,20,95,90,Yes,Master,Yes\n\
                 S2,2,40,30,No,High School,No\n\
                 S3,18,90,85,Yes,Bachelor,Yes\n\
                 S4,4,50,35,No,Associate,No\n",
            ))
            .unwrap();
        assert_eq!(bundle.columns(), Schema::default().columns().as_slice());
        assert_eq!(
            bundle.categorical_cols(),
            Schema::default().categorical_columns().as_slice()
        );
        assert_eq!(report.accuracy, None);
        assert_eq!(bundle.numeric_mean("Study Hours per Week"), Some(11.0));
    }

    #[test]
    fn invalid_test_ratio_is_rejected() {
        let config = TrainingConfig {
            test_ratio: 1.0,
            ..TrainingConfig::default()
        };
        assert!(Trainer::new(Schema::default(), config).is_err());
    }
}
