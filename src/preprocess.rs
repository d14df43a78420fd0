use crate::dataset::LabeledData;
use crate::encoder::{LabelEncoder, most_frequent};
use crate::error::TrainError;
use crate::schema::{FeatureKind, FeatureSpec, Schema};
use ndarray::{Array1, Array2};
use std::collections::BTreeMap;
use tracing::{debug, warn};

/// Fully numeric training frame plus everything needed to encode new rows the same way.
#[derive(Debug)]
pub struct PreparedData {
    /// One row per labeled record, one column per schema feature, in schema order.
    pub records: Array2<f64>,
    pub labels: Array1<usize>,
    pub label_encoders: BTreeMap<String, LabelEncoder>,
    pub numeric_means: BTreeMap<String, f64>,
}

/// Imputes and encodes every declared feature of `data`.
///
/// Categorical gaps take the column's most frequent value before the encoder is
/// fit; numeric gaps (including unparseable or out-of-range cells) take the
/// column mean.
pub fn prepare(data: &LabeledData, schema: &Schema) -> Result<PreparedData, TrainError> {
    let n_rows = data.len();
    let mut columns: Vec<Vec<f64>> = Vec::with_capacity(schema.features.len());
    let mut label_encoders = BTreeMap::new();
    let mut numeric_means = BTreeMap::new();

    for feature in &schema.features {
        let cells = data
            .column(&feature.name)
            .ok_or_else(|| TrainError::MissingColumn(feature.name.clone()))?;
        let values = match feature.kind {
            FeatureKind::Categorical => {
                let (encoder, codes) = encode_categorical(&feature.name, cells)?;
                label_encoders.insert(feature.name.clone(), encoder);
                codes
            }
            FeatureKind::Numeric => {
                let (mean, values) = impute_numeric(feature, cells)?;
                numeric_means.insert(feature.name.clone(), mean);
                values
            }
        };
        columns.push(values);
    }

    let records = Array2::from_shape_fn((n_rows, columns.len()), |(row, col)| columns[col][row]);
    Ok(PreparedData {
        records,
        labels: Array1::from_vec(data.labels.clone()),
        label_encoders,
        numeric_means,
    })
}

fn encode_categorical(
    name: &str,
    cells: &[Option<String>],
) -> Result<(LabelEncoder, Vec<f64>), TrainError> {
    let mode = most_frequent(cells.iter().flatten().map(String::as_str))
        .ok_or_else(|| TrainError::EmptyCategorical(name.to_string()))?;
    let filled: Vec<&str> = cells
        .iter()
        .map(|cell| cell.as_deref().unwrap_or(mode))
        .collect();
    let encoder = LabelEncoder::fit(filled.iter().copied())
        .ok_or_else(|| TrainError::EmptyCategorical(name.to_string()))?;
    let codes = filled
        .iter()
        .map(|value| encoder.transform(value).map(|code| code as f64))
        .collect::<Option<Vec<_>>>()
        .ok_or_else(|| TrainError::EmptyCategorical(name.to_string()))?;
    debug!(
        "Encoded `{name}` with {} categories, missing filled with `{mode}`",
        encoder.len()
    );
    Ok((encoder, codes))
}

fn impute_numeric(
    feature: &FeatureSpec,
    cells: &[Option<String>],
) -> Result<(f64, Vec<f64>), TrainError> {
    let mut invalid = 0usize;
    let parsed: Vec<Option<f64>> = cells
        .iter()
        .map(|cell| {
            let raw = cell.as_deref()?;
            let value = raw.parse::<f64>().ok().filter(|v| feature.in_range(*v));
            if value.is_none() {
                invalid += 1;
            }
            value
        })
        .collect();
    if invalid > 0 {
        warn!(
            "`{}`: {invalid} unparseable or out-of-range values treated as missing",
            feature.name
        );
    }

    let present: Vec<f64> = parsed.iter().flatten().copied().collect();
    if present.is_empty() {
        return Err(TrainError::EmptyNumeric(feature.name.clone()));
    }
    let mean = present.iter().sum::<f64>() / present.len() as f64;
    let values = parsed.into_iter().map(|v| v.unwrap_or(mean)).collect();
    Ok((mean, values))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::from_reader;
    use crate::schema::{ATTENDANCE_RATE, EXTRACURRICULAR, PARENT_EDUCATION};

    fn data(body: &str) -> LabeledData {
        let csv = format!(
            "Student ID,Study Hours per Week,Attendance Rate,Previous Grades,Participation in Extracurricular Activities,Parent Education Level,Passed\n{body}"
        );
        from_reader(csv.as_bytes(), &Schema::default()).unwrap()
    }

    #[test]
    fn frame_follows_schema_order() {
        let prepared = prepare(
            &data("S1,10,80,70,Yes,Bachelor,Yes\nS2,5,60,50,No,Master,No\n"),
            &Schema::default(),
        )
        .unwrap();
        assert_eq!(prepared.records.dim(), (2, 5));
        assert_eq!(prepared.records.row(0).to_vec(), vec![10.0, 80.0, 70.0, 1.0, 0.0]);
        assert_eq!(prepared.records.row(1).to_vec(), vec![5.0, 60.0, 50.0, 0.0, 1.0]);
        assert_eq!(prepared.labels.to_vec(), vec![1, 0]);
    }

    #[test]
    fn categorical_gaps_take_the_mode() {
        let prepared = prepare(
            &data(
                "S1,10,80,70,No,Master,Yes\n\
                 S2,5,60,50,No,Master,No\n\
                 S3,5,60,50,Yes,,No\n\
                 S4,5,60,50,,Bachelor,No\n",
            ),
            &Schema::default(),
        )
        .unwrap();
        let extra = &prepared.label_encoders[EXTRACURRICULAR];
        assert_eq!(extra.classes(), ["No", "Yes"]);
        assert_eq!(prepared.records[[3, 3]], 0.0);
        let parent = &prepared.label_encoders[PARENT_EDUCATION];
        assert_eq!(prepared.records[[2, 4]], parent.transform("Master").unwrap() as f64);
    }

    #[test]
    fn numeric_gaps_take_the_mean() {
        let prepared = prepare(
            &data(
                "S1,10,80,70,No,Master,Yes\n\
                 S2,5,60,50,No,Master,No\n\
                 S3,5,,50,Yes,Master,No\n\
                 S4,5,250,50,Yes,Master,No\n\
                 S5,5,abc,50,Yes,Master,No\n",
            ),
            &Schema::default(),
        )
        .unwrap();
        assert_eq!(prepared.numeric_means[ATTENDANCE_RATE], 70.0);
        for row in 2..5 {
            assert_eq!(prepared.records[[row, 1]], 70.0);
        }
    }

    #[test]
    fn all_missing_categorical_is_fatal() {
        let err = prepare(
            &data("S1,10,80,70,,Master,Yes\nS2,5,60,50,,Master,No\n"),
            &Schema::default(),
        )
        .unwrap_err();
        assert!(matches!(err, TrainError::EmptyCategorical(c) if c == EXTRACURRICULAR));
    }

    #[test]
    fn all_missing_numeric_is_fatal() {
        let err = prepare(&data("S1,10,,70,No,Master,Yes\n"), &Schema::default()).unwrap_err();
        assert!(matches!(err, TrainError::EmptyNumeric(c) if c == ATTENDANCE_RATE));
    }
}
