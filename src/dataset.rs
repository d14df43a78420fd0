use crate::error::TrainError;
use crate::schema::Schema;
use rand::SeedableRng;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use std::collections::BTreeMap;
use std::io::Read;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Label-filtered dataset with raw feature cells grouped by column.
///
/// Cells are `None` where the CSV field was empty.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LabeledData {
    pub columns: BTreeMap<String, Vec<Option<String>>>,
    /// 1 for the positive label, 0 for the negative one.
    pub labels: Vec<usize>,
    /// Rows discarded because their label was missing or unrecognized.
    pub dropped_rows: usize,
}

impl LabeledData {
    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    pub fn column(&self, name: &str) -> Option<&[Option<String>]> {
        self.columns.get(name).map(Vec::as_slice)
    }
}

/// Reads a dataset CSV, keeping only rows with a recognized label.
pub fn read_csv(path: &Path, schema: &Schema) -> Result<LabeledData, TrainError> {
    let reader = csv::Reader::from_path(path).map_err(|source| TrainError::Csv {
        path: path.to_path_buf(),
        source,
    })?;
    collect(reader, schema, path)
}

/// Same as [`read_csv`] for an in-memory or streamed source.
pub fn from_reader<R: Read>(reader: R, schema: &Schema) -> Result<LabeledData, TrainError> {
    collect(csv::Reader::from_reader(reader), schema, Path::new("<reader>"))
}

fn collect<R: Read>(
    mut reader: csv::Reader<R>,
    schema: &Schema,
    path: &Path,
) -> Result<LabeledData, TrainError> {
    let csv_err = |source: csv::Error| TrainError::Csv {
        path: PathBuf::from(path),
        source,
    };
    let headers = reader.headers().map_err(csv_err)?.clone();
    let position = |name: &str| {
        headers
            .iter()
            .position(|h| h == name)
            .ok_or_else(|| TrainError::MissingColumn(name.to_string()))
    };

    // The id column carries no signal, but its absence means the file is not the expected dataset.
    position(&schema.id_column)?;
    let label_idx = position(&schema.label_column)?;
    let feature_idx = schema
        .features
        .iter()
        .map(|f| position(&f.name).map(|idx| (f.name.as_str(), idx)))
        .collect::<Result<Vec<_>, _>>()?;

    for header in headers.iter() {
        if header != schema.id_column
            && header != schema.label_column
            && schema.feature(header).is_none()
        {
            warn!("Ignoring column `{header}`: not declared in the feature schema");
        }
    }

    let mut data = LabeledData {
        columns: feature_idx
            .iter()
            .map(|(name, _)| (name.to_string(), Vec::new()))
            .collect(),
        ..LabeledData::default()
    };

    for result in reader.records() {
        let record = result.map_err(csv_err)?;
        let label = match record.get(label_idx) {
            Some(l) if l == schema.positive_label => 1,
            Some(l) if l == schema.negative_label => 0,
            _ => {
                data.dropped_rows += 1;
                continue;
            }
        };
        data.labels.push(label);
        for (name, idx) in &feature_idx {
            let cell = record
                .get(*idx)
                .map(str::trim)
                .filter(|c| !c.is_empty())
                .map(str::to_string);
            if let Some(column) = data.columns.get_mut(*name) {
                column.push(cell);
            }
        }
    }

    if data.is_empty() {
        return Err(TrainError::NoLabeledRows {
            positive: schema.positive_label.clone(),
            negative: schema.negative_label.clone(),
        });
    }
    if data.dropped_rows > 0 {
        debug!(
            "Dropped {} rows without a `{}`/`{}` label",
            data.dropped_rows, schema.positive_label, schema.negative_label
        );
    }
    info!(
        "Loaded {} labeled rows from {:?} ({} dropped)",
        data.len(),
        path,
        data.dropped_rows
    );
    Ok(data)
}

/// Row indices for a train/test split.
#[derive(Debug, Clone, PartialEq)]
pub struct DatasetSplit {
    pub train: Vec<usize>,
    pub test: Vec<usize>,
}

/// Shuffles `0..n_rows` with a fixed seed and holds out `test_ratio` of them.
///
/// The test size is rounded up, but at least one row always stays in training.
pub fn train_test_split(n_rows: usize, test_ratio: f64, seed: u64) -> DatasetSplit {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut rows: Vec<usize> = (0..n_rows).collect();
    rows.shuffle(&mut rng);

    let test_size = ((n_rows as f64) * test_ratio).ceil() as usize;
    let test_size = test_size.min(n_rows.saturating_sub(1));
    let test = rows[..test_size].to_vec();
    let train = rows[test_size..].to_vec();

    DatasetSplit { train, test }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{ATTENDANCE_RATE, EXTRACURRICULAR, PARENT_EDUCATION};

    const HEADER: &str = "Student ID,Study Hours per Week,Attendance Rate,Previous Grades,Participation in Extracurricular Activities,Parent Education Level,Passed\n";

    fn parse(body: &str) -> Result<LabeledData, TrainError> {
        from_reader(format!("{HEADER}{body}").as_bytes(), &Schema::default())
    }

    #[test]
    fn keeps_only_recognized_labels() {
        let data = parse(
            "S1,10,80,70,Yes,Bachelor,Yes\n\
             S2,5,60,50,No,Master,No\n\
             S3,7,70,60,No,Master,\n\
             S4,7,70,60,No,Master,maybe\n",
        )
        .unwrap();
        assert_eq!(data.labels, vec![1, 0]);
        assert_eq!(data.dropped_rows, 2);
        assert_eq!(
            data.column(PARENT_EDUCATION).unwrap(),
            [Some("Bachelor".to_string()), Some("Master".to_string())]
        );
    }

    #[test]
    fn empty_cells_are_missing() {
        let data = parse("S1,10,,70,,Bachelor,Yes\n").unwrap();
        assert_eq!(data.column(ATTENDANCE_RATE).unwrap(), [None::<String>]);
        assert_eq!(data.column(EXTRACURRICULAR).unwrap(), [None::<String>]);
    }

    #[test]
    fn missing_required_column_is_fatal() {
        let csv = "Student ID,Study Hours per Week,Passed\nS1,10,Yes\n";
        let err = from_reader(csv.as_bytes(), &Schema::default()).unwrap_err();
        assert!(matches!(err, TrainError::MissingColumn(c) if c == ATTENDANCE_RATE));
    }

    #[test]
    fn no_labeled_rows_is_fatal() {
        let err = parse("S1,10,80,70,Yes,Bachelor,\n").unwrap_err();
        assert!(matches!(err, TrainError::NoLabeledRows { .. }));
    }

    #[test]
    fn split_is_deterministic_and_disjoint() {
        let a = train_test_split(50, 0.2, 42);
        let b = train_test_split(50, 0.2, 42);
        assert_eq!(a, b);
        assert_eq!(a.test.len(), 10);
        assert_eq!(a.train.len(), 40);
        let mut all: Vec<usize> = a.train.iter().chain(&a.test).copied().collect();
        all.sort_unstable();
        assert_eq!(all, (0..50).collect::<Vec<_>>());
    }

    #[test]
    fn split_never_empties_training() {
        let split = train_test_split(1, 0.2, 7);
        assert_eq!(split.train, vec![0]);
        assert!(split.test.is_empty());
    }
}
