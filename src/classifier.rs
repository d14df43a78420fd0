//! Binary classifiers over a fixed-width numeric feature vector.
//!
//! The default is a random forest: decision trees from `linfa-trees`, each fit
//! on a bootstrap sample of rows and a random subset of features, combined by
//! majority vote. Gaussian naive Bayes from `linfa-bayes` is kept as a lighter
//! alternative.

use crate::error::TrainError;
use linfa::prelude::*;
use linfa_bayes::GaussianNb;
use linfa_trees::DecisionTree;
use ndarray::{Array1, Array2, Axis};
use rand::{Rng, SeedableRng};
use rand::rngs::StdRng;
use rand::seq::index;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum ClassifierKind {
    #[default]
    RandomForest,
    GaussianNb,
}

/// Random forest hyper-parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ForestParams {
    pub n_trees: usize,
    pub max_depth: Option<usize>,
    /// Features drawn per tree. `None` uses the square root of the feature count.
    pub max_features: Option<usize>,
    /// Sample rows with replacement for each tree.
    pub bootstrap: bool,
}

impl Default for ForestParams {
    fn default() -> Self {
        Self {
            n_trees: 100,
            max_depth: None,
            max_features: None,
            bootstrap: true,
        }
    }
}

impl ForestParams {
    fn features_per_tree(&self, n_features: usize) -> usize {
        let default = (n_features as f64).sqrt().round() as usize;
        self.max_features.unwrap_or(default).clamp(1, n_features)
    }
}

#[derive(Serialize, Deserialize)]
struct ForestTree {
    features: Vec<usize>,
    tree: DecisionTree<f64, usize>,
}

/// Bagged decision trees with per-tree feature subsets.
#[derive(Serialize, Deserialize)]
pub struct RandomForest {
    n_features: usize,
    trees: Vec<ForestTree>,
}

impl RandomForest {
    pub fn fit(
        records: &Array2<f64>,
        labels: &Array1<usize>,
        params: &ForestParams,
        seed: u64,
    ) -> Result<Self, TrainError> {
        let (n_rows, n_features) = records.dim();
        if n_rows == 0 || n_features == 0 {
            return Err(TrainError::Fit("empty feature matrix".to_string()));
        }
        if params.n_trees == 0 {
            return Err(TrainError::Fit("forest needs at least one tree".to_string()));
        }

        let mut rng = StdRng::seed_from_u64(seed);
        let per_tree = params.features_per_tree(n_features);
        let mut trees = Vec::with_capacity(params.n_trees);

        for _ in 0..params.n_trees {
            let rows: Vec<usize> = if params.bootstrap {
                (0..n_rows).map(|_| rng.random_range(0..n_rows)).collect()
            } else {
                (0..n_rows).collect()
            };
            let mut features = index::sample(&mut rng, n_features, per_tree).into_vec();
            features.sort_unstable();

            let x = records.select(Axis(0), &rows).select(Axis(1), &features);
            let y = labels.select(Axis(0), &rows);
            let tree = DecisionTree::params()
                .max_depth(params.max_depth)
                .fit(&Dataset::new(x, y))
                .map_err(|e| TrainError::Fit(e.to_string()))?;
            trees.push(ForestTree { features, tree });
        }

        Ok(Self { n_features, trees })
    }

    /// Majority vote per row; ties go to the smaller label.
    pub fn predict(&self, records: &Array2<f64>) -> Array1<usize> {
        let mut votes: Vec<BTreeMap<usize, usize>> = vec![BTreeMap::new(); records.nrows()];
        for member in &self.trees {
            let x = records.select(Axis(1), &member.features);
            let predicted: Array1<usize> = member.tree.predict(&x);
            for (row, label) in predicted.iter().enumerate() {
                *votes[row].entry(*label).or_insert(0) += 1;
            }
        }
        votes
            .into_iter()
            .map(|counts| {
                counts
                    .into_iter()
                    .fold(None, |best: Option<(usize, usize)>, (label, count)| match best {
                        Some((_, best_count)) if best_count >= count => best,
                        _ => Some((label, count)),
                    })
                    .map_or(0, |(label, _)| label)
            })
            .collect()
    }

    pub fn n_trees(&self) -> usize {
        self.trees.len()
    }
}

/// Trained model stored in the bundle.
#[derive(Serialize, Deserialize)]
pub enum Classifier {
    RandomForest(RandomForest),
    GaussianNb(GaussianNb<f64, usize>),
}

impl Classifier {
    pub fn fit(
        kind: ClassifierKind,
        records: &Array2<f64>,
        labels: &Array1<usize>,
        forest: &ForestParams,
        seed: u64,
    ) -> Result<Self, TrainError> {
        match kind {
            ClassifierKind::RandomForest => {
                RandomForest::fit(records, labels, forest, seed).map(Classifier::RandomForest)
            }
            ClassifierKind::GaussianNb => {
                let dataset = Dataset::new(records.clone(), labels.clone());
                GaussianNb::params()
                    .fit(&dataset)
                    .map(Classifier::GaussianNb)
                    .map_err(|e| TrainError::Fit(e.to_string()))
            }
        }
    }

    pub fn kind(&self) -> ClassifierKind {
        match self {
            Classifier::RandomForest(_) => ClassifierKind::RandomForest,
            Classifier::GaussianNb(_) => ClassifierKind::GaussianNb,
        }
    }

    /// Width of the feature vector the model was fit on, when the model records it.
    pub fn n_features(&self) -> Option<usize> {
        match self {
            Classifier::RandomForest(forest) => Some(forest.n_features),
            Classifier::GaussianNb(_) => None,
        }
    }

    pub fn predict(&self, records: &Array2<f64>) -> Array1<usize> {
        match self {
            Classifier::RandomForest(forest) => forest.predict(records),
            Classifier::GaussianNb(model) => model.predict(records),
        }
    }

    /// Fraction of rows whose prediction matches `labels`.
    pub fn accuracy(&self, records: &Array2<f64>, labels: &Array1<usize>) -> Option<f64> {
        if labels.is_empty() {
            return None;
        }
        let predicted = self.predict(records);
        let correct = predicted
            .iter()
            .zip(labels.iter())
            .filter(|(p, l)| p == l)
            .count();
        Some(correct as f64 / labels.len() as f64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    fn separable() -> (Array2<f64>, Array1<usize>) {
        let x = array![
            [1.0, 0.0, 5.0],
            [2.0, 0.0, 4.0],
            [3.0, 1.0, 5.0],
            [8.0, 1.0, 4.0],
            [9.0, 0.0, 5.0],
            [10.0, 1.0, 4.0],
        ];
        (x, array![0, 0, 0, 1, 1, 1])
    }

    #[test]
    fn forest_fits_separable_data() {
        let (x, y) = separable();
        let params = ForestParams {
            n_trees: 15,
            max_features: Some(3),
            bootstrap: false,
            ..ForestParams::default()
        };
        let model = Classifier::fit(ClassifierKind::RandomForest, &x, &y, &params, 42).unwrap();
        assert_eq!(model.accuracy(&x, &y), Some(1.0));
        assert_eq!(model.n_features(), Some(3));
    }

    #[test]
    fn same_seed_gives_same_forest_predictions() {
        let (x, y) = separable();
        let params = ForestParams {
            n_trees: 10,
            ..ForestParams::default()
        };
        let a = RandomForest::fit(&x, &y, &params, 7).unwrap();
        let b = RandomForest::fit(&x, &y, &params, 7).unwrap();
        assert_eq!(a.predict(&x), b.predict(&x));
        assert_eq!(a.n_trees(), 10);
    }

    #[test]
    fn single_class_forest_predicts_that_class() {
        let (x, _) = separable();
        let y = Array1::zeros(x.nrows());
        let model = RandomForest::fit(&x, &y, &ForestParams::default(), 42).unwrap();
        assert!(model.predict(&x).iter().all(|&label| label == 0));
    }

    #[test]
    fn gaussian_nb_fits_separable_data() {
        let (x, y) = separable();
        let model =
            Classifier::fit(ClassifierKind::GaussianNb, &x, &y, &ForestParams::default(), 0)
                .unwrap();
        assert_eq!(model.kind(), ClassifierKind::GaussianNb);
        assert_eq!(model.accuracy(&x, &y), Some(1.0));
    }

    #[test]
    fn zero_trees_is_rejected() {
        let (x, y) = separable();
        let params = ForestParams {
            n_trees: 0,
            ..ForestParams::default()
        };
        assert!(RandomForest::fit(&x, &y, &params, 42).is_err());
    }

    #[test]
    fn default_feature_subset_is_square_root() {
        let params = ForestParams::default();
        assert_eq!(params.features_per_tree(5), 2);
        assert_eq!(params.features_per_tree(1), 1);
        let capped = ForestParams {
            max_features: Some(10),
            ..params
        };
        assert_eq!(capped.features_per_tree(5), 5);
    }
}
