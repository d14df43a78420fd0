use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// Bijective mapping between observed category strings and dense codes `0..k`.
///
/// Categories are kept sorted, so a category's code is its position in that
/// order. The same encoder encodes the training frame and is shipped in the
/// bundle for serving.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LabelEncoder {
    classes: Vec<String>,
}

impl LabelEncoder {
    /// Fits an encoder from the observed values. Returns `None` if nothing was observed.
    pub fn fit<'a, I>(values: I) -> Option<Self>
    where
        I: IntoIterator<Item = &'a str>,
    {
        let classes: BTreeSet<&str> = values.into_iter().collect();
        if classes.is_empty() {
            return None;
        }
        Some(Self {
            classes: classes.into_iter().map(str::to_string).collect(),
        })
    }

    /// Code for `value`, or `None` if it was never observed during fitting.
    pub fn transform(&self, value: &str) -> Option<usize> {
        self.classes
            .binary_search_by(|class| class.as_str().cmp(value))
            .ok()
    }

    pub fn inverse_transform(&self, code: usize) -> Option<&str> {
        self.classes.get(code).map(String::as_str)
    }

    /// Known categories in code order.
    pub fn classes(&self) -> &[String] {
        &self.classes
    }

    pub fn contains(&self, value: &str) -> bool {
        self.transform(value).is_some()
    }

    pub fn len(&self) -> usize {
        self.classes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.classes.is_empty()
    }

    /// A deserialized encoder is only usable if its classes are strictly sorted.
    pub(crate) fn is_well_formed(&self) -> bool {
        !self.classes.is_empty() && self.classes.windows(2).all(|w| w[0] < w[1])
    }
}

/// Most frequent value, ties broken by the smallest value.
pub fn most_frequent<'a, I>(values: I) -> Option<&'a str>
where
    I: IntoIterator<Item = &'a str>,
{
    let mut counts: BTreeMap<&str, usize> = BTreeMap::new();
    for value in values {
        *counts.entry(value).or_insert(0) += 1;
    }
    // max_by_key keeps the last maximum, so walk in reverse to land on the smallest key.
    counts
        .into_iter()
        .rev()
        .max_by_key(|(_, count)| *count)
        .map(|(value, _)| value)
}
