use std::collections::HashMap;

use super::error::ClassifierError;
use super::tokenizer::split_tokens;
use crate::dataset::Dataset;

/// Ordered set of known tokens. A token's position is its feature index.
///
/// Built from the raw split tokens of every description, without stopword
/// filtering. Feature extraction does filter stopwords, so stopword slots
/// exist in the vector but are never set.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Vocabulary {
    tokens: Vec<String>,
    index: HashMap<String, usize>,
}

impl Vocabulary {
    /// Builds the vocabulary from every description in `dataset`, in first-seen order.
    ///
    /// # Errors
    /// * `EmptyDataset` if the dataset has no examples
    pub fn build(dataset: &Dataset) -> Result<Self, ClassifierError> {
        if dataset.is_empty() {
            return Err(ClassifierError::EmptyDataset);
        }
        let mut vocabulary = Self::default();
        for example in dataset {
            for token in split_tokens(&example.description) {
                vocabulary.insert(token);
            }
        }
        Ok(vocabulary)
    }

    fn insert(&mut self, token: String) {
        if !self.index.contains_key(&token) {
            self.index.insert(token.clone(), self.tokens.len());
            self.tokens.push(token);
        }
    }

    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    /// Feature index of `token`, if known.
    pub fn index_of(&self, token: &str) -> Option<usize> {
        self.index.get(token).copied()
    }

    pub fn tokens(&self) -> &[String] {
        &self.tokens
    }
}

impl FromIterator<String> for Vocabulary {
    fn from_iter<I: IntoIterator<Item = String>>(iter: I) -> Self {
        let mut vocabulary = Self::default();
        for token in iter {
            vocabulary.insert(token);
        }
        vocabulary
    }
}

/// Ordered set of distinct labels, in first-seen order. A label's position is its output index.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LabelSpace {
    labels: Vec<String>,
    index: HashMap<String, usize>,
}

impl LabelSpace {
    /// Collects the distinct labels of `dataset`.
    ///
    /// # Errors
    /// * `EmptyDataset` if the dataset has no examples
    /// * `NoLabels` if no label could be collected
    pub fn build(dataset: &Dataset) -> Result<Self, ClassifierError> {
        if dataset.is_empty() {
            return Err(ClassifierError::EmptyDataset);
        }
        let space: Self = dataset.iter().map(|e| e.label.clone()).collect();
        if space.is_empty() {
            return Err(ClassifierError::NoLabels);
        }
        Ok(space)
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    pub fn index_of(&self, label: &str) -> Option<usize> {
        self.index.get(label).copied()
    }

    pub fn get(&self, index: usize) -> Option<&str> {
        self.labels.get(index).map(String::as_str)
    }

    pub fn contains(&self, label: &str) -> bool {
        self.index.contains_key(label)
    }

    pub fn labels(&self) -> &[String] {
        &self.labels
    }
}

impl FromIterator<String> for LabelSpace {
    fn from_iter<I: IntoIterator<Item = String>>(iter: I) -> Self {
        let mut space = Self::default();
        for label in iter {
            if !space.index.contains_key(&label) {
                space.index.insert(label.clone(), space.labels.len());
                space.labels.push(label);
            }
        }
        space
    }
}
