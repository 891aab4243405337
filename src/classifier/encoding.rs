use ndarray::{Array1, Array2};

use super::error::ClassifierError;
use super::tokenizer::normalize;
use super::vocabulary::Vocabulary;

/// Binary bag-of-words vector, one slot per vocabulary token.
pub type FeatureVector = Array1<f32>;

/// Encodes `text` as a presence vector over `vocabulary`.
///
/// The text goes through [`normalize`] (stopwords removed); every surviving
/// token found in the vocabulary sets its slot to 1. Unknown tokens are ignored,
/// so empty or all-stopword text yields the all-zero vector.
///
/// # Example
/// ```
/// use scat::classifier::{encode, Vocabulary};
///
/// let vocabulary: Vocabulary = ["caja", "de", "pesada"].iter().map(|t| t.to_string()).collect();
/// let vector = encode("Caja de cartón pesada", &vocabulary);
/// assert_eq!(vector.to_vec(), vec![1.0, 0.0, 1.0]);
/// ```
pub fn encode(text: &str, vocabulary: &Vocabulary) -> FeatureVector {
    let mut vector = Array1::zeros(vocabulary.len());
    for token in normalize(text) {
        if let Some(index) = vocabulary.index_of(&token) {
            vector[index] = 1.0;
        }
    }
    vector
}

/// Encodes each text into one row of a `[texts, |vocabulary|]` matrix.
pub fn encode_batch<S: AsRef<str>>(texts: &[S], vocabulary: &Vocabulary) -> Array2<f32> {
    let mut matrix = Array2::zeros((texts.len(), vocabulary.len()));
    for (mut row, text) in matrix.rows_mut().into_iter().zip(texts) {
        row.assign(&encode(text.as_ref(), vocabulary));
    }
    matrix
}

/// Text-to-feature conversion bound to a vocabulary snapshot.
///
/// Implementors only expose the vocabulary they were built against; the
/// default methods guarantee queries are encoded with that exact snapshot.
pub trait TextEncoding {
    /// Returns the vocabulary snapshot if one is available
    fn vocabulary(&self) -> Option<&Vocabulary>;

    /// Encodes `text` against the bound vocabulary.
    ///
    /// # Errors
    /// - `NotTrained` if no vocabulary is bound
    fn encode_text(&self, text: &str) -> Result<FeatureVector, ClassifierError> {
        let vocabulary = self.vocabulary().ok_or(ClassifierError::NotTrained)?;
        Ok(encode(text, vocabulary))
    }

    /// Checks that `vector` has the width of the bound vocabulary.
    ///
    /// # Errors
    /// - `NotTrained` if no vocabulary is bound
    /// - `EncodingMismatch` if the lengths differ
    fn check_vector(&self, vector: &FeatureVector) -> Result<(), ClassifierError> {
        let vocabulary = self.vocabulary().ok_or(ClassifierError::NotTrained)?;
        if vector.len() != vocabulary.len() {
            return Err(ClassifierError::EncodingMismatch {
                expected: vocabulary.len(),
                actual: vector.len(),
            });
        }
        Ok(())
    }
}

impl TextEncoding for Vocabulary {
    fn vocabulary(&self) -> Option<&Vocabulary> {
        Some(self)
    }
}
