use std::collections::HashMap;

use ndarray::{Array1, Axis};

use super::encoding::{FeatureVector, TextEncoding};
use super::error::ClassifierError;
use super::network::FeedForward;
use super::utils::argmax;
use super::vocabulary::{LabelSpace, Vocabulary};

/// A trained classifier bound to the exact vocabulary and label space it was fitted on.
///
/// The model is immutable once built. Retraining produces a new `TrainedModel`;
/// holders of the previous one keep a consistent snapshot.
///
/// ```rust
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// use scat::{Dataset, TrainedModel, TrainingConfig};
///
/// let model = TrainedModel::builder()
///     .with_config(TrainingConfig::default().with_epochs(5))
///     .with_dataset(&Dataset::bootstrap())?
///     .build()?;
///
/// let (label, scores) = model.predict("Un trabajador cayó de una plataforma elevada")?;
/// assert!(model.labels().contains(&label));
/// assert_eq!(scores.len(), 3);
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct TrainedModel {
    pub(crate) network: FeedForward,
    pub(crate) vocabulary: Vocabulary,
    pub(crate) labels: LabelSpace,
    pub(crate) examples_trained: usize,
    pub(crate) loss_history: Vec<f32>,
}

// Compile-time verification of thread-safety
const _: fn() = || {
    fn assert_send_sync<T: Send + Sync>() {}
    assert_send_sync::<TrainedModel>();
};

impl TextEncoding for TrainedModel {
    fn vocabulary(&self) -> Option<&Vocabulary> {
        Some(&self.vocabulary)
    }
}

impl TrainedModel {
    /// Creates a new ClassifierBuilder for fluent construction
    pub fn builder() -> super::builder::ClassifierBuilder {
        super::builder::ClassifierBuilder::new()
    }

    /// The vocabulary snapshot, in feature-index order.
    pub fn vocabulary_snapshot(&self) -> &Vocabulary {
        &self.vocabulary
    }

    pub fn labels(&self) -> &LabelSpace {
        &self.labels
    }

    /// Mean training loss of each epoch of the pass that produced this model.
    pub fn loss_history(&self) -> &[f32] {
        &self.loss_history
    }

    /// Returns information about the classifier's current state
    pub fn info(&self) -> super::ClassifierInfo {
        super::ClassifierInfo {
            examples_trained: self.examples_trained,
            vocabulary_size: self.vocabulary.len(),
            num_classes: self.labels.len(),
            class_labels: self.labels.labels().to_vec(),
            layer_sizes: self.network.layer_sizes(),
            num_parameters: self.network.num_parameters(),
            final_loss: self.loss_history.last().copied(),
        }
    }

    /// Probability distribution over the label space for an encoded vector.
    ///
    /// # Errors
    /// * `EncodingMismatch` if `vector` was not encoded against this model's vocabulary
    pub fn predict_proba(&self, vector: &FeatureVector) -> Result<Array1<f32>, ClassifierError> {
        self.check_vector(vector)?;
        let batch = vector.view().insert_axis(Axis(0)).to_owned();
        let probs = self.network.forward(&batch)?;
        Ok(probs.row(0).to_owned())
    }

    /// Index into the label space of the most probable class; ties go to the lowest index.
    pub fn predict_index(&self, vector: &FeatureVector) -> Result<usize, ClassifierError> {
        let probs = self.predict_proba(vector)?;
        argmax(probs.view()).ok_or(ClassifierError::NoLabels)
    }

    /// Predicts the label of `text` and returns per-label probabilities.
    ///
    /// # Returns
    /// A tuple containing:
    /// * The predicted label
    /// * A HashMap of every label to its probability (summing to 1.0)
    pub fn predict(&self, text: &str) -> Result<(String, HashMap<String, f32>), ClassifierError> {
        let vector = self.encode_text(text)?;
        let probs = self.predict_proba(&vector)?;
        let best = argmax(probs.view()).ok_or(ClassifierError::NoLabels)?;
        let label = self
            .labels
            .get(best)
            .ok_or(ClassifierError::NoLabels)?
            .to_string();

        let scores = self
            .labels
            .labels()
            .iter()
            .cloned()
            .zip(probs.iter().copied())
            .collect();

        Ok((label, scores))
    }

    /// Predicts only the label of `text`.
    pub fn predict_label(&self, text: &str) -> Result<String, ClassifierError> {
        self.predict(text).map(|(label, _)| label)
    }
}
