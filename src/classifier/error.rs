use crate::store::StoreError;

/// Represents the different types of errors that can occur in the classifier engine.
///
/// Every variant is recoverable: callers are expected to surface the message to
/// the user and keep running.
#[derive(Debug, thiserror::Error)]
pub enum ClassifierError {
    /// There are no examples to build a vocabulary or train on
    #[error("Dataset is empty: add examples before training the model")]
    EmptyDataset,
    /// The dataset contains no distinct labels
    #[error("No distinct labels found in the dataset")]
    NoLabels,
    /// Inference was requested before any model was trained
    #[error("No trained model is available")]
    NotTrained,
    /// A feature vector does not match the width the model was trained on
    #[error("Encoding mismatch: expected a vector of length {expected}, got {actual}")]
    EncodingMismatch { expected: usize, actual: usize },
    /// The training task stopped before producing a model
    #[error("Training failed: {0}")]
    TrainingFailed(String),
    /// Error occurred due to invalid input parameters
    #[error("Validation error: {0}")]
    ValidationError(String),
    /// Error raised while loading, saving or fetching examples
    #[error("Store error: {0}")]
    StoreError(#[from] StoreError),
}

impl ClassifierError {
    /// Returns true for errors caused by the caller's input rather than engine state.
    pub fn is_validation(&self) -> bool {
        matches!(self, Self::ValidationError(_))
    }
}
