mod error;
mod encoding;
mod model;
mod network;
mod utils;
mod vocabulary;
pub mod builder;
pub mod tokenizer;

pub use error::ClassifierError;
pub use encoding::{encode, encode_batch, FeatureVector, TextEncoding};
pub use model::TrainedModel;
pub use network::{Activation, FeedForward};
pub use vocabulary::{LabelSpace, Vocabulary};
pub use builder::{train, train_blocking, ClassifierBuilder};
pub use tokenizer::{normalize, normalize_text, split_tokens};

/// Information about the current state and configuration of a trained classifier
#[derive(Debug, Clone, PartialEq)]
pub struct ClassifierInfo {
    /// Number of examples the model was trained on
    pub examples_trained: usize,
    /// Width of the feature vectors
    pub vocabulary_size: usize,
    /// Number of output classes
    pub num_classes: usize,
    /// Labels of the classes, in output-index order
    pub class_labels: Vec<String>,
    /// Units per layer, input first
    pub layer_sizes: Vec<usize>,
    pub num_parameters: usize,
    /// Mean loss of the last training epoch
    pub final_loss: Option<f32>,
}
