use std::time::Instant;

use log::{error, info};
use ndarray::Array2;
use rand::rngs::StdRng;
use rand::SeedableRng;

use super::encoding::encode_batch;
use super::error::ClassifierError;
use super::model::TrainedModel;
use super::network::FeedForward;
use super::vocabulary::{LabelSpace, Vocabulary};
use crate::config::TrainingConfig;
use crate::dataset::Dataset;

/// Encoded training tensors together with the snapshots used to produce them.
#[derive(Debug, Clone)]
struct PreparedData {
    vocabulary: Vocabulary,
    labels: LabelSpace,
    inputs: Array2<f32>,
    targets: Vec<usize>,
}

impl PreparedData {
    /// Builds the vocabulary and label space and encodes every example against them.
    fn from_dataset(dataset: &Dataset) -> Result<Self, ClassifierError> {
        let vocabulary = Vocabulary::build(dataset)?;
        let labels = LabelSpace::build(dataset)?;

        let descriptions: Vec<&str> = dataset.iter().map(|e| e.description.as_str()).collect();
        let inputs = encode_batch(&descriptions, &vocabulary);
        let targets = dataset
            .iter()
            .map(|e| labels.index_of(&e.label).ok_or(ClassifierError::NoLabels))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            vocabulary,
            labels,
            inputs,
            targets,
        })
    }
}

/// A builder for training a [`TrainedModel`] with a fluent interface.
///
/// Every build rebuilds the vocabulary and label space from scratch; there is
/// no weight carry-over between builds.
#[derive(Debug, Default)]
pub struct ClassifierBuilder {
    config: TrainingConfig,
    prepared: Option<PreparedData>,
}

impl ClassifierBuilder {
    /// Creates a new builder with the default training configuration
    ///
    /// # Example
    /// ```
    /// use scat::ClassifierBuilder;
    ///
    /// let builder = ClassifierBuilder::new();
    /// ```
    pub fn new() -> Self {
        Self {
            config: TrainingConfig::default(),
            prepared: None,
        }
    }

    /// Sets the training configuration
    ///
    /// # Example
    /// ```
    /// use scat::{ClassifierBuilder, TrainingConfig};
    ///
    /// let builder = ClassifierBuilder::new()
    ///     .with_config(TrainingConfig::default().with_seed(7));
    /// ```
    pub fn with_config(mut self, config: TrainingConfig) -> Self {
        self.config = config;
        self
    }

    /// Prepares the training tensors from `dataset`.
    ///
    /// Builds the vocabulary from unfiltered description tokens, the label space
    /// in first-seen order, then encodes every description and label against them.
    ///
    /// # Errors
    /// * `EmptyDataset` if the dataset has no examples
    /// * `NoLabels` if no label could be collected
    pub fn with_dataset(mut self, dataset: &Dataset) -> Result<Self, ClassifierError> {
        self.prepared = Some(PreparedData::from_dataset(dataset)?);
        Ok(self)
    }

    /// Fits the network and returns the trained model
    ///
    /// # Errors
    /// * `EmptyDataset` if no dataset was supplied
    /// * `ValidationError` if the configuration cannot be trained with
    pub fn build(self) -> Result<TrainedModel, ClassifierError> {
        let prepared = self.prepared.ok_or(ClassifierError::EmptyDataset)?;
        if prepared.labels.is_empty() {
            return Err(ClassifierError::NoLabels);
        }
        Self::validate_config(&self.config)?;

        let start = Instant::now();
        info!(
            "Training on {} examples: {} tokens, {} labels, {} epochs",
            prepared.targets.len(),
            prepared.vocabulary.len(),
            prepared.labels.len(),
            self.config.epochs
        );

        let mut rng = StdRng::seed_from_u64(self.config.seed);
        let mut network = FeedForward::new(
            prepared.vocabulary.len(),
            &self.config.hidden_units,
            prepared.labels.len(),
            &mut rng,
        );
        let loss_history = network
            .fit(&prepared.inputs, &prepared.targets, &self.config, &mut rng)
            .map_err(|e| {
                error!("Training failed: {}", e);
                e
            })?;

        info!(
            "Model trained in {:.2?} (final loss: {})",
            start.elapsed(),
            loss_history
                .last()
                .map_or_else(|| "n/a".to_string(), |loss| format!("{loss:.4}"))
        );

        Ok(TrainedModel {
            network,
            vocabulary: prepared.vocabulary,
            labels: prepared.labels,
            examples_trained: prepared.targets.len(),
            loss_history,
        })
    }

    fn validate_config(config: &TrainingConfig) -> Result<(), ClassifierError> {
        if config.batch_size == 0 {
            return Err(ClassifierError::ValidationError("Batch size must be at least 1".into()));
        }
        if config.hidden_units.iter().any(|&units| units == 0) {
            return Err(ClassifierError::ValidationError(
                "Hidden layers must have at least one unit".into(),
            ));
        }
        if !(config.learning_rate > 0.0 && config.learning_rate.is_finite()) {
            return Err(ClassifierError::ValidationError(format!(
                "Learning rate must be positive, got {}",
                config.learning_rate
            )));
        }
        Ok(())
    }
}

/// Runs a full training pass over `dataset`.
pub fn train(dataset: &Dataset, config: &TrainingConfig) -> Result<TrainedModel, ClassifierError> {
    ClassifierBuilder::new()
        .with_config(config.clone())
        .with_dataset(dataset)?
        .build()
}

/// Runs [`train`] on the blocking thread pool and resolves when it completes.
///
/// Training cannot be cancelled; dropping the future lets the pass finish in the
/// background and discards its result.
pub async fn train_blocking(
    dataset: Dataset,
    config: TrainingConfig,
) -> Result<TrainedModel, ClassifierError> {
    tokio::task::spawn_blocking(move || train(&dataset, &config))
        .await
        .map_err(|e| ClassifierError::TrainingFailed(e.to_string()))?
}
