//! The confirm / correct / bulk-import cycle that grows the dataset and keeps
//! the current model in step with it.

use std::collections::HashMap;
use std::sync::Arc;

use log::{info, warn};
use tokio::sync::{Mutex, OwnedMutexGuard};

use crate::classifier::{train_blocking, ClassifierError, ClassifierInfo, TrainedModel};
use crate::config::{EngineConfig, TrainingConfig};
use crate::dataset::{Dataset, Example};
use crate::store::{fetch_bulk_examples, DatasetStore, JsonFileStore, StoreError};

/// Result of a confirmation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfirmOutcome {
    /// The pair was new and has been stored
    Recorded,
    /// The exact pair was already in the dataset
    AlreadyPresent,
}

/// Result of a bulk import.
#[derive(Debug, Clone)]
pub struct ImportSummary {
    pub received: usize,
    pub added: usize,
    pub model: Arc<TrainedModel>,
}

impl ImportSummary {
    pub fn skipped(&self) -> usize {
        self.received - self.added
    }
}

struct LoopState {
    dataset: Dataset,
    model: Option<Arc<TrainedModel>>,
    training_passes: usize,
}

/// Owns the dataset, its store and the current model.
///
/// All mutations and training passes go through one async mutex, so at most one
/// training pass is in flight and a correction arriving mid-retrain waits for it
/// before touching the dataset. Predictions clone the current `Arc<TrainedModel>`
/// and run without holding the lock.
///
/// The dataset only changes after the store has saved the new version. A
/// training pass runs in its own task holding the lock, so it completes and
/// installs its model even if the caller stops waiting for it.
pub struct FeedbackLoop {
    store: Arc<dyn DatasetStore>,
    config: TrainingConfig,
    state: Arc<Mutex<LoopState>>,
}

impl FeedbackLoop {
    /// Loads the dataset from `store`, seeding the bootstrap set if the store is empty.
    ///
    /// No model is trained until the first prediction or correction.
    pub fn new(store: Arc<dyn DatasetStore>, config: TrainingConfig) -> Result<Self, ClassifierError> {
        let dataset = store.load_or_bootstrap()?;
        info!("Feedback loop ready with {} examples", dataset.len());
        Ok(Self {
            store,
            config,
            state: Arc::new(Mutex::new(LoopState {
                dataset,
                model: None,
                training_passes: 0,
            })),
        })
    }

    /// Opens the JSON file store described by `config`.
    pub fn from_config(config: EngineConfig) -> Result<Self, ClassifierError> {
        let store = JsonFileStore::new(&config.data_dir, config.dataset_key.as_str())
            .map_err(StoreError::from)?;
        info!("Using dataset at {:?}", store.path());
        Self::new(Arc::new(store), config.training)
    }

    pub fn config(&self) -> &TrainingConfig {
        &self.config
    }

    /// A copy of the current dataset.
    pub async fn dataset(&self) -> Dataset {
        self.state.lock().await.dataset.clone()
    }

    pub async fn dataset_len(&self) -> usize {
        self.state.lock().await.dataset.len()
    }

    /// The current model, if one has been trained.
    pub async fn current_model(&self) -> Option<Arc<TrainedModel>> {
        self.state.lock().await.model.clone()
    }

    /// Summary of the current model, if one has been trained.
    pub async fn info(&self) -> Option<ClassifierInfo> {
        self.current_model().await.map(|model| model.info())
    }

    /// Number of completed training passes since this loop was created.
    pub async fn training_passes(&self) -> usize {
        self.state.lock().await.training_passes
    }

    /// Returns the current model, training one first if none exists.
    pub async fn ensure_trained(&self) -> Result<Arc<TrainedModel>, ClassifierError> {
        let state = Arc::clone(&self.state).lock_owned().await;
        if let Some(model) = &state.model {
            return Ok(Arc::clone(model));
        }
        info!("No model loaded, training before first prediction");
        self.retrain(state).await
    }

    /// Predicts the label of `text`, training lazily on first use.
    ///
    /// # Errors
    /// * `ValidationError` if `text` is blank
    /// * Any training error from the lazy first pass
    pub async fn predict(&self, text: &str) -> Result<(String, HashMap<String, f32>), ClassifierError> {
        let text = required(text, "Description")?;
        let model = self.ensure_trained().await?;
        model.predict(text)
    }

    /// Predicts with the current model only.
    ///
    /// # Errors
    /// * `NotTrained` if no model has been trained yet
    pub async fn predict_current(&self, text: &str) -> Result<(String, HashMap<String, f32>), ClassifierError> {
        let text = required(text, "Description")?;
        let model = self.current_model().await.ok_or(ClassifierError::NotTrained)?;
        model.predict(text)
    }

    /// Records a confirmed prediction. Does not retrain.
    pub async fn confirm(&self, text: &str, label: &str) -> Result<ConfirmOutcome, ClassifierError> {
        let example = Example::new(required(text, "Description")?, required(label, "Label")?);
        let mut state = self.state.lock().await;
        let mut updated = state.dataset.clone();
        if !updated.insert_unique(example) {
            info!("Confirmed example already present, dataset unchanged");
            return Ok(ConfirmOutcome::AlreadyPresent);
        }
        self.store.save(&updated)?;
        state.dataset = updated;
        info!("Confirmed example recorded ({} examples)", state.dataset.len());
        Ok(ConfirmOutcome::Recorded)
    }

    /// Records a correction unconditionally and retrains before returning.
    ///
    /// Repeated corrections are all kept. If training fails the correction stays
    /// recorded and the previous model remains current.
    pub async fn correct(&self, text: &str, label: &str) -> Result<Arc<TrainedModel>, ClassifierError> {
        let example = Example::new(required(text, "Description")?, required(label, "Label")?);
        let mut state = Arc::clone(&self.state).lock_owned().await;
        let mut updated = state.dataset.clone();
        updated.push(example);
        self.store.save(&updated)?;
        state.dataset = updated;
        info!("Correction recorded ({} examples), retraining", state.dataset.len());
        self.retrain(state).await
    }

    /// Merges `examples`, skipping exact duplicates, then retrains.
    ///
    /// # Errors
    /// * `ValidationError` if any record has a blank field; nothing is merged
    pub async fn bulk_import(&self, examples: Vec<Example>) -> Result<ImportSummary, ClassifierError> {
        if let Some(pos) = examples
            .iter()
            .position(|e| e.description.trim().is_empty() || e.label.trim().is_empty())
        {
            return Err(ClassifierError::ValidationError(format!(
                "Bulk record {} has an empty description or label",
                pos + 1
            )));
        }

        let received = examples.len();
        let mut state = Arc::clone(&self.state).lock_owned().await;
        let mut updated = state.dataset.clone();
        let added = updated.merge(examples);
        self.store.save(&updated)?;
        state.dataset = updated;
        info!("Bulk import: {} received, {} added", received, added);
        let model = self.retrain(state).await?;
        Ok(ImportSummary {
            received,
            added,
            model,
        })
    }

    /// Fetches examples from `source` (path or URL) and imports them.
    pub async fn import_from(
        &self,
        source: &str,
        expected_hash: Option<&str>,
    ) -> Result<ImportSummary, ClassifierError> {
        let examples = fetch_bulk_examples(source, expected_hash).await?;
        self.bulk_import(examples).await
    }

    /// Trains on the locked dataset and installs the result as the current model.
    ///
    /// The pass runs in a spawned task that owns `state`; dropping the returned
    /// future detaches the task, which still finishes and releases the lock.
    async fn retrain(
        &self,
        mut state: OwnedMutexGuard<LoopState>,
    ) -> Result<Arc<TrainedModel>, ClassifierError> {
        let config = self.config.clone();
        let pass = tokio::spawn(async move {
            match train_blocking(state.dataset.clone(), config).await {
                Ok(model) => {
                    let model = Arc::new(model);
                    state.model = Some(Arc::clone(&model));
                    state.training_passes += 1;
                    Ok(model)
                }
                Err(e) => {
                    warn!("Training failed, keeping previous model: {}", e);
                    Err(e)
                }
            }
        });
        pass.await
            .map_err(|e| ClassifierError::TrainingFailed(e.to_string()))?
    }
}

fn required<'a>(value: &'a str, field: &str) -> Result<&'a str, ClassifierError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(ClassifierError::ValidationError(format!("{field} cannot be empty")));
    }
    Ok(trimmed)
}
