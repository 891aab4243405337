//! An incremental text classifier for incident descriptions that retrains itself
//! from user feedback.
//!
//! # Basic Usage
//!
//! ```rust
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! use scat::{Dataset, Example, TrainedModel, TrainingConfig};
//!
//! let mut dataset = Dataset::bootstrap();
//! dataset.push(Example::new("Se cayó de la escalera", "Caída"));
//!
//! let model = TrainedModel::builder()
//!     .with_config(TrainingConfig::default().with_epochs(10))
//!     .with_dataset(&dataset)?
//!     .build()?;
//!
//! let (label, scores) = model.predict("El operario cayó desde el andamio")?;
//! println!("Predicted class: {} ({:.2})", label, scores[&label]);
//! # Ok(())
//! # }
//! ```
//!
//! # Feedback
//!
//! [`FeedbackLoop`] owns the dataset and the current model. Confirmations are
//! stored without retraining; corrections and bulk imports retrain before they
//! return:
//!
//! ```rust
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> Result<(), Box<dyn std::error::Error>> {
//! use std::sync::Arc;
//! use scat::{FeedbackLoop, MemoryStore, TrainingConfig};
//!
//! let feedback = FeedbackLoop::new(
//!     Arc::new(MemoryStore::new()),
//!     TrainingConfig::default().with_epochs(10),
//! )?;
//!
//! let (label, _) = feedback.predict("Quedó atrapado entre dos rodillos").await?;
//! feedback.confirm("Quedó atrapado entre dos rodillos", &label).await?;
//! feedback.correct("Le golpeó una viga", "Golpeado por").await?;
//! assert_eq!(feedback.dataset_len().await, 5);
//! # Ok(())
//! # }
//! ```

pub mod classifier;
pub mod config;
pub mod dataset;
pub mod feedback;
pub mod store;

pub use classifier::{
    ClassifierBuilder, ClassifierError, ClassifierInfo, FeatureVector, LabelSpace, TextEncoding,
    TrainedModel, Vocabulary,
};
pub use config::{EngineConfig, TrainingConfig};
pub use dataset::{Dataset, Example};
pub use feedback::{ConfirmOutcome, FeedbackLoop, ImportSummary};
pub use store::{fetch_bulk_examples, parse_bulk_examples, DatasetStore, JsonFileStore, MemoryStore, StoreError};

pub fn init_logger() {
    env_logger::init();
}
