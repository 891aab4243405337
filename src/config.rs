use std::env;
use std::path::PathBuf;
use std::str::FromStr;

use log::warn;

/// Environment variable overriding the data directory.
pub const HOME_ENV: &str = "SCAT_HOME";
/// Environment variable overriding the training seed.
pub const SEED_ENV: &str = "SCAT_SEED";
/// Environment variable overriding the number of epochs.
pub const EPOCHS_ENV: &str = "SCAT_EPOCHS";

/// Fixed key the dataset is stored under.
pub const DEFAULT_DATASET_KEY: &str = "dataset";

/// Hyperparameters of one training pass.
#[derive(Debug, Clone, PartialEq)]
pub struct TrainingConfig {
    /// Units of each ReLU hidden layer, in order
    pub hidden_units: Vec<usize>,
    pub epochs: usize,
    pub batch_size: usize,
    pub learning_rate: f32,
    pub beta1: f32,
    pub beta2: f32,
    pub epsilon: f32,
    /// Seed for weight initialization and batch shuffling
    pub seed: u64,
    /// Shuffle example order at the start of every epoch
    pub shuffle: bool,
}

impl Default for TrainingConfig {
    fn default() -> Self {
        Self {
            hidden_units: vec![128, 64],
            epochs: 50,
            batch_size: 8,
            learning_rate: 0.001,
            beta1: 0.9,
            beta2: 0.999,
            epsilon: 1e-7,
            seed: 42,
            shuffle: true,
        }
    }
}

impl TrainingConfig {
    /// Defaults with `SCAT_SEED` and `SCAT_EPOCHS` applied when set.
    pub fn from_env() -> Self {
        let mut config = Self::default();
        if let Some(seed) = parse_env(SEED_ENV) {
            config.seed = seed;
        }
        if let Some(epochs) = parse_env(EPOCHS_ENV) {
            config.epochs = epochs;
        }
        config
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    pub fn with_epochs(mut self, epochs: usize) -> Self {
        self.epochs = epochs;
        self
    }
}

/// Where the dataset lives and how the engine trains.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    pub data_dir: PathBuf,
    pub dataset_key: String,
    pub training: TrainingConfig,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            dataset_key: DEFAULT_DATASET_KEY.to_string(),
            training: TrainingConfig::default(),
        }
    }
}

impl EngineConfig {
    pub fn from_env() -> Self {
        Self {
            training: TrainingConfig::from_env(),
            ..Self::default()
        }
    }

    pub fn with_data_dir(mut self, data_dir: impl Into<PathBuf>) -> Self {
        self.data_dir = data_dir.into();
        self
    }

    pub fn with_training(mut self, training: TrainingConfig) -> Self {
        self.training = training;
        self
    }
}

/// Returns the default data directory.
pub fn default_data_dir() -> PathBuf {
    // 1. Check environment variable
    if let Ok(path) = env::var(HOME_ENV) {
        return PathBuf::from(path);
    }

    // 2. Use platform-specific data directory
    if let Some(data_dir) = dirs::data_dir() {
        return data_dir.join("scat");
    }

    // 3. Fallback to user's home directory
    if let Some(home_dir) = dirs::home_dir() {
        return home_dir.join(".local").join("share").join("scat");
    }

    // 4. If all else fails, use system temp directory
    env::temp_dir().join("scat")
}

fn parse_env<T: FromStr>(name: &str) -> Option<T> {
    let raw = env::var(name).ok()?;
    match raw.trim().parse() {
        Ok(value) => Some(value),
        Err(_) => {
            warn!("Ignoring invalid value {:?} for {}", raw, name);
            None
        }
    }
}
