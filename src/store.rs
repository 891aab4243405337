use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use log;
use reqwest;
use sha2::{Digest, Sha256};

use crate::config::DEFAULT_DATASET_KEY;
use crate::dataset::{Dataset, Example};

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("IO error: {0}")]
    IoError(#[from] io::Error),
    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),
    #[error("Download error: {0}")]
    DownloadError(#[from] reqwest::Error),
    #[error("Hash mismatch: expected {expected}, got {actual}")]
    HashMismatch { expected: String, actual: String },
    #[error("Malformed bulk examples: {0}")]
    MalformedBulk(String),
}

/// Persistent storage of the dataset under a fixed key.
pub trait DatasetStore: Send + Sync {
    /// Loads the stored dataset, or `None` if nothing has been saved yet.
    fn load(&self) -> Result<Option<Dataset>, StoreError>;

    fn save(&self, dataset: &Dataset) -> Result<(), StoreError>;

    /// Loads the stored dataset, seeding and saving the bootstrap set if absent.
    fn load_or_bootstrap(&self) -> Result<Dataset, StoreError> {
        if let Some(dataset) = self.load()? {
            return Ok(dataset);
        }
        let dataset = Dataset::bootstrap();
        self.save(&dataset)?;
        log::info!("Seeded store with {} bootstrap examples", dataset.len());
        Ok(dataset)
    }
}

/// Stores the dataset as a JSON array in `<data_dir>/<key>.json`.
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    data_dir: PathBuf,
    key: String,
}

impl JsonFileStore {
    /// Creates a store under `data_dir`, creating the directory if needed.
    pub fn new<P: AsRef<Path>>(data_dir: P, key: impl Into<String>) -> io::Result<Self> {
        let data_dir = data_dir.as_ref().to_path_buf();
        fs::create_dir_all(&data_dir)?;
        Ok(Self {
            data_dir,
            key: key.into(),
        })
    }

    /// Creates a store in the default data directory with the default key
    pub fn new_default() -> io::Result<Self> {
        Self::new(crate::config::default_data_dir(), DEFAULT_DATASET_KEY)
    }

    pub fn path(&self) -> PathBuf {
        self.data_dir.join(format!("{}.json", self.key))
    }
}

impl DatasetStore for JsonFileStore {
    fn load(&self) -> Result<Option<Dataset>, StoreError> {
        let path = self.path();
        if !path.exists() {
            log::info!("No dataset stored at {:?}", path);
            return Ok(None);
        }
        let bytes = fs::read(&path)?;
        let dataset: Dataset = serde_json::from_slice(&bytes)?;
        log::info!("Loaded {} examples from {:?}", dataset.len(), path);
        Ok(Some(dataset))
    }

    fn save(&self, dataset: &Dataset) -> Result<(), StoreError> {
        let path = self.path();
        let json = serde_json::to_vec_pretty(dataset)?;
        let tmp = path.with_extension("json.tmp");
        fs::write(&tmp, json)?;
        fs::rename(&tmp, &path)?;
        log::debug!("Saved {} examples to {:?}", dataset.len(), path);
        Ok(())
    }
}

/// In-memory store for fixtures and tests.
#[derive(Debug, Default)]
pub struct MemoryStore {
    dataset: Mutex<Option<Dataset>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_dataset(dataset: Dataset) -> Self {
        Self {
            dataset: Mutex::new(Some(dataset)),
        }
    }

    /// Returns a copy of what has been saved so far.
    pub fn snapshot(&self) -> Option<Dataset> {
        self.dataset.lock().ok().and_then(|guard| guard.clone())
    }
}

impl DatasetStore for MemoryStore {
    fn load(&self) -> Result<Option<Dataset>, StoreError> {
        Ok(self.snapshot())
    }

    fn save(&self, dataset: &Dataset) -> Result<(), StoreError> {
        let mut guard = self
            .dataset
            .lock()
            .map_err(|_| io::Error::other("memory store lock poisoned"))?;
        *guard = Some(dataset.clone());
        Ok(())
    }
}

/// Parses a JSON array of `{description, label}` records.
///
/// The whole batch fails if any record is malformed or has an empty field.
pub fn parse_bulk_examples(bytes: &[u8]) -> Result<Vec<Example>, StoreError> {
    let examples: Vec<Example> = serde_json::from_slice(bytes)
        .map_err(|e| StoreError::MalformedBulk(e.to_string()))?;
    if let Some(pos) = examples
        .iter()
        .position(|e| e.description.trim().is_empty() || e.label.trim().is_empty())
    {
        return Err(StoreError::MalformedBulk(format!(
            "record {} has an empty description or label",
            pos + 1
        )));
    }
    Ok(examples)
}

/// Fetches a batch of examples from a file path or an http(s) URL.
///
/// When `expected_hash` is given, the raw bytes must match that SHA-256 digest.
pub async fn fetch_bulk_examples(
    source: &str,
    expected_hash: Option<&str>,
) -> Result<Vec<Example>, StoreError> {
    let bytes = if source.starts_with("http://") || source.starts_with("https://") {
        log::info!("Downloading bulk examples from {}", source);
        let response = reqwest::get(source).await?.error_for_status()?;
        log::info!("Download response status: {}", response.status());
        response.bytes().await?.to_vec()
    } else {
        log::info!("Reading bulk examples from {}", source);
        tokio::fs::read(source).await?
    };
    log::info!("Fetched {} bytes", bytes.len());

    if let Some(expected) = expected_hash {
        verify_bytes(&bytes, expected)?;
    }
    parse_bulk_examples(&bytes)
}

fn sha256_hex(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    format!("{:x}", hasher.finalize())
}

fn verify_bytes(bytes: &[u8], expected: &str) -> Result<(), StoreError> {
    let actual = sha256_hex(bytes);
    if !actual.eq_ignore_ascii_case(expected.trim()) {
        log::error!("Bulk file hash mismatch: expected {}, got {}", expected, actual);
        return Err(StoreError::HashMismatch {
            expected: expected.to_string(),
            actual,
        });
    }
    log::info!("Bulk file hash verified");
    Ok(())
}
