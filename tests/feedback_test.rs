use scat::{
    ClassifierError, ConfirmOutcome, Dataset, DatasetStore, EngineConfig, Example, FeedbackLoop, MemoryStore,
    StoreError, TrainingConfig,
};
use std::io;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Memory store whose next `failing_saves` saves return an IO error.
struct FlakyStore {
    inner: MemoryStore,
    failing_saves: AtomicUsize,
}

impl FlakyStore {
    fn new(failing_saves: usize) -> Self {
        Self {
            inner: MemoryStore::with_dataset(Dataset::bootstrap()),
            failing_saves: AtomicUsize::new(failing_saves),
        }
    }

    fn stored_len(&self) -> Option<usize> {
        self.inner.snapshot().map(|d| d.len())
    }
}

impl DatasetStore for FlakyStore {
    fn load(&self) -> Result<Option<Dataset>, StoreError> {
        self.inner.load()
    }

    fn save(&self, dataset: &Dataset) -> Result<(), StoreError> {
        let failing = self
            .failing_saves
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if failing {
            return Err(io::Error::other("disk full").into());
        }
        self.inner.save(dataset)
    }
}

fn setup_flaky(failing_saves: usize) -> (Arc<FlakyStore>, FeedbackLoop) {
    let store = Arc::new(FlakyStore::new(failing_saves));
    let feedback = FeedbackLoop::new(store.clone(), TrainingConfig::default().with_epochs(10))
        .expect("Failed to open feedback loop");
    (store, feedback)
}

fn setup_feedback() -> (Arc<MemoryStore>, FeedbackLoop) {
    let store = Arc::new(MemoryStore::new());
    let feedback = FeedbackLoop::new(store.clone(), TrainingConfig::default().with_epochs(10))
        .expect("Failed to open feedback loop");
    (store, feedback)
}

#[tokio::test]
async fn test_lazy_training_happens_once() -> Result<(), ClassifierError> {
    let (_, feedback) = setup_feedback();
    assert_eq!(feedback.training_passes().await, 0);

    let (first, _) = feedback.predict("Un trabajador cayó de una plataforma elevada").await?;
    assert_eq!(feedback.training_passes().await, 1);
    let model = feedback.current_model().await.ok_or(ClassifierError::NotTrained)?;
    assert!(model.labels().contains(&first));

    feedback.predict("Otra descripción").await?;
    assert_eq!(feedback.training_passes().await, 1);
    let again = feedback.current_model().await.ok_or(ClassifierError::NotTrained)?;
    assert!(Arc::ptr_eq(&model, &again));
    Ok(())
}

#[tokio::test]
async fn test_confirm_twice_leaves_size_unchanged() -> Result<(), ClassifierError> {
    let (store, feedback) = setup_feedback();
    let outcome = feedback.confirm("golpe con una tabla", "Golpeado por").await?;
    assert_eq!(outcome, ConfirmOutcome::Recorded);
    let size = feedback.dataset_len().await;

    let outcome = feedback.confirm("golpe con una tabla", "Golpeado por").await?;
    assert_eq!(outcome, ConfirmOutcome::AlreadyPresent);
    assert_eq!(feedback.dataset_len().await, size);
    assert_eq!(store.load()?.map(|d| d.len()), Some(size));
    assert_eq!(feedback.training_passes().await, 0);
    Ok(())
}

#[tokio::test]
async fn test_correct_grows_dataset_and_label_space() -> Result<(), ClassifierError> {
    let (store, feedback) = setup_feedback();
    let before = feedback.dataset_len().await;

    let model = feedback.correct("texto nuevo", "Atrapado entre o debajo").await?;

    assert_eq!(feedback.dataset_len().await, before + 1);
    assert!(model.labels().contains("Atrapado entre o debajo"));
    assert_eq!(feedback.training_passes().await, 1);
    let current = feedback.current_model().await.ok_or(ClassifierError::NotTrained)?;
    assert!(Arc::ptr_eq(&model, &current));
    assert_eq!(store.snapshot().map(|d| d.len()), Some(before + 1));
    Ok(())
}

#[tokio::test]
async fn test_repeated_corrections_are_all_kept() -> Result<(), ClassifierError> {
    let (_, feedback) = setup_feedback();
    feedback.correct("se cayó del andamio", "Caída").await?;
    let model = feedback.correct("se cayó del andamio", "Caída").await?;

    let dataset = feedback.dataset().await;
    let copies = dataset
        .iter()
        .filter(|e| e.description == "se cayó del andamio")
        .count();
    assert_eq!(copies, 2);
    assert_eq!(model.info().examples_trained, 5);
    assert_eq!(model.labels().len(), 4);
    Ok(())
}

#[tokio::test]
async fn test_bulk_import_merges_and_retrains() -> Result<(), ClassifierError> {
    let (_, feedback) = setup_feedback();
    let incoming = vec![
        Example::new("Un objeto en movimiento golpeó a la persona.", "Golpeado por"),
        Example::new("Resbaló en una mancha de aceite", "Caída"),
        Example::new("Resbaló en una mancha de aceite", "Caída"),
    ];

    let summary = feedback.bulk_import(incoming).await?;

    assert_eq!(summary.received, 3);
    assert_eq!(summary.added, 1);
    assert_eq!(summary.skipped(), 2);
    assert_eq!(feedback.dataset_len().await, 4);
    assert!(summary.model.labels().contains("Caída"));
    assert_eq!(feedback.training_passes().await, 1);
    Ok(())
}

#[tokio::test]
async fn test_import_from_file() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("bulk_dataset.json");
    std::fs::write(
        &path,
        r#"[
            {"descripcion": "Se cortó la mano con una sierra", "tipo": "Contacto con objeto cortante"},
            {"description": "Quedó atrapado bajo un tablero", "label": "Atrapado entre o debajo"}
        ]"#,
    )?;

    let config = EngineConfig::default()
        .with_data_dir(dir.path())
        .with_training(TrainingConfig::default().with_epochs(10));
    let feedback = FeedbackLoop::from_config(config)?;
    let summary = feedback.import_from(&path.to_string_lossy(), None).await?;

    assert_eq!(summary.added, 2);
    assert_eq!(summary.model.labels().len(), 4);
    Ok(())
}

#[tokio::test]
async fn test_failed_import_leaves_dataset_untouched() -> Result<(), ClassifierError> {
    let (_, feedback) = setup_feedback();
    let result = feedback.import_from("/nonexistent/bulk_dataset.json", None).await;
    assert!(matches!(result, Err(ClassifierError::StoreError(_))));
    assert_eq!(feedback.dataset_len().await, 3);
    assert_eq!(feedback.training_passes().await, 0);
    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_concurrent_corrections_are_serialized() -> Result<(), ClassifierError> {
    let (store, feedback) = setup_feedback();
    let feedback = Arc::new(feedback);

    let mut handles = vec![];
    for i in 0..3 {
        let feedback = Arc::clone(&feedback);
        handles.push(tokio::spawn(async move {
            feedback
                .correct(&format!("incidente número {}", i), "Golpeado por")
                .await
                .map(|model| model.info().examples_trained)
        }));
    }

    let mut trained_sizes = vec![];
    for handle in handles {
        let size = handle
            .await
            .map_err(|e| ClassifierError::TrainingFailed(e.to_string()))??;
        trained_sizes.push(size);
    }
    trained_sizes.sort_unstable();

    assert_eq!(trained_sizes, vec![4, 5, 6]);
    assert_eq!(feedback.training_passes().await, 3);
    assert_eq!(store.snapshot().map(|d| d.len()), Some(6));
    Ok(())
}

#[tokio::test]
async fn test_reader_keeps_snapshot_across_retrain() -> Result<(), ClassifierError> {
    let (_, feedback) = setup_feedback();
    let snapshot = feedback.ensure_trained().await?;
    feedback.correct("cayó por el hueco del ascensor", "Caída").await?;

    assert_eq!(snapshot.labels().len(), 3);
    let (label, scores) = snapshot.predict("cayó por el hueco")?;
    assert!(snapshot.labels().contains(&label));
    assert!(!scores.contains_key("Caída"));

    let current = feedback.current_model().await.ok_or(ClassifierError::NotTrained)?;
    assert_eq!(current.labels().len(), 4);
    Ok(())
}

#[test]
fn test_store_seeded_with_bootstrap() {
    let store = Arc::new(MemoryStore::new());
    let feedback = FeedbackLoop::new(store.clone(), TrainingConfig::default()).unwrap();
    assert_eq!(tokio_test::block_on(feedback.dataset()), Dataset::bootstrap());
    assert_eq!(store.snapshot(), Some(Dataset::bootstrap()));
}

#[tokio::test]
async fn test_confirm_retried_after_failed_save() -> Result<(), ClassifierError> {
    let (store, feedback) = setup_flaky(1);

    let result = feedback.confirm("golpe con tubo", "Golpeado por").await;
    assert!(matches!(result, Err(ClassifierError::StoreError(_))));
    assert_eq!(feedback.dataset_len().await, 3);
    assert_eq!(store.stored_len(), Some(3));

    let outcome = feedback.confirm("golpe con tubo", "Golpeado por").await?;
    assert_eq!(outcome, ConfirmOutcome::Recorded);
    assert_eq!(feedback.dataset_len().await, 4);
    assert_eq!(store.stored_len(), Some(4));
    Ok(())
}

#[tokio::test]
async fn test_failed_save_leaves_model_and_dataset_unchanged() -> Result<(), ClassifierError> {
    let (store, feedback) = setup_flaky(0);
    let model = feedback.ensure_trained().await?;
    store.failing_saves.store(2, Ordering::SeqCst);

    let result = feedback.correct("cayó del techo", "Caída").await;
    assert!(matches!(result, Err(ClassifierError::StoreError(_))));
    let result = feedback
        .bulk_import(vec![Example::new("resbaló en la rampa", "Caída")])
        .await;
    assert!(matches!(result, Err(ClassifierError::StoreError(_))));

    assert_eq!(feedback.dataset_len().await, 3);
    assert_eq!(store.stored_len(), Some(3));
    assert_eq!(feedback.training_passes().await, 1);
    let current = feedback.current_model().await.ok_or(ClassifierError::NotTrained)?;
    assert!(Arc::ptr_eq(&model, &current));
    Ok(())
}

#[tokio::test]
async fn test_dropped_correction_still_installs_model() -> Result<(), ClassifierError> {
    let (_, feedback) = setup_feedback();
    feedback.ensure_trained().await?;

    // The caller gives up while the retrain is still running.
    let _ = tokio::time::timeout(
        Duration::from_millis(1),
        feedback.correct("cayó del techo", "Caída"),
    )
    .await;

    let (_, scores) = feedback.predict("cayó del techo").await?;
    assert!(scores.contains_key("Caída"));
    assert_eq!(feedback.dataset_len().await, 4);
    assert_eq!(feedback.training_passes().await, 2);
    let current = feedback.current_model().await.ok_or(ClassifierError::NotTrained)?;
    assert_eq!(current.labels().len(), 4);
    Ok(())
}
