use std::path::PathBuf;
use std::time::Instant;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use log::info;
use scat::{ConfirmOutcome, EngineConfig, FeedbackLoop, TrainingConfig};

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Directory holding the stored dataset (defaults to $SCAT_HOME or the platform data dir)
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    /// Seed for weight initialization and shuffling
    #[arg(long, global = true)]
    seed: Option<u64>,

    /// Number of training epochs
    #[arg(long, global = true)]
    epochs: Option<usize>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Classify an incident description
    Predict { text: String },
    /// Record that a prediction was correct
    Confirm { text: String, label: String },
    /// Record the correct label for a description and retrain
    Correct { text: String, label: String },
    /// Import a JSON array of examples from a file or URL and retrain
    Import {
        source: String,
        /// Expected SHA-256 of the file contents
        #[arg(long)]
        sha256: Option<String>,
    },
    /// Train and print a summary of the model
    Info,
    /// Print the stored dataset as JSON
    Dataset,
}

fn engine_config(args: &Args) -> EngineConfig {
    let mut training = TrainingConfig::from_env();
    if let Some(seed) = args.seed {
        training = training.with_seed(seed);
    }
    if let Some(epochs) = args.epochs {
        training = training.with_epochs(epochs);
    }

    let config = EngineConfig::from_env().with_training(training);
    match &args.data_dir {
        Some(dir) => config.with_data_dir(dir),
        None => config,
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();

    let config = engine_config(&args);
    info!("Data directory: {:?}", config.data_dir);
    let feedback = FeedbackLoop::from_config(config).context("Failed to open dataset store")?;

    match args.command {
        Command::Predict { text } => {
            let start = Instant::now();
            let (label, scores) = feedback.predict(&text).await.context("Prediction failed")?;
            info!("Prediction took {:?}", start.elapsed());

            println!("Predicted type: {}", label);
            let mut ranked: Vec<_> = scores.into_iter().collect();
            ranked.sort_by(|a, b| b.1.total_cmp(&a.1));
            for (label, score) in ranked {
                println!("  {:<40} {:.4}", label, score);
            }
        }
        Command::Confirm { text, label } => {
            match feedback.confirm(&text, &label).await.context("Confirmation failed")? {
                ConfirmOutcome::Recorded => println!("Example recorded"),
                ConfirmOutcome::AlreadyPresent => println!("Example already in the dataset"),
            }
        }
        Command::Correct { text, label } => {
            let model = feedback.correct(&text, &label).await.context("Correction failed")?;
            println!(
                "Correction recorded, model retrained on {} examples",
                model.info().examples_trained
            );
        }
        Command::Import { source, sha256 } => {
            let summary = feedback
                .import_from(&source, sha256.as_deref())
                .await
                .with_context(|| format!("Failed to import examples from {}", source))?;
            println!(
                "Imported {} new examples ({} duplicates skipped), model retrained on {} examples",
                summary.added,
                summary.skipped(),
                summary.model.info().examples_trained
            );
        }
        Command::Info => {
            let info = feedback.ensure_trained().await.context("Training failed")?.info();
            println!("Examples trained:  {}", info.examples_trained);
            println!("Vocabulary size:   {}", info.vocabulary_size);
            println!("Classes:           {}", info.class_labels.join(", "));
            println!("Layer sizes:       {:?}", info.layer_sizes);
            println!("Parameters:        {}", info.num_parameters);
            if let Some(loss) = info.final_loss {
                println!("Final loss:        {:.4}", loss);
            }
        }
        Command::Dataset => {
            let dataset = feedback.dataset().await;
            println!("{}", serde_json::to_string_pretty(&dataset)?);
        }
    }

    Ok(())
}
