//! Flashcard generation from staged documents.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;

use studykit_core::Result as StudykitResult;
use studykit_core::upload::{FileCandidate, UploadStaging};
use studykit_interaction::{BackendConfig, GenerationManager};

#[derive(Args)]
pub struct FlashcardsArgs {
    /// Candidate documents; duplicates by name are dropped and the first
    /// staged file is sent
    #[arg(required = true)]
    pub files: Vec<PathBuf>,
    /// Topic to focus the cards on
    #[arg(long, default_value = "General Review")]
    pub topic: String,
    /// Number of cards to generate
    #[arg(long, default_value_t = 5)]
    pub count: u32,
    /// Inference provider the backend should use
    #[arg(long, default_value = "groq")]
    pub provider: String,
}

pub async fn run(args: FlashcardsArgs) -> Result<()> {
    let config = BackendConfig::load()?;
    let manager = GenerationManager::new(config);

    let candidates = args
        .files
        .iter()
        .map(FileCandidate::from_path)
        .collect::<StudykitResult<Vec<_>>>()?;

    let mut staging = UploadStaging::new();
    staging.stage_documents(candidates)?;
    for file in staging.files() {
        eprintln!("staged: {} ({})", file.name, file.size_display());
    }
    let file = staging.first().context("no staged file")?.clone();

    let cards = manager
        .generate_flashcards(&file, &args.topic, args.count, &args.provider)
        .await?;
    println!("{}", serde_json::to_string_pretty(&cards)?);
    Ok(())
}
