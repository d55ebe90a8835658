//! One-shot quiz generation from a knowledge base or a local document.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Args, Subcommand};

use studykit_core::upload::{FileCandidate, UploadStaging};
use studykit_interaction::{BackendConfig, GenerationManager, QuestionSource};

#[derive(Subcommand)]
pub enum QuizSource {
    /// Generate from a named knowledge base
    FromKb(FromKbArgs),
    /// Generate from a local document
    FromDocument(FromDocumentArgs),
}

#[derive(Args)]
pub struct FromKbArgs {
    /// Knowledge base name
    #[arg(long)]
    pub kb: String,
    /// Question difficulty
    #[arg(long, default_value = "medium")]
    pub difficulty: String,
    /// Number of questions to generate
    #[arg(long, default_value_t = 5)]
    pub count: u32,
}

#[derive(Args)]
pub struct FromDocumentArgs {
    /// Path to the document (DOCX, PPTX, PDF, DOC or PPT)
    pub file: PathBuf,
    /// Question difficulty
    #[arg(long, default_value = "medium")]
    pub difficulty: String,
    /// Number of questions to generate
    #[arg(long, default_value_t = 5)]
    pub count: u32,
}

pub async fn run(source: QuizSource) -> Result<()> {
    let config = BackendConfig::load()?;
    let manager = GenerationManager::new(config);

    let (question_source, difficulty, count) = match source {
        QuizSource::FromKb(args) => (
            QuestionSource::KnowledgeBase { kb_name: args.kb },
            args.difficulty,
            args.count,
        ),
        QuizSource::FromDocument(args) => {
            // Quiz staging keeps a single file: a new selection replaces
            // any previous one.
            let mut staging = UploadStaging::new();
            staging.stage_single(vec![FileCandidate::from_path(&args.file)?])?;
            let file = staging.first().context("no staged file")?.clone();
            (
                QuestionSource::Document { file },
                args.difficulty,
                args.count,
            )
        }
    };

    let outcome = manager
        .start_question_gen(question_source, &difficulty, count)
        .await;
    let session = manager.snapshot().await;
    super::print_logs(&session.logs);

    let results = outcome?;
    println!("{}", serde_json::to_string_pretty(&results)?);
    Ok(())
}
