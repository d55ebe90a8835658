use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

mod commands;

#[derive(Parser)]
#[command(name = "studykit")]
#[command(about = "Studykit CLI - generate quizzes and flashcards from documents", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate exam questions from a knowledge base or a document
    Quiz {
        #[command(subcommand)]
        source: commands::quiz::QuizSource,
    },
    /// Generate flashcards from a document
    Flashcards(commands::flashcards::FlashcardsArgs),
    /// Generate questions mimicking a reference exam, with live progress
    Mimic(commands::mimic::MimicArgs),
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Quiz { source } => commands::quiz::run(source).await?,
        Commands::Flashcards(args) => commands::flashcards::run(args).await?,
        Commands::Mimic(args) => commands::mimic::run(args).await?,
    }

    Ok(())
}
