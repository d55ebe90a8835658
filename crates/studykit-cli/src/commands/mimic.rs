//! Streaming mimic generation with live progress rendering.

use std::path::PathBuf;

use anyhow::{Result, bail};
use clap::Args;

use studykit_core::session::GenerationStep;
use studykit_core::upload::{FileCandidate, UploadStaging};
use studykit_interaction::{BackendConfig, GenerationManager};

#[derive(Args)]
pub struct MimicArgs {
    /// Path to a reference exam document to upload
    #[arg(long)]
    pub file: Option<PathBuf>,
    /// Server-side pre-parsed exam directory
    #[arg(long, default_value = "")]
    pub paper_path: String,
    /// Knowledge base providing the source material
    #[arg(long)]
    pub kb: String,
    /// Upper bound on generated questions
    #[arg(long)]
    pub max_questions: Option<u32>,
}

pub async fn run(args: MimicArgs) -> Result<()> {
    let config = BackendConfig::load()?;
    let manager = GenerationManager::new(config);

    let file = match &args.file {
        Some(path) => {
            let mut staging = UploadStaging::new();
            staging.stage_single(vec![FileCandidate::from_path(path)?])?;
            staging.first().cloned()
        }
        None => None,
    };

    let mut updates = manager.subscribe();
    manager
        .start_mimic_gen(file, &args.paper_path, &args.kb, args.max_questions)
        .await?;

    // Stream log lines as they arrive until the run settles.
    let mut printed = 0;
    let final_session = loop {
        let snapshot = updates.borrow_and_update().clone();
        for log in &snapshot.logs[printed.min(snapshot.logs.len())..] {
            eprintln!("[{}] {}", super::kind_label(log.kind), log.content);
        }
        printed = snapshot.logs.len();
        if snapshot.step != GenerationStep::Generating {
            break snapshot;
        }
        if updates.changed().await.is_err() {
            break snapshot;
        }
    };

    if final_session.step != GenerationStep::Result {
        bail!("mimic generation did not complete; see the log output above");
    }
    println!(
        "{}",
        serde_json::to_string_pretty(&final_session.results)?
    );
    Ok(())
}
