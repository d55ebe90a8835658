//! Session-owning generation manager.
//!
//! `GenerationManager` holds the single [`GenerationSession`] for a client,
//! dispatches one-shot runs, starts mimic stream runs, and publishes a
//! snapshot of the session after every transition. Starting any new run
//! supersedes whatever was in flight: the previous stream task is aborted
//! without a close handshake and its late messages are discarded.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use tokio::sync::{Mutex, RwLock, watch};
use tokio::task::JoinHandle;
use tracing::debug;

use studykit_core::session::{
    GenerationMode, GenerationResult, GenerationSession, GenerationStep, LogEntry, Stage,
};
use studykit_core::upload::StagedFile;
use studykit_core::{Result, StudykitError};

use crate::config::BackendConfig;
use crate::dispatcher::{Flashcard, RequestDispatcher};
use crate::stream::{MIMIC_STREAM_PATH, MimicInput, StreamRun};

/// Where a one-shot question run draws its material from.
#[derive(Debug, Clone)]
pub enum QuestionSource {
    KnowledgeBase { kb_name: String },
    Document { file: StagedFile },
}

/// Manages the lifecycle of generation runs for one client session.
///
/// All state transitions for the session funnel through this type, either
/// directly (one-shot path) or via the stream task it spawns (mimic path).
/// At most one stream connection is open at any time.
pub struct GenerationManager {
    config: BackendConfig,
    dispatcher: RequestDispatcher,
    /// The single session this manager owns.
    state: Arc<RwLock<GenerationSession>>,
    /// Snapshot channel; receivers observe the session after every change.
    updates: Arc<watch::Sender<GenerationSession>>,
    /// Run counter; bumping it invalidates any in-flight stream task.
    generation: Arc<AtomicU64>,
    /// Handle of the active stream task, if any.
    active_stream: Mutex<Option<JoinHandle<()>>>,
}

impl GenerationManager {
    pub fn new(config: BackendConfig) -> Self {
        let (updates, _) = watch::channel(GenerationSession::new());
        Self {
            dispatcher: RequestDispatcher::new(config.clone()),
            config,
            state: Arc::new(RwLock::new(GenerationSession::new())),
            updates: Arc::new(updates),
            generation: Arc::new(AtomicU64::new(0)),
            active_stream: Mutex::new(None),
        }
    }

    /// The current session state.
    pub async fn snapshot(&self) -> GenerationSession {
        self.state.read().await.clone()
    }

    /// Subscribes to session snapshots, published after every transition.
    pub fn subscribe(&self) -> watch::Receiver<GenerationSession> {
        self.updates.subscribe()
    }

    /// Waits until the active run settles (the step leaves `Generating`)
    /// and returns the final snapshot.
    pub async fn wait_until_settled(&self) -> GenerationSession {
        let mut updates = self.updates.subscribe();
        loop {
            let snapshot = updates.borrow_and_update().clone();
            if snapshot.step != GenerationStep::Generating {
                return snapshot;
            }
            if updates.changed().await.is_err() {
                return snapshot;
            }
        }
    }

    async fn mutate<R>(&self, f: impl FnOnce(&mut GenerationSession) -> R) -> R {
        let mut session = self.state.write().await;
        let out = f(&mut session);
        self.updates.send_replace(session.clone());
        out
    }

    /// Invalidates and tears down any in-flight stream run. Latest-wins:
    /// the task is aborted with no draining or close handshake; the bumped
    /// generation makes any of its late messages inert.
    async fn supersede_stream(&self) -> u64 {
        let next = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        let mut active = self.active_stream.lock().await;
        if let Some(handle) = active.take() {
            handle.abort();
            debug!("Aborted previous stream task before starting a new run");
        }
        next
    }

    /// Runs a one-shot question generation and resolves with the final
    /// result set. The session moves to `Generating` before the request
    /// and to `Result` (or back to `Config` on error) after.
    ///
    /// # Errors
    ///
    /// Remote, empty-result and serialization errors from the dispatcher;
    /// the session reflects the failure before the error is returned.
    pub async fn start_question_gen(
        &self,
        source: QuestionSource,
        difficulty: &str,
        count: u32,
    ) -> Result<Vec<GenerationResult>> {
        self.supersede_stream().await;

        self.mutate(|session| {
            session.begin_run(
                GenerationMode::Knowledge,
                Stage::Generating,
                Some(u64::from(count)),
            );
            session.push_log(LogEntry::system("Initializing exam question generator..."));
            match &source {
                QuestionSource::KnowledgeBase { kb_name } => {
                    session.push_log(LogEntry::system(format!(
                        "Generating questions from Knowledge Base: {kb_name}"
                    )));
                }
                QuestionSource::Document { file } => {
                    session.push_log(LogEntry::system(format!(
                        "Uploading and processing document: {}",
                        file.name
                    )));
                }
            }
        })
        .await;

        let outcome = match &source {
            QuestionSource::KnowledgeBase { kb_name } => {
                self.dispatcher
                    .generate_from_kb(kb_name, difficulty, count)
                    .await
            }
            QuestionSource::Document { file } => {
                self.dispatcher
                    .generate_from_document(file, difficulty, count)
                    .await
            }
        };

        match outcome {
            Ok(results) => {
                self.mutate(|session| {
                    session.push_log(LogEntry::success(format!(
                        "Successfully generated {} questions",
                        results.len()
                    )));
                    session.finish_run(results.clone());
                })
                .await;
                Ok(results)
            }
            Err(err) => {
                self.mutate(|session| {
                    // An empty result set is a distinct, softer condition
                    // than a backend failure.
                    if err.is_empty_result() {
                        session.abandon_run(LogEntry::warning(err.user_message()));
                    } else {
                        session.fail_run(err.user_message());
                    }
                })
                .await;
                Err(err)
            }
        }
    }

    /// Generates flashcards from a staged document. Stateless: the
    /// session state machine is not involved.
    ///
    /// # Errors
    ///
    /// Remote and empty-result errors from the dispatcher.
    pub async fn generate_flashcards(
        &self,
        file: &StagedFile,
        topic: &str,
        count: u32,
        provider: &str,
    ) -> Result<Vec<Flashcard>> {
        self.dispatcher
            .generate_flashcards(file, topic, count, provider)
            .await
    }

    /// Starts a mimic generation run over the streaming endpoint.
    ///
    /// Exactly one of `file` or a non-empty `paper_path` must be supplied.
    /// Returns as soon as the stream task is spawned; observe progress via
    /// [`GenerationManager::subscribe`] or
    /// [`GenerationManager::wait_until_settled`].
    ///
    /// # Errors
    ///
    /// [`StudykitError::NoInput`] when neither source is supplied (the
    /// session is left untouched and no connection is opened), or a config
    /// error when no WebSocket URL can be derived.
    pub async fn start_mimic_gen(
        &self,
        file: Option<StagedFile>,
        paper_path: &str,
        kb_name: &str,
        max_questions: Option<u32>,
    ) -> Result<()> {
        let paper_path = paper_path.trim();
        let input = match file {
            Some(file) => MimicInput::Document {
                file,
                kb_name: kb_name.to_string(),
                max_questions,
            },
            None if !paper_path.is_empty() => MimicInput::Parsed {
                paper_path: paper_path.to_string(),
                kb_name: kb_name.to_string(),
                max_questions,
            },
            None => return Err(StudykitError::NoInput),
        };
        let url = self.config.ws_url(MIMIC_STREAM_PATH)?;

        let run_generation = self.supersede_stream().await;

        let initial_stage = match &input {
            MimicInput::Document { .. } => Stage::Uploading,
            MimicInput::Parsed { .. } => Stage::Parsing,
        };
        self.mutate(|session| {
            session.begin_run(
                GenerationMode::Mimic,
                initial_stage,
                Some(u64::from(max_questions.unwrap_or(1))),
            );
        })
        .await;

        let run = StreamRun {
            url,
            input,
            state: Arc::clone(&self.state),
            updates: Arc::clone(&self.updates),
            generation: Arc::clone(&self.generation),
            run_generation,
        };
        let handle = tokio::spawn(run.run());
        *self.active_stream.lock().await = Some(handle);
        Ok(())
    }

    /// Abandons any active run and returns the session to its initial
    /// state with cleared results, logs and progress.
    pub async fn reset(&self) {
        self.supersede_stream().await;
        self.mutate(|session| session.reset()).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn manager() -> GenerationManager {
        GenerationManager::new(BackendConfig::new("http://localhost:8000"))
    }

    #[tokio::test]
    async fn test_mimic_without_input_fails_fast() {
        let manager = manager();
        let err = manager
            .start_mimic_gen(None, "   ", "networks", Some(5))
            .await
            .unwrap_err();

        assert!(matches!(err, StudykitError::NoInput));
        // Validation failures are inline-only: no logs, no step change.
        let session = manager.snapshot().await;
        assert_eq!(session.step, GenerationStep::Config);
        assert!(session.logs.is_empty());
    }

    #[tokio::test]
    async fn test_reset_returns_to_initial_state() {
        let manager = manager();
        manager
            .mutate(|session| {
                session.begin_run(GenerationMode::Mimic, Stage::Uploading, Some(3));
                session.push_log(LogEntry::system("in flight"));
            })
            .await;

        manager.reset().await;

        let session = manager.snapshot().await;
        assert_eq!(session, GenerationSession::new());
    }

    #[tokio::test]
    async fn test_subscribe_observes_transitions() {
        let manager = manager();
        let mut updates = manager.subscribe();

        manager
            .mutate(|session| {
                session.begin_run(GenerationMode::Knowledge, Stage::Generating, Some(2));
            })
            .await;

        updates.changed().await.unwrap();
        assert_eq!(
            updates.borrow_and_update().step,
            GenerationStep::Generating
        );
    }
}
