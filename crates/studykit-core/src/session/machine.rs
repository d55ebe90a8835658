//! State transitions for [`GenerationSession`].
//!
//! All updates funnel through the methods here: the streaming path feeds
//! inbound events to [`GenerationSession::apply`] in arrival order, and the
//! one-shot path uses the `begin_run` / `finish_run` / `fail_run` entry
//! points. There is no hidden mutation anywhere else.

use serde_json::Value;
use tracing::debug;

use super::event::StreamEvent;
use super::model::{
    GenerationMode, GenerationResult, GenerationSession, GenerationStep, LogEntry, LogKind, Stage,
};

/// Outcome of applying a stream event.
///
/// Tells the stream loop whether to keep reading, close the connection
/// after a completed run, or close it after a terminal failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    Continue,
    Completed,
    Failed,
}

/// Maps backend status-stage labels onto the client stage vocabulary.
/// Labels outside the table pass through unchanged.
fn map_status_stage(raw: &str) -> Stage {
    match raw {
        "init" | "upload" => Stage::Uploading,
        "parsing" => Stage::Parsing,
        "processing" => Stage::Extracting,
        other => Stage::from(other),
    }
}

/// Merges an incoming counter value, keeping the counter monotonically
/// non-decreasing and never clobbering a known value with an absent one.
fn merge_monotonic(prev: Option<u64>, incoming: Option<u64>) -> Option<u64> {
    match (prev, incoming) {
        (Some(p), Some(n)) => Some(p.max(n)),
        (prev, incoming) => incoming.or(prev),
    }
}

fn nested_extended_decision(validation: Option<&Value>) -> bool {
    validation
        .and_then(|v| v.get("decision"))
        .and_then(Value::as_str)
        .map(|decision| decision == "extended")
        .unwrap_or(false)
}

impl GenerationSession {
    /// Starts a new run: clears the result list and log trail, resets
    /// progress, and moves the step to `Generating`.
    ///
    /// # Arguments
    ///
    /// * `mode` - Which generation path this run takes
    /// * `stage` - The initial stage to display
    /// * `total` - The expected item count, when known up front
    pub fn begin_run(&mut self, mode: GenerationMode, stage: Stage, total: Option<u64>) {
        self.step = GenerationStep::Generating;
        self.mode = mode;
        self.results.clear();
        self.logs.clear();
        self.progress = Default::default();
        self.progress.stage = Some(stage);
        self.progress.counters.current = Some(0);
        self.progress.counters.total = total;
    }

    /// Installs the final result set of a one-shot run and moves the step
    /// to `Result`.
    pub fn finish_run(&mut self, results: Vec<GenerationResult>) {
        let count = results.len() as u64;
        self.results = results;
        self.step = GenerationStep::Result;
        self.progress.stage = Some(Stage::Complete);
        self.progress.counters.current = merge_monotonic(self.progress.counters.current, Some(count));
        self.progress.completed_questions = self.progress.completed_questions.max(count);
    }

    /// Abandons the run with a caller-supplied log entry: step back to
    /// `Config`, progress cleared entirely. Results and logs accumulated
    /// so far are kept.
    pub fn abandon_run(&mut self, entry: LogEntry) {
        self.push_log(entry);
        self.step = GenerationStep::Config;
        self.progress = Default::default();
    }

    /// Abandons the run after a one-shot failure: error log, step back to
    /// `Config`, progress cleared entirely.
    pub fn fail_run(&mut self, message: impl Into<String>) {
        self.abandon_run(LogEntry::error(format!("Error: {}", message.into())));
    }

    /// Records a transport-level stream failure. Unlike an `error` event,
    /// this leaves results, logs and progress counters intact for
    /// inspection; only the step returns to `Config`.
    pub fn fail_connection(&mut self, message: impl Into<String>) {
        self.push_log(LogEntry::error(format!(
            "Stream connection error: {}",
            message.into()
        )));
        self.step = GenerationStep::Config;
    }

    /// Applies one inbound stream event.
    ///
    /// Events are expected in arrival order; each maps to exactly one
    /// state transition per the backend's message contract.
    pub fn apply(&mut self, event: StreamEvent) -> Transition {
        match event {
            StreamEvent::Log { level, content } => {
                self.push_log(LogEntry::new(level, content));
                Transition::Continue
            }

            StreamEvent::Status {
                stage,
                content,
                message,
            } => {
                let line = content
                    .or(message)
                    .unwrap_or_else(|| format!("Stage: {stage}"));
                self.push_log(LogEntry::system(line));
                self.progress.stage = Some(map_status_stage(&stage));
                Transition::Continue
            }

            StreamEvent::Progress {
                stage,
                message,
                current,
                total,
                total_questions,
                status,
                reference_questions,
            } => {
                if let Some(message) = message {
                    self.push_log(LogEntry::system(message));
                }

                let stage = stage
                    .map(Stage::from)
                    .unwrap_or(Stage::Generating);
                self.progress.stage = Some(stage.clone());

                let counters = &mut self.progress.counters;
                counters.current = merge_monotonic(counters.current, current);
                counters.total = total_questions.or(total).or(counters.total);
                counters.status = status.clone();

                // Once extraction finishes, the discovered reference set
                // fixes the run total: an explicit count wins, otherwise
                // the list length.
                if stage == Stage::Extracting
                    && status.as_deref() == Some("complete")
                    && let Some(reference) = reference_questions
                {
                    let from_list = reference.len() as u64;
                    counters.total = Some(
                        total_questions
                            .filter(|&count| count > 0)
                            .unwrap_or(from_list),
                    );
                }
                Transition::Continue
            }

            StreamEvent::QuestionUpdate {
                index,
                status,
                error,
                current,
            } => {
                let index = index.unwrap_or(0);
                let (kind, line) = match status.as_str() {
                    "generating" => (
                        LogKind::System,
                        format!("Generating mimic question {index}..."),
                    ),
                    "failed" => (
                        LogKind::Warning,
                        format!(
                            "Question {index} failed: {}",
                            error.unwrap_or_else(|| "unknown error".to_string())
                        ),
                    ),
                    other => (LogKind::System, format!("Question {index}: {other}")),
                };
                self.push_log(LogEntry::new(kind, line));

                if current.is_some() {
                    self.progress.counters.current =
                        merge_monotonic(self.progress.counters.current, current);
                }
                Transition::Continue
            }

            StreamEvent::Result {
                index,
                current,
                total,
                question_id,
                question,
                validation,
                rounds,
                extended,
                reference_question,
            } => {
                // Either signal marks the item extended; the two are an
                // inclusive-or with no precedence.
                let is_extended =
                    extended.unwrap_or(false) || nested_extended_decision(validation.as_ref());

                let display_index = index.or(current).unwrap_or(0);
                self.push_log(LogEntry::success(format!(
                    "Question {display_index} generated successfully"
                )));

                let question_id = question_id
                    .unwrap_or_else(|| format!("q_{}", self.results.len() + 1));
                self.results.push(GenerationResult {
                    success: true,
                    question_id,
                    question,
                    validation: validation.unwrap_or_default(),
                    rounds: rounds.unwrap_or(1),
                    extended: is_extended,
                    reference_question,
                });

                let count = self.results.len() as u64;
                let counters = &mut self.progress.counters;
                counters.current =
                    merge_monotonic(counters.current, Some(current.unwrap_or(count)));
                // Raise the total if an append would otherwise exceed it.
                counters.total = Some(total.or(counters.total).unwrap_or(1).max(count));
                self.progress.stage = Some(Stage::Generating);
                if is_extended {
                    self.progress.extended_questions += 1;
                }
                Transition::Continue
            }

            StreamEvent::Summary {
                successful,
                failed,
                total_reference,
            } => {
                self.push_log(LogEntry::success(format!(
                    "Generation complete: {successful}/{total_reference} succeeded"
                )));
                self.progress.stage = Some(Stage::Generating);
                let counters = &mut self.progress.counters;
                counters.current = merge_monotonic(counters.current, Some(successful));
                counters.total = Some(total_reference);
                counters.status = None;
                self.progress.completed_questions =
                    self.progress.completed_questions.max(successful);
                self.progress.failed_questions = self.progress.failed_questions.max(failed);
                Transition::Continue
            }

            StreamEvent::Complete { message } => {
                self.push_log(LogEntry::success(
                    message.unwrap_or_else(|| "Mimic generation completed".to_string()),
                ));
                self.step = GenerationStep::Result;
                self.progress.stage = Some(Stage::Complete);
                self.progress.completed_questions = self
                    .progress
                    .completed_questions
                    .max(self.results.len() as u64);
                Transition::Completed
            }

            StreamEvent::Error { content, message } => {
                let detail = content
                    .or(message)
                    .unwrap_or_else(|| "Unknown error".to_string());
                self.push_log(LogEntry::error(format!("Error: {detail}")));
                self.step = GenerationStep::Config;
                self.progress = Default::default();
                Transition::Failed
            }

            StreamEvent::Unknown => {
                debug!("Ignoring unrecognized stream event");
                Transition::Continue
            }
        }
    }
}
