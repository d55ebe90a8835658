//! Generation session domain model.
//!
//! This module contains the core `GenerationSession` entity that represents
//! a single in-flight or completed generation attempt, together with its
//! progress record, result list and log trail.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::str::FromStr;
use strum::Display;

/// Lifecycle phase of a generation session.
///
/// Within a run the step only moves forward (`Config` → `Generating` →
/// `Result`); error paths return to `Config`, which is both the initial
/// state and the only state reachable from failure.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GenerationStep {
    #[default]
    Config,
    Generating,
    Result,
}

/// Which generation path produced (or will produce) the results.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GenerationMode {
    /// One-shot generation from a knowledge base or uploaded document.
    #[default]
    Knowledge,
    /// Streaming generation mirroring a reference exam's style.
    Mimic,
}

/// Coarse label for where a generation run currently is.
///
/// Backend stage strings outside the known set are passed through
/// unmodified in the `Other` variant.
#[derive(Debug, Clone, PartialEq, Eq, Display, Serialize, Deserialize)]
#[strum(serialize_all = "lowercase")]
#[serde(from = "String", into = "String")]
pub enum Stage {
    Uploading,
    Parsing,
    Extracting,
    Generating,
    Complete,
    /// Unrecognized backend stage, kept verbatim.
    #[strum(default)]
    Other(String),
}

impl FromStr for Stage {
    type Err = std::convert::Infallible;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        Ok(match value {
            "uploading" => Stage::Uploading,
            "parsing" => Stage::Parsing,
            "extracting" => Stage::Extracting,
            "generating" => Stage::Generating,
            "complete" => Stage::Complete,
            other => Stage::Other(other.to_string()),
        })
    }
}

impl From<String> for Stage {
    fn from(value: String) -> Self {
        match value.parse() {
            Ok(stage) => stage,
            // The default variant makes parsing infallible, but keep the
            // fallback explicit rather than unwrapping.
            Err(_) => Stage::Other(value),
        }
    }
}

impl From<&str> for Stage {
    fn from(value: &str) -> Self {
        Stage::from(value.to_string())
    }
}

impl From<Stage> for String {
    fn from(stage: Stage) -> Self {
        stage.to_string()
    }
}

/// Raw counters inside [`ProgressInfo`].
///
/// `current` and `total` stay `None` until the backend reports them;
/// absent incoming fields never clobber previously known values.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProgressCounters {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
}

/// Progress record for the active run.
///
/// Reset to zero/empty at the start of every new run; never persisted
/// across runs. The three question counters are monotonically
/// non-decreasing within a run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProgressInfo {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stage: Option<Stage>,
    #[serde(rename = "progress")]
    pub counters: ProgressCounters,
    #[serde(default)]
    pub extended_questions: u64,
    #[serde(default)]
    pub completed_questions: u64,
    #[serde(default)]
    pub failed_questions: u64,
}

/// A single generated item, appended to the session as the backend
/// reports it. Never mutated after insertion.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationResult {
    pub success: bool,
    /// Unique within the session; synthesized (`q_{n}`) when the backend
    /// message carried none.
    pub question_id: String,
    /// Opaque question payload forwarded from the backend.
    pub question: Value,
    /// Opaque validation payload, may be empty.
    #[serde(default)]
    pub validation: Value,
    #[serde(default = "default_rounds")]
    pub rounds: u32,
    /// Whether the item required an extended generation path.
    #[serde(default)]
    pub extended: bool,
    /// The reference question a mimic item was modeled on, when reported.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reference_question: Option<Value>,
}

fn default_rounds() -> u32 {
    1
}

/// Severity class of a session log entry.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogKind {
    #[default]
    System,
    Success,
    Warning,
    Error,
}

/// A single entry in the session's append-only log trail.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogEntry {
    /// The severity class of the entry.
    #[serde(rename = "type")]
    pub kind: LogKind,
    /// The display string.
    pub content: String,
    /// Timestamp when the entry was created (ISO 8601 format).
    pub timestamp: String,
}

impl LogEntry {
    /// Creates a new entry stamped with the current time.
    pub fn new(kind: LogKind, content: impl Into<String>) -> Self {
        Self {
            kind,
            content: content.into(),
            timestamp: chrono::Utc::now().to_rfc3339(),
        }
    }

    /// Creates a system entry
    pub fn system(content: impl Into<String>) -> Self {
        Self::new(LogKind::System, content)
    }

    /// Creates a success entry
    pub fn success(content: impl Into<String>) -> Self {
        Self::new(LogKind::Success, content)
    }

    /// Creates a warning entry
    pub fn warning(content: impl Into<String>) -> Self {
        Self::new(LogKind::Warning, content)
    }

    /// Creates an error entry
    pub fn error(content: impl Into<String>) -> Self {
        Self::new(LogKind::Error, content)
    }
}

/// Root entity for one generation attempt.
///
/// `results` and `logs` are append-only during a run and cleared when a
/// new run starts or the session is reset. Once `counters.total` is
/// known, `results.len()` never exceeds it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GenerationSession {
    pub step: GenerationStep,
    pub mode: GenerationMode,
    pub progress: ProgressInfo,
    #[serde(default)]
    pub results: Vec<GenerationResult>,
    #[serde(default)]
    pub logs: Vec<LogEntry>,
}

impl GenerationSession {
    /// Creates a fresh session in the `Config` step.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends an entry to the session log trail.
    pub fn push_log(&mut self, entry: LogEntry) {
        self.logs.push(entry);
    }

    /// Returns the session to its initial state: `Config` step, empty
    /// results, logs and progress.
    pub fn reset(&mut self) {
        self.step = GenerationStep::Config;
        self.results.clear();
        self.logs.clear();
        self.progress = ProgressInfo::default();
    }
}
