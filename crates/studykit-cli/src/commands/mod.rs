//! CLI subcommands.

pub mod flashcards;
pub mod mimic;
pub mod quiz;

use studykit_core::session::{LogEntry, LogKind};

/// Label for rendering a log entry's severity.
pub(crate) fn kind_label(kind: LogKind) -> &'static str {
    match kind {
        LogKind::System => "system",
        LogKind::Success => "success",
        LogKind::Warning => "warning",
        LogKind::Error => "error",
    }
}

/// Renders session log entries to stderr.
pub(crate) fn print_logs(logs: &[LogEntry]) {
    for log in logs {
        eprintln!("[{}] {}", kind_label(log.kind), log.content);
    }
}
