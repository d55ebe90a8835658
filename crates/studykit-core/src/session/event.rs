//! Inbound stream events for mimic generation runs.
//!
//! Each WebSocket text frame from the backend carries one JSON object
//! tagged by a `type` field. Events are applied to the session in arrival
//! order, with no reordering or batching.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::LogKind;

/// A single inbound message on the mimic generation stream.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StreamEvent {
    /// A log line to append to the session trail verbatim.
    Log {
        #[serde(default)]
        level: LogKind,
        content: String,
    },
    /// Coarse stage announcement. The raw stage label goes through a fixed
    /// lookup before being stored (see `GenerationSession::apply`).
    Status {
        stage: String,
        #[serde(default)]
        content: Option<String>,
        #[serde(default)]
        message: Option<String>,
    },
    /// Counter update, optionally carrying the discovered reference set.
    Progress {
        #[serde(default)]
        stage: Option<String>,
        #[serde(default)]
        message: Option<String>,
        #[serde(default)]
        current: Option<u64>,
        #[serde(default)]
        total: Option<u64>,
        /// Preferred over `total` when both are present.
        #[serde(default)]
        total_questions: Option<u64>,
        #[serde(default)]
        status: Option<String>,
        #[serde(default)]
        reference_questions: Option<Vec<Value>>,
    },
    /// Per-item progress note (`generating`, `failed`, or other).
    QuestionUpdate {
        #[serde(default)]
        index: Option<u64>,
        status: String,
        #[serde(default)]
        error: Option<String>,
        #[serde(default)]
        current: Option<u64>,
    },
    /// A finished item.
    Result {
        #[serde(default)]
        index: Option<u64>,
        #[serde(default)]
        current: Option<u64>,
        #[serde(default)]
        total: Option<u64>,
        #[serde(default)]
        question_id: Option<String>,
        #[serde(default)]
        question: Value,
        #[serde(default)]
        validation: Option<Value>,
        #[serde(default)]
        rounds: Option<u32>,
        #[serde(default)]
        extended: Option<bool>,
        #[serde(default)]
        reference_question: Option<Value>,
    },
    /// End-of-run tally.
    Summary {
        #[serde(default)]
        successful: u64,
        #[serde(default)]
        failed: u64,
        #[serde(default)]
        total_reference: u64,
    },
    /// Terminal success; the connection closes after this.
    Complete {
        #[serde(default)]
        message: Option<String>,
    },
    /// Terminal failure; the run is abandoned, not retried.
    Error {
        #[serde(default)]
        content: Option<String>,
        #[serde(default)]
        message: Option<String>,
    },
    /// Any event type this client does not recognize. Ignored.
    #[serde(other)]
    Unknown,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deserializes_tagged_events() {
        let event: StreamEvent =
            serde_json::from_str(r#"{"type": "status", "stage": "parsing"}"#).unwrap();
        assert!(matches!(event, StreamEvent::Status { ref stage, .. } if stage == "parsing"));

        let event: StreamEvent = serde_json::from_str(
            r#"{"type": "progress", "stage": "generating", "current": 2, "total_questions": 8}"#,
        )
        .unwrap();
        match event {
            StreamEvent::Progress {
                current,
                total,
                total_questions,
                ..
            } => {
                assert_eq!(current, Some(2));
                assert_eq!(total, None);
                assert_eq!(total_questions, Some(8));
            }
            other => panic!("unexpected event: {other:?}"),
        }
    }

    #[test]
    fn test_log_level_defaults_to_system() {
        let event: StreamEvent =
            serde_json::from_str(r#"{"type": "log", "content": "warming up"}"#).unwrap();
        match event {
            StreamEvent::Log { level, content } => {
                assert_eq!(level, LogKind::System);
                assert_eq!(content, "warming up");
            }
            other => panic!("unexpected event: {other:?}"),
        }
    }

    #[test]
    fn test_result_event_with_nested_validation() {
        let event: StreamEvent = serde_json::from_str(
            r#"{
                "type": "result",
                "index": 3,
                "question": {"question": "What is TCP?"},
                "validation": {"decision": "extended"},
                "rounds": 2
            }"#,
        )
        .unwrap();
        match event {
            StreamEvent::Result {
                index,
                validation,
                rounds,
                extended,
                ..
            } => {
                assert_eq!(index, Some(3));
                assert_eq!(rounds, Some(2));
                assert_eq!(extended, None);
                assert_eq!(
                    validation.unwrap()["decision"],
                    Value::String("extended".to_string())
                );
            }
            other => panic!("unexpected event: {other:?}"),
        }
    }

    #[test]
    fn test_unknown_event_types_fall_through() {
        let event: StreamEvent =
            serde_json::from_str(r#"{"type": "token_stats", "prompt_tokens": 120}"#).unwrap();
        assert!(matches!(event, StreamEvent::Unknown));
    }
}
