//! The mimic generation stream session.
//!
//! Owns a single WebSocket connection per run. Once the socket opens,
//! exactly one control message goes out; every inbound message is applied
//! to the session in arrival order. A run that has been superseded by a
//! newer one is detected through a generation counter checked under the
//! session lock, so late-arriving messages from an abandoned connection
//! can never corrupt freshly-reset state.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64_STANDARD;
use futures::{SinkExt, StreamExt};
use serde::Serialize;
use tokio::sync::{RwLock, watch};
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message;
use tracing::{debug, warn};

use studykit_core::session::{GenerationSession, LogEntry, StreamEvent, Transition};
use studykit_core::upload::StagedFile;

/// Streaming endpoint for mimic generation.
pub const MIMIC_STREAM_PATH: &str = "/api/v1/question/mimic";

/// The single outbound control message, sent once the socket opens.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum MimicInit {
    /// A locally staged document, shipped inline as base64.
    Upload {
        pdf_data: String,
        pdf_name: String,
        kb_name: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        max_questions: Option<u32>,
    },
    /// A server-side pre-parsed exam directory.
    Parsed {
        paper_path: String,
        kb_name: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        max_questions: Option<u32>,
    },
}

/// Validated input for a mimic run. Exactly one source is present.
#[derive(Debug, Clone)]
pub enum MimicInput {
    Document {
        file: StagedFile,
        kb_name: String,
        max_questions: Option<u32>,
    },
    Parsed {
        paper_path: String,
        kb_name: String,
        max_questions: Option<u32>,
    },
}

/// One streaming run: connection, init message, and the inbound loop.
pub(crate) struct StreamRun {
    pub url: String,
    pub input: MimicInput,
    pub state: Arc<RwLock<GenerationSession>>,
    pub updates: Arc<watch::Sender<GenerationSession>>,
    /// Shared run counter owned by the manager.
    pub generation: Arc<AtomicU64>,
    /// The counter value this run was started with.
    pub run_generation: u64,
}

impl StreamRun {
    /// Applies a mutation unless this run has been superseded. The
    /// generation check happens under the session lock, so a stale task
    /// observes the supersession before it can touch state.
    async fn with_session<R>(&self, f: impl FnOnce(&mut GenerationSession) -> R) -> Option<R> {
        let mut session = self.state.write().await;
        if self.generation.load(Ordering::SeqCst) != self.run_generation {
            return None;
        }
        let out = f(&mut session);
        self.updates.send_replace(session.clone());
        Some(out)
    }

    /// Reads and encodes the document (when one was supplied) and builds
    /// the init message. The payload is encoded in full before anything
    /// is transmitted.
    async fn prepare_init(&self) -> Option<MimicInit> {
        match &self.input {
            MimicInput::Document {
                file,
                kb_name,
                max_questions,
            } => {
                self.with_session(|session| {
                    session.push_log(LogEntry::system("Preparing to upload PDF file..."));
                })
                .await?;
                let bytes = match tokio::fs::read(&file.path).await {
                    Ok(bytes) => bytes,
                    Err(err) => {
                        self.with_session(|session| {
                            session.fail_run(format!("Failed to read {}: {}", file.name, err));
                        })
                        .await;
                        return None;
                    }
                };
                Some(MimicInit::Upload {
                    pdf_data: BASE64_STANDARD.encode(bytes),
                    pdf_name: file.name.clone(),
                    kb_name: kb_name.clone(),
                    max_questions: *max_questions,
                })
            }
            MimicInput::Parsed {
                paper_path,
                kb_name,
                max_questions,
            } => Some(MimicInit::Parsed {
                paper_path: paper_path.clone(),
                kb_name: kb_name.clone(),
                max_questions: *max_questions,
            }),
        }
    }

    pub(crate) async fn run(self) {
        let Some(init) = self.prepare_init().await else {
            return;
        };

        let (mut ws, _) = match connect_async(self.url.as_str()).await {
            Ok(pair) => pair,
            Err(err) => {
                self.with_session(|session| session.fail_connection(err.to_string()))
                    .await;
                return;
            }
        };

        let payload = match serde_json::to_string(&init) {
            Ok(payload) => payload,
            Err(err) => {
                self.with_session(|session| {
                    session.fail_run(format!("Failed to encode init message: {err}"));
                })
                .await;
                return;
            }
        };
        if let Err(err) = ws.send(Message::Text(payload)).await {
            self.with_session(|session| session.fail_connection(err.to_string()))
                .await;
            return;
        }

        let opened = match &self.input {
            MimicInput::Document { file, .. } => format!("Uploaded: {}, parsing...", file.name),
            MimicInput::Parsed { .. } => "Initializing Mimic Generator...".to_string(),
        };
        if self
            .with_session(|session| session.push_log(LogEntry::system(opened)))
            .await
            .is_none()
        {
            return;
        }

        while let Some(frame) = ws.next().await {
            let raw = match frame {
                Ok(Message::Text(text)) => text,
                Ok(Message::Binary(bytes)) => match String::from_utf8(bytes) {
                    Ok(text) => text,
                    Err(_) => continue,
                },
                Ok(Message::Ping(_)) | Ok(Message::Pong(_)) | Ok(Message::Frame(_)) => continue,
                Ok(Message::Close(_)) => {
                    self.with_session(|session| {
                        session.fail_connection("connection closed by server");
                    })
                    .await;
                    return;
                }
                Err(err) => {
                    self.with_session(|session| session.fail_connection(err.to_string()))
                        .await;
                    return;
                }
            };

            let event: StreamEvent = match serde_json::from_str(&raw) {
                Ok(event) => event,
                Err(err) => {
                    warn!(error = %err, "Skipping unparseable stream message");
                    continue;
                }
            };

            let Some(transition) = self.with_session(|session| session.apply(event)).await else {
                debug!("Dropping message from a superseded stream");
                return;
            };
            match transition {
                Transition::Continue => {}
                Transition::Completed | Transition::Failed => {
                    // Terminal event: close without waiting on the server.
                    let _ = ws.close(None).await;
                    return;
                }
            }
        }

        // Server went away without a close frame or a terminal event.
        self.with_session(|session| session.fail_connection("connection closed unexpectedly"))
            .await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{Value, json};

    #[test]
    fn test_upload_init_wire_shape() {
        let init = MimicInit::Upload {
            pdf_data: "QkFTRTY0".to_string(),
            pdf_name: "final-2019.pdf".to_string(),
            kb_name: "networks".to_string(),
            max_questions: Some(5),
        };
        let value: Value = serde_json::from_str(&serde_json::to_string(&init).unwrap()).unwrap();
        assert_eq!(
            value,
            json!({
                "mode": "upload",
                "pdf_data": "QkFTRTY0",
                "pdf_name": "final-2019.pdf",
                "kb_name": "networks",
                "max_questions": 5,
            })
        );
    }

    #[test]
    fn test_parsed_init_omits_absent_max_questions() {
        let init = MimicInit::Parsed {
            paper_path: "/data/parsed/final-2019".to_string(),
            kb_name: "networks".to_string(),
            max_questions: None,
        };
        let value: Value = serde_json::from_str(&serde_json::to_string(&init).unwrap()).unwrap();
        assert_eq!(
            value,
            json!({
                "mode": "parsed",
                "paper_path": "/data/parsed/final-2019",
                "kb_name": "networks",
            })
        );
    }
}
