//! One-shot generation requests.
//!
//! The dispatcher issues the single HTTP request that starts a synchronous
//! generation and resolves with the final result set. It sends exactly
//! once and never retries; all retries are user-initiated.

use reqwest::{Client, StatusCode, multipart};
use serde::{Deserialize, Serialize};
use serde_json::json;
use studykit_core::session::GenerationResult;
use studykit_core::upload::StagedFile;
use studykit_core::{Result, StudykitError};

use crate::config::BackendConfig;

pub const QUESTIONS_FROM_KB_PATH: &str = "/api/v1/question/generate/from-kb";
pub const QUESTIONS_FROM_DOCUMENT_PATH: &str = "/api/v1/question/generate/from-document";
pub const FLASHCARDS_FROM_DOCUMENT_PATH: &str = "/api/v1/flashcard/generate/from-document";

#[derive(Debug, Serialize)]
struct KbQuestionRequest<'a> {
    kb_name: &'a str,
    difficulty: &'a str,
    count: u32,
}

#[derive(Debug, Deserialize)]
struct QuestionsResponse {
    #[serde(default)]
    questions: Vec<RawQuestion>,
}

/// One generated question as the one-shot endpoints report it.
#[derive(Debug, Deserialize)]
struct RawQuestion {
    question: String,
    #[serde(default)]
    answer: Option<String>,
    #[serde(default)]
    explanation: Option<String>,
}

/// A front/back study card.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Flashcard {
    pub front: String,
    pub back: String,
}

#[derive(Debug, Deserialize)]
struct FlashcardsResponse {
    #[serde(default)]
    cards: Vec<Flashcard>,
}

/// Structured error body the backend attaches to non-success responses.
#[derive(Debug, Deserialize)]
struct ErrorDetail {
    detail: String,
}

/// Client for the backend's one-shot generation endpoints.
#[derive(Debug, Clone)]
pub struct RequestDispatcher {
    client: Client,
    config: BackendConfig,
}

impl RequestDispatcher {
    pub fn new(config: BackendConfig) -> Self {
        Self {
            client: Client::new(),
            config,
        }
    }

    /// Generates questions from a named knowledge base.
    ///
    /// # Errors
    ///
    /// Returns a Remote error on transport failure or a non-success
    /// response, and `EmptyResult` when the backend produced zero items.
    pub async fn generate_from_kb(
        &self,
        kb_name: &str,
        difficulty: &str,
        count: u32,
    ) -> Result<Vec<GenerationResult>> {
        let response = self
            .client
            .post(self.config.api_url(QUESTIONS_FROM_KB_PATH))
            .json(&KbQuestionRequest {
                kb_name,
                difficulty,
                count,
            })
            .send()
            .await
            .map_err(request_error)?;

        let parsed: QuestionsResponse = check_status(response).await?.json().await.map_err(
            |err| StudykitError::Serialization {
                format: "JSON".to_string(),
                message: format!("Failed to parse question response: {err}"),
            },
        )?;
        if parsed.questions.is_empty() {
            return Err(StudykitError::EmptyResult);
        }
        Ok(questions_to_results(parsed.questions))
    }

    /// Generates questions from a staged document via multipart upload.
    ///
    /// # Errors
    ///
    /// Same error surface as [`RequestDispatcher::generate_from_kb`], plus
    /// IO errors from reading the staged file.
    pub async fn generate_from_document(
        &self,
        file: &StagedFile,
        difficulty: &str,
        count: u32,
    ) -> Result<Vec<GenerationResult>> {
        let form = document_form(file)
            .await?
            .text("difficulty", difficulty.to_string())
            .text("count", count.to_string());

        let response = self
            .client
            .post(self.config.api_url(QUESTIONS_FROM_DOCUMENT_PATH))
            .multipart(form)
            .send()
            .await
            .map_err(request_error)?;

        let parsed: QuestionsResponse = check_status(response).await?.json().await.map_err(
            |err| StudykitError::Serialization {
                format: "JSON".to_string(),
                message: format!("Failed to parse question response: {err}"),
            },
        )?;
        if parsed.questions.is_empty() {
            return Err(StudykitError::EmptyResult);
        }
        Ok(questions_to_results(parsed.questions))
    }

    /// Generates flashcards from a staged document via multipart upload.
    ///
    /// # Errors
    ///
    /// Same error surface as the question endpoints; `EmptyResult` when
    /// the backend returned no cards.
    pub async fn generate_flashcards(
        &self,
        file: &StagedFile,
        topic: &str,
        count: u32,
        provider: &str,
    ) -> Result<Vec<Flashcard>> {
        let form = document_form(file)
            .await?
            .text("topic", topic.to_string())
            .text("count", count.to_string())
            .text("provider", provider.to_string());

        let response = self
            .client
            .post(self.config.api_url(FLASHCARDS_FROM_DOCUMENT_PATH))
            .multipart(form)
            .send()
            .await
            .map_err(request_error)?;

        let parsed: FlashcardsResponse = check_status(response).await?.json().await.map_err(
            |err| StudykitError::Serialization {
                format: "JSON".to_string(),
                message: format!("Failed to parse flashcard response: {err}"),
            },
        )?;
        if parsed.cards.is_empty() {
            return Err(StudykitError::EmptyResult);
        }
        Ok(parsed.cards)
    }
}

/// Builds the multipart form with the staged file's bytes under `file`.
async fn document_form(file: &StagedFile) -> Result<multipart::Form> {
    let bytes = tokio::fs::read(&file.path).await?;
    let part = multipart::Part::bytes(bytes).file_name(file.name.clone());
    Ok(multipart::Form::new().part("file", part))
}

fn request_error(err: reqwest::Error) -> StudykitError {
    StudykitError::Remote {
        status: err.status().map(|status| status.as_u16()),
        detail: format!("Request failed: {err}"),
    }
}

/// Rejects non-success responses, preferring the backend's structured
/// `detail` string and falling back to the bare status code.
async fn check_status(response: reqwest::Response) -> Result<reqwest::Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(map_http_error(status, &body))
}

fn map_http_error(status: StatusCode, body: &str) -> StudykitError {
    match serde_json::from_str::<ErrorDetail>(body) {
        Ok(parsed) => StudykitError::remote(status.as_u16(), parsed.detail),
        Err(_) => StudykitError::remote_status(status.as_u16()),
    }
}

/// Converts the one-shot response questions into session results, with
/// sequential synthetic ids and a written-question payload.
fn questions_to_results(questions: Vec<RawQuestion>) -> Vec<GenerationResult> {
    questions
        .into_iter()
        .enumerate()
        .map(|(idx, raw)| GenerationResult {
            success: true,
            question_id: format!("q_{}", idx + 1),
            question: json!({
                "question": raw.question,
                "correct_answer": raw.answer,
                "explanation": raw.explanation,
                "type": "written",
                "question_type": "written",
            }),
            validation: json!({}),
            rounds: 1,
            extended: false,
            reference_question: None,
        })
        .collect()
}
