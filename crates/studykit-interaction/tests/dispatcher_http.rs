//! HTTP-level tests for the one-shot dispatcher and the manager's
//! one-shot path, against a mock backend.

use serde_json::json;
use wiremock::matchers::{body_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use studykit_core::StudykitError;
use studykit_core::session::{GenerationStep, LogKind};
use studykit_core::upload::{FileCandidate, StagedFile, UploadStaging};
use studykit_interaction::{BackendConfig, GenerationManager, QuestionSource, RequestDispatcher};

fn dispatcher_for(server: &MockServer) -> RequestDispatcher {
    RequestDispatcher::new(BackendConfig::new(server.uri()))
}

fn manager_for(server: &MockServer) -> GenerationManager {
    GenerationManager::new(BackendConfig::new(server.uri()))
}

fn staged_pdf(dir: &tempfile::TempDir) -> StagedFile {
    let file_path = dir.path().join("notes.pdf");
    std::fs::write(&file_path, b"%PDF-1.4 stub content").unwrap();
    let mut staging = UploadStaging::new();
    staging
        .stage_single(vec![FileCandidate::from_path(&file_path).unwrap()])
        .unwrap();
    staging.first().unwrap().clone()
}

#[tokio::test]
async fn generates_questions_from_kb() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/v1/question/generate/from-kb"))
        .and(body_json(json!({
            "kb_name": "networks",
            "difficulty": "medium",
            "count": 2,
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "questions": [
                {"question": "What is TCP?", "answer": "A transport protocol", "explanation": "..."},
                {"question": "What is UDP?", "answer": "Connectionless transport", "explanation": "..."},
            ]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let results = dispatcher_for(&server)
        .generate_from_kb("networks", "medium", 2)
        .await
        .unwrap();

    assert_eq!(results.len(), 2);
    assert_eq!(results[0].question_id, "q_1");
    assert_eq!(results[0].question["question"], "What is TCP?");
    assert_eq!(results[1].question_id, "q_2");
}

#[tokio::test]
async fn generates_questions_from_document() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/v1/question/generate/from-document"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "questions": [{"question": "Define a socket."}]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let file = staged_pdf(&dir);
    let results = dispatcher_for(&server)
        .generate_from_document(&file, "hard", 1)
        .await
        .unwrap();

    assert_eq!(results.len(), 1);
    assert_eq!(results[0].question["question"], "Define a socket.");
}

// A 500 with a structured detail body surfaces the detail text exactly.
#[tokio::test]
async fn surfaces_backend_detail_verbatim() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/v1/question/generate/from-kb"))
        .respond_with(
            ResponseTemplate::new(500).set_body_json(json!({"detail": "model timeout"})),
        )
        .mount(&server)
        .await;

    let err = dispatcher_for(&server)
        .generate_from_kb("networks", "medium", 2)
        .await
        .unwrap_err();

    match err {
        StudykitError::Remote { status, detail } => {
            assert_eq!(status, Some(500));
            assert_eq!(detail, "model timeout");
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test]
async fn falls_back_to_status_without_detail() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/v1/question/generate/from-kb"))
        .respond_with(ResponseTemplate::new(503).set_body_string("upstream unavailable"))
        .mount(&server)
        .await;

    let err = dispatcher_for(&server)
        .generate_from_kb("networks", "medium", 2)
        .await
        .unwrap_err();

    match err {
        StudykitError::Remote { status, detail } => {
            assert_eq!(status, Some(503));
            assert!(detail.contains("503"));
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test]
async fn empty_question_set_is_a_distinct_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/v1/question/generate/from-kb"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"questions": []})))
        .mount(&server)
        .await;

    let err = dispatcher_for(&server)
        .generate_from_kb("networks", "medium", 2)
        .await
        .unwrap_err();
    assert!(err.is_empty_result());
}

#[tokio::test]
async fn generates_flashcards_from_document() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/v1/flashcard/generate/from-document"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "cards": [
                {"front": "What is ARP?", "back": "Address resolution protocol"},
            ]
        })))
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let file = staged_pdf(&dir);
    let cards = dispatcher_for(&server)
        .generate_flashcards(&file, "General Review", 5, "groq")
        .await
        .unwrap();

    assert_eq!(cards.len(), 1);
    assert_eq!(cards[0].front, "What is ARP?");
}

#[tokio::test]
async fn empty_flashcard_set_is_a_distinct_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/v1/flashcard/generate/from-document"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"cards": []})))
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let file = staged_pdf(&dir);
    let err = dispatcher_for(&server)
        .generate_flashcards(&file, "General Review", 5, "groq")
        .await
        .unwrap_err();
    assert!(err.is_empty_result());
}

#[tokio::test]
async fn manager_one_shot_success_reaches_result_step() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/v1/question/generate/from-kb"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "questions": [{"question": "What is DNS?"}]
        })))
        .mount(&server)
        .await;

    let manager = manager_for(&server);
    let results = manager
        .start_question_gen(
            QuestionSource::KnowledgeBase {
                kb_name: "networks".to_string(),
            },
            "medium",
            1,
        )
        .await
        .unwrap();
    assert_eq!(results.len(), 1);

    let session = manager.snapshot().await;
    assert_eq!(session.step, GenerationStep::Result);
    assert_eq!(session.results.len(), 1);
    assert_eq!(session.progress.completed_questions, 1);
    assert!(
        session
            .logs
            .iter()
            .any(|log| log.content == "Successfully generated 1 questions")
    );
}

#[tokio::test]
async fn manager_one_shot_failure_returns_to_config() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/v1/question/generate/from-kb"))
        .respond_with(
            ResponseTemplate::new(500).set_body_json(json!({"detail": "model timeout"})),
        )
        .mount(&server)
        .await;

    let manager = manager_for(&server);
    let err = manager
        .start_question_gen(
            QuestionSource::KnowledgeBase {
                kb_name: "networks".to_string(),
            },
            "medium",
            1,
        )
        .await
        .unwrap_err();
    assert!(err.is_remote());

    let session = manager.snapshot().await;
    assert_eq!(session.step, GenerationStep::Config);
    assert_eq!(session.progress, Default::default());
    let last = session.logs.last().unwrap();
    assert_eq!(last.kind, LogKind::Error);
    assert_eq!(last.content, "Error: model timeout");
}

#[tokio::test]
async fn manager_one_shot_empty_result_logs_a_warning() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/v1/question/generate/from-kb"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"questions": []})))
        .mount(&server)
        .await;

    let manager = manager_for(&server);
    let err = manager
        .start_question_gen(
            QuestionSource::KnowledgeBase {
                kb_name: "networks".to_string(),
            },
            "medium",
            1,
        )
        .await
        .unwrap_err();
    assert!(err.is_empty_result());

    let session = manager.snapshot().await;
    assert_eq!(session.step, GenerationStep::Config);
    assert_eq!(session.logs.last().unwrap().kind, LogKind::Warning);
}
