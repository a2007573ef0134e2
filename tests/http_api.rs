use std::sync::Arc;

use async_trait::async_trait;
use reqwest::StatusCode;
use tempfile::TempDir;

use medical_chatbot::answer::AnswerGenerator;
use medical_chatbot::core::config::Settings;
use medical_chatbot::embedding::{Embedder, HashingEmbedder};
use medical_chatbot::ingest::{Chunker, Document};
use medical_chatbot::llm::GenerationError;
use medical_chatbot::rag::{ChunkSearchResult, SqliteVectorStore, StoredChunk, VectorStore};
use medical_chatbot::server::router::router;
use medical_chatbot::state::AppState;

const FALLBACK: &str = "I'm sorry, I couldn't find an answer for that.";

/// Answers with the retrieved context verbatim.
struct EchoGenerator;

#[async_trait]
impl AnswerGenerator for EchoGenerator {
    async fn answer(
        &self,
        _question: &str,
        chunks: &[ChunkSearchResult],
    ) -> Result<String, GenerationError> {
        if chunks.is_empty() {
            return Err(GenerationError::EmptyResponse("no context".to_string()));
        }
        Ok(chunks
            .iter()
            .map(|c| c.chunk.content.as_str())
            .collect::<Vec<_>>()
            .join(" "))
    }
}

struct PanickingGenerator;

#[async_trait]
impl AnswerGenerator for PanickingGenerator {
    async fn answer(
        &self,
        _question: &str,
        _chunks: &[ChunkSearchResult],
    ) -> Result<String, GenerationError> {
        panic!("generator exploded");
    }
}

async fn build_store(dir: &TempDir, embedder: &HashingEmbedder, texts: &[&str]) -> SqliteVectorStore {
    let chunker = Chunker::new(500, 20).expect("chunker");
    let mut entries = Vec::new();
    for (i, text) in texts.iter().enumerate() {
        let doc = Document::new(format!("data/doc{}.pdf", i), *text);
        for chunk in chunker.chunk(&doc) {
            let vector = embedder.embed_text(&chunk.text);
            entries.push((StoredChunk::from(chunk), vector));
        }
    }
    SqliteVectorStore::build(&dir.path().join("db"), embedder.model_id(), entries)
        .await
        .expect("build store")
}

async fn spawn_server(
    store: Arc<dyn VectorStore>,
    embedder: HashingEmbedder,
    generator: Arc<dyn AnswerGenerator>,
) -> (String, tokio::task::JoinHandle<()>) {
    let state = AppState::from_parts(Settings::default(), Arc::new(embedder), store, generator);
    let app = router(state);
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind test listener");
    let addr = listener.local_addr().expect("listener addr");
    let handle = tokio::spawn(async move {
        axum::serve(listener, app).await.expect("server run");
    });
    (format!("http://{}", addr), handle)
}

async fn spawn_indexed_server(dir: &TempDir) -> (String, tokio::task::JoinHandle<()>) {
    let embedder = HashingEmbedder::new(256);
    let store = build_store(
        dir,
        &embedder,
        &[
            "Aspirin reduces fever.",
            "Insulin regulates blood sugar in diabetes.",
        ],
    )
    .await;
    spawn_server(Arc::new(store), embedder, Arc::new(EchoGenerator)).await
}

#[tokio::test]
async fn root_reports_service_metadata() {
    let dir = TempDir::new().unwrap();
    let (base, handle) = spawn_indexed_server(&dir).await;

    let response = reqwest::get(format!("{}/", base)).await.expect("root response");
    assert_eq!(response.status(), StatusCode::OK);

    let body: serde_json::Value = response.json().await.expect("root json");
    assert_eq!(body["message"], "Medical Chatbot API");
    assert_eq!(body["status"], "online");
    assert_eq!(body["version"], env!("CARGO_PKG_VERSION"));
    assert_eq!(body["endpoints"]["chat"], "/get");

    handle.abort();
}

#[tokio::test]
async fn health_is_healthy() {
    let dir = TempDir::new().unwrap();
    let (base, handle) = spawn_indexed_server(&dir).await;

    let body: serde_json::Value = reqwest::get(format!("{}/health", base))
        .await
        .expect("health response")
        .json()
        .await
        .expect("health json");
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["service"], "Medical Chatbot API");

    handle.abort();
}

#[tokio::test]
async fn chat_answers_in_plain_text() {
    let dir = TempDir::new().unwrap();
    let (base, handle) = spawn_indexed_server(&dir).await;
    let client = reqwest::Client::new();

    let response = client
        .post(format!("{}/get", base))
        .form(&[("msg", "What reduces fever?")])
        .send()
        .await
        .expect("chat response");
    assert_eq!(response.status(), StatusCode::OK);
    let content_type = response
        .headers()
        .get(reqwest::header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_string();
    assert!(content_type.starts_with("text/plain"));

    let text = response.text().await.expect("chat body");
    assert!(text.contains("Aspirin reduces fever."));

    handle.abort();
}

#[tokio::test]
async fn blank_message_is_rejected() {
    let dir = TempDir::new().unwrap();
    let (base, handle) = spawn_indexed_server(&dir).await;
    let client = reqwest::Client::new();

    for msg in ["", "   "] {
        let response = client
            .post(format!("{}/get", base))
            .form(&[("msg", msg)])
            .send()
            .await
            .expect("chat response");
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(response.text().await.unwrap(), "Please enter a message.");
    }

    let missing = client
        .post(format!("{}/get", base))
        .form(&[("other", "x")])
        .send()
        .await
        .expect("chat response");
    assert_eq!(missing.status(), StatusCode::BAD_REQUEST);

    handle.abort();
}

#[tokio::test]
async fn unbuilt_store_still_answers_with_fallback() {
    let dir = TempDir::new().unwrap();
    let embedder = HashingEmbedder::new(64);
    let store = SqliteVectorStore::open(&dir.path().join("db"), embedder.model_id())
        .await
        .expect("open store");
    let (base, handle) = spawn_server(Arc::new(store), embedder, Arc::new(EchoGenerator)).await;

    let response = reqwest::Client::new()
        .post(format!("{}/get", base))
        .form(&[("msg", "What reduces fever?")])
        .send()
        .await
        .expect("chat response");
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.text().await.unwrap(), FALLBACK);

    handle.abort();
}

#[tokio::test]
async fn pipeline_panic_is_a_generic_server_error() {
    let dir = TempDir::new().unwrap();
    let embedder = HashingEmbedder::new(64);
    let store = build_store(&dir, &embedder, &["Aspirin reduces fever."]).await;
    let (base, handle) =
        spawn_server(Arc::new(store), embedder, Arc::new(PanickingGenerator)).await;

    let response = reqwest::Client::new()
        .post(format!("{}/get", base))
        .form(&[("msg", "What reduces fever?")])
        .send()
        .await
        .expect("chat response");
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let text = response.text().await.unwrap();
    assert_eq!(text, "An error occurred while processing your request.");
    assert!(!text.contains("exploded"));

    handle.abort();
}

#[tokio::test]
async fn ask_returns_answer_with_sources() {
    let dir = TempDir::new().unwrap();
    let (base, handle) = spawn_indexed_server(&dir).await;
    let client = reqwest::Client::new();

    let body: serde_json::Value = client
        .post(format!("{}/api/ask", base))
        .json(&serde_json::json!({ "question": "What reduces fever?" }))
        .send()
        .await
        .expect("ask response")
        .json()
        .await
        .expect("ask json");

    assert_eq!(body["fallback"], false);
    assert!(body["answer"].as_str().unwrap().contains("Aspirin"));
    let sources = body["sources"].as_array().expect("sources array");
    assert_eq!(sources.len(), 2);
    assert_eq!(sources[0]["source"], "data/doc0.pdf");
    assert_eq!(sources[0]["chunk_index"], 0);

    let rejected = client
        .post(format!("{}/api/ask", base))
        .json(&serde_json::json!({ "question": " " }))
        .send()
        .await
        .expect("ask response");
    assert_eq!(rejected.status(), StatusCode::BAD_REQUEST);
    let err: serde_json::Value = rejected.json().await.unwrap();
    assert_eq!(err["error"], "Please enter a message.");

    handle.abort();
}

fn multipart_body(boundary: &str, name: &str, value: &str) -> String {
    format!(
        "--{b}\r\nContent-Disposition: form-data; name=\"{name}\"\r\n\r\n{value}\r\n--{b}--\r\n",
        b = boundary,
        name = name,
        value = value
    )
}

async fn post_multipart(base: &str, name: &str, value: &str) -> reqwest::Response {
    let boundary = "medbot-test-boundary";
    reqwest::Client::new()
        .post(format!("{}/get", base))
        .header(
            reqwest::header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={}", boundary),
        )
        .body(multipart_body(boundary, name, value))
        .send()
        .await
        .expect("multipart response")
}

#[tokio::test]
async fn chat_accepts_multipart_form_data() {
    let dir = TempDir::new().unwrap();
    let (base, handle) = spawn_indexed_server(&dir).await;

    let response = post_multipart(&base, "msg", "What reduces fever?").await;
    assert_eq!(response.status(), StatusCode::OK);
    assert!(response.text().await.unwrap().contains("Aspirin reduces fever."));

    handle.abort();
}

#[tokio::test]
async fn blank_multipart_message_is_rejected() {
    let dir = TempDir::new().unwrap();
    let (base, handle) = spawn_indexed_server(&dir).await;

    for (name, value) in [("msg", "  "), ("other", "What reduces fever?")] {
        let response = post_multipart(&base, name, value).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(response.text().await.unwrap(), "Please enter a message.");
    }

    handle.abort();
}

#[tokio::test]
async fn unreadable_chat_body_is_a_plain_bad_request() {
    let dir = TempDir::new().unwrap();
    let (base, handle) = spawn_indexed_server(&dir).await;

    let response = reqwest::Client::new()
        .post(format!("{}/get", base))
        .header(reqwest::header::CONTENT_TYPE, "application/json")
        .body(r#"{"msg":"What reduces fever?"}"#)
        .send()
        .await
        .expect("chat response");
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(response.text().await.unwrap(), "Invalid form submission.");

    handle.abort();
}

#[tokio::test]
async fn malformed_ask_body_is_a_json_error_without_parser_detail() {
    let dir = TempDir::new().unwrap();
    let (base, handle) = spawn_indexed_server(&dir).await;
    let client = reqwest::Client::new();

    let malformed = client
        .post(format!("{}/api/ask", base))
        .header(reqwest::header::CONTENT_TYPE, "application/json")
        .body("{not json")
        .send()
        .await
        .expect("ask response");
    assert_eq!(malformed.status(), StatusCode::BAD_REQUEST);
    let body: serde_json::Value = malformed.json().await.expect("error json");
    let message = body["error"].as_str().expect("error message");
    assert_eq!(
        message,
        "Request body must be a JSON object with a \"question\" field."
    );
    assert!(!message.contains("line 1"));

    let wrong_type = client
        .post(format!("{}/api/ask", base))
        .body(r#"{"question":"fever"}"#)
        .send()
        .await
        .expect("ask response");
    assert_eq!(wrong_type.status(), StatusCode::BAD_REQUEST);
    let body: serde_json::Value = wrong_type.json().await.expect("error json");
    assert!(body["error"].is_string());

    handle.abort();
}
