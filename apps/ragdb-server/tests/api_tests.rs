use std::sync::Arc;

use axum::body::{to_bytes, Body};
use axum::http::{header, Request, StatusCode};
use axum::Router;
use serde_json::Value;
use tower::ServiceExt;

use async_trait::async_trait;
use ragdb_core::config::ChatSettings;
use ragdb_core::traits::{Embedder, VectorStore};
use ragdb_core::types::{Chunk, SearchHit};
use ragdb_core::Settings;
use ragdb_embed::FakeEmbedder;
use ragdb_server::chat::{ChatResponse, EchoChat};
use ragdb_server::state::build_pipeline;
use ragdb_server::{router, AppState};
use ragdb_vector::{IndexError, LanceIndex};

const BOUNDARY: &str = "ragdb-test-boundary";

async fn app(tmp: &tempfile::TempDir) -> Router {
    let embedder: Arc<dyn Embedder> = Arc::new(FakeEmbedder::new(32));
    let index = LanceIndex::open(tmp.path(), "chunks", embedder).await.unwrap();
    app_with_store(Arc::new(index))
}

fn app_with_store(store: Arc<dyn VectorStore>) -> Router {
    let settings = Settings::default();
    let chat = EchoChat::new(&ChatSettings { token_delay_ms: 0, channel_capacity: 8 });
    let pipeline = build_pipeline(&settings).unwrap();
    router(Arc::new(AppState::new(settings, pipeline, store, Arc::new(chat))))
}

/// Store whose persisted index was built by a different model.
struct MismatchedStore;

#[async_trait]
impl VectorStore for MismatchedStore {
    async fn upsert(&self, _chunks: &[Chunk]) -> anyhow::Result<()> {
        Err(IndexError::DimensionMismatch { expected: 384, actual: 32 }.into())
    }

    async fn search(&self, _query: &str, _top_k: usize) -> anyhow::Result<Vec<SearchHit>> {
        Ok(Vec::new())
    }

    async fn count(&self) -> anyhow::Result<usize> {
        Ok(0)
    }
}

fn multipart(filename: &str, content: &str) -> Request<Body> {
    let body = format!(
        "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"file\"; filename=\"{filename}\"\r\n\
Content-Type: application/octet-stream\r\n\r\n{content}\r\n--{BOUNDARY}--\r\n"
    );
    Request::post("/upload")
        .header(header::CONTENT_TYPE, format!("multipart/form-data; boundary={BOUNDARY}"))
        .body(Body::from(body))
        .unwrap()
}

async fn json_body(resp: axum::response::Response) -> Value {
    let bytes = to_bytes(resp.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn upload_then_search_finds_the_chunk() {
    let tmp = tempfile::tempdir().unwrap();
    let app = app(&tmp).await;

    let resp = app.clone().oneshot(multipart("notes.txt", "lancedb keeps versions")).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let body = json_body(resp).await;
    assert_eq!(body["filename"], "notes.txt");
    assert_eq!(body["num_chunks_indexed"], 1);
    let chunk_id = body["first_chunk_id"].as_str().unwrap().to_string();

    let resp = app
        .clone()
        .oneshot(Request::get("/search?q=lancedb%20keeps%20versions&top_k=3").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let hits = json_body(resp).await;
    assert_eq!(hits[0]["chunk"]["chunk_id"], chunk_id.as_str());
    assert_eq!(hits[0]["chunk"]["type"], "txt");

    let health = json_body(app.oneshot(Request::get("/health").body(Body::empty()).unwrap()).await.unwrap()).await;
    assert_eq!(health["status"], "ok");
    assert_eq!(health["indexed_chunks"], 1);
}

#[tokio::test]
async fn unsupported_upload_is_415_naming_the_extension() {
    let tmp = tempfile::tempdir().unwrap();
    let resp = app(&tmp).await.oneshot(multipart("data.xyz", "whatever")).await.unwrap();
    assert_eq!(resp.status(), StatusCode::UNSUPPORTED_MEDIA_TYPE);
    let body = json_body(resp).await;
    assert!(body["error"].as_str().unwrap().contains(".xyz"));
}

#[tokio::test]
async fn upload_without_extension_says_none() {
    let tmp = tempfile::tempdir().unwrap();
    let resp = app(&tmp).await.oneshot(multipart("README", "plain words")).await.unwrap();
    assert_eq!(resp.status(), StatusCode::UNSUPPORTED_MEDIA_TYPE);
    let body = json_body(resp).await;
    assert_eq!(body["error"], "unsupported format: (none)");
    assert!(body["phase"].is_null());
}

#[tokio::test]
async fn index_failure_is_reported_in_the_indexing_phase() {
    let resp = app_with_store(Arc::new(MismatchedStore))
        .oneshot(multipart("notes.txt", "some words to index"))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let body = json_body(resp).await;
    assert_eq!(body["phase"], "indexing");
    assert!(body["error"].as_str().unwrap().contains("dimension mismatch"));
}

#[tokio::test]
async fn empty_upload_indexes_nothing() {
    let tmp = tempfile::tempdir().unwrap();
    let resp = app(&tmp).await.oneshot(multipart("blank.md", "   ")).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let body = json_body(resp).await;
    assert_eq!(body["num_chunks_indexed"], 0);
    assert!(body["first_chunk_id"].is_null());
}

#[tokio::test]
async fn broken_json_is_an_ingestion_failure() {
    let tmp = tempfile::tempdir().unwrap();
    let resp = app(&tmp).await.oneshot(multipart("bad.json", "{not json")).await.unwrap();
    assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(json_body(resp).await["phase"], "ingestion");
}

#[tokio::test]
async fn zero_top_k_is_rejected() {
    let tmp = tempfile::tempdir().unwrap();
    let resp = app(&tmp)
        .await
        .oneshot(Request::get("/search?q=x&top_k=0").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn chat_streams_ndjson_tokens_then_final_text() {
    let tmp = tempfile::tempdir().unwrap();
    let req = Request::post("/chat")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(r#"{"prompt":"hi","history":[],"model":"echo"}"#))
        .unwrap();
    let resp = app(&tmp).await.oneshot(req).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(resp.headers()[header::CONTENT_TYPE], "application/x-ndjson");

    let bytes = to_bytes(resp.into_body(), usize::MAX).await.unwrap();
    let records: Vec<ChatResponse> = std::str::from_utf8(&bytes)
        .unwrap()
        .lines()
        .map(|l| serde_json::from_str(l).unwrap())
        .collect();
    let (last, tokens) = records.split_last().unwrap();
    assert_eq!(tokens.iter().map(|r| r.token.as_str()).collect::<String>(), "Echo: hi");
    assert!(tokens.iter().all(|r| r.final_text.is_empty()));
    assert_eq!(last, &ChatResponse::finished("Echo: hi"));
}
