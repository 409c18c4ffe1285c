use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use search_core::{Corpus, Document, InvertedIndex, LemmaMap, SearchEngine, WeightKind};
use server::{router, ServerSettings};
use serde_json::Value;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use std::time::Duration;
use tower::ServiceExt;

fn tiny_engine() -> SearchEngine {
    let corpus = Corpus {
        documents: vec![
            Document::from_html(1, "<title>Doc 1</title><p>Rust is great. Rust systems programming.</p>".into()),
            Document::from_html(2, "<h1>Doc 2</h1><p>Learning rust and go.</p>".into()),
            Document::from_html(3, "<p>Gardening tips.</p>".into()),
        ],
        failed: 0,
    };
    let mut postings = BTreeMap::new();
    postings.insert("rust".to_string(), vec![1, 2]);
    postings.insert("go".to_string(), vec![2]);
    let index = InvertedIndex::from_postings(postings);

    // doc 1 leans harder on "rust" than doc 2
    let mut vectors = BTreeMap::new();
    vectors.insert(1, HashMap::from([("rust".to_string(), 0.8)]));
    vectors.insert(2, HashMap::from([("rust".to_string(), 0.3), ("go".to_string(), 0.6)]));
    vectors.insert(3, HashMap::from([("gardening".to_string(), 0.5)]));
    SearchEngine::new(corpus, index, LemmaMap::default(), vectors, WeightKind::Tokens)
}

fn app() -> Router { router(Arc::new(tiny_engine()), ServerSettings::default()) }

async fn call(app: Router, uri: &str) -> (StatusCode, Value) {
    let req = Request::get(uri).body(Body::empty()).unwrap();
    let resp = app.oneshot(req).await.unwrap();
    let status = resp.status();
    let body = resp.into_body().collect().await.unwrap().to_bytes();
    (status, serde_json::from_slice(&body).unwrap_or(Value::Null))
}

#[tokio::test]
async fn search_returns_ranked_results() {
    let (status, json) = call(app(), "/search?q=rust&k=2").await;
    assert_eq!(status, StatusCode::OK);
    let arr = json["results"].as_array().unwrap();
    assert_eq!(arr.len(), 2);
    assert_eq!(arr[0]["id"].as_u64().unwrap(), 1);
    assert_eq!(arr[1]["id"].as_u64().unwrap(), 2);
    assert_eq!(arr[0]["title"], "Doc 1");
    assert!(arr[0]["snippet"].as_str().unwrap().contains("Rust"));
    assert_eq!(json["total_hits"], 2);
}

#[tokio::test]
async fn empty_search_returns_no_results() {
    let (status, json) = call(app(), "/search?q=").await;
    assert_eq!(status, StatusCode::OK);
    assert!(json["results"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn boolean_query_returns_sorted_ids() {
    let (status, json) = call(app(), "/boolean?q=NOT%20go").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["ids"], serde_json::json!([1, 3]));
}

#[tokio::test]
async fn malformed_boolean_query_is_a_client_error() {
    let (status, json) = call(app(), "/boolean?q=%28rust%20OR%20go").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(json["error"].as_str().unwrap().contains("unclosed"));
}

#[tokio::test]
async fn doc_lookup() {
    let (status, json) = call(app(), "/doc/2").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["title"], "Doc 2");
    let (status, _) = call(app(), "/doc/99").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

fn large_engine() -> SearchEngine {
    let documents: Vec<Document> = (1..=5000)
        .map(|id| Document::from_html(id, format!("<p>rust page {id}. Some filler text about systems.</p>")))
        .collect();
    let ids: Vec<u32> = documents.iter().map(|d| d.id).collect();
    let mut postings = BTreeMap::new();
    postings.insert("rust".to_string(), ids.clone());
    postings.insert("systems".to_string(), ids.clone());
    let vectors = ids
        .iter()
        .map(|&id| (id, HashMap::from([("rust".to_string(), 0.1 + id as f64 * 1e-4), ("systems".to_string(), 0.2)])))
        .collect();
    SearchEngine::new(
        Corpus { documents, failed: 0 },
        InvertedIndex::from_postings(postings),
        LemmaMap::default(),
        vectors,
        WeightKind::Tokens,
    )
}

#[tokio::test]
async fn query_past_the_timeout_is_reported_as_gateway_timeout() {
    let settings = ServerSettings { query_timeout: Duration::ZERO, ..ServerSettings::default() };
    let app = router(Arc::new(large_engine()), settings);
    let (status, json) = call(app, "/search?q=rust%20systems&k=100").await;
    assert_eq!(status, StatusCode::GATEWAY_TIMEOUT);
    assert_eq!(json, serde_json::json!({ "error": "query timed out" }));
}
