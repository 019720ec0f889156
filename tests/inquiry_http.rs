//! Integration tests for the inquiry HTTP endpoint.
//!
//! Each test spins up a fake text-analytics server and the inquiry
//! service on random ports, then exercises the real HTTP contract.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::post;
use axum::{Json, Router};
use chrono::Local;
use secrecy::SecretString;
use serde_json::{Value, json};
use tokio::net::TcpListener;
use tokio::time::timeout;

use inquiry_sentiment::config::{StoreConfig, TextAnalyticsConfig};
use inquiry_sentiment::error::{
    CLASSIFICATION_FAILED_BODY, DatabaseError, MISSING_MESSAGE_BODY, PERSISTENCE_FAILED_BODY,
};
use inquiry_sentiment::handler::InquiryHandler;
use inquiry_sentiment::routes::{INQUIRY_PATH, inquiry_routes};
use inquiry_sentiment::sentiment::TextAnalyticsClient;
use inquiry_sentiment::store::{
    ContainerProperties, DocumentStore, InquiryStore, ItemReceipt, LibSqlBackend, Provisioned,
};

/// Maximum time any test is allowed to run before we consider it hung.
const TEST_TIMEOUT: Duration = Duration::from_secs(5);

/// What the fake sentiment service answers.
#[derive(Clone)]
enum FakeReply {
    Sentiment {
        label: &'static str,
        scores: (f64, f64, f64),
    },
    Status(StatusCode),
}

#[derive(Clone)]
struct FakeState {
    reply: FakeReply,
    calls: Arc<Mutex<Vec<(HeaderMap, Value)>>>,
}

async fn fake_sentiment(
    State(state): State<FakeState>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    state.calls.lock().unwrap().push((headers, body));
    match state.reply {
        FakeReply::Sentiment { label, scores } => Json(json!({
            "documents": [{
                "id": "1",
                "sentiment": label,
                "confidenceScores": {
                    "positive": scores.0,
                    "neutral": scores.1,
                    "negative": scores.2
                },
                "sentences": [],
                "warnings": []
            }],
            "errors": [],
            "modelVersion": "2022-11-01"
        }))
        .into_response(),
        FakeReply::Status(status) => (status, "fake failure").into_response(),
    }
}

struct Harness {
    base: String,
    store: Arc<InquiryStore>,
    calls: Arc<Mutex<Vec<(HeaderMap, Value)>>>,
}

impl Harness {
    fn url(&self) -> String {
        format!("{}{INQUIRY_PATH}", self.base)
    }

    fn sentiment_calls(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    async fn stored_today(&self) -> usize {
        self.store.ensure_schema().await.unwrap();
        self.store
            .list_on(Local::now().date_naive())
            .await
            .unwrap()
            .len()
    }
}

async fn serve(app: Router) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://127.0.0.1:{port}")
}

/// Store whose item writes always fail; provisioning succeeds.
struct BrokenStore;

#[async_trait]
impl DocumentStore for BrokenStore {
    async fn create_database_if_not_exists(&self, _id: &str) -> Result<Provisioned, DatabaseError> {
        Ok(Provisioned::Existing)
    }

    async fn create_container_if_not_exists(
        &self,
        _database_id: &str,
        _container: &ContainerProperties,
    ) -> Result<Provisioned, DatabaseError> {
        Ok(Provisioned::Existing)
    }

    async fn create_item(
        &self,
        _database_id: &str,
        _container_id: &str,
        _item: &Value,
    ) -> Result<ItemReceipt, DatabaseError> {
        Err(DatabaseError::Pool("store unreachable".into()))
    }

    async fn read_items(
        &self,
        _database_id: &str,
        _container_id: &str,
        _partition_key: &str,
    ) -> Result<Vec<Value>, DatabaseError> {
        Ok(vec![])
    }
}

/// Start the fake sentiment service and the inquiry service.
async fn start(reply: FakeReply) -> Harness {
    let backend = Arc::new(LibSqlBackend::new_memory().await.unwrap());
    start_with(reply, backend).await
}

async fn start_fake(reply: FakeReply) -> (String, Arc<Mutex<Vec<(HeaderMap, Value)>>>) {
    let calls = Arc::new(Mutex::new(Vec::new()));
    let fake = Router::new()
        .route("/text/analytics/v3.1/sentiment", post(fake_sentiment))
        .with_state(FakeState {
            reply,
            calls: Arc::clone(&calls),
        });
    (serve(fake).await, calls)
}

async fn start_with(reply: FakeReply, backend: Arc<dyn DocumentStore>) -> Harness {
    let (endpoint, calls) = start_fake(reply).await;
    start_service(endpoint, backend, calls).await
}

/// Start the inquiry service against an arbitrary sentiment endpoint.
async fn start_service(
    endpoint: String,
    backend: Arc<dyn DocumentStore>,
    calls: Arc<Mutex<Vec<(HeaderMap, Value)>>>,
) -> Harness {
    let classifier = Arc::new(TextAnalyticsClient::new(&TextAnalyticsConfig {
        endpoint,
        api_key: SecretString::from("integration-key"),
    }));
    let store = Arc::new(InquiryStore::new(backend, &StoreConfig::default()));
    let handler = Arc::new(InquiryHandler::new(classifier, Arc::clone(&store)));
    let base = serve(inquiry_routes(handler)).await;

    // Give the servers a moment to start accepting connections.
    tokio::time::sleep(Duration::from_millis(50)).await;

    Harness { base, store, calls }
}

fn positive() -> FakeReply {
    FakeReply::Sentiment {
        label: "positive",
        scores: (0.95, 0.04, 0.01),
    }
}

// ── Success ──────────────────────────────────────────────────────────

#[tokio::test]
async fn positive_inquiry_via_query() {
    timeout(TEST_TIMEOUT, async {
        let h = start(positive()).await;

        let resp = reqwest::Client::new()
            .get(h.url())
            .query(&[("message", "Das war super!")])
            .send()
            .await
            .unwrap();

        assert_eq!(resp.status(), 200);
        assert_eq!(resp.headers()["content-type"], "text/html; charset=UTF-8");
        let html = resp.text().await.unwrap();
        assert!(html.contains("Das war super!"));
        assert!(html.contains("Freundlich"));
        assert!(html.contains("95 % "));
        assert!(html.contains("4 % "));
        assert!(html.contains("1 % "));

        assert_eq!(h.sentiment_calls(), 1);
        assert_eq!(h.stored_today().await, 1);
    })
    .await
    .expect("test timed out");
}

#[tokio::test]
async fn outbound_request_carries_german_document_and_key() {
    timeout(TEST_TIMEOUT, async {
        let h = start(positive()).await;

        reqwest::Client::new()
            .post(h.url())
            .json(&json!({"message": "Guten Tag"}))
            .send()
            .await
            .unwrap();

        let calls = h.calls.lock().unwrap();
        assert_eq!(calls.len(), 1);
        let (headers, body) = &calls[0];
        assert_eq!(headers["ocp-apim-subscription-key"], "integration-key");
        assert_eq!(
            body,
            &json!({"documents": [{"id": "1", "language": "de", "text": "Guten Tag"}]})
        );
    })
    .await
    .expect("test timed out");
}

#[tokio::test]
async fn body_message_and_email_are_recorded() {
    timeout(TEST_TIMEOUT, async {
        let h = start(FakeReply::Sentiment {
            label: "negative",
            scores: (0.02, 0.08, 0.9),
        })
        .await;

        let resp = reqwest::Client::new()
            .post(h.url())
            .json(&json!({"message": "Die Lieferung kam zu spät", "customerEmail": "kunde@example.de"}))
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), 200);
        assert!(resp.text().await.unwrap().contains("Verärgert"));

        let records = h.store.list_on(Local::now().date_naive()).await.unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].message, "Die Lieferung kam zu spät");
        assert_eq!(records[0].customer_email.as_deref(), Some("kunde@example.de"));
        assert_eq!(records[0].confidence_scores.negative, 0.9);
    })
    .await
    .expect("test timed out");
}

#[tokio::test]
async fn mixed_sentiment_shows_neutral_banner() {
    timeout(TEST_TIMEOUT, async {
        let h = start(FakeReply::Sentiment {
            label: "mixed",
            scores: (0.45, 0.1, 0.45),
        })
        .await;

        let resp = reqwest::Client::new()
            .get(h.url())
            .query(&[("message", "Es war okay")])
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), 200);
        let html = resp.text().await.unwrap();
        assert!(html.contains("<span>Neutral</span>"));
        assert!(!html.contains("Freundlich"));
        assert!(!html.contains("Verärgert"));
    })
    .await
    .expect("test timed out");
}

#[tokio::test]
async fn non_string_email_does_not_hide_message() {
    timeout(TEST_TIMEOUT, async {
        let h = start(positive()).await;

        let resp = reqwest::Client::new()
            .post(h.url())
            .json(&json!({"message": "Hallo", "customerEmail": 42}))
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), 200);

        let records = h.store.list_on(Local::now().date_naive()).await.unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].message, "Hallo");
        assert_eq!(records[0].customer_email, None);
    })
    .await
    .expect("test timed out");
}

#[tokio::test]
async fn repeated_query_keys_use_first_value() {
    timeout(TEST_TIMEOUT, async {
        let h = start(positive()).await;

        let resp = reqwest::Client::new()
            .get(h.url())
            .query(&[
                ("message", "Hallo"),
                ("message", "Hi"),
                ("customerEmail", "erste@example.de"),
                ("customerEmail", "zweite@example.de"),
            ])
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), 200);
        assert!(resp.text().await.unwrap().contains("Hallo"));

        let records = h.store.list_on(Local::now().date_naive()).await.unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].message, "Hallo");
        assert_eq!(records[0].customer_email.as_deref(), Some("erste@example.de"));

        let calls = h.calls.lock().unwrap();
        assert_eq!(calls[0].1["documents"][0]["text"], "Hallo");
    })
    .await
    .expect("test timed out");
}

// ── Validation ───────────────────────────────────────────────────────

#[tokio::test]
async fn empty_message_is_rejected_without_calls() {
    timeout(TEST_TIMEOUT, async {
        let h = start(positive()).await;
        let client = reqwest::Client::new();

        for resp in [
            client.get(h.url()).query(&[("message", "")]).send().await.unwrap(),
            client.get(h.url()).send().await.unwrap(),
            client
                .post(h.url())
                .json(&json!({"message": ""}))
                .send()
                .await
                .unwrap(),
            client.post(h.url()).body("not json").send().await.unwrap(),
        ] {
            assert_eq!(resp.status(), 400);
            assert_eq!(resp.text().await.unwrap(), MISSING_MESSAGE_BODY);
        }

        assert_eq!(h.sentiment_calls(), 0);
        assert_eq!(h.stored_today().await, 0);
    })
    .await
    .expect("test timed out");
}

// ── Classification failure ───────────────────────────────────────────

#[tokio::test]
async fn classifier_error_returns_500_and_stores_nothing() {
    timeout(TEST_TIMEOUT, async {
        for status in [
            StatusCode::UNAUTHORIZED,
            StatusCode::TOO_MANY_REQUESTS,
            StatusCode::INTERNAL_SERVER_ERROR,
        ] {
            let h = start(FakeReply::Status(status)).await;

            let resp = reqwest::Client::new()
                .get(h.url())
                .query(&[("message", "Hallo")])
                .send()
                .await
                .unwrap();

            assert_eq!(resp.status(), 500);
            assert_eq!(resp.text().await.unwrap(), CLASSIFICATION_FAILED_BODY);
            assert_eq!(h.sentiment_calls(), 1);
            assert_eq!(h.stored_today().await, 0);
        }
    })
    .await
    .expect("test timed out");
}

#[tokio::test]
async fn unreachable_classifier_returns_500() {
    timeout(TEST_TIMEOUT, async {
        // Reserve a port, then release it so nothing is listening there.
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        drop(listener);

        let backend = Arc::new(LibSqlBackend::new_memory().await.unwrap());
        let h = start_service(
            format!("http://127.0.0.1:{port}"),
            backend,
            Arc::new(Mutex::new(Vec::new())),
        )
        .await;

        let resp = reqwest::Client::new()
            .get(h.url())
            .query(&[("message", "Hallo")])
            .send()
            .await
            .unwrap();

        assert_eq!(resp.status(), 500);
        assert_eq!(resp.headers()["content-type"], "text/plain; charset=UTF-8");
        assert_eq!(resp.text().await.unwrap(), CLASSIFICATION_FAILED_BODY);
        assert_eq!(h.stored_today().await, 0);
    })
    .await
    .expect("test timed out");
}

// ── Persistence failure ──────────────────────────────────────────────

#[tokio::test]
async fn store_failure_returns_503() {
    timeout(TEST_TIMEOUT, async {
        let h = start_with(positive(), Arc::new(BrokenStore)).await;

        let resp = reqwest::Client::new()
            .get(h.url())
            .query(&[("message", "Das war super!")])
            .send()
            .await
            .unwrap();

        assert_eq!(resp.status(), 503);
        assert_eq!(resp.headers()["content-type"], "text/plain; charset=UTF-8");
        assert_eq!(resp.text().await.unwrap(), PERSISTENCE_FAILED_BODY);
        assert_eq!(h.sentiment_calls(), 1);
    })
    .await
    .expect("test timed out");
}

// ── Health ───────────────────────────────────────────────────────────

#[tokio::test]
async fn health_endpoint() {
    timeout(TEST_TIMEOUT, async {
        let h = start(positive()).await;
        let resp = reqwest::get(format!("{}/health", h.base)).await.unwrap();
        assert_eq!(resp.status(), 200);
        let json: Value = resp.json().await.unwrap();
        assert_eq!(json["status"], "ok");
    })
    .await
    .expect("test timed out");
}
