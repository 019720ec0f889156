//! HTTP surface: the inquiry endpoint and a health check.

use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::{Query, State};
use axum::http::{Uri, header};
use axum::response::{IntoResponse, Response};
use axum::routing::{any, get};
use axum::{Json, Router};
use tower_http::trace::TraceLayer;

use crate::handler::{InquiryHandler, InquiryParams, InquiryRequest};

/// Path of the inquiry endpoint.
pub const INQUIRY_PATH: &str = "/api/inquiries";

/// Shared state for the inquiry routes.
#[derive(Clone)]
pub struct AppState {
    pub handler: Arc<InquiryHandler>,
}

/// Build the Axum router.
pub fn inquiry_routes(handler: Arc<InquiryHandler>) -> Router {
    Router::new()
        .route("/health", get(health))
        .route(INQUIRY_PATH, any(create_inquiry))
        .layer(TraceLayer::new_for_http())
        .with_state(AppState { handler })
}

async fn health() -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "ok",
        "service": "inquiry-sentiment"
    }))
}

/// Any method. `message` / `customerEmail` come from the query string,
/// falling back to a JSON body. Fields are read independently; an
/// unparseable source or a non-string field counts as absent.
async fn create_inquiry(State(state): State<AppState>, uri: Uri, body: Bytes) -> Response {
    let pairs = Query::<Vec<(String, String)>>::try_from_uri(&uri)
        .map(|Query(pairs)| pairs)
        .unwrap_or_default();
    let query = InquiryParams::from_pairs(&pairs);
    let body = Some(InquiryParams::from_json(&body));

    match state.handler.handle(InquiryRequest::resolve(query, body)).await {
        Ok(html) => ([(header::CONTENT_TYPE, "text/html; charset=UTF-8")], html).into_response(),
        Err(e) => e.into_response(),
    }
}
