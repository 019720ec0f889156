//! Inquiry handler — validate, classify, persist, render.

use std::sync::Arc;

use serde_json::Value;
use tracing::info;

use crate::error::InquiryError;
use crate::render::render;
use crate::sentiment::SentimentClassifier;
use crate::store::InquiryStore;

const MESSAGE_FIELD: &str = "message";
const CUSTOMER_EMAIL_FIELD: &str = "customerEmail";

/// Inquiry fields as they arrive in a query string or JSON body.
///
/// Each field is read on its own, so a malformed neighbour never hides it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InquiryParams {
    pub message: Option<String>,
    pub customer_email: Option<String>,
}

impl InquiryParams {
    /// From decoded query pairs. The first occurrence of a key wins.
    pub fn from_pairs(pairs: &[(String, String)]) -> Self {
        let first = |key: &str| {
            pairs
                .iter()
                .find(|(k, _)| k == key)
                .map(|(_, v)| v.clone())
        };
        Self {
            message: first(MESSAGE_FIELD),
            customer_email: first(CUSTOMER_EMAIL_FIELD),
        }
    }

    /// From a raw JSON body. Non-object bodies and non-string fields
    /// count as absent.
    pub fn from_json(body: &[u8]) -> Self {
        let Ok(value) = serde_json::from_slice::<Value>(body) else {
            return Self::default();
        };
        let field = |key: &str| value.get(key).and_then(Value::as_str).map(str::to_string);
        Self {
            message: field(MESSAGE_FIELD),
            customer_email: field(CUSTOMER_EMAIL_FIELD),
        }
    }
}

/// A resolved inbound inquiry.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InquiryRequest {
    pub message: Option<String>,
    pub customer_email: Option<String>,
}

impl InquiryRequest {
    /// Query values win; empty values fall back to the body.
    pub fn resolve(query: InquiryParams, body: Option<InquiryParams>) -> Self {
        let body = body.unwrap_or_default();
        Self {
            message: first_present(query.message, body.message),
            customer_email: first_present(query.customer_email, body.customer_email),
        }
    }
}

fn first_present(primary: Option<String>, fallback: Option<String>) -> Option<String> {
    primary
        .filter(|v| !v.is_empty())
        .or_else(|| fallback.filter(|v| !v.is_empty()))
}

/// Orchestrates one inquiry request.
pub struct InquiryHandler {
    classifier: Arc<dyn SentimentClassifier>,
    store: Arc<InquiryStore>,
}

impl InquiryHandler {
    pub fn new(classifier: Arc<dyn SentimentClassifier>, store: Arc<InquiryStore>) -> Self {
        Self { classifier, store }
    }

    /// Handle one request, returning the rendered HTML page.
    ///
    /// A record is written only after a successful classification.
    pub async fn handle(&self, request: InquiryRequest) -> Result<String, InquiryError> {
        let Some(message) = request.message else {
            return Err(InquiryError::MissingMessage);
        };

        let result = self.classifier.classify(&message).await?;

        let record = self
            .store
            .save(&message, &result, request.customer_email.as_deref())
            .await?;
        info!(id = %record.id, sentiment = %record.sentiment, "Inquiry processed");

        Ok(render(&message, &result))
    }
}
