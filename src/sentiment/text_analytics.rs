//! Text Analytics v3.1 sentiment client.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::StatusCode;
use secrecy::{ExposeSecret, SecretString};
use serde::Serialize;
use tracing::debug;

use super::{DOCUMENT_ID, DOCUMENT_LANGUAGE, SentimentClassifier, SentimentResult};
use crate::config::TextAnalyticsConfig;
use crate::error::ClassificationError;

const SENTIMENT_PATH: &str = "/text/analytics/v3.1/sentiment";
const SUBSCRIPTION_KEY_HEADER: &str = "Ocp-Apim-Subscription-Key";

#[derive(Debug, Serialize)]
struct SentimentRequest<'a> {
    documents: [TextDocument<'a>; 1],
}

#[derive(Debug, Serialize)]
struct TextDocument<'a> {
    id: &'a str,
    language: &'a str,
    text: &'a str,
}

/// Calls the sentiment endpoint of a cognitive services resource.
pub struct TextAnalyticsClient {
    url: String,
    api_key: SecretString,
    client: reqwest::Client,
}

impl TextAnalyticsClient {
    pub fn new(config: &TextAnalyticsConfig) -> Self {
        Self::with_client(config, reqwest::Client::new())
    }

    pub fn with_client(config: &TextAnalyticsConfig, client: reqwest::Client) -> Self {
        Self {
            url: format!("{}{SENTIMENT_PATH}", config.endpoint.trim_end_matches('/')),
            api_key: config.api_key.clone(),
            client,
        }
    }

    /// Fully-qualified sentiment URL.
    pub fn url(&self) -> &str {
        &self.url
    }
}

#[async_trait]
impl SentimentClassifier for TextAnalyticsClient {
    async fn classify(&self, text: &str) -> Result<SentimentResult, ClassificationError> {
        let body = SentimentRequest {
            documents: [TextDocument {
                id: DOCUMENT_ID,
                language: DOCUMENT_LANGUAGE,
                text,
            }],
        };

        let resp = self
            .client
            .post(&self.url)
            .header(SUBSCRIPTION_KEY_HEADER, self.api_key.expose_secret())
            .json(&body)
            .send()
            .await
            .map_err(|e| ClassificationError::Network(e.to_string()))?;

        let status = resp.status();
        debug!(status = status.as_u16(), "Sentiment service responded");

        if !status.is_success() {
            return Err(status_error(status, resp).await);
        }

        let result: SentimentResult = resp
            .json()
            .await
            .map_err(|e| ClassificationError::MalformedResponse(e.to_string()))?;

        if result.document().is_none() {
            let reason = match result.errors.first() {
                Some(doc_error) => format!("document {} rejected: {}", doc_error.id, doc_error.error),
                None => "response contained no documents".to_string(),
            };
            return Err(ClassificationError::MalformedResponse(reason));
        }

        Ok(result)
    }
}

async fn status_error(status: StatusCode, resp: reqwest::Response) -> ClassificationError {
    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => ClassificationError::Auth {
            status: status.as_u16(),
        },
        StatusCode::TOO_MANY_REQUESTS => ClassificationError::RateLimited {
            retry_after: resp
                .headers()
                .get(reqwest::header::RETRY_AFTER)
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.trim().parse::<u64>().ok())
                .map(Duration::from_secs),
        },
        _ => ClassificationError::Service {
            status: status.as_u16(),
            message: resp.text().await.unwrap_or_default(),
        },
    }
}
