//! Sentiment classification.
//!
//! `SentimentClassifier` is the seam the handler depends on;
//! `TextAnalyticsClient` implements it against the Text Analytics v3.1
//! REST contract.

pub mod text_analytics;

pub use text_analytics::TextAnalyticsClient;

use std::fmt;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::ClassificationError;

/// Language tag sent with every document.
pub const DOCUMENT_LANGUAGE: &str = "de";

/// Id of the single document in every request.
pub const DOCUMENT_ID: &str = "1";

/// Classifies the sentiment of a single text.
#[async_trait]
pub trait SentimentClassifier: Send + Sync {
    /// Issue one classification call. No retries.
    async fn classify(&self, text: &str) -> Result<SentimentResult, ClassificationError>;
}

/// Sentiment label assigned to a document.
///
/// Labels the service may add later are kept verbatim in `Other`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Sentiment {
    Positive,
    Neutral,
    Mixed,
    Negative,
    Other(String),
}

impl Sentiment {
    pub fn as_str(&self) -> &str {
        match self {
            Sentiment::Positive => "positive",
            Sentiment::Neutral => "neutral",
            Sentiment::Mixed => "mixed",
            Sentiment::Negative => "negative",
            Sentiment::Other(label) => label,
        }
    }
}

impl From<String> for Sentiment {
    fn from(label: String) -> Self {
        match label.as_str() {
            "positive" => Sentiment::Positive,
            "neutral" => Sentiment::Neutral,
            "mixed" => Sentiment::Mixed,
            "negative" => Sentiment::Negative,
            _ => Sentiment::Other(label),
        }
    }
}

impl From<Sentiment> for String {
    fn from(sentiment: Sentiment) -> Self {
        match sentiment {
            Sentiment::Other(label) => label,
            known => known.as_str().to_string(),
        }
    }
}

impl fmt::Display for Sentiment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Per-label confidence, each in `[0, 1]`. The scores are independent.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ConfidenceScores {
    pub positive: f64,
    pub neutral: f64,
    pub negative: f64,
}

/// Classification of one input document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentSentiment {
    pub id: String,
    pub sentiment: Sentiment,
    pub confidence_scores: ConfidenceScores,
}

/// Per-document error reported by the service inside a 200 response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentError {
    pub id: String,
    pub error: serde_json::Value,
}

/// Response payload of a sentiment request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SentimentResult {
    pub documents: Vec<DocumentSentiment>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<DocumentError>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model_version: Option<String>,
}

impl SentimentResult {
    /// The classified document. Requests carry exactly one.
    pub fn document(&self) -> Option<&DocumentSentiment> {
        self.documents.first()
    }
}
