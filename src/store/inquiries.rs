//! Inquiry persistence: record shape, partition date, schema provisioning.

use std::sync::Arc;

use chrono::{Local, NaiveDate};
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

use crate::config::StoreConfig;
use crate::error::DatabaseError;
use crate::sentiment::{ConfidenceScores, Sentiment, SentimentResult};
use crate::store::traits::{ContainerProperties, DocumentStore, PartitionKeyDefinition};

/// Partition key path of the inquiry container.
pub const PARTITION_KEY_PATH: &str = "/inquiryDate";

/// One persisted customer inquiry. Written once, never updated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InquiryRecord {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub customer_email: Option<String>,
    pub message: String,
    /// `YYYY-MM-DD`, local calendar date at persistence.
    pub inquiry_date: String,
    pub sentiment: Sentiment,
    pub confidence_scores: ConfidenceScores,
}

/// Partition value for `date`.
pub fn inquiry_date(date: NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}

/// Writes inquiries into one container of a [`DocumentStore`].
pub struct InquiryStore {
    store: Arc<dyn DocumentStore>,
    database_id: String,
    container: ContainerProperties,
}

impl InquiryStore {
    pub fn new(store: Arc<dyn DocumentStore>, config: &StoreConfig) -> Self {
        Self {
            store,
            database_id: config.database_id.clone(),
            container: ContainerProperties {
                id: config.container_id.clone(),
                partition_key: PartitionKeyDefinition::hash(PARTITION_KEY_PATH),
                throughput: config.throughput,
            },
        }
    }

    pub fn database_id(&self) -> &str {
        &self.database_id
    }

    pub fn container_id(&self) -> &str {
        &self.container.id
    }

    /// Create the database and container if they are absent.
    pub async fn ensure_schema(&self) -> Result<(), DatabaseError> {
        let database = self
            .store
            .create_database_if_not_exists(&self.database_id)
            .await?;
        let container = self
            .store
            .create_container_if_not_exists(&self.database_id, &self.container)
            .await?;
        tracing::debug!(?database, ?container, "Inquiry schema ensured");
        Ok(())
    }

    /// Persist one classified inquiry dated today (local time).
    pub async fn save(
        &self,
        message: &str,
        result: &SentimentResult,
        customer_email: Option<&str>,
    ) -> Result<InquiryRecord, DatabaseError> {
        self.save_on(Local::now().date_naive(), message, result, customer_email)
            .await
    }

    /// Persist one classified inquiry under an explicit date.
    pub async fn save_on(
        &self,
        date: NaiveDate,
        message: &str,
        result: &SentimentResult,
        customer_email: Option<&str>,
    ) -> Result<InquiryRecord, DatabaseError> {
        let document = result.document().ok_or_else(|| {
            DatabaseError::InvalidItem("sentiment result contains no document".into())
        })?;

        let record = InquiryRecord {
            id: Uuid::new_v4().to_string(),
            customer_email: customer_email.map(str::to_string),
            message: message.to_string(),
            inquiry_date: inquiry_date(date),
            sentiment: document.sentiment.clone(),
            confidence_scores: document.confidence_scores,
        };

        self.ensure_schema().await?;

        let item = serde_json::to_value(&record)
            .map_err(|e| DatabaseError::Serialization(e.to_string()))?;
        let receipt = self
            .store
            .create_item(&self.database_id, &self.container.id, &item)
            .await?;

        info!(
            id = %receipt.id,
            inquiry_date = %receipt.partition_key,
            sentiment = %record.sentiment,
            "Inquiry stored"
        );
        Ok(record)
    }

    /// All inquiries recorded on `date`.
    pub async fn list_on(&self, date: NaiveDate) -> Result<Vec<InquiryRecord>, DatabaseError> {
        self.store
            .read_items(&self.database_id, &self.container.id, &inquiry_date(date))
            .await?
            .into_iter()
            .map(|item| {
                serde_json::from_value(item)
                    .map_err(|e| DatabaseError::Serialization(format!("inquiry record: {e}")))
            })
            .collect()
    }
}
