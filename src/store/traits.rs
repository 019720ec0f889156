//! `DocumentStore` trait — async interface for JSON document persistence.
//!
//! Databases hold containers; containers hold JSON items routed by a hash
//! partition key. Both create operations are create-if-absent so callers
//! can re-assert the schema before every write.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::DatabaseError;

/// Partitioning scheme of a container.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PartitionKind {
    Hash,
}

impl PartitionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            PartitionKind::Hash => "Hash",
        }
    }
}

impl std::str::FromStr for PartitionKind {
    type Err = DatabaseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Hash" => Ok(PartitionKind::Hash),
            other => Err(DatabaseError::Serialization(format!(
                "unknown partition kind: {other}"
            ))),
        }
    }
}

/// Partition key definition. The first path is the routing key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PartitionKeyDefinition {
    pub kind: PartitionKind,
    pub paths: Vec<String>,
}

impl PartitionKeyDefinition {
    pub fn hash(path: &str) -> Self {
        Self {
            kind: PartitionKind::Hash,
            paths: vec![path.to_string()],
        }
    }

    /// JSON pointer used to read the partition value from an item.
    pub fn path(&self) -> Option<&str> {
        self.paths.first().map(String::as_str)
    }
}

/// Container schema: id, partition key, provisioned throughput.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContainerProperties {
    pub id: String,
    pub partition_key: PartitionKeyDefinition,
    pub throughput: u32,
}

/// Outcome of a create-if-absent call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Provisioned {
    Created,
    Existing,
}

/// Identity of a newly written item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ItemReceipt {
    pub id: String,
    pub partition_key: String,
}

/// Backend-agnostic document store.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Create a database unless one with this id exists.
    async fn create_database_if_not_exists(&self, id: &str) -> Result<Provisioned, DatabaseError>;

    /// Create a container unless one with this id exists in the database.
    ///
    /// An existing container keeps its original definition.
    async fn create_container_if_not_exists(
        &self,
        database_id: &str,
        container: &ContainerProperties,
    ) -> Result<Provisioned, DatabaseError>;

    /// Insert one JSON object. Items without an `id` get a generated one.
    async fn create_item(
        &self,
        database_id: &str,
        container_id: &str,
        item: &serde_json::Value,
    ) -> Result<ItemReceipt, DatabaseError>;

    /// All items of one partition, oldest first.
    async fn read_items(
        &self,
        database_id: &str,
        container_id: &str,
        partition_key: &str,
    ) -> Result<Vec<serde_json::Value>, DatabaseError>;
}
