//! libSQL backend — async `DocumentStore` implementation.
//!
//! Databases, containers and items live in three tables of one libSQL
//! database. Supports local file, in-memory and remote databases.

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use libsql::{Connection, Database as LibSqlDatabase, params};
use secrecy::ExposeSecret;
use serde_json::Value;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::config::StoreConfig;
use crate::error::DatabaseError;
use crate::store::migrations;
use crate::store::traits::{
    ContainerProperties, DocumentStore, ItemReceipt, PartitionKeyDefinition, Provisioned,
};

/// libSQL document store.
///
/// Stores a single connection that is reused for all operations.
/// `libsql::Connection` is `Send + Sync` and safe for concurrent async use.
pub struct LibSqlBackend {
    #[allow(dead_code)]
    db: Arc<LibSqlDatabase>,
    conn: Connection,
}

impl LibSqlBackend {
    /// Open the store described by `config`.
    pub async fn connect(config: &StoreConfig) -> Result<Self, DatabaseError> {
        if config.is_remote() {
            let token = config
                .auth_token
                .as_ref()
                .map(|t| t.expose_secret().to_string())
                .unwrap_or_default();
            Self::new_remote(&config.url, token).await
        } else if config.url == ":memory:" {
            Self::new_memory().await
        } else {
            Self::new_local(Path::new(&config.url)).await
        }
    }

    /// Open (or create) a local database file and run migrations.
    pub async fn new_local(path: &Path) -> Result<Self, DatabaseError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                DatabaseError::Pool(format!("Failed to create database directory: {e}"))
            })?;
        }

        let db = libsql::Builder::new_local(path)
            .build()
            .await
            .map_err(|e| DatabaseError::Pool(format!("Failed to open libSQL database: {e}")))?;

        let backend = Self::from_database(db).await?;
        info!(path = %path.display(), "Document store opened");
        Ok(backend)
    }

    /// Connect to a remote libSQL server.
    pub async fn new_remote(url: &str, auth_token: String) -> Result<Self, DatabaseError> {
        let db = libsql::Builder::new_remote(url.to_string(), auth_token)
            .build()
            .await
            .map_err(|e| DatabaseError::Pool(format!("Failed to connect to {url}: {e}")))?;

        let backend = Self::from_database(db).await?;
        info!(url = url, "Remote document store connected");
        Ok(backend)
    }

    /// Create an in-memory database (for tests).
    pub async fn new_memory() -> Result<Self, DatabaseError> {
        let db = libsql::Builder::new_local(":memory:")
            .build()
            .await
            .map_err(|e| {
                DatabaseError::Pool(format!("Failed to create in-memory database: {e}"))
            })?;

        Self::from_database(db).await
    }

    async fn from_database(db: LibSqlDatabase) -> Result<Self, DatabaseError> {
        let conn = db
            .connect()
            .map_err(|e| DatabaseError::Pool(format!("Failed to create connection: {e}")))?;

        migrations::run_migrations(&conn).await?;

        Ok(Self {
            db: Arc::new(db),
            conn,
        })
    }

    /// Get the connection.
    fn conn(&self) -> &Connection {
        &self.conn
    }

    async fn database_exists(&self, id: &str) -> Result<bool, DatabaseError> {
        let mut rows = self
            .conn()
            .query("SELECT 1 FROM databases WHERE id = ?1", params![id])
            .await
            .map_err(|e| DatabaseError::Query(format!("database_exists: {e}")))?;

        rows.next()
            .await
            .map(|row| row.is_some())
            .map_err(|e| DatabaseError::Query(format!("database_exists: {e}")))
    }

    async fn container_definition(
        &self,
        database_id: &str,
        container_id: &str,
    ) -> Result<Option<ContainerProperties>, DatabaseError> {
        let mut rows = self
            .conn()
            .query(
                "SELECT partition_key_kind, partition_key_paths, throughput
                 FROM containers WHERE database_id = ?1 AND id = ?2",
                params![database_id, container_id],
            )
            .await
            .map_err(|e| DatabaseError::Query(format!("container_definition: {e}")))?;

        let row = match rows.next().await {
            Ok(Some(row)) => row,
            Ok(None) => return Ok(None),
            Err(e) => return Err(DatabaseError::Query(format!("container_definition: {e}"))),
        };

        let kind: String = row
            .get(0)
            .map_err(|e| DatabaseError::Query(format!("container_definition: {e}")))?;
        let paths: String = row
            .get(1)
            .map_err(|e| DatabaseError::Query(format!("container_definition: {e}")))?;
        let throughput: i64 = row
            .get(2)
            .map_err(|e| DatabaseError::Query(format!("container_definition: {e}")))?;

        let throughput = u32::try_from(throughput).map_err(|e| {
            DatabaseError::Serialization(format!("container throughput {throughput}: {e}"))
        })?;
        let paths: Vec<String> = serde_json::from_str(&paths)
            .map_err(|e| DatabaseError::Serialization(format!("partition key paths: {e}")))?;

        Ok(Some(ContainerProperties {
            id: container_id.to_string(),
            partition_key: PartitionKeyDefinition {
                kind: kind.parse()?,
                paths,
            },
            throughput,
        }))
    }
}

// ── Helper functions ────────────────────────────────────────────────

/// Read the partition value of `item` at the JSON pointer `path`.
fn partition_value(item: &Value, path: &str) -> Result<String, DatabaseError> {
    match item.pointer(path) {
        Some(Value::String(s)) => Ok(s.clone()),
        Some(Value::Number(n)) => Ok(n.to_string()),
        Some(other) => Err(DatabaseError::InvalidItem(format!(
            "partition key {path} must be a string or number, got {other}"
        ))),
        None => Err(DatabaseError::InvalidItem(format!(
            "item has no value at partition key {path}"
        ))),
    }
}

fn is_unique_violation(e: &libsql::Error) -> bool {
    e.to_string().contains("UNIQUE constraint failed")
}

// ── DocumentStore impl ──────────────────────────────────────────────

#[async_trait]
impl DocumentStore for LibSqlBackend {
    async fn create_database_if_not_exists(&self, id: &str) -> Result<Provisioned, DatabaseError> {
        let inserted = self
            .conn()
            .execute(
                "INSERT OR IGNORE INTO databases (id, created_at) VALUES (?1, ?2)",
                params![id, Utc::now().to_rfc3339()],
            )
            .await
            .map_err(|e| DatabaseError::Query(format!("create_database: {e}")))?;

        if inserted > 0 {
            info!(database = id, "Created database");
            Ok(Provisioned::Created)
        } else {
            debug!(database = id, "Database already exists");
            Ok(Provisioned::Existing)
        }
    }

    async fn create_container_if_not_exists(
        &self,
        database_id: &str,
        container: &ContainerProperties,
    ) -> Result<Provisioned, DatabaseError> {
        if !self.database_exists(database_id).await? {
            return Err(DatabaseError::NotFound {
                entity: "database".into(),
                id: database_id.to_string(),
            });
        }
        if container.partition_key.path().is_none() {
            return Err(DatabaseError::InvalidItem(format!(
                "container {} has no partition key path",
                container.id
            )));
        }

        let paths = serde_json::to_string(&container.partition_key.paths)
            .map_err(|e| DatabaseError::Serialization(e.to_string()))?;

        let inserted = self
            .conn()
            .execute(
                "INSERT OR IGNORE INTO containers
                    (database_id, id, partition_key_kind, partition_key_paths, throughput, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                params![
                    database_id,
                    container.id.as_str(),
                    container.partition_key.kind.as_str(),
                    paths,
                    i64::from(container.throughput),
                    Utc::now().to_rfc3339(),
                ],
            )
            .await
            .map_err(|e| DatabaseError::Query(format!("create_container: {e}")))?;

        if inserted > 0 {
            info!(
                database = database_id,
                container = %container.id,
                throughput = container.throughput,
                "Created container"
            );
            return Ok(Provisioned::Created);
        }

        if let Some(existing) = self.container_definition(database_id, &container.id).await? {
            if existing.partition_key != container.partition_key {
                warn!(
                    database = database_id,
                    container = %container.id,
                    existing = ?existing.partition_key.paths,
                    requested = ?container.partition_key.paths,
                    "Container exists with a different partition key; keeping the existing one"
                );
            }
        }
        debug!(database = database_id, container = %container.id, "Container already exists");
        Ok(Provisioned::Existing)
    }

    async fn create_item(
        &self,
        database_id: &str,
        container_id: &str,
        item: &Value,
    ) -> Result<ItemReceipt, DatabaseError> {
        let Some(object) = item.as_object() else {
            return Err(DatabaseError::InvalidItem("item must be a JSON object".into()));
        };

        let container = self
            .container_definition(database_id, container_id)
            .await?
            .ok_or_else(|| DatabaseError::NotFound {
                entity: "container".into(),
                id: format!("{database_id}/{container_id}"),
            })?;
        let path = container.partition_key.path().unwrap_or("/id");
        let partition_key = partition_value(item, path)?;

        let mut body = object.clone();
        let id = match body.get("id") {
            Some(Value::String(id)) if !id.is_empty() => id.clone(),
            Some(other) => {
                return Err(DatabaseError::InvalidItem(format!(
                    "item id must be a non-empty string, got {other}"
                )));
            }
            None => {
                let id = Uuid::new_v4().to_string();
                body.insert("id".into(), Value::String(id.clone()));
                id
            }
        };

        let body = serde_json::to_string(&body)
            .map_err(|e| DatabaseError::Serialization(e.to_string()))?;

        self.conn()
            .execute(
                "INSERT INTO items (database_id, container_id, partition_key, id, body, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                params![
                    database_id,
                    container_id,
                    partition_key.as_str(),
                    id.as_str(),
                    body,
                    Utc::now().to_rfc3339(),
                ],
            )
            .await
            .map_err(|e| {
                if is_unique_violation(&e) {
                    DatabaseError::Constraint(format!(
                        "item {id} already exists in partition {partition_key}"
                    ))
                } else {
                    DatabaseError::Query(format!("create_item: {e}"))
                }
            })?;

        debug!(id = %id, partition = %partition_key, container = container_id, "Item created");
        Ok(ItemReceipt { id, partition_key })
    }

    async fn read_items(
        &self,
        database_id: &str,
        container_id: &str,
        partition_key: &str,
    ) -> Result<Vec<Value>, DatabaseError> {
        let mut rows = self
            .conn()
            .query(
                "SELECT body FROM items
                 WHERE database_id = ?1 AND container_id = ?2 AND partition_key = ?3
                 ORDER BY seq",
                params![database_id, container_id, partition_key],
            )
            .await
            .map_err(|e| DatabaseError::Query(format!("read_items: {e}")))?;

        let mut items = Vec::new();
        while let Some(row) = rows
            .next()
            .await
            .map_err(|e| DatabaseError::Query(format!("read_items: {e}")))?
        {
            let body: String = row
                .get(0)
                .map_err(|e| DatabaseError::Query(format!("read_items: {e}")))?;
            let value = serde_json::from_str(&body)
                .map_err(|e| DatabaseError::Serialization(format!("item body: {e}")))?;
            items.push(value);
        }
        Ok(items)
    }
}
