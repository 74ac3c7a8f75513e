//! Document persistence.
//!
//! Entities are stored as JSON documents grouped in named collections. The
//! [`DocumentStore`] trait is the backend seam; two implementations exist:
//!
//! - `MemoryStore`: in-process storage using DashMap (default, used in tests)
//! - `PostgresStore`: one JSONB table keyed by `(collection, id)`
//!
//! Every operation is individually atomic. Conditional patches and upserts are
//! what the write paths rely on to avoid read-then-write races.
//!
//! Use `create_store()` to build the backend selected by configuration.

mod filter;
mod memory;
mod postgres;

use std::sync::Arc;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{Map, Value};
use thiserror::Error;

use crate::config::DatabaseConfig;

pub use filter::{Clause, Filter, Sort};
pub use memory::MemoryStore;
pub use postgres::PostgresStore;

/// Errors that can occur during store operations.
#[derive(Debug, Error)]
pub enum StoreError {
    /// A unique field (or the id) already exists in the collection
    #[error("Duplicate value for '{field}' in {collection}")]
    Duplicate { collection: String, field: String },

    /// PostgreSQL operation failed
    #[error("PostgreSQL error: {0}")]
    Postgres(#[from] sqlx::Error),

    /// Document could not be converted to or from its entity type
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Backend is not configured or not reachable
    #[error("Store unavailable: {0}")]
    Unavailable(String),
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Outcome of an upsert.
#[derive(Debug, Clone)]
pub struct Upserted<T> {
    pub document: T,
    /// `true` when the document did not exist before
    pub created: bool,
}

/// Backend seam for document collections.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Backend type identifier
    fn backend_name(&self) -> &'static str;

    /// Insert a new document. Fails with `Duplicate` if the id or any of the
    /// `unique` fields is already taken in the collection.
    async fn insert(
        &self,
        collection: &str,
        id: &str,
        doc: Value,
        unique: &[&str],
    ) -> StoreResult<()>;

    async fn find_by_id(&self, collection: &str, id: &str) -> StoreResult<Option<Value>>;

    async fn find_one(&self, collection: &str, filter: &Filter) -> StoreResult<Option<Value>>;

    async fn find(&self, collection: &str, filter: &Filter, sort: Sort) -> StoreResult<Vec<Value>>;

    /// Merge `patch` into the document only if it currently matches
    /// `condition`. Returns the updated document, or `None` when the document
    /// is missing or the condition did not hold. Fails with `Duplicate` if the
    /// merged document takes a `unique` value held by another document.
    async fn patch(
        &self,
        collection: &str,
        id: &str,
        condition: &Filter,
        patch: Map<String, Value>,
        unique: &[&str],
    ) -> StoreResult<Option<Value>>;

    /// Insert `doc` if no document has this id, otherwise merge `patch` into
    /// the existing one. Returns the resulting document and whether it was
    /// created.
    async fn upsert(
        &self,
        collection: &str,
        id: &str,
        doc: Value,
        patch: Map<String, Value>,
    ) -> StoreResult<Upserted<Value>>;

    /// Connectivity check
    async fn ping(&self) -> StoreResult<()>;
}

/// An entity persisted as a document.
pub trait Document: Serialize + DeserializeOwned + Send + Sync {
    /// Collection name
    const COLLECTION: &'static str;
    /// Fields whose values must be unique within the collection
    const UNIQUE_FIELDS: &'static [&'static str] = &[];
    /// Timestamp field used for "newest first" listings
    const RECENCY_FIELD: &'static str = "createdAt";

    fn id(&self) -> &str;
}

/// Typed access to a [`DocumentStore`].
#[derive(Clone)]
pub struct Store {
    backend: Arc<dyn DocumentStore>,
}

impl Store {
    pub fn new(backend: Arc<dyn DocumentStore>) -> Self {
        Self { backend }
    }

    pub fn backend(&self) -> &Arc<dyn DocumentStore> {
        &self.backend
    }

    pub async fn create<T: Document>(&self, doc: &T) -> StoreResult<()> {
        let value = serde_json::to_value(doc)?;
        self.backend
            .insert(T::COLLECTION, doc.id(), value, T::UNIQUE_FIELDS)
            .await
    }

    pub async fn get<T: Document>(&self, id: &str) -> StoreResult<Option<T>> {
        self.backend
            .find_by_id(T::COLLECTION, id)
            .await?
            .map(decode)
            .transpose()
    }

    pub async fn find_one<T: Document>(&self, filter: &Filter) -> StoreResult<Option<T>> {
        self.backend
            .find_one(T::COLLECTION, filter)
            .await?
            .map(decode)
            .transpose()
    }

    /// Matching documents in insertion order
    pub async fn list<T: Document>(&self, filter: &Filter) -> StoreResult<Vec<T>> {
        self.backend
            .find(T::COLLECTION, filter, Sort::Inserted)
            .await?
            .into_iter()
            .map(decode)
            .collect()
    }

    /// Matching documents, most recent first
    pub async fn list_recent<T: Document>(&self, filter: &Filter) -> StoreResult<Vec<T>> {
        self.backend
            .find(T::COLLECTION, filter, Sort::NewestFirst(T::RECENCY_FIELD))
            .await?
            .into_iter()
            .map(decode)
            .collect()
    }

    pub async fn patch<T: Document>(
        &self,
        id: &str,
        condition: &Filter,
        patch: Map<String, Value>,
    ) -> StoreResult<Option<T>> {
        self.backend
            .patch(T::COLLECTION, id, condition, patch, T::UNIQUE_FIELDS)
            .await?
            .map(decode)
            .transpose()
    }

    pub async fn upsert<T: Document>(
        &self,
        doc: &T,
        patch: Map<String, Value>,
    ) -> StoreResult<Upserted<T>> {
        let value = serde_json::to_value(doc)?;
        let upserted = self
            .backend
            .upsert(T::COLLECTION, doc.id(), value, patch)
            .await?;

        Ok(Upserted {
            document: decode(upserted.document)?,
            created: upserted.created,
        })
    }
}

fn decode<T: DeserializeOwned>(value: Value) -> StoreResult<T> {
    Ok(serde_json::from_value(value)?)
}

/// Build a JSON patch from field/value pairs
pub fn patch_of<I, K>(pairs: I) -> Map<String, Value>
where
    I: IntoIterator<Item = (K, Value)>,
    K: Into<String>,
{
    pairs.into_iter().map(|(k, v)| (k.into(), v)).collect()
}

/// Create a document store based on configuration.
///
/// - `"postgres"`: connects, prepares the schema and fails if the database is
///   unreachable; the service must not start degraded
/// - `"memory"` (default): in-process store, data is lost on restart
pub async fn create_store(config: &DatabaseConfig) -> StoreResult<Arc<dyn DocumentStore>> {
    match config.backend.as_str() {
        "postgres" => {
            if config.url.is_empty() {
                return Err(StoreError::Unavailable(
                    "database.url is required for the postgres backend".to_string(),
                ));
            }
            let store = PostgresStore::connect(config).await?;
            store.migrate().await?;
            tracing::info!(
                backend = "postgres",
                url = %store.database_url_masked(),
                "Document store ready"
            );
            Ok(Arc::new(store))
        }
        _ => {
            tracing::info!(backend = "memory", "Creating in-memory document store");
            Ok(Arc::new(MemoryStore::new()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::{Deserialize, Serialize};

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    #[serde(rename_all = "camelCase")]
    struct Note {
        id: String,
        owner: String,
        text: String,
        created_at: chrono::DateTime<chrono::Utc>,
    }

    impl Document for Note {
        const COLLECTION: &'static str = "notes";
        const UNIQUE_FIELDS: &'static [&'static str] = &["text"];

        fn id(&self) -> &str {
            &self.id
        }
    }

    fn note(id: &str, text: &str, minutes_ago: i64) -> Note {
        Note {
            id: id.to_string(),
            owner: "u1".to_string(),
            text: text.to_string(),
            created_at: chrono::Utc::now() - chrono::Duration::minutes(minutes_ago),
        }
    }

    #[tokio::test]
    async fn test_typed_round_trip() {
        let store = Store::new(Arc::new(MemoryStore::new()));
        let n = note("n1", "hello", 0);

        store.create(&n).await.unwrap();
        let loaded: Note = store.get("n1").await.unwrap().unwrap();
        assert_eq!(loaded, n);

        let missing: Option<Note> = store.get("nope").await.unwrap();
        assert!(missing.is_none());
    }

    #[tokio::test]
    async fn test_unique_fields_are_enforced() {
        let store = Store::new(Arc::new(MemoryStore::new()));
        store.create(&note("n1", "same", 0)).await.unwrap();

        let err = store.create(&note("n2", "same", 0)).await.unwrap_err();
        assert!(matches!(err, StoreError::Duplicate { ref field, .. } if field == "text"));
    }

    #[tokio::test]
    async fn test_patch_enforces_unique_fields() {
        let store = Store::new(Arc::new(MemoryStore::new()));
        store.create(&note("n1", "first", 0)).await.unwrap();
        store.create(&note("n2", "second", 0)).await.unwrap();

        let err = store
            .patch::<Note>("n2", &Filter::new(), patch_of([("text", "first".into())]))
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Duplicate { ref field, .. } if field == "text"));

        let kept: Note = store.get("n2").await.unwrap().unwrap();
        assert_eq!(kept.text, "second");

        // Re-writing its own value is not a conflict
        let same: Option<Note> = store
            .patch("n1", &Filter::new(), patch_of([("text", "first".into())]))
            .await
            .unwrap();
        assert!(same.is_some());
    }

    #[tokio::test]
    async fn test_list_recent_orders_by_timestamp() {
        let store = Store::new(Arc::new(MemoryStore::new()));
        store.create(&note("old", "a", 30)).await.unwrap();
        store.create(&note("new", "b", 1)).await.unwrap();
        store.create(&note("mid", "c", 10)).await.unwrap();

        let notes: Vec<Note> = store.list_recent(&Filter::new()).await.unwrap();
        let order: Vec<&str> = notes.iter().map(|n| n.id.as_str()).collect();
        assert_eq!(order, vec!["new", "mid", "old"]);

        let inserted: Vec<Note> = store.list(&Filter::new()).await.unwrap();
        let order: Vec<&str> = inserted.iter().map(|n| n.id.as_str()).collect();
        assert_eq!(order, vec!["old", "new", "mid"]);
    }

    #[tokio::test]
    async fn test_create_store_defaults_to_memory() {
        let store = create_store(&DatabaseConfig::default()).await.unwrap();
        assert_eq!(store.backend_name(), "memory");
    }

    #[tokio::test]
    async fn test_postgres_without_url_refuses_to_start() {
        let config = DatabaseConfig {
            backend: "postgres".to_string(),
            ..Default::default()
        };
        assert!(matches!(
            create_store(&config).await,
            Err(StoreError::Unavailable(_))
        ));
    }
}
