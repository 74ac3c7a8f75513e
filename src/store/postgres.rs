//! PostgreSQL document store backend.
//!
//! All collections share one table:
//!
//! ```sql
//! documents (collection TEXT, id TEXT, body JSONB, seq BIGSERIAL,
//!            PRIMARY KEY (collection, id))
//! ```
//!
//! Filters are translated to JSONB predicates. Conditional patches and upserts
//! are single statements, so they are atomic without explicit transactions.

use std::time::Duration;

use async_trait::async_trait;
use serde_json::{Map, Value};
use sqlx::postgres::{PgPool, PgPoolOptions};
use sqlx::{Postgres, QueryBuilder, Row};

use crate::config::DatabaseConfig;

use super::{Clause, DocumentStore, Filter, Sort, StoreError, StoreResult, Upserted};

/// Unique indexes created by `migrate`: (collection, field)
const UNIQUE_INDEXES: &[(&str, &str)] = &[("users", "phone")];

const SCHEMA: &[&str] = &[
    "CREATE TABLE IF NOT EXISTS documents (
        collection TEXT NOT NULL,
        id TEXT NOT NULL,
        body JSONB NOT NULL,
        seq BIGSERIAL,
        PRIMARY KEY (collection, id)
    )",
];

/// PostgreSQL-backed document store.
pub struct PostgresStore {
    pool: PgPool,
    /// Database URL (for logging purposes)
    database_url: String,
}

impl PostgresStore {
    /// Create a new pool from configuration.
    pub async fn connect(config: &DatabaseConfig) -> StoreResult<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(config.pool_size)
            .acquire_timeout(Duration::from_secs(config.connect_timeout_seconds))
            .idle_timeout(Duration::from_secs(config.idle_timeout_seconds))
            .connect(&config.url)
            .await?;

        tracing::info!(
            pool_size = config.pool_size,
            "PostgreSQL connection pool created"
        );

        Ok(Self {
            pool,
            database_url: config.url.clone(),
        })
    }

    /// Create the documents table and indexes if they do not exist.
    pub async fn migrate(&self) -> StoreResult<()> {
        for statement in SCHEMA {
            sqlx::query(statement).execute(&self.pool).await?;
        }

        for (collection, field) in UNIQUE_INDEXES {
            let statement = format!(
                "CREATE UNIQUE INDEX IF NOT EXISTS documents_{collection}_{field}_key \
                 ON documents ((body ->> '{field}')) WHERE collection = '{collection}'"
            );
            sqlx::query(&statement).execute(&self.pool).await?;
        }

        tracing::debug!("Document schema is up to date");
        Ok(())
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Get the database URL (masked for logging).
    pub fn database_url_masked(&self) -> String {
        mask_url(&self.database_url)
    }

    fn duplicate_or(&self, collection: &str, unique: &[&str], err: sqlx::Error) -> StoreError {
        if let sqlx::Error::Database(db) = &err {
            if db.is_unique_violation() {
                let field = match db.constraint() {
                    Some("documents_pkey") | None => "id".to_string(),
                    Some(constraint) => unique
                        .iter()
                        .find(|f| constraint.ends_with(&format!("_{}_key", f)))
                        .map(|f| f.to_string())
                        .unwrap_or_else(|| constraint.to_string()),
                };
                return StoreError::Duplicate {
                    collection: collection.to_string(),
                    field,
                };
            }
        }
        StoreError::Postgres(err)
    }
}

fn mask_url(url: &str) -> String {
    let scheme_end = url.find("://").map(|p| p + 3).unwrap_or(0);
    if let Some(at_pos) = url[scheme_end..].find('@').map(|p| p + scheme_end) {
        if let Some(colon_pos) = url[scheme_end..at_pos].find(':').map(|p| p + scheme_end) {
            return format!("{}***{}", &url[..=colon_pos], &url[at_pos..]);
        }
    }
    url.to_string()
}

/// Append `AND <predicate>` for every clause of the filter
fn push_filter(qb: &mut QueryBuilder<'_, Postgres>, filter: &Filter) {
    for clause in filter.clauses() {
        match clause {
            Clause::Eq(field, value) => {
                qb.push(" AND body -> ");
                qb.push_bind(field.clone());
                qb.push(" = ");
                qb.push_bind(value.clone());
                qb.push("::jsonb");
            }
            Clause::Ne(field, value) => {
                qb.push(" AND (body -> ");
                qb.push_bind(field.clone());
                qb.push(") IS DISTINCT FROM ");
                qb.push_bind(value.clone());
                qb.push("::jsonb");
            }
            Clause::Ward(field, key) => {
                qb.push(" AND lower(btrim(body ->> ");
                qb.push_bind(field.clone());
                // same whitespace set as str::trim for the common cases
                qb.push(", E' \\t\\r\\n')) = ");
                qb.push_bind(key.as_str().to_string());
            }
            Clause::Present(field) => {
                qb.push(" AND coalesce(body -> ");
                qb.push_bind(field.clone());
                qb.push(", 'null'::jsonb) <> 'null'::jsonb");
            }
        }
    }
}

fn select_where<'a>(collection: &str, filter: &Filter) -> QueryBuilder<'a, Postgres> {
    let mut qb = QueryBuilder::new("SELECT body FROM documents WHERE collection = ");
    qb.push_bind(collection.to_string());
    push_filter(&mut qb, filter);
    qb
}

#[async_trait]
impl DocumentStore for PostgresStore {
    fn backend_name(&self) -> &'static str {
        "postgres"
    }

    async fn insert(
        &self,
        collection: &str,
        id: &str,
        doc: Value,
        unique: &[&str],
    ) -> StoreResult<()> {
        sqlx::query("INSERT INTO documents (collection, id, body) VALUES ($1, $2, $3)")
            .bind(collection)
            .bind(id)
            .bind(doc)
            .execute(&self.pool)
            .await
            .map_err(|e| self.duplicate_or(collection, unique, e))?;
        Ok(())
    }

    async fn find_by_id(&self, collection: &str, id: &str) -> StoreResult<Option<Value>> {
        let row = sqlx::query("SELECT body FROM documents WHERE collection = $1 AND id = $2")
            .bind(collection)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.map(|r| r.try_get("body")).transpose()?)
    }

    async fn find_one(&self, collection: &str, filter: &Filter) -> StoreResult<Option<Value>> {
        let mut qb = select_where(collection, filter);
        qb.push(" ORDER BY seq ASC LIMIT 1");

        let row = qb.build().fetch_optional(&self.pool).await?;
        Ok(row.map(|r| r.try_get("body")).transpose()?)
    }

    async fn find(&self, collection: &str, filter: &Filter, sort: Sort) -> StoreResult<Vec<Value>> {
        let mut qb = select_where(collection, filter);
        match sort {
            Sort::Inserted => {
                qb.push(" ORDER BY seq ASC");
            }
            Sort::NewestFirst(field) => {
                qb.push(" ORDER BY (body ->> ");
                qb.push_bind(field);
                qb.push(")::timestamptz DESC NULLS LAST, seq DESC");
            }
        }

        let rows = qb.build().fetch_all(&self.pool).await?;
        rows.iter()
            .map(|r| r.try_get("body").map_err(StoreError::from))
            .collect()
    }

    async fn patch(
        &self,
        collection: &str,
        id: &str,
        condition: &Filter,
        patch: Map<String, Value>,
        unique: &[&str],
    ) -> StoreResult<Option<Value>> {
        let mut qb = QueryBuilder::new("UPDATE documents SET body = body || ");
        qb.push_bind(Value::Object(patch));
        qb.push("::jsonb WHERE collection = ");
        qb.push_bind(collection.to_string());
        qb.push(" AND id = ");
        qb.push_bind(id.to_string());
        push_filter(&mut qb, condition);
        qb.push(" RETURNING body");

        let row = qb
            .build()
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| self.duplicate_or(collection, unique, e))?;
        Ok(row.map(|r| r.try_get("body")).transpose()?)
    }

    async fn upsert(
        &self,
        collection: &str,
        id: &str,
        doc: Value,
        patch: Map<String, Value>,
    ) -> StoreResult<Upserted<Value>> {
        let row = sqlx::query(
            "INSERT INTO documents (collection, id, body) VALUES ($1, $2, $3)
             ON CONFLICT (collection, id) DO UPDATE SET body = documents.body || $4::jsonb
             RETURNING body, (xmax = 0) AS inserted",
        )
        .bind(collection)
        .bind(id)
        .bind(doc)
        .bind(Value::Object(patch))
        .fetch_one(&self.pool)
        .await?;

        Ok(Upserted {
            document: row.try_get("body")?,
            created: row.try_get("inserted")?,
        })
    }

    async fn ping(&self) -> StoreResult<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}
