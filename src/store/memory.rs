//! In-memory document store backend using DashMap.
//!
//! Each collection lives under one DashMap entry, so any operation that takes
//! the entry mutably (insert, patch, upsert) is atomic with respect to
//! every other operation on the same collection. Data is lost on restart.

use std::collections::HashMap;

use async_trait::async_trait;
use dashmap::DashMap;
use serde_json::{Map, Value};

use super::filter::timestamp_of;
use super::{DocumentStore, Filter, Sort, StoreError, StoreResult, Upserted};

#[derive(Debug, Clone)]
struct StoredDocument {
    /// Insertion sequence, used for stable ordering
    seq: u64,
    body: Value,
}

#[derive(Debug, Default)]
struct CollectionData {
    documents: HashMap<String, StoredDocument>,
    next_seq: u64,
}

impl CollectionData {
    fn find_conflict(&self, id: &str, doc: &Value, unique: &[&str]) -> Option<String> {
        for field in unique {
            let Some(value) = doc.get(*field).filter(|v| !v.is_null()) else {
                continue;
            };
            let taken = self
                .documents
                .iter()
                .any(|(other_id, other)| other_id != id && other.body.get(*field) == Some(value));
            if taken {
                return Some(field.to_string());
            }
        }
        None
    }

    fn push(&mut self, id: &str, body: Value) {
        let seq = self.next_seq;
        self.next_seq += 1;
        self.documents
            .insert(id.to_string(), StoredDocument { seq, body });
    }
}

/// In-memory document store.
#[derive(Debug, Default)]
pub struct MemoryStore {
    collections: DashMap<String, CollectionData>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of documents in a collection
    pub fn count(&self, collection: &str) -> usize {
        self.collections
            .get(collection)
            .map(|c| c.documents.len())
            .unwrap_or(0)
    }
}

fn merge(body: &mut Value, patch: Map<String, Value>) {
    if let Value::Object(fields) = body {
        for (key, value) in patch {
            fields.insert(key, value);
        }
    }
}

#[async_trait]
impl DocumentStore for MemoryStore {
    fn backend_name(&self) -> &'static str {
        "memory"
    }

    async fn insert(
        &self,
        collection: &str,
        id: &str,
        doc: Value,
        unique: &[&str],
    ) -> StoreResult<()> {
        let mut data = self.collections.entry(collection.to_string()).or_default();

        if data.documents.contains_key(id) {
            return Err(StoreError::Duplicate {
                collection: collection.to_string(),
                field: "id".to_string(),
            });
        }

        if let Some(field) = data.find_conflict(id, &doc, unique) {
            return Err(StoreError::Duplicate {
                collection: collection.to_string(),
                field,
            });
        }

        data.push(id, doc);
        Ok(())
    }

    async fn find_by_id(&self, collection: &str, id: &str) -> StoreResult<Option<Value>> {
        Ok(self
            .collections
            .get(collection)
            .and_then(|data| data.documents.get(id).map(|d| d.body.clone())))
    }

    async fn find_one(&self, collection: &str, filter: &Filter) -> StoreResult<Option<Value>> {
        let mut found = self.find(collection, filter, Sort::Inserted).await?;
        if found.is_empty() {
            Ok(None)
        } else {
            Ok(Some(found.swap_remove(0)))
        }
    }

    async fn find(&self, collection: &str, filter: &Filter, sort: Sort) -> StoreResult<Vec<Value>> {
        let Some(data) = self.collections.get(collection) else {
            return Ok(Vec::new());
        };

        let mut matched: Vec<&StoredDocument> = data
            .documents
            .values()
            .filter(|d| filter.matches(&d.body))
            .collect();

        match sort {
            Sort::Inserted => matched.sort_by_key(|d| d.seq),
            Sort::NewestFirst(field) => matched.sort_by(|a, b| {
                timestamp_of(&b.body, field)
                    .cmp(&timestamp_of(&a.body, field))
                    .then(b.seq.cmp(&a.seq))
            }),
        }

        Ok(matched.into_iter().map(|d| d.body.clone()).collect())
    }

    async fn patch(
        &self,
        collection: &str,
        id: &str,
        condition: &Filter,
        patch: Map<String, Value>,
        unique: &[&str],
    ) -> StoreResult<Option<Value>> {
        let Some(mut data) = self.collections.get_mut(collection) else {
            return Ok(None);
        };

        let mut merged = match data.documents.get(id) {
            Some(existing) if condition.matches(&existing.body) => existing.body.clone(),
            _ => return Ok(None),
        };
        merge(&mut merged, patch);

        if let Some(field) = data.find_conflict(id, &merged, unique) {
            return Err(StoreError::Duplicate {
                collection: collection.to_string(),
                field,
            });
        }

        if let Some(existing) = data.documents.get_mut(id) {
            existing.body = merged.clone();
        }
        Ok(Some(merged))
    }

    async fn upsert(
        &self,
        collection: &str,
        id: &str,
        doc: Value,
        patch: Map<String, Value>,
    ) -> StoreResult<Upserted<Value>> {
        let mut data = self.collections.entry(collection.to_string()).or_default();

        if let Some(existing) = data.documents.get_mut(id) {
            merge(&mut existing.body, patch);
            return Ok(Upserted {
                document: existing.body.clone(),
                created: false,
            });
        }

        data.push(id, doc.clone());
        Ok(Upserted {
            document: doc,
            created: true,
        })
    }

    async fn ping(&self) -> StoreResult<()> {
        Ok(())
    }
}
