//! Document filters shared by every store backend.

use chrono::{DateTime, Utc};
use serde_json::Value;

use crate::ward::WardKey;

/// A single predicate on a top-level document field.
#[derive(Debug, Clone, PartialEq)]
pub enum Clause {
    /// Field equals the value (JSON equality)
    Eq(String, Value),
    /// Field is missing or differs from the value
    Ne(String, Value),
    /// Field is a string naming the given ward (trim + case-insensitive)
    Ward(String, WardKey),
    /// Field is present and not null
    Present(String),
}

impl Clause {
    pub fn matches(&self, doc: &Value) -> bool {
        match self {
            Clause::Eq(field, value) => doc.get(field) == Some(value),
            Clause::Ne(field, value) => doc.get(field) != Some(value),
            Clause::Ward(field, key) => doc
                .get(field)
                .and_then(Value::as_str)
                .is_some_and(|ward| key.matches(ward)),
            Clause::Present(field) => doc.get(field).is_some_and(|v| !v.is_null()),
        }
    }
}

/// Conjunction of clauses. An empty filter matches every document.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Filter {
    clauses: Vec<Clause>,
}

impl Filter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn eq(mut self, field: &str, value: impl Into<Value>) -> Self {
        self.clauses.push(Clause::Eq(field.to_string(), value.into()));
        self
    }

    pub fn ne(mut self, field: &str, value: impl Into<Value>) -> Self {
        self.clauses.push(Clause::Ne(field.to_string(), value.into()));
        self
    }

    pub fn ward(mut self, field: &str, key: &WardKey) -> Self {
        self.clauses.push(Clause::Ward(field.to_string(), key.clone()));
        self
    }

    pub fn present(mut self, field: &str) -> Self {
        self.clauses.push(Clause::Present(field.to_string()));
        self
    }

    pub fn clauses(&self) -> &[Clause] {
        &self.clauses
    }

    pub fn is_empty(&self) -> bool {
        self.clauses.is_empty()
    }

    pub fn matches(&self, doc: &Value) -> bool {
        self.clauses.iter().all(|clause| clause.matches(doc))
    }
}

/// Result ordering for `find`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Sort {
    /// Insertion order
    Inserted,
    /// Most recent first by the given timestamp field
    NewestFirst(&'static str),
}

/// Parse an RFC 3339 timestamp field for ordering
pub(crate) fn timestamp_of(doc: &Value, field: &str) -> Option<DateTime<Utc>> {
    doc.get(field)
        .and_then(Value::as_str)
        .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
        .map(|dt| dt.with_timezone(&Utc))
}
