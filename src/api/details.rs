//! Summaries of referenced documents attached to listings.

use futures::future::try_join_all;
use serde::Serialize;

use crate::error::{AppError, Result};
use crate::models::{Business, User};
use crate::store::{Document, Store};

/// Name and phone of a user
#[derive(Debug, Clone, Serialize)]
pub struct UserContact {
    pub id: String,
    pub name: String,
    pub phone: String,
}

impl From<User> for UserContact {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            name: user.name,
            phone: user.phone,
        }
    }
}

/// Id and display name of a referenced document
#[derive(Debug, Clone, Serialize)]
pub struct NameRef {
    pub id: String,
    pub name: String,
}

impl From<User> for NameRef {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            name: user.name,
        }
    }
}

impl From<Business> for NameRef {
    fn from(business: Business) -> Self {
        Self {
            id: business.id,
            name: business.name,
        }
    }
}

/// Look up the document each item references and combine the two.
///
/// Lookups run concurrently; a reference to a deleted document yields `None`.
pub(super) async fn with_references<T, R, L, K, B>(
    store: &Store,
    items: Vec<T>,
    reference: K,
    build: B,
) -> Result<Vec<L>>
where
    R: Document,
    K: Fn(&T) -> String,
    B: Fn(T, Option<R>) -> L,
{
    let build = &build;
    try_join_all(items.into_iter().map(|item| {
        let id = reference(&item);
        async move {
            let referenced: Option<R> = store.get(&id).await?;
            Ok::<_, AppError>(build(item, referenced))
        }
    }))
    .await
}
