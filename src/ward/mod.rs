//! Ward matching.
//!
//! Every entity carries a denormalized `ward` string. Two ward strings name the
//! same ward when they are equal after trimming surrounding whitespace and
//! lowercasing, so `"Ward 5"` and `" ward 5 "` resolve to the same audience.
//! An empty (or whitespace-only) ward only ever matches other empty wards.

use std::fmt;

use crate::models::{fields, User};
use crate::store::{Filter, Store, StoreResult};

/// Normalized ward string used for every comparison.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct WardKey(String);

impl WardKey {
    pub fn new(raw: &str) -> Self {
        Self(raw.trim().to_lowercase())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Check whether a stored ward string belongs to this ward
    pub fn matches(&self, stored: &str) -> bool {
        stored.trim().to_lowercase() == self.0
    }
}

impl fmt::Display for WardKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Compare two raw ward strings
pub fn same_ward(a: &str, b: &str) -> bool {
    WardKey::new(a) == WardKey::new(b)
}

/// Which members of a ward to resolve.
#[derive(Debug, Clone, Default)]
pub struct Audience {
    exclude: Option<String>,
    require_push_token: bool,
}

impl Audience {
    /// Every user of the ward
    pub fn everyone() -> Self {
        Self::default()
    }

    /// Only users that registered a device push token
    pub fn with_push_token(mut self) -> Self {
        self.require_push_token = true;
        self
    }

    /// Leave one user out (e.g. the requester of a blood request)
    pub fn excluding(mut self, user_id: impl Into<String>) -> Self {
        self.exclude = Some(user_id.into());
        self
    }

    pub fn excluded(&self) -> Option<&str> {
        self.exclude.as_deref()
    }

    pub fn requires_push_token(&self) -> bool {
        self.require_push_token
    }
}

/// Resolves the users living in a ward.
pub struct WardMatcher {
    store: Store,
}

impl WardMatcher {
    pub fn new(store: Store) -> Self {
        Self { store }
    }

    /// Build the user filter for a ward audience
    pub fn filter_for(ward: &WardKey, audience: &Audience) -> Filter {
        let mut filter = Filter::new().ward(fields::WARD, ward);

        if let Some(excluded) = audience.excluded() {
            filter = filter.ne(fields::ID, excluded);
        }

        if audience.requires_push_token() {
            filter = filter.present(fields::PUSH_TOKEN);
        }

        filter
    }

    #[tracing::instrument(name = "ward.resolve", skip(self, audience), fields(ward = %ward.trim()))]
    pub async fn resolve(&self, ward: &str, audience: &Audience) -> StoreResult<Vec<User>> {
        let key = WardKey::new(ward);
        let filter = Self::filter_for(&key, audience);
        let users: Vec<User> = self.store.list(&filter).await?;

        tracing::debug!(
            ward = %key,
            matched = users.len(),
            require_push_token = audience.requires_push_token(),
            "Resolved ward audience"
        );

        Ok(users)
    }
}
