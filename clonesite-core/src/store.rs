use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

use crate::tenant::{Tenant, TenantId};

/// Result type for content store operations
pub type StoreResult<T> = Result<T, StoreError>;

/// Errors a content store can report. The core never lets these reach a
/// page; they turn into tier misses.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Content store backend error: {source}")]
    Backend {
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    #[error("Content store query timed out after {0:?}")]
    Timeout(Duration),

    #[error("Malformed content store response: {message}")]
    Malformed { message: String },

    #[error("Serialization error: {source}")]
    Serialization {
        #[from]
        source: serde_json::Error,
    },
}

impl StoreError {
    pub fn backend<E>(error: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::Backend {
            source: Box::new(error),
        }
    }

    pub fn malformed<S: Into<String>>(message: S) -> Self {
        Self::Malformed {
            message: message.into(),
        }
    }
}

/// One CMS document for a content section.
///
/// `tenant` is `None` for global default records. `fields` is the
/// section-specific payload; the resolution engine never looks inside it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContentRecord {
    pub id: String,
    pub section: String,
    #[serde(default)]
    pub tenant: Option<TenantId>,
    #[serde(default)]
    pub scope: Option<String>,
    #[serde(default = "default_true")]
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(default)]
    pub fields: Map<String, Value>,
}

fn default_true() -> bool {
    true
}

impl ContentRecord {
    pub fn new(id: impl Into<String>, section: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: id.into(),
            section: section.into(),
            tenant: None,
            scope: None,
            is_active: true,
            created_at: now,
            updated_at: now,
            fields: Map::new(),
        }
    }

    pub fn for_tenant(mut self, tenant: impl Into<TenantId>) -> Self {
        self.tenant = Some(tenant.into());
        self
    }

    pub fn scoped(mut self, scope: impl Into<String>) -> Self {
        self.scope = Some(scope.into());
        self
    }

    pub fn inactive(mut self) -> Self {
        self.is_active = false;
        self
    }

    pub fn with_field(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.fields.insert(name.into(), value.into());
        self
    }

    pub fn updated(mut self, at: DateTime<Utc>) -> Self {
        self.updated_at = at;
        self
    }

    pub fn created(mut self, at: DateTime<Utc>) -> Self {
        self.created_at = at;
        self
    }

    pub fn field(&self, name: &str) -> Option<&Value> {
        self.fields.get(name)
    }

    pub fn str_field(&self, name: &str) -> Option<&str> {
        self.field(name).and_then(|v| v.as_str())
    }

    /// Route slug. Pages are looked up by scope, so this is the scoping
    /// key when it can stand as a single path segment. A `slug` payload
    /// field is display data and never routes.
    pub fn route_slug(&self) -> Option<&str> {
        self.scope
            .as_deref()
            .filter(|s| !s.is_empty() && s.trim() == *s && !s.contains('/'))
    }

    /// Decode the payload into a section-specific type.
    pub fn decode<T: DeserializeOwned>(&self) -> StoreResult<T> {
        Ok(serde_json::from_value(Value::Object(self.fields.clone()))?)
    }

    /// Tier tie-break: newest update first, then newest creation.
    pub fn is_newer_than(&self, other: &ContentRecord) -> bool {
        (self.updated_at, self.created_at) > (other.updated_at, other.created_at)
    }
}

/// Which tenant assignments a query accepts.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TenantFilter {
    /// Records assigned to exactly this tenant.
    Exact(TenantId),
    /// Records with no tenant reference at all.
    Unassigned,
    /// Records for `tenant`, for `baseline`, or unassigned.
    AnyOf {
        tenant: Option<TenantId>,
        baseline: Option<TenantId>,
    },
}

impl TenantFilter {
    pub fn matches(&self, tenant: Option<&TenantId>) -> bool {
        match (self, tenant) {
            (TenantFilter::Exact(want), Some(got)) => want == got,
            (TenantFilter::Exact(_), None) => false,
            (TenantFilter::Unassigned, got) => got.is_none(),
            (TenantFilter::AnyOf { .. }, None) => true,
            (TenantFilter::AnyOf { tenant, baseline }, Some(got)) => {
                tenant.as_ref() == Some(got) || baseline.as_ref() == Some(got)
            }
        }
    }
}

/// Filter expression handed to the content store.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ContentQuery {
    pub section: String,
    pub tenant: TenantFilter,
    /// When set, only records with exactly this scoping key match.
    pub scope: Option<String>,
    pub active_only: bool,
    pub revalidate: Option<Duration>,
}

impl ContentQuery {
    pub fn new(section: impl Into<String>, tenant: TenantFilter) -> Self {
        Self {
            section: section.into(),
            tenant,
            scope: None,
            active_only: true,
            revalidate: None,
        }
    }

    pub fn with_scope(mut self, scope: Option<&str>) -> Self {
        self.scope = scope.map(str::to_string);
        self
    }

    pub fn with_revalidate(mut self, revalidate: Option<Duration>) -> Self {
        self.revalidate = revalidate;
        self
    }

    pub fn include_inactive(mut self) -> Self {
        self.active_only = false;
        self
    }

    pub fn matches(&self, record: &ContentRecord) -> bool {
        record.section == self.section
            && (!self.active_only || record.is_active)
            && self.tenant.matches(record.tenant.as_ref())
            && match &self.scope {
                Some(scope) => record.scope.as_deref() == Some(scope.as_str()),
                None => true,
            }
    }
}

/// The CMS document store, as far as the core is concerned.
#[async_trait]
pub trait ContentStore: Send + Sync {
    /// Fetch every record matching `query`.
    async fn fetch(&self, query: &ContentQuery) -> StoreResult<Vec<ContentRecord>>;

    /// Fetch all tenant documents, active or not.
    async fn fetch_tenants(&self) -> StoreResult<Vec<Tenant>>;
}
