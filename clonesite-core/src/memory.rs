use std::collections::HashMap;
use std::path::Path;

use async_trait::async_trait;
use chrono::Utc;
use serde::Deserialize;
use tokio::sync::RwLock;

use crate::store::{ContentQuery, ContentRecord, ContentStore, StoreError, StoreResult};
use crate::tenant::Tenant;

/// JSON fixture accepted by [`MemoryStore::from_seed`].
#[derive(Debug, Default, Deserialize)]
pub struct Seed {
    #[serde(default)]
    pub tenants: Vec<Tenant>,
    #[serde(default)]
    pub records: Vec<ContentRecord>,
}

#[derive(Default)]
struct MemoryState {
    // Insertion order is the stable registry order.
    tenants: Vec<Tenant>,
    records: HashMap<String, ContentRecord>,
}

/// In-process content store. Backs the dev server and the tests.
#[derive(Default)]
pub struct MemoryStore {
    state: RwLock<MemoryState>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_seed(seed: Seed) -> Self {
        let records = seed
            .records
            .into_iter()
            .map(|r| (r.id.clone(), r))
            .collect();
        Self {
            state: RwLock::new(MemoryState {
                tenants: seed.tenants,
                records,
            }),
        }
    }

    pub fn from_json(raw: &str) -> StoreResult<Self> {
        let seed: Seed = serde_json::from_str(raw)?;
        Ok(Self::from_seed(seed))
    }

    pub async fn from_path(path: impl AsRef<Path>) -> StoreResult<Self> {
        let raw = tokio::fs::read_to_string(path.as_ref())
            .await
            .map_err(StoreError::backend)?;
        Self::from_json(&raw)
    }

    /// Insert or replace a tenant, keeping its original position.
    pub async fn upsert_tenant(&self, tenant: Tenant) {
        let mut state = self.state.write().await;
        match state.tenants.iter_mut().find(|t| t.id == tenant.id) {
            Some(existing) => *existing = tenant,
            None => state.tenants.push(tenant),
        }
    }

    pub async fn upsert_record(&self, record: ContentRecord) {
        let mut state = self.state.write().await;
        state.records.insert(record.id.clone(), record);
    }

    /// Flip `is_active` and bump `updated_at`. Returns false if unknown.
    pub async fn set_record_active(&self, id: &str, active: bool) -> bool {
        let mut state = self.state.write().await;
        match state.records.get_mut(id) {
            Some(record) => {
                record.is_active = active;
                record.updated_at = Utc::now();
                true
            }
            None => false,
        }
    }
}

#[async_trait]
impl ContentStore for MemoryStore {
    async fn fetch(&self, query: &ContentQuery) -> StoreResult<Vec<ContentRecord>> {
        let state = self.state.read().await;
        let mut out: Vec<ContentRecord> = state
            .records
            .values()
            .filter(|r| query.matches(r))
            .cloned()
            .collect();
        // Newest first, like an `order(_updatedAt desc)` CMS query.
        out.sort_by(|a, b| {
            (b.updated_at, b.created_at, &b.id).cmp(&(a.updated_at, a.created_at, &a.id))
        });
        Ok(out)
    }

    async fn fetch_tenants(&self) -> StoreResult<Vec<Tenant>> {
        Ok(self.state.read().await.tenants.clone())
    }
}
