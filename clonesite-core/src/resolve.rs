//! # Content resolution
//!
//! Every content section goes through one primitive: three tier queries
//! (tenant-specific, baseline, default) issued together, awaited together,
//! then ranked in that fixed order.
//!
//! A tier that errors or times out is a miss for that tier only. A tier
//! that returns nothing for a scoping key is also a miss; it never widens to
//! unscoped records within the same tier.
//!
//! ```text
//! tenant-specific ──┐
//! baseline ─────────┼── join ── first non-empty tier wins
//! default ──────────┘
//! ```

use std::sync::Arc;
use std::time::Duration;

use futures::future::join_all;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::cache::TtlCache;
use crate::config::SiteConfig;
use crate::errors::{SiteError, SiteResult};
use crate::registry::TenantRegistry;
use crate::store::{
    ContentQuery, ContentRecord, ContentStore, StoreError, StoreResult, TenantFilter,
};
use crate::tenant::{TenantContext, TenantId};

/// Which tier produced a resolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ContentSource {
    TenantSpecific,
    Baseline,
    Default,
    None,
}

/// Resolved content plus provenance. `data: None` means "render the empty
/// state", never an error.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Resolution<T> {
    pub data: Option<T>,
    pub source: ContentSource,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tenant_id: Option<TenantId>,
}

impl<T> Resolution<T> {
    pub fn none() -> Self {
        Self {
            data: None,
            source: ContentSource::None,
            tenant_id: None,
        }
    }

    pub fn is_tenant_specific(&self) -> bool {
        self.source == ContentSource::TenantSpecific
    }

    pub fn is_none(&self) -> bool {
        self.data.is_none()
    }

    pub fn map<U, F>(self, f: F) -> Resolution<U>
    where
        F: FnOnce(T) -> U,
    {
        Resolution {
            data: self.data.map(f),
            source: self.source,
            tenant_id: self.tenant_id,
        }
    }
}

impl Resolution<ContentRecord> {
    /// Decode the winning record into a section-specific type.
    pub fn decode<T: DeserializeOwned>(self) -> StoreResult<Resolution<T>> {
        let data = match &self.data {
            Some(record) => Some(record.decode::<T>()?),
            None => None,
        };
        Ok(Resolution {
            data,
            source: self.source,
            tenant_id: self.tenant_id,
        })
    }
}

/// One section of a page, for [`ContentResolver::resolve_many`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SectionRequest {
    pub section: String,
    pub scope: Option<String>,
}

impl SectionRequest {
    pub fn new(section: impl Into<String>) -> Self {
        Self {
            section: section.into(),
            scope: None,
        }
    }

    pub fn scoped(section: impl Into<String>, scope: impl Into<String>) -> Self {
        Self {
            section: section.into(),
            scope: Some(scope.into()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct TierKey {
    section: String,
    filter: TenantFilter,
    scope: Option<String>,
}

type TierRecords = Arc<Vec<ContentRecord>>;

struct Tiers {
    tenant: (Option<TenantId>, TierRecords),
    baseline: (Option<TenantId>, TierRecords),
    default: TierRecords,
    // every tier that was queried errored or timed out
    all_failed: bool,
}

impl Tiers {
    /// Apply the precedence rule: the first tier accepted by `has_content`.
    fn pick<F>(self, has_content: F) -> Option<(ContentSource, Option<TenantId>, TierRecords)>
    where
        F: Fn(&[ContentRecord]) -> bool,
    {
        let (tenant_id, records) = self.tenant;
        if has_content(records.as_slice()) {
            return Some((ContentSource::TenantSpecific, tenant_id, records));
        }
        let (baseline_id, records) = self.baseline;
        if has_content(records.as_slice()) {
            return Some((ContentSource::Baseline, baseline_id, records));
        }
        if has_content(self.default.as_slice()) {
            return Some((ContentSource::Default, None, self.default));
        }
        None
    }
}

fn newest(records: &[ContentRecord]) -> Option<&ContentRecord> {
    records.iter().fold(None, |best, r| match best {
        Some(b) if !r.is_newer_than(b) => Some(b),
        _ => Some(r),
    })
}

fn order_key(record: &ContentRecord) -> i64 {
    record
        .field("order")
        .and_then(|v| v.as_i64())
        .unwrap_or(i64::MAX)
}

/// The three-tier content resolver. One instance per process; share it.
pub struct ContentResolver {
    store: Arc<dyn ContentStore>,
    registry: Arc<TenantRegistry>,
    tiers: TtlCache<TierKey, TierRecords>,
    query_timeout: Duration,
    revalidate: Option<Duration>,
}

impl ContentResolver {
    pub fn new(
        store: Arc<dyn ContentStore>,
        registry: Arc<TenantRegistry>,
        config: &SiteConfig,
    ) -> Self {
        Self {
            store,
            registry,
            tiers: TtlCache::new(config.content_cache_ttl, config.cache_capacity),
            query_timeout: config.query_timeout,
            revalidate: config.revalidate,
        }
    }

    /// Active records of `section` matching `filter`, served from the tier
    /// cache when fresh. Store errors and timeouts are logged, returned as
    /// `Err` and never cached.
    pub async fn fetch_cached(
        &self,
        section: &str,
        filter: TenantFilter,
        scope: Option<&str>,
    ) -> StoreResult<TierRecords> {
        let key = TierKey {
            section: section.to_string(),
            filter,
            scope: scope.map(str::to_string),
        };
        if let Some(hit) = self.tiers.get(&key) {
            return Ok(hit);
        }

        let query = ContentQuery::new(section, key.filter.clone())
            .with_scope(scope)
            .with_revalidate(self.revalidate);

        match tokio::time::timeout(self.query_timeout, self.store.fetch(&query)).await {
            Ok(Ok(records)) => {
                let records: TierRecords = Arc::new(
                    records
                        .into_iter()
                        .filter(|r| query.matches(r))
                        .collect(),
                );
                self.tiers.insert(key, Arc::clone(&records));
                Ok(records)
            }
            Ok(Err(err)) => {
                tracing::warn!(
                    section,
                    filter = ?query.tenant,
                    scope,
                    error = %err,
                    "content query failed, treating tier as a miss"
                );
                Err(err)
            }
            Err(_) => {
                tracing::warn!(
                    section,
                    filter = ?query.tenant,
                    scope,
                    timeout_ms = self.query_timeout.as_millis() as u64,
                    "content query timed out, treating tier as a miss"
                );
                Err(StoreError::Timeout(self.query_timeout))
            }
        }
    }

    async fn collect_tiers(
        &self,
        ctx: &TenantContext,
        section: &str,
        scope: Option<&str>,
    ) -> Tiers {
        let tenant_id = ctx.tenant_id().cloned();

        let tenant_tier = async {
            match &tenant_id {
                Some(id) => Some(
                    self.fetch_cached(section, TenantFilter::Exact(id.clone()), scope)
                        .await,
                ),
                None => None,
            }
        };
        // The baseline id comes from the registry, so its lookup runs inside
        // the join rather than in front of it.
        let baseline_tier = async {
            let Some(id) = self.registry.get_baseline_tenant().await.map(|t| t.id) else {
                return None;
            };
            let records = self
                .fetch_cached(section, TenantFilter::Exact(id.clone()), scope)
                .await;
            Some((id, records))
        };
        let default_tier = self.fetch_cached(section, TenantFilter::Unassigned, scope);

        // All three complete before precedence is applied.
        let (tenant, baseline, default) = futures::join!(tenant_tier, baseline_tier, default_tier);

        let mut queried = 0;
        let mut failed = 0;
        let mut settle = |result: StoreResult<TierRecords>| -> TierRecords {
            queried += 1;
            result.unwrap_or_else(|_| {
                failed += 1;
                Arc::default()
            })
        };
        let tenant = tenant.map(&mut settle).unwrap_or_default();
        let (baseline_id, baseline) = match baseline {
            Some((id, records)) => (Some(id), settle(records)),
            None => (None, Arc::default()),
        };
        let default = settle(default);

        Tiers {
            tenant: (tenant_id, tenant),
            baseline: (baseline_id, baseline),
            default,
            all_failed: failed == queried,
        }
    }

    async fn resolve_single(
        &self,
        ctx: &TenantContext,
        section: &str,
        scope: Option<&str>,
    ) -> (Resolution<ContentRecord>, bool) {
        let tiers = self.collect_tiers(ctx, section, scope).await;
        let all_failed = tiers.all_failed;
        let resolution = match tiers.pick(|records| !records.is_empty()) {
            Some((source, tenant_id, records)) => Resolution {
                data: newest(&records).cloned(),
                source,
                tenant_id,
            },
            None => Resolution::none(),
        };
        tracing::debug!(
            section,
            scope,
            tenant = ?ctx.tenant_id(),
            source = ?resolution.source,
            all_failed,
            "section resolved"
        );
        (resolution, all_failed)
    }

    /// Resolve a single-record section.
    pub async fn resolve(
        &self,
        ctx: &TenantContext,
        section: &str,
        scope: Option<&str>,
    ) -> Resolution<ContentRecord> {
        self.resolve_single(ctx, section, scope).await.0
    }

    /// Resolve a collection section (tutors, testimonials, ...). A tier only
    /// wins with a non-empty list; items come back in `order` field order.
    pub async fn resolve_collection(
        &self,
        ctx: &TenantContext,
        section: &str,
        scope: Option<&str>,
    ) -> Resolution<Vec<ContentRecord>> {
        let tiers = self.collect_tiers(ctx, section, scope).await;
        match tiers.pick(|records| !records.is_empty()) {
            Some((source, tenant_id, records)) => {
                let mut items = records.as_ref().clone();
                items.sort_by_key(order_key);
                Resolution {
                    data: Some(items),
                    source,
                    tenant_id,
                }
            }
            None => Resolution::none(),
        }
    }

    /// Resolve primary page content under the strict-tenant rule: a bound,
    /// non-baseline tenant only gets its own record, otherwise not-found.
    pub async fn resolve_page(
        &self,
        ctx: &TenantContext,
        section: &str,
        scope: Option<&str>,
    ) -> SiteResult<Resolution<ContentRecord>> {
        let (resolution, all_failed) = self.resolve_single(ctx, section, scope).await;

        if resolution.is_none() && all_failed {
            return Err(SiteError::unavailable(format!("Content store unavailable for {section}"))
                .with_data(json!({ "section": section, "scope": scope }))
                .into_anyhow());
        }

        if resolution.is_none() {
            return Err(SiteError::not_found(format!("No content for {section}"))
                .with_data(json!({ "section": section, "scope": scope }))
                .into_anyhow());
        }

        if ctx.is_strict() && !resolution.is_tenant_specific() {
            tracing::debug!(
                section,
                scope,
                tenant = ?ctx.tenant_id(),
                source = ?resolution.source,
                "page withheld: no tenant-specific content"
            );
            return Err(SiteError::not_found(format!("No content for {section}"))
                .with_data(json!({ "section": section, "scope": scope }))
                .into_anyhow());
        }

        Ok(resolution)
    }

    /// Resolve and decode a section into a typed view.
    pub async fn resolve_as<T: DeserializeOwned>(
        &self,
        ctx: &TenantContext,
        section: &str,
        scope: Option<&str>,
    ) -> Resolution<T> {
        let resolution = self.resolve(ctx, section, scope).await;
        let source = resolution.source;
        match resolution.decode::<T>() {
            Ok(typed) => typed,
            Err(err) => {
                tracing::warn!(section, ?source, error = %err, "section payload did not decode");
                Resolution::none()
            }
        }
    }

    /// Resolve every section of a page concurrently, in request order.
    pub async fn resolve_many(
        &self,
        ctx: &TenantContext,
        sections: &[SectionRequest],
    ) -> Vec<Resolution<ContentRecord>> {
        join_all(
            sections
                .iter()
                .map(|s| self.resolve(ctx, &s.section, s.scope.as_deref())),
        )
        .await
    }

    /// Drop every cached tier result.
    pub fn invalidate_all(&self) {
        self.tiers.clear();
    }
}
