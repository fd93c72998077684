//! Page availability: which page families a tenant exposes, which nav links
//! survive, and whether a single page may render at all.

use std::sync::Arc;

use serde::Serialize;
use serde_json::json;

use crate::cache::TtlCache;
use crate::config::SiteConfig;
use crate::errors::{SiteError, SiteResult};
use crate::resolve::{ContentResolver, ContentSource, Resolution};
use crate::sections::{self, NavLink, Navigation};
use crate::store::{ContentRecord, StoreResult, TenantFilter};
use crate::tenant::{PageFamily, TenantContext, TenantId};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct EnabledFamilies {
    pub subjects: bool,
    pub curricula: bool,
    pub locations: bool,
    pub blog: bool,
}

impl EnabledFamilies {
    pub fn is_enabled(&self, family: PageFamily) -> bool {
        match family {
            PageFamily::Subjects => self.subjects,
            PageFamily::Curricula => self.curricula,
            PageFamily::Locations => self.locations,
            PageFamily::Blog => self.blog,
        }
    }

    pub fn set(&mut self, family: PageFamily, enabled: bool) {
        match family {
            PageFamily::Subjects => self.subjects = enabled,
            PageFamily::Curricula => self.curricula = enabled,
            PageFamily::Locations => self.locations = enabled,
            PageFamily::Blog => self.blog = enabled,
        }
    }

    pub fn enabled(&self) -> impl Iterator<Item = PageFamily> + '_ {
        PageFamily::ALL.into_iter().filter(|f| self.is_enabled(*f))
    }

    /// Whether a site-relative link may be shown.
    pub fn allows_href(&self, href: &str) -> bool {
        PageFamily::for_href(href).map_or(true, |f| self.is_enabled(f))
    }
}

/// Navigation content after family gating.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NavigationView {
    pub families: EnabledFamilies,
    pub links: Vec<NavLink>,
    pub source: ContentSource,
}

pub struct PageGate {
    resolver: Arc<ContentResolver>,
    families: TtlCache<Option<TenantId>, EnabledFamilies>,
}

impl PageGate {
    pub fn new(resolver: Arc<ContentResolver>, config: &SiteConfig) -> Self {
        Self {
            resolver,
            families: TtlCache::new(config.content_cache_ttl, config.cache_capacity),
        }
    }

    /// Per-family enablement for `ctx`.
    ///
    /// Feature flags are checked first. Otherwise a family is on iff content
    /// for it exists in the context's own scope: the tenant's own records
    /// for a bound tenant, unassigned records for the global context.
    ///
    /// A family whose check hit a store error counts as off for this call
    /// only; the result is not cached.
    pub async fn compute_enabled_families(&self, ctx: &TenantContext) -> EnabledFamilies {
        let key = ctx.tenant_id().cloned();
        if let Some(hit) = self.families.get(&key) {
            return hit;
        }

        let features = ctx
            .tenant
            .as_ref()
            .map(|t| t.features.clone())
            .unwrap_or_default();

        let checks = PageFamily::ALL.map(|family| {
            let suppressed = features.suppresses(family);
            async move {
                if suppressed {
                    return (family, Ok(false));
                }
                (family, self.family_has_content(ctx, family).await)
            }
        });

        let mut families = EnabledFamilies::default();
        let mut degraded = false;
        for (family, enabled) in futures::future::join_all(checks).await {
            match enabled {
                Ok(enabled) => families.set(family, enabled),
                Err(_) => degraded = true,
            }
        }

        if degraded {
            tracing::warn!(tenant = ?key, ?families, "page families computed from a failing store, not cached");
        } else {
            tracing::debug!(tenant = ?key, ?families, "page families computed");
            self.families.insert(key, families);
        }
        families
    }

    async fn family_has_content(&self, ctx: &TenantContext, family: PageFamily) -> StoreResult<bool> {
        let filter = match ctx.tenant_id() {
            Some(id) => TenantFilter::Exact(id.clone()),
            None => TenantFilter::Unassigned,
        };
        let records = self
            .resolver
            .fetch_cached(family.section(), filter, None)
            .await?;
        Ok(!records.is_empty())
    }

    /// Resolve the shared navigation section and drop links into disabled
    /// families. Navigation is chrome, so it may come from any tier.
    pub async fn navigation(&self, ctx: &TenantContext) -> NavigationView {
        let (families, nav) = futures::join!(
            self.compute_enabled_families(ctx),
            self.resolver.resolve_as::<Navigation>(ctx, sections::NAVIGATION, None)
        );
        let links = nav
            .data
            .map(|n| n.links)
            .unwrap_or_default()
            .into_iter()
            .filter(|l| families.allows_href(&l.href))
            .collect();
        NavigationView {
            families,
            links,
            source: nav.source,
        }
    }

    /// Primary content for `/<family>/<slug>`, or not-found when the family
    /// is off or the strict-tenant rule withholds the page.
    pub async fn page(
        &self,
        ctx: &TenantContext,
        family: PageFamily,
        slug: &str,
    ) -> SiteResult<Resolution<ContentRecord>> {
        let families = self.compute_enabled_families(ctx).await;
        if !families.is_enabled(family) {
            return Err(SiteError::not_found(format!(
                "Page not found: {}/{slug}",
                family.route_prefix()
            ))
            .with_data(json!({ "family": family, "slug": slug }))
            .into_anyhow());
        }
        self.resolver
            .resolve_page(ctx, family.section(), Some(slug))
            .await
    }

    pub fn invalidate_all(&self) {
        self.families.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::{MemoryStore, Seed};
    use crate::registry::TenantRegistry;
    use crate::store::{ContentQuery, ContentStore, StoreError};
    use crate::tenant::Tenant;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicBool, Ordering};

    struct Blinking {
        inner: MemoryStore,
        down: AtomicBool,
    }

    #[async_trait]
    impl ContentStore for Blinking {
        async fn fetch(&self, query: &ContentQuery) -> StoreResult<Vec<ContentRecord>> {
            if self.down.load(Ordering::SeqCst) {
                return Err(StoreError::malformed("gateway timeout"));
            }
            self.inner.fetch(query).await
        }

        async fn fetch_tenants(&self) -> StoreResult<Vec<Tenant>> {
            self.inner.fetch_tenants().await
        }
    }

    #[tokio::test]
    async fn store_blip_does_not_stick_in_family_cache() {
        let acme = Tenant::new("acme", "Acme");
        let store = Arc::new(Blinking {
            inner: MemoryStore::from_seed(Seed {
                tenants: vec![acme.clone()],
                records: vec![ContentRecord::new("s1", "subjectPage")
                    .for_tenant("acme")
                    .scoped("physics")],
            }),
            down: AtomicBool::new(true),
        });
        let config = SiteConfig::default();
        let registry = Arc::new(TenantRegistry::new(store.clone(), config.tenant_cache_ttl));
        let resolver = Arc::new(ContentResolver::new(store.clone(), registry, &config));
        let gate = PageGate::new(resolver, &config);
        let ctx = TenantContext::for_tenant(acme);

        let during = gate.compute_enabled_families(&ctx).await;
        assert!(!during.subjects);

        store.down.store(false, Ordering::SeqCst);
        let after = gate.compute_enabled_families(&ctx).await;
        assert!(after.subjects);
        assert!(gate.page(&ctx, PageFamily::Subjects, "physics").await.is_ok());
    }
}
