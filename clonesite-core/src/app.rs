use std::sync::Arc;

use crate::config::SiteConfig;
use crate::domain::{DomainResolver, RequestMeta};
use crate::gate::PageGate;
use crate::registry::TenantRegistry;
use crate::resolve::ContentResolver;
use crate::sitemap::RouteEnumerator;
use crate::store::ContentStore;
use crate::tenant::TenantContext;

struct SiteAppInner {
    config: SiteConfig,
    store: Arc<dyn ContentStore>,
    registry: Arc<TenantRegistry>,
    domains: Arc<DomainResolver>,
    resolver: Arc<ContentResolver>,
    gate: Arc<PageGate>,
    routes: RouteEnumerator,
}

/// SiteApp is the central container for one process.
///
/// It owns every cache (tenant list, host lookups, tier queries, family
/// flags) and hands out the components that use them. Cloning is cheap and
/// shares the same caches.
#[derive(Clone)]
pub struct SiteApp {
    inner: Arc<SiteAppInner>,
}

impl SiteApp {
    pub fn new(store: Arc<dyn ContentStore>, config: SiteConfig) -> Self {
        let registry = Arc::new(TenantRegistry::new(
            Arc::clone(&store),
            config.tenant_cache_ttl,
        ));
        let domains = Arc::new(DomainResolver::new(Arc::clone(&registry), &config));
        let resolver = Arc::new(ContentResolver::new(
            Arc::clone(&store),
            Arc::clone(&registry),
            &config,
        ));
        let gate = Arc::new(PageGate::new(Arc::clone(&resolver), &config));
        let routes = RouteEnumerator::new(
            Arc::clone(&domains),
            Arc::clone(&registry),
            Arc::clone(&resolver),
            Arc::clone(&gate),
        );

        Self {
            inner: Arc::new(SiteAppInner {
                config,
                store,
                registry,
                domains,
                resolver,
                gate,
                routes,
            }),
        }
    }

    pub fn config(&self) -> &SiteConfig {
        &self.inner.config
    }

    pub fn store(&self) -> &Arc<dyn ContentStore> {
        &self.inner.store
    }

    pub fn registry(&self) -> &TenantRegistry {
        &self.inner.registry
    }

    pub fn domains(&self) -> &DomainResolver {
        &self.inner.domains
    }

    pub fn resolver(&self) -> &ContentResolver {
        &self.inner.resolver
    }

    pub fn gate(&self) -> &PageGate {
        &self.inner.gate
    }

    pub fn routes(&self) -> &RouteEnumerator {
        &self.inner.routes
    }

    /// Request → tenant context, degrading to global on any miss.
    pub async fn context_for_request(&self, req: &RequestMeta) -> TenantContext {
        self.inner.domains.context_for_request(req).await
    }

    /// Drop every cache so the next request sees current content.
    pub fn invalidate_all(&self) {
        self.inner.registry.invalidate();
        self.inner.domains.invalidate();
        self.inner.resolver.invalidate_all();
        self.inner.gate.invalidate_all();
        tracing::info!("all content caches invalidated");
    }
}
