use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Mutex;

use crate::cache::TtlCell;
use crate::domain::normalize_host;
use crate::store::ContentStore;
use crate::tenant::{Tenant, TenantId};

/// The set of known tenants, refetched from the content store once the
/// cached list is older than the TTL.
///
/// Lookups never fail: a store error is logged and the last-known-good list
/// (or an empty one) is used, which degrades callers to the global context.
pub struct TenantRegistry {
    store: Arc<dyn ContentStore>,
    tenants: TtlCell<Arc<Vec<Tenant>>>,
    // Single-flight guard: concurrent refreshes collapse into one fetch.
    refresh_lock: Mutex<()>,
}

impl TenantRegistry {
    pub fn new(store: Arc<dyn ContentStore>, ttl: Duration) -> Self {
        Self {
            store,
            tenants: TtlCell::new(ttl),
            refresh_lock: Mutex::new(()),
        }
    }

    /// Active tenants, baseline first, then alphabetical by display name.
    pub async fn list_active_tenants(&self) -> Arc<Vec<Tenant>> {
        if let Some(tenants) = self.tenants.get_fresh() {
            return tenants;
        }

        let _guard = self.refresh_lock.lock().await;
        // Someone else may have refreshed while we waited.
        if let Some(tenants) = self.tenants.get_fresh() {
            return tenants;
        }

        match self.store.fetch_tenants().await {
            Ok(all) => {
                let tenants = Arc::new(order_active(all));
                check_configuration(&tenants);
                tracing::debug!(count = tenants.len(), "tenant registry refreshed");
                self.tenants.set(Arc::clone(&tenants));
                tenants
            }
            Err(err) => {
                let fallback = self.tenants.get_stale();
                tracing::error!(
                    error = %err,
                    have_stale = fallback.is_some(),
                    "tenant registry refresh failed"
                );
                fallback.unwrap_or_default()
            }
        }
    }

    /// Match a request host against the bound domains of active tenants.
    pub async fn get_tenant_by_domain(&self, hostname: &str) -> Option<Tenant> {
        let host = normalize_host(hostname)?;
        let www = format!("www.{host}");
        let tenants = self.list_active_tenants().await;
        tenants
            .iter()
            .find(|t| {
                t.domains.iter().any(|d| {
                    let d = d.trim().to_ascii_lowercase();
                    d == host || d == www
                })
            })
            .cloned()
    }

    /// The active baseline tenant, if one is configured.
    pub async fn get_baseline_tenant(&self) -> Option<Tenant> {
        let tenants = self.list_active_tenants().await;
        tenants.iter().find(|t| t.is_baseline).cloned()
    }

    /// Direct lookup by id among active tenants.
    pub async fn get_tenant_by_id(&self, id: &TenantId) -> Option<Tenant> {
        let tenants = self.list_active_tenants().await;
        tenants.iter().find(|t| &t.id == id).cloned()
    }

    /// Force the next lookup to refetch.
    pub fn invalidate(&self) {
        self.tenants.invalidate();
    }
}

fn order_active(all: Vec<Tenant>) -> Vec<Tenant> {
    let mut active: Vec<Tenant> = all.into_iter().filter(|t| t.is_active).collect();
    active.sort_by(|a, b| {
        b.is_baseline
            .cmp(&a.is_baseline)
            .then_with(|| a.name.to_lowercase().cmp(&b.name.to_lowercase()))
    });
    active
}

fn check_configuration(tenants: &[Tenant]) {
    let baselines: Vec<&str> = tenants
        .iter()
        .filter(|t| t.is_baseline)
        .map(|t| t.id.as_str())
        .collect();
    match baselines.len() {
        0 => tracing::warn!("no active baseline tenant configured"),
        1 => {}
        _ => tracing::error!(
            tenants = ?baselines,
            using = baselines[0],
            "several active tenants are marked as baseline"
        ),
    }

    let mut owners: HashMap<String, &TenantId> = HashMap::new();
    for tenant in tenants {
        for domain in &tenant.domains {
            let Some(host) = normalize_host(domain) else {
                continue;
            };
            match owners.get(&host) {
                Some(owner) if *owner != &tenant.id => tracing::error!(
                    domain = %host,
                    owner = %owner,
                    ignored = %tenant.id,
                    "domain bound to more than one active tenant"
                ),
                Some(_) => {}
                None => {
                    owners.insert(host, &tenant.id);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryStore;
    use crate::store::{ContentQuery, ContentRecord, StoreError, StoreResult};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

    fn registry_with(tenants: Vec<Tenant>) -> TenantRegistry {
        let store = MemoryStore::from_seed(crate::memory::Seed {
            tenants,
            records: vec![],
        });
        TenantRegistry::new(Arc::new(store), Duration::from_secs(600))
    }

    #[tokio::test]
    async fn lists_baseline_first_then_by_name() {
        let registry = registry_with(vec![
            Tenant::new("z", "Zebra Tutors"),
            Tenant::new("gone", "Alpha Tutors").inactive(),
            Tenant::new("b", "beta Tutors"),
            Tenant::new("base", "Template").baseline(),
        ]);
        let ids: Vec<String> = registry
            .list_active_tenants()
            .await
            .iter()
            .map(|t| t.id.0.clone())
            .collect();
        assert_eq!(ids, ["base", "b", "z"]);
    }

    #[tokio::test]
    async fn domain_lookup_ignores_case_port_and_www() {
        let registry = registry_with(vec![
            Tenant::new("acme", "Acme").with_domain("acme-tutors.com"),
            Tenant::new("blue", "Blue").with_domain("www.blue-tutors.co.uk"),
        ]);
        for host in ["WWW.Acme-Tutors.com:443", "acme-tutors.com"] {
            let found = registry.get_tenant_by_domain(host).await.unwrap();
            assert_eq!(found.id.as_str(), "acme");
        }
        let found = registry.get_tenant_by_domain("blue-tutors.co.uk").await.unwrap();
        assert_eq!(found.id.as_str(), "blue");
        assert!(registry.get_tenant_by_domain("unknown.com").await.is_none());
    }

    #[tokio::test]
    async fn duplicate_domain_picks_first_in_registry_order() {
        let registry = registry_with(vec![
            Tenant::new("second", "Second").with_domain("shared.com"),
            Tenant::new("first", "First").with_domain("shared.com"),
        ]);
        let found = registry.get_tenant_by_domain("shared.com").await.unwrap();
        assert_eq!(found.id.as_str(), "first");
    }

    #[tokio::test]
    async fn missing_baseline_is_tolerated() {
        let registry = registry_with(vec![Tenant::new("acme", "Acme")]);
        assert!(registry.get_baseline_tenant().await.is_none());
        assert!(registry.get_tenant_by_id(&TenantId::from("acme")).await.is_some());
        assert!(registry.get_tenant_by_id(&TenantId::from("nope")).await.is_none());
    }

    struct FlakyTenants {
        fail: AtomicBool,
        calls: AtomicUsize,
    }

    #[async_trait]
    impl ContentStore for FlakyTenants {
        async fn fetch(&self, _query: &ContentQuery) -> StoreResult<Vec<ContentRecord>> {
            Ok(vec![])
        }

        async fn fetch_tenants(&self) -> StoreResult<Vec<Tenant>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail.load(Ordering::SeqCst) {
                return Err(StoreError::malformed("cms unavailable"));
            }
            Ok(vec![Tenant::new("acme", "Acme")])
        }
    }

    #[tokio::test(start_paused = true)]
    async fn refresh_failure_keeps_last_known_good_list() {
        let store = Arc::new(FlakyTenants {
            fail: AtomicBool::new(false),
            calls: AtomicUsize::new(0),
        });
        let registry = TenantRegistry::new(store.clone(), Duration::from_secs(600));

        assert_eq!(registry.list_active_tenants().await.len(), 1);
        assert_eq!(registry.list_active_tenants().await.len(), 1);
        assert_eq!(store.calls.load(Ordering::SeqCst), 1);

        store.fail.store(true, Ordering::SeqCst);
        tokio::time::advance(Duration::from_secs(601)).await;
        assert_eq!(registry.list_active_tenants().await.len(), 1);
        assert_eq!(store.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn refresh_failure_without_cache_is_empty() {
        let store = Arc::new(FlakyTenants {
            fail: AtomicBool::new(true),
            calls: AtomicUsize::new(0),
        });
        let registry = TenantRegistry::new(store, Duration::from_secs(600));
        assert!(registry.list_active_tenants().await.is_empty());
        assert!(registry.get_baseline_tenant().await.is_none());
    }
}
