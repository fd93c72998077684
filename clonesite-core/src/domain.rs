//! Host normalization and request → tenant resolution.

use std::sync::Arc;

use crate::cache::TtlCache;
use crate::config::SiteConfig;
use crate::registry::TenantRegistry;
use crate::tenant::{TenantContext, TenantId};

/// Lower-case, drop any port and a leading `www.`.
///
/// `WWW.Example.com:443` → `example.com`. Returns `None` for blank input.
pub fn normalize_host(raw: &str) -> Option<String> {
    let raw = raw.trim().to_ascii_lowercase();
    let raw = raw
        .strip_prefix("https://")
        .or_else(|| raw.strip_prefix("http://"))
        .unwrap_or(&raw);
    let raw = raw.split('/').next().unwrap_or_default();

    let host = if raw.starts_with('[') {
        // bracketed IPv6, keep the brackets
        match raw.find(']') {
            Some(end) => &raw[..=end],
            None => raw,
        }
    } else {
        raw.split(':').next().unwrap_or_default()
    };

    let host = host.trim_end_matches('.');
    let host = host.strip_prefix("www.").unwrap_or(host);
    if host.is_empty() {
        None
    } else {
        Some(host.to_string())
    }
}

/// `localhost`, loopback addresses and `.local` names.
pub fn is_local_host(host: &str) -> bool {
    let Some(host) = normalize_host(host) else {
        return false;
    };
    matches!(
        host.as_str(),
        "localhost" | "127.0.0.1" | "0.0.0.0" | "[::1]" | "::1"
    ) || host.ends_with(".local")
        || host.ends_with(".localhost")
}

/// Absolute base URL used for every emitted link on `raw_host`.
///
/// Production hosts are forced to `https://www.<host>`; local hosts keep
/// their port and use plain http.
pub fn canonical_base(raw_host: &str) -> Option<String> {
    let first = raw_host.split(',').next().unwrap_or_default().trim();
    if is_local_host(first) {
        let with_port = first.to_ascii_lowercase();
        let with_port = with_port.trim_end_matches('/');
        return Some(format!("http://{with_port}"));
    }
    normalize_host(first).map(|host| format!("https://www.{host}"))
}

/// What the core needs from an inbound request.
#[derive(Debug, Clone, Default)]
pub struct RequestMeta {
    pub host: Option<String>,
    pub forwarded_host: Option<String>,
    /// Tenant id set by an upstream edge layer.
    pub override_header: Option<String>,
    /// Debug-only tenant id from the query string.
    pub override_query: Option<String>,
}

impl RequestMeta {
    pub fn for_host(host: impl Into<String>) -> Self {
        Self {
            host: Some(host.into()),
            ..Default::default()
        }
    }

    pub fn with_forwarded_host(mut self, value: impl Into<String>) -> Self {
        self.forwarded_host = Some(value.into());
        self
    }

    pub fn with_override_header(mut self, value: impl Into<String>) -> Self {
        self.override_header = Some(value.into());
        self
    }

    pub fn with_override_query(mut self, value: impl Into<String>) -> Self {
        self.override_query = Some(value.into());
        self
    }

    /// The first forwarded host if present, else the `host` header.
    pub fn request_host(&self) -> Option<&str> {
        self.forwarded_host
            .as_deref()
            .and_then(|v| v.split(',').next())
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .or_else(|| self.host.as_deref().map(str::trim).filter(|v| !v.is_empty()))
    }
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

/// Maps a request to a tenant id: explicit override first, then the
/// registry's domain bindings. `None` is the global context, not an error.
pub struct DomainResolver {
    registry: Arc<TenantRegistry>,
    hosts: TtlCache<String, Option<TenantId>>,
    allow_query_override: bool,
}

impl DomainResolver {
    pub fn new(registry: Arc<TenantRegistry>, config: &SiteConfig) -> Self {
        Self {
            registry,
            hosts: TtlCache::new(config.domain_cache_ttl, config.cache_capacity),
            allow_query_override: config.allow_query_override,
        }
    }

    pub async fn resolve_tenant_for_request(&self, req: &RequestMeta) -> Option<TenantId> {
        // Overrides are trusted as-is; the id is validated where it is used.
        if let Some(id) = non_empty(req.override_header.as_deref()) {
            tracing::debug!(tenant = id, "tenant from override header");
            return Some(TenantId::from(id));
        }
        if self.allow_query_override {
            if let Some(id) = non_empty(req.override_query.as_deref()) {
                tracing::debug!(tenant = id, "tenant from query override");
                return Some(TenantId::from(id));
            }
        }

        let host = normalize_host(req.request_host()?)?;
        self.tenant_for_host(host).await
    }

    async fn tenant_for_host(&self, host: String) -> Option<TenantId> {
        if let Some(hit) = self.hosts.get(&host) {
            return hit;
        }
        let found = self
            .registry
            .get_tenant_by_domain(&host)
            .await
            .map(|t| t.id);
        tracing::debug!(%host, tenant = ?found, "tenant from domain");
        self.hosts.insert(host, found.clone());
        found
    }

    /// Turn an optional id into a context. Unknown or inactive ids degrade
    /// to the global context.
    pub async fn context_for(&self, tenant_id: Option<TenantId>) -> TenantContext {
        let Some(id) = tenant_id else {
            return TenantContext::global();
        };
        match self.registry.get_tenant_by_id(&id).await {
            Some(tenant) => TenantContext::for_tenant(tenant),
            None => {
                tracing::warn!(tenant = %id, "unknown or inactive tenant, using global context");
                TenantContext::global()
            }
        }
    }

    pub async fn context_for_request(&self, req: &RequestMeta) -> TenantContext {
        let id = self.resolve_tenant_for_request(req).await;
        self.context_for(id).await
    }

    pub fn invalidate(&self) {
        self.hosts.clear();
    }
}
