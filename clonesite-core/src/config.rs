//! # Configuration
//!
//! A plain string key/value store in the spirit of Feathers' `app.set()` /
//! `app.get()`, plus a typed [`SiteConfig`] read from a snapshot of it.
//!
//! ```rust
//! use clonesite_core::config::{SiteConfig, SiteConfigStore};
//!
//! let mut store = SiteConfigStore::new();
//! store.set("content.cache_ttl_secs", "30");
//!
//! let config = SiteConfig::from_snapshot(&store.snapshot());
//! assert_eq!(config.content_cache_ttl.as_secs(), 30);
//! assert_eq!(config.tenant_cache_ttl.as_secs(), 600);
//! ```
//!
//! Environment overrides use a prefix and `__` as the separator:
//! `CLONESITE__TENANTS__CACHE_TTL_SECS=30` sets `tenants.cache_ttl_secs`.

use std::collections::HashMap;
use std::time::Duration;

pub const ENV_PREFIX: &str = "CLONESITE__";

#[derive(Debug, Default)]
pub struct SiteConfigStore {
    values: HashMap<String, String>,
}

impl SiteConfigStore {
    pub fn new() -> Self {
        Self {
            values: HashMap::new(),
        }
    }

    pub fn set<K, V>(&mut self, key: K, value: V)
    where
        K: Into<String>,
        V: Into<String>,
    {
        self.values.insert(key.into(), value.into());
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(|s| s.as_str())
    }

    pub fn has(&self, key: &str) -> bool {
        self.values.contains_key(key)
    }

    /// Copy every `<prefix>A__B_C` variable into `a.b_c`.
    pub fn load_env(&mut self, prefix: &str) {
        self.load_vars(prefix, std::env::vars());
    }

    pub fn load_vars<I>(&mut self, prefix: &str, vars: I)
    where
        I: IntoIterator<Item = (String, String)>,
    {
        for (key, value) in vars {
            if let Some(stripped) = key.strip_prefix(prefix) {
                let normalized = stripped.to_lowercase().replace("__", ".");
                self.set(normalized, value);
            }
        }
    }

    pub fn snapshot(&self) -> SiteConfigSnapshot {
        SiteConfigSnapshot::new(self.values.clone())
    }
}

#[derive(Debug, Clone, Default)]
pub struct SiteConfigSnapshot {
    map: HashMap<String, String>,
}

impl SiteConfigSnapshot {
    pub(crate) fn new(map: HashMap<String, String>) -> Self {
        Self { map }
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.map.get(key).map(|s| s.as_str())
    }

    pub fn get_string(&self, key: &str) -> Option<String> {
        self.map.get(key).cloned()
    }

    pub fn get_u64(&self, key: &str) -> Option<u64> {
        self.get(key).and_then(|v| v.trim().parse::<u64>().ok())
    }

    pub fn get_bool(&self, key: &str) -> Option<bool> {
        self.get(key).and_then(|v| v.trim().parse::<bool>().ok())
    }
}

/// Typed settings for the resolution engine.
#[derive(Debug, Clone)]
pub struct SiteConfig {
    /// How long the tenant list is trusted before a refetch.
    pub tenant_cache_ttl: Duration,
    /// How long a host → tenant mapping is cached.
    pub domain_cache_ttl: Duration,
    /// How long one tier query result is cached.
    pub content_cache_ttl: Duration,
    /// Upper bound for a single tier query; a timeout is a tier miss.
    pub query_timeout: Duration,
    /// Upper bound on entries in each keyed cache.
    pub cache_capacity: u64,
    /// Freshness hint forwarded to the content store.
    pub revalidate: Option<Duration>,
    pub override_header: String,
    pub override_query: String,
    pub allow_query_override: bool,
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            tenant_cache_ttl: Duration::from_secs(600),
            domain_cache_ttl: Duration::from_secs(60),
            content_cache_ttl: Duration::from_secs(60),
            query_timeout: Duration::from_millis(2000),
            cache_capacity: 10_000,
            revalidate: Some(Duration::from_secs(60)),
            override_header: "x-clone-id".to_string(),
            override_query: "cloneId".to_string(),
            allow_query_override: false,
        }
    }
}

impl SiteConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_snapshot(cfg: &SiteConfigSnapshot) -> Self {
        let d = Self::default();
        Self {
            tenant_cache_ttl: cfg
                .get_u64("tenants.cache_ttl_secs")
                .map(Duration::from_secs)
                .unwrap_or(d.tenant_cache_ttl),
            domain_cache_ttl: cfg
                .get_u64("domains.cache_ttl_secs")
                .map(Duration::from_secs)
                .unwrap_or(d.domain_cache_ttl),
            content_cache_ttl: cfg
                .get_u64("content.cache_ttl_secs")
                .map(Duration::from_secs)
                .unwrap_or(d.content_cache_ttl),
            query_timeout: cfg
                .get_u64("content.query_timeout_ms")
                .map(Duration::from_millis)
                .unwrap_or(d.query_timeout),
            cache_capacity: cfg
                .get_u64("cache.max_entries")
                .filter(|n| *n > 0)
                .unwrap_or(d.cache_capacity),
            revalidate: match cfg.get_u64("content.revalidate_secs") {
                Some(0) => None,
                Some(secs) => Some(Duration::from_secs(secs)),
                None => d.revalidate,
            },
            override_header: cfg
                .get_string("tenant.override_header")
                .map(|h| h.to_ascii_lowercase())
                .unwrap_or(d.override_header),
            override_query: cfg
                .get_string("tenant.override_query")
                .unwrap_or(d.override_query),
            allow_query_override: cfg
                .get_bool("tenant.allow_query_override")
                .unwrap_or(d.allow_query_override),
        }
    }

    pub fn with_tenant_cache_ttl(mut self, ttl: Duration) -> Self {
        self.tenant_cache_ttl = ttl;
        self
    }

    pub fn with_domain_cache_ttl(mut self, ttl: Duration) -> Self {
        self.domain_cache_ttl = ttl;
        self
    }

    pub fn with_content_cache_ttl(mut self, ttl: Duration) -> Self {
        self.content_cache_ttl = ttl;
        self
    }

    pub fn with_query_timeout(mut self, timeout: Duration) -> Self {
        self.query_timeout = timeout;
        self
    }

    pub fn with_cache_capacity(mut self, capacity: u64) -> Self {
        self.cache_capacity = capacity;
        self
    }

    pub fn allow_query_override(mut self) -> Self {
        self.allow_query_override = true;
        self
    }
}
