//! clonesite-core: framework-agnostic core for multi-tenant cloned sites.
//!
//! Requests are mapped to a tenant by the [`DomainResolver`], every content
//! section goes through the three-tier [`ContentResolver`], and the
//! [`PageGate`] / [`RouteEnumerator`] decide what pages and routes exist.

pub mod app;
pub mod cache;
pub mod config;
pub mod domain;
pub mod errors;
pub mod gate;
pub mod memory;
pub mod registry;
pub mod resolve;
pub mod sections;
pub mod sitemap;
pub mod store;
pub mod tenant;

pub use app::SiteApp;
pub use cache::{TtlCache, TtlCell};
pub use config::{SiteConfig, SiteConfigSnapshot, SiteConfigStore};
pub use domain::{canonical_base, normalize_host, DomainResolver, RequestMeta};
pub use errors::{ErrorKind, SiteError, SiteResult};
pub use gate::{EnabledFamilies, NavigationView, PageGate};
pub use memory::{MemoryStore, Seed};
pub use registry::TenantRegistry;
pub use resolve::{ContentResolver, ContentSource, Resolution, SectionRequest};
pub use sitemap::{render_sitemap_xml, ChangeFrequency, RobotsRules, RouteEnumerator, SitemapEntry};
pub use store::{ContentQuery, ContentRecord, ContentStore, StoreError, StoreResult, TenantFilter};
pub use tenant::{PageFamily, Tenant, TenantContext, TenantFeatures, TenantId};
