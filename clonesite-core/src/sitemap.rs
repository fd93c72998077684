//! Public route enumeration, sitemap XML and robots rules.

use std::collections::BTreeMap;
use std::fmt::Write as _;
use std::sync::Arc;

use chrono::{DateTime, SecondsFormat, Utc};
use serde::Serialize;

use crate::domain::{canonical_base, DomainResolver, RequestMeta};
use crate::gate::PageGate;
use crate::registry::TenantRegistry;
use crate::resolve::ContentResolver;
use crate::sections;
use crate::store::{ContentRecord, TenantFilter};
use crate::tenant::{PageFamily, TenantContext};

pub const HOMEPAGE_PRIORITY: f32 = 1.0;
pub const PAGE_PRIORITY: f32 = 0.8;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ChangeFrequency {
    Daily,
    Weekly,
}

impl ChangeFrequency {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChangeFrequency::Daily => "daily",
            ChangeFrequency::Weekly => "weekly",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SitemapEntry {
    pub url: String,
    pub path: String,
    pub last_modified: DateTime<Utc>,
    pub change_frequency: ChangeFrequency,
    pub priority: f32,
}

/// Walks the enabled page families of a tenant and lists its public routes.
pub struct RouteEnumerator {
    domains: Arc<DomainResolver>,
    registry: Arc<TenantRegistry>,
    resolver: Arc<ContentResolver>,
    gate: Arc<PageGate>,
}

impl RouteEnumerator {
    pub fn new(
        domains: Arc<DomainResolver>,
        registry: Arc<TenantRegistry>,
        resolver: Arc<ContentResolver>,
        gate: Arc<PageGate>,
    ) -> Self {
        Self {
            domains,
            registry,
            resolver,
            gate,
        }
    }

    pub async fn enumerate_routes(&self, domain: &str) -> Vec<SitemapEntry> {
        self.enumerate_for_request(&RequestMeta::for_host(domain))
            .await
    }

    pub async fn enumerate_for_request(&self, req: &RequestMeta) -> Vec<SitemapEntry> {
        let Some(base) = req.request_host().and_then(canonical_base) else {
            return Vec::new();
        };
        let ctx = self.domains.context_for_request(req).await;
        self.enumerate_for(&ctx, &base).await
    }

    /// Homepage first, then every page of every enabled family. Page lists
    /// are inclusive (tenant, baseline and unassigned records); when the
    /// same path shows up more than once the newest record wins.
    pub async fn enumerate_for(&self, ctx: &TenantContext, base: &str) -> Vec<SitemapEntry> {
        let families = self.gate.compute_enabled_families(ctx).await;
        let baseline = self.registry.get_baseline_tenant().await.map(|t| t.id);
        let filter = TenantFilter::AnyOf {
            tenant: ctx.tenant_id().cloned(),
            baseline,
        };

        let home = self.resolver.resolve(ctx, sections::HOME_PAGE, None);
        let lists = futures::future::join_all(families.enabled().map(|family| {
            let filter = filter.clone();
            async move {
                let records = self
                    .resolver
                    .fetch_cached(family.section(), filter, None)
                    .await
                    .unwrap_or_default();
                (family, records)
            }
        }));
        let (home, lists) = futures::join!(home, lists);

        let mut by_path: BTreeMap<String, ContentRecord> = BTreeMap::new();
        for (family, records) in lists {
            for record in records.iter() {
                let Some(path) = page_path(family, record) else {
                    continue;
                };
                match by_path.get(&path) {
                    Some(existing) if !record.is_newer_than(existing) => {}
                    _ => {
                        by_path.insert(path, record.clone());
                    }
                }
            }
        }

        let mut entries = Vec::with_capacity(by_path.len() + 1);
        entries.push(SitemapEntry {
            url: format!("{base}/"),
            path: "/".to_string(),
            last_modified: home.data.map(|r| r.updated_at).unwrap_or_else(Utc::now),
            change_frequency: ChangeFrequency::Daily,
            priority: HOMEPAGE_PRIORITY,
        });
        entries.extend(by_path.into_iter().map(|(path, record)| SitemapEntry {
            url: format!("{base}{path}"),
            path,
            last_modified: record.updated_at,
            change_frequency: ChangeFrequency::Weekly,
            priority: PAGE_PRIORITY,
        }));

        tracing::debug!(
            tenant = ?ctx.tenant_id(),
            routes = entries.len(),
            "routes enumerated"
        );
        entries
    }
}

fn page_path(family: PageFamily, record: &ContentRecord) -> Option<String> {
    let slug = record.route_slug()?;
    Some(format!("{}/{slug}", family.route_prefix()))
}

fn xml_escape(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            c => out.push(c),
        }
    }
    out
}

/// sitemaps.org `urlset` document.
pub fn render_sitemap_xml(entries: &[SitemapEntry]) -> String {
    let mut xml = String::from(
        "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n\
         <urlset xmlns=\"http://www.sitemaps.org/schemas/sitemap/0.9\">\n",
    );
    for entry in entries {
        let _ = write!(
            xml,
            "  <url>\n    <loc>{}</loc>\n    <lastmod>{}</lastmod>\n    \
             <changefreq>{}</changefreq>\n    <priority>{:.1}</priority>\n  </url>\n",
            xml_escape(&entry.url),
            entry.last_modified.to_rfc3339_opts(SecondsFormat::Secs, true),
            entry.change_frequency.as_str(),
            entry.priority,
        );
    }
    xml.push_str("</urlset>\n");
    xml
}

/// Fixed crawl rules plus the per-domain sitemap reference.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RobotsRules {
    pub allow: Vec<&'static str>,
    pub disallow: Vec<&'static str>,
    pub sitemap: String,
}

impl RobotsRules {
    pub fn for_base(base: &str) -> Self {
        Self {
            allow: vec!["/"],
            disallow: vec!["/api/", "/admin/", "/_build/", "/studio/"],
            sitemap: format!("{base}/sitemap.xml"),
        }
    }

    pub fn render(&self) -> String {
        let mut out = String::from("User-agent: *\n");
        for path in &self.allow {
            let _ = writeln!(out, "Allow: {path}");
        }
        for path in &self.disallow {
            let _ = writeln!(out, "Disallow: {path}");
        }
        let _ = writeln!(out, "\nSitemap: {}", self.sitemap);
        out
    }
}
