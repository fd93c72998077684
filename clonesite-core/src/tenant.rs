//! Tenant ("clone") types.
//!
//! A tenant is one branded instance of the site. Exactly one active tenant is
//! expected to be the baseline template; records assigned to it are the
//! second tier of content resolution.

use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Opaque tenant identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TenantId(pub String);

impl TenantId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TenantId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for TenantId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for TenantId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

/// A category of pages that can be switched on or off per tenant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum PageFamily {
    Subjects,
    Curricula,
    Locations,
    Blog,
}

impl PageFamily {
    pub const ALL: [PageFamily; 4] = [
        PageFamily::Subjects,
        PageFamily::Curricula,
        PageFamily::Locations,
        PageFamily::Blog,
    ];

    /// Content section type holding this family's page records.
    pub fn section(&self) -> &'static str {
        match self {
            PageFamily::Subjects => "subjectPage",
            PageFamily::Curricula => "curriculumPage",
            PageFamily::Locations => "locationPage",
            PageFamily::Blog => "blogPost",
        }
    }

    /// Public route prefix, e.g. `/subjects`.
    pub fn route_prefix(&self) -> &'static str {
        match self {
            PageFamily::Subjects => "/subjects",
            PageFamily::Curricula => "/curricula",
            PageFamily::Locations => "/locations",
            PageFamily::Blog => "/blog",
        }
    }

    pub fn parse(raw: &str) -> Option<PageFamily> {
        match raw {
            "subjects" => Some(PageFamily::Subjects),
            "curricula" => Some(PageFamily::Curricula),
            "locations" => Some(PageFamily::Locations),
            "blog" => Some(PageFamily::Blog),
            _ => None,
        }
    }

    /// The family whose page records live in `section`.
    pub fn for_section(section: &str) -> Option<PageFamily> {
        Self::ALL.into_iter().find(|family| family.section() == section)
    }

    /// The family a site-relative href belongs to, if any.
    pub fn for_href(href: &str) -> Option<PageFamily> {
        Self::ALL.into_iter().find(|family| {
            let prefix = family.route_prefix();
            href == prefix
                || href
                    .strip_prefix(prefix)
                    .is_some_and(|rest| rest.starts_with('/') || rest.starts_with('?'))
        })
    }
}

/// Tenant-level feature flags edited in the CMS.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TenantFeatures {
    /// Suppresses every page family; only the homepage is served.
    pub homepage_only: bool,
    /// Exclusivity flag: when set, every other family is forced off.
    pub only: Option<PageFamily>,
    /// Families explicitly switched off.
    pub disabled: BTreeSet<PageFamily>,
}

impl TenantFeatures {
    /// Whether the flags alone already rule `family` out.
    pub fn suppresses(&self, family: PageFamily) -> bool {
        if self.homepage_only || self.disabled.contains(&family) {
            return true;
        }
        matches!(self.only, Some(only) if only != family)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Tenant {
    pub id: TenantId,
    pub name: String,
    #[serde(default)]
    pub is_baseline: bool,
    #[serde(default = "default_true")]
    pub is_active: bool,
    #[serde(default)]
    pub domains: Vec<String>,
    #[serde(default)]
    pub features: TenantFeatures,
}

fn default_true() -> bool {
    true
}

impl Tenant {
    pub fn new(id: impl Into<TenantId>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            is_baseline: false,
            is_active: true,
            domains: Vec::new(),
            features: TenantFeatures::default(),
        }
    }

    pub fn baseline(mut self) -> Self {
        self.is_baseline = true;
        self
    }

    pub fn inactive(mut self) -> Self {
        self.is_active = false;
        self
    }

    pub fn with_domain(mut self, domain: impl Into<String>) -> Self {
        self.domains.push(domain.into());
        self
    }

    pub fn with_features(mut self, features: TenantFeatures) -> Self {
        self.features = features;
        self
    }
}

/// Context carried with every resolution call.
///
/// `tenant` is `None` for the global context: no override, no domain match,
/// or an id the registry does not know.
#[derive(Debug, Clone, Default)]
pub struct TenantContext {
    pub tenant: Option<Tenant>,
}

impl TenantContext {
    pub fn global() -> Self {
        Self { tenant: None }
    }

    pub fn for_tenant(tenant: Tenant) -> Self {
        Self {
            tenant: Some(tenant),
        }
    }

    pub fn tenant_id(&self) -> Option<&TenantId> {
        self.tenant.as_ref().map(|t| &t.id)
    }

    /// Bound to a tenant that is not the baseline template.
    pub fn is_strict(&self) -> bool {
        self.tenant.as_ref().is_some_and(|t| !t.is_baseline)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn href_family_detection() {
        assert_eq!(PageFamily::for_href("/subjects"), Some(PageFamily::Subjects));
        assert_eq!(PageFamily::for_href("/blog/first-post"), Some(PageFamily::Blog));
        assert_eq!(PageFamily::for_href("/blogroll"), None);
        assert_eq!(PageFamily::for_href("/contact"), None);
    }

    #[test]
    fn page_sections_map_back_to_families() {
        assert_eq!(PageFamily::for_section("blogPost"), Some(PageFamily::Blog));
        assert_eq!(
            PageFamily::for_section("locationPage"),
            Some(PageFamily::Locations)
        );
        assert_eq!(PageFamily::for_section("hero"), None);
    }

    #[test]
    fn features_suppress_families() {
        let only = TenantFeatures {
            only: Some(PageFamily::Subjects),
            ..Default::default()
        };
        assert!(!only.suppresses(PageFamily::Subjects));
        assert!(only.suppresses(PageFamily::Blog));

        let home = TenantFeatures {
            homepage_only: true,
            ..Default::default()
        };
        assert!(PageFamily::ALL.iter().all(|f| home.suppresses(*f)));
    }

    #[test]
    fn tenant_deserializes_with_defaults() {
        let tenant: Tenant = serde_json::from_value(serde_json::json!({
            "id": "acme",
            "name": "Acme Tutors",
            "domains": ["acme-tutors.com"],
            "features": { "disabled": ["blog"] }
        }))
        .unwrap();
        assert!(tenant.is_active);
        assert!(!tenant.is_baseline);
        assert!(tenant.features.disabled.contains(&PageFamily::Blog));
    }
}
