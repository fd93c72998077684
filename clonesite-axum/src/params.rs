use std::collections::HashMap;

use axum::http::header::HOST;
use axum::http::HeaderMap;
use clonesite_core::{RequestMeta, SiteConfig};

pub const FORWARDED_HOST: &str = "x-forwarded-host";

fn header_str(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(|s| s.to_string())
}

/// Pull the tenant-relevant request metadata out of headers and query.
pub fn request_meta(
    headers: &HeaderMap,
    query: &HashMap<String, String>,
    config: &SiteConfig,
) -> RequestMeta {
    RequestMeta {
        host: headers
            .get(HOST)
            .and_then(|v| v.to_str().ok())
            .map(|s| s.to_string()),
        forwarded_host: header_str(headers, FORWARDED_HOST),
        override_header: header_str(headers, &config.override_header),
        override_query: query.get(&config.override_query).cloned(),
    }
}

/// Optional scoping key, `?scope=physics`.
pub fn scope_param(query: &HashMap<String, String>) -> Option<&str> {
    query
        .get("scope")
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn reads_host_forwarded_host_and_override() {
        let mut headers = HeaderMap::new();
        headers.insert(HOST, HeaderValue::from_static("internal:8080"));
        headers.insert(FORWARDED_HOST, HeaderValue::from_static("acme-tutors.com, edge"));
        headers.insert("x-clone-id", HeaderValue::from_static("acme"));
        let query = HashMap::from([("cloneId".to_string(), "blue".to_string())]);

        let meta = request_meta(&headers, &query, &SiteConfig::default());
        assert_eq!(meta.request_host(), Some("acme-tutors.com"));
        assert_eq!(meta.override_header.as_deref(), Some("acme"));
        assert_eq!(meta.override_query.as_deref(), Some("blue"));
    }

    #[test]
    fn blank_scope_is_ignored() {
        let query = HashMap::from([("scope".to_string(), "  ".to_string())]);
        assert_eq!(scope_param(&query), None);
    }
}
