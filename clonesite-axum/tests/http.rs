use std::sync::Arc;

use axum::body::Body;
use axum::http::{HeaderValue, Request};
use clonesite_axum::axum;
use clonesite_core::{ContentRecord, MemoryStore, Seed, SiteApp, SiteConfig, Tenant};
use http_body_util::BodyExt;
use serde_json::Value;
use tower::ServiceExt;

fn site() -> SiteApp {
    let store = MemoryStore::from_seed(Seed {
        tenants: vec![
            Tenant::new("acme", "Acme Tutors").with_domain("acme-tutors.com"),
            Tenant::new("base", "Template Tutors").baseline(),
        ],
        records: vec![
            ContentRecord::new("hero-default", "hero").with_field("heading", "Generic Tutors"),
            ContentRecord::new("hero-acme", "hero")
                .for_tenant("acme")
                .with_field("heading", "Acme Tutors"),
            ContentRecord::new("physics-base", "subjectPage")
                .for_tenant("base")
                .scoped("physics"),
            ContentRecord::new("maths-acme", "subjectPage")
                .for_tenant("acme")
                .scoped("maths"),
        ],
    });
    SiteApp::new(Arc::new(store), SiteConfig::default())
}

fn get(uri: &str, host: &str) -> Request<Body> {
    Request::builder()
        .method("GET")
        .uri(uri)
        .header("host", host)
        .body(Body::empty())
        .unwrap()
}

async fn json_body(res: axum::response::Response) -> Value {
    let bytes = res.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

async fn text_body(res: axum::response::Response) -> String {
    let bytes = res.into_body().collect().await.unwrap().to_bytes();
    String::from_utf8(bytes.to_vec()).unwrap()
}

#[tokio::test]
async fn section_resolves_tenant_hero_by_host() {
    let ax = axum(site());

    let res = ax
        .router
        .oneshot(get("/api/sections/hero", "WWW.acme-tutors.com:443"))
        .await
        .unwrap();

    assert_eq!(res.status().as_u16(), 200);
    assert!(res.headers().get("x-request-id").is_some());
    let body = json_body(res).await;
    assert_eq!(body["data"]["fields"]["heading"], "Acme Tutors");
    assert_eq!(body["source"], "tenantSpecific");
    assert_eq!(body["tenantId"], "acme");
}

#[tokio::test]
async fn unknown_host_gets_default_content() {
    let ax = axum(site());

    let res = ax
        .router
        .oneshot(get("/api/sections/hero", "nobody.example"))
        .await
        .unwrap();

    let body = json_body(res).await;
    assert_eq!(body["data"]["fields"]["heading"], "Generic Tutors");
    assert_eq!(body["source"], "default");
    assert!(body.get("tenantId").is_none());
}

#[tokio::test]
async fn missing_section_is_null_data_not_an_error() {
    let ax = axum(site());

    let res = ax
        .router
        .oneshot(get("/api/sections/faq", "acme-tutors.com"))
        .await
        .unwrap();

    assert_eq!(res.status().as_u16(), 200);
    let body = json_body(res).await;
    assert!(body["data"].is_null());
    assert_eq!(body["source"], "none");
}

#[tokio::test]
async fn override_header_selects_tenant() {
    let ax = axum(site());

    let mut req = get("/api/tenant", "nobody.example");
    req.headers_mut()
        .insert("x-clone-id", HeaderValue::from_static("acme"));
    let res = ax.router.oneshot(req).await.unwrap();

    let body = json_body(res).await;
    assert_eq!(body["tenantId"], "acme");
    assert_eq!(body["name"], "Acme Tutors");
    assert_eq!(body["isBaseline"], false);
}

#[tokio::test]
async fn baseline_only_page_is_404_for_clone() {
    let ax = axum(site());

    let res = ax
        .router
        .clone()
        .oneshot(get("/api/pages/subjects/physics", "acme-tutors.com"))
        .await
        .unwrap();
    assert_eq!(res.status().as_u16(), 404);
    let body = json_body(res).await;
    assert_eq!(body["name"], "NotFound");
    assert_eq!(body["className"], "not-found");

    let res = ax
        .router
        .oneshot(get("/api/pages/subjects/maths", "acme-tutors.com"))
        .await
        .unwrap();
    assert_eq!(res.status().as_u16(), 200);
    let body = json_body(res).await;
    assert_eq!(body["source"], "tenantSpecific");
}

#[tokio::test]
async fn unknown_page_family_is_400() {
    let ax = axum(site());

    let res = ax
        .router
        .oneshot(get("/api/pages/recipes/pie", "acme-tutors.com"))
        .await
        .unwrap();
    assert_eq!(res.status().as_u16(), 400);
    let body = json_body(res).await;
    assert_eq!(body["name"], "BadRequest");
}

#[tokio::test]
async fn page_sections_are_not_served_raw() {
    let ax = axum(site());

    for uri in [
        "/api/sections/subjectPage?scope=physics",
        "/api/collections/subjectPage",
        "/api/sections/blogPost",
    ] {
        let res = ax
            .router
            .clone()
            .oneshot(get(uri, "acme-tutors.com"))
            .await
            .unwrap();
        assert_eq!(res.status().as_u16(), 400, "{uri}");
        let body = json_body(res).await;
        assert_eq!(body["name"], "BadRequest");
        assert!(!body.to_string().contains("physics-base"));
    }
}

#[tokio::test]
async fn sitemap_and_robots_use_canonical_domain() {
    let ax = axum(site());

    let res = ax
        .router
        .clone()
        .oneshot(get("/sitemap.xml", "acme-tutors.com"))
        .await
        .unwrap();
    assert_eq!(
        res.headers().get("content-type").unwrap(),
        "application/xml; charset=utf-8"
    );
    let xml = text_body(res).await;
    assert!(xml.contains("<loc>https://www.acme-tutors.com/</loc>"));
    assert!(xml.contains("<loc>https://www.acme-tutors.com/subjects/maths</loc>"));

    let res = ax
        .router
        .oneshot(get("/robots.txt", "acme-tutors.com"))
        .await
        .unwrap();
    let txt = text_body(res).await;
    assert!(txt.contains("Disallow: /api/"));
    assert!(txt.contains("Sitemap: https://www.acme-tutors.com/sitemap.xml"));
}

#[tokio::test]
async fn request_id_is_preserved_when_provided() {
    let ax = axum(site());

    let provided = HeaderValue::from_static("req-test-123");
    let mut req = get("/health", "acme-tutors.com");
    req.headers_mut().insert("x-request-id", provided.clone());
    let res = ax.router.oneshot(req).await.unwrap();

    assert_eq!(res.headers().get("x-request-id").unwrap(), &provided);
}
