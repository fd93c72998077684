use axum::body::Body;
use axum::http::Request;
use clonesite_server::{build, load_config};
use http_body_util::BodyExt;
use serde_json::Value;
use tower::ServiceExt;

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
async fn health_ok() {
    let ax = build(&load_config()).await.unwrap();

    let res = ax
        .router
        .oneshot(Request::builder().method("GET").uri("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(res.status().as_u16(), 200);
    assert_eq!(text_body(res).await, "ok");
}

#[tokio::test]
async fn demo_seed_serves_clone_hero() {
    let ax = build(&load_config()).await.unwrap();

    let res = ax
        .router
        .oneshot(get("/api/sections/hero", "www.acme-tutors.com"))
        .await
        .unwrap();

    let body = json_body(res).await;
    assert_eq!(body["source"], "tenantSpecific");
    assert_eq!(body["data"]["fields"]["heading"], "Acme Tutors");
}

#[tokio::test]
async fn clone_without_hero_gets_default() {
    let ax = build(&load_config()).await.unwrap();

    let res = ax
        .router
        .oneshot(get("/api/sections/hero", "northside-maths.co.uk"))
        .await
        .unwrap();

    let body = json_body(res).await;
    assert_eq!(body["source"], "default");
    assert_eq!(body["data"]["id"], "hero-default");
}

#[tokio::test]
async fn exclusive_tenant_navigation_hides_blog() {
    let ax = build(&load_config()).await.unwrap();

    let res = ax
        .router
        .oneshot(get("/api/navigation", "northside-maths.co.uk"))
        .await
        .unwrap();

    let body = json_body(res).await;
    assert_eq!(body["families"]["subjects"], true);
    assert_eq!(body["families"]["blog"], false);
    let hrefs: Vec<&str> = body["links"]
        .as_array()
        .unwrap()
        .iter()
        .map(|l| l["href"].as_str().unwrap())
        .collect();
    assert_eq!(hrefs, ["/", "/subjects", "/contact"]);
}

#[tokio::test]
async fn inactive_blog_post_is_404() {
    let ax = build(&load_config()).await.unwrap();

    let res = ax
        .router
        .clone()
        .oneshot(get("/api/pages/blog/exam-tips", "acme-tutors.com"))
        .await
        .unwrap();
    assert_eq!(res.status().as_u16(), 200);

    let res = ax
        .router
        .oneshot(get("/api/pages/blog/draft", "acme-tutors.com"))
        .await
        .unwrap();
    assert_eq!(res.status().as_u16(), 404);
    let body = json_body(res).await;
    assert_eq!(body["code"], 404);
}

#[tokio::test]
async fn homepage_only_tenant_sitemap_has_one_url() {
    let ax = build(&load_config()).await.unwrap();

    let res = ax
        .router
        .oneshot(get("/sitemap.xml", "launchpad-tutoring.com"))
        .await
        .unwrap();

    let xml = text_body(res).await;
    assert_eq!(xml.matches("<url>").count(), 1);
    assert!(xml.contains("<loc>https://www.launchpad-tutoring.com/</loc>"));
}

#[tokio::test]
async fn clone_sitemap_lists_active_pages() {
    let ax = build(&load_config()).await.unwrap();

    let res = ax
        .router
        .oneshot(get("/sitemap.xml", "acme-tutors.com"))
        .await
        .unwrap();

    let xml = text_body(res).await;
    assert!(xml.contains("<loc>https://www.acme-tutors.com/subjects/maths</loc>"));
    assert!(xml.contains("<loc>https://www.acme-tutors.com/blog/exam-tips</loc>"));
    assert!(!xml.contains("/blog/draft"));
}

#[tokio::test]
async fn revalidate_drops_caches() {
    let ax = build(&load_config()).await.unwrap();

    let res = ax
        .router
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/revalidate")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(res.status().as_u16(), 200);
    let body = json_body(res).await;
    assert_eq!(body["revalidated"], true);
}
