use std::collections::HashMap;

use axum::{
    extract::{Path, Query, State},
    http::{header, HeaderMap},
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use clonesite_core::{
    bail_site, canonical_base, render_sitemap_xml, ContentRecord, NavigationView, PageFamily,
    RequestMeta, Resolution, RobotsRules,
};
use serde_json::{json, Value};

use crate::params::{request_meta, scope_param};
use crate::{SiteAxumError, SiteState};

type QueryMap = Query<HashMap<String, String>>;

fn meta(state: &SiteState, headers: &HeaderMap, query: &HashMap<String, String>) -> RequestMeta {
    request_meta(headers, query, state.app.config())
}

async fn health() -> &'static str {
    "ok"
}

async fn tenant(
    State(state): State<SiteState>,
    headers: HeaderMap,
    Query(query): QueryMap,
) -> Json<Value> {
    let ctx = state
        .app
        .context_for_request(&meta(&state, &headers, &query))
        .await;
    Json(match ctx.tenant {
        Some(t) => json!({
            "tenantId": t.id,
            "name": t.name,
            "isBaseline": t.is_baseline,
        }),
        None => json!({ "tenantId": null }),
    })
}

/// Page records only go out through `/api/pages`, where family gating and
/// the strict-tenant rule apply.
fn reject_page_section(section: &str) -> Result<(), SiteAxumError> {
    if let Some(family) = PageFamily::for_section(section) {
        bail_site!(
            bad_request,
            "{} is a page section, use /api/pages{}/{{slug}}",
            section,
            family.route_prefix()
        );
    }
    Ok(())
}

async fn section(
    State(state): State<SiteState>,
    Path(section): Path<String>,
    headers: HeaderMap,
    Query(query): QueryMap,
) -> Result<Json<Resolution<ContentRecord>>, SiteAxumError> {
    reject_page_section(&section)?;
    let ctx = state
        .app
        .context_for_request(&meta(&state, &headers, &query))
        .await;
    Ok(Json(
        state
            .app
            .resolver()
            .resolve(&ctx, &section, scope_param(&query))
            .await,
    ))
}

async fn collection(
    State(state): State<SiteState>,
    Path(section): Path<String>,
    headers: HeaderMap,
    Query(query): QueryMap,
) -> Result<Json<Resolution<Vec<ContentRecord>>>, SiteAxumError> {
    reject_page_section(&section)?;
    let ctx = state
        .app
        .context_for_request(&meta(&state, &headers, &query))
        .await;
    Ok(Json(
        state
            .app
            .resolver()
            .resolve_collection(&ctx, &section, scope_param(&query))
            .await,
    ))
}

async fn page(
    State(state): State<SiteState>,
    Path((family, slug)): Path<(String, String)>,
    headers: HeaderMap,
    Query(query): QueryMap,
) -> Result<Json<Resolution<ContentRecord>>, SiteAxumError> {
    let Some(family) = PageFamily::parse(&family) else {
        bail_site!(bad_request, "Unknown page family: {}", family);
    };
    let ctx = state
        .app
        .context_for_request(&meta(&state, &headers, &query))
        .await;
    let page = state.app.gate().page(&ctx, family, &slug).await?;
    Ok(Json(page))
}

async fn navigation(
    State(state): State<SiteState>,
    headers: HeaderMap,
    Query(query): QueryMap,
) -> Json<NavigationView> {
    let ctx = state
        .app
        .context_for_request(&meta(&state, &headers, &query))
        .await;
    Json(state.app.gate().navigation(&ctx).await)
}

async fn sitemap(
    State(state): State<SiteState>,
    headers: HeaderMap,
    Query(query): QueryMap,
) -> impl IntoResponse {
    let entries = state
        .app
        .routes()
        .enumerate_for_request(&meta(&state, &headers, &query))
        .await;
    (
        [(header::CONTENT_TYPE, "application/xml; charset=utf-8")],
        render_sitemap_xml(&entries),
    )
}

async fn robots(
    State(state): State<SiteState>,
    headers: HeaderMap,
    Query(query): QueryMap,
) -> impl IntoResponse {
    let meta = meta(&state, &headers, &query);
    let base = meta
        .request_host()
        .and_then(canonical_base)
        .unwrap_or_else(|| "http://localhost".to_string());
    (
        [(header::CONTENT_TYPE, "text/plain; charset=utf-8")],
        RobotsRules::for_base(&base).render(),
    )
}

/// Drop every cache, e.g. from a CMS publish webhook.
async fn revalidate(State(state): State<SiteState>) -> Json<Value> {
    state.app.invalidate_all();
    Json(json!({ "revalidated": true }))
}

/// All public routes of the site, bound to `state`.
pub fn site_router(state: SiteState) -> Router<()> {
    Router::new()
        .route("/health", get(health))
        .route("/api/tenant", get(tenant))
        .route("/api/sections/{section}", get(section))
        .route("/api/collections/{section}", get(collection))
        .route("/api/pages/{family}/{slug}", get(page))
        .route("/api/navigation", get(navigation))
        .route("/api/revalidate", post(revalidate))
        .route("/sitemap.xml", get(sitemap))
        .route("/robots.txt", get(robots))
        .with_state(state)
}
