mod app;

use std::sync::Arc;

use anyhow::Result;
use clonesite_axum::{axum, AxumApp};
use clonesite_core::{SiteApp, SiteConfig, SiteConfigSnapshot};

pub use app::{load_config, load_store};

/// Wire the store and the axum surface from one config snapshot.
pub async fn build(cfg: &SiteConfigSnapshot) -> Result<AxumApp> {
    let store = load_store(cfg).await?;
    let site = SiteApp::new(Arc::new(store), SiteConfig::from_snapshot(cfg));
    Ok(axum(site))
}
