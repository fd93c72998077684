use anyhow::{Context, Result};
use clonesite_core::config::ENV_PREFIX;
use clonesite_core::{MemoryStore, SiteConfigSnapshot, SiteConfigStore};

const DEMO_SEED: &str = include_str!("../fixtures/seed.json");

/// Defaults first, then `CLONESITE__*` environment overrides.
pub fn load_config() -> SiteConfigSnapshot {
    let mut cfg = SiteConfigStore::new();
    cfg.set("http.host", "127.0.0.1");
    cfg.set("http.port", "3000");
    cfg.load_env(ENV_PREFIX);
    cfg.snapshot()
}

/// Content from `seed.path` when configured, otherwise the bundled demo seed.
pub async fn load_store(cfg: &SiteConfigSnapshot) -> Result<MemoryStore> {
    match cfg.get("seed.path") {
        Some(path) => {
            tracing::info!(path, "loading seed");
            MemoryStore::from_path(path)
                .await
                .with_context(|| format!("failed to load seed from {path}"))
        }
        None => MemoryStore::from_json(DEMO_SEED).context("bundled demo seed is malformed"),
    }
}
