use clonesite_core::SiteApp;

/// Router state: the process-wide site container.
#[derive(Clone)]
pub struct SiteState {
    pub app: SiteApp,
}

impl SiteState {
    pub fn new(app: SiteApp) -> Self {
        Self { app }
    }
}
