use axum::Router;
use clonesite_core::SiteApp;
use tokio::net::{TcpListener, ToSocketAddrs};
use tower::ServiceBuilder;
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::trace::TraceLayer;

use crate::routes::site_router;
use crate::SiteState;

#[derive(Clone)]
pub struct AxumApp {
    pub app: SiteApp,
    pub router: Router<()>,
}

impl AxumApp {
    /// Mount every site route for `app`, with request-id and trace layers.
    pub fn new(app: SiteApp) -> Self {
        let router = site_router(SiteState::new(app.clone()));
        Self { app, router }.with_layers()
    }

    fn with_layers(mut self) -> Self {
        self.router = self.router.layer(
            ServiceBuilder::new()
                .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
                .layer(TraceLayer::new_for_http())
                .layer(PropagateRequestIdLayer::x_request_id()),
        );
        self
    }

    pub async fn listen<A>(self, addr: A) -> anyhow::Result<()>
    where
        A: ToSocketAddrs,
    {
        let listener = TcpListener::bind(addr).await?;
        tracing::info!(addr = ?listener.local_addr()?, "listening");
        axum::serve(listener, self.router).await?;
        Ok(())
    }
}

pub fn axum(app: SiteApp) -> AxumApp {
    AxumApp::new(app)
}
