//! HTTP surface
//!
//! - `GET /api/0/sentry-apps/{app_slug}/interaction/`: view and component series
//! - `POST /api/0/sentry-apps/{app_slug}/interaction/`: increment one counter
//! - `GET /healthz`

use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;

use axum::Router;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::interaction::InteractionService;

mod error;
mod routes;

pub use error::{ApiError, ErrorResponse};
pub use routes::api_config;

/// Router with state and request tracing attached
pub fn build_router(service: Arc<InteractionService>) -> Router {
    api_config()
        .with_state(service)
        .layer(TraceLayer::new_for_http())
}

pub struct WebServer {
    service: Arc<InteractionService>,
}

impl WebServer {
    pub fn new(service: Arc<InteractionService>) -> Self {
        WebServer { service }
    }

    /// Serve until `shutdown` resolves
    pub async fn start<F>(self, addr: SocketAddr, shutdown: F) -> std::io::Result<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let router = build_router(self.service);
        let listener = TcpListener::bind(addr).await?;

        info!("Interaction API listening on http://{}", listener.local_addr()?);
        axum::serve(listener, router)
            .with_graceful_shutdown(shutdown)
            .await
    }
}
