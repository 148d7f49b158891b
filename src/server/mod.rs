pub mod api;
pub mod error;
pub mod extractors;
pub mod services;
pub mod utils;

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use axum::{Extension, Router};
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;

use crate::config::AppConfig;
use api::RelayController;
use services::RelayServices;

pub struct RelayServer;

impl RelayServer {
    pub async fn serve(config: Arc<AppConfig>) -> anyhow::Result<()> {
        let services = RelayServices::new(config.clone());
        let app = Self::app(services);

        let address = format!("{}:{}", config.host, config.port);
        let listener = tokio::net::TcpListener::bind(&address)
            .await
            .with_context(|| format!("failed to bind {}", address))?;

        info!("relay listening on http://{}", address);

        axum::serve(
            listener,
            app.into_make_service_with_connect_info::<SocketAddr>(),
        )
        .await
        .context("error while serving the relay")?;

        Ok(())
    }

    /// the full router, separate from `serve` so tests can drive it without a socket
    pub fn app(services: RelayServices) -> Router {
        RelayController::app().layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                // media players do ranged reads from all sorts of web origins
                .layer(CorsLayer::permissive())
                .layer(Extension(services)),
        )
    }
}
